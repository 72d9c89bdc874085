#[cfg(test)]
mod _tests_structure {
    use nalgebra::Vector3;
    use nalgebra_sparse::CooMatrix;

    use crate::figure::{Element, Figure};
    use crate::options;
    use crate::pltutils::colormap;
    use crate::results::{Axis, Boundary, Positions};
    use crate::structure::*;
    use crate::style::Style;
    use crate::utils::OptionExt;

    fn fig() -> Figure {
        Figure::with_style(Style::default())
    }

    fn count_circles(fig: &Figure) -> usize {
        fig.elements()
            .iter()
            .filter(|e| matches!(e, Element::Circle { .. }))
            .count()
    }

    fn count_segments(fig: &Figure) -> usize {
        fig.elements()
            .iter()
            .filter(|e| matches!(e, Element::Segment { .. }))
            .count()
    }

    fn pair_positions() -> Positions {
        Positions::new(vec![0.0, 1.0], vec![0.0, 0.0], vec![0.0, 0.0]).unwrap()
    }

    // ==================== axes and radii ====================

    #[test]
    fn test_parse_axes() {
        assert_eq!(parse_axes("xy").unwrap(), (Axis::X, Axis::Y));
        assert_eq!(parse_axes("yz").unwrap(), (Axis::Y, Axis::Z));
        assert!(parse_axes("x").is_err());
        assert!(parse_axes("xyz").is_err());
        assert!(parse_axes("ab").is_err());
    }

    #[test]
    fn test_data_radii_linear() {
        let radii = data_radii(&[1.0, 2.0, 3.0], 0.1, 0.5);
        assert!((radii[0] - 0.1).abs() < 1e-12); // minimum value, minimum radius
        assert!((radii[1] - 0.3).abs() < 1e-12);
        assert!((radii[2] - 0.5).abs() < 1e-12); // maximum value, maximum radius
    }

    #[test]
    fn test_data_radii_constant_data() {
        // Constant data would divide by zero; every site gets the maximum
        // radius instead.
        let radii = data_radii(&[7.0, 7.0, 7.0], 0.1, 0.5);
        assert_eq!(radii, vec![0.5, 0.5, 0.5]);

        // Numerically constant counts as constant too.
        let radii = data_radii(&[7.0, 7.0 + 1e-12], 0.1, 0.5);
        assert_eq!(radii, vec![0.5, 0.5]);
    }

    #[test]
    fn test_data_radii_negative_values() {
        let radii = data_radii(&[-2.0, 0.0], 0.0, 1.0);
        assert_eq!(radii, vec![0.0, 1.0]);
    }

    // ==================== option splitting ====================

    #[test]
    fn test_structure_plot_properties_defaults() {
        let props = structure_plot_properties(None).unwrap();
        assert_eq!(props.axes, (Axis::X, Axis::Y));
        assert!(props.add_margin);
        assert_eq!(props.boundary.get_str("color"), Some("red"));
    }

    #[test]
    fn test_shared_options_reach_both_layers() {
        let opts = options! { "blend" => 0.3, "axes" => "yz" };
        let props = structure_plot_properties(Some(&opts)).unwrap();
        assert_eq!(props.axes, (Axis::Y, Axis::Z));
        assert_eq!(props.site.get_f64("blend"), Some(0.3));
        assert_eq!(props.hopping.get_f64("blend"), Some(0.3));
        assert_eq!(props.site.get_str("axes"), Some("yz"));
    }

    #[test]
    fn test_sub_map_overrides_shared() {
        let opts = options! {
            "width" => 2.0,
            "hopping" => options! { "width" => 3.0 },
        };
        let props = structure_plot_properties(Some(&opts)).unwrap();
        assert_eq!(props.hopping.get_f64("width"), Some(3.0));
        assert_eq!(props.site.get_f64("width"), Some(2.0));
    }

    #[test]
    fn test_boundary_inherits_from_hopping() {
        let opts = options! { "hopping" => options! { "width" => 3.0 } };
        let props = structure_plot_properties(Some(&opts)).unwrap();
        assert_eq!(props.boundary.get_f64("width"), Some(3.0));
        assert_eq!(props.boundary.get_str("color"), Some("red"));

        // An explicit boundary color beats the default.
        let opts = options! { "boundary" => options! { "color" => "blue" } };
        let props = structure_plot_properties(Some(&opts)).unwrap();
        assert_eq!(props.boundary.get_str("color"), Some("blue"));
    }

    #[test]
    fn test_lead_inherits_from_boundary() {
        let opts = options! { "boundary" => options! { "width" => 4.0 } };
        let props = structure_plot_properties(Some(&opts)).unwrap();
        assert_eq!(props.lead.get_f64("width"), Some(4.0));
        assert_eq!(props.lead.get_str("color"), Some("red"));
    }

    #[test]
    fn test_add_margin_not_forwarded_to_layers() {
        let opts = options! { "add_margin" => false };
        let props = structure_plot_properties(Some(&opts)).unwrap();
        assert!(!props.add_margin);
        assert!(props.site.get_bool("add_margin").is_none());
    }

    // ==================== sites ====================

    #[test]
    fn test_plot_sites_pushes_circles() {
        let mut fig = fig();
        plot_sites(&mut fig, &pair_positions(), &[0.0, 1.0], &options! {}).unwrap();
        assert_eq!(count_circles(&fig), 2);
        for element in fig.elements() {
            let Element::Circle { radius, zorder, .. } = element else {
                panic!("expected circles only");
            };
            assert_eq!(*radius, 0.025);
            assert_eq!(*zorder, 1); // sites render above hoppings
        }
    }

    #[test]
    fn test_plot_sites_offset() {
        let mut fig = fig();
        let opts = options! { "offset" => Vector3::new(0.5, 1.0, 0.0) };
        plot_sites(&mut fig, &pair_positions(), &[0.0, 0.0], &opts).unwrap();
        let Element::Circle { center, .. } = &fig.elements()[0] else {
            panic!("expected a circle");
        };
        assert_eq!(*center, (0.5, 1.0));
    }

    #[test]
    fn test_plot_sites_categorical_colors() {
        // Without a cmap, equal data values share a palette color.
        let mut fig = fig();
        let positions = Positions::new(vec![0.0, 1.0, 2.0], vec![0.0; 3], vec![0.0; 3]).unwrap();
        plot_sites(&mut fig, &positions, &[0.0, 1.0, 0.0], &options! {}).unwrap();
        let colors: Vec<[u8; 3]> = fig
            .elements()
            .iter()
            .filter_map(|e| match e {
                Element::Circle { color, .. } => Some(*color),
                _ => None,
            })
            .collect();
        assert_eq!(colors[0], colors[2]);
        assert_ne!(colors[0], colors[1]);
    }

    #[test]
    fn test_plot_sites_constant_continuous_data() {
        // A constant continuous field maps to the middle of the colormap.
        let mut fig = fig();
        let opts = options! { "cmap" => "viridis" };
        plot_sites(&mut fig, &pair_positions(), &[3.0, 3.0], &opts).unwrap();
        let mid = colormap("viridis").unwrap().eval_continuous(0.5);
        let Element::Circle { color, .. } = &fig.elements()[0] else {
            panic!("expected a circle");
        };
        assert_eq!(*color, [mid.r, mid.g, mid.b]);
    }

    #[test]
    fn test_plot_sites_per_site_radius() {
        let mut fig = fig();
        let opts = options! { "radius" => vec![0.1, 0.2] };
        plot_sites(&mut fig, &pair_positions(), &[0.0, 0.0], &opts).unwrap();
        let radii: Vec<f64> = fig
            .elements()
            .iter()
            .filter_map(|e| match e {
                Element::Circle { radius, .. } => Some(*radius),
                _ => None,
            })
            .collect();
        assert_eq!(radii, vec![0.1, 0.2]);

        // Wrong array length is an error, not a silent cycle.
        let opts = options! { "radius" => vec![0.1, 0.2, 0.3] };
        assert!(plot_sites(&mut fig, &pair_positions(), &[0.0, 0.0], &opts).is_err());
    }

    #[test]
    fn test_plot_sites_data_length_mismatch() {
        let mut fig = fig();
        assert!(plot_sites(&mut fig, &pair_positions(), &[0.0], &options! {}).is_err());
    }

    // ==================== hoppings ====================

    #[test]
    fn test_plot_hoppings_segments() {
        let mut fig = fig();
        let mut hoppings = CooMatrix::new(2, 2);
        hoppings.push(0, 1, 0);
        plot_hoppings(&mut fig, &pair_positions(), &hoppings, &options! {}).unwrap();
        assert_eq!(count_segments(&fig), 1);
        let Element::Segment { from, to, zorder, .. } = &fig.elements()[0] else {
            panic!("expected a segment");
        };
        assert_eq!(*from, (0.0, 0.0));
        assert_eq!(*to, (1.0, 0.0));
        assert_eq!(*zorder, -1); // hoppings render underneath sites
    }

    #[test]
    fn test_plot_hoppings_zero_width_draws_nothing() {
        let mut fig = fig();
        let mut hoppings = CooMatrix::new(2, 2);
        hoppings.push(0, 1, 0);
        let opts = options! { "width" => 0.0 };
        plot_hoppings(&mut fig, &pair_positions(), &hoppings, &opts).unwrap();
        assert!(fig.elements().is_empty());
    }

    #[test]
    fn test_plot_boundary_hoppings_shifted_endpoint() {
        let mut fig = fig();
        let mut wrap = CooMatrix::new(2, 2);
        wrap.push(1, 0, 0);
        let shift = Vector3::new(2.0, 0.0, 0.0);
        plot_boundary_hoppings(&mut fig, &pair_positions(), &wrap, shift, &options! {}).unwrap();
        let Element::Segment { from, to, .. } = &fig.elements()[0] else {
            panic!("expected a segment");
        };
        // Only the starting endpoint is translated into the neighboring copy.
        assert_eq!(*from, (3.0, 0.0));
        assert_eq!(*to, (0.0, 0.0));
    }

    // ==================== periodic boundaries ====================

    #[test]
    fn test_periodic_copies_both_directions() {
        let mut fig = fig();
        let positions = pair_positions();
        let boundaries = vec![Boundary {
            shift: Vector3::new(2.0, 0.0, 0.0),
            hoppings: CooMatrix::new(2, 2),
        }];
        let props = structure_plot_properties(None).unwrap();
        plot_periodic_boundaries(
            &mut fig,
            &positions,
            &CooMatrix::new(2, 2),
            &boundaries,
            &[0.0, 0.0],
            1,
            &props,
        )
        .unwrap();
        // One copy at +shift and one at -shift, two sites each.
        assert_eq!(count_circles(&fig), 4);
        let centers: Vec<(f64, f64)> = fig
            .elements()
            .iter()
            .filter_map(|e| match e {
                Element::Circle { center, .. } => Some(*center),
                _ => None,
            })
            .collect();
        assert!(centers.contains(&(2.0, 0.0)));
        assert!(centers.contains(&(-2.0, 0.0)));
    }

    #[test]
    fn test_periodic_copies_scale_with_num_periods() {
        let mut fig = fig();
        let boundaries = vec![Boundary {
            shift: Vector3::new(2.0, 0.0, 0.0),
            hoppings: CooMatrix::new(2, 2),
        }];
        let props = structure_plot_properties(None).unwrap();
        plot_periodic_boundaries(
            &mut fig,
            &pair_positions(),
            &CooMatrix::new(2, 2),
            &boundaries,
            &[0.0, 0.0],
            2,
            &props,
        )
        .unwrap();
        // Shifts +-s and +-2s, two sites each.
        assert_eq!(count_circles(&fig), 8);
    }

    #[test]
    fn test_periodic_near_duplicate_shifts_collapse() {
        // Two boundaries describing the same physical translation up to
        // rounding produce a single pair of copies, not two.
        let mut fig = fig();
        let shift = Vector3::new(2.0, 0.0, 0.0);
        let boundaries = vec![
            Boundary {
                shift,
                hoppings: CooMatrix::new(2, 2),
            },
            Boundary {
                shift: shift + Vector3::new(1e-9, 0.0, 0.0),
                hoppings: CooMatrix::new(2, 2),
            },
        ];
        let mut props = structure_plot_properties(None).unwrap();
        // Keep the count to translated copies only.
        props.boundary.insert("width".to_string(), 0.0.into());

        // Base shifts dedup to {+s, -s}; the corner combinations contribute
        // +-2s and the near-zero difference vector.
        plot_periodic_boundaries(
            &mut fig,
            &pair_positions(),
            &CooMatrix::new(2, 2),
            &boundaries,
            &[0.0, 0.0],
            1,
            &props,
        )
        .unwrap();
        let centers: Vec<(f64, f64)> = fig
            .elements()
            .iter()
            .filter_map(|e| match e {
                Element::Circle { center, .. } => Some(*center),
                _ => None,
            })
            .collect();
        let copies_at = |x: f64| centers.iter().filter(|c| (c.0 - x).abs() < 1e-6).count();
        assert_eq!(copies_at(2.0), 1); // site 0 of the +s copy, drawn once
        assert_eq!(copies_at(-2.0), 1);
    }

    #[test]
    fn test_no_boundaries_draws_nothing() {
        let mut fig = fig();
        let props = structure_plot_properties(None).unwrap();
        plot_periodic_boundaries(
            &mut fig,
            &pair_positions(),
            &CooMatrix::new(2, 2),
            &[],
            &[0.0, 0.0],
            1,
            &props,
        )
        .unwrap();
        assert!(fig.elements().is_empty());
    }
}
