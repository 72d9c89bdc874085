#[cfg(test)]
mod _tests_results {
    use nalgebra::Vector3;
    use nalgebra_sparse::CooMatrix;

    use crate::results::{Axis, Boundary, Positions, ScalarField, StructureField};

    fn line_positions(n: usize) -> Positions {
        Positions::new((0..n).map(|i| i as f64).collect(), vec![0.0; n], vec![0.0; n]).unwrap()
    }

    fn chain_field(n: usize) -> StructureField {
        // n sites in a line, nearest-neighbor hoppings, all IDs zero.
        let mut hoppings = CooMatrix::new(n, n);
        for i in 0..n - 1 {
            hoppings.push(i, i + 1, 0);
        }
        StructureField::new(
            (0..n).map(|i| i as f64).collect(),
            line_positions(n),
            None,
            hoppings,
            vec![],
        )
        .unwrap()
    }

    // ==================== Positions ====================

    #[test]
    fn test_positions_length_validation() {
        assert!(Positions::new(vec![0.0], vec![0.0], vec![0.0]).is_ok());
        assert!(Positions::new(vec![0.0, 1.0], vec![0.0], vec![0.0]).is_err());
    }

    #[test]
    fn test_positions_from_sites() {
        let pos = Positions::from_sites(&[Vector3::new(1.0, 2.0, 3.0), Vector3::new(4.0, 5.0, 6.0)]);
        assert_eq!(pos.len(), 2);
        assert_eq!(pos.site(1), Vector3::new(4.0, 5.0, 6.0));
        assert_eq!(pos.axis(Axis::Y), &[2.0, 5.0]);
        assert_eq!(pos.x(), &[1.0, 4.0]);
        assert_eq!(pos.z(), &[3.0, 6.0]);
    }

    // ==================== ScalarField ====================

    #[test]
    fn test_scalar_field_validation() {
        let pos = line_positions(3);
        assert!(ScalarField::new(vec![1.0, 2.0], pos.clone(), None).is_err());
        assert!(ScalarField::new(vec![1.0, 2.0, 3.0], pos.clone(), Some(vec![0, 1])).is_err());
        let field = ScalarField::new(vec![1.0, 2.0, 3.0], pos, None).unwrap();
        assert_eq!(field.sublattices(), &[0, 0, 0]); // defaulted
    }

    #[test]
    fn test_scalar_field_masked() {
        let field = ScalarField::new(
            vec![10.0, 20.0, 30.0],
            line_positions(3),
            Some(vec![0, 1, 2]),
        )
        .unwrap();
        let kept = field.masked(&[true, false, true]);
        assert_eq!(kept.num_sites(), 2);
        assert_eq!(kept.data(), &[10.0, 30.0]);
        assert_eq!(kept.x(), &[0.0, 2.0]);
        assert_eq!(kept.sublattices(), &[0, 2]);
    }

    #[test]
    fn test_scalar_field_select() {
        let field = ScalarField::new(vec![10.0, 20.0, 30.0], line_positions(3), None).unwrap();
        let picked = field.select(&[1, 2]).unwrap();
        assert_eq!(picked.data(), &[20.0, 30.0]);
    }

    #[test]
    fn test_select_rejects_out_of_range_index() {
        let field = ScalarField::new(vec![10.0, 20.0, 30.0], line_positions(3), None).unwrap();
        assert!(field.select(&[0, 3]).is_err());

        let structure = chain_field(3);
        assert!(structure.select(&[5]).is_err());
        assert_eq!(structure.select(&[0, 2]).unwrap().num_sites(), 2);
    }

    #[test]
    fn test_scalar_field_cropped_half_open() {
        let field =
            ScalarField::new(vec![0.0, 1.0, 2.0, 3.0], line_positions(4), None).unwrap();
        // lo <= x < hi keeps sites 1 and 2, the hi endpoint is excluded.
        let cropped = field.cropped(&[(Axis::X, 1.0, 3.0)]);
        assert_eq!(cropped.x(), &[1.0, 2.0]);
    }

    #[test]
    fn test_scalar_field_clipped() {
        let field =
            ScalarField::new(vec![-2.0, 0.5, 7.0], line_positions(3), None).unwrap();
        let clipped = field.clipped(0.0, 1.0);
        assert_eq!(clipped.data(), &[0.0, 0.5, 1.0]);
        assert_eq!(clipped.positions(), field.positions());
    }

    // ==================== StructureField ====================

    #[test]
    fn test_structure_field_validation() {
        let pos = line_positions(3);
        let wrong = CooMatrix::new(2, 2);
        assert!(StructureField::new(vec![0.0; 3], pos.clone(), None, wrong, vec![]).is_err());

        let boundary = Boundary {
            shift: Vector3::new(3.0, 0.0, 0.0),
            hoppings: CooMatrix::new(2, 2),
        };
        assert!(
            StructureField::new(vec![0.0; 3], pos, None, CooMatrix::new(3, 3), vec![boundary])
                .is_err()
        );
    }

    #[test]
    fn test_masked_preserves_explicit_zero_hoppings() {
        // Chain 0-1-2-3 with all hopping IDs stored as explicit zeros.
        let field = chain_field(4);
        let kept = field.masked(&[true, true, true, false]);

        assert_eq!(kept.num_sites(), 3);
        // Entries between retained sites survive with their zero values;
        // the entry touching the dropped site 3 is gone.
        let entries: Vec<(usize, usize, i32)> = kept
            .hoppings()
            .triplet_iter()
            .map(|(r, c, &v)| (r, c, v))
            .collect();
        assert_eq!(entries, vec![(0, 1, 0), (1, 2, 0)]);
    }

    #[test]
    fn test_masked_remaps_indices() {
        let mut hoppings = CooMatrix::new(4, 4);
        hoppings.push(0, 2, 5);
        hoppings.push(2, 3, 7);
        let field = StructureField::new(
            vec![0.0; 4],
            line_positions(4),
            None,
            hoppings,
            vec![],
        )
        .unwrap();

        let kept = field.masked(&[true, false, true, true]);
        let entries: Vec<(usize, usize, i32)> = kept
            .hoppings()
            .triplet_iter()
            .map(|(r, c, &v)| (r, c, v))
            .collect();
        // Old sites 0, 2, 3 become 0, 1, 2.
        assert_eq!(entries, vec![(0, 1, 5), (1, 2, 7)]);
    }

    #[test]
    fn test_masked_filters_boundary_adjacency() {
        let mut wrap = CooMatrix::new(3, 3);
        wrap.push(2, 0, 0); // explicit zero across the boundary
        wrap.push(1, 0, 4);
        let field = StructureField::new(
            vec![0.0; 3],
            line_positions(3),
            None,
            CooMatrix::new(3, 3),
            vec![Boundary {
                shift: Vector3::new(3.0, 0.0, 0.0),
                hoppings: wrap,
            }],
        )
        .unwrap();

        let kept = field.masked(&[true, false, true]);
        let boundary = &kept.boundaries()[0];
        assert_eq!(boundary.shift, Vector3::new(3.0, 0.0, 0.0));
        let entries: Vec<(usize, usize, i32)> = boundary
            .hoppings
            .triplet_iter()
            .map(|(r, c, &v)| (r, c, v))
            .collect();
        assert_eq!(entries, vec![(1, 0, 0)]);
    }

    #[test]
    fn test_structure_field_cropped() {
        let field = chain_field(5);
        let cropped = field.cropped(&[(Axis::X, 0.0, 3.0)]);
        assert_eq!(cropped.num_sites(), 3);
        assert_eq!(cropped.hoppings().nnz(), 2);
    }

    #[test]
    fn test_structure_field_clipped_keeps_structure() {
        let field = chain_field(4);
        let clipped = field.clipped(0.0, 1.5);
        assert_eq!(clipped.data(), &[0.0, 1.0, 1.5, 1.5]);
        assert_eq!(clipped.hoppings().nnz(), field.hoppings().nnz());
    }

    #[test]
    fn test_plot_pcolor_registers_mappable() {
        use crate::figure::Figure;
        use crate::style::Style;

        let field =
            ScalarField::new(vec![1.0, 2.0, 3.0], line_positions(3), None).unwrap();
        let mut fig = Figure::with_style(Style::default());
        field.plot_pcolor(&mut fig, None).unwrap();
        let mappable = fig.mappable().unwrap();
        assert_eq!(mappable.cmap, "viridis"); // the style default
        assert_eq!((mappable.vmin, mappable.vmax), (1.0, 3.0));
    }

    #[test]
    fn test_spatial_field_drops_structure() {
        let field = chain_field(3);
        let spatial = field.spatial_field();
        assert_eq!(spatial.data(), field.data());
        assert_eq!(spatial.positions(), field.positions());
    }
}
