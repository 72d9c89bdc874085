//! Composed plots of whole models: the main system, attached leads, and
//! both together.

use anyhow::{bail, Result};
use nalgebra::Vector3;

use crate::config::{MIN_AXIS_LENGTH, MIN_AXIS_RATIO};
use crate::figure::Figure;
use crate::options;
use crate::pltutils::annotate_box;
use crate::results::{Axis, Positions, StructureField};
use crate::structure::{
    plot_boundary_hoppings, plot_hoppings, plot_periodic_boundaries, plot_sites,
    structure_plot_properties, StructureProps,
};
use crate::utils::{with_defaults, OptionMap};

/// 2D center of the extents of `pos` together with `pos + shift`, projected
/// on the plot axes.
fn center(props: &StructureProps, pos: &Positions, shift: Vector3<f64>) -> (f64, f64) {
    let project = |axis: Axis, shift_component: f64| -> (f64, f64) {
        let values = pos.axis(axis);
        let (mut min, mut max) = (f64::INFINITY, f64::NEG_INFINITY);
        for &v in values {
            min = min.min(v).min(v + shift_component);
            max = max.max(v).max(v + shift_component);
        }
        (min, max)
    };
    let pick = |axis: Axis| match axis {
        Axis::X => shift.x,
        Axis::Y => shift.y,
        Axis::Z => shift.z,
    };
    let (x_min, x_max) = project(props.axes.0, pick(props.axes.0));
    let (y_min, y_max) = project(props.axes.1, pick(props.axes.1));
    ((x_max + x_min) / 2.0, (y_max + y_min) / 2.0)
}

fn decorate_structure_plot(fig: &mut Figure, props: &StructureProps) {
    fig.set_aspect_equal();
    fig.set_xlabel(props.axes.0.label());
    fig.set_ylabel(props.axes.1.label());
    if props.add_margin {
        fig.set_min_axis_length(MIN_AXIS_LENGTH);
        fig.set_min_axis_ratio(MIN_AXIS_RATIO);
        let margin = fig.style().margin;
        fig.add_margin(margin);
    }
}

/// Plot the structure of a model: sites, hoppings and periodic boundaries
/// (if any). `num_periods` controls how many times the periodic boundaries
/// are repeated.
pub fn plot_system(
    fig: &mut Figure,
    field: &StructureField,
    num_periods: usize,
    options: Option<&OptionMap>,
) -> Result<()> {
    let props = structure_plot_properties(options)?;

    plot_hoppings(fig, field.positions(), field.hoppings(), &props.hopping)?;
    let sublattices: Vec<f64> = field.sublattices().iter().map(|&s| s as f64).collect();
    plot_sites(fig, field.positions(), &sublattices, &props.site)?;
    plot_periodic_boundaries(
        fig,
        field.positions(),
        field.hoppings(),
        field.boundaries(),
        &sublattices,
        num_periods,
        &props,
    )?;

    decorate_structure_plot(fig, &props);
    Ok(())
}

/// Plot the sites, hoppings and periodic boundaries of a lead.
///
/// The lead's unit cell is repeated `lead_length` times along its boundary
/// shift with a fading blend gradient, consecutive copies stitched together
/// by the outer (boundary) hoppings. `index` appears on the lead label.
pub fn plot_lead(
    fig: &mut Figure,
    lead: &StructureField,
    index: usize,
    lead_length: usize,
    options: Option<&OptionMap>,
) -> Result<()> {
    let Some(boundary) = lead.boundaries().first() else {
        bail!("lead {} has no periodic boundary", index);
    };
    if lead_length == 0 {
        bail!("lead length must be at least 1");
    }
    let props = structure_plot_properties(options)?;
    let sublattices: Vec<f64> = lead.sublattices().iter().map(|&s| s as f64).collect();

    // Fade from half strength down to almost invisible.
    let blend_gradient = (0..lead_length).map(|i| {
        if lead_length == 1 {
            0.5
        } else {
            0.5 - 0.4 * i as f64 / (lead_length - 1) as f64
        }
    });

    for (i, blend) in blend_gradient.enumerate() {
        let offset = i as f64 * boundary.shift;
        let copy_opts = options! { "offset" => offset, "blend" => blend };
        let site = with_defaults(Some(&copy_opts), &[&props.site], options! {});
        let hopping = with_defaults(Some(&copy_opts), &[&props.hopping], options! {});
        plot_sites(fig, lead.positions(), &sublattices, &site)?;
        plot_hoppings(fig, lead.positions(), lead.hoppings(), &hopping)?;

        let outer_opts = with_defaults(
            Some(&options! { "offset" => offset - boundary.shift, "blend" => blend }),
            &[&props.boundary],
            options! {},
        );
        plot_boundary_hoppings(
            fig,
            lead.positions(),
            &boundary.hoppings,
            boundary.shift,
            &outer_opts,
        )?;
    }

    let label_pos = center(&props, lead.positions(), 1.5 * lead_length as f64 * boundary.shift);
    annotate_box(
        fig,
        &format!("lead {}", index),
        label_pos,
        Some(&options! { "alpha" => 0.7 }),
    );

    decorate_structure_plot(fig, &props);
    Ok(())
}

/// Plot the full model: the main system plus every attached lead.
pub fn plot_system_with_leads(
    fig: &mut Figure,
    field: &StructureField,
    leads: &[StructureField],
    num_periods: usize,
    lead_length: usize,
    options: Option<&OptionMap>,
) -> Result<()> {
    // Margins are added once, after all parts are in place.
    let empty = OptionMap::new();
    let no_margin = with_defaults(
        Some(&options! { "add_margin" => false }),
        &[options.unwrap_or(&empty)],
        options! {},
    );
    plot_system(fig, field, num_periods, Some(&no_margin))?;
    for (n, lead) in leads.iter().enumerate() {
        plot_lead(fig, lead, n, lead_length, Some(&no_margin))?;
    }

    let props = structure_plot_properties(options)?;
    decorate_structure_plot(fig, &props);
    Ok(())
}
