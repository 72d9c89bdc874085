//! Structure plotting: sites, hoppings and periodic boundaries.
//!
//! Every entry point takes an option map; effective options are assembled
//! with [`with_defaults`] so that caller overrides always win over the
//! built-in defaults. Unrecognized keys are carried through the per-layer
//! maps untouched.

use anyhow::{bail, Result};
use log::debug;
use nalgebra::Vector3;
use nalgebra_sparse::CooMatrix;

use crate::config::{
    BOUNDARY_ALPHA, DATA_ATOL, DEFAULT_BOUNDARY_COLOR, DEFAULT_HOPPING_COLOR,
    DEFAULT_HOPPING_WIDTH, DEFAULT_SITE_ALPHA, DEFAULT_SITE_RADIUS,
};
use crate::figure::Figure;
use crate::options;
use crate::pltutils::{blend_colors, colormap, direct_color_map, parse_color};
use crate::results::{Axis, Boundary, Positions};
use crate::utils::{with_defaults, FuzzySet, OptionExt, OptionMap};

/// Effective per-layer option maps for a structure plot.
#[derive(Debug, Clone)]
pub struct StructureProps {
    pub axes: (Axis, Axis),
    pub add_margin: bool,
    pub site: OptionMap,
    pub hopping: OptionMap,
    pub boundary: OptionMap,
    pub lead: OptionMap,
}

/// Parse a two-character axes spec such as `"xy"` or `"yz"`.
pub fn parse_axes(axes: &str) -> Result<(Axis, Axis)> {
    let mut chars = axes.chars();
    match (chars.next(), chars.next(), chars.next()) {
        (Some(a), Some(b), None) => Ok((Axis::from_char(a)?, Axis::from_char(b)?)),
        _ => bail!("axes spec must be two of 'x', 'y', 'z', got {:?}", axes),
    }
}

fn project(axes: (Axis, Axis), v: &Vector3<f64>) -> (f64, f64) {
    let pick = |axis: Axis| match axis {
        Axis::X => v.x,
        Axis::Y => v.y,
        Axis::Z => v.z,
    };
    (pick(axes.0), pick(axes.1))
}

/// Split caller options into effective option maps for each plot layer.
///
/// Sub-maps may be given under the `site`, `hopping`, `boundary` and `lead`
/// keys; any other top-level keys act as shared low-priority defaults for
/// the site and hopping layers. The boundary layer inherits from the
/// effective hopping options (red by default); the lead layer inherits from
/// the boundary options.
pub fn structure_plot_properties(options: Option<&OptionMap>) -> Result<StructureProps> {
    let empty = OptionMap::new();
    let options = options.unwrap_or(&empty);

    let axes_str = options.get_str("axes").unwrap_or("xy").to_string();
    let axes = parse_axes(&axes_str)?;
    let add_margin = options.get_bool("add_margin").unwrap_or(true);

    let mut shared = options.clone();
    for key in ["site", "hopping", "boundary", "lead", "add_margin"] {
        shared.remove(key);
    }
    shared.insert("axes".to_string(), axes_str.into());

    let site = with_defaults(options.get_map("site"), &[&shared], options! {});
    let hopping = with_defaults(options.get_map("hopping"), &[&shared], options! {});
    let boundary = with_defaults(
        options.get_map("boundary"),
        &[&hopping],
        options! { "color" => DEFAULT_BOUNDARY_COLOR },
    );
    let lead = with_defaults(options.get_map("lead"), &[&boundary], options! {});

    Ok(StructureProps {
        axes,
        add_margin,
        site,
        hopping,
        boundary,
        lead,
    })
}

/// Map data values to site radii in the closed range `[r_min, r_max]`.
///
/// Values are shifted so the minimum is zero and interpolated linearly by
/// `value / max`. A (numerically) constant data array gets the maximum
/// radius everywhere instead of dividing by zero.
pub fn data_radii(data: &[f64], r_min: f64, r_max: f64) -> Vec<f64> {
    let minimum = data.iter().cloned().fold(f64::INFINITY, f64::min);
    let shifted: Vec<f64> = data.iter().map(|v| v - minimum).collect();
    let maximum = shifted.iter().cloned().fold(0.0, f64::max);
    if maximum.abs() <= DATA_ATOL {
        vec![r_max; data.len()]
    } else {
        shifted
            .iter()
            .map(|v| r_min + (r_max - r_min) * v / maximum)
            .collect()
    }
}

struct SiteStyle {
    radii: Vec<f64>,
    axes: (Axis, Axis),
    offset: Vector3<f64>,
    alpha: f64,
    blend: f64,
    cmap: Option<String>,
    zorder: i32,
}

fn parse_site_style(options: &OptionMap, num_sites: usize) -> Result<SiteStyle> {
    let radii = if let Some(values) = options.get_floats("radius") {
        if values.len() != num_sites {
            bail!(
                "per-site radius array has length {} but there are {} sites",
                values.len(),
                num_sites
            );
        }
        values.to_vec()
    } else {
        vec![options.get_f64("radius").unwrap_or(DEFAULT_SITE_RADIUS); num_sites]
    };

    let axes = parse_axes(options.get_str("axes").unwrap_or("xy"))?;
    let cmap = match options.get_str("cmap") {
        None | Some("auto") => None,
        Some(name) => Some(name.to_string()),
    };
    Ok(SiteStyle {
        radii,
        axes,
        offset: options.get_vector3("offset").unwrap_or_else(Vector3::zeros),
        alpha: options.get_f64("alpha").unwrap_or(DEFAULT_SITE_ALPHA),
        blend: options.get_f64("blend").unwrap_or(1.0),
        cmap,
        zorder: options.get_f64("zorder").unwrap_or(1.0) as i32,
    })
}

/// Draw lattice sites as filled discs colored by `data`.
///
/// Without a `cmap` option the data is treated as categorical (sublattice
/// IDs) and colored from the figure's palette; with a named colormap the
/// data is mapped continuously over its range. Recognized options:
/// `radius` (scalar or per-site array), `offset`, `blend`, `alpha`, `cmap`,
/// `axes`, `zorder`.
pub fn plot_sites(
    fig: &mut Figure,
    positions: &Positions,
    data: &[f64],
    options: &OptionMap,
) -> Result<()> {
    if positions.is_empty() {
        return Ok(());
    }
    if data.len() != positions.len() {
        bail!(
            "data length {} does not match {} sites",
            data.len(),
            positions.len()
        );
    }
    let style = parse_site_style(options, positions.len())?;

    let colors: Vec<[u8; 3]> = match &style.cmap {
        None => direct_color_map(data, &fig.style().palette, style.blend),
        Some(name) => {
            let gradient = colormap(name)?;
            let vmin = data.iter().cloned().fold(f64::INFINITY, f64::min);
            let vmax = data.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            let span = vmax - vmin;
            data.iter()
                .map(|&v| {
                    let t = if span.abs() <= DATA_ATOL {
                        0.5
                    } else {
                        (v - vmin) / span
                    };
                    let c = gradient.eval_continuous(t);
                    let color = [c.r, c.g, c.b];
                    if style.blend < 1.0 {
                        blend_colors(color, [255, 255, 255], style.blend)
                    } else {
                        color
                    }
                })
                .collect()
        }
    };

    for i in 0..positions.len() {
        let center = project(style.axes, &(positions.site(i) + style.offset));
        fig.push_circle(center, style.radii[i], colors[i], style.alpha, style.zorder);
    }
    debug!("plotted {} sites", positions.len());
    Ok(())
}

struct HoppingStyle {
    width: f64,
    color: [u8; 3],
    axes: (Axis, Axis),
    offset: Vector3<f64>,
    alpha: f64,
    zorder: i32,
}

fn parse_hopping_style(options: &OptionMap) -> Result<HoppingStyle> {
    let color = parse_color(options.get_str("color").unwrap_or(DEFAULT_HOPPING_COLOR))?;
    let blend = options.get_f64("blend").unwrap_or(1.0);
    let color = if blend < 1.0 {
        blend_colors(color, [255, 255, 255], blend)
    } else {
        color
    };
    Ok(HoppingStyle {
        width: options.get_f64("width").unwrap_or(DEFAULT_HOPPING_WIDTH),
        color,
        axes: parse_axes(options.get_str("axes").unwrap_or("xy"))?,
        offset: options.get_vector3("offset").unwrap_or_else(Vector3::zeros),
        alpha: options.get_f64("alpha").unwrap_or(1.0),
        zorder: options.get_f64("zorder").unwrap_or(-1.0) as i32,
    })
}

/// Draw hoppings as line segments between connected site pairs.
///
/// A width of zero draws nothing. Hoppings render underneath sites by
/// default (negative `zorder`). Recognized options: `width`, `color`,
/// `offset`, `blend`, `alpha`, `axes`, `zorder`.
pub fn plot_hoppings(
    fig: &mut Figure,
    positions: &Positions,
    hoppings: &CooMatrix<i32>,
    options: &OptionMap,
) -> Result<()> {
    let style = parse_hopping_style(options)?;
    if style.width == 0.0 {
        return Ok(());
    }
    for (row, col, _) in hoppings.triplet_iter() {
        let from = project(style.axes, &(positions.site(row) + style.offset));
        let to = project(style.axes, &(positions.site(col) + style.offset));
        fig.push_segment(from, to, style.width, style.color, style.alpha, style.zorder);
    }
    Ok(())
}

/// Draw boundary hoppings: wraparound segments between a cell and its
/// translated copy. A hopping `(i, j)` is drawn from `p_i + offset + shift`
/// to `p_j + offset`.
pub fn plot_boundary_hoppings(
    fig: &mut Figure,
    positions: &Positions,
    hoppings: &CooMatrix<i32>,
    shift: Vector3<f64>,
    options: &OptionMap,
) -> Result<()> {
    let style = parse_hopping_style(options)?;
    if style.width == 0.0 {
        return Ok(());
    }
    for (row, col, _) in hoppings.triplet_iter() {
        let from = project(style.axes, &(positions.site(row) + style.offset + shift));
        let to = project(style.axes, &(positions.site(col) + style.offset));
        fig.push_segment(from, to, style.width, style.color, style.alpha, style.zorder);
    }
    Ok(())
}

/// Draw the periodic boundaries: semi-transparent translated copies of the
/// structure plus the hoppings that stitch neighboring copies together.
///
/// The translated copies are placed at every distinct shift vector. Shifts
/// are accumulated in a [`FuzzySet`] because the same physical translation
/// can be reached along different periodic paths with small rounding
/// differences; exact comparison would draw the same copy twice.
pub fn plot_periodic_boundaries(
    fig: &mut Figure,
    positions: &Positions,
    hoppings: &CooMatrix<i32>,
    boundaries: &[Boundary],
    data: &[f64],
    num_periods: usize,
    props: &StructureProps,
) -> Result<()> {
    if boundaries.is_empty() || num_periods == 0 {
        return Ok(());
    }

    let mut shifts = FuzzySet::default();
    for boundary in boundaries {
        for n in 1..=num_periods {
            let shift = n as f64 * boundary.shift;
            shifts.add(shift);
            shifts.add(-shift);
        }
    }
    // Corner copies where two periodic directions combine.
    for (i, a) in boundaries.iter().enumerate() {
        for b in &boundaries[i + 1..] {
            for n in 1..=num_periods {
                for m in 1..=num_periods {
                    let (sa, sb) = (n as f64 * a.shift, m as f64 * b.shift);
                    for combined in [sa + sb, sa - sb, -sa + sb, -sa - sb] {
                        shifts.add(combined);
                    }
                }
            }
        }
    }
    debug!("{} distinct periodic shifts", shifts.len());

    for shift in shifts.iter() {
        let copy_opts = options! { "offset" => *shift, "blend" => BOUNDARY_ALPHA };
        let site = with_defaults(Some(&copy_opts), &[&props.site], options! {});
        let hopping = with_defaults(Some(&copy_opts), &[&props.hopping], options! {});
        plot_sites(fig, positions, data, &site)?;
        plot_hoppings(fig, positions, hoppings, &hopping)?;
    }

    let blend_opts = options! { "blend" => BOUNDARY_ALPHA };
    let boundary_props = with_defaults(Some(&blend_opts), &[&props.boundary], options! {});
    for boundary in boundaries {
        for n in 0..num_periods {
            for offset in [
                n as f64 * boundary.shift,
                -((n + 1) as f64) * boundary.shift,
            ] {
                let opts = with_defaults(
                    Some(&options! { "offset" => offset }),
                    &[&boundary_props],
                    options! {},
                );
                plot_boundary_hoppings(fig, positions, &boundary.hoppings, boundary.shift, &opts)?;
            }
        }
    }
    Ok(())
}
