//! Numeric helpers shared by the plotting entry points: color handling,
//! palettes, colormaps and axis-range post-processing.

use anyhow::{anyhow, bail, Result};

use crate::figure::{Figure, LegendEntry};
use crate::options;
use crate::style::{current_style, use_style};
use crate::utils::{with_defaults, OptionExt, OptionMap};

/// Parse a color given as `#rrggbb` hex, a basic color name, or a grayscale
/// level written as a string such as `"0.15"`.
pub fn parse_color(color: &str) -> Result<[u8; 3]> {
    if let Some(hex) = color.strip_prefix('#') {
        if hex.len() != 6 {
            bail!("invalid hex color {:?}", color);
        }
        let value = u32::from_str_radix(hex, 16)
            .map_err(|_| anyhow!("invalid hex color {:?}", color))?;
        return Ok([(value >> 16) as u8, (value >> 8) as u8, value as u8]);
    }

    if let Ok(gray) = color.parse::<f64>() {
        if !(0.0..=1.0).contains(&gray) {
            bail!("grayscale value {:?} outside [0, 1]", color);
        }
        let level = (gray * 255.0).round() as u8;
        return Ok([level, level, level]);
    }

    match color {
        "white" => Ok([255, 255, 255]),
        "black" => Ok([0, 0, 0]),
        "red" => Ok([255, 0, 0]),
        "green" => Ok([0, 128, 0]),
        "blue" => Ok([0, 0, 255]),
        "orange" => Ok([255, 165, 0]),
        "gray" | "grey" => Ok([128, 128, 128]),
        _ => bail!("unknown color {:?}", color),
    }
}

/// Blend `color` with a background color. `factor` 1 keeps the color, 0
/// yields the background.
pub fn blend_colors(color: [u8; 3], bg: [u8; 3], factor: f64) -> [u8; 3] {
    let mut out = [0u8; 3];
    for i in 0..3 {
        let blended = (1.0 - factor) * bg[i] as f64 + factor * color[i] as f64;
        out[i] = blended.round().clamp(0.0, 255.0) as u8;
    }
    out
}

/// Look up a continuous colormap by name.
pub fn colormap(name: &str) -> Result<colorous::Gradient> {
    let gradient = match name {
        "viridis" => colorous::VIRIDIS,
        "inferno" => colorous::INFERNO,
        "magma" => colorous::MAGMA,
        "plasma" => colorous::PLASMA,
        "cividis" => colorous::CIVIDIS,
        "YlGnBu" => colorous::YELLOW_GREEN_BLUE,
        "YlOrRd" => colorous::YELLOW_ORANGE_RED,
        "Blues" => colorous::BLUES,
        "Greens" => colorous::GREENS,
        "Greys" => colorous::GREYS,
        "Oranges" => colorous::ORANGES,
        "Purples" => colorous::PURPLES,
        "Reds" => colorous::REDS,
        "RdBu" => colorous::RED_BLUE,
        "Spectral" => colorous::SPECTRAL,
        _ => bail!("unknown colormap {:?}", name),
    };
    Ok(gradient)
}

/// Get a color palette by name, or the active style's palette when `name` is
/// `None`. Brewer palettes keep their native bin positions; other names are
/// sampled evenly from the continuous colormap of that name. The result is
/// cycled starting from color number `start`.
pub fn get_palette(name: Option<&str>, num_colors: usize, start: usize) -> Result<Vec<[u8; 3]>> {
    let base: Vec<[u8; 3]> = match name {
        None => current_style().palette,
        Some(name) => {
            let brewer: Option<&[colorous::Color]> = match name {
                "Set1" => Some(&colorous::SET1),
                "Set2" => Some(&colorous::SET2),
                "Set3" => Some(&colorous::SET3),
                "Pastel1" => Some(&colorous::PASTEL1),
                "Pastel2" => Some(&colorous::PASTEL2),
                "Accent" => Some(&colorous::ACCENT),
                "Dark2" => Some(&colorous::DARK2),
                "Paired" => Some(&colorous::PAIRED),
                _ => None,
            };
            match brewer {
                Some(colors) => colors
                    .iter()
                    .take(num_colors)
                    .map(|c| [c.r, c.g, c.b])
                    .collect(),
                None => {
                    let gradient = colormap(name)?;
                    // Skip the extreme ends, they are usually too dark/light.
                    (0..num_colors)
                        .map(|i| {
                            let t = (i + 1) as f64 / (num_colors + 1) as f64;
                            let c = gradient.eval_continuous(t);
                            [c.r, c.g, c.b]
                        })
                        .collect()
                }
            }
        }
    };

    if base.is_empty() {
        bail!("empty palette");
    }
    Ok((0..num_colors)
        .map(|i| base[(start + i) % base.len()])
        .collect())
}

/// Replace the active style's color cycle with a palette looked up via
/// [`get_palette`].
pub fn set_palette(name: Option<&str>, num_colors: usize, start: usize) -> Result<()> {
    let palette = get_palette(name, num_colors, start)?;
    let mut style = current_style();
    style.palette = palette;
    use_style(style);
    Ok(())
}

/// Categorical color assignment: the unique values of `data` (sorted) are
/// mapped to `colors` in order, cycling when there are more values than
/// colors. `blend` below 1 blends each color with white first.
pub fn direct_color_map(data: &[f64], colors: &[[u8; 3]], blend: f64) -> Vec<[u8; 3]> {
    let colors: Vec<[u8; 3]> = if blend < 1.0 {
        colors
            .iter()
            .map(|&c| blend_colors(c, [255, 255, 255], blend))
            .collect()
    } else {
        colors.to_vec()
    };

    let mut unique: Vec<f64> = data.to_vec();
    unique.sort_by(|a, b| a.total_cmp(b));
    unique.dedup();

    data.iter()
        .map(|value| {
            let rank = unique.partition_point(|u| u < value);
            colors[rank % colors.len()]
        })
        .collect()
}

/// Widen `range` so it is at least `length` long, preserving the center.
pub fn set_min_axis_length(range: (f64, f64), length: f64) -> (f64, f64) {
    let (min, max) = range;
    if (max - min).abs() < length {
        let center = (max + min) / 2.0;
        (center - length / 2.0, center + length / 2.0)
    } else {
        range
    }
}

/// Grow `range` by a fraction of its current length.
pub fn add_margin(range: (f64, f64), margin: f64) -> (f64, f64) {
    let (min, max) = range;
    set_min_axis_length(range, (max - min).abs() * (1.0 + margin))
}

/// Enforce a minimum ratio between the two axis ranges, widening whichever
/// axis is too short relative to the other.
pub fn set_min_axis_ratio(
    x_range: (f64, f64),
    y_range: (f64, f64),
    ratio: f64,
) -> ((f64, f64), (f64, f64)) {
    let x = (x_range.1 - x_range.0) / 2.0;
    let y = (y_range.1 - y_range.0) / 2.0;

    if y != 0.0 && x / y < ratio {
        let center = (x_range.1 + x_range.0) / 2.0;
        let lim = ratio * y;
        ((center - lim, center + lim), y_range)
    } else if y / x < ratio {
        let center = (y_range.1 + y_range.0) / 2.0;
        let lim = ratio * x;
        (x_range, (center - lim, center + lim))
    } else {
        (x_range, y_range)
    }
}

/// Text alignment for an annotation placed at an offset from its anchor:
/// the label grows away from the anchor point.
pub fn align(x: f64, y: f64) -> (&'static str, &'static str) {
    let horizontal = if x > 0.0 {
        "left"
    } else if x < 0.0 {
        "right"
    } else {
        "center"
    };
    let vertical = if y > 0.0 {
        "bottom"
    } else if y < 0.0 {
        "top"
    } else {
        "center"
    };
    (horizontal, vertical)
}

/// Attach a legend box listing labeled color swatches, drawn in the top
/// right corner of the plot area.
///
/// Without a `palette` option the figure's own color cycle is used, so the
/// swatches line up with the colors [`plot_sites`](crate::structure::plot_sites)
/// assigns to categorical data. Recognized options: `palette`, `start`,
/// `reverse`, `facecolor`.
pub fn legend(fig: &mut Figure, labels: &[&str], options: Option<&OptionMap>) -> Result<()> {
    if labels.is_empty() {
        return Ok(());
    }
    let options = with_defaults(
        options,
        &[],
        options! { "reverse" => false, "facecolor" => "0.98", "start" => 0 },
    );
    let start = options.get_f64("start").unwrap_or(0.0) as usize;
    let facecolor = parse_color(options.get_str("facecolor").unwrap_or("0.98"))?;

    let colors: Vec<[u8; 3]> = match options.get_str("palette") {
        Some(name) => get_palette(Some(name), labels.len(), start)?,
        None => {
            let palette = &fig.style().palette;
            if palette.is_empty() {
                bail!("empty palette");
            }
            (0..labels.len())
                .map(|i| palette[(start + i) % palette.len()])
                .collect()
        }
    };

    let mut entries: Vec<LegendEntry> = labels
        .iter()
        .zip(colors)
        .map(|(&label, color)| LegendEntry {
            label: label.to_string(),
            color,
        })
        .collect();
    if options.get_bool("reverse").unwrap_or(false) {
        entries.reverse();
    }
    fig.set_legend(entries, facecolor);
    Ok(())
}

/// Attach a colorbar for the figure's current mappable (the most recent
/// color-mapped plot). `pad` and `aspect` defaults give a slim bar that
/// hugs the plot area; both can be overridden through `options`.
pub fn colorbar(fig: &mut Figure, label: &str, options: Option<&OptionMap>) -> Result<()> {
    let mappable = fig
        .mappable()
        .ok_or_else(|| anyhow!("no color-mapped plot to attach a colorbar to"))?;
    let options = with_defaults(options, &[], options! { "pad" => 0.02, "aspect" => 28.0 });
    let pad = options.get_f64("pad").unwrap_or(0.02);
    let aspect = options.get_f64("aspect").unwrap_or(28.0);
    fig.set_colorbar(mappable, label, pad, aspect);
    Ok(())
}

/// Annotate the figure with a boxed text label at `xy` (data coordinates).
pub fn annotate_box(fig: &mut Figure, text: &str, xy: (f64, f64), options: Option<&OptionMap>) {
    let options = with_defaults(
        options,
        &[],
        options! { "alpha" => 0.5, "color" => "black" },
    );
    let alpha = options.get_f64("alpha").unwrap_or(0.5);
    let color = options
        .get_str("color")
        .and_then(|c| parse_color(c).ok())
        .unwrap_or([0, 0, 0]);
    fig.push_label(text, xy, color, alpha);
}
