//! The rendering context.
//!
//! A [`Figure`] is an explicit, retained list of primitives in data
//! coordinates plus view state. Plot functions push primitives into it; the
//! backend (plotters) is only touched when the figure is rasterized or saved.
//! This replaces an implicit "current axes" with a value that is passed into
//! every plotting call.

use std::path::Path;

use anyhow::{bail, Context, Result};
use log::debug;
use plotters::coord::cartesian::Cartesian2d;
use plotters::coord::types::RangedCoordf64;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};

use crate::pltutils;
use crate::style::{current_style, Style};

/// A primitive in data coordinates.
#[derive(Debug, Clone)]
pub(crate) enum Element {
    Circle {
        center: (f64, f64),
        /// Radius in data units.
        radius: f64,
        color: [u8; 3],
        alpha: f64,
        zorder: i32,
    },
    Segment {
        from: (f64, f64),
        to: (f64, f64),
        /// Line width in points.
        width: f64,
        color: [u8; 3],
        alpha: f64,
        zorder: i32,
    },
    Label {
        text: String,
        pos: (f64, f64),
        color: [u8; 3],
        /// Opacity of the box drawn behind the text.
        box_alpha: f64,
    },
}

/// The active color-mapped data of a figure, used to attach a colorbar.
#[derive(Debug, Clone, PartialEq)]
pub struct Mappable {
    pub cmap: String,
    pub vmin: f64,
    pub vmax: f64,
}

#[derive(Debug, Clone)]
struct Colorbar {
    mappable: Mappable,
    label: String,
    pad: f64,
    aspect: f64,
}

/// One labeled color swatch in the legend box.
#[derive(Debug, Clone)]
pub(crate) struct LegendEntry {
    pub(crate) label: String,
    pub(crate) color: [u8; 3],
}

#[derive(Debug, Clone)]
struct Legend {
    entries: Vec<LegendEntry>,
    facecolor: [u8; 3],
}

/// A figure holding plot primitives and view state until rendered.
#[derive(Debug, Clone)]
pub struct Figure {
    style: Style,
    elements: Vec<Element>,
    xlabel: Option<String>,
    ylabel: Option<String>,
    aspect_equal: bool,
    margin: Option<f64>,
    min_axis_length: Option<f64>,
    min_axis_ratio: Option<f64>,
    xlim: Option<(f64, f64)>,
    ylim: Option<(f64, f64)>,
    mappable: Option<Mappable>,
    colorbar: Option<Colorbar>,
    legend: Option<Legend>,
}

impl Default for Figure {
    fn default() -> Self {
        Figure::new()
    }
}

impl Figure {
    /// New figure using a snapshot of the active global style.
    pub fn new() -> Self {
        Figure::with_style(current_style())
    }

    pub fn with_style(style: Style) -> Self {
        Figure {
            style,
            elements: Vec::new(),
            xlabel: None,
            ylabel: None,
            aspect_equal: false,
            margin: None,
            min_axis_length: None,
            min_axis_ratio: None,
            xlim: None,
            ylim: None,
            mappable: None,
            colorbar: None,
            legend: None,
        }
    }

    pub fn style(&self) -> &Style {
        &self.style
    }

    pub(crate) fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub(crate) fn push_circle(
        &mut self,
        center: (f64, f64),
        radius: f64,
        color: [u8; 3],
        alpha: f64,
        zorder: i32,
    ) {
        self.elements.push(Element::Circle {
            center,
            radius,
            color,
            alpha,
            zorder,
        });
    }

    pub(crate) fn push_segment(
        &mut self,
        from: (f64, f64),
        to: (f64, f64),
        width: f64,
        color: [u8; 3],
        alpha: f64,
        zorder: i32,
    ) {
        self.elements.push(Element::Segment {
            from,
            to,
            width,
            color,
            alpha,
            zorder,
        });
    }

    pub(crate) fn push_label(&mut self, text: &str, pos: (f64, f64), color: [u8; 3], box_alpha: f64) {
        self.elements.push(Element::Label {
            text: text.to_string(),
            pos,
            color,
            box_alpha,
        });
    }

    pub fn set_xlabel(&mut self, label: &str) {
        self.xlabel = Some(label.to_string());
    }

    pub fn set_ylabel(&mut self, label: &str) {
        self.ylabel = Some(label.to_string());
    }

    /// Force equal data-to-pixel scale on both axes (the longer range wins).
    pub fn set_aspect_equal(&mut self) {
        self.aspect_equal = true;
    }

    /// Grow the final axis ranges by a fraction of their length.
    pub fn add_margin(&mut self, margin: f64) {
        self.margin = Some(margin);
    }

    pub fn set_min_axis_length(&mut self, length: f64) {
        self.min_axis_length = Some(length);
    }

    pub fn set_min_axis_ratio(&mut self, ratio: f64) {
        self.min_axis_ratio = Some(ratio);
    }

    pub fn set_xlim(&mut self, min: f64, max: f64) {
        self.xlim = Some((min, max));
    }

    pub fn set_ylim(&mut self, min: f64, max: f64) {
        self.ylim = Some((min, max));
    }

    /// Record the colormap and data range of the most recent color-mapped
    /// plot, so a colorbar can be attached later.
    pub fn set_mappable(&mut self, cmap: &str, vmin: f64, vmax: f64) {
        self.mappable = Some(Mappable {
            cmap: cmap.to_string(),
            vmin,
            vmax,
        });
    }

    pub fn mappable(&self) -> Option<Mappable> {
        self.mappable.clone()
    }

    pub(crate) fn set_colorbar(&mut self, mappable: Mappable, label: &str, pad: f64, aspect: f64) {
        self.colorbar = Some(Colorbar {
            mappable,
            label: label.to_string(),
            pad,
            aspect,
        });
    }

    pub(crate) fn set_legend(&mut self, entries: Vec<LegendEntry>, facecolor: [u8; 3]) {
        self.legend = Some(Legend { entries, facecolor });
    }

    /// Strip all text from the figure: axis labels, annotations and colorbar
    /// captions. Used by the figure comparison harness to avoid
    /// font-rendering differences between environments.
    pub fn clear_text(&mut self) {
        self.xlabel = None;
        self.ylabel = None;
        self.elements
            .retain(|e| !matches!(e, Element::Label { .. }));
        if let Some(colorbar) = self.colorbar.as_mut() {
            colorbar.label.clear();
        }
        if let Some(legend) = self.legend.as_mut() {
            for entry in &mut legend.entries {
                entry.label.clear();
            }
        }
        self.style.draw_text = false;
    }

    /// Bounding box of all primitives in data coordinates, if any.
    pub(crate) fn data_bounds(&self) -> Option<((f64, f64), (f64, f64))> {
        let mut bounds: Option<((f64, f64), (f64, f64))> = None;
        let mut include = |x: f64, y: f64| {
            let ((x0, x1), (y0, y1)) = bounds.unwrap_or(((x, x), (y, y)));
            bounds = Some(((x0.min(x), x1.max(x)), (y0.min(y), y1.max(y))));
        };
        for element in &self.elements {
            match element {
                Element::Circle { center, .. } => include(center.0, center.1),
                Element::Segment { from, to, .. } => {
                    include(from.0, from.1);
                    include(to.0, to.1);
                }
                Element::Label { pos, .. } => include(pos.0, pos.1),
            }
        }
        bounds
    }

    /// Final axis ranges: data bounds, explicit limits, then the margin,
    /// minimum-length, minimum-ratio and aspect adjustments in that order.
    pub(crate) fn resolve_ranges(&self, plot_w: u32, plot_h: u32) -> ((f64, f64), (f64, f64)) {
        let (mut xr, mut yr) = self.data_bounds().unwrap_or(((0.0, 1.0), (0.0, 1.0)));
        if let Some(xlim) = self.xlim {
            xr = xlim;
        }
        if let Some(ylim) = self.ylim {
            yr = ylim;
        }
        // Collapsed ranges cannot be mapped to pixels.
        if xr.1 - xr.0 <= 0.0 {
            xr = (xr.0 - 0.5, xr.1 + 0.5);
        }
        if yr.1 - yr.0 <= 0.0 {
            yr = (yr.0 - 0.5, yr.1 + 0.5);
        }

        if let Some(margin) = self.margin {
            xr = pltutils::add_margin(xr, margin);
            yr = pltutils::add_margin(yr, margin);
        }
        if let Some(length) = self.min_axis_length {
            xr = pltutils::set_min_axis_length(xr, length);
            yr = pltutils::set_min_axis_length(yr, length);
        }
        if let Some(ratio) = self.min_axis_ratio {
            let (nxr, nyr) = pltutils::set_min_axis_ratio(xr, yr, ratio);
            xr = nxr;
            yr = nyr;
        }
        if self.aspect_equal {
            let scale_x = (xr.1 - xr.0) / plot_w as f64;
            let scale_y = (yr.1 - yr.0) / plot_h as f64;
            if scale_x > scale_y {
                yr = pltutils::set_min_axis_length(yr, scale_x * plot_h as f64);
            } else {
                xr = pltutils::set_min_axis_length(xr, scale_y * plot_w as f64);
            }
        }
        (xr, yr)
    }

    /// Rasterize to a packed RGB buffer of `width_px * height_px` pixels.
    pub fn render_rgb(&self) -> Result<Vec<u8>> {
        let (w, h) = (self.style.width_px, self.style.height_px);
        let mut buffer = vec![0u8; (w * h * 3) as usize];
        {
            let root = BitMapBackend::with_buffer(&mut buffer, (w, h)).into_drawing_area();
            self.render_onto(&root)?;
            root.present()?;
        }
        Ok(buffer)
    }

    /// Save the figure; the backend is picked from the file extension
    /// (`.png` bitmap, `.svg` vector).
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let (w, h) = (self.style.width_px, self.style.height_px);
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        match ext {
            "png" => {
                let root = BitMapBackend::new(path, (w, h)).into_drawing_area();
                self.render_onto(&root)?;
                root.present()
                    .with_context(|| format!("writing {}", path.display()))?;
            }
            "svg" => {
                let root = SVGBackend::new(path, (w, h)).into_drawing_area();
                self.render_onto(&root)?;
                root.present()
                    .with_context(|| format!("writing {}", path.display()))?;
            }
            _ => bail!("unsupported figure format {:?}", ext),
        }
        debug!("saved figure to {}", path.display());
        Ok(())
    }

    fn render_onto<DB>(&self, root: &DrawingArea<DB, Shift>) -> Result<()>
    where
        DB: DrawingBackend,
        DB::ErrorType: 'static,
    {
        let style = &self.style;
        let fg = RGBColor(style.foreground[0], style.foreground[1], style.foreground[2]);
        root.fill(&RGBColor(
            style.background[0],
            style.background[1],
            style.background[2],
        ))?;

        let (w, h) = (style.width_px as i32, style.height_px as i32);
        let text_px = (style.font_size * style.dpi / 72.0).round() as i32;
        let label_space = if style.draw_text { text_px + 6 } else { 0 };

        // Plot rectangle in pixels, leaving room for labels and the colorbar.
        let (px0, mut px1) = (12 + label_space, w - 12);
        let (py0, py1) = (10, h - 12 - label_space);
        let mut colorbar_rect = None;
        if let Some(colorbar) = &self.colorbar {
            let plot_h = (py1 - py0) as f64;
            let bar_w = (plot_h / colorbar.aspect).round().max(4.0) as i32;
            let pad_px = (colorbar.pad * (px1 - px0) as f64).round() as i32;
            let bar_x1 = px1;
            let bar_x0 = bar_x1 - bar_w;
            px1 = bar_x0 - pad_px - 4;
            colorbar_rect = Some((bar_x0, py0, bar_x1, py1));
        }
        if px1 <= px0 || py1 <= py0 {
            bail!("figure too small for its layout");
        }

        let (plot_w, plot_h) = ((px1 - px0) as u32, (py1 - py0) as u32);
        let (xr, yr) = self.resolve_ranges(plot_w, plot_h);
        let px_per_unit = plot_w as f64 / (xr.1 - xr.0);

        let coords = root.apply_coord_spec(Cartesian2d::<RangedCoordf64, RangedCoordf64>::new(
            xr.0..xr.1,
            yr.1..yr.0, // reversed: pixel y grows downward
            (px0..px1, py0..py1),
        ));

        let mut order: Vec<usize> = (0..self.elements.len()).collect();
        order.sort_by_key(|&i| match &self.elements[i] {
            Element::Circle { zorder, .. } | Element::Segment { zorder, .. } => *zorder,
            Element::Label { .. } => i32::MAX,
        });

        let to_pixel = |x: f64, y: f64| -> (i32, i32) {
            let px = px0 as f64 + (x - xr.0) / (xr.1 - xr.0) * (px1 - px0) as f64;
            let py = py0 as f64 + (yr.1 - y) / (yr.1 - yr.0) * (py1 - py0) as f64;
            (px.round() as i32, py.round() as i32)
        };

        for &i in &order {
            match &self.elements[i] {
                Element::Circle {
                    center,
                    radius,
                    color,
                    alpha,
                    ..
                } => {
                    let rgba = RGBColor(color[0], color[1], color[2]).mix(*alpha);
                    let radius_px = (radius * px_per_unit).round().max(1.0) as i32;
                    coords.draw(&Circle::new(
                        *center,
                        radius_px,
                        ShapeStyle {
                            color: rgba,
                            filled: true,
                            stroke_width: 0,
                        },
                    ))?;
                }
                Element::Segment {
                    from,
                    to,
                    width,
                    color,
                    alpha,
                    ..
                } => {
                    let rgba = RGBColor(color[0], color[1], color[2]).mix(*alpha);
                    let width_px = (width * style.dpi / 72.0).round().max(1.0) as u32;
                    coords.draw(&PathElement::new(
                        vec![*from, *to],
                        ShapeStyle {
                            color: rgba,
                            filled: false,
                            stroke_width: width_px,
                        },
                    ))?;
                }
                Element::Label {
                    text,
                    pos,
                    color,
                    box_alpha,
                } => {
                    if !style.draw_text {
                        continue;
                    }
                    let (cx, cy) = to_pixel(pos.0, pos.1);
                    let half_w = (text.chars().count() as i32 * text_px * 3 / 10).max(text_px);
                    let half_h = text_px * 7 / 10;
                    root.draw(&Rectangle::new(
                        [(cx - half_w, cy - half_h), (cx + half_w, cy + half_h)],
                        ShapeStyle {
                            color: WHITE.mix(*box_alpha),
                            filled: true,
                            stroke_width: 0,
                        },
                    ))?;
                    root.draw(&Rectangle::new(
                        [(cx - half_w, cy - half_h), (cx + half_w, cy + half_h)],
                        ShapeStyle {
                            color: fg.mix(1.0),
                            filled: false,
                            stroke_width: 1,
                        },
                    ))?;
                    let text_style = ("sans-serif", text_px as f64)
                        .into_font()
                        .color(&RGBColor(color[0], color[1], color[2]))
                        .pos(Pos::new(HPos::Center, VPos::Center));
                    root.draw(&Text::new(text.clone(), (cx, cy), text_style))?;
                }
            }
        }

        // Despined axis frame: bottom and left edges only.
        let frame_px = (style.line_width * style.dpi / 72.0).round().max(1.0) as u32;
        let frame = ShapeStyle {
            color: fg.mix(1.0),
            filled: false,
            stroke_width: frame_px,
        };
        root.draw(&PathElement::new(vec![(px0, py1), (px1, py1)], frame))?;
        root.draw(&PathElement::new(vec![(px0, py0), (px0, py1)], frame))?;

        if style.draw_text {
            let label_style = ("sans-serif", text_px as f64)
                .into_font()
                .color(&fg)
                .pos(Pos::new(HPos::Center, VPos::Center));
            if let Some(xlabel) = &self.xlabel {
                root.draw(&Text::new(
                    xlabel.clone(),
                    ((px0 + px1) / 2, h - label_space / 2 - 4),
                    label_style.clone(),
                ))?;
            }
            if let Some(ylabel) = &self.ylabel {
                root.draw(&Text::new(
                    ylabel.clone(),
                    (label_space / 2 + 2, (py0 + py1) / 2),
                    label_style,
                ))?;
            }
        }

        if let (Some(colorbar), Some(rect)) = (&self.colorbar, colorbar_rect) {
            self.draw_colorbar(root, colorbar, rect, text_px)?;
        }

        if let Some(legend) = &self.legend {
            if !legend.entries.is_empty() {
                self.draw_legend(root, legend, (px0, py0, px1), text_px)?;
            }
        }

        Ok(())
    }

    /// Legend box in the top right corner of the plot area: one color swatch
    /// per entry, labels beside them when text is enabled.
    fn draw_legend<DB>(
        &self,
        root: &DrawingArea<DB, Shift>,
        legend: &Legend,
        (px0, py0, px1): (i32, i32, i32),
        text_px: i32,
    ) -> Result<()>
    where
        DB: DrawingBackend,
        DB::ErrorType: 'static,
    {
        let swatch_r = (text_px * 2 / 5).max(3);
        let row_h = (text_px + 6).max(swatch_r * 2 + 4);
        let max_chars = legend
            .entries
            .iter()
            .map(|e| e.label.chars().count())
            .max()
            .unwrap_or(0) as i32;
        let text_w = if self.style.draw_text && max_chars > 0 {
            max_chars * text_px * 3 / 5 + 6
        } else {
            0
        };
        let box_w = swatch_r * 2 + 10 + text_w;
        let bx1 = px1 - 6;
        let bx0 = (bx1 - box_w).max(px0 + 2);
        let by0 = py0 + 6;
        let by1 = by0 + legend.entries.len() as i32 * row_h + 6;

        // Frameless light background, like the house legend style.
        let bg = RGBColor(legend.facecolor[0], legend.facecolor[1], legend.facecolor[2]);
        root.draw(&Rectangle::new(
            [(bx0, by0), (bx1, by1)],
            ShapeStyle {
                color: bg.mix(1.0),
                filled: true,
                stroke_width: 0,
            },
        ))?;

        let fg = RGBColor(
            self.style.foreground[0],
            self.style.foreground[1],
            self.style.foreground[2],
        );
        for (i, entry) in legend.entries.iter().enumerate() {
            let cy = by0 + 3 + i as i32 * row_h + row_h / 2;
            let cx = bx0 + 5 + swatch_r;
            root.draw(&Circle::new(
                (cx, cy),
                swatch_r,
                ShapeStyle {
                    color: RGBColor(entry.color[0], entry.color[1], entry.color[2]).mix(1.0),
                    filled: true,
                    stroke_width: 0,
                },
            ))?;
            if self.style.draw_text && !entry.label.is_empty() {
                let text_style = ("sans-serif", text_px as f64)
                    .into_font()
                    .color(&fg)
                    .pos(Pos::new(HPos::Left, VPos::Center));
                root.draw(&Text::new(
                    entry.label.clone(),
                    (cx + swatch_r + 6, cy),
                    text_style,
                ))?;
            }
        }
        Ok(())
    }

    fn draw_colorbar<DB>(
        &self,
        root: &DrawingArea<DB, Shift>,
        colorbar: &Colorbar,
        rect: (i32, i32, i32, i32),
        text_px: i32,
    ) -> Result<()>
    where
        DB: DrawingBackend,
        DB::ErrorType: 'static,
    {
        let (bx0, by0, bx1, by1) = rect;
        let gradient = pltutils::colormap(&colorbar.mappable.cmap)?;
        let height = (by1 - by0).max(1);
        for row in 0..height {
            // Top of the bar is the maximum of the data range.
            let t = 1.0 - row as f64 / height as f64;
            let c = gradient.eval_continuous(t);
            root.draw(&Rectangle::new(
                [(bx0, by0 + row), (bx1, by0 + row + 1)],
                ShapeStyle {
                    color: RGBColor(c.r, c.g, c.b).mix(1.0),
                    filled: true,
                    stroke_width: 0,
                },
            ))?;
        }
        let fg = RGBColor(
            self.style.foreground[0],
            self.style.foreground[1],
            self.style.foreground[2],
        );
        root.draw(&Rectangle::new(
            [(bx0, by0), (bx1, by1)],
            ShapeStyle {
                color: fg.mix(1.0),
                filled: false,
                stroke_width: 1,
            },
        ))?;
        if self.style.draw_text && !colorbar.label.is_empty() {
            let label_style = ("sans-serif", text_px as f64)
                .into_font()
                .color(&fg)
                .pos(Pos::new(HPos::Center, VPos::Bottom));
            root.draw(&Text::new(
                colorbar.label.clone(),
                ((bx0 + bx1) / 2, by0 - 2),
                label_style,
            ))?;
        }
        Ok(())
    }
}
