//! Value objects pairing computed site data with structure geometry.
//!
//! A [`ScalarField`] maps one value to every lattice site; a
//! [`StructureField`] additionally carries the hopping graph and periodic
//! boundaries, so the data can be drawn on top of the full structure.

use anyhow::{bail, Result};
use nalgebra::Vector3;
use nalgebra_sparse::CooMatrix;

use crate::config::{BOUNDARY_ALPHA, DATA_ATOL};
use crate::figure::Figure;
use crate::structure::{
    data_radii, plot_hoppings, plot_periodic_boundaries, plot_sites, structure_plot_properties,
};
use crate::options;
use crate::utils::{with_defaults, OptionExt, OptionMap};

/// Spatial axis selector used for cropping and projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub fn from_char(c: char) -> Result<Axis> {
        match c {
            'x' => Ok(Axis::X),
            'y' => Ok(Axis::Y),
            'z' => Ok(Axis::Z),
            _ => bail!("unknown axis {:?}", c),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
        }
    }
}

/// Named bundle of site coordinate arrays. Fields are private so the
/// equal-lengths invariant checked at construction cannot be bypassed.
#[derive(Debug, Clone, PartialEq)]
pub struct Positions {
    x: Vec<f64>,
    y: Vec<f64>,
    z: Vec<f64>,
}

impl Positions {
    pub fn new(x: Vec<f64>, y: Vec<f64>, z: Vec<f64>) -> Result<Self> {
        if x.len() != y.len() || x.len() != z.len() {
            bail!(
                "coordinate arrays differ in length: {} / {} / {}",
                x.len(),
                y.len(),
                z.len()
            );
        }
        Ok(Positions { x, y, z })
    }

    pub fn from_sites(sites: &[Vector3<f64>]) -> Self {
        Positions {
            x: sites.iter().map(|s| s.x).collect(),
            y: sites.iter().map(|s| s.y).collect(),
            z: sites.iter().map(|s| s.z).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    pub fn site(&self, index: usize) -> Vector3<f64> {
        Vector3::new(self.x[index], self.y[index], self.z[index])
    }

    pub fn x(&self) -> &[f64] {
        &self.x
    }

    pub fn y(&self) -> &[f64] {
        &self.y
    }

    pub fn z(&self) -> &[f64] {
        &self.z
    }

    pub fn axis(&self, axis: Axis) -> &[f64] {
        match axis {
            Axis::X => &self.x,
            Axis::Y => &self.y,
            Axis::Z => &self.z,
        }
    }

    fn filtered(&self, keep: &[bool]) -> Positions {
        let pick = |v: &[f64]| -> Vec<f64> {
            v.iter()
                .zip(keep)
                .filter_map(|(value, &k)| k.then_some(*value))
                .collect()
        };
        Positions {
            x: pick(&self.x),
            y: pick(&self.y),
            z: pick(&self.z),
        }
    }
}

/// A spatially dependent scalar: one data value per site position.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarField {
    data: Vec<f64>,
    positions: Positions,
    sublattices: Vec<i32>,
}

impl ScalarField {
    /// `sublattices` defaults to all-zero when not given. All arrays must
    /// have the same length.
    pub fn new(data: Vec<f64>, positions: Positions, sublattices: Option<Vec<i32>>) -> Result<Self> {
        let n = positions.len();
        if data.len() != n {
            bail!("data length {} does not match {} sites", data.len(), n);
        }
        let sublattices = sublattices.unwrap_or_else(|| vec![0; n]);
        if sublattices.len() != n {
            bail!(
                "sublattice length {} does not match {} sites",
                sublattices.len(),
                n
            );
        }
        Ok(ScalarField {
            data,
            positions,
            sublattices,
        })
    }

    pub fn num_sites(&self) -> usize {
        self.data.len()
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn positions(&self) -> &Positions {
        &self.positions
    }

    pub fn sublattices(&self) -> &[i32] {
        &self.sublattices
    }

    pub fn x(&self) -> &[f64] {
        &self.positions.x
    }

    pub fn y(&self) -> &[f64] {
        &self.positions.y
    }

    pub fn z(&self) -> &[f64] {
        &self.positions.z
    }

    /// Keep the sites where `keep` is true. All four arrays are filtered
    /// uniformly.
    pub fn masked(&self, keep: &[bool]) -> ScalarField {
        assert_eq!(keep.len(), self.num_sites(), "mask length mismatch");
        ScalarField {
            data: filter_values(&self.data, keep),
            positions: self.positions.filtered(keep),
            sublattices: filter_values(&self.sublattices, keep),
        }
    }

    /// Keep the sites at the given indices. Errors on an index past the
    /// last site.
    pub fn select(&self, indices: &[usize]) -> Result<ScalarField> {
        Ok(self.masked(&indices_to_mask(indices, self.num_sites())?))
    }

    /// Retain only the sites within the given half-open axis ranges
    /// (`lo <= v < hi`).
    pub fn cropped(&self, limits: &[(Axis, f64, f64)]) -> ScalarField {
        self.masked(&crop_mask(&self.positions, limits))
    }

    /// Clamp the data values to `[v_min, v_max]`; positions are unchanged.
    pub fn clipped(&self, v_min: f64, v_max: f64) -> ScalarField {
        ScalarField {
            data: self.data.iter().map(|v| v.clamp(v_min, v_max)).collect(),
            positions: self.positions.clone(),
            sublattices: self.sublattices.clone(),
        }
    }

    /// Color plot of the xy plane: sites drawn as color-mapped discs over the
    /// data range. Registers the colormap with the figure for a colorbar.
    pub fn plot_pcolor(&self, fig: &mut Figure, options: Option<&OptionMap>) -> Result<()> {
        let cmap = fig.style().cmap.clone();
        let options = with_defaults(options, &[], options! { "cmap" => cmap, "radius" => 0.05 });
        plot_sites(fig, &self.positions, &self.data, &options)?;
        if let Some(cmap) = options.get_str("cmap") {
            let (vmin, vmax) = data_range(&self.data);
            fig.set_mappable(cmap, vmin, vmax);
        }
        fig.set_aspect_equal();
        fig.set_xlabel("x");
        fig.set_ylabel("y");
        Ok(())
    }
}

/// A periodic wraparound edge set, pairing a translation vector with the
/// adjacency of the hoppings that cross the boundary.
#[derive(Debug, Clone)]
pub struct Boundary {
    pub shift: Vector3<f64>,
    pub hoppings: CooMatrix<i32>,
}

/// A [`ScalarField`] that also includes the hoppings between sites and any
/// periodic boundaries.
#[derive(Debug, Clone)]
pub struct StructureField {
    field: ScalarField,
    hoppings: CooMatrix<i32>,
    boundaries: Vec<Boundary>,
}

impl StructureField {
    pub fn new(
        data: Vec<f64>,
        positions: Positions,
        sublattices: Option<Vec<i32>>,
        hoppings: CooMatrix<i32>,
        boundaries: Vec<Boundary>,
    ) -> Result<Self> {
        let field = ScalarField::new(data, positions, sublattices)?;
        let n = field.num_sites();
        if hoppings.nrows() != n || hoppings.ncols() != n {
            bail!(
                "hopping matrix is {}x{}, expected {}x{}",
                hoppings.nrows(),
                hoppings.ncols(),
                n,
                n
            );
        }
        for (i, boundary) in boundaries.iter().enumerate() {
            if boundary.hoppings.nrows() != n || boundary.hoppings.ncols() != n {
                bail!("boundary {} adjacency does not match {} sites", i, n);
            }
        }
        Ok(StructureField {
            field,
            hoppings,
            boundaries,
        })
    }

    pub fn num_sites(&self) -> usize {
        self.field.num_sites()
    }

    pub fn data(&self) -> &[f64] {
        self.field.data()
    }

    pub fn positions(&self) -> &Positions {
        self.field.positions()
    }

    pub fn sublattices(&self) -> &[i32] {
        self.field.sublattices()
    }

    pub fn hoppings(&self) -> &CooMatrix<i32> {
        &self.hoppings
    }

    pub fn boundaries(&self) -> &[Boundary] {
        &self.boundaries
    }

    /// Just the scalar-field subset, without the hopping structure.
    pub fn spatial_field(&self) -> ScalarField {
        self.field.clone()
    }

    /// Keep the sites where `keep` is true. Adjacency entries survive iff
    /// both endpoints are retained; indices are remapped to the compacted
    /// numbering. Explicitly stored zero-valued hopping IDs are preserved:
    /// the walk is over stored entries, so a zero value is kept like any
    /// other.
    pub fn masked(&self, keep: &[bool]) -> StructureField {
        assert_eq!(keep.len(), self.num_sites(), "mask length mismatch");
        let remap = compact_index(keep);
        StructureField {
            field: self.field.masked(keep),
            hoppings: filter_adjacency(&self.hoppings, keep, &remap),
            boundaries: self
                .boundaries
                .iter()
                .map(|b| Boundary {
                    shift: b.shift,
                    hoppings: filter_adjacency(&b.hoppings, keep, &remap),
                })
                .collect(),
        }
    }

    /// Keep the sites at the given indices. Errors on an index past the
    /// last site.
    pub fn select(&self, indices: &[usize]) -> Result<StructureField> {
        Ok(self.masked(&indices_to_mask(indices, self.num_sites())?))
    }

    /// Retain only the sites within the given half-open axis ranges.
    pub fn cropped(&self, limits: &[(Axis, f64, f64)]) -> StructureField {
        self.masked(&crop_mask(self.positions(), limits))
    }

    /// Clamp the data values; structure is unchanged.
    pub fn clipped(&self, v_min: f64, v_max: f64) -> StructureField {
        StructureField {
            field: self.field.clipped(v_min, v_max),
            hoppings: self.hoppings.clone(),
            boundaries: self.boundaries.clone(),
        }
    }

    /// Plot the structure with both site size and color showing the data.
    ///
    /// Defaults: colormap `YlGnBu`, site radius scaled into `(0.03, 0.05)`
    /// by data magnitude, hoppings in light gray underneath, boundary copies
    /// semi-transparent. Recognized options: `cmap`, `site_radius` (two
    /// floats), `num_periods`, plus everything
    /// [`structure_plot_properties`](crate::structure::structure_plot_properties)
    /// accepts.
    pub fn plot(&self, fig: &mut Figure, options: Option<&OptionMap>) -> Result<()> {
        let options = with_defaults(
            options,
            &[],
            options! { "cmap" => "YlGnBu", "site_radius" => vec![0.03, 0.05], "num_periods" => 1 },
        );
        let cmap = options.get_str("cmap").unwrap_or("YlGnBu").to_string();
        let radius_range = options.get_floats("site_radius").unwrap_or(&[0.03, 0.05]);
        let (r_min, r_max) = match radius_range {
            &[r_min, r_max] => (r_min, r_max),
            _ => bail!(
                "site_radius expects two values, got {}",
                radius_range.len()
            ),
        };
        let num_periods = options.get_f64("num_periods").unwrap_or(1.0) as usize;

        let mut props = structure_plot_properties(Some(&options))?;
        props.site = with_defaults(
            Some(&props.site),
            &[],
            options! { "radius" => data_radii(self.data(), r_min, r_max), "cmap" => cmap.clone() },
        );
        props.hopping = with_defaults(Some(&props.hopping), &[], options! { "color" => "#bbbbbb" });

        plot_hoppings(fig, self.positions(), &self.hoppings, &props.hopping)?;
        plot_sites(fig, self.positions(), self.data(), &props.site)?;

        props.site.insert("alpha".to_string(), BOUNDARY_ALPHA.into());
        props
            .hopping
            .insert("alpha".to_string(), BOUNDARY_ALPHA.into());
        plot_periodic_boundaries(
            fig,
            self.positions(),
            &self.hoppings,
            &self.boundaries,
            self.data(),
            num_periods,
            &props,
        )?;

        let (vmin, vmax) = data_range(self.data());
        fig.set_mappable(&cmap, vmin, vmax);
        fig.set_aspect_equal();
        fig.set_xlabel("x");
        fig.set_ylabel("y");
        let margin = fig.style().margin;
        fig.add_margin(margin);
        Ok(())
    }
}

fn data_range(data: &[f64]) -> (f64, f64) {
    let vmin = data.iter().cloned().fold(f64::INFINITY, f64::min);
    let vmax = data.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    if !vmin.is_finite() || !vmax.is_finite() || (vmax - vmin).abs() <= DATA_ATOL {
        // Degenerate range: pick something drawable.
        let center = if vmin.is_finite() { vmin } else { 0.0 };
        (center - 0.5, center + 0.5)
    } else {
        (vmin, vmax)
    }
}

fn filter_values<T: Copy>(values: &[T], keep: &[bool]) -> Vec<T> {
    values
        .iter()
        .zip(keep)
        .filter_map(|(v, &k)| k.then_some(*v))
        .collect()
}

fn indices_to_mask(indices: &[usize], len: usize) -> Result<Vec<bool>> {
    let mut mask = vec![false; len];
    for &i in indices {
        if i >= len {
            bail!("site index {} out of range for {} sites", i, len);
        }
        mask[i] = true;
    }
    Ok(mask)
}

fn crop_mask(positions: &Positions, limits: &[(Axis, f64, f64)]) -> Vec<bool> {
    let mut mask = vec![true; positions.len()];
    for &(axis, lo, hi) in limits {
        let values = positions.axis(axis);
        for (m, &v) in mask.iter_mut().zip(values) {
            *m = *m && v >= lo && v < hi;
        }
    }
    mask
}

fn compact_index(keep: &[bool]) -> Vec<Option<usize>> {
    let mut next = 0;
    keep.iter()
        .map(|&k| {
            if k {
                let index = next;
                next += 1;
                Some(index)
            } else {
                None
            }
        })
        .collect()
}

fn filter_adjacency(
    matrix: &CooMatrix<i32>,
    keep: &[bool],
    remap: &[Option<usize>],
) -> CooMatrix<i32> {
    let n = keep.iter().filter(|&&k| k).count();
    let mut filtered = CooMatrix::new(n, n);
    for (row, col, &value) in matrix.triplet_iter() {
        if let (Some(new_row), Some(new_col)) = (remap[row], remap[col]) {
            filtered.push(new_row, new_col, value);
        }
    }
    filtered
}
