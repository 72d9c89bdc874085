//! Plotting for tight-binding lattice models
//!
//! This library renders lattice structures (sites, hoppings, periodic
//! boundaries, leads) and scalar data defined over the lattice sites. It is
//! a thin convenience layer: the plot functions massage site and hopping
//! data into primitives and delegate the actual rendering to a
//! general-purpose plotting backend.

pub mod config;
pub mod figure;
pub mod plot;
pub mod pltutils;
pub mod results;
pub mod structure;
pub mod style;
pub mod utils;

mod _tests_results;
mod _tests_structure;

// ======================== RENDERING CONTEXT ========================
pub use figure::Figure; // struct - retained list of plot primitives plus view state

// ======================== STYLE SHEETS ========================
pub use style::{
    current_style, // fn() -> Style - snapshot of the active global style
    style_scope,   // fn(Style) -> StyleGuard - scoped style, restored on drop
    use_style,     // fn(Style) - replace the active global style
    Style,         // struct - rendering defaults applied to new figures
};

// ======================== RESULT OBJECTS ========================
pub use results::{
    Axis,           // enum - spatial axis selector (X, Y, Z)
    Boundary,       // struct - periodic shift vector + wraparound hoppings
    Positions,      // struct - named x/y/z coordinate arrays
    ScalarField,    // struct - data values mapped to site positions
    StructureField, // struct - ScalarField + hopping graph + boundaries
};

// ======================== STRUCTURE PLOTTING ========================
pub use structure::{
    data_radii,                // fn(&[f64], f64, f64) -> Vec<f64> - magnitude to site radius
    plot_hoppings,             // fn - draw hoppings as line segments
    plot_periodic_boundaries,  // fn - draw translated boundary copies
    plot_sites,                // fn - draw sites as filled discs
    structure_plot_properties, // fn(Option<&OptionMap>) -> StructureProps - option splitting
};

// ======================== COMPOSED PLOTS ========================
pub use plot::{
    plot_lead,              // fn - lead structure with fading repetitions
    plot_system,            // fn - sites + hoppings + periodic boundaries
    plot_system_with_leads, // fn - full model with attached leads
};

// ======================== FIGURE ANNOTATIONS ========================
pub use pltutils::{
    annotate_box, // fn - boxed text label at data coordinates
    colorbar,     // fn - colorbar for the figure's color-mapped data
    legend,       // fn - labeled palette swatches in the plot corner
    set_palette,  // fn - replace the active style's color cycle
};

// ======================== OPTION HANDLING ========================
pub use utils::{
    with_defaults, // fn - layered option merging, caller overrides win
    FuzzySet,      // struct - tolerance-based set of shift vectors
    OptValue,      // enum - single option value
    OptionExt,     // trait - typed access to option maps
    OptionMap,     // type - string-keyed option mapping
};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
