// Constants

// Tolerances
pub const SHIFT_RTOL: f64 = 1e-3; // Relative tolerance for periodic shift deduplication
pub const SHIFT_ATOL: f64 = 1e-5; // Absolute tolerance for periodic shift deduplication
pub const DATA_ATOL: f64 = 1e-8; // Absolute tolerance for degenerate data-range checks

// Structure plot defaults
pub const DEFAULT_SITE_RADIUS: f64 = 0.025;
pub const DEFAULT_SITE_ALPHA: f64 = 0.95;
pub const DEFAULT_HOPPING_WIDTH: f64 = 1.0;
pub const DEFAULT_HOPPING_COLOR: &str = "#666666";
pub const DEFAULT_BOUNDARY_COLOR: &str = "red";
pub const BOUNDARY_ALPHA: f64 = 0.5;

// Figure decoration defaults
pub const DEFAULT_MARGIN: f64 = 0.08;
pub const MIN_AXIS_LENGTH: f64 = 0.5;
pub const MIN_AXIS_RATIO: f64 = 0.4;
