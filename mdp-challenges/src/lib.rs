pub mod diversity;

/// Absolute tolerance applied to every comparison between objective values.
pub const TOLERANCE: f64 = 0.00001;
