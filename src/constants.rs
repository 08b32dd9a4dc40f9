//! Physical constants and numerical defaults.
//!
//! Lengths are in kiloparsecs, masses in solar masses and times in
//! gigayears; `GAMMA` is the gravitational constant in those units.

/// Gravitational coupling constant in kpc³ / (M☉ · Gyr²).
pub const GAMMA: f64 = 4.498_316_963_439_859_6e-6;

/// Absolute tolerance used by the integration driver.
pub const DEFAULT_ATOL: f64 = 1e-3;

/// Relative tolerance used by the integration driver.
pub const DEFAULT_RTOL: f64 = 1e-3;

/// Step budget for a full run.
pub const DEFAULT_MAX_STEPS: u64 = 1_000_000;

/// Values per body in the flat state vector: x, y, vx, vy.
pub const STRIDE: usize = 4;

/// A pair whose relative position passes closer than this fraction of its
/// own step displacement has stepped through a singularity.
pub const CLOSE_PASSAGE_RATIO: f64 = 0.1;
