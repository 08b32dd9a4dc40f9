//! # galaxy-encounter: restricted simulation of a galaxy flyby
//!
//! A disrupting galaxy S passes a central galaxy M that is pinned at the
//! origin. The stars of M are massless test particles, so the only forces
//! are M and S acting on the stars, and M acting on S. The result is a time
//! series of positions and velocities for S and every star.
//!
//! ## Pieces
//!
//! - [`velocity`]: circular-orbit velocities for stars, parabolic approach
//!   velocity for S
//! - [`dynamics`]: the equations of motion as a flat-vector derivative
//! - [`driver`]: time grid, trajectory, and the adaptive integration loop
//! - [`solver`]: the Runge-Kutta-Fehlberg 7(8) integrator underneath
//! - [`config`]: YAML scenarios and initial-condition assembly
//! - [`frame`]: centre-of-mass views for display
//!
//! ## Basic Usage
//!
//! ```rust
//! use galaxy_encounter::{circular_velocity, solve, Masses, GAMMA};
//!
//! let masses = Masses::new(1e11, 2e10).unwrap();
//!
//! // S on a circular orbit about M + S, one star on a circular orbit about M
//! let [svx, svy] = circular_velocity(GAMMA, masses.total(), 50.0, 0.0).unwrap();
//! let [vx, vy] = circular_velocity(GAMMA, masses.central, 25.0, 0.0).unwrap();
//! let initial = [50.0, 0.0, svx, svy, 25.0, 0.0, vx, vy];
//!
//! let trajectory = solve(&initial, 1.0, 2, masses).unwrap();
//! assert_eq!(trajectory.len(), 2);
//! assert_eq!(trajectory.row(0), Some(&initial[..]));
//! ```
//!
//! ## State layout
//!
//! Every state vector is `4 * (1 + K)` values for K stars: S first, then each
//! star, each block being `x, y, vx, vy`. See [`state`].
//!
//! ## Tolerances
//!
//! Runs use absolute and relative tolerances of `1e-3` by default. The error
//! norm is the largest `|err| / (atol + rtol * |y|)` over all components, so
//! positions in kpc and velocities in kpc/Gyr are controlled together.
//!
//! ## References
//!
//! 1. Fehlberg, E. (1968). "Classical Fifth-, Sixth-, Seventh-, and
//!    Eighth-Order Runge-Kutta Formulas with Stepsize Control".
//!    NASA TR R-287.
//!
//! 2. Toomre, A. & Toomre, J. (1972). "Galactic Bridges and Tails".
//!    ApJ 178, 623.

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod coefficients;
pub mod config;
pub mod constants;
pub mod driver;
pub mod dynamics;
pub mod error;
pub mod frame;
pub mod solver;
pub mod state;
pub mod velocity;

pub use config::{load_scenario, ConfigError, Launch, Scenario, ScenarioConfig};
pub use constants::GAMMA;
pub use driver::{solve, Integrator, TimeGrid, Trajectory};
pub use dynamics::{derivatives, find_coincidence, swept_coincidence, RestrictedEncounter};
pub use error::{Coincidence, SimulationError, SimulationResult};
pub use frame::center_of_mass;
pub use solver::{
    IntegrationError, OdeSystem, Reached, Rkf78, Stats, StepController, StepMonitor, StepResult,
    StepVerdict, Tolerances,
};
pub use state::{Body, Masses, StateVector};
pub use velocity::{approach_velocity, circular_velocity, ApproachPath, Placement};
