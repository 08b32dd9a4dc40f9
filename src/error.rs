//! Error types for simulation runs

use std::fmt;

use thiserror::Error;

use crate::solver::IntegrationError;

/// Result type for simulation operations
pub type SimulationResult<T> = Result<T, SimulationError>;

/// Which pair of bodies coincides when a force becomes singular.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coincidence {
    /// Star `n` (1-based) sits on the central mass
    StarAtOrigin(usize),
    /// Star `n` (1-based) sits on the disrupting galaxy
    StarAtDisruptor(usize),
    /// The disrupting galaxy sits on the central mass
    DisruptorAtOrigin,
    /// The derivative blew up between samples; the pair is not known
    Unresolved,
}

impl fmt::Display for Coincidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Coincidence::StarAtOrigin(n) => write!(f, "star {n} at the central mass"),
            Coincidence::StarAtDisruptor(n) => write!(f, "star {n} at the disrupting galaxy"),
            Coincidence::DisruptorAtOrigin => write!(f, "disrupting galaxy at the central mass"),
            Coincidence::Unresolved => write!(f, "non-finite acceleration"),
        }
    }
}

/// Errors that can occur while seeding or running a simulation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulationError {
    /// A distance in the force law reached zero
    #[error("singular force ({coincidence}) at t = {t}, last completed sample {last_sample}")]
    SingularForce {
        /// Bodies involved
        coincidence: Coincidence,
        /// Time at which the singularity was met
        t: f64,
        /// Index of the last trajectory row that was produced
        last_sample: usize,
    },

    /// Approach velocity requested with y exactly zero
    #[error("approach direction undefined at ({x}, {y}): y must be non-zero")]
    DegenerateOrientation {
        /// Position x of the disrupting galaxy
        x: f64,
        /// Position y of the disrupting galaxy
        y: f64,
    },

    /// Circular velocity requested at the origin
    #[error("circular orbit undefined at the origin")]
    OriginPosition,

    /// Initial state vector does not follow the stride-4 layout
    #[error("malformed state vector of length {len}: {reason}")]
    MalformedStateVector {
        /// Length that was supplied
        len: usize,
        /// What is wrong with it
        reason: String,
    },

    /// The adaptive solver could not meet its tolerances
    #[error("solver did not converge at t = {t}, last completed sample {last_sample}: {source}")]
    SolverNonConvergence {
        /// Time at which the solver gave up
        t: f64,
        /// Index of the last trajectory row that was produced
        last_sample: usize,
        /// Underlying solver failure
        #[source]
        source: IntegrationError,
    },

    /// Masses, time grid or tolerances out of range
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}
