//! State layout shared by the dynamics, the driver and the trajectory.
//!
//! The solver works on one dense `f64` vector with a stride of four values
//! per body:
//!
//! ```text
//! [ S.x, S.y, S.vx, S.vy,  star1.x, star1.y, star1.vx, star1.vy,  ... ]
//!   block 0 (disruptor)    block 1                                block K
//! ```
//!
//! The central mass M sits at the origin and has no block. [`Body`] is the
//! structured view of one block; [`Body::read`] and [`Body::write`] are the
//! only places that know the order of the four values.

use crate::constants::STRIDE;
use crate::error::{SimulationError, SimulationResult};

/// Position and velocity of one body in the plane.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Body {
    /// Position (x, y)
    pub position: [f64; 2],
    /// Velocity (vx, vy)
    pub velocity: [f64; 2],
}

impl Body {
    /// Body at `position` moving with `velocity`.
    pub fn new(position: [f64; 2], velocity: [f64; 2]) -> Self {
        Self { position, velocity }
    }

    /// Decode one stride-4 block.
    pub fn read(block: &[f64]) -> Self {
        Self {
            position: [block[0], block[1]],
            velocity: [block[2], block[3]],
        }
    }

    /// Encode into one stride-4 block.
    pub fn write(&self, block: &mut [f64]) {
        block[0] = self.position[0];
        block[1] = self.position[1];
        block[2] = self.velocity[0];
        block[3] = self.velocity[1];
    }

    /// Distance from the origin.
    pub fn radius(&self) -> f64 {
        let [x, y] = self.position;
        (x * x + y * y).sqrt()
    }

    /// Specific angular momentum about the origin, `x*vy - y*vx`.
    pub fn angular_momentum(&self) -> f64 {
        let [x, y] = self.position;
        let [vx, vy] = self.velocity;
        x * vy - y * vx
    }
}

/// Iterate the blocks of a flat state as [`Body`] records, disruptor first.
pub fn bodies(flat: &[f64]) -> impl ExactSizeIterator<Item = Body> + '_ {
    flat.chunks_exact(STRIDE).map(Body::read)
}

/// Masses of the central galaxy M and the disrupting galaxy S.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Masses {
    /// Central mass M, fixed at the origin
    pub central: f64,
    /// Disrupting mass S
    pub disruptor: f64,
}

impl Masses {
    /// Validated pair of masses; both must be positive and finite.
    pub fn new(central: f64, disruptor: f64) -> SimulationResult<Self> {
        for (name, m) in [("central", central), ("disruptor", disruptor)] {
            if !m.is_finite() || m <= 0.0 {
                return Err(SimulationError::InvalidConfiguration(format!(
                    "{name} mass must be positive and finite, got {m}"
                )));
            }
        }
        Ok(Self { central, disruptor })
    }

    /// M + S
    pub fn total(&self) -> f64 {
        self.central + self.disruptor
    }
}

/// Validated flat state: a positive multiple of four finite values.
#[derive(Debug, Clone, PartialEq)]
pub struct StateVector(Vec<f64>);

impl StateVector {
    /// Wrap a flat vector after checking the layout.
    pub fn from_flat(values: Vec<f64>) -> SimulationResult<Self> {
        let len = values.len();
        let malformed = |reason: String| SimulationError::MalformedStateVector { len, reason };

        if len < STRIDE {
            return Err(malformed("missing the disrupting galaxy block".to_string()));
        }
        if len % STRIDE != 0 {
            return Err(malformed(format!("length is not a multiple of {STRIDE}")));
        }
        if let Some(i) = values.iter().position(|v| !v.is_finite()) {
            return Err(malformed(format!("entry {i} is not finite")));
        }
        Ok(Self(values))
    }

    /// Assemble a state from structured records, disruptor first.
    pub fn from_bodies(disruptor: Body, stars: &[Body]) -> Self {
        let mut values = vec![0.0; STRIDE * (1 + stars.len())];
        let blocks = values.chunks_exact_mut(STRIDE);
        for (body, block) in std::iter::once(&disruptor).chain(stars).zip(blocks) {
            body.write(block);
        }
        Self(values)
    }

    /// Flat view.
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// Unwrap into the flat vector.
    pub fn into_inner(self) -> Vec<f64> {
        self.0
    }

    /// Number of stored values.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false for a validated state; present for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of stars K.
    pub fn star_count(&self) -> usize {
        self.0.len() / STRIDE - 1
    }

    /// The disrupting galaxy's block.
    pub fn disruptor(&self) -> Body {
        Body::read(&self.0[..STRIDE])
    }

    /// Star `n`, counted from 1 as in the flat layout.
    pub fn star(&self, n: usize) -> Option<Body> {
        if n == 0 || n > self.star_count() {
            return None;
        }
        Some(Body::read(&self.0[STRIDE * n..STRIDE * (n + 1)]))
    }

    /// All stars in layout order.
    pub fn stars(&self) -> impl ExactSizeIterator<Item = Body> + '_ {
        bodies(&self.0[STRIDE..])
    }
}

impl TryFrom<Vec<f64>> for StateVector {
    type Error = SimulationError;

    fn try_from(values: Vec<f64>) -> SimulationResult<Self> {
        Self::from_flat(values)
    }
}

impl AsRef<[f64]> for StateVector {
    fn as_ref(&self) -> &[f64] {
        &self.0
    }
}
