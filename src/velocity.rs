//! Initial velocities for stars and for the disrupting galaxy.
//!
//! Stars start on counter-clockwise circular orbits about M. The disrupting
//! galaxy starts at parabolic speed about M + S, moving along a fixed
//! parabola `x = -curvature * y² + vertex_x`.

use serde::Deserialize;

use crate::error::{SimulationError, SimulationResult};

/// Where a position lies relative to the axes.
///
/// Open quadrants resolve the tangent through an angle measured from the
/// y-axis; the four half-axes take the tangent directly since the position
/// ratio is undefined there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// x < 0, y > 0
    UpperLeft,
    /// x < 0, y < 0
    LowerLeft,
    /// x > 0, y < 0
    LowerRight,
    /// x > 0, y > 0
    UpperRight,
    /// x = 0, y > 0
    PositiveY,
    /// x = 0, y < 0
    NegativeY,
    /// x < 0, y = 0
    NegativeX,
    /// x > 0, y = 0
    PositiveX,
}

impl Placement {
    /// Classify a position; `None` at the origin.
    pub fn classify(x: f64, y: f64) -> Option<Self> {
        use std::cmp::Ordering::{Equal, Greater, Less};

        let placement = match (x.partial_cmp(&0.0)?, y.partial_cmp(&0.0)?) {
            (Less, Greater) => Placement::UpperLeft,
            (Less, Less) => Placement::LowerLeft,
            (Greater, Less) => Placement::LowerRight,
            (Greater, Greater) => Placement::UpperRight,
            (Equal, Greater) => Placement::PositiveY,
            (Equal, Less) => Placement::NegativeY,
            (Less, Equal) => Placement::NegativeX,
            (Greater, Equal) => Placement::PositiveX,
            (Equal, Equal) => return None,
        };
        Some(placement)
    }
}

/// Velocity of a counter-clockwise circular orbit of radius `|(x, y)|`
/// about a mass `m` at the origin, with speed `sqrt(gamma * m / r)`.
pub fn circular_velocity(gamma: f64, m: f64, x: f64, y: f64) -> SimulationResult<[f64; 2]> {
    let placement = Placement::classify(x, y).ok_or(SimulationError::OriginPosition)?;

    let r = (x * x + y * y).sqrt();
    let v = (gamma * m / r).sqrt();

    let velocity = match placement {
        Placement::UpperLeft => {
            let theta = (y / x).abs().atan();
            [-v * theta.sin(), -v * theta.cos()]
        }
        Placement::LowerLeft => {
            let theta = (x / y).abs().atan();
            [v * theta.cos(), -v * theta.sin()]
        }
        Placement::LowerRight => {
            let theta = (y / x).abs().atan();
            [v * theta.sin(), v * theta.cos()]
        }
        Placement::UpperRight => {
            let theta = (x / y).abs().atan();
            [-v * theta.cos(), v * theta.sin()]
        }
        Placement::PositiveY => [-v, 0.0],
        Placement::NegativeY => [v, 0.0],
        Placement::NegativeX => [0.0, -v],
        Placement::PositiveX => [0.0, v],
    };
    Ok(velocity)
}

/// Parabolic path `x = -curvature * y² + vertex_x` prescribed for the
/// disrupting galaxy.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApproachPath {
    /// Coefficient of `y²`
    pub curvature: f64,
    /// Closest point of the path on the x-axis
    pub vertex_x: f64,
}

impl Default for ApproachPath {
    fn default() -> Self {
        Self {
            curvature: 0.01,
            vertex_x: 25.0,
        }
    }
}

impl ApproachPath {
    /// Reject a path that has no usable tangent: `curvature` must be finite
    /// and non-zero, `vertex_x` finite.
    pub fn validate(&self) -> SimulationResult<()> {
        if !self.curvature.is_finite() || self.curvature == 0.0 || !self.vertex_x.is_finite() {
            return Err(SimulationError::InvalidConfiguration(format!(
                "approach path needs finite non-zero curvature and finite vertex_x, got {} and {}",
                self.curvature, self.vertex_x
            )));
        }
        Ok(())
    }

    /// `x` on the path for a given `y`.
    pub fn x_at(&self, y: f64) -> f64 {
        -self.curvature * y * y + self.vertex_x
    }

    /// `dx/dy` along the path; `-y/50` for the default path.
    pub fn slope(&self, y: f64) -> f64 {
        -y / (0.5 / self.curvature)
    }

    /// Velocity of the disrupting galaxy at `(x, y)`.
    ///
    /// Speed is `sqrt(2 * gamma * (m + s) / R)`. The direction follows the
    /// path tangent at `y`, heading toward negative y while above the x-axis
    /// and toward positive y below it. At `y == 0` the direction is undefined
    /// and an error is returned.
    pub fn velocity(&self, gamma: f64, m: f64, s: f64, x: f64, y: f64) -> SimulationResult<[f64; 2]> {
        if y == 0.0 {
            return Err(SimulationError::DegenerateOrientation { x, y });
        }

        let big_r = (x * x + y * y).sqrt();
        let v = (2.0 * gamma * (m + s) / big_r).sqrt();
        let theta = (1.0 / self.slope(y)).abs().atan();

        if y > 0.0 {
            Ok([v * theta.cos(), -v * theta.sin()])
        } else {
            Ok([v * theta.cos(), v * theta.sin()])
        }
    }

    /// Evenly spaced points on the path for `y` in `[y_min, y_max]`.
    pub fn sample(&self, y_min: f64, y_max: f64, count: usize) -> Vec<[f64; 2]> {
        match count {
            0 => Vec::new(),
            1 => vec![[self.x_at(y_min), y_min]],
            _ => {
                let dy = (y_max - y_min) / (count - 1) as f64;
                (0..count)
                    .map(|i| {
                        let y = y_min + dy * i as f64;
                        [self.x_at(y), y]
                    })
                    .collect()
            }
        }
    }
}

/// Approach velocity on the default path (`dx/dy = -y/50`).
pub fn approach_velocity(gamma: f64, m: f64, s: f64, x: f64, y: f64) -> SimulationResult<[f64; 2]> {
    ApproachPath::default().velocity(gamma, m, s, x, y)
}
