//! Scenario files and initial-condition assembly.
//!
//! A scenario is a YAML document with the run parameters, where the
//! disrupting galaxy starts and how it is launched, and where the stars
//! start. Star velocities are always circular about M.
//!
//! ```yaml
//! parameters:
//!   central_mass: 1.0e11
//!   disruptor_mass: 2.0e10
//!   max_time: 6.0
//!   sample_count: 240
//!
//! disruptor:
//!   position: [-11.0, -60.0]
//!   launch: approach          # approach | circular | explicit (with `velocity`)
//!
//! stars:
//!   points:
//!     - [25.0, 0.0]
//!   rings:
//!     - { radius: 10.0, count: 12 }
//!     - { radius: 15.0, count: 18, phase: 0.1 }
//! ```
//!
//! Stars are laid out with the explicit points first, then each ring in
//! order, counter-clockwise from its phase angle.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::Deserialize;

use crate::constants::{DEFAULT_ATOL, DEFAULT_MAX_STEPS, DEFAULT_RTOL, GAMMA};
use crate::driver::{Integrator, TimeGrid, Trajectory};
use crate::dynamics::RestrictedEncounter;
use crate::error::{SimulationError, SimulationResult};
use crate::solver::Tolerances;
use crate::state::{Body, Masses, StateVector};
use crate::velocity::{circular_velocity, ApproachPath};

/// Numerical and physical parameters of a run
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ParametersConfig {
    /// Mass of the central galaxy M
    pub central_mass: f64,
    /// Mass of the disrupting galaxy S
    pub disruptor_mass: f64,
    /// Last sample time
    pub max_time: f64,
    /// Number of samples including t = 0
    pub sample_count: usize,
    /// Gravitational coupling constant
    #[serde(default = "default_gamma")]
    pub gamma: f64,
    /// Absolute error tolerance
    #[serde(default = "default_atol")]
    pub atol: f64,
    /// Relative error tolerance
    #[serde(default = "default_rtol")]
    pub rtol: f64,
    /// Step budget for the whole run
    #[serde(default = "default_max_steps")]
    pub max_steps: u64,
}

fn default_gamma() -> f64 {
    GAMMA
}

fn default_atol() -> f64 {
    DEFAULT_ATOL
}

fn default_rtol() -> f64 {
    DEFAULT_RTOL
}

fn default_max_steps() -> u64 {
    DEFAULT_MAX_STEPS
}

/// How the disrupting galaxy's initial velocity is chosen
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Launch {
    /// Parabolic speed along the approach path
    #[default]
    Approach,
    /// Circular orbit about M + S
    Circular,
    /// Velocity taken from [`DisruptorConfig::velocity`]
    Explicit,
}

/// Initial placement of the disrupting galaxy
#[derive(Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DisruptorConfig {
    /// Initial position
    pub position: [f64; 2],
    /// Velocity rule
    #[serde(default)]
    pub launch: Launch,
    /// Velocity components for [`Launch::Explicit`]
    #[serde(default)]
    pub velocity: Option<[f64; 2]>,
}

/// Stars evenly spaced on a circle about M
#[derive(Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RingConfig {
    /// Circle radius
    pub radius: f64,
    /// Number of stars on the ring
    pub count: usize,
    /// Angle of the first star, radians from the +x axis
    #[serde(default)]
    pub phase: f64,
}

impl RingConfig {
    /// Star positions, counter-clockwise from `phase`.
    pub fn positions(&self) -> impl Iterator<Item = [f64; 2]> + '_ {
        let step = std::f64::consts::TAU / self.count.max(1) as f64;
        (0..self.count).map(move |k| {
            let angle = self.phase + step * k as f64;
            [self.radius * angle.cos(), self.radius * angle.sin()]
        })
    }
}

/// Star population
#[derive(Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct StarsConfig {
    /// Individual star positions
    #[serde(default)]
    pub points: Vec<[f64; 2]>,
    /// Rings of stars
    #[serde(default)]
    pub rings: Vec<RingConfig>,
}

impl StarsConfig {
    /// All star positions in layout order.
    pub fn positions(&self) -> Vec<[f64; 2]> {
        self.points
            .iter()
            .copied()
            .chain(self.rings.iter().flat_map(RingConfig::positions))
            .collect()
    }
}

/// Top-level scenario loaded from YAML
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Run parameters
    pub parameters: ParametersConfig,
    /// Disrupting galaxy
    pub disruptor: DisruptorConfig,
    /// Approach path used by [`Launch::Approach`]
    #[serde(default)]
    pub path: ApproachPath,
    /// Star population
    #[serde(default)]
    pub stars: StarsConfig,
}

/// Everything needed to start a run, validated
#[derive(Debug, Clone, PartialEq)]
pub struct Scenario {
    /// Force model with its coupling constant and masses
    pub model: RestrictedEncounter,
    /// Sample times
    pub grid: TimeGrid,
    /// Solver settings
    pub integrator: Integrator,
    /// Initial condition
    pub initial: StateVector,
    /// Approach path, kept for overlays
    pub path: ApproachPath,
}

impl Scenario {
    /// Integrate the scenario.
    pub fn run(&self) -> SimulationResult<Trajectory> {
        self.integrator.propagate(&self.model, &self.initial, &self.grid)
    }
}

/// Read and parse a scenario file.
pub fn load_scenario(path: &Path) -> Result<ScenarioConfig, ConfigError> {
    let file = File::open(path)?;
    Ok(serde_yaml::from_reader(BufReader::new(file))?)
}

/// Failures while reading a scenario file
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be opened
    #[error("cannot read scenario: {0}")]
    Io(#[from] std::io::Error),
    /// File is not a valid scenario
    #[error("cannot parse scenario: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl ScenarioConfig {
    /// Parse a scenario from a YAML string.
    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Validate the parameters and assemble the initial state vector.
    pub fn build(&self) -> SimulationResult<Scenario> {
        let p = &self.parameters;
        let masses = Masses::new(p.central_mass, p.disruptor_mass)?;
        if !p.gamma.is_finite() || p.gamma <= 0.0 {
            return Err(SimulationError::InvalidConfiguration(format!(
                "gamma must be positive and finite, got {}",
                p.gamma
            )));
        }
        let tolerances = Tolerances::new(p.atol, p.rtol);
        if !(p.atol > 0.0 && p.atol.is_finite() && p.rtol >= 0.0 && p.rtol.is_finite()) {
            return Err(SimulationError::InvalidConfiguration(format!(
                "tolerances must be finite with atol > 0 and rtol >= 0, got {tolerances:?}"
            )));
        }
        let grid = TimeGrid::new(p.max_time, p.sample_count)?;
        self.path.validate()?;
        if self.disruptor.launch != Launch::Explicit && self.disruptor.velocity.is_some() {
            return Err(SimulationError::InvalidConfiguration(
                "disruptor.velocity is only used with launch: explicit".to_string(),
            ));
        }

        let [sx, sy] = self.disruptor.position;
        let velocity = match self.disruptor.launch {
            Launch::Approach => self.path.velocity(p.gamma, masses.central, masses.disruptor, sx, sy)?,
            Launch::Circular => circular_velocity(p.gamma, masses.total(), sx, sy)?,
            Launch::Explicit => self.disruptor.velocity.ok_or_else(|| {
                SimulationError::InvalidConfiguration(
                    "explicit launch requires disruptor.velocity".to_string(),
                )
            })?,
        };
        let disruptor = Body::new(self.disruptor.position, velocity);

        let stars = self
            .stars
            .positions()
            .into_iter()
            .map(|[x, y]| Ok(Body::new([x, y], circular_velocity(p.gamma, masses.central, x, y)?)))
            .collect::<SimulationResult<Vec<_>>>()?;

        // re-validate: user-supplied coordinates may be non-finite
        let initial = StateVector::from_flat(StateVector::from_bodies(disruptor, &stars).into_inner())?;

        Ok(Scenario {
            model: RestrictedEncounter::new(p.gamma, masses),
            grid,
            integrator: Integrator {
                tolerances,
                max_steps: p.max_steps,
                ..Integrator::default()
            },
            initial,
            path: self.path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = "
parameters:
  central_mass: 1.0e11
  disruptor_mass: 2.0e10
  max_time: 1.0
  sample_count: 2
disruptor:
  position: [50.0, 0.0]
  launch: circular
stars:
  points:
    - [25.0, 0.0]
";

    #[test]
    fn minimal_scenario_uses_defaults() {
        let cfg = ScenarioConfig::from_yaml(MINIMAL).unwrap();
        assert_eq!(cfg.parameters.gamma, GAMMA);
        assert_eq!(cfg.parameters.atol, 1e-3);
        assert_eq!(cfg.parameters.rtol, 1e-3);
        assert_eq!(cfg.path, ApproachPath::default());
        assert_eq!(cfg.disruptor.launch, Launch::Circular);

        let scenario = cfg.build().unwrap();
        let star = scenario.initial.star(1).unwrap();
        assert_eq!(star.velocity, [0.0, (GAMMA * 1e11 / 25.0).sqrt()]);
        assert_eq!(scenario.grid.times(), &[0.0, 1.0]);
    }

    #[test]
    fn approach_launch_is_the_default() {
        let text = "
parameters: { central_mass: 1.0e11, disruptor_mass: 2.0e10, max_time: 1.0, sample_count: 3 }
disruptor: { position: [-11.0, -60.0] }
";
        let scenario = ScenarioConfig::from_yaml(text).unwrap().build().unwrap();
        let s = scenario.initial.disruptor();
        assert!(s.velocity[0] > 0.0 && s.velocity[1] > 0.0);
        assert_eq!(scenario.initial.star_count(), 0);
    }

    #[test]
    fn approach_launch_on_the_axis_is_rejected() {
        let text = "
parameters: { central_mass: 1.0e11, disruptor_mass: 2.0e10, max_time: 1.0, sample_count: 3 }
disruptor: { position: [25.0, 0.0], launch: approach }
";
        let err = ScenarioConfig::from_yaml(text).unwrap().build().unwrap_err();
        assert!(matches!(err, SimulationError::DegenerateOrientation { .. }));
    }

    #[test]
    fn explicit_launch_and_rings() {
        let text = "
parameters: { central_mass: 1.0e11, disruptor_mass: 2.0e10, max_time: 1.0, sample_count: 3 }
disruptor:
  position: [10.0, 90.0]
  launch: explicit
  velocity: [1.5, -2.5]
stars:
  points: [[5.0, 5.0]]
  rings:
    - { radius: 10.0, count: 4 }
    - { radius: 20.0, count: 3, phase: 0.5 }
";
        let scenario = ScenarioConfig::from_yaml(text).unwrap().build().unwrap();
        assert_eq!(scenario.initial.disruptor().velocity, [1.5, -2.5]);
        assert_eq!(scenario.initial.star_count(), 8);
        assert_eq!(scenario.initial.star(1).unwrap().position, [5.0, 5.0]);
        assert_eq!(scenario.initial.star(2).unwrap().position, [10.0, 0.0]);
        for star in scenario.initial.stars() {
            let [x, y] = star.position;
            let [vx, vy] = star.velocity;
            assert!((x * vx + y * vy).abs() < 1e-9);
        }
    }

    #[test]
    fn explicit_launch_needs_a_velocity() {
        let text = "
parameters: { central_mass: 1.0e11, disruptor_mass: 2.0e10, max_time: 1.0, sample_count: 3 }
disruptor: { position: [10.0, 90.0], launch: explicit }
";
        let err = ScenarioConfig::from_yaml(text).unwrap().build().unwrap_err();
        assert!(matches!(err, SimulationError::InvalidConfiguration(_)));
    }

    #[test]
    fn star_at_origin_is_rejected() {
        let text = "
parameters: { central_mass: 1.0e11, disruptor_mass: 2.0e10, max_time: 1.0, sample_count: 3 }
disruptor: { position: [10.0, 90.0] }
stars: { points: [[0.0, 0.0]] }
";
        let err = ScenarioConfig::from_yaml(text).unwrap().build().unwrap_err();
        assert_eq!(err, SimulationError::OriginPosition);
    }

    #[test]
    fn bad_parameters_are_rejected() {
        let base = ScenarioConfig::from_yaml(MINIMAL).unwrap();

        let mut cfg = base.clone();
        cfg.parameters.sample_count = 1;
        assert!(matches!(cfg.build(), Err(SimulationError::InvalidConfiguration(_))));

        let mut cfg = base.clone();
        cfg.parameters.disruptor_mass = 0.0;
        assert!(matches!(cfg.build(), Err(SimulationError::InvalidConfiguration(_))));

        let mut cfg = base.clone();
        cfg.parameters.atol = 0.0;
        assert!(matches!(cfg.build(), Err(SimulationError::InvalidConfiguration(_))));

        let mut cfg = base;
        cfg.parameters.gamma = -1.0;
        assert!(matches!(cfg.build(), Err(SimulationError::InvalidConfiguration(_))));
    }

    #[test]
    fn broken_approach_path_is_rejected() {
        for path in [
            "{ curvature: .nan, vertex_x: 25.0 }",
            "{ curvature: 0.0, vertex_x: 25.0 }",
            "{ curvature: 0.01, vertex_x: .inf }",
        ] {
            let text = format!(
                "
parameters: {{ central_mass: 1.0e11, disruptor_mass: 2.0e10, max_time: 1.0, sample_count: 3 }}
disruptor: {{ position: [-11.0, -60.0] }}
path: {path}
"
            );
            let err = ScenarioConfig::from_yaml(&text).unwrap().build().unwrap_err();
            assert!(matches!(err, SimulationError::InvalidConfiguration(_)), "{path}: {err:?}");
        }
    }

    #[test]
    fn velocity_without_explicit_launch_is_rejected() {
        let text = "
parameters: { central_mass: 1.0e11, disruptor_mass: 2.0e10, max_time: 1.0, sample_count: 3 }
disruptor: { position: [-11.0, -60.0], launch: approach, velocity: [1.0, 2.0] }
";
        let err = ScenarioConfig::from_yaml(text).unwrap().build().unwrap_err();
        assert!(matches!(err, SimulationError::InvalidConfiguration(_)));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let text = MINIMAL.replace("max_time", "t_end");
        assert!(matches!(ScenarioConfig::from_yaml(&text), Err(ConfigError::Yaml(_))));
    }
}
