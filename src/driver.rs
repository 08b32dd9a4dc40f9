//! Integration driver: time grid, trajectory and the run loop.
//!
//! The solver chooses its own internal steps; the driver only asks it to
//! land on every sample time of the grid, carrying the proposed step size
//! from one sample interval into the next.

use log::{debug, trace, warn};

use crate::constants::{DEFAULT_ATOL, DEFAULT_MAX_STEPS, DEFAULT_RTOL, GAMMA, STRIDE};
use crate::dynamics::{find_coincidence, swept_coincidence, RestrictedEncounter};
use crate::error::{Coincidence, SimulationError, SimulationResult};
use crate::solver::{IntegrationError, Rkf78, Stats, StepMonitor, StepVerdict, Tolerances};
use crate::state::{bodies, Body, Masses, StateVector};

/// Evenly spaced sample times from 0 to `max_time` inclusive.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeGrid {
    times: Vec<f64>,
}

impl TimeGrid {
    /// `sample_count` points with `t[i] = i * max_time / (sample_count - 1)`.
    pub fn new(max_time: f64, sample_count: usize) -> SimulationResult<Self> {
        if !max_time.is_finite() || max_time <= 0.0 {
            return Err(SimulationError::InvalidConfiguration(format!(
                "max_time must be positive and finite, got {max_time}"
            )));
        }
        if sample_count < 2 {
            return Err(SimulationError::InvalidConfiguration(format!(
                "sample_count must be at least 2, got {sample_count}"
            )));
        }

        let last = sample_count - 1;
        let spacing = max_time / last as f64;
        let times = (0..sample_count)
            .map(|i| if i == last { max_time } else { i as f64 * spacing })
            .collect();
        Ok(Self { times })
    }

    /// Sample times.
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.times.len()
    }

    /// Always false for a constructed grid.
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Last sample time.
    pub fn max_time(&self) -> f64 {
        self.times[self.times.len() - 1]
    }

    /// Spacing between consecutive samples.
    pub fn spacing(&self) -> f64 {
        self.times[1] - self.times[0]
    }
}

/// State vectors over a time grid. Row 0 is the initial condition.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    times: Vec<f64>,
    width: usize,
    data: Vec<f64>,
}

impl Trajectory {
    fn with_capacity(times: Vec<f64>, initial: &[f64]) -> Self {
        let mut data = Vec::with_capacity(times.len() * initial.len());
        data.extend_from_slice(initial);
        Self {
            times,
            width: initial.len(),
            data,
        }
    }

    fn push(&mut self, row: &[f64]) {
        debug_assert_eq!(row.len(), self.width);
        self.data.extend_from_slice(row);
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.data.len() / self.width
    }

    /// Always false: the initial condition is row 0.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Length of each state vector, `4 * (1 + K)`.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of stars K.
    pub fn star_count(&self) -> usize {
        self.width / STRIDE - 1
    }

    /// Sample times.
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    /// State vector at sample `i`.
    pub fn row(&self, i: usize) -> Option<&[f64]> {
        self.data.get(i * self.width..(i + 1) * self.width)
    }

    /// All rows in time order.
    pub fn rows(&self) -> impl ExactSizeIterator<Item = &[f64]> + '_ {
        self.data.chunks_exact(self.width)
    }

    /// Disrupting galaxy at every sample.
    pub fn disruptor_track(&self) -> impl Iterator<Item = Body> + '_ {
        self.rows().map(|row| Body::read(&row[..STRIDE]))
    }

    /// Star `n` (1-based) at every sample; empty if `n` is out of range.
    pub fn star_track(&self, n: usize) -> impl Iterator<Item = Body> + '_ {
        let valid = n >= 1 && n <= self.star_count();
        self.rows()
            .filter(move |_| valid)
            .map(move |row| Body::read(&row[STRIDE * n..STRIDE * (n + 1)]))
    }

    /// Bodies of sample `i`, disruptor first.
    pub fn bodies_at(&self, i: usize) -> Option<impl Iterator<Item = Body> + '_> {
        self.row(i).map(bodies)
    }

    /// Copy of the rows as nested vectors, one per sample.
    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        self.rows().map(<[f64]>::to_vec).collect()
    }

    /// Build from already shifted rows sharing this trajectory's grid.
    pub(crate) fn from_parts(times: Vec<f64>, width: usize, data: Vec<f64>) -> Self {
        debug_assert_eq!(data.len(), times.len() * width);
        Self { times, width, data }
    }

    pub(crate) fn data(&self) -> &[f64] {
        &self.data
    }
}

/// Adaptive integration settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Integrator {
    /// Error tolerances
    pub tolerances: Tolerances,
    /// Step budget for the whole run
    pub max_steps: u64,
    /// Smallest internal step before the run is declared stuck
    pub h_min: f64,
}

impl Default for Integrator {
    fn default() -> Self {
        Self {
            tolerances: Tolerances::new(DEFAULT_ATOL, DEFAULT_RTOL),
            max_steps: DEFAULT_MAX_STEPS,
            h_min: 1e-12,
        }
    }
}

impl Integrator {
    /// Integrate `initial` across `grid` under `model`.
    ///
    /// Row 0 of the result is `initial` unchanged. On failure the error
    /// carries the index of the last row that was completed. Every accepted
    /// step is screened with [`swept_coincidence`], so a body that would jump
    /// through M or S fails the run instead of being flung out.
    pub fn propagate(
        &self,
        model: &RestrictedEncounter,
        initial: &StateVector,
        grid: &TimeGrid,
    ) -> SimulationResult<Trajectory> {
        self.tolerances
            .validate()
            .map_err(|e| SimulationError::InvalidConfiguration(e.to_string()))?;
        if !(self.h_min.is_finite() && self.h_min > 0.0) {
            return Err(SimulationError::InvalidConfiguration(format!(
                "h_min must be positive and finite, got {}",
                self.h_min
            )));
        }
        if let Some(coincidence) = find_coincidence(initial.as_slice()) {
            return Err(SimulationError::SingularForce {
                coincidence,
                t: 0.0,
                last_sample: 0,
            });
        }

        debug!(
            "integrating {} stars over {} samples to t = {} (atol {}, rtol {})",
            initial.star_count(),
            grid.len(),
            grid.max_time(),
            self.tolerances.atol,
            self.tolerances.rtol
        );

        let mut solver = Rkf78::new(self.tolerances);
        solver.h_min = self.h_min;

        let mut watch = CloseApproachWatch::default();
        let mut trajectory = Trajectory::with_capacity(grid.times().to_vec(), initial.as_slice());
        let mut y = initial.as_slice().to_vec();
        let mut h = grid.spacing();

        for (i, window) in grid.times().windows(2).enumerate() {
            let (t0, t1) = (window[0], window[1]);
            let remaining = self.max_steps.saturating_sub(steps_taken(&solver.stats));
            solver.max_steps = remaining;

            let reached = solver
                .integrate_monitored(model, t0, &mut y, t1, h, &mut watch)
                .map_err(|source| classify_failure(source, &y, watch.found, i, t0))?;
            h = reached.h_next;

            trajectory.push(&y);
            trace!("sample {} at t = {} ({:?})", i + 1, t1, solver.stats);
        }

        debug!("run complete: {:?}", solver.stats);
        Ok(trajectory)
    }
}

/// Halts the solver on the first step that sweeps a pair of bodies through
/// each other, remembering which pair.
#[derive(Debug, Default)]
struct CloseApproachWatch {
    found: Option<Coincidence>,
}

impl StepMonitor for CloseApproachWatch {
    fn inspect(&mut self, _t: f64, y: &[f64], _t_next: f64, y_next: &[f64]) -> StepVerdict {
        match swept_coincidence(y, y_next) {
            Some(coincidence) => {
                self.found = Some(coincidence);
                StepVerdict::Halt
            }
            None => StepVerdict::Continue,
        }
    }
}

fn steps_taken(stats: &Stats) -> u64 {
    stats.accepted_steps + stats.rejected_steps
}

/// Map a solver failure inside the interval starting at `t0` onto the
/// run-level taxonomy. `y` is the last accepted state and `swept` the pair
/// the step monitor caught, if any.
fn classify_failure(
    source: IntegrationError,
    y: &[f64],
    swept: Option<Coincidence>,
    last_sample: usize,
    t0: f64,
) -> SimulationError {
    warn!("integration stopped after sample {last_sample}: {source}");
    match source {
        IntegrationError::Halted { t } => SimulationError::SingularForce {
            coincidence: swept.unwrap_or(Coincidence::Unresolved),
            t,
            last_sample,
        },
        IntegrationError::InvalidInput { message } => SimulationError::InvalidConfiguration(message),
        IntegrationError::NonFiniteState { t } => SimulationError::SingularForce {
            coincidence: find_coincidence(y).unwrap_or(Coincidence::Unresolved),
            t,
            last_sample,
        },
        IntegrationError::StepSizeTooSmall { t, .. } => SimulationError::SolverNonConvergence {
            t,
            last_sample,
            source,
        },
        other => SimulationError::SolverNonConvergence {
            t: t0,
            last_sample,
            source: other,
        },
    }
}

/// Integrate a flat initial condition with the default coupling constant and
/// tolerances.
///
/// # Arguments
/// * `initial` - Flat state vector, `4 * (1 + K)` values, disruptor first
/// * `max_time` - Last sample time
/// * `sample_count` - Number of samples, at least 2
/// * `masses` - Masses of M and S
pub fn solve(
    initial: &[f64],
    max_time: f64,
    sample_count: usize,
    masses: Masses,
) -> SimulationResult<Trajectory> {
    let initial = StateVector::from_flat(initial.to_vec())?;
    let grid = TimeGrid::new(max_time, sample_count)?;
    let model = RestrictedEncounter::new(GAMMA, masses);
    Integrator::default().propagate(&model, &initial, &grid)
}
