//! Adaptive Runge-Kutta-Fehlberg 7(8) integrator over runtime-sized states.
//!
//! The state length is fixed per run but not known at compile time (it grows
//! with the number of stars), so stage storage is sized on first use and
//! reused for every subsequent step of the same length.
//!
//! Reference: NASA TR R-287, Erwin Fehlberg, 1968

use thiserror::Error;

use crate::coefficients::{A, B, B_ERR, C, EMBEDDED_ORDER, STAGES};

/// System of first-order ordinary differential equations: dy/dt = f(t, y)
pub trait OdeSystem {
    /// Evaluate the right-hand side.
    ///
    /// # Arguments
    /// * `t` - Current time
    /// * `y` - Current state vector
    /// * `dydt` - Output: derivative, same length as `y`
    fn rhs(&self, t: f64, y: &[f64], dydt: &mut [f64]);
}

/// What a [`StepMonitor`] wants done with an accepted step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepVerdict {
    /// Take the step and keep integrating
    Continue,
    /// Discard the step and stop with [`IntegrationError::Halted`]
    Halt,
}

/// Observer of accepted steps, consulted before the state advances.
pub trait StepMonitor {
    /// Inspect an accepted step from `(t, y)` to `(t_next, y_next)`.
    fn inspect(&mut self, t: f64, y: &[f64], t_next: f64, y_next: &[f64]) -> StepVerdict;
}

struct Unmonitored;

impl StepMonitor for Unmonitored {
    fn inspect(&mut self, _t: f64, _y: &[f64], _t_next: f64, _y_next: &[f64]) -> StepVerdict {
        StepVerdict::Continue
    }
}

/// Outcome of a single trial step.
///
/// The candidate state itself stays inside the solver and is read back
/// through [`Rkf78::candidate`].
#[derive(Debug, Clone, Copy)]
pub struct StepResult {
    /// Time reached if the step is accepted
    pub t: f64,
    /// Normalized error estimate (accepted when ≤ 1.0)
    pub error: f64,
    /// Suggested magnitude of the next step
    pub h_next: f64,
    /// Whether the step met the tolerances
    pub accepted: bool,
}

/// Counters for diagnostics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stats {
    /// Total number of right-hand-side evaluations
    pub fn_evals: u64,
    /// Number of accepted steps
    pub accepted_steps: u64,
    /// Number of rejected steps
    pub rejected_steps: u64,
}

/// I-controller for the step size: `h_new = safety * h * error^(-1/(p+1))`
/// with `p` the embedded order.
#[derive(Debug, Clone)]
pub struct StepController {
    /// Safety factor applied to every proposal
    pub safety: f64,
    /// Largest growth per step
    pub max_factor: f64,
    /// Strongest reduction per step
    pub min_factor: f64,
    exponent: f64,
}

impl Default for StepController {
    fn default() -> Self {
        Self {
            safety: 0.9,
            max_factor: 5.0,
            min_factor: 0.2,
            exponent: 1.0 / f64::from(EMBEDDED_ORDER + 1),
        }
    }
}

impl StepController {
    /// Step-size scaling for a given normalized error.
    pub fn compute_factor(&self, error: f64) -> f64 {
        if error == 0.0 {
            return self.max_factor;
        }
        (self.safety * error.powf(-self.exponent)).clamp(self.min_factor, self.max_factor)
    }
}

/// Uniform error tolerances.
///
/// Per component the scaled error is `|err| / (atol + rtol * |y8|)`; the step
/// norm is the maximum over components.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerances {
    /// Absolute tolerance
    pub atol: f64,
    /// Relative tolerance
    pub rtol: f64,
}

impl Tolerances {
    /// Create tolerances from absolute and relative parts.
    pub fn new(atol: f64, rtol: f64) -> Self {
        Self { atol, rtol }
    }

    /// Check that `atol` is positive and `rtol` non-negative, both finite.
    pub fn validate(&self) -> Result<(), IntegrationError> {
        if !self.atol.is_finite() || self.atol <= 0.0 {
            return Err(IntegrationError::InvalidInput {
                message: format!("atol must be positive and finite, got {}", self.atol),
            });
        }
        if !self.rtol.is_finite() || self.rtol < 0.0 {
            return Err(IntegrationError::InvalidInput {
                message: format!("rtol must be non-negative and finite, got {}", self.rtol),
            });
        }
        Ok(())
    }
}

/// Where a successful [`Rkf78::integrate`] call stopped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reached {
    /// Final time (equal to `tf` up to `h_min`)
    pub t: f64,
    /// Step size the controller proposes for continuing past `t`
    pub h_next: f64,
}

/// Errors raised by the integrator
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IntegrationError {
    /// A rejected step already sits at the minimum step size
    #[error("step size {h} too small at t = {t}")]
    StepSizeTooSmall {
        /// Time at which progress stalled
        t: f64,
        /// Step size that was too small
        h: f64,
    },
    /// Step budget exhausted
    #[error("maximum number of integration steps exceeded")]
    MaxStepsExceeded,
    /// Bad arguments or tolerances
    #[error("invalid input: {message}")]
    InvalidInput {
        /// What was wrong
        message: String,
    },
    /// The derivative or the propagated state stopped being finite
    #[error("non-finite state detected at t = {t}")]
    NonFiniteState {
        /// Start of the step that produced the non-finite value
        t: f64,
    },
    /// A [`StepMonitor`] vetoed an accepted step
    #[error("integration halted by step monitor at t = {t}")]
    Halted {
        /// Start of the vetoed step
        t: f64,
    },
}

/// Runge-Kutta-Fehlberg 7(8) integrator
///
/// # Example
/// ```
/// use galaxy_encounter::{OdeSystem, Rkf78, Tolerances};
///
/// struct HarmonicOscillator { omega: f64 }
///
/// impl OdeSystem for HarmonicOscillator {
///     fn rhs(&self, _t: f64, y: &[f64], dydt: &mut [f64]) {
///         dydt[0] = y[1];
///         dydt[1] = -self.omega * self.omega * y[0];
///     }
/// }
///
/// let mut solver = Rkf78::new(Tolerances::new(1e-12, 1e-12));
/// let mut y = [1.0, 0.0];
/// let reached = solver
///     .integrate(&HarmonicOscillator { omega: 1.0 }, 0.0, &mut y, 10.0, 0.1)
///     .unwrap();
/// assert!((reached.t - 10.0).abs() < 1e-12);
/// ```
#[derive(Debug, Clone)]
pub struct Rkf78 {
    tol: Tolerances,
    controller: StepController,
    /// Minimum step size
    pub h_min: f64,
    /// Maximum step size
    pub h_max: f64,
    /// Step budget per [`Rkf78::integrate`] call
    pub max_steps: u64,
    /// Stage derivatives, `STAGES` rows of the state length
    k: Vec<Vec<f64>>,
    /// Scratch state for stage evaluation
    y_stage: Vec<f64>,
    /// 8th-order solution of the last trial step
    y_next: Vec<f64>,
    /// Integration statistics
    pub stats: Stats,
}

impl Rkf78 {
    /// Create a solver with the given tolerances.
    pub fn new(tol: Tolerances) -> Self {
        Self {
            tol,
            controller: StepController::default(),
            h_min: 1e-14,
            h_max: f64::INFINITY,
            max_steps: 10_000_000,
            k: Vec::new(),
            y_stage: Vec::new(),
            y_next: Vec::new(),
            stats: Stats::default(),
        }
    }

    /// Set minimum and maximum step sizes.
    pub fn set_step_limits(&mut self, h_min: f64, h_max: f64) {
        self.h_min = h_min;
        self.h_max = h_max;
    }

    /// Tolerances in use.
    pub fn tolerances(&self) -> Tolerances {
        self.tol
    }

    /// State produced by the last call to [`Rkf78::step`].
    pub fn candidate(&self) -> &[f64] {
        &self.y_next
    }

    /// Reset statistics.
    pub fn reset_stats(&mut self) {
        self.stats = Stats::default();
    }

    fn ensure_workspace(&mut self, n: usize) {
        if self.y_next.len() != n {
            self.k = vec![vec![0.0; n]; STAGES];
            self.y_stage = vec![0.0; n];
            self.y_next = vec![0.0; n];
        }
    }

    /// Perform one trial step of size `h` from `(t, y)`.
    ///
    /// Evaluates all 13 stages, forms the 8th-order solution (left in
    /// [`Rkf78::candidate`]), estimates the error and proposes the next step.
    pub fn step<S: OdeSystem + ?Sized>(
        &mut self,
        sys: &S,
        t: f64,
        y: &[f64],
        h: f64,
    ) -> StepResult {
        self.ensure_workspace(y.len());
        let h = h.signum() * h.abs().clamp(self.h_min, self.h_max);

        self.compute_stages(sys, t, y, h);
        self.compute_solution(y, h);
        let error = self.compute_error(h);

        let accepted = error <= 1.0;
        let factor = self.controller.compute_factor(error);
        let h_next = (h.abs() * factor).clamp(self.h_min, self.h_max);

        self.stats.fn_evals += STAGES as u64;
        if accepted {
            self.stats.accepted_steps += 1;
        } else {
            self.stats.rejected_steps += 1;
        }

        StepResult {
            t: t + h,
            error,
            h_next,
            accepted,
        }
    }

    /// Integrate `y` in place from `t0` to `tf`.
    ///
    /// The last step is shortened so the endpoint is never overshot; the
    /// returned `h_next` is the proposal from before that shortening. On
    /// error `y` holds the last accepted state.
    ///
    /// # Arguments
    /// * `sys` - The ODE system
    /// * `t0` - Initial time
    /// * `y` - State at `t0` on entry, state at the returned time on success
    /// * `tf` - Final time
    /// * `h0` - Initial step size guess, signed in the integration direction
    pub fn integrate<S: OdeSystem + ?Sized>(
        &mut self,
        sys: &S,
        t0: f64,
        y: &mut [f64],
        tf: f64,
        h0: f64,
    ) -> Result<Reached, IntegrationError> {
        self.integrate_monitored(sys, t0, y, tf, h0, &mut Unmonitored)
    }

    /// [`Rkf78::integrate`] with every accepted step shown to `monitor`
    /// before `y` is updated.
    pub fn integrate_monitored<S, M>(
        &mut self,
        sys: &S,
        t0: f64,
        y: &mut [f64],
        tf: f64,
        h0: f64,
        monitor: &mut M,
    ) -> Result<Reached, IntegrationError>
    where
        S: OdeSystem + ?Sized,
        M: StepMonitor + ?Sized,
    {
        if t0 == tf {
            return Ok(Reached { t: t0, h_next: h0.abs() });
        }
        self.validate_inputs(t0, y, tf, h0)?;

        let direction = (tf - t0).signum();
        let mut t = t0;
        let mut h = h0;
        let mut h_next = h0.abs();
        let mut step_count = 0u64;

        while (tf - t) * direction > self.h_min {
            let proposed = h;
            let shortened = (t + h - tf) * direction > 0.0;
            if shortened {
                h = tf - t;
            }

            let result = self.step(sys, t, y, h);
            if !result.error.is_finite() {
                return Err(IntegrationError::NonFiniteState { t });
            }

            if result.accepted {
                if !self.y_next.iter().all(|v| v.is_finite()) {
                    return Err(IntegrationError::NonFiniteState { t });
                }
                if monitor.inspect(t, y, result.t, &self.y_next) == StepVerdict::Halt {
                    return Err(IntegrationError::Halted { t });
                }
                y.copy_from_slice(&self.y_next);
                t = result.t;
            }

            h_next = if result.accepted && shortened {
                result.h_next.max(proposed.abs())
            } else {
                result.h_next
            };
            h = h_next * direction;

            step_count += 1;
            if step_count > self.max_steps {
                return Err(IntegrationError::MaxStepsExceeded);
            }

            // a rejected step already at h_min cannot make progress
            if !result.accepted && result.h_next <= self.h_min && (tf - t) * direction > self.h_min
            {
                return Err(IntegrationError::StepSizeTooSmall {
                    t,
                    h: result.h_next,
                });
            }
        }

        Ok(Reached { t, h_next })
    }

    #[allow(clippy::needless_range_loop)]
    fn compute_stages<S: OdeSystem + ?Sized>(&mut self, sys: &S, t: f64, y: &[f64], h: f64) {
        sys.rhs(t, y, &mut self.k[0]);

        for i in 1..STAGES {
            for n in 0..y.len() {
                let mut sum = 0.0;
                for j in 0..i {
                    sum += A[i][j] * self.k[j][n];
                }
                self.y_stage[n] = y[n] + h * sum;
            }
            sys.rhs(t + C[i] * h, &self.y_stage, &mut self.k[i]);
        }
    }

    #[allow(clippy::needless_range_loop)]
    fn compute_solution(&mut self, y: &[f64], h: f64) {
        for n in 0..y.len() {
            let mut sum = 0.0;
            for i in 0..STAGES {
                sum += B[i] * self.k[i][n];
            }
            self.y_next[n] = y[n] + h * sum;
        }
    }

    /// Infinity norm of the scaled error of the 7th-order solution.
    #[allow(clippy::needless_range_loop)]
    fn compute_error(&self, h: f64) -> f64 {
        let mut max_err: f64 = 0.0;
        for n in 0..self.y_next.len() {
            let mut err_n = 0.0;
            for i in 0..STAGES {
                err_n += B_ERR[i] * self.k[i][n];
            }
            let scale = self.tol.atol + self.tol.rtol * self.y_next[n].abs();
            let scaled = (h * err_n).abs() / scale;
            // NaN must not be swallowed by f64::max
            if scaled.is_nan() {
                return f64::NAN;
            }
            max_err = max_err.max(scaled);
        }
        max_err
    }

    fn validate_inputs(&self, t0: f64, y: &[f64], tf: f64, h0: f64) -> Result<(), IntegrationError> {
        if !t0.is_finite() || !tf.is_finite() || !h0.is_finite() {
            return Err(IntegrationError::InvalidInput {
                message: "t0, tf, and h0 must be finite".to_string(),
            });
        }
        if h0 == 0.0 {
            return Err(IntegrationError::InvalidInput {
                message: "h0 must be non-zero".to_string(),
            });
        }
        if h0.signum() != (tf - t0).signum() {
            return Err(IntegrationError::InvalidInput {
                message: "h0 sign must match integration direction (tf - t0)".to_string(),
            });
        }
        if !(self.h_min.is_finite() && self.h_min > 0.0 && self.h_min <= self.h_max) {
            return Err(IntegrationError::InvalidInput {
                message: format!(
                    "step limits must satisfy 0 < h_min <= h_max, got {} and {}",
                    self.h_min, self.h_max
                ),
            });
        }
        if y.is_empty() {
            return Err(IntegrationError::InvalidInput {
                message: "state vector is empty".to_string(),
            });
        }
        if let Some(i) = y.iter().position(|v| !v.is_finite()) {
            return Err(IntegrationError::InvalidInput {
                message: format!("y0[{i}] is not finite"),
            });
        }
        self.tol.validate()
    }
}
