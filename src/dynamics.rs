//! Equations of motion of the restricted encounter.
//!
//! The central mass M is pinned at the origin. The disrupting galaxy S feels
//! only M (with the combined mass M + S in the two-body law). Stars are test
//! particles: they feel M, S, and an indirect term `(S/R³) * pos_S` from
//! working in the frame attached to M. Stars exert no force on anything.

use crate::constants::{CLOSE_PASSAGE_RATIO, STRIDE};
use crate::error::Coincidence;
use crate::solver::OdeSystem;
use crate::state::{bodies, Body, Masses};

/// Write `d(state)/dt` into `out`.
///
/// Velocity rows are copied from `state`; acceleration rows are
///
/// ```text
/// a_S    = -gamma * (M + S) * pos_S / R³
/// a_star = -gamma * ( (M/r³) * pos_star - (S/p³) * p_vec + (S/R³) * pos_S )
/// ```
///
/// with `R = |pos_S|`, `r = |pos_star|`, `p_vec = pos_S - pos_star`,
/// `p = |p_vec|`. A star sitting on the origin or on S makes `r` or `p` zero
/// and yields non-finite entries; see [`find_coincidence`].
///
/// `state` and `out` must have the same length, a positive multiple of 4.
pub fn derivatives(gamma: f64, masses: &Masses, state: &[f64], out: &mut [f64]) {
    debug_assert_eq!(state.len(), out.len());
    let (m, s) = (masses.central, masses.disruptor);

    let mut blocks = bodies(state);
    let Some(disruptor) = blocks.next() else {
        return;
    };
    let [rx, ry] = disruptor.position;
    let big_r = disruptor.radius();
    let big_r3 = big_r.powi(3);

    let accel = [-gamma * (m + s) * rx / big_r3, -gamma * (m + s) * ry / big_r3];
    Body::new(disruptor.velocity, accel).write(&mut out[..STRIDE]);

    // indirect term, identical for every star
    let indirect = [(s / big_r3) * rx, (s / big_r3) * ry];

    for (star, block) in blocks.zip(out[STRIDE..].chunks_exact_mut(STRIDE)) {
        let [x, y] = star.position;
        let r3 = star.radius().powi(3);
        let (px, py) = (rx - x, ry - y);
        let p3 = (px * px + py * py).sqrt().powi(3);

        let accel = [
            -gamma * ((m / r3) * x - (s / p3) * px + indirect[0]),
            -gamma * ((m / r3) * y - (s / p3) * py + indirect[1]),
        ];
        Body::new(star.velocity, accel).write(block);
    }
}

/// First exact coincidence that makes the force law singular, if any.
///
/// Checks S against the origin, then every star against the origin and
/// against S, in layout order.
pub fn find_coincidence(state: &[f64]) -> Option<Coincidence> {
    let mut blocks = bodies(state);
    let disruptor = blocks.next()?;
    if disruptor.position == [0.0, 0.0] {
        return Some(Coincidence::DisruptorAtOrigin);
    }
    blocks.enumerate().find_map(|(i, star)| {
        if star.position == [0.0, 0.0] {
            Some(Coincidence::StarAtOrigin(i + 1))
        } else if star.position == disruptor.position {
            Some(Coincidence::StarAtDisruptor(i + 1))
        } else {
            None
        }
    })
}

/// Closest distance to zero of the straight segment `a -> b`, and the
/// segment's length.
fn closest_approach(a: [f64; 2], b: [f64; 2]) -> (f64, f64) {
    let d = [b[0] - a[0], b[1] - a[1]];
    let len2 = d[0] * d[0] + d[1] * d[1];
    let s = if len2 > 0.0 {
        (-(a[0] * d[0] + a[1] * d[1]) / len2).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let closest = [a[0] + s * d[0], a[1] + s * d[1]];
    (closest[0].hypot(closest[1]), len2.sqrt())
}

fn swept_through(a: [f64; 2], b: [f64; 2]) -> bool {
    let (closest, length) = closest_approach(a, b);
    closest <= CLOSE_PASSAGE_RATIO * length
}

fn separation(star: &Body, disruptor: &Body) -> [f64; 2] {
    [
        star.position[0] - disruptor.position[0],
        star.position[1] - disruptor.position[1],
    ]
}

/// First pair of bodies that a step from `before` to `after` carried
/// through each other, if any.
///
/// Each relative position is taken to move in a straight line over the
/// step. A pair is reported when that line passes closer to zero than
/// [`CLOSE_PASSAGE_RATIO`] times its length: the step was too coarse to see
/// the encounter and jumped across the pole of the force law. Pairs are
/// checked in the same order as [`find_coincidence`].
pub fn swept_coincidence(before: &[f64], after: &[f64]) -> Option<Coincidence> {
    let mut old = bodies(before);
    let mut new = bodies(after);
    let (s0, s1) = (old.next()?, new.next()?);
    if swept_through(s0.position, s1.position) {
        return Some(Coincidence::DisruptorAtOrigin);
    }
    old.zip(new).enumerate().find_map(|(i, (a, b))| {
        if swept_through(a.position, b.position) {
            Some(Coincidence::StarAtOrigin(i + 1))
        } else if swept_through(separation(&a, &s0), separation(&b, &s1)) {
            Some(Coincidence::StarAtDisruptor(i + 1))
        } else {
            None
        }
    })
}

/// The restricted encounter as an ODE system for the solver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RestrictedEncounter {
    /// Gravitational coupling constant
    pub gamma: f64,
    /// Masses of M and S
    pub masses: Masses,
}

impl RestrictedEncounter {
    /// Model with an explicit coupling constant.
    pub fn new(gamma: f64, masses: Masses) -> Self {
        Self { gamma, masses }
    }
}

impl OdeSystem for RestrictedEncounter {
    fn rhs(&self, _t: f64, y: &[f64], dydt: &mut [f64]) {
        derivatives(self.gamma, &self.masses, y, dydt);
    }
}
