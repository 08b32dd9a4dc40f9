//! End-to-end runs through the public surface: seeding, integration, frames,
//! and scenario files.

use std::path::PathBuf;

use galaxy_encounter::{
    circular_velocity, load_scenario, solve, Body, Coincidence, Integrator, Masses,
    RestrictedEncounter, SimulationError, StateVector, TimeGrid, Tolerances, GAMMA,
};

fn masses() -> Masses {
    Masses::new(1e11, 2e10).unwrap()
}

fn tight() -> Integrator {
    Integrator {
        tolerances: Tolerances::new(1e-9, 1e-9),
        ..Integrator::default()
    }
}

/// S on a circular orbit of radius `r` about M + S, no stars.
fn bound_companion(masses: &Masses, r: f64) -> StateVector {
    let v = circular_velocity(GAMMA, masses.total(), r, 0.0).unwrap();
    StateVector::from_bodies(Body::new([r, 0.0], v), &[])
}

fn scenario_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("scenarios")
        .join(name)
}

#[test]
fn single_star_example_keeps_first_row() {
    let masses = masses();
    let star_v = circular_velocity(GAMMA, masses.central, 25.0, 0.0).unwrap();
    assert_eq!(star_v[0], 0.0);
    assert_eq!(star_v[1], (GAMMA * 1e11 / 25.0).sqrt());

    let s_v = circular_velocity(GAMMA, masses.total(), 50.0, 0.0).unwrap();
    let initial = [50.0, 0.0, s_v[0], s_v[1], 25.0, 0.0, star_v[0], star_v[1]];

    let trajectory = solve(&initial, 1.0, 2, masses).unwrap();
    assert_eq!(trajectory.len(), 2);
    assert_eq!(trajectory.times(), &[0.0, 1.0]);
    assert_eq!(trajectory.row(0), Some(&initial[..]));
    assert!(trajectory.row(1).unwrap().iter().all(|v| v.is_finite()));
}

#[test]
fn companion_conserves_angular_momentum() {
    let masses = masses();
    let initial = bound_companion(&masses, 50.0);
    let period = 2.0 * std::f64::consts::PI * (50.0_f64.powi(3) / (GAMMA * masses.total())).sqrt();

    let grid = TimeGrid::new(period, 50).unwrap();
    let model = RestrictedEncounter::new(GAMMA, masses);
    let trajectory = Integrator::default().propagate(&model, &initial, &grid).unwrap();

    let l0 = initial.disruptor().angular_momentum();
    for s in trajectory.disruptor_track() {
        let drift = ((s.angular_momentum() - l0) / l0).abs();
        assert!(drift < 1e-2, "angular momentum drift {drift}");
    }
}

#[test]
fn companion_closes_its_orbit() {
    let masses = masses();
    let initial = bound_companion(&masses, 50.0);
    let period = 2.0 * std::f64::consts::PI * (50.0_f64.powi(3) / (GAMMA * masses.total())).sqrt();

    let grid = TimeGrid::new(period, 40).unwrap();
    let model = RestrictedEncounter::new(GAMMA, masses);
    let trajectory = tight().propagate(&model, &initial, &grid).unwrap();

    for s in trajectory.disruptor_track() {
        assert!((s.radius() - 50.0).abs() < 1e-5, "radius {}", s.radius());
    }
    let end = trajectory.disruptor_track().last().unwrap();
    assert!((end.position[0] - 50.0).abs() < 1e-4);
    assert!(end.position[1].abs() < 1e-4);
}

#[test]
fn star_stays_circular_with_remote_companion() {
    let masses = Masses::new(1e11, 1.0).unwrap();
    let star = Body::new([10.0, 0.0], circular_velocity(GAMMA, masses.central, 10.0, 0.0).unwrap());
    let initial = StateVector::from_bodies(Body::new([1e6, 0.0], [0.0, 0.0]), &[star]);

    let period = 2.0 * std::f64::consts::PI * (1e3 / (GAMMA * masses.central)).sqrt();
    let grid = TimeGrid::new(period, 20).unwrap();
    let model = RestrictedEncounter::new(GAMMA, masses);
    let trajectory = tight().propagate(&model, &initial, &grid).unwrap();

    for body in trajectory.star_track(1) {
        assert!((body.radius() - 10.0).abs() < 1e-5, "radius {}", body.radius());
    }
}

#[test]
fn companion_pulls_nearby_star_off_circle() {
    let masses = masses();
    let star = Body::new([25.0, 0.0], circular_velocity(GAMMA, masses.central, 25.0, 0.0).unwrap());
    let s_v = circular_velocity(GAMMA, masses.total(), 80.0, 0.0).unwrap();
    let initial = StateVector::from_bodies(Body::new([80.0, 0.0], s_v), &[star]);

    let grid = TimeGrid::new(0.5, 20).unwrap();
    let model = RestrictedEncounter::new(GAMMA, masses);
    let trajectory = tight().propagate(&model, &initial, &grid).unwrap();

    let spread = trajectory
        .star_track(1)
        .map(|b| (b.radius() - 25.0).abs())
        .fold(0.0, f64::max);
    assert!(spread > 1e-2, "star radius barely moved: {spread}");
}

#[test]
fn center_of_mass_frame_splits_the_separation() {
    let masses = masses();
    let initial = bound_companion(&masses, 50.0);
    let grid = TimeGrid::new(1.0, 10).unwrap();
    let model = RestrictedEncounter::new(GAMMA, masses);
    let trajectory = tight().propagate(&model, &initial, &grid).unwrap();

    let shifted = trajectory.relative_to_center_of_mass(&masses);
    assert_eq!(shifted.len(), trajectory.len());

    let host = trajectory.central_mass_track(&masses);
    for (s, m) in shifted.disruptor_track().zip(&host) {
        let m_radius = m[0].hypot(m[1]);
        assert!((s.radius() - 50.0 * 1e11 / 1.2e11).abs() < 1e-4);
        assert!((m_radius - 50.0 * 2e10 / 1.2e11).abs() < 1e-4);
    }
}

#[test]
fn star_on_companion_is_rejected() {
    let masses = masses();
    let initial = [50.0, 0.0, 0.0, 100.0, 50.0, 0.0, 0.0, 90.0];
    let err = solve(&initial, 1.0, 5, masses).unwrap_err();
    assert_eq!(
        err,
        SimulationError::SingularForce {
            coincidence: Coincidence::StarAtDisruptor(1),
            t: 0.0,
            last_sample: 0,
        }
    );
}

#[test]
fn star_falling_into_the_center_fails_the_run() {
    // released at rest 1 kpc from M, it reaches the centre within 2 Myr
    let initial = [500.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0];
    match solve(&initial, 1.0, 11, masses()).unwrap_err() {
        SimulationError::SingularForce { coincidence, t, last_sample } => {
            assert_eq!(coincidence, Coincidence::StarAtOrigin(1));
            assert_eq!(last_sample, 0);
            assert!(t > 0.0 && t < 0.1, "t = {t}");
        }
        other => panic!("expected a singular force, got {other:?}"),
    }
}

#[test]
fn late_infall_reports_rows_already_produced() {
    // released at rest 20 kpc out, free-fall time ~0.15 Gyr
    let initial = [500.0, 1.0, 0.0, 0.0, 20.0, 0.0, 0.0, 0.0];
    let grid = TimeGrid::new(0.3, 31).unwrap();
    let model = RestrictedEncounter::new(GAMMA, masses());
    let initial = StateVector::from_flat(initial.to_vec()).unwrap();

    match Integrator::default().propagate(&model, &initial, &grid) {
        Err(SimulationError::SingularForce { coincidence, t, last_sample }) => {
            assert_eq!(coincidence, Coincidence::StarAtOrigin(1));
            assert!((10..20).contains(&last_sample), "last sample {last_sample}");
            assert!(t >= grid.times()[last_sample] && t < grid.times()[last_sample + 1]);
        }
        other => panic!("expected a singular force, got {other:?}"),
    }
}

#[test]
fn malformed_input_is_rejected() {
    let err = solve(&[50.0, 0.0, 0.0, 100.0, 1.0], 1.0, 5, masses()).unwrap_err();
    assert!(matches!(err, SimulationError::MalformedStateVector { len: 5, .. }));

    let err = solve(&[50.0, 0.0, 0.0, 100.0], 1.0, 1, masses()).unwrap_err();
    assert!(matches!(err, SimulationError::InvalidConfiguration(_)));
}

#[test]
fn step_budget_spans_the_whole_run() {
    let masses = masses();
    let initial = bound_companion(&masses, 50.0);
    let grid = TimeGrid::new(3.0, 30).unwrap();
    let model = RestrictedEncounter::new(GAMMA, masses);
    let integrator = Integrator {
        max_steps: 20,
        ..tight()
    };

    match integrator.propagate(&model, &initial, &grid).unwrap_err() {
        SimulationError::SolverNonConvergence { last_sample, .. } => {
            assert!(last_sample < 29);
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn bundled_scenarios_build() {
    let flyby = load_scenario(&scenario_path("flyby.yaml")).unwrap().build().unwrap();
    assert_eq!(flyby.initial.star_count(), 12 + 18 + 24 + 30 + 36);
    assert_eq!(flyby.grid.len(), 200);
    assert_eq!(flyby.initial.disruptor().position, [-11.0, -60.0]);

    let equal = load_scenario(&scenario_path("equal_mass.yaml")).unwrap().build().unwrap();
    assert_eq!(equal.initial.star_count(), 60);
    assert_eq!(equal.model.masses.central, equal.model.masses.disruptor);

    let bound = load_scenario(&scenario_path("bound_orbit.yaml")).unwrap().build().unwrap();
    assert_eq!(bound.initial.star_count(), 1);
}

#[test]
fn bound_orbit_scenario_runs() {
    let scenario = load_scenario(&scenario_path("bound_orbit.yaml"))
        .unwrap()
        .build()
        .unwrap();
    let trajectory = scenario.run().unwrap();

    assert_eq!(trajectory.len(), scenario.grid.len());
    assert_eq!(trajectory.row(0), Some(scenario.initial.as_slice()));
    for s in trajectory.disruptor_track() {
        assert!((s.radius() - 50.0).abs() < 1e-2);
    }
}

#[test]
fn missing_scenario_file_reports_io() {
    let err = load_scenario(&scenario_path("no_such_file.yaml")).unwrap_err();
    assert!(err.to_string().starts_with("cannot read scenario"));
}
