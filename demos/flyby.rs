//! Parabolic flyby through a ring of stars.
//!
//! Seeds one ring of stars on circular orbits, launches the companion along
//! its approach path, and reports how far the stars have been pulled off
//! their original radius by the end of the run.
//!
//! Run with:
//!   cargo run --example flyby

use galaxy_encounter::{
    approach_velocity, circular_velocity, Body, Integrator, Masses, RestrictedEncounter,
    StateVector, TimeGrid, GAMMA,
};

fn main() {
    let masses = Masses::new(1e11, 2e10).unwrap();
    let radius = 15.0;
    let count = 24;

    let stars: Vec<Body> = (0..count)
        .map(|k| {
            let angle = std::f64::consts::TAU * k as f64 / count as f64;
            let [x, y] = [radius * angle.cos(), radius * angle.sin()];
            Body::new([x, y], circular_velocity(GAMMA, masses.central, x, y).unwrap())
        })
        .collect();

    let s_position = [-11.0, -60.0];
    let s_velocity =
        approach_velocity(GAMMA, masses.central, masses.disruptor, s_position[0], s_position[1])
            .unwrap();
    let initial = StateVector::from_bodies(Body::new(s_position, s_velocity), &stars);

    let grid = TimeGrid::new(1.5, 150).unwrap();
    let model = RestrictedEncounter::new(GAMMA, masses);
    let trajectory = Integrator::default().propagate(&model, &initial, &grid).unwrap();

    let last = trajectory.len() - 1;
    let end: Vec<Body> = trajectory.bodies_at(last).unwrap().collect();
    let s_end = end[0];
    let radii: Vec<f64> = end[1..].iter().map(Body::radius).collect();
    let inner = radii.iter().copied().fold(f64::INFINITY, f64::min);
    let outer = radii.iter().copied().fold(0.0, f64::max);

    println!("Parabolic flyby, M = {:e}, S = {:e}", masses.central, masses.disruptor);
    println!("  Stars:        {count} on r = {radius} kpc");
    println!("  S start:      ({:.1}, {:.1}) kpc", s_position[0], s_position[1]);
    println!(
        "  S end:        ({:.1}, {:.1}) kpc at t = {:.2} Gyr",
        s_end.position[0],
        s_end.position[1],
        grid.max_time()
    );
    println!("  Star radii:   {inner:.2} .. {outer:.2} kpc");
}
