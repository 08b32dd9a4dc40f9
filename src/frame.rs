//! Centre-of-mass views of a trajectory.
//!
//! The integration frame is pinned to M. Viewers that want the barycentric
//! picture shift every position by the centre of mass of M and S; stars are
//! massless and do not contribute.

use crate::constants::STRIDE;
use crate::driver::Trajectory;
use crate::state::Masses;

/// Centre of mass of M (at the origin) and S (at `disruptor`).
pub fn center_of_mass(masses: &Masses, disruptor: [f64; 2]) -> [f64; 2] {
    let total = masses.total();
    [
        masses.disruptor * disruptor[0] / total,
        masses.disruptor * disruptor[1] / total,
    ]
}

impl Trajectory {
    /// Same trajectory with every position measured from the centre of mass
    /// of M and S at that sample. Velocities are left in the M frame.
    pub fn relative_to_center_of_mass(&self, masses: &Masses) -> Trajectory {
        let width = self.width();
        let mut data = self.data().to_vec();

        for row in data.chunks_exact_mut(width) {
            let [cx, cy] = center_of_mass(masses, [row[0], row[1]]);
            for block in row.chunks_exact_mut(STRIDE) {
                block[0] -= cx;
                block[1] -= cy;
            }
        }
        Trajectory::from_parts(self.times().to_vec(), width, data)
    }

    /// Position of M in the centre-of-mass frame at every sample.
    pub fn central_mass_track(&self, masses: &Masses) -> Vec<[f64; 2]> {
        self.disruptor_track()
            .map(|s| {
                let [cx, cy] = center_of_mass(masses, s.position);
                [-cx, -cy]
            })
            .collect()
    }
}
