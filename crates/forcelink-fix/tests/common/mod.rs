#![allow(dead_code)]

use forcelink_fix::HostAtoms;

/// Minimal in-memory stand-in for the host simulator's particle store.
pub struct TestbedAtoms {
    pub positions: Vec<[f64; 3]>,
    pub velocities: Vec<[f64; 3]>,
    pub forces: Vec<[f64; 3]>,
    pub dipoles: Vec<[f64; 3]>,
    pub group: Vec<bool>,
    pub box_lo: [f64; 3],
    pub box_hi: [f64; 3],
}

impl HostAtoms for TestbedAtoms {
    fn len(&self) -> usize {
        self.positions.len()
    }

    fn in_group(&self, index: usize) -> bool {
        self.group[index]
    }

    fn position(&self, index: usize) -> [f64; 3] {
        self.positions[index]
    }

    fn velocity(&self, index: usize) -> [f64; 3] {
        self.velocities[index]
    }

    fn force(&self, index: usize) -> [f64; 3] {
        self.forces[index]
    }

    fn dipole(&self, index: usize) -> [f64; 3] {
        self.dipoles[index]
    }

    fn add_force(&mut self, index: usize, delta: [f64; 3]) {
        for axis in 0..3 {
            self.forces[index][axis] += delta[axis];
        }
    }

    fn box_bounds(&self) -> ([f64; 3], [f64; 3]) {
        (self.box_lo, self.box_hi)
    }
}

/// All particles in group, at rest, inside a [0, 10]^3 box.
pub fn testbed(positions: &[[f64; 3]]) -> TestbedAtoms {
    let n = positions.len();
    TestbedAtoms {
        positions: positions.to_vec(),
        velocities: vec![[0.0; 3]; n],
        forces: vec![[0.0; 3]; n],
        dipoles: vec![[0.0; 3]; n],
        group: vec![true; n],
        box_lo: [0.0; 3],
        box_hi: [10.0; 3],
    }
}
