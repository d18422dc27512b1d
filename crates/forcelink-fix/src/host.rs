//! The seam between the fix and its host simulator.

use forcelink_proto::wire::{AtomState, Dipole};

/// Everything the fix asks of the host, and nothing more: locally owned
/// particles with position/velocity/force access, a group mask, and the
/// simulation box bounds. Errors flow back to the host as `Result`s; aborting
/// on them is the host's policy.
pub trait HostAtoms {
    /// Number of locally owned particles.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether particle `index` belongs to the fix's group.
    fn in_group(&self, index: usize) -> bool;

    fn position(&self, index: usize) -> [f64; 3];

    fn velocity(&self, index: usize) -> [f64; 3];

    fn force(&self, index: usize) -> [f64; 3];

    /// Dipole moment orientation. Only consulted in dipole runs.
    fn dipole(&self, index: usize) -> [f64; 3];

    /// Accumulate a force delta onto particle `index`.
    fn add_force(&mut self, index: usize, delta: [f64; 3]);

    /// Lower and upper corners of the simulation box.
    fn box_bounds(&self) -> ([f64; 3], [f64; 3]);
}

/// Snapshot the in-group particles, keeping the host indices so replies can
/// be written back positionally.
pub fn collect_group<H: HostAtoms + ?Sized>(host: &H, dipole: bool) -> (Vec<AtomState>, Vec<usize>) {
    let mut atoms = Vec::new();
    let mut indices = Vec::new();
    for index in 0..host.len() {
        if !host.in_group(index) {
            continue;
        }
        let [x, y, z] = host.position(index);
        let [vx, vy, vz] = host.velocity(index);
        let [fx, fy, fz] = host.force(index);
        let mu = if dipole {
            let [mux, muy, muz] = host.dipole(index);
            Some(Dipole { mux, muy, muz })
        } else {
            None
        };
        atoms.push(AtomState {
            x,
            y,
            z,
            vx,
            vy,
            vz,
            fx,
            fy,
            fz,
            mu,
        });
        indices.push(index);
    }
    (atoms, indices)
}
