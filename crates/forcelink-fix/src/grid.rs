//! The force-field grid: immutable geometry plus a dense store of per-node
//! force deltas.

use forcelink_proto::wire::NodeDelta;

use crate::error::{FixError, FixResult};
use crate::interpolate;

const AXES: [&str; 3] = ["x", "y", "z"];

/// How a refresh combines incoming node deltas with the stored grid.
///
/// [`RefreshMode::Accumulate`] superimposes successive refreshes, which is
/// the wire-compatible behavior the fixes use; [`RefreshMode::Replace`]
/// overwrites re-sent nodes instead. Absent nodes keep their prior value in
/// both modes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefreshMode {
    Accumulate,
    Replace,
}

/// Grid geometry, fixed at construction: origin at the box lower corner,
/// spacing of extent/binCount per axis, and one more node than bins per axis.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridSpec {
    origin: [f64; 3],
    spacing: [f64; 3],
    node_counts: [usize; 3],
}

impl GridSpec {
    pub fn from_box(bins: [u64; 3], box_lo: [f64; 3], box_hi: [f64; 3]) -> FixResult<Self> {
        let mut spacing = [0.0; 3];
        let mut node_counts = [0usize; 3];
        for axis in 0..3 {
            if bins[axis] == 0 {
                return Err(FixError::Grid(format!(
                    "{} bin count must be at least 1",
                    AXES[axis]
                )));
            }
            let extent = box_hi[axis] - box_lo[axis];
            if extent <= 0.0 {
                return Err(FixError::Grid(format!(
                    "box has no extent along {}",
                    AXES[axis]
                )));
            }
            spacing[axis] = extent / bins[axis] as f64;
            node_counts[axis] = bins[axis] as usize + 1;
        }
        Ok(Self {
            origin: box_lo,
            spacing,
            node_counts,
        })
    }

    pub fn origin(&self) -> [f64; 3] {
        self.origin
    }

    pub fn spacing(&self) -> [f64; 3] {
        self.spacing
    }

    pub fn node_counts(&self) -> [usize; 3] {
        self.node_counts
    }

    /// Node counts in the wire's integer width.
    pub fn node_counts_wire(&self) -> [u64; 3] {
        [
            self.node_counts[0] as u64,
            self.node_counts[1] as u64,
            self.node_counts[2] as u64,
        ]
    }

    /// Spatial position of node (i, j, k).
    pub fn node_position(&self, i: usize, j: usize, k: usize) -> [f64; 3] {
        [
            self.origin[0] + self.spacing[0] * i as f64,
            self.origin[1] + self.spacing[1] * j as f64,
            self.origin[2] + self.spacing[2] * k as f64,
        ]
    }
}

/// Dense per-node force deltas over a [`GridSpec`], zero-initialized.
#[derive(Clone, Debug)]
pub struct ForceGrid {
    spec: GridSpec,
    nodes: Vec<[f64; 3]>,
}

impl ForceGrid {
    pub fn new(spec: GridSpec) -> Self {
        let [nx, ny, nz] = spec.node_counts();
        Self {
            spec,
            nodes: vec![[0.0; 3]; nx * ny * nz],
        }
    }

    pub fn spec(&self) -> &GridSpec {
        &self.spec
    }

    fn flat_index(&self, i: usize, j: usize, k: usize) -> usize {
        let [_, ny, nz] = self.spec.node_counts();
        (i * ny + j) * nz + k
    }

    pub fn node(&self, i: usize, j: usize, k: usize) -> [f64; 3] {
        self.nodes[self.flat_index(i, j, k)]
    }

    /// Fold a controller's node deltas into the store. Every index is checked
    /// against the grid bounds before anything is written.
    pub fn apply(&mut self, deltas: &[NodeDelta], mode: RefreshMode) -> FixResult<()> {
        let counts = self.spec.node_counts_wire();
        for delta in deltas {
            let indices = [delta.x_index, delta.y_index, delta.z_index];
            for axis in 0..3 {
                if indices[axis] >= counts[axis] {
                    return Err(FixError::Grid(format!(
                        "controller sent invalid {} bin index {} (node count {})",
                        AXES[axis], indices[axis], counts[axis]
                    )));
                }
            }
            let flat = self.flat_index(
                delta.x_index as usize,
                delta.y_index as usize,
                delta.z_index as usize,
            );
            let node = &mut self.nodes[flat];
            match mode {
                RefreshMode::Accumulate => {
                    node[0] += delta.dfx;
                    node[1] += delta.dfy;
                    node[2] += delta.dfz;
                }
                RefreshMode::Replace => {
                    *node = [delta.dfx, delta.dfy, delta.dfz];
                }
            }
        }
        Ok(())
    }

    /// Trilinearly interpolated force delta at a position. Positions outside
    /// the box sample the boundary cell.
    pub fn sample(&self, position: [f64; 3]) -> [f64; 3] {
        interpolate::sample(self, position)
    }
}
