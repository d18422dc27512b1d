//! Trilinear sampling of the force grid.
//!
//! Composition of three axis interpolations: along x for both y edges, along
//! y, then along z. Positions outside the box clamp to the boundary cell; the
//! local offset is left unclamped there, which extrapolates the edge cell's
//! gradient.

use crate::grid::ForceGrid;

/// Interpolate a 3-tuple between two nodes `spacing` apart, `offset` from the
/// lower one.
pub(crate) fn lerp_line(offset: f64, spacing: f64, v0: [f64; 3], v1: [f64; 3]) -> [f64; 3] {
    let t1 = offset / spacing;
    let t0 = 1.0 - t1;
    [
        v0[0] * t0 + v1[0] * t1,
        v0[1] * t0 + v1[1] * t1,
        v0[2] * t0 + v1[2] * t1,
    ]
}

/// Bilinear interpolation over the four corners of one xy face.
pub(crate) fn lerp_plane(
    offset: [f64; 3],
    spacing: [f64; 3],
    c00: [f64; 3],
    c10: [f64; 3],
    c01: [f64; 3],
    c11: [f64; 3],
) -> [f64; 3] {
    let y0 = lerp_line(offset[0], spacing[0], c00, c10);
    let y1 = lerp_line(offset[0], spacing[0], c01, c11);
    lerp_line(offset[1], spacing[1], y0, y1)
}

/// Trilinear interpolation over the eight corners of one cell. Corner naming
/// is `c<x><y><z>`.
#[allow(clippy::too_many_arguments)]
pub(crate) fn lerp_cell(
    offset: [f64; 3],
    spacing: [f64; 3],
    c000: [f64; 3],
    c100: [f64; 3],
    c010: [f64; 3],
    c110: [f64; 3],
    c001: [f64; 3],
    c101: [f64; 3],
    c011: [f64; 3],
    c111: [f64; 3],
) -> [f64; 3] {
    let z0 = lerp_plane(offset, spacing, c000, c100, c010, c110);
    let z1 = lerp_plane(offset, spacing, c001, c101, c011, c111);
    lerp_line(offset[2], spacing[2], z0, z1)
}

/// Find the cell enclosing `position` and blend its eight nodes.
pub fn sample(grid: &ForceGrid, position: [f64; 3]) -> [f64; 3] {
    let spec = grid.spec();
    let origin = spec.origin();
    let spacing = spec.spacing();
    let counts = spec.node_counts();

    let mut cell = [0usize; 3];
    let mut local = [0.0f64; 3];
    for axis in 0..3 {
        // Truncation toward zero, then clamp to the boundary cells.
        let bin = ((position[axis] - origin[axis]) / spacing[axis]) as i64;
        let clamped = bin.clamp(0, counts[axis] as i64 - 2) as usize;
        cell[axis] = clamped;
        local[axis] = position[axis] - (origin[axis] + clamped as f64 * spacing[axis]);
    }

    let [i, j, k] = cell;
    lerp_cell(
        local,
        spacing,
        grid.node(i, j, k),
        grid.node(i + 1, j, k),
        grid.node(i, j + 1, k),
        grid.node(i + 1, j + 1, k),
        grid.node(i, j, k + 1),
        grid.node(i + 1, j, k + 1),
        grid.node(i, j + 1, k + 1),
        grid.node(i + 1, j + 1, k + 1),
    )
}
