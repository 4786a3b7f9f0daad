//! Grid-based point sampling.
//!
//! Footprint corner clouds duplicate heavily inside dense blocks, and that
//! interior density adds nothing to the boundary while making the
//! (super-linear) hull construction slow and numerically fragile. The
//! sampler caps density by keeping one representative point per occupied
//! grid cell.

use geo_types::Coord;
use std::collections::HashSet;

/// Integer grid cell containing `c` at the given cell size.
fn cell_key(c: Coord<f64>, cell_size: f64) -> (i64, i64) {
    (
        (c.x / cell_size).floor() as i64,
        (c.y / cell_size).floor() as i64,
    )
}

/// Reduce `points` to one representative per occupied grid cell.
///
/// The representative is the first point, in input order, that lands in a
/// cell, so the result depends only on the input sequence and never on the
/// iteration order of the occupancy set. Every output point is taken
/// verbatim from the input. `cell_size <= 0` disables sampling and returns
/// the input unchanged.
pub fn sample(points: &[Coord<f64>], cell_size: f64) -> Vec<Coord<f64>> {
    if cell_size <= 0.0 {
        return points.to_vec();
    }

    let mut occupied: HashSet<(i64, i64)> = HashSet::with_capacity(points.len());
    let mut kept = Vec::new();

    for point in points {
        if occupied.insert(cell_key(*point, cell_size)) {
            kept.push(*point);
        }
    }

    kept
}
