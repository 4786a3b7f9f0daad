//! Alpha-shape boundary construction with a convex-hull fallback.
//!
//! The primary strategy triangulates the point set with Delaunator and keeps
//! the simplices whose circumradius is within `1/alpha`; the traced boundary
//! of the kept region is the concave hull. When that construction fails
//! (degenerate triangulation, empty union, pinched boundary) the builder
//! falls through an explicit ordered strategy list to the convex hull, so
//! the cause of a degraded result stays visible to the caller instead of
//! disappearing into nested recovery.

use delaunator::{EMPTY, Point as DPoint, next_halfedge, triangulate};
use geo::{Area, ConvexHull};
use geo_types::{Coord, LineString, MultiPoint, Point, Polygon};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HullError {
    #[error("hull builder needs at least 3 distinct points, got {0}")]
    InsufficientPoints(usize),
    #[error("alpha shape construction failed: {0}")]
    AlphaShape(String),
    #[error("convex hull fallback failed: input is degenerate (collinear points?)")]
    ConvexHullFailed,
}

/// Which strategy of the fallback chain produced the ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HullStrategy {
    AlphaShape,
    ConvexHull,
}

impl HullStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            HullStrategy::AlphaShape => "alpha_shape",
            HullStrategy::ConvexHull => "convex_hull_fallback",
        }
    }
}

/// Strategies are tried in this order; the first success wins. The convex
/// hull is the last resort, its failure is fatal.
const STRATEGIES: [HullStrategy; 2] = [HullStrategy::AlphaShape, HullStrategy::ConvexHull];

/// A constructed boundary ring plus how it was obtained.
#[derive(Debug, Clone)]
pub struct HullOutcome {
    pub ring: Polygon<f64>,
    pub strategy: HullStrategy,
    /// True when the alpha shape produced several disjoint parts and only
    /// the largest one was kept.
    pub multipart_collapsed: bool,
}

/// Compute a boundary ring around `points`.
///
/// `alpha` controls concavity: simplices with circumradius above `1/alpha`
/// are excluded from the shape, `alpha == 0` lifts the constraint entirely
/// (the boundary then degenerates to the convex hull).
pub fn build_hull(points: &[Coord<f64>], alpha: f64) -> Result<HullOutcome, HullError> {
    let distinct = dedup(points);
    if distinct.len() < 3 {
        return Err(HullError::InsufficientPoints(distinct.len()));
    }

    let mut last_failure = None;
    for strategy in STRATEGIES {
        let attempt = match strategy {
            HullStrategy::AlphaShape => alpha_shape(&distinct, alpha),
            HullStrategy::ConvexHull => convex_fallback(&distinct),
        };
        match attempt {
            Ok((ring, multipart_collapsed)) => {
                return Ok(HullOutcome {
                    ring,
                    strategy,
                    multipart_collapsed,
                });
            }
            Err(err) => {
                log::warn!("{} strategy failed: {}", strategy.as_str(), err);
                last_failure = Some(err);
            }
        }
    }

    Err(last_failure.unwrap_or(HullError::ConvexHullFailed))
}

/// Collapse near-coincident points before triangulating; duplicated input
/// coordinates make the triangulation degenerate.
fn dedup(points: &[Coord<f64>]) -> Vec<Coord<f64>> {
    let mut unique = points.to_vec();
    unique.sort_by(|a, b| a.x.total_cmp(&b.x).then_with(|| a.y.total_cmp(&b.y)));
    unique.dedup_by(|a, b| (a.x - b.x).abs() < 1e-6 && (a.y - b.y).abs() < 1e-6);
    unique
}

fn alpha_shape(points: &[Coord<f64>], alpha: f64) -> Result<(Polygon<f64>, bool), HullError> {
    let d_points: Vec<DPoint> = points.iter().map(|c| DPoint { x: c.x, y: c.y }).collect();
    let triangulation = triangulate(&d_points);
    let num_triangles = triangulation.triangles.len() / 3;
    if num_triangles == 0 {
        return Err(HullError::AlphaShape("triangulation is empty".to_string()));
    }

    let max_radius = if alpha > 0.0 { 1.0 / alpha } else { f64::INFINITY };

    let mut keep = vec![false; num_triangles];
    let mut kept_any = false;
    for t in 0..num_triangles {
        let a = points[triangulation.triangles[3 * t]];
        let b = points[triangulation.triangles[3 * t + 1]];
        let c = points[triangulation.triangles[3 * t + 2]];
        if circumradius(a, b, c) <= max_radius {
            keep[t] = true;
            kept_any = true;
        }
    }
    if !kept_any {
        return Err(HullError::AlphaShape(format!(
            "no simplex has circumradius within {max_radius}"
        )));
    }

    // A half-edge lies on the boundary of the kept region when its own
    // triangle is kept and its twin is missing or discarded. Map start
    // vertex -> end vertex for the loop walk.
    let mut adjacency: HashMap<usize, usize> = HashMap::new();
    for e in 0..triangulation.halfedges.len() {
        if !keep[e / 3] {
            continue;
        }
        let twin = triangulation.halfedges[e];
        if twin != EMPTY && keep[twin / 3] {
            continue;
        }
        let start = triangulation.triangles[e];
        let end = triangulation.triangles[next_halfedge(e)];
        if adjacency.insert(start, end).is_some() {
            // Two kept regions touching at a single vertex; the walk cannot
            // resolve which loop to follow.
            return Err(HullError::AlphaShape(format!(
                "pinched boundary at vertex {start}"
            )));
        }
    }

    let rings = trace_rings(points, &adjacency)?;
    let multipart = rings.len() > 1;
    if multipart {
        log::warn!(
            "alpha shape produced {} disjoint parts; keeping the largest by area",
            rings.len()
        );
    }

    let ring = select_largest_part(rings)
        .ok_or_else(|| HullError::AlphaShape("no closed boundary loop".to_string()))?;
    Ok((ring, multipart))
}

/// Walk the boundary adjacency map into closed rings. Start vertices are
/// taken in sorted order so the traced output never depends on hash
/// iteration order.
fn trace_rings(
    points: &[Coord<f64>],
    adjacency: &HashMap<usize, usize>,
) -> Result<Vec<Polygon<f64>>, HullError> {
    let mut starts: Vec<usize> = adjacency.keys().copied().collect();
    starts.sort_unstable();

    let mut visited: HashSet<usize> = HashSet::new();
    let mut rings = Vec::new();

    for start in starts {
        if visited.contains(&start) {
            continue;
        }

        let mut ring: Vec<Coord<f64>> = Vec::new();
        let mut current = start;
        loop {
            visited.insert(current);
            ring.push(points[current]);

            let Some(&next) = adjacency.get(&current) else {
                return Err(HullError::AlphaShape(format!(
                    "boundary loop broken at vertex {current}"
                )));
            };
            if next == start {
                break;
            }
            current = next;

            // Infinite loop guard
            if ring.len() > adjacency.len() {
                return Err(HullError::AlphaShape(
                    "boundary walk does not close".to_string(),
                ));
            }
        }

        if ring.len() < 3 {
            continue;
        }
        ring.push(ring[0]);
        rings.push(Polygon::new(LineString::new(ring), vec![]));
    }

    Ok(rings)
}

/// Part-selection policy for disconnected hulls: keep the part enclosing the
/// largest area, treating smaller fragments as noise relative to the
/// dominant landmass. Swapping the policy means replacing this one call
/// site, not the tracer.
fn select_largest_part(rings: Vec<Polygon<f64>>) -> Option<Polygon<f64>> {
    rings
        .into_iter()
        .max_by(|a, b| a.unsigned_area().total_cmp(&b.unsigned_area()))
}

fn convex_fallback(points: &[Coord<f64>]) -> Result<(Polygon<f64>, bool), HullError> {
    let multi = MultiPoint::new(points.iter().map(|c| Point::new(c.x, c.y)).collect());
    let hull = multi.convex_hull();
    // Collinear input collapses to a zero-area sliver.
    if hull.exterior().0.len() < 4 || hull.unsigned_area() <= 0.0 {
        return Err(HullError::ConvexHullFailed);
    }
    Ok((hull, false))
}

/// Circumradius of the triangle (a, b, c); infinite for (near-)collinear
/// vertices, so degenerate slivers never satisfy a finite radius bound.
fn circumradius(a: Coord<f64>, b: Coord<f64>, c: Coord<f64>) -> f64 {
    let d = 2.0 * (a.x * (b.y - c.y) + b.x * (c.y - a.y) + c.x * (a.y - b.y));
    if d.abs() < 1e-12 {
        return f64::INFINITY;
    }
    let a2 = a.x * a.x + a.y * a.y;
    let b2 = b.x * b.x + b.y * b.y;
    let c2 = c.x * c.x + c.y * c.y;
    let ux = (a2 * (b.y - c.y) + b2 * (c.y - a.y) + c2 * (a.y - b.y)) / d;
    let uy = (a2 * (c.x - b.x) + b2 * (a.x - c.x) + c2 * (b.x - a.x)) / d;
    (ux - a.x).hypot(uy - a.y)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Corner points of four unit-square footprints at grid positions
    /// (0,0), (2,0), (0,2), (2,2) - 16 points whose convex hull is the
    /// square (0,0)-(3,3).
    fn four_footprints() -> Vec<Coord<f64>> {
        let mut points = Vec::new();
        for (ox, oy) in [(0.0, 0.0), (2.0, 0.0), (0.0, 2.0), (2.0, 2.0)] {
            points.push(Coord { x: ox, y: oy });
            points.push(Coord { x: ox + 1.0, y: oy });
            points.push(Coord { x: ox + 1.0, y: oy + 1.0 });
            points.push(Coord { x: ox, y: oy + 1.0 });
        }
        points
    }

    fn ring_bounds(ring: &Polygon<f64>) -> (f64, f64, f64, f64) {
        let mut bounds = (f64::MAX, f64::MAX, f64::MIN, f64::MIN);
        for c in &ring.exterior().0 {
            bounds.0 = bounds.0.min(c.x);
            bounds.1 = bounds.1.min(c.y);
            bounds.2 = bounds.2.max(c.x);
            bounds.3 = bounds.3.max(c.y);
        }
        bounds
    }

    #[test]
    fn zero_alpha_equals_convex_hull_of_footprints() {
        let points = four_footprints();
        let outcome = build_hull(&points, 0.0).expect("hull should build");

        assert_eq!(outcome.strategy, HullStrategy::AlphaShape);
        assert!(!outcome.multipart_collapsed);
        assert!((outcome.ring.unsigned_area() - 9.0).abs() < 1e-9);
        assert_eq!(ring_bounds(&outcome.ring), (0.0, 0.0, 3.0, 3.0));

        // Same enclosed region as the convex hull of the same points.
        let multi = MultiPoint::new(
            points
                .iter()
                .map(|c| Point::new(c.x, c.y))
                .collect::<Vec<_>>(),
        );
        let convex = multi.convex_hull();
        assert!((outcome.ring.unsigned_area() - convex.unsigned_area()).abs() < 1e-9);
    }

    #[test]
    fn ring_is_closed() {
        let outcome = build_hull(&four_footprints(), 0.0).expect("hull should build");
        let exterior = &outcome.ring.exterior().0;
        assert!(exterior.len() >= 4);
        assert_eq!(exterior.first(), exterior.last());
    }

    #[test]
    fn three_points_produce_a_triangle() {
        let points = vec![
            Coord { x: 0.0, y: 0.0 },
            Coord { x: 4.0, y: 0.0 },
            Coord { x: 0.0, y: 3.0 },
        ];
        let outcome = build_hull(&points, 0.0).expect("triangle should build");
        assert_eq!(outcome.strategy, HullStrategy::AlphaShape);
        // Triangle ring: 3 vertices plus closing repeat.
        assert_eq!(outcome.ring.exterior().0.len(), 4);
        assert!((outcome.ring.unsigned_area() - 6.0).abs() < 1e-9);
    }

    #[test]
    fn two_distinct_points_are_insufficient() {
        // Five inputs but only two distinct locations.
        let points = vec![
            Coord { x: 0.0, y: 0.0 },
            Coord { x: 0.0, y: 0.0 },
            Coord { x: 1.0, y: 1.0 },
            Coord { x: 1.0, y: 1.0 },
            Coord { x: 1.0, y: 1.0 },
        ];
        match build_hull(&points, 0.0) {
            Err(HullError::InsufficientPoints(2)) => {}
            other => panic!("expected InsufficientPoints(2), got {other:?}"),
        }
    }

    #[test]
    fn collinear_points_are_fatal() {
        let points: Vec<Coord<f64>> = (0..10)
            .map(|i| Coord {
                x: i as f64,
                y: 2.0 * i as f64,
            })
            .collect();
        match build_hull(&points, 0.0) {
            Err(HullError::ConvexHullFailed) => {}
            other => panic!("expected ConvexHullFailed, got {other:?}"),
        }
    }

    #[test]
    fn huge_alpha_falls_back_to_convex_hull() {
        let points = four_footprints();
        // 1/alpha far below any circumradius in the set: the alpha shape is
        // empty and the convex strategy must take over.
        let outcome = build_hull(&points, 1e9).expect("fallback should build");
        assert_eq!(outcome.strategy, HullStrategy::ConvexHull);
        assert!(!outcome.multipart_collapsed);

        let multi = MultiPoint::new(
            points
                .iter()
                .map(|c| Point::new(c.x, c.y))
                .collect::<Vec<_>>(),
        );
        let convex = multi.convex_hull();
        assert!((outcome.ring.unsigned_area() - convex.unsigned_area()).abs() < 1e-9);
    }

    #[test]
    fn tight_alpha_hugs_concave_input() {
        // An L-shaped lattice: the alpha shape should enclose noticeably
        // less than the convex hull.
        let mut points = Vec::new();
        for i in 0..=8 {
            for j in 0..=8 {
                if i <= 2 || j <= 2 {
                    points.push(Coord {
                        x: i as f64,
                        y: j as f64,
                    });
                }
            }
        }
        let concave = build_hull(&points, 0.8).expect("alpha hull should build");
        assert_eq!(concave.strategy, HullStrategy::AlphaShape);

        let convex = build_hull(&points, 0.0).expect("convex hull should build");
        assert!(
            concave.ring.unsigned_area() < convex.ring.unsigned_area() - 1.0,
            "alpha shape ({}) should be tighter than convex hull ({})",
            concave.ring.unsigned_area(),
            convex.ring.unsigned_area()
        );
    }

    #[test]
    fn disjoint_clusters_collapse_to_largest_part() {
        // A 5x5 lattice at the origin and a 3x3 lattice 100 units away.
        // With max circumradius 2 the bridging simplices are excluded and
        // the union is two disjoint parts.
        let mut points = Vec::new();
        for i in 0..5 {
            for j in 0..5 {
                points.push(Coord {
                    x: i as f64,
                    y: j as f64,
                });
            }
        }
        for i in 0..3 {
            for j in 0..3 {
                points.push(Coord {
                    x: 100.0 + i as f64,
                    y: j as f64,
                });
            }
        }

        let outcome = build_hull(&points, 0.5).expect("hull should build");
        assert_eq!(outcome.strategy, HullStrategy::AlphaShape);
        assert!(outcome.multipart_collapsed);

        // The larger (origin) cluster wins: 4x4 area, west of x=10.
        assert!((outcome.ring.unsigned_area() - 16.0).abs() < 1e-9);
        let (_, _, max_x, _) = ring_bounds(&outcome.ring);
        assert!(max_x < 10.0);
    }

    #[test]
    fn hull_never_returns_fewer_than_three_distinct_vertices() {
        let points = vec![
            Coord { x: 0.0, y: 0.0 },
            Coord { x: 1.0, y: 0.0 },
            Coord { x: 0.5, y: 0.9 },
            Coord { x: 0.5, y: 0.3 },
        ];
        for alpha in [0.0, 0.1, 1.0, 1e9] {
            if let Ok(outcome) = build_hull(&points, alpha) {
                let distinct: HashSet<(u64, u64)> = outcome
                    .ring
                    .exterior()
                    .0
                    .iter()
                    .map(|c| (c.x.to_bits(), c.y.to_bits()))
                    .collect();
                assert!(
                    distinct.len() >= 3,
                    "alpha {alpha} produced a degenerate ring"
                );
            }
        }
    }
}
