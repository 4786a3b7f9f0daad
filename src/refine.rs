//! Post-processing of the boundary ring: Douglas-Peucker smoothing, then
//! metric outward buffering.
//!
//! Simplification runs first so it operates on the tight hull shape rather
//! than an already-expanded one. Buffering projects the ring into a metric
//! plane, offsets, and projects back; without a usable projection it buffers
//! directly in the source CRS and the caller is told the distance unit was
//! the CRS unit rather than metres.

use crate::reproject::MetricProjection;
use geo::algorithm::line_intersection::{LineIntersection, line_intersection};
use geo::{Area, MapCoords, Simplify};
use geo_types::{Line, Polygon};
use geo_buffer::buffer_polygon;

/// A refined ring plus the degradation flags the metadata record needs.
#[derive(Debug, Clone)]
pub struct RefinedRing {
    pub ring: Polygon<f64>,
    /// Buffering ran in the source CRS because no metric projection was
    /// available; the buffer distance unit is the CRS unit, not metres.
    pub buffer_metric_inaccurate: bool,
}

/// Simplify and buffer `ring`. Zero tolerances/distances are identities;
/// `projection` is the metric capability used for buffering, `None` when
/// reprojection is unavailable.
pub fn refine(
    ring: &Polygon<f64>,
    simplify_tolerance: f64,
    buffer_distance: f64,
    projection: Option<&dyn MetricProjection>,
) -> RefinedRing {
    let mut current = ring.clone();

    if simplify_tolerance > 0.0 {
        current = simplify_ring(&current, simplify_tolerance);
    }

    let mut buffer_metric_inaccurate = false;
    if buffer_distance > 0.0 {
        match projection {
            Some(projection) => {
                current = buffer_projected(&current, buffer_distance, projection);
            }
            None => {
                log::warn!(
                    "no metric projection available; buffering directly in the source CRS \
                     (distance unit is the CRS unit, not metres)"
                );
                current = buffer_direct(&current, buffer_distance);
                buffer_metric_inaccurate = true;
            }
        }
    }

    RefinedRing {
        ring: current,
        buffer_metric_inaccurate,
    }
}

fn simplify_ring(ring: &Polygon<f64>, tolerance: f64) -> Polygon<f64> {
    let before = ring.exterior().0.len();
    let simplified = ring.simplify(&tolerance);
    let after = simplified.exterior().0.len();

    // Douglas-Peucker can collapse or fold a closed ring at large
    // tolerances; a simple input ring must stay simple.
    if after < 4 || simplified.unsigned_area() <= 0.0 || ring_self_intersects(&simplified) {
        log::warn!("smoothing with tolerance {tolerance} broke the ring; keeping it unsimplified");
        return ring.clone();
    }

    log::info!("smoothing reduced vertices from {before} to {after}");
    simplified
}

/// Proper-crossing test between non-adjacent exterior segments.
fn ring_self_intersects(ring: &Polygon<f64>) -> bool {
    let segments: Vec<Line<f64>> = ring.exterior().lines().collect();
    let count = segments.len();
    for i in 0..count {
        for j in (i + 1)..count {
            // Neighbouring segments (and the closing pair) share a vertex.
            if j == i + 1 || (i == 0 && j == count - 1) {
                continue;
            }
            match line_intersection(segments[i], segments[j]) {
                Some(LineIntersection::SinglePoint { is_proper: true, .. })
                | Some(LineIntersection::Collinear { .. }) => return true,
                _ => {}
            }
        }
    }
    false
}

fn buffer_projected(
    ring: &Polygon<f64>,
    distance: f64,
    projection: &dyn MetricProjection,
) -> Polygon<f64> {
    let projected = ring.map_coords(|c| projection.forward(c));
    match largest_buffer_part(&projected, distance) {
        Some(buffered) => buffered.map_coords(|c| projection.inverse(c)),
        None => {
            log::warn!("projected buffering produced no polygon; ring left unbuffered");
            ring.clone()
        }
    }
}

fn buffer_direct(ring: &Polygon<f64>, distance: f64) -> Polygon<f64> {
    match largest_buffer_part(ring, distance) {
        Some(buffered) => buffered,
        None => {
            log::warn!("direct buffering produced no polygon; ring left unbuffered");
            ring.clone()
        }
    }
}

/// Outward offset of the ring, keeping the largest part of the Minkowski
/// result and dropping any holes the offset machinery introduces.
fn largest_buffer_part(ring: &Polygon<f64>, distance: f64) -> Option<Polygon<f64>> {
    let buffered = buffer_polygon(ring, distance);
    buffered
        .0
        .into_iter()
        .max_by(|a, b| a.unsigned_area().total_cmp(&b.unsigned_area()))
        .map(|part| Polygon::new(part.exterior().clone(), vec![]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reproject::UtmProjection;
    use geo_types::{Coord, LineString};

    /// A square ring with redundant collinear vertices along each edge.
    fn noisy_square() -> Polygon<f64> {
        let mut coords = Vec::new();
        for i in 0..10 {
            coords.push(Coord {
                x: i as f64,
                y: 0.0,
            });
        }
        for i in 0..10 {
            coords.push(Coord {
                x: 10.0,
                y: i as f64,
            });
        }
        for i in 0..10 {
            coords.push(Coord {
                x: 10.0 - i as f64,
                y: 10.0,
            });
        }
        for i in 0..10 {
            coords.push(Coord {
                x: 0.0,
                y: 10.0 - i as f64,
            });
        }
        coords.push(Coord { x: 0.0, y: 0.0 });
        Polygon::new(LineString::new(coords), vec![])
    }

    #[test]
    fn zero_parameters_are_identity() {
        let ring = noisy_square();
        let refined = refine(&ring, 0.0, 0.0, None);
        assert_eq!(refined.ring, ring);
        assert!(!refined.buffer_metric_inaccurate);
    }

    #[test]
    fn smoothing_drops_redundant_vertices_and_keeps_area() {
        let ring = noisy_square();
        let refined = refine(&ring, 0.01, 0.0, None);
        // Collinear edge points vanish; the square survives: 4 corners plus
        // the closing repeat.
        assert_eq!(refined.ring.exterior().0.len(), 5);
        assert!((refined.ring.unsigned_area() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn direct_buffer_expands_area_and_sets_flag() {
        let ring = noisy_square();
        let refined = refine(&ring, 0.0, 1.0, None);
        assert!(refined.buffer_metric_inaccurate);
        assert!(
            refined.ring.unsigned_area() > ring.unsigned_area(),
            "buffered area {} should exceed {}",
            refined.ring.unsigned_area(),
            ring.unsigned_area()
        );
        assert!(refined.ring.interiors().is_empty());
    }

    #[test]
    fn projected_buffer_expands_area_without_flag() {
        // Roughly 1km x 1km near Tokyo.
        let ring = Polygon::new(
            LineString::new(vec![
                Coord { x: 139.69, y: 35.68 },
                Coord { x: 139.70, y: 35.68 },
                Coord { x: 139.70, y: 35.69 },
                Coord { x: 139.69, y: 35.69 },
                Coord { x: 139.69, y: 35.68 },
            ]),
            vec![],
        );
        let projection = UtmProjection::for_ring(&ring, "EPSG:4326").expect("zone 54N");
        let refined = refine(&ring, 0.0, 100.0, Some(&projection));

        assert!(!refined.buffer_metric_inaccurate);
        assert!(refined.ring.unsigned_area() > ring.unsigned_area());

        // Still in geographic coordinates after the round trip.
        for c in &refined.ring.exterior().0 {
            assert!((139.0..141.0).contains(&c.x), "lon {}", c.x);
            assert!((35.0..36.0).contains(&c.y), "lat {}", c.y);
        }
    }

    #[test]
    fn self_intersection_check_accepts_simple_rings() {
        assert!(!ring_self_intersects(&noisy_square()));
    }

    #[test]
    fn self_intersection_check_rejects_bowtie() {
        let bowtie = Polygon::new(
            LineString::new(vec![
                Coord { x: 0.0, y: 0.0 },
                Coord { x: 2.0, y: 2.0 },
                Coord { x: 2.0, y: 0.0 },
                Coord { x: 0.0, y: 2.0 },
                Coord { x: 0.0, y: 0.0 },
            ]),
            vec![],
        );
        assert!(ring_self_intersects(&bowtie));
    }
}
