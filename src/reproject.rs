//! Metric reprojection capability for buffering.
//!
//! Buffering by a distance in metres is meaningless in a geographic CRS, so
//! the refiner projects the ring into a locally accurate metric plane first.
//! The capability is a trait so environments with richer CRS support can
//! supply their own transform; the stock implementation is a pure-Rust
//! WGS84 transverse Mercator (UTM-style, Snyder 1987 USGS formulas) with
//! the zone picked from the ring being buffered.

use geo::Centroid;
use geo_types::{Coord, Polygon};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReprojectionError {
    #[error("source CRS '{0}' is not a supported geographic CRS")]
    UnsupportedCrs(String),
    #[error("ring has no usable centroid to anchor a projection")]
    NoReference,
    #[error("reference ({lon}, {lat}) is outside the transverse Mercator domain")]
    OutOfDomain { lon: f64, lat: f64 },
}

/// Projects coordinates into a metric plane and back.
pub trait MetricProjection {
    /// Geographic (lon, lat) degrees to metric (x, y) metres.
    fn forward(&self, c: Coord<f64>) -> Coord<f64>;
    /// Metric (x, y) metres back to geographic (lon, lat) degrees.
    fn inverse(&self, c: Coord<f64>) -> Coord<f64>;
}

// WGS84 ellipsoid
const A: f64 = 6_378_137.0;
const F: f64 = 1.0 / 298.257_223_563;
const E2: f64 = 2.0 * F - F * F;
const E_PRIME2: f64 = E2 / (1.0 - E2);
const K0: f64 = 0.9996;
const FALSE_EASTING: f64 = 500_000.0;
const FALSE_NORTHING_SOUTH: f64 = 10_000_000.0;

/// Zone-local WGS84 transverse Mercator projection.
#[derive(Debug, Clone, Copy)]
pub struct UtmProjection {
    central_meridian_rad: f64,
    north: bool,
}

impl UtmProjection {
    /// Build a projection anchored to `ring`, choosing the UTM zone from
    /// its centroid. Fails when the source CRS is not geographic WGS84 or
    /// when the ring gives no usable anchor.
    pub fn for_ring(ring: &Polygon<f64>, source_crs: &str) -> Result<Self, ReprojectionError> {
        let normalized = source_crs.trim().to_ascii_uppercase();
        if normalized != "EPSG:4326" && normalized != "WGS84" && normalized != "OGC:CRS84" {
            return Err(ReprojectionError::UnsupportedCrs(source_crs.to_string()));
        }

        let centroid = ring.centroid().ok_or(ReprojectionError::NoReference)?;
        let (lon, lat) = (centroid.x(), centroid.y());
        if !lon.is_finite() || !lat.is_finite() || lon.abs() > 180.0 || lat.abs() > 84.0 {
            return Err(ReprojectionError::OutOfDomain { lon, lat });
        }

        let zone = (((lon + 180.0) / 6.0).floor() as i32 + 1).clamp(1, 60);
        let central_meridian = (zone as f64 - 1.0) * 6.0 - 180.0 + 3.0;
        Ok(Self {
            central_meridian_rad: central_meridian.to_radians(),
            north: lat >= 0.0,
        })
    }
}

impl MetricProjection for UtmProjection {
    // Snyder eq. 8-9 / 8-10.
    fn forward(&self, c: Coord<f64>) -> Coord<f64> {
        let lat = c.y.to_radians();
        let lon = c.x.to_radians();

        let sin_lat = lat.sin();
        let cos_lat = lat.cos();
        let tan_lat = lat.tan();

        let n = A / (1.0 - E2 * sin_lat * sin_lat).sqrt();
        let t = tan_lat * tan_lat;
        let cc = E_PRIME2 * cos_lat * cos_lat;
        let a_coeff = cos_lat * (lon - self.central_meridian_rad);

        let a2 = a_coeff * a_coeff;
        let a4 = a2 * a2;
        let a6 = a4 * a2;

        let easting = K0
            * n
            * (a_coeff
                + (1.0 - t + cc) * a2 * a_coeff / 6.0
                + (5.0 - 18.0 * t + t * t + 72.0 * cc - 58.0 * E_PRIME2) * a4 * a_coeff / 120.0)
            + FALSE_EASTING;

        let mut northing = K0
            * (meridional_arc(lat)
                + n * tan_lat
                    * (a2 / 2.0
                        + (5.0 - t + 9.0 * cc + 4.0 * cc * cc) * a4 / 24.0
                        + (61.0 - 58.0 * t + t * t + 600.0 * cc - 330.0 * E_PRIME2) * a6
                            / 720.0));
        if !self.north {
            northing += FALSE_NORTHING_SOUTH;
        }

        Coord {
            x: easting,
            y: northing,
        }
    }

    // Snyder eq. 8-17..8-25 via the footpoint latitude.
    fn inverse(&self, c: Coord<f64>) -> Coord<f64> {
        let x = c.x - FALSE_EASTING;
        let y = if self.north {
            c.y
        } else {
            c.y - FALSE_NORTHING_SOUTH
        };

        let m = y / K0;
        let mu = m / (A * (1.0 - E2 / 4.0 - 3.0 * E2 * E2 / 64.0 - 5.0 * E2 * E2 * E2 / 256.0));

        let e1 = (1.0 - (1.0 - E2).sqrt()) / (1.0 + (1.0 - E2).sqrt());
        let phi1 = mu
            + (3.0 * e1 / 2.0 - 27.0 * e1.powi(3) / 32.0) * (2.0 * mu).sin()
            + (21.0 * e1 * e1 / 16.0 - 55.0 * e1.powi(4) / 32.0) * (4.0 * mu).sin()
            + (151.0 * e1.powi(3) / 96.0) * (6.0 * mu).sin()
            + (1097.0 * e1.powi(4) / 512.0) * (8.0 * mu).sin();

        let sin_phi1 = phi1.sin();
        let cos_phi1 = phi1.cos();
        let tan_phi1 = phi1.tan();

        let c1 = E_PRIME2 * cos_phi1 * cos_phi1;
        let t1 = tan_phi1 * tan_phi1;
        let n1 = A / (1.0 - E2 * sin_phi1 * sin_phi1).sqrt();
        let r1 = A * (1.0 - E2) / (1.0 - E2 * sin_phi1 * sin_phi1).powf(1.5);
        let d = x / (n1 * K0);

        let d2 = d * d;
        let d4 = d2 * d2;
        let d6 = d4 * d2;

        let lat = phi1
            - (n1 * tan_phi1 / r1)
                * (d2 / 2.0
                    - (5.0 + 3.0 * t1 + 10.0 * c1 - 4.0 * c1 * c1 - 9.0 * E_PRIME2) * d4 / 24.0
                    + (61.0 + 90.0 * t1 + 298.0 * c1 + 45.0 * t1 * t1
                        - 252.0 * E_PRIME2
                        - 3.0 * c1 * c1)
                        * d6
                        / 720.0);

        let lon = self.central_meridian_rad
            + (d - (1.0 + 2.0 * t1 + c1) * d2 * d / 6.0
                + (5.0 - 2.0 * c1 + 28.0 * t1 - 3.0 * c1 * c1 + 8.0 * E_PRIME2 + 24.0 * t1 * t1)
                    * d4
                    * d
                    / 120.0)
                / cos_phi1;

        Coord {
            x: lon.to_degrees(),
            y: lat.to_degrees(),
        }
    }
}

/// Meridional arc from the equator to `lat` radians (Snyder eq. 3-21).
fn meridional_arc(lat: f64) -> f64 {
    let e4 = E2 * E2;
    let e6 = e4 * E2;

    A * ((1.0 - E2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0) * lat
        - (3.0 * E2 / 8.0 + 3.0 * e4 / 32.0 + 45.0 * e6 / 1024.0) * (2.0 * lat).sin()
        + (15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0) * (4.0 * lat).sin()
        - (35.0 * e6 / 3072.0) * (6.0 * lat).sin())
}
