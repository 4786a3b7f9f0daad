//! Derives a tight-fitting boundary polygon from building-footprint corner
//! clouds: grid sampling, alpha-shape hull construction with a convex
//! fallback, optional smoothing and metric buffering, GeoJSON output.

pub mod hull;
pub mod pipeline;
pub mod refine;
pub mod reproject;
pub mod sampler;
pub mod source;
pub mod writer;

pub const WGS_84_CRS: &str = "EPSG:4326";
