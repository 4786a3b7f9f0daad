//! Pipeline glue: sampling, hull construction, refinement, metadata.

use crate::hull::{self, HullError, HullStrategy};
use crate::refine;
use crate::reproject::{MetricProjection, UtmProjection};
use crate::sampler;
use crate::source::FootprintPoints;
use geo_types::Polygon;
use geojson::JsonObject;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("point source yielded no coordinates")]
    EmptySource,
    #[error("hull construction failed: {0}")]
    Hull(#[from] HullError),
}

/// Knobs of one boundary run. `crs` is the coordinate reference system the
/// input points are in; it is carried into the output metadata and decides
/// whether metric buffering can reproject.
#[derive(Debug, Clone)]
pub struct BoundaryParams {
    pub alpha: f64,
    pub cell_size: f64,
    pub simplify_tolerance: f64,
    pub buffer_distance: f64,
    pub crs: String,
}

impl Default for BoundaryParams {
    fn default() -> Self {
        Self {
            alpha: 0.05,
            cell_size: 100.0,
            simplify_tolerance: 0.0,
            buffer_distance: 0.0,
            crs: crate::WGS_84_CRS.to_string(),
        }
    }
}

/// The metadata record accompanying a boundary ring.
#[derive(Debug, Clone)]
pub struct BoundaryMetadata {
    pub buildings_analyzed: u64,
    pub total_corner_points: usize,
    pub points_used_for_hull: usize,
    pub alpha_value: f64,
    pub sampling_cell_size: f64,
    pub smoothing_tolerance: f64,
    pub buffer_distance: f64,
    pub crs: String,
    pub hull_strategy: HullStrategy,
    pub multipart_collapsed: bool,
    pub buffer_metric_inaccurate: bool,
}

impl BoundaryMetadata {
    /// Flatten into GeoJSON feature properties.
    pub fn to_properties(&self) -> JsonObject {
        let mut properties = JsonObject::new();
        properties.insert(
            "buildings_analyzed".to_string(),
            self.buildings_analyzed.into(),
        );
        properties.insert(
            "total_corner_points".to_string(),
            (self.total_corner_points as u64).into(),
        );
        properties.insert(
            "points_used_for_hull".to_string(),
            (self.points_used_for_hull as u64).into(),
        );
        properties.insert("alpha_value".to_string(), self.alpha_value.into());
        properties.insert(
            "sampling_cell_size".to_string(),
            self.sampling_cell_size.into(),
        );
        properties.insert(
            "smoothing_tolerance".to_string(),
            self.smoothing_tolerance.into(),
        );
        properties.insert("buffer_distance".to_string(), self.buffer_distance.into());
        properties.insert("crs".to_string(), self.crs.as_str().into());
        properties.insert(
            "hull_strategy".to_string(),
            self.hull_strategy.as_str().into(),
        );
        properties.insert(
            "multipart_collapsed".to_string(),
            self.multipart_collapsed.into(),
        );
        properties.insert(
            "buffer_metric_inaccurate".to_string(),
            self.buffer_metric_inaccurate.into(),
        );
        properties
    }
}

/// Run sampler, hull builder and refiner over a loaded point cloud.
pub fn generate_boundary(
    points: &FootprintPoints,
    params: &BoundaryParams,
) -> Result<(Polygon<f64>, BoundaryMetadata), PipelineError> {
    if points.corners.is_empty() {
        return Err(PipelineError::EmptySource);
    }

    let sampled = sampler::sample(&points.corners, params.cell_size);
    if params.cell_size > 0.0 {
        log::info!(
            "grid sampling reduced {} points to {}",
            points.corners.len(),
            sampled.len()
        );
    }

    let outcome = hull::build_hull(&sampled, params.alpha)?;
    log::info!(
        "built boundary ring via {} ({} vertices)",
        outcome.strategy.as_str(),
        outcome.ring.exterior().0.len()
    );

    let projection = if params.buffer_distance > 0.0 {
        match UtmProjection::for_ring(&outcome.ring, &params.crs) {
            Ok(projection) => Some(projection),
            Err(err) => {
                log::warn!("metric reprojection unavailable: {err}");
                None
            }
        }
    } else {
        None
    };

    let refined = refine::refine(
        &outcome.ring,
        params.simplify_tolerance,
        params.buffer_distance,
        projection.as_ref().map(|p| p as &dyn MetricProjection),
    );

    let metadata = BoundaryMetadata {
        buildings_analyzed: points.buildings,
        total_corner_points: points.corners.len(),
        points_used_for_hull: sampled.len(),
        alpha_value: params.alpha,
        sampling_cell_size: params.cell_size,
        smoothing_tolerance: params.simplify_tolerance,
        buffer_distance: params.buffer_distance,
        crs: params.crs.clone(),
        hull_strategy: outcome.strategy,
        multipart_collapsed: outcome.multipart_collapsed,
        buffer_metric_inaccurate: refined.buffer_metric_inaccurate,
    };

    Ok((refined.ring, metadata))
}
