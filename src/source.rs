//! Footprint ingestion: turning tabular building records into corner points.
//!
//! Each source record carries the calibrated bounding box of one building;
//! every valid record contributes its four corner points. Missing or
//! malformed records are skipped and only valid ones are counted. A source
//! with no data reports zero points rather than failing; whether an empty
//! cloud is fatal is the pipeline's call.

use geo_types::Coord;
use itertools::Itertools;
use serde::Deserialize;
use std::path::PathBuf;

/// A loaded batch of footprint corner points.
#[derive(Debug, Default, Clone)]
pub struct FootprintPoints {
    pub corners: Vec<Coord<f64>>,
    /// Count of valid source records that contributed corners.
    pub buildings: u64,
}

/// Anything that can yield footprint corner points for a location.
pub trait PointSource {
    fn load(&self) -> FootprintPoints;
}

/// Calibrated bounding-box columns of one building record.
#[derive(Debug, Deserialize)]
struct FootprintRecord {
    cal_xmin: Option<f64>,
    cal_xmax: Option<f64>,
    cal_ymin: Option<f64>,
    cal_ymax: Option<f64>,
}

impl FootprintRecord {
    /// The four corner points, or `None` when any coordinate is missing or
    /// non-finite.
    fn corners(&self) -> Option<[Coord<f64>; 4]> {
        let (xmin, xmax) = (self.cal_xmin?, self.cal_xmax?);
        let (ymin, ymax) = (self.cal_ymin?, self.cal_ymax?);
        if ![xmin, xmax, ymin, ymax].iter().all(|v| v.is_finite()) {
            return None;
        }
        Some([
            Coord { x: xmin, y: ymin },
            Coord { x: xmax, y: ymin },
            Coord { x: xmax, y: ymax },
            Coord { x: xmin, y: ymax },
        ])
    }
}

/// Reads building records from every `.csv` file in a directory.
pub struct CsvFootprintSource {
    directory: PathBuf,
}

impl CsvFootprintSource {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    /// Matching files in sorted order. The canonical order keeps
    /// downstream grid sampling deterministic across runs.
    fn csv_files(&self) -> Vec<PathBuf> {
        let entries = match std::fs::read_dir(&self.directory) {
            Ok(entries) => entries,
            Err(err) => {
                log::error!(
                    "input directory {} is not readable: {err}",
                    self.directory.display()
                );
                return Vec::new();
            }
        };
        entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
            })
            .sorted()
            .collect()
    }
}

impl PointSource for CsvFootprintSource {
    fn load(&self) -> FootprintPoints {
        let files = self.csv_files();
        if files.is_empty() {
            log::warn!("no .csv files found in {}", self.directory.display());
            return FootprintPoints::default();
        }
        log::info!("found {} csv files to process", files.len());

        let mut out = FootprintPoints::default();
        for (i, path) in files.iter().enumerate() {
            log::info!("processing {} ({}/{})", path.display(), i + 1, files.len());

            let mut reader = match csv::Reader::from_path(path) {
                Ok(reader) => reader,
                Err(err) => {
                    log::warn!("could not read {}: {err}", path.display());
                    continue;
                }
            };

            let mut valid = 0u64;
            for record in reader.deserialize::<FootprintRecord>() {
                match record {
                    Ok(record) => {
                        if let Some(corners) = record.corners() {
                            out.corners.extend_from_slice(&corners);
                            valid += 1;
                        }
                    }
                    Err(err) => {
                        log::debug!("skipping malformed record in {}: {err}", path.display());
                    }
                }
            }
            log::info!("  found {valid} valid buildings");
            out.buildings += valid;
        }

        log::info!(
            "finished loading: {} buildings, {} corner points",
            out.buildings,
            out.corners.len()
        );
        out
    }
}
