use anyhow::{Context, Result};
use clap::Parser;
use footprint_boundary::pipeline::{BoundaryParams, generate_boundary};
use footprint_boundary::source::{CsvFootprintSource, PointSource};
use footprint_boundary::writer::write_boundary;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Generate a boundary polygon from building footprint data", long_about = None)]
struct Args {
    /// Directory containing the input .csv footprint files
    input_dir: PathBuf,

    /// Path for the output .geojson file
    output_file: PathBuf,

    /// Alpha parameter for the concave hull. Smaller values produce a more
    /// generalized shape.
    #[arg(long, default_value_t = 0.05, value_parser = non_negative)]
    alpha: f64,

    /// Grid cell size for point sampling, in data units. Set to 0 to
    /// disable sampling.
    #[arg(long, default_value_t = 100.0, value_parser = non_negative)]
    cell_size: f64,

    /// Simplification tolerance for smoothing the final polygon. Set to 0
    /// to disable.
    #[arg(long, default_value_t = 0.0, value_parser = non_negative)]
    smooth: f64,

    /// Buffer distance in metres to expand the boundary polygon. Set to 0
    /// to disable.
    #[arg(long, default_value_t = 0.0, value_parser = non_negative)]
    buffer: f64,

    /// Coordinate reference system of the input data and output file
    #[arg(long, default_value = footprint_boundary::WGS_84_CRS)]
    crs: String,
}

fn non_negative(raw: &str) -> Result<f64, String> {
    let value: f64 = raw.parse().map_err(|_| format!("'{raw}' is not a number"))?;
    if !value.is_finite() || value < 0.0 {
        return Err(format!("'{raw}' must be a finite, non-negative number"));
    }
    Ok(value)
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let source = CsvFootprintSource::new(&args.input_dir);
    let points = source.load();

    let params = BoundaryParams {
        alpha: args.alpha,
        cell_size: args.cell_size,
        simplify_tolerance: args.smooth,
        buffer_distance: args.buffer,
        crs: args.crs,
    };

    let (ring, metadata) = generate_boundary(&points, &params)
        .context("failed to generate a boundary polygon")?;

    write_boundary(&args.output_file, &ring, metadata.to_properties())
        .context("failed to save the boundary file")?;

    log::info!("Success! Boundary file created.");
    Ok(())
}
