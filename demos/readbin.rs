use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use log::info;
use strapcloud::{matrix::cloud_from_raw_buffer, Frame, Params, Pipeline};

/// Run the strap detector over a raw little-endian f32 point dump
/// (KITTI style `.bin`, or any fixed stride of floats per point).
#[derive(Debug, Parser)]
struct Args {
    /// Path to the binary point file.
    path: PathBuf,

    /// Floats per point; only the first three are used.
    #[arg(long, default_value_t = 4)]
    stride: usize,

    /// YAML or JSON parameter file. Defaults are used when absent.
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init();

    let args = Args::parse();

    let params = match &args.config {
        Some(path) => Params::load(path)
            .with_context(|| format!("loading parameters from {}", path.display()))?,
        None => Params::default(),
    };

    let buffer =
        std::fs::read(&args.path).with_context(|| format!("reading {}", args.path.display()))?;
    let cloud = cloud_from_raw_buffer(&buffer, args.stride)?;
    info!("read {} points from {}", cloud.len(), args.path.display());

    let pipeline = Pipeline::new(params)?;
    let report = pipeline.process(&Frame::new(cloud));
    info!(
        "{} planes removed, {} clusters, {} rejected, {:?}",
        report.planes_removed, report.clusters, report.rejected_clusters, report.elapsed
    );

    println!("{}", serde_json::to_string(&report.result.to_message())?);
    Ok(())
}
