use clap::Parser;
use log::info;
use strapcloud::{Frame, Params, Pipeline, Point3D, PointCloud};

/// Build a floor with a strip of tape lying above it and run one frame.
#[derive(Debug, Parser)]
struct Args {
    /// Strip centre.
    #[arg(long, num_args = 3, default_values_t = [1.0, 1.0, 0.5])]
    strap: Vec<f32>,

    /// RANSAC seed.
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

fn scene(strap: (f32, f32, f32)) -> PointCloud {
    let mut cloud = PointCloud::new();
    for i in 0..10 {
        for j in 0..10 {
            cloud.push(Point3D::new(i as f32 * 0.1, j as f32 * 0.1, 0.0));
        }
    }
    for dx in [-0.004f32, 0.0, 0.004] {
        for dy in [-0.008f32, -0.004, 0.0, 0.004, 0.008] {
            for dz in [-0.002f32, 0.002] {
                cloud.push(Point3D::new(strap.0 + dx, strap.1 + dy, strap.2 + dz));
            }
        }
    }
    cloud
}

fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init();

    let args = Args::parse();
    let strap = match args.strap.as_slice() {
        [x, y, z] => (*x, *y, *z),
        _ => anyhow::bail!("--strap takes exactly three values"),
    };

    let mut params = Params::default();
    params.plane.seed = Some(args.seed);
    params.voxel.leaf_size = 0.001;
    params.cluster.min_size = 10;

    let cloud = scene(strap);
    info!("synthetic scene with {} points", cloud.len());

    let report = Pipeline::new(params)?.process(&Frame::new(cloud));
    println!("{report:#?}");
    println!("{}", serde_json::to_string(&report.result.to_message())?);
    Ok(())
}
