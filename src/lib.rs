//! Strap detection core: strips the floor from a depth sensor cloud, clusters
//! what remains and picks the cluster closest to the robot.
//!
//! Frame flow:
//! mask/dense filter → [`PlaneRemover`] → [`VoxelDownsampler`] → [`SpatialIndex`]
//! → [`ClusterExtractor`] → [`CentroidComputer`] → [`NearestSelector`].

mod centroid;
mod cluster;
mod error;
mod mask;
pub mod matrix;
mod params;
mod pipeline;
mod plane;
mod points;
mod select;
mod spatial;
mod utils;
mod voxel;


pub use centroid::{Centroid, CentroidComputer};
pub use cluster::{Cluster, ClusterExtractor, Extraction};
pub use error::{Error, Result};
pub use mask::{Frame, Mask};
pub use params::{ClusterParams, Params, PlaneParams, SelectionParams, VoxelParams};
pub use pipeline::{FrameReport, FrameSlot, Pipeline};
pub use plane::{PlaneModel, PlaneRemoval, PlaneRemover, StopReason};
pub use points::{IntoCloud, Point3D, PointCloud};
pub use select::{NearestSelector, SelectionResult, TargetMessage};
pub use spatial::SpatialIndex;
pub use voxel::{VoxelDownsampler, VoxelKey};
