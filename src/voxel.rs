use std::collections::BTreeMap;

use crate::{utils::MeanAccumulator, Error, Point3D, PointCloud, Result};

pub type VoxelKey = (i64, i64, i64);

pub(crate) fn voxel_key(point: &Point3D, leaf_size: f64) -> VoxelKey {
    (
        (point.x as f64 / leaf_size).floor() as i64,
        (point.y as f64 / leaf_size).floor() as i64,
        (point.z as f64 / leaf_size).floor() as i64,
    )
}

/// Replaces the points of every occupied cube by their centroid.
#[derive(Debug, Clone)]
pub struct VoxelDownsampler {
    leaf_size: f64,
}

impl VoxelDownsampler {
    pub fn new(leaf_size: f64) -> Result<Self> {
        if !leaf_size.is_finite() || leaf_size <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "voxel leaf size must be positive, got {leaf_size}"
            )));
        }
        Ok(Self { leaf_size })
    }

    pub fn leaf_size(&self) -> f64 {
        self.leaf_size
    }

    /// One point per occupied voxel, ordered by voxel key.
    pub fn downsample(&self, cloud: &PointCloud) -> PointCloud {
        let mut voxels: BTreeMap<VoxelKey, MeanAccumulator> = BTreeMap::new();
        for point in cloud.iter() {
            voxels
                .entry(voxel_key(point, self.leaf_size))
                .or_default()
                .push(point);
        }

        voxels.values().filter_map(MeanAccumulator::mean).collect()
    }
}
