//! Hashed voxel grid over one frame's cloud.
//!
//! The index keeps point indices only, so it is tied to the cloud it was built
//! from. A changed cloud needs a new index.

use std::collections::HashMap;

use crate::{
    voxel::{voxel_key, VoxelKey},
    Error, Point3D, PointCloud, Result,
};

#[derive(Debug, Clone)]
pub struct SpatialIndex<'a> {
    cloud: &'a PointCloud,
    resolution: f64,
    voxels: HashMap<VoxelKey, Vec<usize>>,
}

impl<'a> SpatialIndex<'a> {
    pub fn build(cloud: &'a PointCloud, resolution: f64) -> Result<Self> {
        if !resolution.is_finite() || resolution <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "index resolution must be positive, got {resolution}"
            )));
        }

        let mut voxels: HashMap<VoxelKey, Vec<usize>> = HashMap::new();
        for (idx, point) in cloud.iter().enumerate() {
            voxels.entry(voxel_key(point, resolution)).or_default().push(idx);
        }

        Ok(Self {
            cloud,
            resolution,
            voxels,
        })
    }

    pub fn cloud(&self) -> &'a PointCloud {
        self.cloud
    }

    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    pub fn len(&self) -> usize {
        self.cloud.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cloud.is_empty()
    }

    pub fn occupied_voxels(&self) -> usize {
        self.voxels.len()
    }

    /// Indices of the points sharing the voxel that contains `point`.
    pub fn voxel_search(&self, point: &Point3D) -> &[usize] {
        self.voxels
            .get(&voxel_key(point, self.resolution))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Indices of all points within `radius` (inclusive) of `point`, ascending.
    pub fn neighbors(&self, point: &Point3D, radius: f64) -> Vec<usize> {
        let mut found = Vec::new();
        self.for_each_neighbor(point, radius, |idx| found.push(idx));
        found.sort_unstable();
        found
    }

    /// Visit the indices within `radius` of `point` in no particular order.
    pub fn for_each_neighbor<F: FnMut(usize)>(&self, point: &Point3D, radius: f64, mut visit: F) {
        if radius.is_nan() || radius < 0.0 || !point.is_finite() {
            return;
        }

        let radius_sq = radius * radius;
        let mut visit_near = |members: &[usize]| {
            for &idx in members {
                if self.cloud[idx].distance_squared(point) <= radius_sq {
                    visit(idx);
                }
            }
        };

        let reach = (radius / self.resolution).ceil() as i64;
        let span = reach.saturating_mul(2).saturating_add(1);
        let window = span.saturating_mul(span).saturating_mul(span);
        // more cells to probe than occupied voxels: walk the voxels instead
        if window > self.voxels.len() as i64 {
            for members in self.voxels.values() {
                visit_near(members.as_slice());
            }
            return;
        }

        let (cx, cy, cz) = voxel_key(point, self.resolution);
        for dx in -reach..=reach {
            let Some(x) = cx.checked_add(dx) else {
                continue;
            };
            for dy in -reach..=reach {
                let Some(y) = cy.checked_add(dy) else {
                    continue;
                };
                for dz in -reach..=reach {
                    let Some(z) = cz.checked_add(dz) else {
                        continue;
                    };
                    if let Some(members) = self.voxels.get(&(x, y, z)) {
                        visit_near(members.as_slice());
                    }
                }
            }
        }
    }
}
