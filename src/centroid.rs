use crate::{cluster::Cluster, utils::MeanAccumulator, Error, Point3D, PointCloud, Result};

/// Mean position of a cluster. `cluster_id` points back at the cluster for
/// tracing only.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Centroid {
    pub point: Point3D,
    pub cluster_id: usize,
    pub size: usize,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CentroidComputer;

impl CentroidComputer {
    pub fn centroid(&self, cloud: &PointCloud, cluster: &Cluster) -> Result<Centroid> {
        let mut acc = MeanAccumulator::default();
        for &index in cluster.indices() {
            let point = cloud.get(index).ok_or(Error::IndexOutOfRange {
                index,
                len: cloud.len(),
            })?;
            acc.push(point);
        }

        let point = acc.mean().ok_or(Error::EmptyCluster)?;
        Ok(Centroid {
            point,
            cluster_id: cluster.id(),
            size: acc.count(),
        })
    }

    /// Centroids of all clusters, failing on the first bad cluster.
    pub fn centroids(&self, cloud: &PointCloud, clusters: &[Cluster]) -> Result<Vec<Centroid>> {
        clusters
            .iter()
            .map(|cluster| self.centroid(cloud, cluster))
            .collect()
    }
}
