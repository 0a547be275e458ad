use std::collections::VecDeque;

use log::debug;

use crate::{params::ClusterParams, spatial::SpatialIndex, Error, Result};

/// Indices of one connected group of points in the cloud of the frame that
/// produced it. Sorted ascending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cluster {
    id: usize,
    indices: Vec<usize>,
}

impl Cluster {
    pub(crate) fn from_indices(id: usize, mut indices: Vec<usize>) -> Self {
        indices.sort_unstable();
        indices.dedup();
        Self { id, indices }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn contains(&self, index: usize) -> bool {
        self.indices.binary_search(&index).is_ok()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Extraction {
    /// Accepted clusters in the order their seed was visited.
    pub clusters: Vec<Cluster>,
    /// Components discarded for being smaller than `min_size`.
    pub too_small: usize,
    /// Components discarded for being larger than `max_size`.
    pub too_large: usize,
}

/// Euclidean cluster extraction: connected components of the graph linking
/// points closer than `tolerance`.
#[derive(Debug, Clone)]
pub struct ClusterExtractor {
    tolerance: f64,
    min_size: usize,
    max_size: usize,
}

impl ClusterExtractor {
    pub fn new(tolerance: f64, min_size: usize, max_size: usize) -> Result<Self> {
        if !tolerance.is_finite() || tolerance <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "cluster tolerance must be positive, got {tolerance}"
            )));
        }
        if min_size == 0 || min_size > max_size {
            return Err(Error::InvalidConfig(format!(
                "cluster size bounds [{min_size}, {max_size}] are empty"
            )));
        }
        Ok(Self {
            tolerance,
            min_size,
            max_size,
        })
    }

    pub fn from_params(params: &ClusterParams) -> Result<Self> {
        Self::new(params.tolerance, params.min_size, params.max_size)
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Group the points of the indexed cloud.
    ///
    /// Every point is visited once. Points of a rejected component are not
    /// reconsidered, so no index appears in two clusters.
    pub fn extract(&self, index: &SpatialIndex<'_>) -> Extraction {
        let cloud = index.cloud();
        let mut visited = vec![false; cloud.len()];
        let mut frontier = VecDeque::new();
        let mut extraction = Extraction::default();

        for seed in 0..cloud.len() {
            if visited[seed] {
                continue;
            }
            visited[seed] = true;
            frontier.push_back(seed);

            let mut members = Vec::new();
            while let Some(current) = frontier.pop_front() {
                members.push(current);
                index.for_each_neighbor(&cloud[current], self.tolerance, |neighbor| {
                    if !visited[neighbor] {
                        visited[neighbor] = true;
                        frontier.push_back(neighbor);
                    }
                });
            }

            if members.len() < self.min_size {
                extraction.too_small += 1;
            } else if members.len() > self.max_size {
                debug!(
                    "dropping component of {} points seeded at {seed} (max {})",
                    members.len(),
                    self.max_size
                );
                extraction.too_large += 1;
            } else {
                let id = extraction.clusters.len();
                extraction.clusters.push(Cluster::from_indices(id, members));
            }
        }

        debug!(
            "{} clusters accepted, {} too small, {} too large",
            extraction.clusters.len(),
            extraction.too_small,
            extraction.too_large
        );
        extraction
    }
}
