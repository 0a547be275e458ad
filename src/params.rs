use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Error, Point3D, Result};

/// Pipeline configuration. Set once before the first frame and never mutated.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Params {
    pub plane: PlaneParams,
    pub voxel: VoxelParams,
    pub cluster: ClusterParams,
    pub selection: SelectionParams,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaneParams {
    /// Maximum number of planes stripped from one frame.
    pub max_planes: usize,

    /// Point to plane distance under which a point is an inlier (meters).
    pub distance_threshold: f64,

    /// Plane removal stops once the residual falls below this fraction of the
    /// points that entered it.
    pub stop_fraction: f64,

    /// Number of RANSAC hypotheses drawn per plane.
    pub ransac_iterations: usize,

    /// Refit the winning hypothesis on its inliers with a least squares plane.
    pub optimize_coefficients: bool,

    /// Fixed RNG seed. `None` seeds from entropy for every frame.
    pub seed: Option<u64>,
}

impl Default for PlaneParams {
    fn default() -> Self {
        Self {
            max_planes: 3,
            distance_threshold: 0.02,
            stop_fraction: 0.3,
            ransac_iterations: 100,
            optimize_coefficients: true,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoxelParams {
    /// Edge of a downsampling cube (meters).
    pub leaf_size: f64,
}

impl Default for VoxelParams {
    fn default() -> Self {
        Self { leaf_size: 0.01 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterParams {
    /// Maximum gap between two points of the same cluster (meters).
    pub tolerance: f64,
    pub min_size: usize,
    pub max_size: usize,

    /// Voxel edge of the spatial index. Defaults to `tolerance`.
    pub index_resolution: Option<f64>,
}

impl Default for ClusterParams {
    fn default() -> Self {
        Self {
            tolerance: 0.02,
            min_size: 100,
            max_size: 25000,
            index_resolution: None,
        }
    }
}

impl ClusterParams {
    pub fn resolution(&self) -> f64 {
        self.index_resolution.unwrap_or(self.tolerance)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionParams {
    /// Centroids farther than this from the reference point are never selected.
    pub max_distance: Option<f64>,

    /// The robot's position in the sensor frame.
    pub reference_point: [f32; 3],
}

impl Default for SelectionParams {
    fn default() -> Self {
        Self {
            max_distance: None,
            reference_point: [0.0, 0.0, 0.0],
        }
    }
}

impl SelectionParams {
    pub fn reference(&self) -> Point3D {
        let [x, y, z] = self.reference_point;
        Point3D::new(x, y, z)
    }
}

fn positive(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(Error::config(format!("{name} must be positive, got {value}")))
    }
}

/// Largest tolerance / index resolution ratio; bounds the cells scanned per
/// neighbor query.
pub(crate) const MAX_INDEX_REACH: f64 = 64.0;

impl Params {
    pub fn validate(&self) -> Result<()> {
        let plane = &self.plane;
        positive("plane.distance_threshold", plane.distance_threshold)?;
        if !(0.0..=1.0).contains(&plane.stop_fraction) {
            return Err(Error::config(format!(
                "plane.stop_fraction must lie in [0, 1], got {}",
                plane.stop_fraction
            )));
        }
        if plane.ransac_iterations == 0 {
            return Err(Error::config("plane.ransac_iterations must be at least 1"));
        }

        positive("voxel.leaf_size", self.voxel.leaf_size)?;

        let cluster = &self.cluster;
        positive("cluster.tolerance", cluster.tolerance)?;
        positive("cluster.index_resolution", cluster.resolution())?;
        if cluster.tolerance / cluster.resolution() > MAX_INDEX_REACH {
            return Err(Error::config(format!(
                "cluster.index_resolution {} is too fine for tolerance {} (limit {}x)",
                cluster.resolution(),
                cluster.tolerance,
                MAX_INDEX_REACH
            )));
        }
        if cluster.min_size == 0 {
            return Err(Error::config("cluster.min_size must be at least 1"));
        }
        if cluster.min_size > cluster.max_size {
            return Err(Error::config(format!(
                "cluster.min_size ({}) exceeds cluster.max_size ({})",
                cluster.min_size, cluster.max_size
            )));
        }

        let selection = &self.selection;
        if let Some(max_distance) = selection.max_distance {
            positive("selection.max_distance", max_distance)?;
        }
        if !selection.reference().is_finite() {
            return Err(Error::config("selection.reference_point must be finite"));
        }

        Ok(())
    }

    pub fn from_yaml_str(source: &str) -> Result<Self> {
        let params: Params = serde_yaml::from_str(source)?;
        params.validate()?;
        Ok(params)
    }

    pub fn from_json_str(source: &str) -> Result<Self> {
        let params: Params = serde_json::from_str(source)?;
        params.validate()?;
        Ok(params)
    }

    /// Load a `.json` file as JSON and anything else as YAML.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        if is_json {
            Self::from_json_str(&source)
        } else {
            Self::from_yaml_str(&source)
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let params = Params::default();
        params.validate().unwrap();
        assert_eq!(params.plane.ransac_iterations, 100);
        assert_eq!(params.cluster.min_size, 100);
        assert_eq!(params.cluster.max_size, 25000);
        assert_eq!(params.cluster.resolution(), params.cluster.tolerance);
        assert!(params.selection.max_distance.is_none());
    }

    #[rstest]
    #[case::zero_leaf(|p: &mut Params| p.voxel.leaf_size = 0.0)]
    #[case::negative_leaf(|p: &mut Params| p.voxel.leaf_size = -0.01)]
    #[case::nan_leaf(|p: &mut Params| p.voxel.leaf_size = f64::NAN)]
    #[case::zero_tolerance(|p: &mut Params| p.cluster.tolerance = 0.0)]
    #[case::zero_index_resolution(|p: &mut Params| p.cluster.index_resolution = Some(0.0))]
    #[case::min_above_max(|p: &mut Params| { p.cluster.min_size = 50; p.cluster.max_size = 10; })]
    #[case::zero_min_size(|p: &mut Params| p.cluster.min_size = 0)]
    #[case::negative_threshold(|p: &mut Params| p.plane.distance_threshold = -1.0)]
    #[case::stop_fraction_above_one(|p: &mut Params| p.plane.stop_fraction = 1.5)]
    #[case::no_ransac_iterations(|p: &mut Params| p.plane.ransac_iterations = 0)]
    #[case::negative_max_distance(|p: &mut Params| p.selection.max_distance = Some(-2.0))]
    #[case::infinite_reference(|p: &mut Params| {
        p.selection.reference_point = [f32::INFINITY, 0.0, 0.0]
    })]
    #[case::index_resolution_too_fine(|p: &mut Params| p.cluster.index_resolution = Some(1e-5))]
    fn test_validate_rejects(#[case] tweak: fn(&mut Params)) {
        let mut params = Params::default();
        tweak(&mut params);
        assert!(matches!(params.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_fine_index_resolution_within_reach_is_valid() {
        let mut params = Params::default();
        params.cluster.index_resolution = Some(params.cluster.tolerance / (MAX_INDEX_REACH / 2.0));
        params.validate().unwrap();
        params.cluster.index_resolution = Some(params.cluster.tolerance * 4.0);
        params.validate().unwrap();
    }

    #[test]
    fn test_equal_cluster_bounds_are_valid() {
        let mut params = Params::default();
        params.cluster.min_size = 30;
        params.cluster.max_size = 30;
        params.validate().unwrap();
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let params = Params::from_yaml_str(
            "cluster:\n  tolerance: 0.05\n  min_size: 10\nselection:\n  max_distance: 2.5\n",
        )
        .unwrap();
        assert_eq!(params.cluster.tolerance, 0.05);
        assert_eq!(params.cluster.min_size, 10);
        assert_eq!(params.cluster.max_size, 25000);
        assert_eq!(params.selection.max_distance, Some(2.5));
        assert_eq!(params.plane, PlaneParams::default());
    }

    #[test]
    fn test_yaml_negative_size_is_rejected() {
        assert!(matches!(
            Params::from_yaml_str("cluster:\n  min_size: -3\n"),
            Err(Error::Yaml(_))
        ));
    }

    #[test]
    fn test_yaml_inverted_bounds_are_rejected() {
        assert!(matches!(
            Params::from_yaml_str("cluster:\n  min_size: 500\n  max_size: 20\n"),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_json_config() {
        let params =
            Params::from_json_str(r#"{"voxel": {"leaf_size": 0.005}, "plane": {"seed": 7}}"#)
                .unwrap();
        assert_eq!(params.voxel.leaf_size, 0.005);
        assert_eq!(params.plane.seed, Some(7));

        assert!(matches!(
            Params::from_json_str(r#"{"voxel": {"leaf_size": 0.0}}"#),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(
            Params::load("/nonexistent/strapcloud.yaml"),
            Err(Error::Io(_))
        ));
    }
}
