use log::{debug, warn};
use nalgebra::{MatrixXx3, Vector3};
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::{
    params::PlaneParams,
    utils::calc_point_to_plane_d,
    Error, IntoCloud, Point3D, PointCloud, Result,
};

/// Plane `normal . p + d = 0` and the points of the fitted cloud within the
/// inlier threshold.
///
/// `inliers` index the cloud the model was fitted on, which during plane
/// removal is the residual of that iteration, not the original frame.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaneModel {
    /// Unit normal with a non-negative z component.
    pub normal: Vector3<f32>,
    pub d: f64,
    pub inliers: Vec<usize>,
}

impl PlaneModel {
    pub fn distance(&self, point: &Point3D) -> f64 {
        calc_point_to_plane_d(point, &self.normal, self.d).abs()
    }

    /// `[a, b, c, d]` of `ax + by + cz + d = 0`.
    pub fn coefficients(&self) -> [f64; 4] {
        [
            self.normal[0] as f64,
            self.normal[1] as f64,
            self.normal[2] as f64,
            self.d,
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// `max_planes` planes were removed.
    IterationCap,
    /// The residual dropped below `stop_fraction` of the input.
    BelowStopFraction,
    /// No plane could be fitted to the residual; it is returned as is.
    PlaneFitFailed,
}

#[derive(Debug, Clone)]
pub struct PlaneRemoval {
    pub residual: PointCloud,
    /// Removed planes in removal order.
    pub planes: Vec<PlaneModel>,
    pub stop: StopReason,
}

/// Strips the dominant planes (floor, ramps) from a cloud.
#[derive(Debug, Clone)]
pub struct PlaneRemover {
    params: PlaneParams,
}

impl PlaneRemover {
    pub fn new(params: PlaneParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &PlaneParams {
        &self.params
    }

    pub fn remove(&self, cloud: &PointCloud) -> PlaneRemoval {
        let mut rng = match self.params.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        self.remove_with_rng(cloud, &mut rng)
    }

    pub fn remove_with_rng<R: Rng + ?Sized>(
        &self,
        cloud: &PointCloud,
        rng: &mut R,
    ) -> PlaneRemoval {
        let limit = self.params.stop_fraction * cloud.len() as f64;
        let mut residual = cloud.clone();
        let mut planes = Vec::new();

        let stop = loop {
            if planes.len() >= self.params.max_planes {
                break StopReason::IterationCap;
            }
            if (residual.len() as f64) < limit {
                break StopReason::BelowStopFraction;
            }

            match self.fit(&residual, rng) {
                Ok(model) => {
                    debug!(
                        "plane {} removed: {} inliers, coefficients {:?}",
                        planes.len(),
                        model.inliers.len(),
                        model.coefficients()
                    );
                    residual = residual.select_complement(&model.inliers);
                    planes.push(model);
                }
                Err(e) => {
                    warn!("{e}, keeping {} residual points", residual.len());
                    break StopReason::PlaneFitFailed;
                }
            }
        };

        PlaneRemoval {
            residual,
            planes,
            stop,
        }
    }

    /// Best supported plane of `cloud` by RANSAC, optionally refined by least squares.
    pub fn fit<R: Rng + ?Sized>(&self, cloud: &PointCloud, rng: &mut R) -> Result<PlaneModel> {
        if cloud.len() < 3 {
            return Err(Error::PlaneFitFailed);
        }

        let threshold = self.params.distance_threshold;
        let mut best: Option<(Vector3<f32>, f64, usize)> = None;

        for _ in 0..self.params.ransac_iterations {
            let sample = rand::seq::index::sample(rng, cloud.len(), 3);
            let Some((normal, d)) = plane_from_points(
                &cloud[sample.index(0)],
                &cloud[sample.index(1)],
                &cloud[sample.index(2)],
            ) else {
                continue;
            };

            let count = cloud
                .iter()
                .filter(|p| calc_point_to_plane_d(p, &normal, d).abs() <= threshold)
                .count();
            if best.map_or(true, |(_, _, best_count)| count > best_count) {
                best = Some((normal, d, count));
            }
        }

        let (normal, d, count) = best.ok_or(Error::PlaneFitFailed)?;
        if count == 0 {
            return Err(Error::PlaneFitFailed);
        }

        let mut model = PlaneModel {
            normal,
            d,
            inliers: collect_inliers(cloud, &normal, d, threshold),
        };

        if self.params.optimize_coefficients && model.inliers.len() >= 3 {
            if let Some((normal, d)) = estimate_plane(&cloud.select(&model.inliers)) {
                let inliers = collect_inliers(cloud, &normal, d, threshold);
                if inliers.len() >= model.inliers.len() {
                    model = PlaneModel { normal, d, inliers };
                }
            }
        }

        Ok(model)
    }
}

fn collect_inliers(
    cloud: &PointCloud,
    normal: &Vector3<f32>,
    d: f64,
    threshold: f64,
) -> Vec<usize> {
    cloud
        .iter()
        .enumerate()
        .filter(|(_, p)| calc_point_to_plane_d(p, normal, d).abs() <= threshold)
        .map(|(i, _)| i)
        .collect()
}

/// Plane through three points, `None` when they are (nearly) collinear.
fn plane_from_points(a: &Point3D, b: &Point3D, c: &Point3D) -> Option<(Vector3<f32>, f64)> {
    let a = a.coords().cast::<f64>();
    let ab = b.coords().cast::<f64>() - a;
    let ac = c.coords().cast::<f64>() - a;

    let cross = ab.cross(&ac);
    let norm = cross.norm();
    if norm <= 1e-12 * ab.norm().max(1.0) * ac.norm().max(1.0) {
        return None;
    }

    let mut normal = cross / norm;
    if normal[2] < 0.0 {
        normal = -normal;
    }
    let d = -normal.dot(&a);
    Some((normal.cast::<f32>(), d))
}

/// Least squares plane of `ground`: the normal is the singular vector of the
/// covariance with the smallest singular value.
fn estimate_plane(ground: &PointCloud) -> Option<(Vector3<f32>, f64)> {
    if ground.len() < 3 {
        return None;
    }
    let eigen_ground = ground.into_cloud();

    let mean = eigen_ground.row_mean();
    let centered = eigen_ground
        .row_iter()
        .map(|row| row - &mean)
        .collect::<Vec<_>>();
    let centered = MatrixXx3::from_rows(centered.as_slice());

    let cov = (centered.transpose() * &centered) / (centered.nrows() as f32 - 1.0);
    let mut svd = nalgebra::SVD::new(cov, true, false);
    let u = svd.u.take()?;

    let column = u.column(svd.singular_values.imin());
    let mut normal = Vector3::new(column[0], column[1], column[2]);
    let norm = normal.norm();
    if !norm.is_finite() || norm == 0.0 {
        return None;
    }
    normal /= norm;
    if normal[2] < 0.0 {
        normal = -normal;
    }

    let pc_mean = Vector3::new(mean[0], mean[1], mean[2]);
    let d = -(normal.dot(&pc_mean) as f64);
    Some((normal, d))
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    fn floor(n: usize, spacing: f32) -> PointCloud {
        let mut cloud = PointCloud::new();
        for i in 0..n {
            for j in 0..n {
                cloud.push(Point3D::new(i as f32 * spacing, j as f32 * spacing, 0.0));
            }
        }
        cloud
    }

    fn remover(max_planes: usize) -> PlaneRemover {
        PlaneRemover::new(PlaneParams {
            max_planes,
            seed: Some(3),
            ..PlaneParams::default()
        })
    }

    #[test]
    fn test_plane_from_collinear_points() {
        let a = Point3D::new(0.0, 0.0, 0.0);
        let b = Point3D::new(1.0, 1.0, 1.0);
        let c = Point3D::new(2.0, 2.0, 2.0);
        assert!(plane_from_points(&a, &b, &c).is_none());
    }

    #[test]
    fn test_plane_from_points_orients_up() {
        let (normal, d) = plane_from_points(
            &Point3D::new(0.0, 0.0, 1.0),
            &Point3D::new(0.0, 1.0, 1.0),
            &Point3D::new(1.0, 0.0, 1.0),
        )
        .unwrap();
        assert_abs_diff_eq!(normal[2], 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(d, -1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_estimate_plane_tilted() {
        // z = 0.5 x + 0.2
        let cloud: PointCloud = (0..50)
            .map(|i| {
                let x = (i % 10) as f32 * 0.1;
                let y = (i / 10) as f32 * 0.1;
                Point3D::new(x, y, 0.5 * x + 0.2)
            })
            .collect();
        let (normal, d) = estimate_plane(&cloud).unwrap();
        let expected = Vector3::new(-0.5f32, 0.0, 1.0).normalize();
        assert_abs_diff_eq!(normal, expected, epsilon = 1e-3);
        for p in cloud.iter() {
            assert_abs_diff_eq!(calc_point_to_plane_d(p, &normal, d), 0.0, epsilon = 1e-3);
        }
    }

    #[test]
    fn test_fit_finds_floor() {
        let mut cloud = floor(10, 0.1);
        cloud.push(Point3D::new(0.3, 0.3, 0.5));
        cloud.push(Point3D::new(0.4, 0.3, 0.6));

        let mut rng = StdRng::seed_from_u64(11);
        let model = remover(1).fit(&cloud, &mut rng).unwrap();
        assert_eq!(model.inliers.len(), 100);
        assert!(!model.inliers.contains(&100));
        assert!(!model.inliers.contains(&101));
        assert_abs_diff_eq!(model.normal[2], 1.0, epsilon = 1e-4);
    }

    #[test]
    fn test_fit_too_few_points() {
        let cloud = PointCloud::from(vec![
            Point3D::new(0.0, 0.0, 0.0),
            Point3D::new(1.0, 0.0, 0.0),
        ]);
        let mut rng = StdRng::seed_from_u64(1);
        assert!(matches!(
            remover(1).fit(&cloud, &mut rng),
            Err(Error::PlaneFitFailed)
        ));
    }

    #[test]
    fn test_fit_collinear_cloud_fails() {
        let cloud: PointCloud = (0..20).map(|i| Point3D::new(i as f32, 0.0, 0.0)).collect();
        let mut rng = StdRng::seed_from_u64(1);
        assert!(matches!(
            remover(1).fit(&cloud, &mut rng),
            Err(Error::PlaneFitFailed)
        ));
    }

    #[test]
    fn test_single_plane_removed_in_one_iteration() {
        let cloud = floor(12, 0.05);
        let removal = remover(5).remove(&cloud);
        assert_eq!(removal.planes.len(), 1);
        assert!((removal.residual.len() as f64) < 0.3 * cloud.len() as f64);
        assert_eq!(removal.stop, StopReason::BelowStopFraction);
    }

    #[test]
    fn test_two_planes_removed_up_to_cap() {
        // floor at z = 0 plus a wall at x = 2, and a few loose points
        let mut cloud = floor(10, 0.1);
        for i in 0..8 {
            for j in 0..8 {
                cloud.push(Point3D::new(2.0, i as f32 * 0.1, 0.1 + j as f32 * 0.1));
            }
        }
        for k in 0..5 {
            cloud.push(Point3D::new(
                1.0 + k as f32 * 0.13,
                0.37 * k as f32,
                0.33 + 0.21 * k as f32,
            ));
        }

        let params = PlaneParams {
            max_planes: 2,
            stop_fraction: 0.0,
            seed: Some(5),
            ..PlaneParams::default()
        };
        let removal = PlaneRemover::new(params).remove(&cloud);
        assert_eq!(removal.stop, StopReason::IterationCap);
        assert_eq!(removal.planes.len(), 2);
        assert_eq!(removal.planes[0].inliers.len(), 100);
        assert_eq!(removal.planes[1].inliers.len(), 64);
        assert_eq!(removal.residual.len(), 5);
    }

    #[test]
    fn test_fit_failure_keeps_residual() {
        let cloud = PointCloud::from(vec![
            Point3D::new(0.0, 0.0, 0.0),
            Point3D::new(1.0, 0.0, 0.0),
        ]);
        let removal = remover(3).remove(&cloud);
        assert_eq!(removal.stop, StopReason::PlaneFitFailed);
        assert!(removal.planes.is_empty());
        assert_eq!(removal.residual, cloud);
    }

    #[test]
    fn test_zero_cap_is_a_no_op() {
        let cloud = floor(5, 0.1);
        let removal = remover(0).remove(&cloud);
        assert_eq!(removal.stop, StopReason::IterationCap);
        assert_eq!(removal.residual.len(), 25);
    }
}
