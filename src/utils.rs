use nalgebra::Vector3;

use crate::Point3D;

/// Signed distance of `point` to the plane `normal . p + d = 0`. `normal` must
/// be unit length.
pub(crate) fn calc_point_to_plane_d(point: &Point3D, normal: &Vector3<f32>, d: f64) -> f64 {
    normal[0] as f64 * point.x as f64
        + normal[1] as f64 * point.y as f64
        + normal[2] as f64 * point.z as f64
        + d
}

/// Running coordinate sum in f64, so large clusters do not lose precision.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct MeanAccumulator {
    sum: [f64; 3],
    count: usize,
    rgba: Option<u32>,
}

impl MeanAccumulator {
    pub(crate) fn push(&mut self, point: &Point3D) {
        if self.count == 0 {
            self.rgba = point.rgba;
        }
        self.sum[0] += point.x as f64;
        self.sum[1] += point.y as f64;
        self.sum[2] += point.z as f64;
        self.count += 1;
    }

    pub(crate) fn count(&self) -> usize {
        self.count
    }

    /// Mean of the pushed points, carrying the colour of the first one.
    pub(crate) fn mean(&self) -> Option<Point3D> {
        if self.count == 0 {
            return None;
        }
        let n = self.count as f64;
        Some(Point3D {
            x: (self.sum[0] / n) as f32,
            y: (self.sum[1] / n) as f32,
            z: (self.sum[2] / n) as f32,
            rgba: self.rgba,
        })
    }
}
