use std::ops::{Deref, DerefMut};

/// A point in the sensor frame. `rgba` is carried through untouched.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point3D {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub rgba: Option<u32>,
}

impl Point3D {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self {
            x,
            y,
            z,
            rgba: None,
        }
    }

    pub fn with_rgba(x: f32, y: f32, z: f32, rgba: u32) -> Self {
        Self {
            x,
            y,
            z,
            rgba: Some(rgba),
        }
    }

    pub fn origin() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    pub fn distance(&self, rhs: &Point3D) -> f64 {
        self.distance_squared(rhs).sqrt()
    }

    pub fn distance_squared(&self, rhs: &Point3D) -> f64 {
        let dx = self.x as f64 - rhs.x as f64;
        let dy = self.y as f64 - rhs.y as f64;
        let dz = self.z as f64 - rhs.z as f64;
        dx * dx + dy * dy + dz * dz
    }

    pub fn coords(&self) -> nalgebra::Vector3<f32> {
        nalgebra::vector![self.x, self.y, self.z]
    }
}

/// Ordered points of one frame.
///
/// Indices into a cloud are the only cross references used between stages,
/// so a cloud is never reordered in place once a stage has produced it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointCloud(Vec<Point3D>);

impl Deref for PointCloud {
    type Target = Vec<Point3D>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for PointCloud {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl AsRef<[Point3D]> for PointCloud {
    fn as_ref(&self) -> &[Point3D] {
        self.0.as_ref()
    }
}

impl From<Vec<Point3D>> for PointCloud {
    fn from(points: Vec<Point3D>) -> Self {
        Self(points)
    }
}

impl FromIterator<Point3D> for PointCloud {
    fn from_iter<I: IntoIterator<Item = Point3D>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl PointCloud {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self(Vec::with_capacity(capacity))
    }

    pub fn add_cloud<P: AsRef<[Point3D]>>(&mut self, points: P) {
        self.0.extend(points.as_ref())
    }

    pub fn into_inner(self) -> Vec<Point3D> {
        self.0
    }

    /// Copy of the cloud without points that have a NaN or infinite coordinate.
    pub fn dense(&self) -> PointCloud {
        self.0.iter().filter(|p| p.is_finite()).copied().collect()
    }

    /// Points at `indices`, in the order given. Out of range indices are skipped.
    pub fn select(&self, indices: &[usize]) -> PointCloud {
        indices.iter().filter_map(|&i| self.0.get(i)).copied().collect()
    }

    /// Points whose index is not in `indices`, keeping cloud order.
    pub fn select_complement(&self, indices: &[usize]) -> PointCloud {
        let mut removed = vec![false; self.0.len()];
        for &i in indices {
            if let Some(flag) = removed.get_mut(i) {
                *flag = true;
            }
        }

        self.0
            .iter()
            .zip(removed)
            .filter(|(_, removed)| !removed)
            .map(|(p, _)| *p)
            .collect()
    }

    /// Axis-aligned bounds as `(min, max)`, `None` for an empty cloud.
    pub fn bounds(&self) -> Option<(Point3D, Point3D)> {
        let first = self.0.first()?;
        let mut min = Point3D::new(first.x, first.y, first.z);
        let mut max = min;
        for p in self.0.iter().skip(1) {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            min.z = min.z.min(p.z);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
            max.z = max.z.max(p.z);
        }
        Some((min, max))
    }
}

pub trait IntoCloud {
    fn into_cloud(self) -> nalgebra::MatrixXx3<f32>;
}

impl IntoCloud for &[Point3D] {
    fn into_cloud(self) -> nalgebra::MatrixXx3<f32> {
        let mut cloud = nalgebra::MatrixXx3::zeros(self.len());

        for (i, p) in self.iter().enumerate() {
            cloud[(i, 0)] = p.x;
            cloud[(i, 1)] = p.y;
            cloud[(i, 2)] = p.z;
        }

        cloud
    }
}

impl IntoCloud for &PointCloud {
    fn into_cloud(self) -> nalgebra::MatrixXx3<f32> {
        self.as_ref().into_cloud()
    }
}

impl IntoCloud for Vec<Point3D> {
    fn into_cloud(self) -> nalgebra::MatrixXx3<f32> {
        self.as_slice().into_cloud()
    }
}
