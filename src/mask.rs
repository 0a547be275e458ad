use crate::{Error, PointCloud, Result};

/// Binary image produced by the colour threshold stage; `true` marks a pixel
/// of the target colour.
#[derive(Debug, Clone, PartialEq)]
pub struct Mask {
    width: usize,
    height: usize,
    data: Vec<bool>,
}

fn pixel_count(width: usize, height: usize) -> Result<usize> {
    width.checked_mul(height).ok_or_else(|| {
        Error::InvalidInput(format!("mask of {width}x{height} overflows the pixel count"))
    })
}

impl Mask {
    pub fn new(width: usize, height: usize, data: Vec<bool>) -> Result<Self> {
        let pixels = pixel_count(width, height)?;
        if data.len() != pixels {
            return Err(Error::InvalidInput(format!(
                "mask of {}x{} needs {} pixels, got {}",
                width,
                height,
                pixels,
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Mask with every pixel set.
    pub fn full(width: usize, height: usize) -> Result<Self> {
        Ok(Self {
            width,
            height,
            data: vec![true; pixel_count(width, height)?],
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn get(&self, col: usize, row: usize) -> bool {
        col < self.width && row < self.height && self.data[row * self.width + col]
    }

    pub fn count(&self) -> usize {
        self.data.iter().filter(|&&set| set).count()
    }

    /// Keep the points of an organized (row-major, one point per pixel) cloud
    /// that fall on set pixels.
    pub fn apply(&self, cloud: &PointCloud) -> Result<PointCloud> {
        if cloud.len() != self.data.len() {
            return Err(Error::InvalidInput(format!(
                "organized cloud has {} points but the mask is {}x{}",
                cloud.len(),
                self.width,
                self.height
            )));
        }

        Ok(cloud
            .iter()
            .zip(&self.data)
            .filter(|(_, &set)| set)
            .map(|(p, _)| *p)
            .collect())
    }
}

/// Everything the core needs from one sensor tick.
#[derive(Debug, Clone, Default)]
pub struct Frame {
    pub cloud: PointCloud,
    pub mask: Option<Mask>,
}

impl Frame {
    pub fn new(cloud: PointCloud) -> Self {
        Self { cloud, mask: None }
    }

    pub fn with_mask(cloud: PointCloud, mask: Mask) -> Self {
        Self {
            cloud,
            mask: Some(mask),
        }
    }

    /// Points this frame contributes to the pipeline: masked, then without
    /// non-finite returns.
    pub fn target_points(&self) -> Result<PointCloud> {
        match &self.mask {
            Some(mask) => Ok(mask.apply(&self.cloud)?.dense()),
            None => Ok(self.cloud.dense()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Point3D;

    fn organized() -> PointCloud {
        (0..6)
            .map(|i| Point3D::new(i as f32, 0.0, 1.0))
            .collect()
    }

    #[test]
    fn test_mask_rejects_wrong_size() {
        assert!(Mask::new(3, 2, vec![true; 5]).is_err());
        assert!(Mask::new(3, 2, vec![true; 6]).is_ok());
    }

    #[test]
    fn test_apply_keeps_set_pixels() {
        let mask = Mask::new(3, 2, vec![false, true, false, false, false, true]).unwrap();
        assert_eq!(mask.count(), 2);
        assert!(mask.get(1, 0));
        assert!(!mask.get(3, 0));

        let kept = mask.apply(&organized()).unwrap();
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].x, 1.0);
        assert_eq!(kept[1].x, 5.0);
    }

    #[test]
    fn test_apply_rejects_unorganized_cloud() {
        let mask = Mask::full(4, 4).unwrap();
        assert!(matches!(
            mask.apply(&organized()),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_target_points_drop_nan_after_mask() {
        let mut cloud = organized();
        cloud[1].z = f32::NAN;
        let mask = Mask::new(3, 2, vec![true, true, false, false, false, false]).unwrap();
        let frame = Frame::with_mask(cloud, mask);
        let points = frame.target_points().unwrap();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].x, 0.0);
    }

    #[test]
    fn test_oversized_mask_dimensions() {
        assert!(matches!(Mask::new(usize::MAX, 2, vec![]), Err(Error::InvalidInput(_))));
        assert!(matches!(Mask::full(usize::MAX, usize::MAX), Err(Error::InvalidInput(_))));
    }
}
