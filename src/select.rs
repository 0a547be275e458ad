use serde::{Deserialize, Serialize};

use crate::{centroid::Centroid, params::SelectionParams, Error, Point3D, Result};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum SelectionResult {
    Found {
        centroid: Centroid,
        distance: f64,
    },
    #[default]
    NotFound,
}

impl SelectionResult {
    pub fn is_found(&self) -> bool {
        matches!(self, SelectionResult::Found { .. })
    }

    pub fn point(&self) -> Option<Point3D> {
        match self {
            SelectionResult::Found { centroid, .. } => Some(centroid.point),
            SelectionResult::NotFound => None,
        }
    }

    pub fn distance(&self) -> Option<f64> {
        match self {
            SelectionResult::Found { distance, .. } => Some(*distance),
            SelectionResult::NotFound => None,
        }
    }

    pub fn to_message(&self) -> TargetMessage {
        TargetMessage::from(self)
    }
}

/// What the path follower receives each frame: a point plus a validity flag.
/// `exists == false` means "no target this frame", not a failure.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetMessage {
    pub exists: bool,
    pub point: [f32; 3],
}

impl From<&SelectionResult> for TargetMessage {
    fn from(result: &SelectionResult) -> Self {
        match result.point() {
            Some(p) => TargetMessage {
                exists: true,
                point: [p.x, p.y, p.z],
            },
            None => TargetMessage {
                exists: false,
                point: [0.0, 0.0, 0.0],
            },
        }
    }
}

/// Picks the centroid closest to the reference point.
#[derive(Debug, Clone)]
pub struct NearestSelector {
    reference: Point3D,
    max_distance: Option<f64>,
}

impl Default for NearestSelector {
    fn default() -> Self {
        Self {
            reference: Point3D::origin(),
            max_distance: None,
        }
    }
}

impl NearestSelector {
    pub fn new(reference: Point3D, max_distance: Option<f64>) -> Result<Self> {
        if !reference.is_finite() {
            return Err(Error::InvalidConfig(
                "selection reference point must be finite".to_string(),
            ));
        }
        if let Some(max) = max_distance {
            if !max.is_finite() || max <= 0.0 {
                return Err(Error::InvalidConfig(format!(
                    "max selection distance must be positive, got {max}"
                )));
            }
        }
        Ok(Self {
            reference,
            max_distance,
        })
    }

    pub fn from_params(params: &SelectionParams) -> Result<Self> {
        Self::new(params.reference(), params.max_distance)
    }

    pub fn reference(&self) -> Point3D {
        self.reference
    }

    /// Strictly closest centroid, the earliest one on ties. Candidates whose
    /// distance is not finite never win.
    pub fn select(&self, centroids: &[Centroid]) -> SelectionResult {
        let mut best: Option<(&Centroid, f64)> = None;
        for centroid in centroids {
            let distance = centroid.point.distance(&self.reference);
            if !distance.is_finite() {
                continue;
            }
            if best.map_or(true, |(_, best_distance)| distance < best_distance) {
                best = Some((centroid, distance));
            }
        }

        match best {
            Some((_, distance)) if self.max_distance.map_or(false, |max| distance > max) => {
                SelectionResult::NotFound
            }
            Some((centroid, distance)) => SelectionResult::Found {
                centroid: *centroid,
                distance,
            },
            None => SelectionResult::NotFound,
        }
    }
}
