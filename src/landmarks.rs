// src/landmarks.rs
use nalgebra::Vector3;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::{AnalyzerError, Result};

/// Point count produced by the MediaPipe face mesh with iris refinement.
pub const FACE_MESH_POINT_COUNT: usize = 478;

/// Index table for the MediaPipe face mesh topology.
pub static MEDIAPIPE_FACE_MESH_V1: Lazy<LandmarkMap> = Lazy::new(|| LandmarkMap {
    version: "mediapipe-face-mesh-v1".to_string(),
    point_count: FACE_MESH_POINT_COUNT,
    left_eye: EyeIndices {
        upper_lid: 159,
        lower_lid: 145,
        outer_corner: 33,
        inner_corner: 133,
    },
    right_eye: EyeIndices {
        upper_lid: 386,
        lower_lid: 374,
        outer_corner: 263,
        inner_corner: 362,
    },
    left_brow: vec![55, 107, 46],
    right_brow: vec![285, 336, 276],
    mouth_left: 61,
    mouth_right: 291,
    upper_lip: 13,
    lower_lip: 14,
    nose_tip: 1,
    forehead: 10,
    chin: 152,
    left_cheek: 234,
    right_cheek: 454,
});

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EyeIndices {
    pub upper_lid: usize,
    pub lower_lid: usize,
    pub outer_corner: usize,
    pub inner_corner: usize,
}

/// Semantic role of each landmark index for one detector model version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandmarkMap {
    pub version: String,
    pub point_count: usize,
    pub left_eye: EyeIndices,
    pub right_eye: EyeIndices,
    pub left_brow: Vec<usize>,
    pub right_brow: Vec<usize>,
    pub mouth_left: usize,
    pub mouth_right: usize,
    pub upper_lip: usize,
    pub lower_lip: usize,
    pub nose_tip: usize,
    pub forehead: usize,
    pub chin: usize,
    pub left_cheek: usize,
    pub right_cheek: usize,
}

impl Default for LandmarkMap {
    fn default() -> Self {
        MEDIAPIPE_FACE_MESH_V1.clone()
    }
}

impl LandmarkMap {
    fn indices(&self) -> Vec<(&'static str, usize)> {
        let mut indices = vec![
            ("left_eye.upper_lid", self.left_eye.upper_lid),
            ("left_eye.lower_lid", self.left_eye.lower_lid),
            ("left_eye.outer_corner", self.left_eye.outer_corner),
            ("left_eye.inner_corner", self.left_eye.inner_corner),
            ("right_eye.upper_lid", self.right_eye.upper_lid),
            ("right_eye.lower_lid", self.right_eye.lower_lid),
            ("right_eye.outer_corner", self.right_eye.outer_corner),
            ("right_eye.inner_corner", self.right_eye.inner_corner),
            ("mouth_left", self.mouth_left),
            ("mouth_right", self.mouth_right),
            ("upper_lip", self.upper_lip),
            ("lower_lip", self.lower_lip),
            ("nose_tip", self.nose_tip),
            ("forehead", self.forehead),
            ("chin", self.chin),
            ("left_cheek", self.left_cheek),
            ("right_cheek", self.right_cheek),
        ];
        indices.extend(self.left_brow.iter().map(|&i| ("left_brow", i)));
        indices.extend(self.right_brow.iter().map(|&i| ("right_brow", i)));
        indices
    }

    pub fn validate(&self) -> Result<()> {
        if self.left_brow.is_empty() || self.right_brow.is_empty() {
            return Err(AnalyzerError::InvalidLandmarkMap(format!(
                "{}: brow index lists must not be empty",
                self.version
            )));
        }
        if let Some((role, idx)) = self
            .indices()
            .into_iter()
            .find(|(_, idx)| *idx >= self.point_count)
        {
            return Err(AnalyzerError::InvalidLandmarkMap(format!(
                "{}: {} index {} out of range for {} points",
                self.version, role, idx, self.point_count
            )));
        }
        Ok(())
    }
}

/// One detector output: normalized x/y in frame space, z as relative depth.
#[derive(Debug, Clone, PartialEq)]
pub struct LandmarkSet {
    points: Vec<Vector3<f64>>,
}

impl LandmarkSet {
    pub fn new(points: Vec<Vector3<f64>>, expected: usize) -> Result<Self> {
        if points.len() != expected {
            return Err(AnalyzerError::LandmarkCount {
                expected,
                found: points.len(),
            });
        }
        Ok(Self { points })
    }

    /// Builds a set whose length is already known to match its map.
    pub(crate) fn from_points(points: Vec<Vector3<f64>>) -> Self {
        Self { points }
    }

    pub fn from_raw(raw: &[[f64; 3]], expected: usize) -> Result<Self> {
        let points = raw
            .iter()
            .map(|p| Vector3::new(p[0], p[1], p[2]))
            .collect();
        Self::new(points, expected)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn point(&self, index: usize) -> &Vector3<f64> {
        &self.points[index]
    }

    pub fn points(&self) -> &[Vector3<f64>] {
        &self.points
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Detection {
    Face(LandmarkSet),
    NoFace,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LandmarkFrame {
    pub timestamp: f64,
    pub detection: Detection,
}

impl LandmarkFrame {
    pub fn face(timestamp: f64, landmarks: LandmarkSet) -> Self {
        Self {
            timestamp,
            detection: Detection::Face(landmarks),
        }
    }

    pub fn no_face(timestamp: f64) -> Self {
        Self {
            timestamp,
            detection: Detection::NoFace,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_map_is_valid() {
        let map = LandmarkMap::default();
        assert_eq!(map.point_count, 478);
        assert!(map.validate().is_ok());
    }

    #[test]
    fn out_of_range_index_is_rejected() {
        let mut map = LandmarkMap::default();
        map.chin = 478;
        let err = map.validate().unwrap_err();
        assert!(err.to_string().contains("chin"));
    }

    #[test]
    fn empty_brow_is_rejected() {
        let mut map = LandmarkMap::default();
        map.right_brow.clear();
        assert!(matches!(
            map.validate(),
            Err(AnalyzerError::InvalidLandmarkMap(_))
        ));
    }

    #[test]
    fn landmark_set_checks_count() {
        let err = LandmarkSet::from_raw(&[[0.0; 3]; 10], 478).unwrap_err();
        assert!(matches!(
            err,
            AnalyzerError::LandmarkCount {
                expected: 478,
                found: 10
            }
        ));
        let set = LandmarkSet::from_raw(&vec![[0.5, 0.25, -0.1]; 478], 478).unwrap();
        assert_eq!(set.len(), 478);
        assert_eq!(*set.point(7), Vector3::new(0.5, 0.25, -0.1));
    }
}
