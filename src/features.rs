// src/features.rs - per-frame facial geometry
use nalgebra::Vector2;

use crate::error::{AnalyzerError, Result};
use crate::geometry::{centroid, distance, guarded_ratio, mean, EPSILON};
use crate::landmarks::{EyeIndices, LandmarkMap, LandmarkSet};

/// Width/height ratio reported for a fully pressed mouth.
pub const LIP_RATIO_CEILING: f64 = 60.0;

/// Raw geometry of a single frame, before any temporal processing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameFeatures {
    pub eyebrow_raise: f64,
    /// Mouth width over mouth height, capped at [`LIP_RATIO_CEILING`].
    pub lip_tension: f64,
    /// Eye aspect ratio averaged over both eyes.
    pub eye_openness: f64,
    pub nose_tip: Vector2<f64>,
    /// Forehead-to-chin distance, the normalization basis for head motion.
    pub head_length: f64,
    /// Signed cheek-to-nose distance difference (left minus right) over head width.
    pub cheek_symmetry: f64,
}

#[derive(Debug, Clone)]
pub struct FeatureExtractor {
    map: LandmarkMap,
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self {
            map: LandmarkMap::default(),
        }
    }
}

impl FeatureExtractor {
    /// Fails when the map references an index outside its own point count,
    /// so `extract` never indexes past a correctly sized set.
    pub fn new(map: LandmarkMap) -> Result<Self> {
        map.validate()?;
        Ok(Self { map })
    }

    pub fn map(&self) -> &LandmarkMap {
        &self.map
    }

    pub fn extract(&self, landmarks: &LandmarkSet) -> Result<FrameFeatures> {
        if landmarks.len() != self.map.point_count {
            return Err(AnalyzerError::LandmarkCount {
                expected: self.map.point_count,
                found: landmarks.len(),
            });
        }

        let nose = landmarks.point(self.map.nose_tip);

        Ok(FrameFeatures {
            eyebrow_raise: self.eyebrow_raise(landmarks),
            lip_tension: self.lip_tension(landmarks),
            eye_openness: self.eye_openness(landmarks),
            nose_tip: Vector2::new(nose.x, nose.y),
            head_length: distance(
                landmarks.point(self.map.forehead),
                landmarks.point(self.map.chin),
            ),
            cheek_symmetry: self.cheek_symmetry(landmarks),
        })
    }

    fn eyebrow_raise(&self, landmarks: &LandmarkSet) -> f64 {
        let side = |brow: &[usize], eye: &EyeIndices| {
            let brow_points: Vec<_> = brow.iter().map(|&i| *landmarks.point(i)).collect();
            distance(&centroid(&brow_points), landmarks.point(eye.upper_lid))
        };
        mean([
            side(&self.map.left_brow, &self.map.left_eye),
            side(&self.map.right_brow, &self.map.right_eye),
        ])
    }

    fn lip_tension(&self, landmarks: &LandmarkSet) -> f64 {
        let width = distance(
            landmarks.point(self.map.mouth_left),
            landmarks.point(self.map.mouth_right),
        );
        let height = distance(
            landmarks.point(self.map.upper_lip),
            landmarks.point(self.map.lower_lip),
        );
        if height < EPSILON {
            return LIP_RATIO_CEILING;
        }
        (width / height).min(LIP_RATIO_CEILING)
    }

    fn eye_openness(&self, landmarks: &LandmarkSet) -> f64 {
        let ear = |eye: &EyeIndices| {
            let vertical = distance(landmarks.point(eye.upper_lid), landmarks.point(eye.lower_lid));
            let horizontal = distance(
                landmarks.point(eye.outer_corner),
                landmarks.point(eye.inner_corner),
            );
            guarded_ratio(vertical, horizontal)
        };
        mean([ear(&self.map.left_eye), ear(&self.map.right_eye)])
    }

    fn cheek_symmetry(&self, landmarks: &LandmarkSet) -> f64 {
        let nose = landmarks.point(self.map.nose_tip);
        let left_cheek = landmarks.point(self.map.left_cheek);
        let right_cheek = landmarks.point(self.map.right_cheek);
        let head_width = distance(left_cheek, right_cheek);
        if head_width < EPSILON {
            return 0.0;
        }
        (distance(left_cheek, nose) - distance(right_cheek, nose)) / head_width
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mediapipe_bridge::FaceShape;
    use nalgebra::Vector3;

    fn extract(shape: &FaceShape) -> FrameFeatures {
        let extractor = FeatureExtractor::default();
        extractor
            .extract(&shape.landmarks(extractor.map()))
            .unwrap()
    }

    /// Default face with some mapped points moved onto a single location.
    fn collapsed(indices: &[usize]) -> LandmarkSet {
        let map = LandmarkMap::default();
        let mut points = FaceShape::default().landmarks(&map).points().to_vec();
        for &i in indices {
            points[i] = Vector3::new(0.5, 0.4, 0.0);
        }
        LandmarkSet::from_points(points)
    }

    #[test]
    fn eye_openness_matches_aspect_ratio() {
        let features = extract(&FaceShape {
            eye_openness: 0.3,
            ..FaceShape::default()
        });
        assert!((features.eye_openness - 0.3).abs() < 1e-9);

        let closed = extract(&FaceShape {
            eye_openness: 0.05,
            ..FaceShape::default()
        });
        assert!(closed.eye_openness < features.eye_openness);
    }

    #[test]
    fn eyebrow_raise_grows_with_brow_lift() {
        let low = extract(&FaceShape {
            brow_lift: 0.02,
            ..FaceShape::default()
        });
        let high = extract(&FaceShape {
            brow_lift: 0.06,
            ..FaceShape::default()
        });
        assert!((low.eyebrow_raise - 0.02).abs() < 1e-9);
        assert!((high.eyebrow_raise - 0.06).abs() < 1e-9);
    }

    #[test]
    fn lip_tension_is_width_over_height() {
        let features = extract(&FaceShape {
            mouth_width: 0.2,
            mouth_height: 0.01,
            ..FaceShape::default()
        });
        assert!((features.lip_tension - 20.0).abs() < 1e-6);
    }

    #[test]
    fn closed_mouth_hits_ceiling() {
        let features = extract(&FaceShape {
            mouth_height: 0.0,
            ..FaceShape::default()
        });
        assert_eq!(features.lip_tension, LIP_RATIO_CEILING);
        assert!(features.lip_tension.is_finite());
    }

    #[test]
    fn symmetry_sign_follows_nose_shift() {
        let centered = extract(&FaceShape::default());
        assert!(centered.cheek_symmetry.abs() < 1e-9);

        let toward_right = extract(&FaceShape {
            nose_shift: 0.05,
            ..FaceShape::default()
        });
        let toward_left = extract(&FaceShape {
            nose_shift: -0.05,
            ..FaceShape::default()
        });
        assert!(toward_right.cheek_symmetry > 0.0);
        assert!(toward_left.cheek_symmetry < 0.0);
        assert!((toward_right.cheek_symmetry + toward_left.cheek_symmetry).abs() < 1e-9);
    }

    #[test]
    fn translation_moves_only_the_nose_position() {
        let base = extract(&FaceShape::default());
        let moved = extract(&FaceShape {
            offset: Vector2::new(0.0, 0.1),
            ..FaceShape::default()
        });
        assert!((moved.nose_tip.y - base.nose_tip.y - 0.1).abs() < 1e-9);
        assert!((moved.head_length - base.head_length).abs() < 1e-9);
        assert!((moved.eye_openness - base.eye_openness).abs() < 1e-9);
    }

    #[test]
    fn collapsed_eye_corners_keep_openness_finite() {
        let map = LandmarkMap::default();
        let set = collapsed(&[
            map.left_eye.outer_corner,
            map.left_eye.inner_corner,
            map.right_eye.outer_corner,
            map.right_eye.inner_corner,
        ]);
        let features = FeatureExtractor::default().extract(&set).unwrap();
        assert!(features.eye_openness.is_finite());
        assert!(features.eye_openness >= 0.0);
    }

    #[test]
    fn collapsed_cheeks_give_zero_symmetry() {
        let map = LandmarkMap::default();
        let set = collapsed(&[map.left_cheek, map.right_cheek]);
        let features = FeatureExtractor::default().extract(&set).unwrap();
        assert_eq!(features.cheek_symmetry, 0.0);
    }

    #[test]
    fn map_with_out_of_range_index_is_refused() {
        let mut map = LandmarkMap::default();
        map.chin = 900;
        assert!(matches!(
            FeatureExtractor::new(map),
            Err(AnalyzerError::InvalidLandmarkMap(_))
        ));
        assert!(FeatureExtractor::new(LandmarkMap::default()).is_ok());
    }

    #[test]
    fn wrong_point_count_is_rejected() {
        let extractor = FeatureExtractor::default();
        let short = LandmarkSet::from_raw(&[[0.5; 3]; 68], 68).unwrap();
        assert!(matches!(
            extractor.extract(&short),
            Err(AnalyzerError::LandmarkCount { expected: 478, found: 68 })
        ));
    }
}
