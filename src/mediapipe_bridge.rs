// src/mediapipe_bridge.rs - landmark sources standing in for the face mesh model
use nalgebra::{Vector2, Vector3};
use serde::Deserialize;
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;
use tracing::debug;

use crate::error::Result;
use crate::landmarks::{LandmarkFrame, LandmarkMap, LandmarkSet};

/// Anything that yields one face mesh result per captured frame.
/// `Ok(None)` ends the stream.
pub trait LandmarkSource {
    fn next_frame(&mut self) -> Result<Option<LandmarkFrame>>;
}

#[derive(Debug, Deserialize)]
struct RecordedFrame {
    timestamp: f64,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    landmarks: Option<Vec<[f64; 3]>>,
}

/// Replays face mesh output recorded as JSON lines:
/// `{"timestamp": 0.033, "confidence": 0.92, "landmarks": [[x, y, z], ...]}`.
/// A null/absent `landmarks` field or a confidence under the threshold is a
/// frame without a face.
pub struct FaceMeshReplay<R> {
    lines: Lines<R>,
    point_count: usize,
    min_confidence: f64,
}

impl FaceMeshReplay<BufReader<File>> {
    pub fn open(path: impl AsRef<Path>, point_count: usize, min_confidence: f64) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self::from_reader(BufReader::new(file), point_count, min_confidence))
    }
}

impl<R: BufRead> FaceMeshReplay<R> {
    pub fn from_reader(reader: R, point_count: usize, min_confidence: f64) -> Self {
        Self {
            lines: reader.lines(),
            point_count,
            min_confidence,
        }
    }
}

impl<R: BufRead> LandmarkSource for FaceMeshReplay<R> {
    fn next_frame(&mut self) -> Result<Option<LandmarkFrame>> {
        for line in self.lines.by_ref() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            let recorded: RecordedFrame = serde_json::from_str(&line)?;
            let confident = match recorded.confidence {
                Some(c) => c >= self.min_confidence,
                None => true,
            };

            let frame = match recorded.landmarks {
                Some(raw) if confident => LandmarkFrame::face(
                    recorded.timestamp,
                    LandmarkSet::from_raw(&raw, self.point_count)?,
                ),
                Some(_) => {
                    debug!(
                        "Detection at {:.3}s below confidence {:.2}",
                        recorded.timestamp, self.min_confidence
                    );
                    LandmarkFrame::no_face(recorded.timestamp)
                }
                None => LandmarkFrame::no_face(recorded.timestamp),
            };
            return Ok(Some(frame));
        }
        Ok(None)
    }
}

/// Parametric face used for simulation and tests. Only the mapped landmark
/// indices are placed; every other point sits at the frame center.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceShape {
    /// Target eye aspect ratio for both eyes.
    pub eye_openness: f64,
    /// Vertical gap between brow centroid and upper lid.
    pub brow_lift: f64,
    pub mouth_width: f64,
    pub mouth_height: f64,
    /// Horizontal nose displacement from the midline.
    pub nose_shift: f64,
    /// Translation applied to the whole face.
    pub offset: Vector2<f64>,
}

impl Default for FaceShape {
    fn default() -> Self {
        Self {
            eye_openness: 0.30,
            brow_lift: 0.05,
            mouth_width: 0.20,
            mouth_height: 0.01,
            nose_shift: 0.0,
            offset: Vector2::zeros(),
        }
    }
}

impl FaceShape {
    const EYE_WIDTH: f64 = 0.10;
    const EYE_LINE: f64 = 0.40;
    const MOUTH_LINE: f64 = 0.72;
    const CHEEK_LINE: f64 = 0.55;

    pub fn landmarks(&self, map: &LandmarkMap) -> LandmarkSet {
        let mut points = vec![Vector3::new(0.5, 0.5, 0.0); map.point_count];
        let offset = self.offset;
        let mut place = |index: usize, x: f64, y: f64| {
            points[index] = Vector3::new(x + offset.x, y + offset.y, 0.0);
        };

        let half_lid = self.eye_openness * Self::EYE_WIDTH / 2.0;
        let upper_y = Self::EYE_LINE - half_lid;
        for (eye, brow, center) in [
            (&map.left_eye, &map.left_brow, 0.40),
            (&map.right_eye, &map.right_brow, 0.60),
        ] {
            place(eye.outer_corner, center - Self::EYE_WIDTH / 2.0, Self::EYE_LINE);
            place(eye.inner_corner, center + Self::EYE_WIDTH / 2.0, Self::EYE_LINE);
            place(eye.upper_lid, center, upper_y);
            place(eye.lower_lid, center, Self::EYE_LINE + half_lid);

            let middle = (brow.len() as f64 - 1.0) / 2.0;
            for (k, &index) in brow.iter().enumerate() {
                place(index, center + (k as f64 - middle) * 0.03, upper_y - self.brow_lift);
            }
        }

        place(map.mouth_left, 0.5 - self.mouth_width / 2.0, Self::MOUTH_LINE);
        place(map.mouth_right, 0.5 + self.mouth_width / 2.0, Self::MOUTH_LINE);
        place(map.upper_lip, 0.5, Self::MOUTH_LINE - self.mouth_height / 2.0);
        place(map.lower_lip, 0.5, Self::MOUTH_LINE + self.mouth_height / 2.0);

        place(map.nose_tip, 0.5 + self.nose_shift, Self::CHEEK_LINE);
        place(map.left_cheek, 0.30, Self::CHEEK_LINE);
        place(map.right_cheek, 0.70, Self::CHEEK_LINE);
        place(map.forehead, 0.5, 0.15);
        place(map.chin, 0.5, 0.90);

        LandmarkSet::from_points(points)
    }
}

/// Deterministic synthetic subject: slow nodding, drifting brows and mouth,
/// a blink every few seconds and a short detection dropout every 20 seconds.
pub struct SimulatedFace {
    map: LandmarkMap,
    sim_time: f64,
    frame_interval: f64,
    remaining: usize,
}

impl SimulatedFace {
    pub const BLINK_PERIOD: f64 = 4.0;
    pub const BLINK_DURATION: f64 = 0.15;
    pub const DROPOUT_PERIOD: f64 = 20.0;
    pub const DROPOUT_DURATION: f64 = 0.5;

    pub fn new(map: LandmarkMap, frames: usize) -> Self {
        Self {
            map,
            sim_time: 0.0,
            frame_interval: 0.033,
            remaining: frames,
        }
    }

    pub fn shape_at(t: f64) -> FaceShape {
        let blinking = t % Self::BLINK_PERIOD > Self::BLINK_PERIOD - Self::BLINK_DURATION;
        FaceShape {
            eye_openness: if blinking { 0.08 } else { 0.30 },
            brow_lift: 0.04 + 0.02 * (t * 0.3).sin(),
            mouth_width: 0.20,
            mouth_height: 0.012 + 0.008 * (t * 0.5).sin(),
            nose_shift: 0.01 * (t * 0.2).sin(),
            offset: Vector2::new(0.0, 0.02 * (t * 1.5).sin()),
        }
    }

    fn face_visible(t: f64) -> bool {
        let phase = t % Self::DROPOUT_PERIOD;
        !(Self::DROPOUT_PERIOD / 2.0..Self::DROPOUT_PERIOD / 2.0 + Self::DROPOUT_DURATION)
            .contains(&phase)
    }
}

impl LandmarkSource for SimulatedFace {
    fn next_frame(&mut self) -> Result<Option<LandmarkFrame>> {
        if self.remaining == 0 {
            return Ok(None);
        }
        self.remaining -= 1;

        let t = self.sim_time;
        self.sim_time += self.frame_interval;

        let frame = if Self::face_visible(t) {
            LandmarkFrame::face(t, Self::shape_at(t).landmarks(&self.map))
        } else {
            LandmarkFrame::no_face(t)
        };
        Ok(Some(frame))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AnalyzerError;
    use crate::landmarks::Detection;
    use std::io::Cursor;

    fn recorded_line(timestamp: f64, confidence: Option<f64>, count: usize) -> String {
        let points = vec![[0.5, 0.5, 0.0]; count];
        let mut value = serde_json::json!({ "timestamp": timestamp, "landmarks": points });
        if let Some(c) = confidence {
            value["confidence"] = serde_json::json!(c);
        }
        value.to_string()
    }

    #[test]
    fn replay_reads_faces_and_gaps() {
        let input = format!(
            "{}\n\n{{\"timestamp\": 0.066, \"landmarks\": null}}\n{}\n",
            recorded_line(0.033, Some(0.9), 478),
            recorded_line(0.099, Some(0.2), 478),
        );
        let mut replay = FaceMeshReplay::from_reader(Cursor::new(input), 478, 0.5);

        let first = replay.next_frame().unwrap().unwrap();
        assert_eq!(first.timestamp, 0.033);
        assert!(matches!(first.detection, Detection::Face(_)));

        let second = replay.next_frame().unwrap().unwrap();
        assert_eq!(second.detection, Detection::NoFace);

        let low_confidence = replay.next_frame().unwrap().unwrap();
        assert_eq!(low_confidence.detection, Detection::NoFace);

        assert!(replay.next_frame().unwrap().is_none());
    }

    #[test]
    fn replay_rejects_truncated_meshes() {
        let input = recorded_line(0.0, None, 12);
        let mut replay = FaceMeshReplay::from_reader(Cursor::new(input), 478, 0.5);
        assert!(matches!(
            replay.next_frame(),
            Err(AnalyzerError::LandmarkCount { expected: 478, found: 12 })
        ));
    }

    #[test]
    fn face_shape_fills_every_point() {
        let map = LandmarkMap::default();
        let set = FaceShape::default().landmarks(&map);
        assert_eq!(set.len(), map.point_count);
        assert_eq!(set.point(map.chin).y, 0.90);
    }

    #[test]
    fn simulation_is_finite_and_ordered() {
        let mut source = SimulatedFace::new(LandmarkMap::default(), 700);
        let mut last = f64::NEG_INFINITY;
        let mut frames = 0;
        let mut gaps = 0;
        while let Some(frame) = source.next_frame().unwrap() {
            assert!(frame.timestamp > last);
            last = frame.timestamp;
            frames += 1;
            if frame.detection == Detection::NoFace {
                gaps += 1;
            }
        }
        assert_eq!(frames, 700);
        // 700 frames span ~23s, crossing one dropout window at 10s.
        assert!(gaps > 0);
    }
}
