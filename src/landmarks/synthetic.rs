use anyhow::Result;
use nalgebra::{Point3, Rotation3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{
    Landmark, LandmarkDetector, LandmarkSet, CHIN, FACE_MESH_POINTS, LEFT_EYE_OUTER,
    LEFT_IRIS_IDS, MOUTH_LEFT, MOUTH_RIGHT, NOSE_TIP, REFINED_MESH_POINTS, RIGHT_EYE_OUTER,
    RIGHT_IRIS_IDS,
};
use crate::frame::FrameView;

/// Fraction of the frame width the rendered face spans.
const FACE_WIDTH_FRACTION: f64 = 0.3;
/// Eye-corner to eye-corner distance of the canonical model.
const MODEL_FACE_WIDTH: f64 = 450.0;
const IRIS_RADIUS: f64 = 25.0;

/// What the synthetic detector reports for one frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FaceScript {
    /// Face looking straight at the camera.
    Frontal,
    /// Face rotated by the given angles (degrees). The rotation changes the
    /// 2D layout and the normalized depth channel; at normalized depth scale
    /// the pose solve reads it as a small angle.
    Turned { yaw_deg: f64, pitch_deg: f64 },
    /// No face detected.
    Absent,
    /// Face detected without iris refinement (iris pose cannot be solved).
    IrisLost,
}

/// Landmark detector that renders a canonical face model.
///
/// Cycles through a script of `FaceScript` entries, one per call. The face
/// is rendered centered in the frame with a perspective-free projection;
/// depth is reported normalized by frame width, as mesh detectors do.
pub struct SyntheticFaceDetector {
    script: Vec<FaceScript>,
    cursor: usize,
    jitter: Option<(f64, StdRng)>,
}

impl SyntheticFaceDetector {
    pub fn new(script: Vec<FaceScript>) -> Self {
        Self {
            script,
            cursor: 0,
            jitter: None,
        }
    }

    pub fn frontal() -> Self {
        Self::new(vec![FaceScript::Frontal])
    }

    /// Add uniform pixel noise of up to `pixels` to every landmark.
    pub fn with_jitter(mut self, pixels: f64, seed: u64) -> Self {
        self.jitter = Some((pixels.abs(), StdRng::seed_from_u64(seed)));
        self
    }

    fn next_script(&mut self) -> FaceScript {
        if self.script.is_empty() {
            return FaceScript::Absent;
        }
        let entry = self.script[self.cursor % self.script.len()];
        self.cursor += 1;
        entry
    }

    fn render(
        &mut self,
        yaw_deg: f64,
        pitch_deg: f64,
        iris: bool,
        width: u32,
        height: u32,
    ) -> LandmarkSet {
        let w = width as f64;
        let h = height as f64;
        let scale = FACE_WIDTH_FRACTION * w / MODEL_FACE_WIDTH;
        let rotation =
            Rotation3::from_euler_angles(pitch_deg.to_radians(), yaw_deg.to_radians(), 0.0);

        let count = if iris { REFINED_MESH_POINTS } else { FACE_MESH_POINTS };
        let mut points = Vec::with_capacity(count);
        for id in 0..count {
            let model = model_point(id);
            let p = rotation * model;
            let (mut px, mut py) = (w / 2.0 + scale * p.x, h / 2.0 - scale * p.y);
            if let Some((amount, rng)) = self.jitter.as_mut() {
                if *amount > 0.0 {
                    px += rng.gen_range(-*amount..=*amount);
                    py += rng.gen_range(-*amount..=*amount);
                }
            }
            points.push(Landmark::new(px / w, py / h, -scale * p.z / w));
        }
        LandmarkSet::new(points)
    }
}

impl Default for SyntheticFaceDetector {
    fn default() -> Self {
        Self::frontal()
    }
}

impl LandmarkDetector for SyntheticFaceDetector {
    fn name(&self) -> &'static str {
        "synthetic-face"
    }

    fn detect(&mut self, frame: &FrameView<'_>) -> Result<Option<LandmarkSet>> {
        let (width, height) = (frame.width(), frame.height());
        let set = match self.next_script() {
            FaceScript::Absent => None,
            FaceScript::Frontal => Some(self.render(0.0, 0.0, true, width, height)),
            FaceScript::IrisLost => Some(self.render(0.0, 0.0, false, width, height)),
            FaceScript::Turned { yaw_deg, pitch_deg } => {
                Some(self.render(yaw_deg, pitch_deg, true, width, height))
            }
        };
        Ok(set)
    }
}

/// Canonical face model (y up, z toward the camera, nose tip at the origin).
fn model_point(id: usize) -> Point3<f64> {
    let iris = |center: Point3<f64>, k: usize| -> Point3<f64> {
        let (dx, dy) = match k {
            0 => (0.0, 0.0),
            1 => (IRIS_RADIUS, 0.0),
            2 => (0.0, IRIS_RADIUS),
            3 => (-IRIS_RADIUS, 0.0),
            _ => (0.0, -IRIS_RADIUS),
        };
        Point3::new(center.x + dx, center.y + dy, center.z)
    };

    match id {
        NOSE_TIP => Point3::new(0.0, 0.0, 0.0),
        CHIN => Point3::new(0.0, -330.0, -65.0),
        LEFT_EYE_OUTER => Point3::new(-225.0, 170.0, -135.0),
        RIGHT_EYE_OUTER => Point3::new(225.0, 170.0, -135.0),
        MOUTH_LEFT => Point3::new(-150.0, -150.0, -125.0),
        MOUTH_RIGHT => Point3::new(150.0, -150.0, -125.0),
        id if LEFT_IRIS_IDS.contains(&id) => {
            iris(Point3::new(-165.0, 170.0, -125.0), id - LEFT_IRIS_IDS[0])
        }
        id if RIGHT_IRIS_IDS.contains(&id) => {
            iris(Point3::new(165.0, 170.0, -125.0), id - RIGHT_IRIS_IDS[0])
        }
        // Mesh points the pose solve never reads sit on the nose tip.
        _ => Point3::new(0.0, 0.0, 0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Frame;
    use crate::landmarks::HEAD_POSE_IDS;

    fn frame() -> Frame {
        Frame::new(vec![0; 640 * 480 * 3], 640, 480, 1)
    }

    #[test]
    fn cycles_through_script() -> Result<()> {
        let frame = frame();
        let mut detector = SyntheticFaceDetector::new(vec![
            FaceScript::Frontal,
            FaceScript::Absent,
            FaceScript::IrisLost,
        ]);

        let first = detector.detect(&frame.view())?.expect("frontal face");
        assert!(first.has_iris());
        assert!(detector.detect(&frame.view())?.is_none());
        let third = detector.detect(&frame.view())?.expect("face without iris");
        assert!(!third.has_iris());
        assert!(detector.detect(&frame.view())?.is_some());
        Ok(())
    }

    #[test]
    fn frontal_face_is_centered_and_symmetric() -> Result<()> {
        let frame = frame();
        let mut detector = SyntheticFaceDetector::frontal();
        let set = detector.detect(&frame.view())?.expect("face");

        let nose = set.get(NOSE_TIP).expect("nose");
        assert!((nose.x - 0.5).abs() < 1e-12);
        assert!((nose.y - 0.5).abs() < 1e-12);

        let left = set.get(LEFT_EYE_OUTER).expect("left eye");
        let right = set.get(RIGHT_EYE_OUTER).expect("right eye");
        assert!(((0.5 - left.x) - (right.x - 0.5)).abs() < 1e-12);
        assert!((left.z - right.z).abs() < 1e-12);
        for id in HEAD_POSE_IDS {
            assert!(set.get(id).is_some());
        }
        Ok(())
    }

    #[test]
    fn turned_face_breaks_depth_symmetry() -> Result<()> {
        let frame = frame();
        let mut detector = SyntheticFaceDetector::new(vec![FaceScript::Turned {
            yaw_deg: 30.0,
            pitch_deg: 0.0,
        }]);
        let set = detector.detect(&frame.view())?.expect("face");
        let left = set.get(LEFT_EYE_OUTER).expect("left eye");
        let right = set.get(RIGHT_EYE_OUTER).expect("right eye");
        assert!((left.z - right.z).abs() > 1e-3);
        Ok(())
    }

    #[test]
    fn jitter_is_deterministic_per_seed() -> Result<()> {
        let frame = frame();
        let mut a = SyntheticFaceDetector::frontal().with_jitter(1.5, 7);
        let mut b = SyntheticFaceDetector::frontal().with_jitter(1.5, 7);
        let sa = a.detect(&frame.view())?.expect("face");
        let sb = b.detect(&frame.view())?.expect("face");
        assert_eq!(sa.points(), sb.points());
        Ok(())
    }
}
