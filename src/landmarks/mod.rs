//! Face-mesh landmarks and the detector seam.
//!
//! The landmark detector is an external collaborator: it receives a frame
//! view and returns normalized landmarks in the fixed face-mesh topology
//! (468 mesh points, plus 10 iris points when iris refinement is enabled).
//! Coordinates are normalized: `x` and `y` in `[0, 1]` relative to the frame
//! width and height, `z` a relative depth on roughly the same scale as `x`.

use anyhow::{bail, Result};

use crate::frame::FrameView;

mod synthetic;

pub use synthetic::{FaceScript, SyntheticFaceDetector};

/// Mesh points without iris refinement.
pub const FACE_MESH_POINTS: usize = 468;
/// Mesh points with iris refinement.
pub const REFINED_MESH_POINTS: usize = 478;

pub const NOSE_TIP: usize = 1;
pub const LEFT_EYE_OUTER: usize = 33;
pub const RIGHT_EYE_OUTER: usize = 263;
pub const MOUTH_LEFT: usize = 61;
pub const MOUTH_RIGHT: usize = 291;
pub const CHIN: usize = 199;

/// Rigid substructure used for head pose, in solve order.
pub const HEAD_POSE_IDS: [usize; 6] = [
    LEFT_EYE_OUTER,
    RIGHT_EYE_OUTER,
    NOSE_TIP,
    MOUTH_LEFT,
    MOUTH_RIGHT,
    CHIN,
];

/// Five points per iris: center first, then the four boundary points.
pub const LEFT_IRIS_IDS: [usize; 5] = [468, 469, 470, 471, 472];
pub const RIGHT_IRIS_IDS: [usize; 5] = [473, 474, 475, 476, 477];

/// Both irises, in solve order.
pub const IRIS_POSE_IDS: [usize; 10] = [468, 469, 470, 471, 472, 473, 474, 475, 476, 477];

/// One normalized landmark.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Landmark {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Landmark {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Pixel position for a frame of the given size.
    pub fn to_pixels(&self, width: u32, height: u32) -> (f64, f64) {
        (self.x * width as f64, self.y * height as f64)
    }
}

/// Landmarks for one detected face, indexed by topology id.
#[derive(Clone, Debug, Default)]
pub struct LandmarkSet {
    points: Vec<Landmark>,
}

impl LandmarkSet {
    pub fn new(points: Vec<Landmark>) -> Self {
        Self { points }
    }

    pub fn get(&self, id: usize) -> Option<&Landmark> {
        self.points.get(id)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// True when the iris points are present.
    pub fn has_iris(&self) -> bool {
        self.points.len() >= REFINED_MESH_POINTS
    }

    pub fn points(&self) -> &[Landmark] {
        &self.points
    }
}

/// Landmark detector trait.
///
/// `Ok(None)` means no face in the frame. Errors are treated by the caller
/// the same way: the tick contributes no gaze sample.
pub trait LandmarkDetector: Send {
    /// Detector identifier.
    fn name(&self) -> &'static str;

    /// Detect the first face in the frame.
    fn detect(&mut self, frame: &FrameView<'_>) -> Result<Option<LandmarkSet>>;
}

/// Pick the landmark detector for a camera.
///
/// `stub://` cameras pair with the synthetic face. No mesh backend is built
/// into this crate, so a real camera is rejected unless `allow_synthetic`
/// is set; the synthetic face then replaces whatever the camera sees.
pub fn detector_for_device(
    device: &str,
    synthetic: SyntheticFaceDetector,
    allow_synthetic: bool,
) -> Result<Box<dyn LandmarkDetector>> {
    if !device.starts_with("stub://") {
        if !allow_synthetic {
            bail!(
                "camera {} has no landmark backend; pass --synthetic-face to score a synthetic face",
                device
            );
        }
        log::warn!(
            "camera {}: landmarks come from a synthetic face, gaze does not reflect the camera",
            device
        );
    }
    Ok(Box::new(synthetic))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn landmark_scales_to_pixels() {
        let lm = Landmark::new(0.25, 0.5, -0.01);
        assert_eq!(lm.to_pixels(640, 480), (160.0, 240.0));
    }

    #[test]
    fn iris_presence_follows_topology_size() {
        let plain = LandmarkSet::new(vec![Landmark::default(); FACE_MESH_POINTS]);
        let refined = LandmarkSet::new(vec![Landmark::default(); REFINED_MESH_POINTS]);
        assert!(!plain.has_iris());
        assert!(plain.get(IRIS_POSE_IDS[0]).is_none());
        assert!(refined.has_iris());
        assert!(refined.get(IRIS_POSE_IDS[9]).is_some());
    }

    #[test]
    fn stub_cameras_use_the_synthetic_face() -> Result<()> {
        let detector = detector_for_device("stub://desk", SyntheticFaceDetector::frontal(), false)?;
        assert_eq!(detector.name(), "synthetic-face");
        Ok(())
    }

    #[test]
    fn real_cameras_need_synthetic_opt_in() {
        let err = detector_for_device("/dev/video0", SyntheticFaceDetector::frontal(), false)
            .err()
            .expect("real camera without a landmark backend should be rejected");
        assert!(err.to_string().contains("--synthetic-face"));

        assert!(detector_for_device("/dev/video0", SyntheticFaceDetector::frontal(), true).is_ok());
    }
}
