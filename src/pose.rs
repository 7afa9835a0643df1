//! Head and iris pose from face-mesh landmarks.
//!
//! The estimator builds 2D/3D correspondences from a fixed landmark subset,
//! solves Perspective-n-Point against a synthetic pinhole camera derived from
//! the frame size, and decomposes the rotation into Euler angles.
//!
//! The 3D points are `(x_px, y_px, z)` where `z` is the detector's relative
//! depth. This is an approximation, not a calibrated reconstruction.
//!
//! # Angle scale
//!
//! Euler angles come out of the RQ decomposition in radians and are scaled
//! by [`ANGLE_SCALE`] (360), not by `180 / pi`. The gaze thresholds are
//! calibrated against this scale; changing one without the other breaks
//! classification.

use nalgebra::{
    DMatrix, DVector, Matrix3, Matrix3x4, Matrix4, Point2, Point3, Rotation3, Vector3, Vector6,
};
use serde::Serialize;
use thiserror::Error;

use crate::landmarks::{LandmarkSet, HEAD_POSE_IDS, IRIS_POSE_IDS};

/// Scale applied to RQ Euler angles (radians).
pub const ANGLE_SCALE: f64 = 360.0;

/// Minimum correspondences for the iterative solve.
const MIN_POINTS: usize = 4;
/// Minimum correspondences for the linear (DLT) initial estimate.
const MIN_DLT_POINTS: usize = 6;
/// Smallest-to-largest point covariance eigenvalue ratio for the DLT.
const MIN_DLT_PLANARITY: f64 = 1e-4;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PoseError {
    #[error("need at least {needed} point correspondences, got {got}")]
    NotEnoughPoints { needed: usize, got: usize },
    #[error("object/image point count mismatch ({object} vs {image})")]
    MismatchedPoints { object: usize, image: usize },
    #[error("landmark {0} missing from detector output")]
    MissingLandmark(usize),
    #[error("invalid image size {width}x{height}")]
    InvalidImageSize { width: u32, height: u32 },
    #[error("degenerate point configuration")]
    DegeneratePoints,
    #[error("PnP solve did not produce a finite pose")]
    NonFinite,
    #[error("solved pose places the points behind the camera")]
    BehindCamera,
}

// -------------------- Camera --------------------

/// Synthetic pinhole camera: `f = width`, principal point at the image
/// center, no distortion. Recomputed per frame so resolution may change.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraModel {
    pub focal_length: f64,
    pub cx: f64,
    pub cy: f64,
}

impl CameraModel {
    pub fn for_image(width: u32, height: u32) -> Result<Self, PoseError> {
        if width == 0 || height == 0 {
            return Err(PoseError::InvalidImageSize { width, height });
        }
        Ok(Self {
            focal_length: width as f64,
            cx: width as f64 / 2.0,
            cy: height as f64 / 2.0,
        })
    }

    pub fn matrix(&self) -> Matrix3<f64> {
        Matrix3::new(
            self.focal_length,
            0.0,
            self.cx,
            0.0,
            self.focal_length,
            self.cy,
            0.0,
            0.0,
            1.0,
        )
    }

    /// Project a camera-frame point. `None` at or behind the camera plane.
    pub fn project(&self, p: &Point3<f64>) -> Option<Point2<f64>> {
        if p.z <= f64::EPSILON {
            return None;
        }
        Some(Point2::new(
            self.focal_length * p.x / p.z + self.cx,
            self.focal_length * p.y / p.z + self.cy,
        ))
    }

    fn project_unchecked(&self, p: &Vector3<f64>) -> (f64, f64) {
        let z = if p.z.abs() < 1e-9 {
            1e-9_f64.copysign(p.z)
        } else {
            p.z
        };
        (
            self.focal_length * p.x / z + self.cx,
            self.focal_length * p.y / z + self.cy,
        )
    }
}

// -------------------- Pose estimates --------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PoseKind {
    Head,
    Iris,
}

impl PoseKind {
    pub fn landmark_ids(self) -> &'static [usize] {
        match self {
            PoseKind::Head => &HEAD_POSE_IDS,
            PoseKind::Iris => &IRIS_POSE_IDS,
        }
    }
}

/// Euler angles on the [`ANGLE_SCALE`] scale.
///
/// `theta_x` is rotation about x (vertical gaze, up/down), `theta_y` about y
/// (horizontal gaze, left/right), `theta_z` about the optical axis.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct PoseEstimate {
    pub kind: PoseKind,
    pub theta_x: f64,
    pub theta_y: f64,
    pub theta_z: f64,
}

impl PoseEstimate {
    pub fn from_rotation(kind: PoseKind, rotation: &Matrix3<f64>) -> Self {
        let angles = rq_euler(rotation) * ANGLE_SCALE;
        Self {
            kind,
            theta_x: angles.x,
            theta_y: angles.y,
            theta_z: angles.z,
        }
    }
}

// -------------------- Estimator --------------------

#[derive(Clone, Copy, Debug)]
pub struct PnpOptions {
    /// Levenberg-Marquardt iteration cap per initial estimate.
    pub max_iterations: usize,
}

impl Default for PnpOptions {
    fn default() -> Self {
        Self { max_iterations: 50 }
    }
}

/// Stateless head/iris pose estimator.
#[derive(Clone, Debug, Default)]
pub struct PoseEstimator {
    options: PnpOptions,
}

impl PoseEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn head(
        &self,
        landmarks: &LandmarkSet,
        width: u32,
        height: u32,
    ) -> Result<PoseEstimate, PoseError> {
        self.estimate(PoseKind::Head, landmarks, width, height)
    }

    pub fn iris(
        &self,
        landmarks: &LandmarkSet,
        width: u32,
        height: u32,
    ) -> Result<PoseEstimate, PoseError> {
        self.estimate(PoseKind::Iris, landmarks, width, height)
    }

    pub fn estimate(
        &self,
        kind: PoseKind,
        landmarks: &LandmarkSet,
        width: u32,
        height: u32,
    ) -> Result<PoseEstimate, PoseError> {
        let camera = CameraModel::for_image(width, height)?;
        let ids = kind.landmark_ids();

        let mut object = Vec::with_capacity(ids.len());
        let mut image = Vec::with_capacity(ids.len());
        for &id in ids {
            let lm = landmarks.get(id).ok_or(PoseError::MissingLandmark(id))?;
            let (x, y) = lm.to_pixels(width, height);
            image.push(Point2::new(x, y));
            object.push(Point3::new(x, y, lm.z));
        }

        let solution = solve_pnp(&object, &image, &camera, &self.options)?;
        Ok(PoseEstimate::from_rotation(kind, &solution.rotation_matrix()))
    }
}

// -------------------- PnP --------------------

/// Pose `T_C_W` mapping object points into the camera frame.
#[derive(Clone, Copy, Debug)]
pub struct PnpSolution {
    /// Rotation vector (axis * angle, radians).
    pub rotation: Vector3<f64>,
    pub translation: Vector3<f64>,
    /// Root-mean-square reprojection error in pixels.
    pub rms_error: f64,
}

impl PnpSolution {
    pub fn rotation_matrix(&self) -> Matrix3<f64> {
        rodrigues(&self.rotation)
    }
}

/// Solve Perspective-n-Point for a pinhole camera without distortion.
///
/// Candidate initial poses come from a weak-perspective estimate (identity
/// rotation) and, with six or more non-coplanar points, a normalized DLT. Each is refined
/// with Levenberg-Marquardt on pixel reprojection error and the lowest-cost
/// result is returned. Deterministic for fixed input.
pub fn solve_pnp(
    object: &[Point3<f64>],
    image: &[Point2<f64>],
    camera: &CameraModel,
    options: &PnpOptions,
) -> Result<PnpSolution, PoseError> {
    if object.len() != image.len() {
        return Err(PoseError::MismatchedPoints {
            object: object.len(),
            image: image.len(),
        });
    }
    let n = object.len();
    if n < MIN_POINTS {
        return Err(PoseError::NotEnoughPoints {
            needed: MIN_POINTS,
            got: n,
        });
    }
    let finite = object
        .iter()
        .all(|p| p.coords.iter().all(|v| v.is_finite()))
        && image.iter().all(|p| p.coords.iter().all(|v| v.is_finite()));
    if !finite {
        return Err(PoseError::NonFinite);
    }

    let mut seeds = Vec::with_capacity(2);
    if let Some(seed) = weak_perspective_seed(object, image, camera) {
        seeds.push(seed);
    }
    if n >= MIN_DLT_POINTS {
        if let Some(seed) = dlt_seed(object, image, camera) {
            seeds.push(seed);
        }
    }
    if seeds.is_empty() {
        return Err(PoseError::DegeneratePoints);
    }

    let refined: Vec<(Vector6<f64>, f64)> = seeds
        .into_iter()
        .map(|seed| refine(seed, object, image, camera, options.max_iterations))
        .filter(|(p, cost)| cost.is_finite() && p.iter().all(|v| v.is_finite()))
        .collect();
    if refined.is_empty() {
        return Err(PoseError::NonFinite);
    }

    let centroid = object
        .iter()
        .fold(Vector3::zeros(), |acc, p| acc + p.coords)
        / n as f64;
    let (params, cost) = refined
        .into_iter()
        .filter(|(p, _)| {
            let rotation = rodrigues(&Vector3::new(p[0], p[1], p[2]));
            (rotation * centroid + Vector3::new(p[3], p[4], p[5])).z > 0.0
        })
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .ok_or(PoseError::BehindCamera)?;

    let rotation = Vector3::new(params[0], params[1], params[2]);
    let translation = Vector3::new(params[3], params[4], params[5]);

    Ok(PnpSolution {
        rotation,
        translation,
        rms_error: (cost / n as f64).sqrt(),
    })
}

/// Rotation vector to rotation matrix.
pub fn rodrigues(rvec: &Vector3<f64>) -> Matrix3<f64> {
    Rotation3::from_scaled_axis(*rvec).into_inner()
}

/// RQ decomposition of a 3x3 matrix into Euler angles (radians).
///
/// Successive Givens rotations about x, y and z reduce `m` to upper
/// triangular form; their angles are returned as `(x, y, z)`. For a rotation
/// `m = Rz(z) * Ry(y) * Rx(x)` with `|y| < pi/2` the input angles come back.
pub fn rq_euler(m: &Matrix3<f64>) -> Vector3<f64> {
    let (sx, cx) = givens(m[(2, 1)], m[(2, 2)]);
    let qx = Matrix3::new(1.0, 0.0, 0.0, 0.0, cx, sx, 0.0, -sx, cx);
    let r = m * qx;

    let (sy, cy) = givens(-r[(2, 0)], r[(2, 2)]);
    let qy = Matrix3::new(cy, 0.0, -sy, 0.0, 1.0, 0.0, sy, 0.0, cy);
    let r = r * qy;

    let (sz, cz) = givens(r[(1, 0)], r[(1, 1)]);

    Vector3::new(sx.atan2(cx), sy.atan2(cy), sz.atan2(cz))
}

fn givens(s: f64, c: f64) -> (f64, f64) {
    let norm = (s * s + c * c + f64::EPSILON).sqrt();
    (s / norm, c / norm)
}

/// Identity rotation with translation from the point spread ratio.
fn weak_perspective_seed(
    object: &[Point3<f64>],
    image: &[Point2<f64>],
    camera: &CameraModel,
) -> Option<Vector6<f64>> {
    let n = object.len() as f64;
    let oc = object.iter().fold(Vector3::zeros(), |acc, p| acc + p.coords) / n;
    let (uc, vc) = image
        .iter()
        .fold((0.0, 0.0), |(u, v), p| (u + p.x / n, v + p.y / n));

    let spread_object = (object
        .iter()
        .map(|p| (p.x - oc.x).powi(2) + (p.y - oc.y).powi(2))
        .sum::<f64>()
        / n)
        .sqrt();
    let spread_image = (image
        .iter()
        .map(|p| (p.x - uc).powi(2) + (p.y - vc).powi(2))
        .sum::<f64>()
        / n)
        .sqrt();
    if spread_object <= f64::EPSILON || spread_image <= f64::EPSILON {
        return None;
    }

    let f = camera.focal_length;
    let depth = f * spread_object / spread_image;
    Some(Vector6::new(
        0.0,
        0.0,
        0.0,
        (uc - camera.cx) * depth / f - oc.x,
        (vc - camera.cy) * depth / f - oc.y,
        depth - oc.z,
    ))
}

/// Normalized DLT estimate of `[R | t]`, projected onto SO(3).
fn dlt_seed(
    object: &[Point3<f64>],
    image: &[Point2<f64>],
    camera: &CameraModel,
) -> Option<Vector6<f64>> {
    let n = object.len();
    let n_real = n as f64;
    let c = object.iter().fold(Vector3::zeros(), |acc, p| acc + p.coords) / n_real;
    let mean_dist = object.iter().map(|p| (p.coords - c).norm()).sum::<f64>() / n_real;
    if mean_dist <= f64::EPSILON {
        return None;
    }

    // The 3x4 DLT is rank-deficient for (near-)coplanar points.
    let covariance = object.iter().fold(Matrix3::zeros(), |acc, p| {
        let d = p.coords - c;
        acc + d * d.transpose()
    }) / n_real;
    let eigenvalues = covariance.symmetric_eigenvalues();
    let (lowest, highest) = eigenvalues
        .iter()
        .fold((f64::INFINITY, 0.0_f64), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    if highest <= 0.0 || lowest / highest < MIN_DLT_PLANARITY {
        return None;
    }

    let scale = 3.0_f64.sqrt() / mean_dist;
    let t_world = Matrix4::new(
        scale,
        0.0,
        0.0,
        -scale * c.x,
        0.0,
        scale,
        0.0,
        -scale * c.y,
        0.0,
        0.0,
        scale,
        -scale * c.z,
        0.0,
        0.0,
        0.0,
        1.0,
    );

    let f = camera.focal_length;
    let mut a = DMatrix::<f64>::zeros(2 * n, 12);
    for (i, (pw, pi)) in object.iter().zip(image.iter()).enumerate() {
        let x = (pw.x - c.x) * scale;
        let y = (pw.y - c.y) * scale;
        let z = (pw.z - c.z) * scale;
        let u = (pi.x - camera.cx) / f;
        let v = (pi.y - camera.cy) / f;

        let r0 = 2 * i;
        let r1 = 2 * i + 1;

        a[(r0, 0)] = x;
        a[(r0, 1)] = y;
        a[(r0, 2)] = z;
        a[(r0, 3)] = 1.0;
        a[(r0, 8)] = -u * x;
        a[(r0, 9)] = -u * y;
        a[(r0, 10)] = -u * z;
        a[(r0, 11)] = -u;

        a[(r1, 4)] = x;
        a[(r1, 5)] = y;
        a[(r1, 6)] = z;
        a[(r1, 7)] = 1.0;
        a[(r1, 8)] = -v * x;
        a[(r1, 9)] = -v * y;
        a[(r1, 10)] = -v * z;
        a[(r1, 11)] = -v;
    }

    // Null vector: right singular vector of the smallest singular value.
    let svd = a.svd(false, true);
    let v_t = svd.v_t?;
    let (idx, _) = svd
        .singular_values
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.total_cmp(b.1))?;
    let p_norm = Matrix3x4::from_fn(|r, col| v_t[(idx, r * 4 + col)]);
    let p_mtx = p_norm * t_world;

    let mut r_approx: Matrix3<f64> = p_mtx.fixed_view::<3, 3>(0, 0).into_owned();
    let mut s = (r_approx.row(0).norm() + r_approx.row(1).norm() + r_approx.row(2).norm()) / 3.0;
    if r_approx.determinant() < 0.0 {
        s = -s;
    }
    if s.abs() <= f64::EPSILON {
        return None;
    }
    r_approx /= s;

    let svd = r_approx.svd(true, true);
    let u = svd.u?;
    let v_t = svd.v_t?;
    let mut r_orth = u * v_t;
    if r_orth.determinant() < 0.0 {
        let mut u_flipped = u;
        u_flipped.column_mut(2).neg_mut();
        r_orth = u_flipped * v_t;
    }

    let t = p_mtx.column(3).into_owned() / s;
    let rvec = Rotation3::from_matrix_unchecked(r_orth).scaled_axis();
    let seed = Vector6::new(rvec.x, rvec.y, rvec.z, t.x, t.y, t.z);
    seed.iter().all(|v| v.is_finite()).then_some(seed)
}

fn residuals(
    params: &Vector6<f64>,
    object: &[Point3<f64>],
    image: &[Point2<f64>],
    camera: &CameraModel,
    out: &mut DVector<f64>,
) {
    let rotation = Rotation3::from_scaled_axis(Vector3::new(params[0], params[1], params[2]));
    let t = Vector3::new(params[3], params[4], params[5]);
    for (i, (pw, pi)) in object.iter().zip(image.iter()).enumerate() {
        let pc = rotation * pw.coords + t;
        let (u, v) = camera.project_unchecked(&pc);
        out[2 * i] = u - pi.x;
        out[2 * i + 1] = v - pi.y;
    }
}

/// Levenberg-Marquardt on reprojection error with a central-difference Jacobian.
fn refine(
    seed: Vector6<f64>,
    object: &[Point3<f64>],
    image: &[Point2<f64>],
    camera: &CameraModel,
    max_iterations: usize,
) -> (Vector6<f64>, f64) {
    let m = 2 * object.len();
    let mut params = seed;
    let mut r = DVector::<f64>::zeros(m);
    let mut r_plus = DVector::<f64>::zeros(m);
    let mut r_minus = DVector::<f64>::zeros(m);
    let mut jacobian = DMatrix::<f64>::zeros(m, 6);

    residuals(&params, object, image, camera, &mut r);
    let mut cost = r.norm_squared();
    let mut lambda = 1e-3;

    for _ in 0..max_iterations {
        if !cost.is_finite() || cost < 1e-24 {
            break;
        }

        for k in 0..6 {
            let h = 1e-6 * params[k].abs().max(1.0);
            let mut forward = params;
            forward[k] += h;
            residuals(&forward, object, image, camera, &mut r_plus);
            let mut backward = params;
            backward[k] -= h;
            residuals(&backward, object, image, camera, &mut r_minus);
            let column = (&r_plus - &r_minus) / (2.0 * h);
            jacobian.set_column(k, &column);
        }

        let jt = jacobian.transpose();
        let normal = &jt * &jacobian;
        let gradient = &jt * &r;
        if gradient.amax() < 1e-15 {
            break;
        }

        let mut improved = false;
        for _ in 0..10 {
            let mut damped = normal.clone();
            for k in 0..6 {
                damped[(k, k)] += lambda * normal[(k, k)].max(1e-12);
            }
            let Some(cholesky) = damped.cholesky() else {
                lambda *= 10.0;
                continue;
            };
            let step = cholesky.solve(&(-gradient.clone()));
            let candidate = params + Vector6::from_iterator(step.iter().copied());
            residuals(&candidate, object, image, camera, &mut r_plus);
            let candidate_cost = r_plus.norm_squared();
            if candidate_cost.is_finite() && candidate_cost < cost {
                params = candidate;
                r.copy_from(&r_plus);
                cost = candidate_cost;
                lambda = (lambda * 0.1).max(1e-12);
                improved = true;
                if step.norm() < 1e-12 * (params.norm() + 1e-12) {
                    return (params, cost);
                }
                break;
            }
            lambda *= 10.0;
        }
        if !improved {
            break;
        }
    }

    (params, cost)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Frame;
    use crate::landmarks::{LandmarkDetector, SyntheticFaceDetector};

    fn face_model() -> Vec<Point3<f64>> {
        vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(0.0, -330.0, -65.0),
            Point3::new(-225.0, 170.0, -135.0),
            Point3::new(225.0, 170.0, -135.0),
            Point3::new(-150.0, -150.0, -125.0),
            Point3::new(150.0, -150.0, -125.0),
        ]
    }

    fn project_all(
        object: &[Point3<f64>],
        rotation: &Rotation3<f64>,
        t: &Vector3<f64>,
        camera: &CameraModel,
    ) -> Vec<Point2<f64>> {
        object
            .iter()
            .map(|p| {
                camera
                    .project(&Point3::from(rotation * p.coords + t))
                    .expect("point in front of camera")
            })
            .collect()
    }

    #[test]
    fn camera_model_follows_image_size() {
        let cam = CameraModel::for_image(640, 480).unwrap();
        assert_eq!(cam.focal_length, 640.0);
        assert_eq!(cam.cx, 320.0);
        assert_eq!(cam.cy, 240.0);
        assert_eq!(cam.matrix()[(0, 2)], 320.0);

        assert_eq!(
            CameraModel::for_image(0, 480),
            Err(PoseError::InvalidImageSize {
                width: 0,
                height: 480
            })
        );
    }

    #[test]
    fn rq_euler_recovers_composed_angles() {
        for &(x, y, z) in &[
            (0.0, 0.0, 0.0),
            (0.1, -0.2, 0.05),
            (-0.6, 0.4, -0.3),
            (1.2, -1.0, 2.0),
        ] {
            let rot = Rotation3::from_euler_angles(x, y, z);
            let angles = rq_euler(rot.matrix());
            assert!((angles.x - x).abs() < 1e-9, "x: {} vs {}", angles.x, x);
            assert!((angles.y - y).abs() < 1e-9, "y: {} vs {}", angles.y, y);
            assert!((angles.z - z).abs() < 1e-9, "z: {} vs {}", angles.z, z);
        }
    }

    #[test]
    fn rodrigues_matches_axis_angle() {
        let rvec = Vector3::new(0.0, 0.0, std::f64::consts::FRAC_PI_2);
        let m = rodrigues(&rvec);
        let p = m * Vector3::new(1.0, 0.0, 0.0);
        assert!((p - Vector3::new(0.0, 1.0, 0.0)).norm() < 1e-12);
        assert!((rodrigues(&Vector3::zeros()) - Matrix3::identity()).norm() < 1e-15);
    }

    #[test]
    fn solve_pnp_recovers_synthetic_rotation() {
        let camera = CameraModel::for_image(640, 480).unwrap();
        let object = face_model();
        let (ax, ay, az) = (0.1, -0.2, 0.05);
        let rotation = Rotation3::from_euler_angles(ax, ay, az);
        let t = Vector3::new(10.0, -20.0, 1500.0);
        let image = project_all(&object, &rotation, &t, &camera);

        let solution = solve_pnp(&object, &image, &camera, &PnpOptions::default()).unwrap();
        assert!(solution.rms_error < 1e-6, "rms {}", solution.rms_error);
        assert!((solution.translation - t).norm() < 1e-3);

        let pose = PoseEstimate::from_rotation(PoseKind::Head, &solution.rotation_matrix());
        assert!((pose.theta_x - ax * ANGLE_SCALE).abs() < 0.01, "{:?}", pose);
        assert!((pose.theta_y - ay * ANGLE_SCALE).abs() < 0.01, "{:?}", pose);
        assert!((pose.theta_z - az * ANGLE_SCALE).abs() < 0.01, "{:?}", pose);
    }

    #[test]
    fn solve_pnp_converges_without_linear_seed() {
        let camera = CameraModel::for_image(640, 480).unwrap();
        let object: Vec<_> = face_model().into_iter().take(5).collect();
        let rotation = Rotation3::from_euler_angles(-0.05, 0.08, 0.0);
        let t = Vector3::new(0.0, 0.0, 1800.0);
        let image = project_all(&object, &rotation, &t, &camera);

        let solution = solve_pnp(&object, &image, &camera, &PnpOptions::default()).unwrap();
        assert!(solution.rms_error < 1e-3, "rms {}", solution.rms_error);
        let angles = rq_euler(&solution.rotation_matrix());
        assert!((angles.x + 0.05).abs() < 1e-3);
        assert!((angles.y - 0.08).abs() < 1e-3);
    }

    #[test]
    fn solve_pnp_rejects_bad_input() {
        let camera = CameraModel::for_image(640, 480).unwrap();
        let object = face_model();
        let image = vec![Point2::new(1.0, 2.0); 3];

        assert_eq!(
            solve_pnp(&object[..3], &image, &camera, &PnpOptions::default()).unwrap_err(),
            PoseError::NotEnoughPoints { needed: 4, got: 3 }
        );
        assert_eq!(
            solve_pnp(&object, &image, &camera, &PnpOptions::default()).unwrap_err(),
            PoseError::MismatchedPoints {
                object: 6,
                image: 3
            }
        );

        let collapsed_object = vec![Point3::new(5.0, 5.0, 0.0); 6];
        let collapsed_image = vec![Point2::new(5.0, 5.0); 6];
        assert_eq!(
            solve_pnp(
                &collapsed_object,
                &collapsed_image,
                &camera,
                &PnpOptions::default()
            )
            .unwrap_err(),
            PoseError::DegeneratePoints
        );
    }

    #[test]
    fn frontal_landmarks_give_near_zero_angles() {
        let frame = Frame::new(vec![0; 640 * 480 * 3], 640, 480, 1);
        let mut detector = SyntheticFaceDetector::frontal();
        let landmarks = detector.detect(&frame.view()).unwrap().expect("face");
        let estimator = PoseEstimator::new();

        let head = estimator.head(&landmarks, 640, 480).unwrap();
        assert_eq!(head.kind, PoseKind::Head);
        assert!(head.theta_x.abs() < 1.0, "{:?}", head);
        assert!(head.theta_y.abs() < 1.0, "{:?}", head);

        let iris = estimator.iris(&landmarks, 640, 480).unwrap();
        assert_eq!(iris.kind, PoseKind::Iris);
        assert!(iris.theta_x.abs() < 1.0, "{:?}", iris);
        assert!(iris.theta_y.abs() < 1.0, "{:?}", iris);
    }

    #[test]
    fn depth_leaning_across_the_face_reads_as_yaw() {
        let frame = Frame::new(vec![0; 640 * 480 * 3], 640, 480, 1);
        let mut detector = SyntheticFaceDetector::frontal();
        let frontal = detector.detect(&frame.view()).unwrap().expect("face");
        let slope = 0.2_f64.tan();
        let leaning = LandmarkSet::new(
            frontal
                .points()
                .iter()
                .map(|lm| crate::landmarks::Landmark::new(lm.x, lm.y, slope * lm.x * 640.0))
                .collect(),
        );

        let head = PoseEstimator::new().head(&leaning, 640, 480).unwrap();
        assert!(head.theta_y.abs() > 20.0, "{:?}", head);
        assert!(head.theta_x.abs() < head.theta_y.abs(), "{:?}", head);
    }

    #[test]
    fn estimate_is_deterministic() {
        let frame = Frame::new(vec![0; 640 * 480 * 3], 640, 480, 1);
        let mut detector = SyntheticFaceDetector::frontal().with_jitter(2.0, 11);
        let landmarks = detector.detect(&frame.view()).unwrap().expect("face");
        let estimator = PoseEstimator::new();

        let a = estimator.head(&landmarks, 640, 480);
        let b = estimator.head(&landmarks, 640, 480);
        assert_eq!(a, b);
    }

    #[test]
    fn missing_iris_landmarks_fail_the_iris_solve() {
        let landmarks = LandmarkSet::new(vec![
            crate::landmarks::Landmark::new(0.5, 0.5, 0.0);
            crate::landmarks::FACE_MESH_POINTS
        ]);
        let estimator = PoseEstimator::new();
        assert_eq!(
            estimator.iris(&landmarks, 640, 480).unwrap_err(),
            PoseError::MissingLandmark(468)
        );
    }
}
