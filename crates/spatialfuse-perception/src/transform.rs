//! World Transformer.
//!
//! Converts camera-local detections (millimetres, camera-down Y) into
//! homogeneous world-frame positions (metres, world-up Y) by applying the
//! camera's 4×4 extrinsic transform. Everything here is a pure function of
//! its inputs; the extrinsics are loaded once at startup and never change.
//!
//! # Example
//!
//! ```rust
//! use spatialfuse_perception::transform::{Mat4, world_from_camera};
//!
//! // A camera sitting at the world origin, axes aligned.
//! let cam_to_world = Mat4::identity();
//!
//! // 1.2 m straight ahead, 0.3 m below the optical axis.
//! let world = world_from_camera(0.0, 300.0, 1200.0, &cam_to_world);
//! assert!((world[1] - (-0.3)).abs() < 1e-5); // Y negated: camera-down to world-up
//! assert!((world[2] - 1.2).abs() < 1e-5);
//! assert!((world[3] - 1.0).abs() < 1e-5);
//! ```

// ────────────────────────────────────────────────────────────────────────────
// Primitive types
// ────────────────────────────────────────────────────────────────────────────

/// A homogeneous 4-vector `[x, y, z, w]`.
pub type Vec4 = [f32; 4];

/// A row-major 4×4 homogeneous transform matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mat4 {
    pub rows: [[f32; 4]; 4],
}

impl Mat4 {
    /// Create a matrix from row-major rows.
    pub fn new(rows: [[f32; 4]; 4]) -> Self {
        Self { rows }
    }

    /// The identity transform.
    pub fn identity() -> Self {
        Self::new([
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    /// Multiply this matrix by a homogeneous column vector.
    pub fn mul_vec(&self, v: Vec4) -> Vec4 {
        let mut out = [0.0f32; 4];
        for (i, row) in self.rows.iter().enumerate() {
            out[i] = row[0] * v[0] + row[1] * v[1] + row[2] * v[2] + row[3] * v[3];
        }
        out
    }
}

impl From<[[f32; 4]; 4]> for Mat4 {
    fn from(rows: [[f32; 4]; 4]) -> Self {
        Self::new(rows)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Camera-to-world conversion
// ────────────────────────────────────────────────────────────────────────────

/// Transform one camera-local detection position into the world frame.
///
/// Steps, in order:
/// 1. millimetres → metres,
/// 2. negate Y (the camera frame points Y down, the world frame Y up),
/// 3. lift to a homogeneous vector with `w = 1`,
/// 4. apply `cam_to_world`.
///
/// Must never be called on a ghost detection (`z_mm == 0`); callers filter
/// ghosts first.
pub fn world_from_camera(x_mm: f32, y_mm: f32, z_mm: f32, cam_to_world: &Mat4) -> Vec4 {
    let pos_cam = [x_mm / 1000.0, -y_mm / 1000.0, z_mm / 1000.0, 1.0];
    cam_to_world.mul_vec(pos_cam)
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    /// Extrinsics of a camera rotated 90° around world Z and shifted 1 m
    /// along world X. Matches the second camera in the two-camera scenarios.
    fn rotated_translated() -> Mat4 {
        Mat4::new([
            [0.0, -1.0, 0.0, 1.0],
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    #[test]
    fn identity_mul_vec_is_noop() {
        let v = Mat4::identity().mul_vec([1.0, 2.0, 3.0, 1.0]);
        assert_eq!(v, [1.0, 2.0, 3.0, 1.0]);
    }

    #[test]
    fn millimetres_become_metres() {
        let v = world_from_camera(1500.0, 0.0, 2000.0, &Mat4::identity());
        assert!((v[0] - 1.5).abs() < 1e-5);
        assert!((v[2] - 2.0).abs() < 1e-5);
    }

    #[test]
    fn y_axis_is_negated() {
        // Camera Y points down; a detection below the optical axis
        // (positive y_mm) must end up below the world origin.
        let v = world_from_camera(0.0, 250.0, 1000.0, &Mat4::identity());
        assert!((v[1] - (-0.25)).abs() < 1e-5);
    }

    #[test]
    fn homogeneous_w_is_one() {
        let v = world_from_camera(10.0, 20.0, 30.0, &Mat4::identity());
        assert!((v[3] - 1.0).abs() < 1e-5);
    }

    #[test]
    fn rotation_and_translation_applied() {
        // Camera-local (1 m, 0, 0) → rotate 90° about Z → (0, 1 m), then
        // translate +1 m along X → world (1, 1).
        let v = world_from_camera(1000.0, 0.0, 0.0, &rotated_translated());
        assert!((v[0] - 1.0).abs() < 1e-5, "x={}", v[0]);
        assert!((v[1] - 1.0).abs() < 1e-5, "y={}", v[1]);
        assert!(v[2].abs() < 1e-5);
        assert!((v[3] - 1.0).abs() < 1e-5);
    }

    #[test]
    fn translation_alone_moves_origin() {
        let shift = Mat4::new([
            [1.0, 0.0, 0.0, 2.0],
            [0.0, 1.0, 0.0, -1.0],
            [0.0, 0.0, 1.0, 0.5],
            [0.0, 0.0, 0.0, 1.0],
        ]);
        let v = world_from_camera(0.0, 0.0, 0.0, &shift);
        assert!((v[0] - 2.0).abs() < 1e-5);
        assert!((v[1] - (-1.0)).abs() < 1e-5);
        assert!((v[2] - 0.5).abs() < 1e-5);
    }
}
