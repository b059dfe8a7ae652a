//! Rigid rotation and orthographic projection of the crystal

use crate::geometry::{Mesh, Vertex3};
use nalgebra::{Point2, Rotation3, Vector2, Vector3};
use serde::Serialize;

/// Relative rotation rate of each axis under the idle spin
const AXIS_RATES: [f64; 3] = [0.7, 1.0, 0.3];

/// How strongly the pointer offset speeds up or slows down the spin
const POINTER_INFLUENCE: f64 = 0.5;

/// Accumulated rotation angles in radians
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct RotationAccumulator {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl RotationAccumulator {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Advance by one frame of idle spin, nudged by the pointer.
    ///
    /// `pointer_offset` is the pointer position relative to the viewport
    /// centre, roughly in [-1, 1] per axis. Horizontal offset drives the y
    /// spin, vertical offset the x spin. Angles never decrease.
    pub fn advance(self, speed: f64, pointer_offset: Vector2<f64>) -> Self {
        let speed = if speed.is_finite() { speed.max(0.0) } else { 0.0 };
        let px = finite_or_zero(pointer_offset.x).clamp(-1.0, 1.0);
        let py = finite_or_zero(pointer_offset.y).clamp(-1.0, 1.0);

        Self {
            x: self.x + speed * AXIS_RATES[0] * (1.0 + POINTER_INFLUENCE * py),
            y: self.y + speed * AXIS_RATES[1] * (1.0 + POINTER_INFLUENCE * px),
            z: self.z + speed * AXIS_RATES[2],
        }
    }

    /// Combined rotation, applied X first, then Y, then Z
    pub fn matrix(&self) -> Rotation3<f64> {
        let rx = Rotation3::from_axis_angle(&Vector3::x_axis(), self.x);
        let ry = Rotation3::from_axis_angle(&Vector3::y_axis(), self.y);
        let rz = Rotation3::from_axis_angle(&Vector3::z_axis(), self.z);
        rz * ry * rx
    }
}

fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

/// Projected mesh for one frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Projection {
    /// Screen-space points, index-aligned with the mesh vertices
    pub points: Vec<Point2<f64>>,
    /// Rotated object-space vertices, kept for depth sorting and culling
    pub rotated: Vec<Vertex3>,
}

/// Rotate `mesh` and project it orthographically around `center`
pub fn project(
    mesh: &Mesh,
    rotation: &RotationAccumulator,
    scale: f64,
    center: Point2<f64>,
) -> Projection {
    let r = rotation.matrix();
    let rotated: Vec<Vertex3> = mesh.vertices.iter().map(|v| r * *v).collect();
    let points = rotated
        .iter()
        .map(|v| Point2::new(v.x * scale + center.x, v.y * scale + center.y))
        .collect();

    Projection { points, rotated }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{generate_mesh, Face, GeometryParams};
    use std::f64::consts::FRAC_PI_2;

    fn single_vertex(v: Vertex3) -> Mesh {
        Mesh {
            vertices: vec![v],
            faces: vec![Face::new(0, 0, 0)],
        }
    }

    #[test]
    fn test_identity_projection() {
        let mesh = single_vertex(Vector3::new(1.0, -2.0, 5.0));
        let proj = project(&mesh, &RotationAccumulator::default(), 10.0, Point2::new(100.0, 50.0));
        assert!((proj.points[0].x - 110.0).abs() < 1e-12);
        assert!((proj.points[0].y - 30.0).abs() < 1e-12);
        // z is dropped, but kept in the rotated copy
        assert!((proj.rotated[0].z - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_rotation_about_z() {
        let mesh = single_vertex(Vector3::new(1.0, 0.0, 0.0));
        let rot = RotationAccumulator::new(0.0, 0.0, FRAC_PI_2);
        let proj = project(&mesh, &rot, 1.0, Point2::origin());
        assert!(proj.points[0].x.abs() < 1e-12);
        assert!((proj.points[0].y - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_rotation_order_x_then_y() {
        // y-axis vector: X rotation by 90deg maps it to +z, then Y by 90deg maps +z to +x
        let mesh = single_vertex(Vector3::new(0.0, 1.0, 0.0));
        let rot = RotationAccumulator::new(FRAC_PI_2, FRAC_PI_2, 0.0);
        let proj = project(&mesh, &rot, 1.0, Point2::origin());
        let v = proj.rotated[0];
        assert!((v.x - 1.0).abs() < 1e-12, "{:?}", v);
        assert!(v.y.abs() < 1e-12);
        assert!(v.z.abs() < 1e-12);
    }

    #[test]
    fn test_projection_preserves_lengths() {
        let mesh = generate_mesh(&GeometryParams::default());
        let rot = RotationAccumulator::new(0.3, 1.1, -0.4);
        let proj = project(&mesh, &rot, 1.0, Point2::origin());
        assert_eq!(proj.points.len(), mesh.vertex_count());
        assert_eq!(proj.rotated.len(), mesh.vertex_count());
        for (orig, rotated) in mesh.vertices.iter().zip(&proj.rotated) {
            assert!((orig.norm() - rotated.norm()).abs() < 1e-12);
        }
    }

    #[test]
    fn test_advance_is_monotonic() {
        let mut rot = RotationAccumulator::default();
        let offsets = [
            Vector2::new(-1.0, -1.0),
            Vector2::new(5.0, -3.0),
            Vector2::new(0.0, 0.0),
            Vector2::new(f64::NAN, 1.0),
        ];
        for offset in offsets.iter().cycle().take(100) {
            let next = rot.advance(0.01, *offset);
            assert!(next.x >= rot.x);
            assert!(next.y >= rot.y);
            assert!(next.z >= rot.z);
            rot = next;
        }
        assert!(rot.y > 0.0);
    }

    #[test]
    fn test_advance_zero_speed() {
        let rot = RotationAccumulator::new(1.0, 2.0, 3.0);
        assert_eq!(rot.advance(0.0, Vector2::new(1.0, 1.0)), rot);
    }
}
