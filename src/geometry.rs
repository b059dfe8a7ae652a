//! Procedural faceted crystal mesh
//!
//! A subdivided icosahedron whose faces are extruded into spikes or pressed
//! into craters, then radially jittered. The mesh is built once and only
//! rigidly transformed afterwards.

use crate::hash::SeededHash;
use nalgebra::Vector3;
use serde::Serialize;
use std::collections::HashMap;

/// Mesh vertex in object space
pub type Vertex3 = Vector3<f64>;

/// Centroid directions shorter than this are treated as degenerate
const MIN_CENTROID_LENGTH: f64 = 1e-9;

/// Triangle as indices into the vertex array
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Face {
    pub v0: usize,
    pub v1: usize,
    pub v2: usize,
}

impl Face {
    pub fn new(v0: usize, v1: usize, v2: usize) -> Self {
        Self { v0, v1, v2 }
    }

    pub fn indices(&self) -> [usize; 3] {
        [self.v0, self.v1, self.v2]
    }
}

/// Immutable triangle mesh
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Mesh {
    pub vertices: Vec<Vertex3>,
    pub faces: Vec<Face>,
}

impl Mesh {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }
}

/// Parameters controlling crystal generation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeometryParams {
    /// Number of 4-way subdivision rounds applied to the icosahedron
    pub subdivision_level: u32,
    /// Magnitude of spike/crater extrusion (unit-sphere radii)
    pub facet_depth: f64,
    /// Fraction of faces extruded outward; the rest become craters
    pub spike_ratio: f64,
    /// Maximum relative radial jitter per vertex
    pub jitter: f64,
    pub spike_seed: u32,
    pub jitter_seed: u32,
}

impl Default for GeometryParams {
    fn default() -> Self {
        Self {
            subdivision_level: 1,
            facet_depth: 0.12,
            spike_ratio: 0.7,
            jitter: 0.04,
            spike_seed: 1,
            jitter_seed: 2,
        }
    }
}

/// Build the crystal mesh. Equal parameters always give an identical mesh.
pub fn generate_mesh(params: &GeometryParams) -> Mesh {
    let mut mesh = icosahedron();
    for _ in 0..params.subdivision_level {
        mesh = subdivide(&mesh);
    }
    let mut mesh = extrude_facets(&mesh, params);
    apply_jitter(&mut mesh, params);

    tracing::debug!(
        vertices = mesh.vertex_count(),
        faces = mesh.face_count(),
        subdivision_level = params.subdivision_level,
        "Crystal mesh generated"
    );

    mesh
}

/// Regular icosahedron on the unit sphere
pub fn icosahedron() -> Mesh {
    let t = (1.0 + 5.0_f64.sqrt()) / 2.0;

    #[rustfmt::skip]
    let raw = [
        [-1.0,  t,   0.0], [ 1.0,  t,   0.0], [-1.0, -t,   0.0], [ 1.0, -t,   0.0],
        [ 0.0, -1.0,  t ], [ 0.0,  1.0,  t ], [ 0.0, -1.0, -t ], [ 0.0,  1.0, -t ],
        [ t,   0.0, -1.0], [ t,   0.0,  1.0], [-t,   0.0, -1.0], [-t,   0.0,  1.0],
    ];

    #[rustfmt::skip]
    let faces = [
        [0, 11, 5], [0, 5, 1],  [0, 1, 7],   [0, 7, 10], [0, 10, 11],
        [1, 5, 9],  [5, 11, 4], [11, 10, 2], [10, 7, 6], [7, 1, 8],
        [3, 9, 4],  [3, 4, 2],  [3, 2, 6],   [3, 6, 8],  [3, 8, 9],
        [4, 9, 5],  [2, 4, 11], [6, 2, 10],  [8, 6, 7],  [9, 8, 1],
    ];

    Mesh {
        vertices: raw
            .iter()
            .map(|v| Vector3::new(v[0], v[1], v[2]).normalize())
            .collect(),
        faces: faces.iter().map(|f| Face::new(f[0], f[1], f[2])).collect(),
    }
}

/// Split every triangle into four, pushing new vertices onto the unit sphere
pub fn subdivide(mesh: &Mesh) -> Mesh {
    let mut vertices = mesh.vertices.clone();
    let mut faces = Vec::with_capacity(mesh.faces.len() * 4);
    let mut midpoints: HashMap<(usize, usize), usize> = HashMap::new();

    let mut midpoint = |a: usize, b: usize, vertices: &mut Vec<Vertex3>| -> usize {
        let key = if a < b { (a, b) } else { (b, a) };
        *midpoints.entry(key).or_insert_with(|| {
            let mid = (vertices[a] + vertices[b]) * 0.5;
            let len = mid.norm();
            // opposite vertices never share an edge, but keep the raw midpoint if they did
            vertices.push(if len > MIN_CENTROID_LENGTH { mid / len } else { mid });
            vertices.len() - 1
        })
    };

    for face in &mesh.faces {
        let ab = midpoint(face.v0, face.v1, &mut vertices);
        let bc = midpoint(face.v1, face.v2, &mut vertices);
        let ca = midpoint(face.v2, face.v0, &mut vertices);

        faces.push(Face::new(face.v0, ab, ca));
        faces.push(Face::new(face.v1, bc, ab));
        faces.push(Face::new(face.v2, ca, bc));
        faces.push(Face::new(ab, bc, ca));
    }

    Mesh { vertices, faces }
}

/// Replace each face with a three-triangle fan around a spike or crater apex
fn extrude_facets(mesh: &Mesh, params: &GeometryParams) -> Mesh {
    let hash = SeededHash::new(params.spike_seed);
    let mut vertices = mesh.vertices.clone();
    let mut faces = Vec::with_capacity(mesh.faces.len() * 3);

    for (i, face) in mesh.faces.iter().enumerate() {
        let centroid = (vertices[face.v0] + vertices[face.v1] + vertices[face.v2]) / 3.0;
        let len = centroid.norm();
        if !len.is_finite() || len < MIN_CENTROID_LENGTH {
            tracing::warn!(face = i, "Degenerate face centroid, skipping extrusion");
            faces.push(*face);
            continue;
        }
        let direction = centroid / len;

        let apex = direction * (1.0 + facet_offset(hash.value(i), params));
        vertices.push(apex);
        let p = vertices.len() - 1;

        faces.push(Face::new(face.v0, face.v1, p));
        faces.push(Face::new(face.v1, face.v2, p));
        faces.push(Face::new(face.v2, face.v0, p));
    }

    Mesh { vertices, faces }
}

/// Signed radial offset of a facet apex: positive for spikes, negative for craters
fn facet_offset(r: f64, params: &GeometryParams) -> f64 {
    let ratio = params.spike_ratio.clamp(0.0, 1.0);
    if r < ratio {
        params.facet_depth * (0.5 + 0.5 * r / ratio)
    } else {
        let span = (1.0 - ratio).max(f64::EPSILON);
        -params.facet_depth * (0.5 + 0.5 * (r - ratio) / span)
    }
}

fn apply_jitter(mesh: &mut Mesh, params: &GeometryParams) {
    let hash = SeededHash::new(params.jitter_seed);
    for (i, v) in mesh.vertices.iter_mut().enumerate() {
        *v *= 1.0 + params.jitter * (2.0 * hash.value(i) - 1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_icosahedron_counts() {
        let mesh = icosahedron();
        assert_eq!(mesh.vertex_count(), 12);
        assert_eq!(mesh.face_count(), 20);
        for v in &mesh.vertices {
            assert!((v.norm() - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_subdivide_shares_midpoints() {
        let mesh = subdivide(&icosahedron());
        // 30 edges -> 30 shared midpoints
        assert_eq!(mesh.vertex_count(), 42);
        assert_eq!(mesh.face_count(), 80);
        for v in &mesh.vertices {
            assert!((v.norm() - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_generate_counts() {
        let mesh = generate_mesh(&GeometryParams::default());
        assert_eq!(mesh.vertex_count(), 42 + 80);
        assert_eq!(mesh.face_count(), 80 * 3);
    }

    #[test]
    fn test_generate_deterministic() {
        let params = GeometryParams::default();
        let a = generate_mesh(&params);
        let b = generate_mesh(&params);
        assert_eq!(a.faces, b.faces);
        assert_eq!(a.vertices.len(), b.vertices.len());
        for (va, vb) in a.vertices.iter().zip(&b.vertices) {
            assert_eq!(va.x.to_bits(), vb.x.to_bits());
            assert_eq!(va.y.to_bits(), vb.y.to_bits());
            assert_eq!(va.z.to_bits(), vb.z.to_bits());
        }
    }

    #[test]
    fn test_different_seeds_differ() {
        let a = generate_mesh(&GeometryParams::default());
        let b = generate_mesh(&GeometryParams {
            spike_seed: 99,
            ..GeometryParams::default()
        });
        assert_ne!(a.vertices, b.vertices);
    }

    #[test]
    fn test_vertices_finite_and_faces_valid() {
        let mesh = generate_mesh(&GeometryParams {
            subdivision_level: 2,
            ..GeometryParams::default()
        });
        for v in &mesh.vertices {
            assert!(v.x.is_finite() && v.y.is_finite() && v.z.is_finite());
        }
        for f in &mesh.faces {
            for i in f.indices() {
                assert!(i < mesh.vertex_count());
            }
        }
    }

    #[test]
    fn test_spike_and_crater_mix() {
        let params = GeometryParams {
            jitter: 0.0,
            ..GeometryParams::default()
        };
        let mesh = generate_mesh(&params);
        // apexes are appended after the 42 subdivided vertices
        let apexes = &mesh.vertices[42..];
        let spikes = apexes.iter().filter(|v| v.norm() > 1.0).count();
        let craters = apexes.iter().filter(|v| v.norm() < 1.0).count();
        assert_eq!(spikes + craters, 80);
        assert!(spikes > craters);
        assert!(craters > 0);
    }

    #[test]
    fn test_facet_offset_sign() {
        let params = GeometryParams::default();
        assert!(facet_offset(0.1, &params) > 0.0);
        assert!(facet_offset(0.9, &params) < 0.0);
        assert!(facet_offset(0.1, &params) <= params.facet_depth);
    }
}
