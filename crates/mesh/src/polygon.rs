//! Indexed polygon mesh with attribute-backed visibility.
//!
//! Faces are stored as an offset-indexed corner list so mixed quad/triangle
//! meshes share one layout. Hidden state lives in optional boolean attributes:
//!
//! - `hide_vert` on points is the authored state; absence means everything
//!   is visible.
//! - `hide_face` and `hide_edge` are derived (a face is hidden iff any of its
//!   corner vertices is hidden, an edge iff either endpoint is hidden) and are
//!   recomputed by the visibility engine's flush pass, never authored
//!   independently by hide/show operators.

use std::collections::BTreeSet;
use std::ops::Range;

use glam::Vec3;

use crate::attributes::{AttrDomain, AttributeStore};

/// Authored per-vertex hidden flag.
pub const ATTR_HIDE_VERT: &str = "hide_vert";
/// Derived per-edge hidden flag.
pub const ATTR_HIDE_EDGE: &str = "hide_edge";
/// Derived per-face hidden flag.
pub const ATTR_HIDE_FACE: &str = "hide_face";
/// Per-vertex sculpt mask in `[0, 1]`.
pub const ATTR_MASK: &str = "mask";

/// An indexed polygon mesh.
#[derive(Debug, Clone)]
pub struct PolyMesh {
    positions: Vec<Vec3>,
    normals: Vec<Vec3>,
    edges: Vec<[u32; 2]>,
    face_offsets: Vec<u32>,
    corner_verts: Vec<u32>,
    pub attributes: AttributeStore,
}

impl PolyMesh {
    /// Build a mesh from positions and per-face corner lists.
    ///
    /// Edges are derived from face boundaries; vertex normals are accumulated
    /// from face normals.
    pub fn new(positions: Vec<Vec3>, faces: &[Vec<u32>]) -> Self {
        let mut face_offsets = Vec::with_capacity(faces.len() + 1);
        let mut corner_verts = Vec::new();
        face_offsets.push(0);
        for face in faces {
            corner_verts.extend_from_slice(face);
            face_offsets.push(corner_verts.len() as u32);
        }

        let mut edge_set = BTreeSet::new();
        for face in faces {
            for (i, &vert) in face.iter().enumerate() {
                let next = face[(i + 1) % face.len()];
                let (a, b) = if vert < next { (vert, next) } else { (next, vert) };
                edge_set.insert((a, b));
            }
        }
        let edges: Vec<[u32; 2]> = edge_set.into_iter().map(|(a, b)| [a, b]).collect();

        let mut normals = vec![Vec3::ZERO; positions.len()];
        for face in faces {
            let normal = newell_normal(&positions, face);
            for &vert in face {
                normals[vert as usize] += normal;
            }
        }
        for normal in &mut normals {
            *normal = normal.try_normalize().unwrap_or(Vec3::Z);
        }

        Self {
            positions,
            normals,
            edges,
            face_offsets,
            corner_verts,
            attributes: AttributeStore::new(),
        }
    }

    pub fn vert_count(&self) -> usize {
        self.positions.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn face_count(&self) -> usize {
        self.face_offsets.len() - 1
    }

    pub fn corner_count(&self) -> usize {
        self.corner_verts.len()
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    pub fn normals(&self) -> &[Vec3] {
        &self.normals
    }

    pub fn edges(&self) -> &[[u32; 2]] {
        &self.edges
    }

    /// Corner index range of a face.
    pub fn face_range(&self, face: usize) -> Range<usize> {
        self.face_offsets[face] as usize..self.face_offsets[face + 1] as usize
    }

    pub fn face_verts(&self, face: usize) -> &[u32] {
        &self.corner_verts[self.face_range(face)]
    }

    pub fn corner_vert(&self, corner: usize) -> u32 {
        self.corner_verts[corner]
    }

    /// The previous corner in a face's corner loop, wrapping at the start.
    pub fn face_corner_prev(&self, face: usize, corner: usize) -> usize {
        let range = self.face_range(face);
        if corner == range.start { range.end - 1 } else { corner - 1 }
    }

    /// The next corner in a face's corner loop, wrapping at the end.
    pub fn face_corner_next(&self, face: usize, corner: usize) -> usize {
        let range = self.face_range(face);
        if corner + 1 == range.end { range.start } else { corner + 1 }
    }

    /// The authored hidden state, `None` while everything is visible.
    pub fn hide_vert(&self) -> Option<&[bool]> {
        self.attributes.bool_span(ATTR_HIDE_VERT, AttrDomain::Point)
    }

    /// Lazily create the hidden state (all visible) on first write.
    pub fn hide_vert_ensure(&mut self) -> &mut Vec<bool> {
        let len = self.positions.len();
        self.attributes.ensure_bool(ATTR_HIDE_VERT, AttrDomain::Point, len)
    }

    /// Drop back to the "everything visible" sentinel.
    pub fn hide_vert_remove(&mut self) {
        self.attributes.remove(ATTR_HIDE_VERT, AttrDomain::Point);
    }

    pub fn vert_hidden(&self, vert: usize) -> bool {
        self.hide_vert().is_some_and(|hide| hide[vert])
    }

    pub fn hide_face(&self) -> Option<&[bool]> {
        self.attributes.bool_span(ATTR_HIDE_FACE, AttrDomain::Face)
    }

    pub fn hide_face_ensure(&mut self) -> &mut Vec<bool> {
        let len = self.face_count();
        self.attributes.ensure_bool(ATTR_HIDE_FACE, AttrDomain::Face, len)
    }

    pub fn face_hidden(&self, face: usize) -> bool {
        self.hide_face().is_some_and(|hide| hide[face])
    }

    pub fn hide_edge(&self) -> Option<&[bool]> {
        self.attributes.bool_span(ATTR_HIDE_EDGE, AttrDomain::Edge)
    }

    pub fn hide_edge_ensure(&mut self) -> &mut Vec<bool> {
        let len = self.edges.len();
        self.attributes.ensure_bool(ATTR_HIDE_EDGE, AttrDomain::Edge, len)
    }

    pub fn edge_hidden(&self, edge: usize) -> bool {
        self.hide_edge().is_some_and(|hide| hide[edge])
    }

    pub fn mask(&self) -> Option<&[f32]> {
        self.attributes.float_span(ATTR_MASK, AttrDomain::Point)
    }

    pub fn mask_ensure(&mut self) -> &mut Vec<f32> {
        let len = self.positions.len();
        self.attributes.ensure_float(ATTR_MASK, AttrDomain::Point, len)
    }

    /// Derive per-face hidden flags from vertex hidden flags.
    pub fn calc_face_hide_from_vert(&self, hide_vert: &[bool], hide_face: &mut [bool]) {
        for face in 0..self.face_count() {
            hide_face[face] = self
                .face_verts(face)
                .iter()
                .any(|&vert| hide_vert[vert as usize]);
        }
    }

    /// Derive per-edge hidden flags from vertex hidden flags.
    pub fn calc_edge_hide_from_vert(&self, hide_vert: &[bool], hide_edge: &mut [bool]) {
        for (edge, verts) in self.edges.iter().enumerate() {
            hide_edge[edge] = hide_vert[verts[0] as usize] || hide_vert[verts[1] as usize];
        }
    }

    /// Derive per-vertex hidden flags from face hidden flags: a vertex is
    /// hidden once every face using it is hidden.
    pub fn calc_vert_hide_from_face(&self, hide_face: &[bool], hide_vert: &mut [bool]) {
        let mut has_face = vec![false; self.vert_count()];
        let mut any_visible = vec![false; self.vert_count()];
        for face in 0..self.face_count() {
            for &vert in self.face_verts(face) {
                has_face[vert as usize] = true;
                any_visible[vert as usize] |= !hide_face[face];
            }
        }
        for vert in 0..self.vert_count() {
            hide_vert[vert] = has_face[vert] && !any_visible[vert];
        }
    }
}

fn newell_normal(positions: &[Vec3], face: &[u32]) -> Vec3 {
    let mut normal = Vec3::ZERO;
    for (i, &vert) in face.iter().enumerate() {
        let current = positions[vert as usize];
        let next = positions[face[(i + 1) % face.len()] as usize];
        normal += Vec3::new(
            (current.y - next.y) * (current.z + next.z),
            (current.z - next.z) * (current.x + next.x),
            (current.x - next.x) * (current.y + next.y),
        );
    }
    normal
}
