//! Dynamic topology triangle mesh.
//!
//! Unlike the polygon mesh, hidden state here is a native per-element flag
//! that is always present and defaults to visible. Face and edge hidden
//! status is derived from vertices: a face is hidden iff any of its corner
//! vertices is hidden, an edge iff either endpoint is hidden.

use std::collections::BTreeSet;

use glam::Vec3;

/// A vertex with its sculpt payload.
#[derive(Debug, Clone)]
pub struct DynVert {
    pub position: Vec3,
    pub normal: Vec3,
    pub mask: f32,
    pub hidden: bool,
}

#[derive(Debug, Clone)]
pub struct DynEdge {
    pub verts: [u32; 2],
    pub hidden: bool,
}

#[derive(Debug, Clone)]
pub struct DynFace {
    pub verts: [u32; 3],
    pub hidden: bool,
}

/// A directly editable triangle mesh with per-vertex adjacency.
#[derive(Debug, Clone)]
pub struct DynTopoMesh {
    verts: Vec<DynVert>,
    edges: Vec<DynEdge>,
    faces: Vec<DynFace>,
    neighbors: Vec<Vec<u32>>,
}

impl DynTopoMesh {
    pub fn from_triangles(positions: Vec<Vec3>, triangles: &[[u32; 3]]) -> Self {
        let mut edge_set = BTreeSet::new();
        for tri in triangles {
            for i in 0..3 {
                let (a, b) = (tri[i], tri[(i + 1) % 3]);
                let key = if a < b { (a, b) } else { (b, a) };
                edge_set.insert(key);
            }
        }

        let mut neighbors = vec![Vec::new(); positions.len()];
        for &(a, b) in &edge_set {
            neighbors[a as usize].push(b);
            neighbors[b as usize].push(a);
        }

        let verts = positions
            .into_iter()
            .map(|position| DynVert {
                position,
                normal: Vec3::Z,
                mask: 0.0,
                hidden: false,
            })
            .collect();
        let edges = edge_set
            .into_iter()
            .map(|(a, b)| DynEdge {
                verts: [a, b],
                hidden: false,
            })
            .collect();
        let faces = triangles
            .iter()
            .map(|&verts| DynFace {
                verts,
                hidden: false,
            })
            .collect();

        Self {
            verts,
            edges,
            faces,
            neighbors,
        }
    }

    pub fn vert_count(&self) -> usize {
        self.verts.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    pub fn vert(&self, vert: u32) -> &DynVert {
        &self.verts[vert as usize]
    }

    pub fn vert_mut(&mut self, vert: u32) -> &mut DynVert {
        &mut self.verts[vert as usize]
    }

    pub fn edge(&self, edge: u32) -> &DynEdge {
        &self.edges[edge as usize]
    }

    pub fn face(&self, face: u32) -> &DynFace {
        &self.faces[face as usize]
    }

    pub fn set_vert_hidden(&mut self, vert: u32, hidden: bool) {
        self.verts[vert as usize].hidden = hidden;
    }

    /// Immediate topological neighbors of a vertex.
    pub fn vert_neighbors(&self, vert: u32) -> &[u32] {
        &self.neighbors[vert as usize]
    }

    /// Whether a face should be hidden given its current vertex flags.
    pub fn face_hidden_from_verts(&self, face: u32) -> bool {
        self.faces[face as usize]
            .verts
            .iter()
            .any(|&vert| self.verts[vert as usize].hidden)
    }

    /// Re-derive the hidden flag of the given faces from their vertices.
    pub fn update_face_hidden(&mut self, faces: &[u32]) {
        for &face in faces {
            let hidden = self.face_hidden_from_verts(face);
            self.faces[face as usize].hidden = hidden;
        }
    }

    /// Re-derive every edge's hidden flag from its endpoint vertices.
    pub fn update_edge_hidden(&mut self) {
        for edge in 0..self.edges.len() {
            let [a, b] = self.edges[edge].verts;
            self.edges[edge].hidden =
                self.verts[a as usize].hidden || self.verts[b as usize].hidden;
        }
    }

    /// Snapshot every vertex's hidden flag, indexed by vertex.
    pub fn duplicate_visibility(&self) -> Vec<bool> {
        self.verts.iter().map(|vert| vert.hidden).collect()
    }

    pub fn set_face_hidden(&mut self, face: u32, hidden: bool) {
        self.faces[face as usize].hidden = hidden;
    }

    pub fn set_edge_hidden(&mut self, edge: u32, hidden: bool) {
        self.edges[edge as usize].hidden = hidden;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A fan of three triangles around vertex 0.
    fn tri_fan() -> DynTopoMesh {
        let positions = vec![
            Vec3::ZERO,
            Vec3::X,
            Vec3::Y,
            Vec3::new(-1.0, 0.0, 0.0),
            Vec3::new(0.0, -1.0, 0.0),
        ];
        DynTopoMesh::from_triangles(positions, &[[0, 1, 2], [0, 2, 3], [0, 3, 4]])
    }

    #[test]
    fn test_adjacency_from_edges() {
        let mesh = tri_fan();
        assert_eq!(mesh.vert_neighbors(0), &[1, 2, 3, 4]);
        assert_eq!(mesh.vert_neighbors(4), &[0, 3]);
    }

    #[test]
    fn test_face_hidden_derivation() {
        let mut mesh = tri_fan();
        mesh.set_vert_hidden(1, true);
        assert!(mesh.face_hidden_from_verts(0));
        assert!(!mesh.face_hidden_from_verts(1));
        mesh.update_face_hidden(&[0, 1, 2]);
        assert!(mesh.face(0).hidden);
        assert!(!mesh.face(1).hidden);
    }

    #[test]
    fn test_edge_hidden_derivation() {
        let mut mesh = tri_fan();
        mesh.set_vert_hidden(4, true);
        mesh.update_edge_hidden();
        for edge in 0..mesh.edge_count() as u32 {
            let hidden = mesh.edge(edge).verts.contains(&4);
            assert_eq!(mesh.edge(edge).hidden, hidden);
        }
    }

    #[test]
    fn test_duplicate_visibility_is_a_snapshot() {
        let mut mesh = tri_fan();
        mesh.set_vert_hidden(2, true);
        let snapshot = mesh.duplicate_visibility();
        mesh.set_vert_hidden(2, false);
        assert!(snapshot[2]);
        assert!(!mesh.vert(2).hidden);
    }
}
