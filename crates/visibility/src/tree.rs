//! Spatial partition tree over mesh elements.
//!
//! The visibility engine consumes the tree as an opaque node set: each node
//! owns a disjoint subset of vertices (and the faces/grids hanging off them)
//! and carries three cached flags the engine is the sole mutator of:
//!
//! - `fully_hidden` - every owned element is hidden; renderers and region
//!   queries skip such nodes entirely
//! - `update_visibility` - derived visibility attributes in this region
//!   changed and node-level caches need refreshing
//! - `rebuild_draw` - the node's draw buffers must be rebuilt
//!
//! Node sets are transient: operators re-gather them per invocation and never
//! cache them across invocations.

use mesh::bits::BitGroupVec;
use mesh::dyntopo::DynTopoMesh;
use mesh::grids::SubdivGrids;
use mesh::polygon::PolyMesh;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TreeError {
    #[error("cannot build a tree over an empty mesh")]
    EmptyMesh,
}

#[derive(Debug, Clone, Default)]
struct Node {
    verts: Vec<u32>,
    faces: Vec<u32>,
    grids: Vec<u32>,
    fully_hidden: bool,
    update_visibility: bool,
    rebuild_draw: bool,
}

/// A partition of one mesh representation into leaf regions.
#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    /// Partition a polygon mesh into nodes of at most `leaf_verts` vertices,
    /// grouped along the longest axis of the bounds. Each face belongs to the
    /// node owning its first corner vertex.
    pub fn build_mesh(mesh: &PolyMesh, leaf_verts: usize) -> Result<Self, TreeError> {
        if mesh.vert_count() == 0 {
            return Err(TreeError::EmptyMesh);
        }
        let order = sort_by_longest_axis(mesh.positions());
        let mut nodes = chunk_verts(&order, leaf_verts.max(1));

        let vert_to_node = vert_node_map(&nodes, mesh.vert_count());
        for face in 0..mesh.face_count() {
            let first = mesh.face_verts(face)[0];
            nodes[vert_to_node[first as usize]].faces.push(face as u32);
        }
        Ok(Self { nodes })
    }

    /// Partition subdivision grids into nodes of at most `leaf_grids` grids.
    pub fn build_grids(grids: &SubdivGrids, leaf_grids: usize) -> Result<Self, TreeError> {
        if grids.grid_count() == 0 {
            return Err(TreeError::EmptyMesh);
        }
        let nodes = (0..grids.grid_count() as u32)
            .collect::<Vec<_>>()
            .chunks(leaf_grids.max(1))
            .map(|chunk| Node {
                grids: chunk.to_vec(),
                ..Node::default()
            })
            .collect();
        Ok(Self { nodes })
    }

    /// Partition a dynamic topology mesh the same way as a polygon mesh.
    pub fn build_dyntopo(mesh: &DynTopoMesh, leaf_verts: usize) -> Result<Self, TreeError> {
        if mesh.vert_count() == 0 {
            return Err(TreeError::EmptyMesh);
        }
        let positions: Vec<_> = (0..mesh.vert_count() as u32)
            .map(|vert| mesh.vert(vert).position)
            .collect();
        let order = sort_by_longest_axis(&positions);
        let mut nodes = chunk_verts(&order, leaf_verts.max(1));

        let vert_to_node = vert_node_map(&nodes, mesh.vert_count());
        for face in 0..mesh.face_count() as u32 {
            let first = mesh.face(face).verts[0];
            nodes[vert_to_node[first as usize]].faces.push(face);
        }
        Ok(Self { nodes })
    }

    /// Gather every node; operators run this once per invocation.
    pub fn search_gather(&self) -> Vec<usize> {
        (0..self.nodes.len()).collect()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Vertices owned by exactly this node.
    pub fn node_unique_verts(&self, node: usize) -> &[u32] {
        &self.nodes[node].verts
    }

    pub fn node_faces(&self, node: usize) -> &[u32] {
        &self.nodes[node].faces
    }

    pub fn node_grid_indices(&self, node: usize) -> &[u32] {
        &self.nodes[node].grids
    }

    pub fn mark_update_visibility(&mut self, node: usize) {
        self.nodes[node].update_visibility = true;
    }

    pub fn mark_rebuild_draw(&mut self, node: usize) {
        self.nodes[node].rebuild_draw = true;
    }

    pub fn needs_visibility_update(&self, node: usize) -> bool {
        self.nodes[node].update_visibility
    }

    pub fn needs_rebuild_draw(&self, node: usize) -> bool {
        self.nodes[node].rebuild_draw
    }

    pub fn set_fully_hidden(&mut self, node: usize, fully_hidden: bool) {
        self.nodes[node].fully_hidden = fully_hidden;
    }

    pub fn fully_hidden(&self, node: usize) -> bool {
        self.nodes[node].fully_hidden
    }

    pub fn clear_dirty(&mut self, node: usize) {
        self.nodes[node].update_visibility = false;
        self.nodes[node].rebuild_draw = false;
    }

    /// Recompute the fully-hidden cache from the node's own vertex set.
    pub fn node_update_visibility_mesh(&mut self, node: usize, hide_vert: &[bool]) {
        let fully_hidden = !self.nodes[node].verts.is_empty()
            && self.nodes[node]
                .verts
                .iter()
                .all(|&vert| hide_vert[vert as usize]);
        self.nodes[node].fully_hidden = fully_hidden;
    }

    /// Recompute the fully-hidden cache from the node's own grids.
    pub fn node_update_visibility_grids(&mut self, node: usize, grid_hidden: &BitGroupVec) {
        let fully_hidden = !self.nodes[node].grids.is_empty()
            && self.nodes[node]
                .grids
                .iter()
                .all(|&grid| grid_hidden.all_set_in_group(grid as usize));
        self.nodes[node].fully_hidden = fully_hidden;
    }

    /// The node's visible vertices: empty when fully hidden, all owned
    /// vertices when no hidden state exists, a filtered subset otherwise.
    pub fn node_visible_verts<'a>(
        &'a self,
        node: usize,
        hide_vert: Option<&[bool]>,
        indices: &'a mut Vec<u32>,
    ) -> &'a [u32] {
        if self.fully_hidden(node) {
            return &[];
        }
        let verts = self.node_unique_verts(node);
        let Some(hide_vert) = hide_vert else {
            return verts;
        };
        indices.clear();
        indices.extend(
            verts
                .iter()
                .copied()
                .filter(|&vert| !hide_vert[vert as usize]),
        );
        indices
    }
}

fn sort_by_longest_axis(positions: &[glam::Vec3]) -> Vec<u32> {
    let mut min = glam::Vec3::splat(f32::MAX);
    let mut max = glam::Vec3::splat(f32::MIN);
    for &position in positions {
        min = min.min(position);
        max = max.max(position);
    }
    let size = max - min;
    let axis = if size.x >= size.y && size.x >= size.z {
        0
    } else if size.y >= size.z {
        1
    } else {
        2
    };

    let mut order: Vec<u32> = (0..positions.len() as u32).collect();
    order.sort_by(|&a, &b| {
        let ka = positions[a as usize][axis];
        let kb = positions[b as usize][axis];
        ka.total_cmp(&kb).then(a.cmp(&b))
    });
    order
}

fn chunk_verts(order: &[u32], leaf_verts: usize) -> Vec<Node> {
    order
        .chunks(leaf_verts)
        .map(|chunk| Node {
            verts: chunk.to_vec(),
            ..Node::default()
        })
        .collect()
}

fn vert_node_map(nodes: &[Node], vert_count: usize) -> Vec<usize> {
    let mut map = vec![0; vert_count];
    for (index, node) in nodes.iter().enumerate() {
        for &vert in &node.verts {
            map[vert as usize] = index;
        }
    }
    map
}
