//! Grow/shrink visibility filter: expands or contracts the hidden region by
//! one topological ring per iteration.
//!
//! Each representation propagates differently. Polygon meshes walk the
//! corners of currently hidden faces and affect only the previous and next
//! corner vertices, an intentional approximation that skips full vertex
//! adjacency. Grids use the true sample neighborhood including cross-grid
//! duplicates. Dynamic topology uses the vertex adjacency map against a
//! snapshot of the previous iteration's state.

use mesh::bits::BitGroupVec;
use mesh::dyntopo::DynTopoMesh;
use mesh::grids::{GridCoord, SubdivGrids};
use mesh::polygon::PolyMesh;
use tracing::debug;

use crate::flush::{flush_edge_changes, sync_from_grids};
use crate::tree::Tree;
use crate::types::{UndoKind, VisAction};
use crate::undo::UndoLog;
use crate::update::dyntopo_update_nodes;

/// Ping-pong pair of vertex flag buffers. Iteration `i` reads one buffer and
/// writes the other, swapping by parity.
struct DualBuffer {
    front: Vec<bool>,
    back: Vec<bool>,
}

impl DualBuffer {
    fn new(init: &[bool]) -> Self {
        Self {
            front: init.to_vec(),
            back: init.to_vec(),
        }
    }

    fn split(&mut self, iteration: u32) -> (&[bool], &mut [bool]) {
        if iteration % 2 == 0 {
            (&self.front, &mut self.back)
        } else {
            (&self.back, &mut self.front)
        }
    }

    /// The buffer written by the final iteration.
    fn into_last(self, iterations: u32) -> Vec<bool> {
        if (iterations.max(1) - 1) % 2 == 0 {
            self.back
        } else {
            self.front
        }
    }
}

/// Same ping-pong arrangement over grid hidden bits.
struct DualBitBuffer {
    front: BitGroupVec,
    back: BitGroupVec,
}

impl DualBitBuffer {
    fn new(init: &BitGroupVec) -> Self {
        Self {
            front: init.clone(),
            back: init.clone(),
        }
    }

    fn split(&mut self, iteration: u32) -> (&BitGroupVec, &mut BitGroupVec) {
        if iteration % 2 == 0 {
            (&self.front, &mut self.back)
        } else {
            (&self.back, &mut self.front)
        }
    }

    fn into_last(self, iterations: u32) -> BitGroupVec {
        if (iterations.max(1) - 1) % 2 == 0 {
            self.back
        } else {
            self.front
        }
    }
}

/// Spread the target state from matching corner vertices of one hidden face
/// to their previous and next corners.
fn affect_visibility_face(
    mesh: &PolyMesh,
    face: usize,
    value: bool,
    read_buffer: &[bool],
    write_buffer: &mut [bool],
) {
    for corner in mesh.face_range(face) {
        let vert = mesh.corner_vert(corner);
        if read_buffer[vert as usize] != value {
            continue;
        }
        let prev = mesh.face_corner_prev(face, corner);
        write_buffer[mesh.corner_vert(prev) as usize] = value;
        let next = mesh.face_corner_next(face, corner);
        write_buffer[mesh.corner_vert(next) as usize] = value;
    }
}

/// Grow or shrink polygon-mesh visibility by `iterations` rings.
///
/// A fully visible mesh is left untouched; there is no boundary to move.
pub fn grow_shrink_visibility_mesh(
    mesh: &mut PolyMesh,
    tree: &mut Tree,
    nodes: &[usize],
    undo: &mut UndoLog,
    action: VisAction,
    iterations: u32,
) {
    let Some(old_hide_vert) = mesh.hide_vert().map(<[bool]>::to_vec) else {
        debug!("visibility filter skipped, everything is visible");
        return;
    };
    let value = action.to_hide();

    let orig_hide_face = match mesh.hide_face() {
        Some(span) => span.to_vec(),
        None => vec![false; mesh.face_count()],
    };
    let mut hide_face = orig_hide_face.clone();
    let mut buffers = DualBuffer::new(&old_hide_vert);

    for i in 0..iterations {
        let (read_buffer, write_buffer) = buffers.split(i);
        for face in 0..mesh.face_count() {
            // Only faces on the hidden side carry the boundary.
            if !hide_face[face] {
                continue;
            }
            affect_visibility_face(mesh, face, value, read_buffer, write_buffer);
        }
        // Keep the face state current so the next iteration walks the moved
        // boundary.
        mesh.calc_face_hide_from_vert(write_buffer, &mut hide_face);
    }

    let new_hide_vert = buffers.into_last(iterations);

    for &node in nodes {
        let changed = tree
            .node_unique_verts(node)
            .iter()
            .any(|&vert| old_hide_vert[vert as usize] != new_hide_vert[vert as usize]);
        if changed {
            undo.push_node(node, UndoKind::HideVert);
        }
    }

    *mesh.hide_vert_ensure() = new_hide_vert.clone();
    *mesh.hide_face_ensure() = hide_face.clone();
    // Edge state is not consulted during propagation, so one flush at the
    // end suffices.
    flush_edge_changes(mesh, &new_hide_vert);

    for &node in nodes {
        let changed = tree
            .node_faces(node)
            .iter()
            .any(|&face| orig_hide_face[face as usize] != hide_face[face as usize]);
        if changed {
            tree.mark_update_visibility(node);
            tree.node_update_visibility_mesh(node, &new_hide_vert);
        }
    }
}

/// Grow or shrink grid visibility by `iterations` sample rings. Propagation
/// crosses grid boundaries through coincident duplicate samples, so a write
/// may land in a grid owned by another node.
pub fn grow_shrink_visibility_grids(
    coarse: &mut PolyMesh,
    grids: &mut SubdivGrids,
    tree: &mut Tree,
    nodes: &[usize],
    undo: &mut UndoLog,
    action: VisAction,
    iterations: u32,
) {
    let value = action.to_hide();
    let grid_size = grids.grid_size();
    let mut buffers = DualBitBuffer::new(grids.grid_hidden_ensure());
    let mut node_changed = vec![false; nodes.len()];

    for i in 0..iterations {
        let (read_buffer, write_buffer) = buffers.split(i);
        for (index, &node) in nodes.iter().enumerate() {
            for &grid in tree.node_grid_indices(node) {
                for y in 0..grid_size {
                    for x in 0..grid_size {
                        let sample = y * grid_size + x;
                        if read_buffer.get(grid as usize, sample) != value {
                            continue;
                        }
                        let coord = GridCoord {
                            grid,
                            x: x as u16,
                            y: y as u16,
                        };
                        for neighbor in grids.neighbor_coords(coord, true) {
                            write_buffer
                                .set(neighbor.grid as usize, grids.sample_index(neighbor), value);
                        }
                    }
                }
            }
            node_changed[index] = true;
        }
    }

    for (index, &node) in nodes.iter().enumerate() {
        if node_changed[index] {
            undo.push_node(node, UndoKind::HideVert);
        }
    }

    *grids.grid_hidden_ensure() = buffers.into_last(iterations);

    {
        let hidden = grids.grid_hidden_ensure();
        for (index, &node) in nodes.iter().enumerate() {
            if !node_changed[index] {
                continue;
            }
            tree.mark_update_visibility(node);
            tree.node_update_visibility_grids(node, hidden);
        }
    }

    grids.mark_hidden_modified();
    sync_from_grids(coarse, grids);
}

/// Grow or shrink dynamic topology visibility. Each iteration snapshots the
/// vertex state and affects vertices with at least one snapshot neighbor on
/// the propagating side.
pub fn grow_shrink_visibility_dyntopo(
    mesh: &mut DynTopoMesh,
    tree: &mut Tree,
    nodes: &[usize],
    undo: &mut UndoLog,
    action: VisAction,
    iterations: u32,
) {
    let value = action.to_hide();
    for _ in 0..iterations {
        let prev_visibility = mesh.duplicate_visibility();
        dyntopo_update_nodes(mesh, tree, nodes, undo, action, |vert, mesh| {
            mesh.vert_neighbors(vert)
                .iter()
                .any(|&neighbor| prev_visibility[neighbor as usize] == value)
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flush::mesh_hide_vert_flush;
    use glam::Vec3;

    fn quad_strip() -> PolyMesh {
        let positions = vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(2.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(2.0, 1.0, 0.0),
        ];
        PolyMesh::new(positions, &[vec![0, 1, 4, 3], vec![1, 2, 5, 4]])
    }

    #[test]
    fn test_all_visible_mesh_is_untouched() {
        let mut mesh = quad_strip();
        let mut tree = Tree::build_mesh(&mesh, 3).unwrap();
        let nodes = tree.search_gather();
        let mut undo = UndoLog::new();

        undo.push_begin("Visibility filter");
        grow_shrink_visibility_mesh(&mut mesh, &mut tree, &nodes, &mut undo, VisAction::Hide, 2);
        undo.push_end();

        assert!(mesh.hide_vert().is_none());
        assert_eq!(undo.step_count(), 0);
    }

    #[test]
    fn test_shrink_then_grow_mesh_round_trips() {
        let mut mesh = quad_strip();
        mesh.hide_vert_ensure()[0] = true;
        mesh_hide_vert_flush(&mut mesh);
        let mut tree = Tree::build_mesh(&mesh, mesh.vert_count()).unwrap();
        let nodes = tree.search_gather();
        let mut undo = UndoLog::new();

        undo.push_begin("Visibility filter");
        grow_shrink_visibility_mesh(&mut mesh, &mut tree, &nodes, &mut undo, VisAction::Hide, 1);
        undo.push_end();

        // Corner neighbors of vertex 0 within the hidden face [0, 1, 4, 3].
        assert_eq!(
            mesh.hide_vert().unwrap(),
            &[true, true, false, true, false, false]
        );
        // Face 1 gained a hidden corner vertex.
        assert!(mesh.face_hidden(1));
        assert!(tree.needs_visibility_update(0));

        undo.push_begin("Visibility filter");
        grow_shrink_visibility_mesh(&mut mesh, &mut tree, &nodes, &mut undo, VisAction::Show, 1);
        undo.push_end();

        assert_eq!(
            mesh.hide_vert().unwrap(),
            &[true, false, false, false, false, false]
        );
        assert!(!mesh.face_hidden(1));
    }

    #[test]
    fn test_shrink_keeps_edge_state_consistent() {
        let mut mesh = quad_strip();
        mesh.hide_vert_ensure()[0] = true;
        mesh_hide_vert_flush(&mut mesh);
        let mut tree = Tree::build_mesh(&mesh, mesh.vert_count()).unwrap();
        let nodes = tree.search_gather();
        let mut undo = UndoLog::new();

        undo.push_begin("Visibility filter");
        grow_shrink_visibility_mesh(&mut mesh, &mut tree, &nodes, &mut undo, VisAction::Hide, 1);
        undo.push_end();

        let hide_vert = mesh.hide_vert().unwrap().to_vec();
        for (edge, verts) in mesh.edges().to_vec().into_iter().enumerate() {
            let expected = hide_vert[verts[0] as usize] || hide_vert[verts[1] as usize];
            assert_eq!(mesh.edge_hidden(edge), expected);
        }
    }

    #[test]
    fn test_grid_hide_grows_into_sample_neighborhood() {
        let mut coarse = quad_strip();
        let mut grids = SubdivGrids::from_coarse(&coarse, 3).unwrap();
        let mut tree = Tree::build_grids(&grids, 1).unwrap();
        let nodes = tree.search_gather();
        let mut undo = UndoLog::new();

        // Hide only the center sample of grid 0, index 4 in a 3x3 grid.
        grids.grid_hidden_ensure().set(0, 4, true);

        undo.push_begin("Visibility filter");
        grow_shrink_visibility_grids(
            &mut coarse,
            &mut grids,
            &mut tree,
            &nodes,
            &mut undo,
            VisAction::Hide,
            1,
        );
        undo.push_end();

        let hidden = grids.grid_hidden().unwrap();
        let expect = [(1usize, 1usize), (0, 1), (2, 1), (1, 0), (1, 2)];
        for y in 0..3usize {
            for x in 0..3usize {
                let expected = expect.contains(&(x, y));
                assert_eq!(hidden.get(0, y * 3 + x), expected, "sample ({x}, {y})");
            }
        }
        assert!(!hidden.any_set_in_group(1));
        assert!(grids.hidden_modified());
        // Every gathered node is recorded, matching the coarse change mask.
        assert_eq!(undo.last_step().map(|s| s.node_count()), Some(nodes.len()));
    }

    #[test]
    fn test_grid_propagation_crosses_grid_boundaries() {
        let mut coarse = quad_strip();
        let mut grids = SubdivGrids::from_coarse(&coarse, 3).unwrap();
        let mut tree = Tree::build_grids(&grids, 1).unwrap();
        let nodes = tree.search_gather();
        let mut undo = UndoLog::new();

        // Hide a sample on the edge grid 0 shares with grid 1; one
        // propagation step must reach its duplicate in grid 1.
        let boundary = grids
            .neighbor_coords(GridCoord { grid: 0, x: 1, y: 1 }, true)
            .into_iter()
            .find(|coord| {
                grids
                    .neighbor_coords(*coord, true)
                    .iter()
                    .any(|n| n.grid == 1)
            })
            .expect("grid 0 has a sample adjacent to grid 1");
        let boundary_index = grids.sample_index(boundary);
        grids.grid_hidden_ensure().set(0, boundary_index, true);

        undo.push_begin("Visibility filter");
        grow_shrink_visibility_grids(
            &mut coarse,
            &mut grids,
            &mut tree,
            &nodes,
            &mut undo,
            VisAction::Hide,
            1,
        );
        undo.push_end();

        assert!(grids.grid_hidden().unwrap().any_set_in_group(1));
    }

    #[test]
    fn test_dyntopo_hide_spreads_over_neighbors() {
        let positions = vec![Vec3::ZERO, Vec3::X, Vec3::Y, Vec3::new(1.0, 1.0, 0.0)];
        let mut dyn_mesh = DynTopoMesh::from_triangles(positions, &[[0, 1, 2], [1, 3, 2]]);
        let mut tree = Tree::build_dyntopo(&dyn_mesh, dyn_mesh.vert_count()).unwrap();
        let nodes = tree.search_gather();
        let mut undo = UndoLog::new();

        dyn_mesh.set_vert_hidden(0, true);
        dyn_mesh.update_face_hidden(&[0, 1]);

        undo.push_begin("Visibility filter");
        grow_shrink_visibility_dyntopo(
            &mut dyn_mesh,
            &mut tree,
            &nodes,
            &mut undo,
            VisAction::Hide,
            1,
        );
        undo.push_end();

        // Vertices 1 and 2 neighbor vertex 0; vertex 3 does not.
        assert!(dyn_mesh.vert(1).hidden);
        assert!(dyn_mesh.vert(2).hidden);
        assert!(!dyn_mesh.vert(3).hidden);
    }
}
