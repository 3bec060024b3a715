//! Whole-object visibility operations: show all, hide all, hide/show by
//! mask, and inversion, for each mesh representation.

use mesh::dyntopo::DynTopoMesh;
use mesh::grids::SubdivGrids;
use mesh::polygon::PolyMesh;
use tracing::debug;

use crate::flush::{mesh_hide_face_flush, mesh_hide_vert_flush, sync_from_grids};
use crate::tree::Tree;
use crate::types::{UndoKind, VisAction};
use crate::undo::UndoLog;
use crate::update::{dyntopo_update_nodes, grid_hide_update, vert_hide_update};

/// Reveal every element of a polygon mesh. The vertex hidden attribute is
/// removed outright (restoring the all-visible sentinel) rather than filled
/// with `false`. Returns whether anything was hidden before.
pub fn mesh_show_all(
    mesh: &mut PolyMesh,
    tree: &mut Tree,
    nodes: &[usize],
    undo: &mut UndoLog,
) -> bool {
    let mut any_changed = false;
    if let Some(hide_vert) = mesh.hide_vert() {
        let hide_vert = hide_vert.to_vec();
        for &node in nodes {
            let had_hidden = tree
                .node_unique_verts(node)
                .iter()
                .any(|&vert| hide_vert[vert as usize]);
            if had_hidden {
                any_changed = true;
                undo.push_node(node, UndoKind::HideVert);
                tree.mark_rebuild_draw(node);
            }
        }
    }
    for &node in nodes {
        tree.set_fully_hidden(node, false);
    }
    mesh.hide_vert_remove();
    mesh_hide_vert_flush(mesh);
    if any_changed {
        debug!("revealed all mesh vertices");
    }
    any_changed
}

/// Reveal every grid sample. Frees the grid hidden bits entirely, resyncs
/// the coarse mesh and signals the multires layer. Returns whether anything
/// was hidden before.
pub fn grids_show_all(
    coarse: &mut PolyMesh,
    grids: &mut SubdivGrids,
    tree: &mut Tree,
    nodes: &[usize],
    undo: &mut UndoLog,
) -> bool {
    let mut any_changed = false;
    if let Some(hidden) = grids.grid_hidden() {
        for &node in nodes {
            let had_hidden = tree
                .node_grid_indices(node)
                .iter()
                .any(|&grid| hidden.any_set_in_group(grid as usize));
            if had_hidden {
                any_changed = true;
                undo.push_node(node, UndoKind::HideVert);
                tree.mark_rebuild_draw(node);
            }
        }
    }
    if !any_changed {
        return false;
    }
    for &node in nodes {
        tree.set_fully_hidden(node, false);
    }
    grids.grid_hidden_free();
    sync_from_grids(coarse, grids);
    grids.mark_hidden_modified();
    debug!("revealed all grid samples");
    true
}

/// Hide or show the whole polygon mesh.
pub fn all_update_mesh(
    mesh: &mut PolyMesh,
    tree: &mut Tree,
    nodes: &[usize],
    undo: &mut UndoLog,
    action: VisAction,
) -> bool {
    // Nothing hidden and nothing to show.
    if action == VisAction::Show && mesh.hide_vert().is_none() {
        return false;
    }
    match action {
        VisAction::Hide => {
            vert_hide_update(mesh, tree, nodes, undo, |_, hide| hide.fill(true))
        }
        VisAction::Show => mesh_show_all(mesh, tree, nodes, undo),
    }
}

/// Hide or show all grid samples.
pub fn all_update_grids(
    coarse: &mut PolyMesh,
    grids: &mut SubdivGrids,
    tree: &mut Tree,
    nodes: &[usize],
    undo: &mut UndoLog,
    action: VisAction,
) -> bool {
    match action {
        VisAction::Hide => grid_hide_update(coarse, grids, tree, nodes, undo, |_, bits| {
            bits.fill(true)
        }),
        VisAction::Show => grids_show_all(coarse, grids, tree, nodes, undo),
    }
}

/// Hide or show the whole dynamic topology mesh.
pub fn all_update_dyntopo(
    mesh: &mut DynTopoMesh,
    tree: &mut Tree,
    nodes: &[usize],
    undo: &mut UndoLog,
    action: VisAction,
) -> bool {
    dyntopo_update_nodes(mesh, tree, nodes, undo, action, |_, _| true)
}

/// Apply the action to polygon-mesh vertices whose mask exceeds 0.5.
///
/// With no mask attribute a hide is a no-op and a show falls back to
/// revealing everything.
pub fn masked_update_mesh(
    mesh: &mut PolyMesh,
    tree: &mut Tree,
    nodes: &[usize],
    undo: &mut UndoLog,
    action: VisAction,
) -> bool {
    if action == VisAction::Show && mesh.hide_vert().is_none() {
        return false;
    }
    let value = action.to_hide();
    let Some(mask) = mesh.mask().map(<[f32]>::to_vec) else {
        if action == VisAction::Show {
            return mesh_show_all(mesh, tree, nodes, undo);
        }
        return false;
    };
    vert_hide_update(mesh, tree, nodes, undo, |verts, hide| {
        for (i, &vert) in verts.iter().enumerate() {
            if mask[vert as usize] > 0.5 {
                hide[i] = value;
            }
        }
    })
}

/// Apply the action to grid samples whose mask exceeds 0.5. With no mask
/// layer the whole grid counts as matched.
pub fn masked_update_grids(
    coarse: &mut PolyMesh,
    grids: &mut SubdivGrids,
    tree: &mut Tree,
    nodes: &[usize],
    undo: &mut UndoLog,
    action: VisAction,
) -> bool {
    let value = action.to_hide();
    let Some(masks) = grids.masks().map(<[f32]>::to_vec) else {
        return grid_hide_update(coarse, grids, tree, nodes, undo, |_, bits| bits.fill(value));
    };

    let grid_area = grids.grid_area();
    grid_hide_update(coarse, grids, tree, nodes, undo, |grid, bits| {
        let base = grid as usize * grid_area;
        for sample in 0..grid_area {
            if masks[base + sample] > 0.5 {
                bits.set(sample, value);
            }
        }
    })
}

/// Apply the action to dynamic topology vertices whose mask exceeds 0.5.
pub fn masked_update_dyntopo(
    mesh: &mut DynTopoMesh,
    tree: &mut Tree,
    nodes: &[usize],
    undo: &mut UndoLog,
    action: VisAction,
) -> bool {
    dyntopo_update_nodes(mesh, tree, nodes, undo, action, |vert, mesh| {
        mesh.vert(vert).mask > 0.5
    })
}

/// Invert polygon-mesh visibility at face granularity: toggle every face
/// hidden flag, then re-derive vertex and edge state from the faces.
pub fn invert_visibility_mesh(
    mesh: &mut PolyMesh,
    tree: &mut Tree,
    nodes: &[usize],
    undo: &mut UndoLog,
) {
    {
        let mut hide_face = match mesh.hide_face() {
            Some(span) => span.to_vec(),
            None => vec![false; mesh.face_count()],
        };
        for &node in nodes {
            undo.push_node(node, UndoKind::HideFace);
            for &face in tree.node_faces(node) {
                hide_face[face as usize] = !hide_face[face as usize];
            }
            tree.mark_update_visibility(node);
        }
        *mesh.hide_face_ensure() = hide_face;
    }
    mesh_hide_face_flush(mesh);
    let hide_vert = mesh.hide_vert().map(<[bool]>::to_vec);
    for &node in nodes {
        match &hide_vert {
            Some(hide_vert) => tree.node_update_visibility_mesh(node, hide_vert),
            None => tree.set_fully_hidden(node, false),
        }
    }
}

/// Invert every grid sample's hidden bit.
pub fn invert_visibility_grids(
    coarse: &mut PolyMesh,
    grids: &mut SubdivGrids,
    tree: &mut Tree,
    nodes: &[usize],
    undo: &mut UndoLog,
) {
    {
        let hidden = grids.grid_hidden_ensure();
        for &node in nodes {
            undo.push_node(node, UndoKind::HideVert);
            for &grid in tree.node_grid_indices(node) {
                hidden.invert_group(grid as usize);
            }
            tree.mark_update_visibility(node);
            tree.node_update_visibility_grids(node, hidden);
        }
    }
    grids.mark_hidden_modified();
    sync_from_grids(coarse, grids);
}

/// Toggle every dynamic topology vertex, tracking the per-node fully-hidden
/// state during the toggle pass, then re-derive face and edge flags.
pub fn invert_visibility_dyntopo(
    mesh: &mut DynTopoMesh,
    tree: &mut Tree,
    nodes: &[usize],
    undo: &mut UndoLog,
) {
    for &node in nodes {
        undo.push_node(node, UndoKind::HideVert);
        let mut fully_hidden = true;
        for &vert in tree.node_unique_verts(node) {
            let hidden = !mesh.vert(vert).hidden;
            mesh.set_vert_hidden(vert, hidden);
            fully_hidden &= hidden;
        }
        tree.set_fully_hidden(node, fully_hidden);
        tree.mark_rebuild_draw(node);
    }
    for &node in nodes {
        mesh.update_face_hidden(tree.node_faces(node));
    }
    mesh.update_edge_hidden();
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use mesh::polygon::ATTR_MASK;

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

    fn hide_all(mesh: &mut PolyMesh, tree: &mut Tree, undo: &mut UndoLog) {
        let nodes = tree.search_gather();
        undo.push_begin("Hide area");
        assert!(all_update_mesh(mesh, tree, &nodes, undo, VisAction::Hide));
        undo.push_end();
    }

    #[test]
    fn test_hide_all_then_show_all_restores_sentinel() {
        let mut mesh = quad_strip();
        let mut tree = Tree::build_mesh(&mesh, 3).unwrap();
        let mut undo = UndoLog::new();

        hide_all(&mut mesh, &mut tree, &mut undo);
        assert!(mesh.hide_vert().unwrap().iter().all(|&hidden| hidden));
        assert!((0..mesh.face_count()).all(|face| mesh.face_hidden(face)));

        let nodes = tree.search_gather();
        undo.push_begin("Show area");
        assert!(all_update_mesh(&mut mesh, &mut tree, &nodes, &mut undo, VisAction::Show));
        undo.push_end();

        assert!(mesh.hide_vert().is_none());
        assert!(mesh.hide_face().is_none());
        assert!(nodes.iter().all(|&node| !tree.fully_hidden(node)));
        assert_eq!(undo.step_count(), 2);
    }

    #[test]
    fn test_show_all_visible_is_a_noop() {
        let mut mesh = quad_strip();
        let mut tree = Tree::build_mesh(&mesh, 3).unwrap();
        let nodes = tree.search_gather();
        let mut undo = UndoLog::new();

        undo.push_begin("Show area");
        assert!(!all_update_mesh(&mut mesh, &mut tree, &nodes, &mut undo, VisAction::Show));
        undo.push_end();
        assert_eq!(undo.step_count(), 0);
    }

    #[test]
    fn test_masked_hide_respects_threshold() {
        let mut mesh = quad_strip();
        {
            let mask = mesh.mask_ensure();
            mask[0] = 1.0;
            mask[1] = 0.5;
            mask[2] = 0.6;
        }
        assert!(mesh.attributes.contains(ATTR_MASK, mesh::attributes::AttrDomain::Point));
        let mut tree = Tree::build_mesh(&mesh, mesh.vert_count()).unwrap();
        let nodes = tree.search_gather();
        let mut undo = UndoLog::new();

        undo.push_begin("Hide area");
        assert!(masked_update_mesh(&mut mesh, &mut tree, &nodes, &mut undo, VisAction::Hide));
        undo.push_end();

        // Only masks strictly above 0.5 are affected.
        assert_eq!(
            mesh.hide_vert().unwrap(),
            &[true, false, true, false, false, false]
        );
    }

    #[test]
    fn test_masked_hide_without_mask_is_a_noop() {
        let mut mesh = quad_strip();
        let mut tree = Tree::build_mesh(&mesh, 3).unwrap();
        let nodes = tree.search_gather();
        let mut undo = UndoLog::new();

        undo.push_begin("Hide area");
        assert!(!masked_update_mesh(&mut mesh, &mut tree, &nodes, &mut undo, VisAction::Hide));
        undo.push_end();
        assert!(mesh.hide_vert().is_none());
        assert_eq!(undo.step_count(), 0);
    }

    #[test]
    fn test_invert_mesh_twice_is_identity() {
        let mut mesh = quad_strip();
        let mut tree = Tree::build_mesh(&mesh, mesh.vert_count()).unwrap();
        let nodes = tree.search_gather();
        let mut undo = UndoLog::new();

        mesh.hide_vert_ensure()[0] = true;
        mesh_hide_vert_flush(&mut mesh);
        let before = mesh.hide_face().unwrap().to_vec();

        undo.push_begin("Invert visibility");
        invert_visibility_mesh(&mut mesh, &mut tree, &nodes, &mut undo);
        undo.push_end();
        let inverted = mesh.hide_face().unwrap().to_vec();
        assert!(before.iter().zip(&inverted).all(|(a, b)| a != b));
        // Vertex state follows the faces: vert 0 sits only on the now-visible
        // face 0, so it is visible again.
        assert!(!mesh.vert_hidden(0));

        undo.push_begin("Invert visibility");
        invert_visibility_mesh(&mut mesh, &mut tree, &nodes, &mut undo);
        undo.push_end();
        assert_eq!(mesh.hide_face().unwrap(), before.as_slice());
    }

    #[test]
    fn test_grids_hide_all_then_show_all() {
        let mut coarse = quad_strip();
        let mut grids = SubdivGrids::from_coarse(&coarse, 3).unwrap();
        let mut tree = Tree::build_grids(&grids, 1).unwrap();
        let nodes = tree.search_gather();
        let mut undo = UndoLog::new();

        undo.push_begin("Hide area");
        assert!(all_update_grids(
            &mut coarse,
            &mut grids,
            &mut tree,
            &nodes,
            &mut undo,
            VisAction::Hide,
        ));
        undo.push_end();
        assert!(nodes.iter().all(|&node| tree.fully_hidden(node)));
        assert!(coarse.hide_vert().unwrap().iter().all(|&hidden| hidden));

        undo.push_begin("Show area");
        assert!(all_update_grids(
            &mut coarse,
            &mut grids,
            &mut tree,
            &nodes,
            &mut undo,
            VisAction::Show,
        ));
        undo.push_end();
        assert!(grids.grid_hidden().is_none());
        assert!(coarse.hide_vert().is_none());
        assert!(nodes.iter().all(|&node| !tree.fully_hidden(node)));
    }

    #[test]
    fn test_invert_grids() {
        let mut coarse = quad_strip();
        let mut grids = SubdivGrids::from_coarse(&coarse, 3).unwrap();
        let mut tree = Tree::build_grids(&grids, 1).unwrap();
        let nodes = tree.search_gather();
        let mut undo = UndoLog::new();

        grids.grid_hidden_ensure().fill_group(0, true);
        undo.push_begin("Invert visibility");
        invert_visibility_grids(&mut coarse, &mut grids, &mut tree, &nodes, &mut undo);
        undo.push_end();

        let hidden = grids.grid_hidden().unwrap();
        assert!(!hidden.any_set_in_group(0));
        assert!(hidden.all_set_in_group(1));
        assert!(!tree.fully_hidden(0));
        assert!(tree.fully_hidden(1));
    }

    #[test]
    fn test_invert_dyntopo_tracks_fully_hidden() {
        let positions = vec![Vec3::ZERO, Vec3::X, Vec3::Y, Vec3::new(1.0, 1.0, 0.0)];
        let mut dyn_mesh = DynTopoMesh::from_triangles(positions, &[[0, 1, 2], [1, 3, 2]]);
        let mut tree = Tree::build_dyntopo(&dyn_mesh, dyn_mesh.vert_count()).unwrap();
        let nodes = tree.search_gather();
        let mut undo = UndoLog::new();

        undo.push_begin("Invert visibility");
        invert_visibility_dyntopo(&mut dyn_mesh, &mut tree, &nodes, &mut undo);
        undo.push_end();
        assert!(tree.fully_hidden(0));
        assert!((0..2).all(|face| dyn_mesh.face(face).hidden));

        undo.push_begin("Invert visibility");
        invert_visibility_dyntopo(&mut dyn_mesh, &mut tree, &nodes, &mut undo);
        undo.push_end();
        assert!(!tree.fully_hidden(0));
        assert!((0..2).all(|face| !dyn_mesh.face(face).hidden));
    }
}
