//! Flush engine: propagates vertex visibility edits to derived attributes
//! and tree caches.
//!
//! Every write path funnels through these functions so the derived state
//! (`hide_face`, `hide_edge`, per-node fully-hidden caches, coarse-vertex
//! state under grids) is never left inconsistent. All of them detect
//! no-change cases, so flushing twice without an intervening write performs
//! no additional dirty marks.

use mesh::attributes::AttrDomain;
use mesh::grids::SubdivGrids;
use mesh::polygon::{ATTR_HIDE_EDGE, ATTR_HIDE_FACE, PolyMesh};
use rayon::prelude::*;
use tracing::trace;

use crate::tree::Tree;

/// Node-scoped face flush: recompute each touched node's face hidden flags
/// from the updated vertex flags and dirty only nodes whose faces actually
/// changed. Comparing at face level avoids tagging a node for redraw when a
/// vertex edit never crosses a face boundary the node owns.
pub fn flush_face_changes_node(
    mesh: &mut PolyMesh,
    tree: &mut Tree,
    nodes: &[usize],
    hide_vert: &[bool],
) {
    let mut hide_face = match mesh.hide_face() {
        Some(span) => span.to_vec(),
        None => vec![false; mesh.face_count()],
    };

    let mesh_ref = &*mesh;
    let hide_face_ref = &hide_face;
    let tree_ref = &*tree;
    let results: Vec<Option<Vec<bool>>> = nodes
        .par_iter()
        .map(|&node| {
            let faces = tree_ref.node_faces(node);
            let new_hide: Vec<bool> = faces
                .iter()
                .map(|&face| {
                    mesh_ref
                        .face_verts(face as usize)
                        .iter()
                        .any(|&vert| hide_vert[vert as usize])
                })
                .collect();
            let changed = faces
                .iter()
                .zip(&new_hide)
                .any(|(&face, &hidden)| hide_face_ref[face as usize] != hidden);
            changed.then_some(new_hide)
        })
        .collect();

    let mut any_changed = false;
    for (&node, result) in nodes.iter().zip(results) {
        let Some(new_hide) = result else {
            continue;
        };
        any_changed = true;
        for (&face, hidden) in tree.node_faces(node).iter().zip(new_hide) {
            hide_face[face as usize] = hidden;
        }
        tree.mark_update_visibility(node);
        tree.node_update_visibility_mesh(node, hide_vert);
    }

    if any_changed {
        trace!(nodes = nodes.len(), "face flush changed node visibility");
        *mesh.hide_face_ensure() = hide_face;
    }
}

/// Global face flush: recompute every face's hidden flag from vertex flags.
/// Cheaper than the node-scoped variant when the whole mesh changed.
pub fn flush_face_changes(mesh: &mut PolyMesh, hide_vert: &[bool]) {
    let mut hide_face = vec![false; mesh.face_count()];
    mesh.calc_face_hide_from_vert(hide_vert, &mut hide_face);
    *mesh.hide_face_ensure() = hide_face;
}

/// Global edge flush: recompute every edge's hidden flag from vertex flags.
pub fn flush_edge_changes(mesh: &mut PolyMesh, hide_vert: &[bool]) {
    let mut hide_edge = vec![false; mesh.edge_count()];
    mesh.calc_edge_hide_from_vert(hide_vert, &mut hide_edge);
    *mesh.hide_edge_ensure() = hide_edge;
}

/// Re-derive face and edge hidden state from the current vertex state. When
/// no vertex state exists (the all-visible sentinel) the derived attributes
/// are removed as well.
pub fn mesh_hide_vert_flush(mesh: &mut PolyMesh) {
    match mesh.hide_vert() {
        Some(hide_vert) => {
            let hide_vert = hide_vert.to_vec();
            flush_face_changes(mesh, &hide_vert);
            flush_edge_changes(mesh, &hide_vert);
        }
        None => {
            mesh.attributes.remove(ATTR_HIDE_FACE, AttrDomain::Face);
            mesh.attributes.remove(ATTR_HIDE_EDGE, AttrDomain::Edge);
        }
    }
}

/// Re-derive vertex and edge hidden state from authored face state, the
/// reverse of the usual flow. Used after face-granular edits (inversion,
/// external `hide_face` changes).
pub fn mesh_hide_face_flush(mesh: &mut PolyMesh) {
    let hide_face = match mesh.hide_face() {
        Some(span) => span.to_vec(),
        None => return,
    };
    let mut hide_vert = vec![false; mesh.vert_count()];
    mesh.calc_vert_hide_from_face(&hide_face, &mut hide_vert);
    *mesh.hide_vert_ensure() = hide_vert.clone();
    flush_edge_changes(mesh, &hide_vert);
}

/// Resynchronize coarse-mesh vertex visibility from grid hidden bits: a
/// vertex is visible iff at least one incident grid sample is visible. When
/// nothing is hidden the coarse attributes drop back to the all-visible
/// sentinel.
pub fn sync_from_grids(coarse: &mut PolyMesh, grids: &SubdivGrids) {
    let mut hide_vert = vec![false; coarse.vert_count()];
    let mut any_hidden = false;
    if grids.grid_hidden().is_some() {
        for vert in 0..coarse.vert_count() {
            let hidden = grids.vert_hidden(vert);
            hide_vert[vert] = hidden;
            any_hidden |= hidden;
        }
    }

    if any_hidden {
        *coarse.hide_vert_ensure() = hide_vert.clone();
        flush_face_changes(coarse, &hide_vert);
        flush_edge_changes(coarse, &hide_vert);
    } else {
        coarse.hide_vert_remove();
        mesh_hide_vert_flush(coarse);
    }
}
