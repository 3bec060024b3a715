//! Predicate-driven visibility updates.
//!
//! The shared mechanism under the bulk, masked, gesture and filter paths:
//! recompute each node's visibility values through a caller-supplied
//! predicate, compare against the previous values, and only on a real change
//! push undo state, write back, and mark the region dirty. A predicate that
//! matches but produces no flag change triggers neither.
//!
//! Per-node recomputation runs data-parallel over the disjoint node
//! partitions; the write-back, undo pushes and tree cache updates are applied
//! serially from the reduced per-node results.

use mesh::bits::BitGroup;
use mesh::dyntopo::DynTopoMesh;
use mesh::grids::SubdivGrids;
use mesh::polygon::PolyMesh;
use rayon::prelude::*;

use crate::flush::{flush_edge_changes, flush_face_changes_node, sync_from_grids};
use crate::tree::Tree;
use crate::types::{UndoKind, VisAction};
use crate::undo::UndoLog;

/// Update vertex hidden flags on a polygon mesh.
///
/// `calc_hide` receives a node's owned vertex ids and their current hidden
/// flags, and rewrites the flags in place. Returns whether anything changed.
pub fn vert_hide_update<F>(
    mesh: &mut PolyMesh,
    tree: &mut Tree,
    nodes: &[usize],
    undo: &mut UndoLog,
    calc_hide: F,
) -> bool
where
    F: Fn(&[u32], &mut [bool]) + Sync,
{
    let mut hide_vert = mesh.hide_vert_ensure().clone();

    let hide_vert_ref = &hide_vert;
    let tree_ref = &*tree;
    let results: Vec<Option<Vec<bool>>> = nodes
        .par_iter()
        .map(|&node| {
            let verts = tree_ref.node_unique_verts(node);
            let mut new_hide: Vec<bool> = verts
                .iter()
                .map(|&vert| hide_vert_ref[vert as usize])
                .collect();
            calc_hide(verts, &mut new_hide);
            let changed = verts
                .iter()
                .zip(&new_hide)
                .any(|(&vert, &hidden)| hide_vert_ref[vert as usize] != hidden);
            changed.then_some(new_hide)
        })
        .collect();

    let mut any_changed = false;
    for (&node, result) in nodes.iter().zip(results) {
        let Some(new_hide) = result else {
            continue;
        };
        any_changed = true;
        undo.push_node(node, UndoKind::HideVert);
        for (&vert, hidden) in tree.node_unique_verts(node).iter().zip(new_hide) {
            hide_vert[vert as usize] = hidden;
        }
    }

    if any_changed {
        *mesh.hide_vert_ensure() = hide_vert.clone();
        // Flushing at node scope also tags node visibility changes when the
        // hidden vertices sit on a node boundary.
        flush_face_changes_node(mesh, tree, nodes, &hide_vert);
        flush_edge_changes(mesh, &hide_vert);
    }
    any_changed
}

/// Update grid hidden bits.
///
/// `calc_hide` receives a grid index and that grid's current bits, and
/// rewrites them in place. On change the touched nodes are dirtied, coarse
/// vertex visibility is re-synced and the multires layer is signalled.
pub fn grid_hide_update<F>(
    coarse: &mut PolyMesh,
    grids: &mut SubdivGrids,
    tree: &mut Tree,
    nodes: &[usize],
    undo: &mut UndoLog,
    calc_hide: F,
) -> bool
where
    F: Fn(u32, &mut BitGroup) + Sync,
{
    let mut any_changed = false;
    {
        let hidden = grids.grid_hidden_ensure();

        let hidden_ref = &*hidden;
        let tree_ref = &*tree;
        let results: Vec<Option<Vec<BitGroup>>> = nodes
            .par_iter()
            .map(|&node| {
                let node_grids = tree_ref.node_grid_indices(node);
                let mut new_hide: Vec<BitGroup> = node_grids
                    .iter()
                    .map(|&grid| hidden_ref.group_to_owned(grid as usize))
                    .collect();
                for (&grid, bits) in node_grids.iter().zip(&mut new_hide) {
                    calc_hide(grid, bits);
                }
                let changed = node_grids
                    .iter()
                    .zip(&new_hide)
                    .any(|(&grid, bits)| !hidden_ref.group_eq(grid as usize, bits));
                changed.then_some(new_hide)
            })
            .collect();

        for (&node, result) in nodes.iter().zip(results) {
            let Some(new_hide) = result else {
                continue;
            };
            any_changed = true;
            undo.push_node(node, UndoKind::HideVert);
            for (&grid, bits) in tree.node_grid_indices(node).iter().zip(&new_hide) {
                hidden.copy_group_from(grid as usize, bits);
            }
            tree.mark_update_visibility(node);
            tree.node_update_visibility_grids(node, hidden);
        }
    }

    if any_changed {
        grids.mark_hidden_modified();
        sync_from_grids(coarse, grids);
    }
    any_changed
}

/// Update vertex hidden flags on a dynamic topology mesh.
///
/// No separate flush step exists for this representation: the same pass that
/// writes vertex flags re-derives face hidden status and the nodes' redraw
/// and fully-hidden caches.
pub fn dyntopo_update_nodes<F>(
    mesh: &mut DynTopoMesh,
    tree: &mut Tree,
    nodes: &[usize],
    undo: &mut UndoLog,
    action: VisAction,
    vert_test: F,
) -> bool
where
    F: Fn(u32, &DynTopoMesh) -> bool + Sync,
{
    let value = action.to_hide();

    let mesh_ref = &*mesh;
    let tree_ref = &*tree;
    let changes: Vec<Vec<u32>> = nodes
        .par_iter()
        .map(|&node| {
            tree_ref
                .node_unique_verts(node)
                .iter()
                .copied()
                .filter(|&vert| {
                    mesh_ref.vert(vert).hidden != value && vert_test(vert, mesh_ref)
                })
                .collect()
        })
        .collect();

    let mut any_changed = false;
    for (&node, changed) in nodes.iter().zip(&changes) {
        if changed.is_empty() {
            continue;
        }
        any_changed = true;
        undo.push_node(node, UndoKind::HideVert);
        for &vert in changed {
            mesh.set_vert_hidden(vert, value);
        }
    }

    for (&node, changed) in nodes.iter().zip(&changes) {
        mesh.update_face_hidden(tree.node_faces(node));
        if changed.is_empty() {
            continue;
        }
        let any_visible = tree
            .node_unique_verts(node)
            .iter()
            .any(|&vert| !mesh.vert(vert).hidden);
        tree.mark_rebuild_draw(node);
        tree.set_fully_hidden(node, !any_visible);
    }

    if any_changed {
        mesh.update_edge_hidden();
    }
    any_changed
}
