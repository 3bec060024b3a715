//! Gesture-region visibility: hide or show the elements inside (or outside)
//! a user-defined spatial region.
//!
//! The region itself is abstract; anything that can answer "does this point
//! with this normal fall inside" works, so screen-space lassos and world
//! space volumes share the same update path.

use glam::Vec3;
use mesh::dyntopo::DynTopoMesh;
use mesh::grids::{GridCoord, SubdivGrids};
use mesh::polygon::PolyMesh;
use serde::{Deserialize, Serialize};

use crate::tree::Tree;
use crate::types::VisAction;
use crate::undo::UndoLog;
use crate::update::{dyntopo_update_nodes, grid_hide_update, vert_hide_update};

/// A spatial region a gesture selects.
pub trait GestureRegion {
    /// Whether a point with the given normal falls inside the region.
    fn contains(&self, position: Vec3, normal: Vec3) -> bool;
}

/// Which side of the region the action applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectionType {
    Inside,
    Outside,
}

/// Whether the gesture affects an element at `position` / `normal`.
pub fn is_affected<R: GestureRegion + ?Sized>(
    region: &R,
    selection: SelectionType,
    position: Vec3,
    normal: Vec3,
) -> bool {
    region.contains(position, normal) == (selection == SelectionType::Inside)
}

/// A solid sphere; the normal is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SphereRegion {
    pub center: Vec3,
    pub radius: f32,
}

impl GestureRegion for SphereRegion {
    fn contains(&self, position: Vec3, _normal: Vec3) -> bool {
        position.distance_squared(self.center) <= self.radius * self.radius
    }
}

/// An axis-aligned box; the normal is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoxRegion {
    pub min: Vec3,
    pub max: Vec3,
}

impl GestureRegion for BoxRegion {
    fn contains(&self, position: Vec3, _normal: Vec3) -> bool {
        position.cmpge(self.min).all() && position.cmple(self.max).all()
    }
}

/// Apply the gesture to polygon-mesh vertices.
pub fn gesture_update_mesh<R>(
    mesh: &mut PolyMesh,
    tree: &mut Tree,
    nodes: &[usize],
    undo: &mut UndoLog,
    action: VisAction,
    region: &R,
    selection: SelectionType,
) -> bool
where
    R: GestureRegion + Sync + ?Sized,
{
    if action == VisAction::Show && mesh.hide_vert().is_none() {
        return false;
    }
    let value = action.to_hide();
    // Positions and normals are snapshotted; the update only writes hidden
    // flags, never geometry.
    let positions = mesh.positions().to_vec();
    let normals = mesh.normals().to_vec();
    vert_hide_update(mesh, tree, nodes, undo, |verts, hide| {
        for (i, &vert) in verts.iter().enumerate() {
            if is_affected(region, selection, positions[vert as usize], normals[vert as usize]) {
                hide[i] = value;
            }
        }
    })
}

/// Apply the gesture to individual grid samples.
pub fn gesture_update_grids<R>(
    coarse: &mut PolyMesh,
    grids: &mut SubdivGrids,
    tree: &mut Tree,
    nodes: &[usize],
    undo: &mut UndoLog,
    action: VisAction,
    region: &R,
    selection: SelectionType,
) -> bool
where
    R: GestureRegion + Sync + ?Sized,
{
    let value = action.to_hide();
    let grid_size = grids.grid_size();
    let grid_area = grids.grid_area();
    let mut positions = Vec::with_capacity(grids.sample_count());
    let mut normals = Vec::with_capacity(grids.sample_count());
    for grid in 0..grids.grid_count() as u32 {
        for y in 0..grid_size {
            for x in 0..grid_size {
                let coord = GridCoord {
                    grid,
                    x: x as u16,
                    y: y as u16,
                };
                positions.push(grids.sample_position(coord));
                normals.push(grids.sample_normal(coord));
            }
        }
    }

    grid_hide_update(coarse, grids, tree, nodes, undo, |grid, bits| {
        let base = grid as usize * grid_area;
        for sample in 0..grid_area {
            if is_affected(region, selection, positions[base + sample], normals[base + sample]) {
                bits.set(sample, value);
            }
        }
    })
}

/// Apply the gesture to dynamic topology vertices.
pub fn gesture_update_dyntopo<R>(
    mesh: &mut DynTopoMesh,
    tree: &mut Tree,
    nodes: &[usize],
    undo: &mut UndoLog,
    action: VisAction,
    region: &R,
    selection: SelectionType,
) -> bool
where
    R: GestureRegion + Sync + ?Sized,
{
    dyntopo_update_nodes(mesh, tree, nodes, undo, action, |vert, mesh| {
        let vert = mesh.vert(vert);
        is_affected(region, selection, vert.position, vert.normal)
    })
}
