//! Top-level visibility operators.
//!
//! Each operator follows the same shape: ensure the acceleration tree
//! exists, open one undo transaction, gather the node set, dispatch on the
//! active mesh representation, close the transaction and invalidate cached
//! topology islands. Failure to build the tree cancels the operator before
//! anything is written.

use mesh::dyntopo::DynTopoMesh;
use mesh::grids::SubdivGrids;
use mesh::polygon::PolyMesh;
use tracing::debug;

use crate::bulk::{
    all_update_dyntopo, all_update_grids, all_update_mesh, invert_visibility_dyntopo,
    invert_visibility_grids, invert_visibility_mesh, masked_update_dyntopo, masked_update_grids,
    masked_update_mesh,
};
use crate::filter::{
    grow_shrink_visibility_dyntopo, grow_shrink_visibility_grids, grow_shrink_visibility_mesh,
};
use crate::gesture::{
    GestureRegion, SelectionType, gesture_update_dyntopo, gesture_update_grids,
    gesture_update_mesh,
};
use crate::tree::{Tree, TreeError};
use crate::types::{FilterConfig, VisAction};
use crate::undo::UndoLog;

/// The active mesh representation of a sculpt object.
#[derive(Debug, Clone)]
pub enum MeshRepr {
    Polygon(PolyMesh),
    Grids {
        coarse: PolyMesh,
        grids: SubdivGrids,
    },
    DynTopo(DynTopoMesh),
}

impl MeshRepr {
    /// The number of visibility-bearing elements, used to derive automatic
    /// filter iteration counts.
    pub fn vert_count(&self) -> usize {
        match self {
            MeshRepr::Polygon(mesh) => mesh.vert_count(),
            MeshRepr::Grids { grids, .. } => grids.sample_count(),
            MeshRepr::DynTopo(mesh) => mesh.vert_count(),
        }
    }
}

/// What an operator invocation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorStatus {
    /// The operator ran; `redraw` reports whether anything changed and the
    /// viewport needs a redraw tag.
    Finished { redraw: bool },
    /// The operator could not start and wrote nothing.
    Cancelled,
}

/// A sculptable object: one mesh representation plus its lazily built tree.
#[derive(Debug, Clone)]
pub struct SculptObject {
    pub repr: MeshRepr,
    tree: Option<Tree>,
    leaf_size: usize,
    topology_islands_valid: bool,
}

impl SculptObject {
    pub fn new(repr: MeshRepr, leaf_size: usize) -> Self {
        Self {
            repr,
            tree: None,
            leaf_size,
            topology_islands_valid: false,
        }
    }

    /// Build the tree if it does not exist yet.
    pub fn ensure_tree(&mut self) -> Result<(), TreeError> {
        if self.tree.is_none() {
            let tree = match &self.repr {
                MeshRepr::Polygon(mesh) => Tree::build_mesh(mesh, self.leaf_size)?,
                MeshRepr::Grids { grids, .. } => Tree::build_grids(grids, self.leaf_size)?,
                MeshRepr::DynTopo(mesh) => Tree::build_dyntopo(mesh, self.leaf_size)?,
            };
            self.tree = Some(tree);
        }
        Ok(())
    }

    pub fn tree(&self) -> Option<&Tree> {
        self.tree.as_ref()
    }

    /// Cached topology island state; every visibility operator invalidates
    /// it on completion.
    pub fn topology_islands_valid(&self) -> bool {
        self.topology_islands_valid
    }

    pub fn topology_islands_validate(&mut self) {
        self.topology_islands_valid = true;
    }

    pub(crate) fn topology_islands_invalidate(&mut self) {
        self.topology_islands_valid = false;
    }

    /// Hide or show the whole object.
    pub fn hide_show_all(&mut self, undo: &mut UndoLog, action: VisAction) -> OperatorStatus {
        if self.ensure_tree().is_err() {
            return OperatorStatus::Cancelled;
        }
        let Some(tree) = self.tree.as_mut() else {
            return OperatorStatus::Cancelled;
        };
        undo.push_begin(action_description(action));
        let nodes = tree.search_gather();
        let redraw = match &mut self.repr {
            MeshRepr::Polygon(mesh) => all_update_mesh(mesh, tree, &nodes, undo, action),
            MeshRepr::Grids { coarse, grids } => {
                all_update_grids(coarse, grids, tree, &nodes, undo, action)
            }
            MeshRepr::DynTopo(mesh) => all_update_dyntopo(mesh, tree, &nodes, undo, action),
        };
        undo.push_end();
        self.topology_islands_invalidate();
        debug!(?action, redraw, "hide_show_all finished");
        OperatorStatus::Finished { redraw }
    }

    /// Hide or show the elements whose sculpt mask exceeds 0.5.
    pub fn hide_show_masked(&mut self, undo: &mut UndoLog, action: VisAction) -> OperatorStatus {
        if self.ensure_tree().is_err() {
            return OperatorStatus::Cancelled;
        }
        let Some(tree) = self.tree.as_mut() else {
            return OperatorStatus::Cancelled;
        };
        undo.push_begin(action_description(action));
        let nodes = tree.search_gather();
        let redraw = match &mut self.repr {
            MeshRepr::Polygon(mesh) => masked_update_mesh(mesh, tree, &nodes, undo, action),
            MeshRepr::Grids { coarse, grids } => {
                masked_update_grids(coarse, grids, tree, &nodes, undo, action)
            }
            MeshRepr::DynTopo(mesh) => masked_update_dyntopo(mesh, tree, &nodes, undo, action),
        };
        undo.push_end();
        self.topology_islands_invalidate();
        OperatorStatus::Finished { redraw }
    }

    /// Invert the visibility of every element.
    pub fn visibility_invert(&mut self, undo: &mut UndoLog) -> OperatorStatus {
        if self.ensure_tree().is_err() {
            return OperatorStatus::Cancelled;
        }
        let Some(tree) = self.tree.as_mut() else {
            return OperatorStatus::Cancelled;
        };
        undo.push_begin("Invert visibility");
        let nodes = tree.search_gather();
        match &mut self.repr {
            MeshRepr::Polygon(mesh) => invert_visibility_mesh(mesh, tree, &nodes, undo),
            MeshRepr::Grids { coarse, grids } => {
                invert_visibility_grids(coarse, grids, tree, &nodes, undo)
            }
            MeshRepr::DynTopo(mesh) => invert_visibility_dyntopo(mesh, tree, &nodes, undo),
        }
        undo.push_end();
        self.topology_islands_invalidate();
        OperatorStatus::Finished { redraw: true }
    }

    /// Grow or shrink the visible region by a number of topological rings.
    pub fn visibility_filter(
        &mut self,
        undo: &mut UndoLog,
        action: VisAction,
        config: FilterConfig,
    ) -> OperatorStatus {
        if self.ensure_tree().is_err() {
            return OperatorStatus::Cancelled;
        }
        let iterations = config.resolve(self.repr.vert_count());
        let Some(tree) = self.tree.as_mut() else {
            return OperatorStatus::Cancelled;
        };
        undo.push_begin("Visibility filter");
        let nodes = tree.search_gather();
        match &mut self.repr {
            MeshRepr::Polygon(mesh) => {
                grow_shrink_visibility_mesh(mesh, tree, &nodes, undo, action, iterations);
            }
            MeshRepr::Grids { coarse, grids } => {
                grow_shrink_visibility_grids(coarse, grids, tree, &nodes, undo, action, iterations);
            }
            MeshRepr::DynTopo(mesh) => {
                grow_shrink_visibility_dyntopo(mesh, tree, &nodes, undo, action, iterations);
            }
        }
        undo.push_end();
        self.topology_islands_invalidate();
        OperatorStatus::Finished { redraw: true }
    }

    /// Hide or show the elements selected by a gesture. Each region in
    /// `regions` is one symmetry pass; all passes share a single undo
    /// transaction.
    pub fn hide_show_gesture(
        &mut self,
        undo: &mut UndoLog,
        action: VisAction,
        regions: &[&(dyn GestureRegion + Sync)],
        selection: SelectionType,
    ) -> OperatorStatus {
        if self.ensure_tree().is_err() {
            return OperatorStatus::Cancelled;
        }
        let Some(tree) = self.tree.as_mut() else {
            return OperatorStatus::Cancelled;
        };
        undo.push_begin(action_description(action));
        let nodes = tree.search_gather();
        let mut redraw = false;
        for &region in regions {
            redraw |= match &mut self.repr {
                MeshRepr::Polygon(mesh) => {
                    gesture_update_mesh(mesh, tree, &nodes, undo, action, region, selection)
                }
                MeshRepr::Grids { coarse, grids } => gesture_update_grids(
                    coarse, grids, tree, &nodes, undo, action, region, selection,
                ),
                MeshRepr::DynTopo(mesh) => {
                    gesture_update_dyntopo(mesh, tree, &nodes, undo, action, region, selection)
                }
            };
        }
        undo.push_end();
        self.topology_islands_invalidate();
        OperatorStatus::Finished { redraw }
    }
}

fn action_description(action: VisAction) -> &'static str {
    match action {
        VisAction::Hide => "Hide area",
        VisAction::Show => "Show area",
    }
}
