//! Visibility engine for the Terracotta sculpting system.
//!
//! Hiding parts of a mesh while sculpting keeps them out of brush reach and
//! out of the viewport. This crate manages that hidden state across all three
//! mesh representations in the `mesh` crate and keeps the derived state
//! consistent: face and edge flags follow vertex flags, coarse vertices
//! follow grid samples, and the spatial tree's per-node caches follow both.
//!
//! Entry points live on [`operators::SculptObject`]: hide/show everything,
//! hide/show by sculpt mask, invert, grow/shrink by topological rings, and
//! gesture-region hide/show. Every operator records per-node undo state
//! through [`undo::UndoLog`] before its first write and skips undo, dirty
//! marks and redraw tags entirely when it changes nothing.

pub mod bulk;
pub mod filter;
pub mod flush;
pub mod gesture;
pub mod operators;
pub mod sync;
pub mod tree;
pub mod types;
pub mod undo;
pub mod update;

pub use gesture::{BoxRegion, GestureRegion, SelectionType, SphereRegion};
pub use operators::{MeshRepr, OperatorStatus, SculptObject};
pub use sync::sync_all_from_faces;
pub use tree::{Tree, TreeError};
pub use types::{FilterConfig, UndoKind, VisAction};
pub use undo::{UndoLog, UndoStep};
