//! Core types shared by the visibility operators.

use serde::{Deserialize, Serialize};

/// Whether an operation hides or shows the elements it matches.
///
/// `Show` never means "reveal everything"; it only applies the show polarity
/// to matched or propagated elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VisAction {
    Hide,
    Show,
}

impl VisAction {
    /// The hidden-flag value this action writes.
    pub fn to_hide(self) -> bool {
        matches!(self, VisAction::Hide)
    }
}

/// The kind of change an undo record captures for a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UndoKind {
    HideVert,
    HideFace,
}

/// Vertices per grow/shrink iteration when deriving the step count
/// automatically.
pub const VERT_ITERATION_THRESHOLD: usize = 50_000;

/// Settings for the grow/shrink visibility filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Number of one-ring propagation steps, clamped to `[1, 100]`.
    pub iterations: u32,
    /// Derive the step count from the vertex count instead.
    pub auto_iteration_count: bool,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            iterations: 1,
            auto_iteration_count: true,
        }
    }
}

impl FilterConfig {
    /// The effective iteration count for a mesh with `vert_count` vertices.
    pub fn resolve(&self, vert_count: usize) -> u32 {
        if self.auto_iteration_count {
            (vert_count / VERT_ITERATION_THRESHOLD) as u32 + 1
        } else {
            self.iterations.clamp(1, 100)
        }
    }
}
