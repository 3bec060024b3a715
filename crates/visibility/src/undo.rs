//! Undo log integration.
//!
//! The engine appends to the log under a push-before-first-write contract:
//! an operator opens a step with [`UndoLog::push_begin`], records each node it
//! is about to modify with [`UndoLog::push_node`] before writing to it, and
//! closes the step with [`UndoLog::push_end`]. Pushes are idempotent per
//! node and change kind within one step, so a node is recorded at most once
//! per operator invocation no matter how many of its elements change.

use std::collections::HashSet;

use tracing::debug;

use crate::types::UndoKind;

/// One top-level operator's worth of undo records.
#[derive(Debug, Clone)]
pub struct UndoStep {
    description: String,
    nodes: Vec<(usize, UndoKind)>,
    seen: HashSet<(usize, UndoKind)>,
}

impl UndoStep {
    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn nodes(&self) -> &[(usize, UndoKind)] {
        &self.nodes
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

/// An append-only log of undo steps.
#[derive(Debug, Clone, Default)]
pub struct UndoLog {
    steps: Vec<UndoStep>,
    active: Option<UndoStep>,
}

impl UndoLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new step. Any previously open step is closed first.
    pub fn push_begin(&mut self, description: &str) {
        if self.active.is_some() {
            debug!(description, "push_begin while a step is open; closing it");
            self.push_end();
        }
        self.active = Some(UndoStep {
            description: description.to_owned(),
            nodes: Vec::new(),
            seen: HashSet::new(),
        });
    }

    /// Record a node about to be written. Returns whether a record was
    /// appended (false for repeat pushes of the same node and kind).
    pub fn push_node(&mut self, node: usize, kind: UndoKind) -> bool {
        let Some(step) = self.active.as_mut() else {
            debug_assert!(false, "push_node outside of a step");
            return false;
        };
        if !step.seen.insert((node, kind)) {
            return false;
        }
        step.nodes.push((node, kind));
        true
    }

    /// Close the current step. Steps that recorded nothing are dropped, so
    /// no-op operators leave the log untouched.
    pub fn push_end(&mut self) {
        if let Some(step) = self.active.take() {
            if step.nodes.is_empty() {
                debug!(description = %step.description, "dropping empty undo step");
                return;
            }
            debug!(
                description = %step.description,
                nodes = step.nodes.len(),
                "undo step recorded"
            );
            self.steps.push(step);
        }
    }

    pub fn is_open(&self) -> bool {
        self.active.is_some()
    }

    pub fn steps(&self) -> &[UndoStep] {
        &self.steps
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    pub fn last_step(&self) -> Option<&UndoStep> {
        self.steps.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_node_idempotent_per_step() {
        let mut log = UndoLog::new();
        log.push_begin("Hide area");
        assert!(log.push_node(3, UndoKind::HideVert));
        assert!(!log.push_node(3, UndoKind::HideVert));
        assert!(log.push_node(3, UndoKind::HideFace));
        log.push_end();
        assert_eq!(log.last_step().map(UndoStep::node_count), Some(2));
    }

    #[test]
    fn test_idempotence_resets_between_steps() {
        let mut log = UndoLog::new();
        log.push_begin("Hide area");
        assert!(log.push_node(0, UndoKind::HideVert));
        log.push_end();
        log.push_begin("Show area");
        assert!(log.push_node(0, UndoKind::HideVert));
        log.push_end();
        assert_eq!(log.step_count(), 2);
    }

    #[test]
    fn test_empty_step_is_dropped() {
        let mut log = UndoLog::new();
        log.push_begin("Show area");
        log.push_end();
        assert_eq!(log.step_count(), 0);
        assert!(!log.is_open());
    }
}
