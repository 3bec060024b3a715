//! Named per-element attribute storage.
//!
//! Visibility state on polygon meshes lives in optional named attributes
//! (`hide_vert`, `hide_edge`, `hide_face`, `mask`) rather than in the mesh
//! struct itself. An absent attribute is meaningful: for the hidden flags it
//! is the "everything visible" sentinel, so show-all can free the memory by
//! removing the attribute instead of filling it with `false`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// The element domain an attribute is stored on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttrDomain {
    Point,
    Edge,
    Face,
}

#[derive(Debug, Clone)]
enum AttrData {
    Bool(Vec<bool>),
    Float(Vec<f32>),
}

/// Named, typed, per-domain attribute arrays with add/remove/lookup semantics.
#[derive(Debug, Clone, Default)]
pub struct AttributeStore {
    attrs: HashMap<(String, AttrDomain), AttrData>,
}

impl AttributeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str, domain: AttrDomain) -> bool {
        self.attrs.contains_key(&(name.to_owned(), domain))
    }

    pub fn bool_span(&self, name: &str, domain: AttrDomain) -> Option<&[bool]> {
        match self.attrs.get(&(name.to_owned(), domain)) {
            Some(AttrData::Bool(values)) => Some(values),
            _ => None,
        }
    }

    pub fn bool_span_mut(&mut self, name: &str, domain: AttrDomain) -> Option<&mut [bool]> {
        match self.attrs.get_mut(&(name.to_owned(), domain)) {
            Some(AttrData::Bool(values)) => Some(values),
            _ => None,
        }
    }

    /// Look up a boolean attribute, lazily creating it (all `false`) if absent.
    ///
    /// An existing attribute of another type under the same name is replaced.
    pub fn ensure_bool(&mut self, name: &str, domain: AttrDomain, len: usize) -> &mut Vec<bool> {
        let entry = self
            .attrs
            .entry((name.to_owned(), domain))
            .or_insert_with(|| AttrData::Bool(vec![false; len]));
        if !matches!(entry, AttrData::Bool(_)) {
            *entry = AttrData::Bool(vec![false; len]);
        }
        match entry {
            AttrData::Bool(values) => values,
            AttrData::Float(_) => unreachable!("replaced above"),
        }
    }

    pub fn float_span(&self, name: &str, domain: AttrDomain) -> Option<&[f32]> {
        match self.attrs.get(&(name.to_owned(), domain)) {
            Some(AttrData::Float(values)) => Some(values),
            _ => None,
        }
    }

    /// Look up a float attribute, lazily creating it (all `0.0`) if absent.
    ///
    /// An existing attribute of another type under the same name is replaced.
    pub fn ensure_float(&mut self, name: &str, domain: AttrDomain, len: usize) -> &mut Vec<f32> {
        let entry = self
            .attrs
            .entry((name.to_owned(), domain))
            .or_insert_with(|| AttrData::Float(vec![0.0; len]));
        if !matches!(entry, AttrData::Float(_)) {
            *entry = AttrData::Float(vec![0.0; len]);
        }
        match entry {
            AttrData::Float(values) => values,
            AttrData::Bool(_) => unreachable!("replaced above"),
        }
    }

    /// Remove an attribute, returning whether it existed.
    pub fn remove(&mut self, name: &str, domain: AttrDomain) -> bool {
        self.attrs.remove(&(name.to_owned(), domain)).is_some()
    }
}
