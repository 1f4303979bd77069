//! State store: what the engine changed, so it can be put back.
//!
//! Records are keyed by generational [`NodeId`]s and hold only strings, never
//! nodes. A node the host page throws away is freed by the document as usual;
//! its record simply stops resolving and is dropped on the next restore or
//! [`StateStore::prune`].

use std::collections::BTreeMap;

use crate::dom::{Document, NodeId};

/// Pre-transform state of one text node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextNodeRecord {
    /// The emphasis run that stands in the text node's place.
    pub node: NodeId,
    /// Text content before the transformation, byte for byte.
    pub original: String,
    /// Set once the run has been swapped into the document.
    pub applied: bool,
}

/// Pre-activation state of the root scope's companion attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeRecord {
    pub scope: NodeId,
    pub class: Option<String>,
    pub style: Option<String>,
    /// Injected `<style>` element, if one was added.
    pub stylesheet: Option<NodeId>,
}

/// Everything recorded during one activation cycle.
#[derive(Debug, Default)]
pub struct StateStore {
    records: BTreeMap<NodeId, TextNodeRecord>,
    scope: Option<ScopeRecord>,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a node's original text. Must happen before the node is mutated.
    pub fn record(&mut self, node: NodeId, original: impl Into<String>) {
        self.records.insert(
            node,
            TextNodeRecord {
                node,
                original: original.into(),
                applied: false,
            },
        );
    }

    pub fn mark_applied(&mut self, node: NodeId) {
        if let Some(record) = self.records.get_mut(&node) {
            record.applied = true;
        }
    }

    pub fn get(&self, node: NodeId) -> Option<&TextNodeRecord> {
        self.records.get(&node)
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.records.contains_key(&node)
    }

    pub fn take(&mut self, node: NodeId) -> Option<TextNodeRecord> {
        self.records.remove(&node)
    }

    /// Recorded node ids, ordered by id.
    pub fn nodes(&self) -> Vec<NodeId> {
        self.records.keys().copied().collect()
    }

    pub fn records(&self) -> impl Iterator<Item = &TextNodeRecord> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when neither text nor scope state is held.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty() && self.scope.is_none()
    }

    pub fn set_scope(&mut self, scope: ScopeRecord) {
        self.scope = Some(scope);
    }

    pub fn scope(&self) -> Option<&ScopeRecord> {
        self.scope.as_ref()
    }

    pub fn take_scope(&mut self) -> Option<ScopeRecord> {
        self.scope.take()
    }

    /// Drop records whose node is gone or no longer in the document.
    /// Returns how many were dropped.
    pub fn prune(&mut self, doc: &Document) -> usize {
        let before = self.records.len();
        self.records.retain(|&id, _| doc.is_attached(id));
        before - self.records.len()
    }

    pub fn clear(&mut self) {
        self.records.clear();
        self.scope = None;
    }
}
