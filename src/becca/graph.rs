//! Branch topology of the note tree.
//!
//! [NoteHierarchy] keeps one directed edge per live branch (parent -> child, weighted by the
//! branchId) in a petgraph `StableDiGraph`, plus a noteId -> node index map. Ids referenced by
//! a branch get a node even before their note row arrives, so dangling branches are kept.

use petgraph::{
    algo::has_path_connecting,
    stable_graph::{EdgeIndex, NodeIndex, StableDiGraph},
    visit::EdgeRef,
    Direction,
};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default)]
pub struct NoteHierarchy {
    graph: StableDiGraph<String, String>,
    note_to_index: BTreeMap<String, NodeIndex>,
    branch_to_edge: BTreeMap<String, EdgeIndex>,
}

/// Outcome of [NoteHierarchy::insert_branch].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeInsert {
    Added,
    Unchanged,
    /// The edge would close a cycle along branch edges and was not added.
    RejectedCycle,
}

impl NoteHierarchy {
    pub fn note_index(&self, note_id: &str) -> Option<NodeIndex> {
        self.note_to_index.get(note_id).copied()
    }

    fn ensure_node(&mut self, note_id: &str) -> NodeIndex {
        if let Some(idx) = self.note_to_index.get(note_id) {
            return *idx;
        }
        let idx = self.graph.add_node(note_id.to_string());
        self.note_to_index.insert(note_id.to_string(), idx);
        idx
    }

    pub fn contains_branch(&self, branch_id: &str) -> bool {
        self.branch_to_edge.contains_key(branch_id)
    }

    pub fn insert_branch(&mut self, branch_id: &str, parent: &str, child: &str) -> EdgeInsert {
        if let Some(edge) = self.branch_to_edge.get(branch_id).copied() {
            if let Some((source, target)) = self.graph.edge_endpoints(edge) {
                if self.graph[source] == parent && self.graph[target] == child {
                    return EdgeInsert::Unchanged;
                }
            }
            self.remove_branch(branch_id);
        }
        let parent_idx = self.ensure_node(parent);
        let child_idx = self.ensure_node(child);
        if parent_idx == child_idx || has_path_connecting(&self.graph, child_idx, parent_idx, None)
        {
            return EdgeInsert::RejectedCycle;
        }
        let edge = self
            .graph
            .add_edge(parent_idx, child_idx, branch_id.to_string());
        self.branch_to_edge.insert(branch_id.to_string(), edge);
        EdgeInsert::Added
    }

    /// Removes the edge of `branch_id`, returning its (parent, child) endpoints.
    pub fn remove_branch(&mut self, branch_id: &str) -> Option<(String, String)> {
        let edge = self.branch_to_edge.remove(branch_id)?;
        let (source, target) = self.graph.edge_endpoints(edge)?;
        let endpoints = (self.graph[source].clone(), self.graph[target].clone());
        self.graph.remove_edge(edge);
        Some(endpoints)
    }

    fn branch_ids(&self, note_id: &str, direction: Direction) -> Vec<String> {
        let Some(idx) = self.note_index(note_id) else {
            return Vec::new();
        };
        self.graph
            .edges_directed(idx, direction)
            .map(|edge| edge.weight().clone())
            .collect()
    }

    /// BranchIds placing `note_id` under its parents.
    pub fn parent_branch_ids(&self, note_id: &str) -> Vec<String> {
        self.branch_ids(note_id, Direction::Incoming)
    }

    /// BranchIds placing children under `note_id`.
    pub fn child_branch_ids(&self, note_id: &str) -> Vec<String> {
        self.branch_ids(note_id, Direction::Outgoing)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}
