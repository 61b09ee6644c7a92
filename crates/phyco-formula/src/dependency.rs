//! Dependency tracking between columns and charts
//!
//! Nodes are column and chart keys. An edge `(dependent, dependee, attribute)`
//! records that `dependent` reads `dependee`, with `attribute` naming the
//! aggregates it uses (empty for raw values only).
//!
//! # Invariants
//!
//! - The dependent → dependee relation is acyclic. Checked mutations reject
//!   an edge that would close a cycle and leave the graph untouched.
//! - There is at most one edge per (dependent, dependee) pair; repeated adds
//!   merge their attribute sets.
//! - Edge endpoints are registered nodes.
//! - Node registration order breaks ties in [`DependencyGraph::topological_sort`].
//!
//! All traversals use explicit stacks.

use ahash::{AHashMap, AHashSet};
use phyco_core::NodeKey;
use serde::{Deserialize, Serialize};

use crate::error::{GraphError, GraphResult};
use crate::statistics::StatisticSet;

/// A single dependency edge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub dependent: NodeKey,
    pub dependee: NodeKey,
    #[serde(default)]
    pub attribute: StatisticSet,
}

impl Dependency {
    pub fn new(dependent: NodeKey, dependee: NodeKey, attribute: StatisticSet) -> Self {
        Self {
            dependent,
            dependee,
            attribute,
        }
    }

    /// Edge reading only raw values
    pub fn value(dependent: NodeKey, dependee: NodeKey) -> Self {
        Self::new(dependent, dependee, StatisticSet::new())
    }

    fn links(&self, dependent: &NodeKey, dependee: &NodeKey) -> bool {
        &self.dependent == dependent && &self.dependee == dependee
    }

    fn touches(&self, key: &NodeKey) -> bool {
        &self.dependent == key || &self.dependee == key
    }
}

/// Nodes and edges taken out by [`DependencyGraph::pop_nodes`], with the
/// positions they occupied
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemovedNodes {
    pub nodes: Vec<(usize, NodeKey)>,
    pub edges: Vec<(usize, Dependency)>,
}

impl RemovedNodes {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }
}

/// Dependency graph over column and chart keys
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyGraph {
    /// Registered nodes in insertion order
    nodes: Vec<NodeKey>,
    /// Edges in insertion order
    edges: Vec<Dependency>,
}

impl DependencyGraph {
    /// Create a new empty dependency graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Registered nodes in insertion order
    pub fn nodes(&self) -> &[NodeKey] {
        &self.nodes
    }

    /// All edges in insertion order
    pub fn edges(&self) -> &[Dependency] {
        &self.edges
    }

    pub fn contains_node(&self, key: &NodeKey) -> bool {
        self.nodes.contains(key)
    }

    /// Register a node; registering twice is a no-op
    pub fn add_node(&mut self, key: NodeKey) {
        if !self.contains_node(&key) {
            self.nodes.push(key);
        }
    }

    pub fn add_nodes<I: IntoIterator<Item = NodeKey>>(&mut self, keys: I) {
        for key in keys {
            self.add_node(key);
        }
    }

    /// Clear all nodes and edges
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.edges.clear();
    }

    // === Edge mutation ===

    /// Add an edge, rejecting it if it would close a cycle
    ///
    /// An edge for an existing pair merges its attribute set into that edge.
    pub fn add_dependency(&mut self, dependency: Dependency) -> GraphResult<()> {
        if self.check_circular_dependency(&dependency.dependent, &dependency.dependee) {
            return Err(GraphError::CircularDependency {
                dependent: dependency.dependent,
                dependee: dependency.dependee,
            });
        }
        self.insert_edge(dependency);
        Ok(())
    }

    /// Add edges in order; on failure the graph is left as it was
    pub fn add_dependencies<I>(&mut self, dependencies: I) -> GraphResult<()>
    where
        I: IntoIterator<Item = Dependency>,
    {
        let snapshot = self.clone();
        for dependency in dependencies {
            if let Err(err) = self.add_dependency(dependency) {
                *self = snapshot;
                return Err(err);
            }
        }
        Ok(())
    }

    /// Add edges without cycle checks
    ///
    /// Only for replaying edges that were valid before, such as on undo.
    pub fn add_dependencies_unchecked<I>(&mut self, dependencies: I)
    where
        I: IntoIterator<Item = Dependency>,
    {
        for dependency in dependencies {
            self.insert_edge(dependency);
        }
    }

    fn insert_edge(&mut self, dependency: Dependency) {
        self.add_node(dependency.dependent.clone());
        self.add_node(dependency.dependee.clone());

        match self
            .edges
            .iter_mut()
            .find(|e| e.links(&dependency.dependent, &dependency.dependee))
        {
            Some(existing) => existing.attribute.extend(dependency.attribute),
            None => self.edges.push(dependency),
        }
    }

    /// Remove every edge where `dependent` is the dependent
    pub fn remove_dependencies(&mut self, dependent: &NodeKey) -> Vec<Dependency> {
        let (removed, kept): (Vec<Dependency>, Vec<Dependency>) = std::mem::take(&mut self.edges)
            .into_iter()
            .partition(|e| &e.dependent == dependent);
        self.edges = kept;
        removed
    }

    /// Remove every edge where `dependent` is the dependent, keeping positions
    /// so that [`restore_nodes`](Self::restore_nodes) can put them back
    pub fn pop_dependencies(&mut self, dependent: &NodeKey) -> RemovedNodes {
        let mut removed = RemovedNodes::default();
        let mut edges = Vec::with_capacity(self.edges.len());
        for (index, edge) in std::mem::take(&mut self.edges).into_iter().enumerate() {
            if &edge.dependent == dependent {
                removed.edges.push((index, edge));
            } else {
                edges.push(edge);
            }
        }
        self.edges = edges;
        removed
    }

    /// Remove a single edge
    pub fn remove_dependency(&mut self, dependent: &NodeKey, dependee: &NodeKey) -> Option<Dependency> {
        let index = self.edges.iter().position(|e| e.links(dependent, dependee))?;
        Some(self.edges.remove(index))
    }

    // === Node removal ===

    /// Remove a node and every edge touching it
    pub fn remove_node(&mut self, key: &NodeKey) -> bool {
        let Some(index) = self.nodes.iter().position(|n| n == key) else {
            return false;
        };
        self.nodes.remove(index);
        self.edges.retain(|e| !e.touches(key));
        true
    }

    /// Remove nodes and their edges, returning what was removed with positions
    pub fn pop_nodes(&mut self, keys: &[NodeKey]) -> RemovedNodes {
        let mut removed = RemovedNodes::default();

        let mut nodes = Vec::with_capacity(self.nodes.len());
        for (index, node) in std::mem::take(&mut self.nodes).into_iter().enumerate() {
            if keys.contains(&node) {
                removed.nodes.push((index, node));
            } else {
                nodes.push(node);
            }
        }
        self.nodes = nodes;

        let mut edges = Vec::with_capacity(self.edges.len());
        for (index, edge) in std::mem::take(&mut self.edges).into_iter().enumerate() {
            if keys.iter().any(|key| edge.touches(key)) {
                removed.edges.push((index, edge));
            } else {
                edges.push(edge);
            }
        }
        self.edges = edges;

        removed
    }

    /// Put back what [`pop_nodes`](Self::pop_nodes) removed, at the same positions
    pub fn restore_nodes(&mut self, removed: RemovedNodes) {
        for (index, node) in removed.nodes {
            let index = index.min(self.nodes.len());
            self.nodes.insert(index, node);
        }
        for (index, edge) in removed.edges {
            let index = index.min(self.edges.len());
            self.edges.insert(index, edge);
        }
    }

    // === Queries ===

    /// Edges where `key` is the dependent
    pub fn query_dependencies(&self, key: &NodeKey) -> Vec<&Dependency> {
        self.edges.iter().filter(|e| &e.dependent == key).collect()
    }

    /// Edges where `key` is the dependee
    pub fn query_dependents(&self, key: &NodeKey) -> Vec<&Dependency> {
        self.edges.iter().filter(|e| &e.dependee == key).collect()
    }

    /// Whether adding `dependent → dependee` would close a cycle
    ///
    /// True when `dependee` already (transitively) depends on `dependent`,
    /// including the self edge.
    pub fn check_circular_dependency(&self, dependent: &NodeKey, dependee: &NodeKey) -> bool {
        let mut visited: AHashSet<&NodeKey> = AHashSet::new();
        let mut stack: Vec<&NodeKey> = vec![dependee];

        while let Some(node) = stack.pop() {
            if node == dependent {
                return true;
            }
            if !visited.insert(node) {
                continue;
            }
            for edge in &self.edges {
                if &edge.dependent == node && !visited.contains(&edge.dependee) {
                    stack.push(&edge.dependee);
                }
            }
        }

        false
    }

    /// Whether replacing `key`'s dependencies with `dependencies` would
    /// introduce a cycle
    pub fn would_create_cycle(&self, key: &NodeKey, dependencies: &[Dependency]) -> bool {
        let mut trial = self.clone();
        trial.remove_dependencies(key);
        trial.add_dependencies(dependencies.iter().cloned()).is_err()
    }

    /// `key` and all its transitive dependents, dependencies first
    pub fn traverse_dependents(&self, key: &NodeKey) -> Vec<NodeKey> {
        let positions = self.positions();
        let mut visited = AHashSet::new();
        let mut postorder = Vec::new();
        self.visit_dependents(key, &positions, &mut visited, &mut postorder);
        postorder.reverse();
        postorder
    }

    /// Every registered node, each after all of its dependees
    ///
    /// Nodes with no ordering constraint between them keep their
    /// registration order.
    pub fn topological_sort(&self) -> Vec<NodeKey> {
        let positions = self.positions();
        let mut visited = AHashSet::new();
        let mut postorder = Vec::with_capacity(self.nodes.len());
        for node in self.nodes.iter().rev() {
            if !visited.contains(node) {
                self.visit_dependents(node, &positions, &mut visited, &mut postorder);
            }
        }
        postorder.reverse();
        postorder
    }

    /// Registration index of every node
    fn positions(&self) -> AHashMap<&NodeKey, usize> {
        self.nodes.iter().enumerate().map(|(i, node)| (node, i)).collect()
    }

    /// Direct dependents of `key`, in reverse registration order
    fn dependents_reversed(
        &self,
        key: &NodeKey,
        positions: &AHashMap<&NodeKey, usize>,
    ) -> Vec<&NodeKey> {
        let mut dependents: Vec<&NodeKey> = self
            .edges
            .iter()
            .filter(|e| &e.dependee == key)
            .map(|e| &e.dependent)
            .collect();
        dependents.sort_by_key(|node| {
            std::cmp::Reverse(positions.get(*node).copied().unwrap_or(usize::MAX))
        });
        dependents.dedup();
        dependents
    }

    /// Iterative depth-first postorder over dependent edges
    fn visit_dependents(
        &self,
        root: &NodeKey,
        positions: &AHashMap<&NodeKey, usize>,
        visited: &mut AHashSet<NodeKey>,
        postorder: &mut Vec<NodeKey>,
    ) {
        if !visited.insert(root.clone()) {
            return;
        }

        // (node, its dependents, next child index)
        let mut stack = vec![(root, self.dependents_reversed(root, positions), 0usize)];

        while let Some((node, children, next)) = stack.last_mut() {
            if let Some(child) = children.get(*next).copied() {
                *next += 1;
                if visited.insert(child.clone()) {
                    let grandchildren = self.dependents_reversed(child, positions);
                    stack.push((child, grandchildren, 0));
                }
            } else {
                postorder.push((*node).clone());
                stack.pop();
            }
        }
    }

    /// Recompute the transitive dependents of `changed`, dependencies first
    ///
    /// `recompute(node, changed_dependees)` is called once for each dependent
    /// that reads at least one node reported changed so far, and returns
    /// whether the node itself changed. Returns the keys that changed.
    pub fn propagate_dependents<F>(&self, changed: &NodeKey, mut recompute: F) -> Vec<NodeKey>
    where
        F: FnMut(&NodeKey, &[NodeKey]) -> bool,
    {
        let mut changed_nodes: AHashSet<NodeKey> = AHashSet::new();
        changed_nodes.insert(changed.clone());
        let mut result = Vec::new();

        for node in self.traverse_dependents(changed).into_iter().skip(1) {
            let changed_dependees: Vec<NodeKey> = self
                .query_dependencies(&node)
                .into_iter()
                .filter(|e| changed_nodes.contains(&e.dependee))
                .map(|e| e.dependee.clone())
                .collect();

            if changed_dependees.is_empty() {
                continue;
            }

            log::trace!("recomputing {} after change to {:?}", node, changed_dependees);
            if recompute(&node, &changed_dependees) {
                changed_nodes.insert(node.clone());
                result.push(node);
            }
        }

        result
    }

    // === Persistence ===

    /// Edge list for saving
    pub fn to_project_model(&self) -> Vec<Dependency> {
        self.edges.clone()
    }

    /// Replay saved edges through the checked path
    ///
    /// Every endpoint must already be registered. On failure the graph is
    /// left as it was.
    pub fn load_project_model(&mut self, dependencies: Vec<Dependency>) -> GraphResult<()> {
        for dependency in &dependencies {
            for key in [&dependency.dependent, &dependency.dependee] {
                if !self.contains_node(key) {
                    return Err(GraphError::MissingNode(key.clone()));
                }
            }
        }
        self.add_dependencies(dependencies)
    }
}
