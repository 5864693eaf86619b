//! Persistent graph of nodes, edges and paths.
//!
//! A `Graph` is never modified in place by public API. Each edit clones the
//! three entity maps (cheap: the values are `Arc`s), changes the copy and
//! returns it. Entities the edit does not touch stay shared with every
//! earlier snapshot, so holders of old snapshots and pointer-based change
//! detection both keep working.

use crate::error::GraphError;
use crate::id::{EdgeId, FreshIds, NodeId, PathId};
use crate::inherit::splice_by_equality;
use crate::model::{Coord, Data, EdgeData, EdgeList, NodeData, PathData};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// `\path [use as bounding box] (from) rectangle (to);`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub from: Coord,
    pub to: Coord,
}

/// The document model of one `tikzpicture`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Graph {
    data: Data,
    nodes: IndexMap<NodeId, Arc<NodeData>>,
    edges: IndexMap<EdgeId, Arc<EdgeData>>,
    paths: IndexMap<PathId, Arc<PathData>>,
    bounding_box: Option<BoundingBox>,
    fresh: FreshIds,
}

impl Graph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ─── Queries ─────────────────────────────────────────────────────────

    /// Picture-level properties (`\begin{tikzpicture}[...]`).
    pub fn data(&self) -> &Data {
        &self.data
    }

    pub fn bounding_box(&self) -> Option<BoundingBox> {
        self.bounding_box
    }

    pub fn node(&self, id: NodeId) -> Option<&Arc<NodeData>> {
        self.nodes.get(&id)
    }

    pub fn edge(&self, id: EdgeId) -> Option<&Arc<EdgeData>> {
        self.edges.get(&id)
    }

    pub fn path(&self, id: PathId) -> Option<&Arc<PathData>> {
        self.paths.get(&id)
    }

    /// Nodes in document order.
    pub fn nodes(&self) -> impl Iterator<Item = &Arc<NodeData>> {
        self.nodes.values()
    }

    pub fn edges(&self) -> impl Iterator<Item = &Arc<EdgeData>> {
        self.edges.values()
    }

    pub fn paths(&self) -> impl Iterator<Item = &Arc<PathData>> {
        self.paths.values()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn path_count(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    /// Edges of a path in drawing order. Missing ids are skipped.
    pub fn path_edges(&self, id: PathId) -> impl Iterator<Item = &Arc<EdgeData>> {
        self.paths
            .get(&id)
            .into_iter()
            .flat_map(|path| path.edges.iter())
            .filter_map(move |e| self.edges.get(e))
    }

    /// Source node of the path's first edge.
    pub fn path_source(&self, id: PathId) -> Option<NodeId> {
        let first = self.paths.get(&id)?.first_edge()?;
        self.edges.get(&first).map(|e| e.source)
    }

    /// Target node of the path's last edge.
    pub fn path_target(&self, id: PathId) -> Option<NodeId> {
        let last = self.paths.get(&id)?.last_edge()?;
        self.edges.get(&last).map(|e| e.target)
    }

    /// Edges with `node` as source or target.
    pub fn edges_of_node(&self, node: NodeId) -> impl Iterator<Item = &Arc<EdgeData>> {
        self.edges
            .values()
            .filter(move |e| e.source == node || e.target == node)
    }

    pub fn fresh_ids(&self) -> FreshIds {
        self.fresh
    }

    pub fn fresh_node_id(&self) -> NodeId {
        NodeId(self.fresh.node)
    }

    pub fn fresh_edge_id(&self) -> EdgeId {
        EdgeId(self.fresh.edge)
    }

    pub fn fresh_path_id(&self) -> PathId {
        PathId(self.fresh.path)
    }

    /// Check the path invariants: every path non-empty and contiguous,
    /// closed when marked as a cycle, every edge owned by exactly the one
    /// path it names, every edge endpoint present.
    pub fn validate(&self) -> Result<(), GraphError> {
        let mut owners: HashMap<EdgeId, usize> = HashMap::new();
        for path in self.paths.values() {
            if path.edges.is_empty() {
                return Err(GraphError::EmptyPath(path.id));
            }
            let mut previous: Option<&EdgeData> = None;
            for &edge_id in &path.edges {
                let edge = self.edges.get(&edge_id).ok_or(GraphError::DanglingEdge {
                    path: path.id,
                    edge: edge_id,
                })?;
                if edge.path != path.id {
                    return Err(GraphError::OwnerMismatch {
                        edge: edge_id,
                        path: edge.path,
                    });
                }
                if let Some(prev) = previous
                    && prev.target != edge.source
                {
                    return Err(GraphError::Discontiguous {
                        path: path.id,
                        edge: edge_id,
                    });
                }
                *owners.entry(edge_id).or_default() += 1;
                previous = Some(edge.as_ref());
            }
            if path.is_cycle && self.path_source(path.id) != self.path_target(path.id) {
                return Err(GraphError::OpenCycle(path.id));
            }
        }
        for edge in self.edges.values() {
            match owners.get(&edge.id).copied().unwrap_or(0) {
                1 => {}
                0 if !self.paths.contains_key(&edge.path) => {
                    return Err(GraphError::Ownership {
                        edge: edge.id,
                        owners: 0,
                    });
                }
                0 => {
                    return Err(GraphError::OwnerMismatch {
                        edge: edge.id,
                        path: edge.path,
                    });
                }
                n => {
                    return Err(GraphError::Ownership {
                        edge: edge.id,
                        owners: n,
                    });
                }
            }
            for node in [edge.source, edge.target] {
                if !self.nodes.contains_key(&node) {
                    return Err(GraphError::MissingNode {
                        edge: edge.id,
                        node,
                    });
                }
            }
        }
        Ok(())
    }

    // ─── In-place building blocks (parser and edit internals) ────────────

    pub(crate) fn insert_node(&mut self, node: NodeData) {
        self.fresh.observe_node(node.id);
        self.nodes.insert(node.id, Arc::new(node));
    }

    pub(crate) fn insert_edge(&mut self, edge: EdgeData) {
        self.fresh.observe_edge(edge.id);
        self.edges.insert(edge.id, Arc::new(edge));
    }

    pub(crate) fn insert_path(&mut self, path: PathData) {
        self.fresh.observe_path(path.id);
        self.paths.insert(path.id, Arc::new(path));
    }

    pub(crate) fn set_data(&mut self, data: Data) {
        self.data = data;
    }

    pub(crate) fn set_bounding_box(&mut self, bounding_box: Option<BoundingBox>) {
        self.bounding_box = bounding_box;
    }

    pub(crate) fn take_node_id(&mut self) -> NodeId {
        self.fresh.take_node()
    }

    pub(crate) fn take_edge_id(&mut self) -> EdgeId {
        self.fresh.take_edge()
    }

    pub(crate) fn take_path_id(&mut self) -> PathId {
        self.fresh.take_path()
    }

    /// Point `edge` at `path` as its owner, reusing the value if unchanged.
    fn restamp_edge(&mut self, edge: EdgeId, path: PathId) {
        if let Some(current) = self.edges.get_mut(&edge)
            && current.path != path
        {
            *current = Arc::new(current.as_ref().clone().with_path(path));
        }
    }

    /// Put `path` directly after the entry at `index`, or at the end.
    fn place_path_after(&mut self, index: Option<usize>, path: PathData) {
        self.fresh.observe_path(path.id);
        match index {
            Some(i) if i < self.paths.len() => {
                self.paths.shift_insert(i + 1, path.id, Arc::new(path));
            }
            _ => {
                self.paths.insert(path.id, Arc::new(path));
            }
        }
    }

    /// Re-establish the path invariants after edges were deleted.
    ///
    /// Each maximal run of surviving edges becomes its own path: the first
    /// run keeps the original id, later runs get fresh ids and are placed
    /// right after it. Paths left without edges are dropped, and a path
    /// that lost any edge is no longer a cycle.
    fn repair_paths(&mut self) {
        let damaged: Vec<Arc<PathData>> = self
            .paths
            .values()
            .filter(|p| p.edges.iter().any(|e| !self.edges.contains_key(e)))
            .cloned()
            .collect();

        for path in damaged {
            let runs: Vec<EdgeList> = path
                .edges
                .split(|e| !self.edges.contains_key(e))
                .filter(|run| !run.is_empty())
                .map(|run| run.iter().copied().collect())
                .collect();

            if runs.is_empty() {
                log::trace!("repair: dropping empty path {:?}", path.id);
                self.paths.shift_remove(&path.id);
                continue;
            }
            if runs.len() > 1 {
                log::trace!("repair: path {:?} splits into {} runs", path.id, runs.len());
            }

            let mut index = self.paths.get_index_of(&path.id);
            for (i, run) in runs.into_iter().enumerate() {
                let id = if i == 0 { path.id } else { self.fresh.take_path() };
                for &edge in &run {
                    self.restamp_edge(edge, id);
                }
                let repaired = PathData {
                    id,
                    edges: run,
                    is_cycle: false,
                };
                if i == 0 {
                    self.paths.insert(id, Arc::new(repaired));
                } else {
                    self.place_path_after(index, repaired);
                    index = index.map(|x| x + 1);
                }
            }
        }
    }

    // ─── Edits ───────────────────────────────────────────────────────────

    #[must_use]
    pub fn with_data(&self, data: Data) -> Graph {
        let mut g = self.clone();
        g.data = data;
        g
    }

    #[must_use]
    pub fn with_bounding_box(&self, bounding_box: Option<BoundingBox>) -> Graph {
        let mut g = self.clone();
        g.bounding_box = bounding_box;
        g
    }

    /// Insert a node, or replace the node with the same id in place.
    #[must_use]
    pub fn add_node(&self, node: NodeData) -> Graph {
        let mut g = self.clone();
        g.insert_node(node);
        g
    }

    /// Insert an edge, or replace the edge with the same id in place. The
    /// caller keeps the owning path consistent.
    #[must_use]
    pub fn add_edge(&self, edge: EdgeData) -> Graph {
        let mut g = self.clone();
        g.insert_edge(edge);
        g
    }

    #[must_use]
    pub fn add_path(&self, path: PathData) -> Graph {
        let mut g = self.clone();
        g.insert_path(path);
        g
    }

    /// Replace node `id` with `f(node)`. No-op if the node does not exist.
    /// `f` must keep the id.
    #[must_use]
    pub fn update_node(&self, id: NodeId, f: impl FnOnce(&NodeData) -> NodeData) -> Graph {
        let Some(current) = self.nodes.get(&id) else {
            return self.clone();
        };
        let updated = f(current.as_ref());
        debug_assert_eq!(updated.id, id, "update_node must not change the id");
        let mut g = self.clone();
        g.nodes.insert(id, Arc::new(updated));
        g
    }

    #[must_use]
    pub fn update_edge(&self, id: EdgeId, f: impl FnOnce(&EdgeData) -> EdgeData) -> Graph {
        let Some(current) = self.edges.get(&id) else {
            return self.clone();
        };
        let updated = f(current.as_ref());
        debug_assert_eq!(updated.id, id, "update_edge must not change the id");
        let mut g = self.clone();
        g.edges.insert(id, Arc::new(updated));
        g
    }

    #[must_use]
    pub fn update_path(&self, id: PathId, f: impl FnOnce(&PathData) -> PathData) -> Graph {
        let Some(current) = self.paths.get(&id) else {
            return self.clone();
        };
        let updated = f(current.as_ref());
        debug_assert_eq!(updated.id, id, "update_path must not change the id");
        let mut g = self.clone();
        g.paths.insert(id, Arc::new(updated));
        g
    }

    /// Move the given nodes by `(dx, dy)`.
    #[must_use]
    pub fn translate_nodes(
        &self,
        ids: impl IntoIterator<Item = NodeId>,
        dx: f64,
        dy: f64,
    ) -> Graph {
        let mut g = self.clone();
        for id in ids {
            if let Some(node) = g.nodes.get_mut(&id) {
                let moved = node.as_ref().clone().with_coord(node.coord.translate(dx, dy));
                *node = Arc::new(moved);
            }
        }
        g
    }

    /// Delete nodes together with every edge touching them, then repair
    /// the affected paths.
    #[must_use]
    pub fn remove_nodes(&self, ids: impl IntoIterator<Item = NodeId>) -> Graph {
        let ids: HashSet<NodeId> = ids.into_iter().collect();
        let mut g = self.clone();
        g.nodes.retain(|id, _| !ids.contains(id));
        g.edges
            .retain(|_, e| !ids.contains(&e.source) && !ids.contains(&e.target));
        g.repair_paths();
        g
    }

    /// Delete edges, then repair the affected paths.
    #[must_use]
    pub fn remove_edges(&self, ids: impl IntoIterator<Item = EdgeId>) -> Graph {
        let ids: HashSet<EdgeId> = ids.into_iter().collect();
        let mut g = self.clone();
        g.edges.retain(|id, _| !ids.contains(id));
        g.repair_paths();
        g
    }

    /// Keep only the given nodes (and the edges between them).
    #[must_use]
    pub fn subgraph_from_nodes(&self, ids: impl IntoIterator<Item = NodeId>) -> Graph {
        let keep: HashSet<NodeId> = ids.into_iter().collect();
        let complement: Vec<NodeId> = self
            .nodes
            .keys()
            .filter(|id| !keep.contains(id))
            .copied()
            .collect();
        self.remove_nodes(complement)
    }

    /// Draw the path in the opposite direction.
    #[must_use]
    pub fn reverse_path(&self, id: PathId) -> Graph {
        let Some(path) = self.paths.get(&id).cloned() else {
            return self.clone();
        };
        let mut g = self.clone();
        g.reverse_edges(&path.edges);
        let reversed = path
            .as_ref()
            .clone()
            .with_edges(path.edges.iter().rev().copied());
        g.paths.insert(id, Arc::new(reversed));
        g
    }

    fn reverse_edges(&mut self, edges: &[EdgeId]) {
        for id in edges {
            if let Some(edge) = self.edges.get_mut(id) {
                *edge = Arc::new(edge.reversed());
            }
        }
    }

    /// Turn an N-edge path into N one-edge paths. The first edge keeps the
    /// path id.
    #[must_use]
    pub fn split_path(&self, id: PathId) -> Graph {
        let Some(path) = self.paths.get(&id).cloned() else {
            return self.clone();
        };
        let mut g = self.clone();
        let mut index = g.paths.get_index_of(&id);
        for (i, &edge) in path.edges.iter().enumerate() {
            if i == 0 {
                g.paths.insert(id, Arc::new(PathData::new(id, [edge])));
                continue;
            }
            let fresh = g.fresh.take_path();
            g.restamp_edge(edge, fresh);
            g.place_path_after(index, PathData::new(fresh, [edge]));
            index = index.map(|x| x + 1);
        }
        g
    }

    /// Join path `b` onto path `a` if they share an endpoint. `a` keeps its
    /// id, `b` disappears. `b` is reversed when the shared endpoints face
    /// the same way.
    ///
    /// Returns `None` when the paths cannot be joined: either is missing or
    /// a cycle, they are the same path, or no endpoints meet.
    pub fn join_two_paths(&self, a: PathId, b: PathId) -> Option<Graph> {
        if a == b {
            return None;
        }
        let path_a = self.paths.get(&a)?;
        let path_b = self.paths.get(&b)?;
        if path_a.is_cycle || path_b.is_cycle {
            log::trace!("join: {a:?} or {b:?} is a cycle");
            return None;
        }
        let (a_src, a_tgt) = (self.path_source(a)?, self.path_target(a)?);
        let (b_src, b_tgt) = (self.path_source(b)?, self.path_target(b)?);

        let forward_b = || path_b.edges.iter().copied();
        let backward_b = || path_b.edges.iter().rev().copied();
        let edges_a = || path_a.edges.iter().copied();

        let (edges, reverse_b): (EdgeList, bool) = if a_tgt == b_src {
            (edges_a().chain(forward_b()).collect(), false)
        } else if a_src == b_tgt {
            (forward_b().chain(edges_a()).collect(), false)
        } else if a_tgt == b_tgt {
            (edges_a().chain(backward_b()).collect(), true)
        } else if a_src == b_src {
            (backward_b().chain(edges_a()).collect(), true)
        } else {
            log::trace!("join: {a:?} and {b:?} share no endpoint");
            return None;
        };

        let mut g = self.clone();
        if reverse_b {
            g.reverse_edges(&path_b.edges);
        }
        for &edge in &path_b.edges {
            g.restamp_edge(edge, a);
        }
        g.paths.shift_remove(&b);
        g.paths.insert(
            a,
            Arc::new(PathData {
                id: a,
                edges,
                is_cycle: false,
            }),
        );
        Some(g)
    }

    /// Join all listed paths into the first one.
    ///
    /// All or nothing: if some path never connects to the growing result,
    /// the original graph is returned unchanged. A joined path whose ends
    /// meet is marked as a cycle.
    #[must_use]
    pub fn join_paths(&self, ids: &[PathId]) -> Graph {
        let Some((&first, rest)) = ids.split_first() else {
            return self.clone();
        };
        if ids.iter().any(|id| !self.paths.contains_key(id)) {
            return self.clone();
        }
        let mut seen = HashSet::from([first]);
        let mut pending: Vec<PathId> = rest.iter().copied().filter(|p| seen.insert(*p)).collect();
        if pending.is_empty() {
            return self.clone();
        }

        let mut acc = self.clone();
        while !pending.is_empty() {
            let joined = pending
                .iter()
                .enumerate()
                .find_map(|(i, &p)| acc.join_two_paths(first, p).map(|g| (i, g)));
            match joined {
                Some((i, g)) => {
                    acc = g;
                    pending.remove(i);
                }
                None => {
                    log::trace!("join: {pending:?} never connect to {first:?}, abandoning");
                    return self.clone();
                }
            }
        }

        if acc.path_closes(first) {
            acc = acc.update_path(first, |p| p.clone().with_cycle(true));
        }
        acc
    }

    /// The path ends where it starts, on the same node and the same anchor.
    fn path_closes(&self, id: PathId) -> bool {
        let Some(path) = self.paths.get(&id) else {
            return false;
        };
        let first = path.first_edge().and_then(|e| self.edges.get(&e));
        let last = path.last_edge().and_then(|e| self.edges.get(&e));
        match (first, last) {
            (Some(first), Some(last)) => {
                first.source == last.target && first.source_anchor == last.target_anchor
            }
            _ => false,
        }
    }

    /// Merge every entity of `other` into this graph.
    ///
    /// Ids of `other` that are already taken here are remapped to fresh ids,
    /// one counter increment per remapped id, and all references (edge
    /// endpoints, owning paths, path edge lists) are rewritten. Other ids
    /// are kept as they are.
    #[must_use]
    pub fn insert_graph(&self, other: &Graph) -> Graph {
        let mut g = self.clone();
        g.fresh = self.fresh.max(other.fresh);

        let mut node_map: HashMap<NodeId, NodeId> = HashMap::new();
        for &id in other.nodes.keys() {
            if self.nodes.contains_key(&id) {
                node_map.insert(id, g.fresh.take_node());
            }
        }
        let mut edge_map: HashMap<EdgeId, EdgeId> = HashMap::new();
        for &id in other.edges.keys() {
            if self.edges.contains_key(&id) {
                edge_map.insert(id, g.fresh.take_edge());
            }
        }
        let mut path_map: HashMap<PathId, PathId> = HashMap::new();
        for &id in other.paths.keys() {
            if self.paths.contains_key(&id) {
                path_map.insert(id, g.fresh.take_path());
            }
        }

        let node_id = |id: NodeId| node_map.get(&id).copied().unwrap_or(id);
        let edge_id = |id: EdgeId| edge_map.get(&id).copied().unwrap_or(id);
        let path_id = |id: PathId| path_map.get(&id).copied().unwrap_or(id);

        for node in other.nodes.values() {
            let id = node_id(node.id);
            let value = if id == node.id {
                Arc::clone(node)
            } else {
                Arc::new(node.as_ref().clone().with_id(id))
            };
            g.nodes.insert(id, value);
        }

        for edge in other.edges.values() {
            let (id, source, target, path) = (
                edge_id(edge.id),
                node_id(edge.source),
                node_id(edge.target),
                path_id(edge.path),
            );
            let unchanged =
                id == edge.id && source == edge.source && target == edge.target && path == edge.path;
            let value = if unchanged {
                Arc::clone(edge)
            } else {
                let mut remapped = edge.as_ref().clone();
                remapped.id = id;
                remapped.source = source;
                remapped.target = target;
                remapped.path = path;
                Arc::new(remapped)
            };
            g.edges.insert(id, value);
        }

        for path in other.paths.values() {
            let id = path_id(path.id);
            let unchanged = id == path.id && path.edges.iter().all(|&e| edge_id(e) == e);
            let value = if unchanged {
                Arc::clone(path)
            } else {
                Arc::new(PathData {
                    id,
                    edges: path.edges.iter().map(|&e| edge_id(e)).collect(),
                    is_cycle: path.is_cycle,
                })
            };
            g.paths.insert(id, value);
        }
        g
    }

    /// Share structurally equal entities with `other`.
    ///
    /// For every id present in both graphs whose values are equal, this
    /// graph takes `other`'s `Arc`. Used after a reparse so consumers
    /// comparing by pointer only see entities that really changed.
    #[must_use]
    pub fn inherit_data_from(&self, other: &Graph) -> Graph {
        let mut g = self.clone();
        let spliced = splice_by_equality(&mut g.nodes, &other.nodes)
            + splice_by_equality(&mut g.edges, &other.edges)
            + splice_by_equality(&mut g.paths, &other.paths);
        log::trace!("inherit: reused {spliced} entities");
        g
    }

    /// The picture as TikZ source.
    pub fn tikz(&self) -> String {
        crate::emitter::emit_graph(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Nodes 0..=n on a line and one path through them.
    fn chain(n: u32) -> Graph {
        let mut g = Graph::new();
        for i in 0..=n {
            g.insert_node(NodeData::new(NodeId(i)).with_coord(Coord::new(f64::from(i), 0.0)));
        }
        let path = g.take_path_id();
        let mut edges = Vec::new();
        for i in 0..n {
            let id = g.take_edge_id();
            g.insert_edge(EdgeData::new(id, NodeId(i), NodeId(i + 1), path));
            edges.push(id);
        }
        g.insert_path(PathData::new(path, edges));
        g
    }

    fn edge_lists(g: &Graph) -> Vec<Vec<u32>> {
        g.paths()
            .map(|p| p.edges.iter().map(|e| e.get()).collect())
            .collect()
    }

    #[test]
    fn removing_a_middle_edge_splits_the_path() {
        let g = chain(3);
        let g2 = g.remove_edges([EdgeId(1)]);
        assert_eq!(g2.edge_count(), 2);
        assert_eq!(edge_lists(&g2), vec![vec![0], vec![2]]);
        assert_eq!(g2.edge(EdgeId(0)).unwrap().path, PathId(0));
        assert_eq!(g2.edge(EdgeId(2)).unwrap().path, PathId(1));
        g2.validate().unwrap();
        // Original snapshot untouched.
        assert_eq!(edge_lists(&g), vec![vec![0, 1, 2]]);
    }

    #[test]
    fn removing_every_edge_drops_the_path() {
        let g = chain(2).remove_edges([EdgeId(0), EdgeId(1)]);
        assert_eq!(g.path_count(), 0);
        assert_eq!(g.node_count(), 3);
        g.validate().unwrap();
    }

    #[test]
    fn removing_a_node_cascades_to_its_edges() {
        let g = chain(3).remove_nodes([NodeId(2)]);
        assert_eq!(g.node_count(), 3);
        assert_eq!(edge_lists(&g), vec![vec![0]]);
        assert!(g.edge(EdgeId(1)).is_none());
        assert!(g.edge(EdgeId(2)).is_none());
        g.validate().unwrap();
    }

    #[test]
    fn untouched_entities_are_shared() {
        let g = chain(3);
        let g2 = g.update_node(NodeId(1), |n| n.clone().with_label("moved"));
        assert!(Arc::ptr_eq(g.node(NodeId(0)).unwrap(), g2.node(NodeId(0)).unwrap()));
        assert!(!Arc::ptr_eq(g.node(NodeId(1)).unwrap(), g2.node(NodeId(1)).unwrap()));
        assert!(Arc::ptr_eq(g.edge(EdgeId(2)).unwrap(), g2.edge(EdgeId(2)).unwrap()));
        assert_eq!(g.node(NodeId(1)).unwrap().label, "");
    }

    #[test]
    fn update_of_missing_id_is_a_no_op() {
        let g = chain(1);
        let g2 = g.update_edge(EdgeId(42), |e| e.clone().with_data(Data::new().with_atom("x")));
        assert_eq!(g2.edge_count(), 1);
        assert!(Arc::ptr_eq(g.edge(EdgeId(0)).unwrap(), g2.edge(EdgeId(0)).unwrap()));
    }

    #[test]
    fn fresh_ids_survive_deleting_the_maximum() {
        let g = chain(2);
        assert_eq!(g.fresh_node_id(), NodeId(3));
        let g2 = g.remove_nodes([NodeId(2)]);
        assert_eq!(g2.fresh_node_id(), NodeId(3));
        assert_eq!(g2.fresh_edge_id(), EdgeId(2));
    }

    #[test]
    fn reverse_path_flips_order_and_direction() {
        let g = chain(2).reverse_path(PathId(0));
        assert_eq!(edge_lists(&g), vec![vec![1, 0]]);
        assert_eq!(g.path_source(PathId(0)), Some(NodeId(2)));
        assert_eq!(g.path_target(PathId(0)), Some(NodeId(0)));
        g.validate().unwrap();
    }

    #[test]
    fn split_then_join_restores_the_path() {
        let g = chain(3);
        let split = g.split_path(PathId(0));
        assert_eq!(edge_lists(&split), vec![vec![0], vec![1], vec![2]]);
        split.validate().unwrap();

        let ids: Vec<PathId> = split.paths().map(|p| p.id).collect();
        let joined = split.join_paths(&ids);
        assert_eq!(edge_lists(&joined), vec![vec![0, 1, 2]]);
        assert!(!joined.path(PathId(0)).unwrap().is_cycle);
        joined.validate().unwrap();
    }

    #[test]
    fn join_reverses_when_paths_face_each_other() {
        // 0 -> 1 and 2 -> 1 share their targets.
        let mut g = Graph::new();
        for i in 0..3 {
            g.insert_node(NodeData::new(NodeId(i)));
        }
        g.insert_edge(EdgeData::new(EdgeId(0), NodeId(0), NodeId(1), PathId(0)));
        g.insert_path(PathData::new(PathId(0), [EdgeId(0)]));
        g.insert_edge(EdgeData::new(EdgeId(1), NodeId(2), NodeId(1), PathId(1)));
        g.insert_path(PathData::new(PathId(1), [EdgeId(1)]));

        let joined = g.join_two_paths(PathId(0), PathId(1)).expect("joinable");
        assert_eq!(edge_lists(&joined), vec![vec![0, 1]]);
        let flipped = joined.edge(EdgeId(1)).unwrap();
        assert_eq!((flipped.source, flipped.target), (NodeId(1), NodeId(2)));
        assert_eq!(flipped.path, PathId(0));
        joined.validate().unwrap();
    }

    #[test]
    fn join_closes_a_cycle_only_on_matching_anchors() {
        let mut g = Graph::new();
        for i in 0..2 {
            g.insert_node(NodeData::new(NodeId(i)));
        }
        g.insert_edge(EdgeData::new(EdgeId(0), NodeId(0), NodeId(1), PathId(0)));
        g.insert_path(PathData::new(PathId(0), [EdgeId(0)]));
        g.insert_edge(
            EdgeData::new(EdgeId(1), NodeId(1), NodeId(0), PathId(1))
                .with_target(NodeId(0), Some("north".to_string())),
        );
        g.insert_path(PathData::new(PathId(1), [EdgeId(1)]));

        let joined = g.join_paths(&[PathId(0), PathId(1)]);
        let path = joined.path(PathId(0)).unwrap();
        assert_eq!(path.edges.as_slice(), &[EdgeId(0), EdgeId(1)]);
        assert!(!path.is_cycle);
        let text = joined.tikz();
        assert!(text.contains("\\draw (0) to (1) to (0.north);"));
        let reparsed = crate::parser::parse_picture(&text).unwrap();
        let last = reparsed.edge(EdgeId(1)).unwrap();
        assert_eq!(last.target_anchor.as_deref(), Some("north"));

        let plain = g.update_edge(EdgeId(1), |e| e.clone().with_target(NodeId(0), None));
        let closed = plain.join_paths(&[PathId(0), PathId(1)]);
        assert!(closed.path(PathId(0)).unwrap().is_cycle);
        closed.validate().unwrap();
    }

    #[test]
    fn disjoint_paths_are_not_joinable() {
        let mut g = chain(1);
        g.insert_node(NodeData::new(NodeId(5)));
        g.insert_node(NodeData::new(NodeId(6)));
        g.insert_edge(EdgeData::new(EdgeId(9), NodeId(5), NodeId(6), PathId(3)));
        g.insert_path(PathData::new(PathId(3), [EdgeId(9)]));

        assert!(g.join_two_paths(PathId(0), PathId(3)).is_none());
        assert!(g.join_two_paths(PathId(0), PathId(0)).is_none());
        let unchanged = g.join_paths(&[PathId(0), PathId(3)]);
        assert_eq!(unchanged.path_count(), 2);
        assert!(Arc::ptr_eq(g.path(PathId(0)).unwrap(), unchanged.path(PathId(0)).unwrap()));
    }

    #[test]
    fn insert_graph_remaps_colliding_ids() {
        let g = chain(1);
        let other = chain(1);
        let merged = g.insert_graph(&other);
        assert_eq!(merged.node_count(), 4);
        assert_eq!(merged.edge_count(), 2);
        assert_eq!(merged.path_count(), 2);
        merged.validate().unwrap();

        let copy = merged.path(PathId(1)).unwrap();
        let edge = merged.edge(copy.edges[0]).unwrap();
        assert_eq!(edge.id, EdgeId(1));
        assert_eq!((edge.source, edge.target), (NodeId(2), NodeId(3)));
        assert_eq!(edge.path, PathId(1));
        assert_eq!(merged.fresh_node_id(), NodeId(4));
    }

    #[test]
    fn insert_graph_keeps_free_ids() {
        let g = chain(1);
        let mut other = Graph::new();
        other.insert_node(NodeData::new(NodeId(7)).with_label("seven"));
        let merged = g.insert_graph(&other);
        assert_eq!(merged.node(NodeId(7)).unwrap().label, "seven");
        assert!(Arc::ptr_eq(merged.node(NodeId(7)).unwrap(), other.node(NodeId(7)).unwrap()));
    }

    #[test]
    fn subgraph_keeps_internal_edges_only() {
        let g = chain(3).subgraph_from_nodes([NodeId(0), NodeId(1), NodeId(3)]);
        assert_eq!(g.node_count(), 3);
        assert_eq!(edge_lists(&g), vec![vec![0]]);
        g.validate().unwrap();
    }

    #[test]
    fn translate_moves_only_selected_nodes() {
        let g = chain(1).translate_nodes([NodeId(1)], 0.5, -1.0);
        assert_eq!(g.node(NodeId(0)).unwrap().coord, Coord::new(0.0, 0.0));
        assert_eq!(g.node(NodeId(1)).unwrap().coord, Coord::new(1.5, -1.0));
    }

    #[test]
    fn inherit_reuses_equal_entities() {
        let old = chain(2);
        let new = chain(2).update_node(NodeId(1), |n| n.clone().with_label("x"));
        let inherited = new.inherit_data_from(&old);
        assert!(Arc::ptr_eq(inherited.node(NodeId(0)).unwrap(), old.node(NodeId(0)).unwrap()));
        assert!(!Arc::ptr_eq(inherited.node(NodeId(1)).unwrap(), old.node(NodeId(1)).unwrap()));
        assert!(Arc::ptr_eq(inherited.path(PathId(0)).unwrap(), old.path(PathId(0)).unwrap()));
    }
}
