//! Structural properties of graph edits, checked exhaustively on small
//! pictures.

use std::collections::HashSet;
use tz_core::{EdgeId, Graph, NodeId, PathId, parse_picture};

/// A square drawn as one closed path, a two-edge tail, and a self-loop.
const PICTURE: &str = "\\begin{tikzpicture}
\\node (0) at (0, 0) {};
\\node (1) at (1, 0) {};
\\node (2) at (1, 1) {};
\\node (3) at (0, 1) {};
\\node (4) at (2, 2) {};
\\draw (0) to (1) to (2) to (3) to cycle;
\\draw (2) to [bend left] (4) to (1);
\\draw [loop] (4) to ();
\\end{tikzpicture}
";

fn picture() -> Graph {
    parse_picture(PICTURE).expect("fixture parses")
}

fn edge_ids(g: &Graph) -> Vec<EdgeId> {
    g.edges().map(|e| e.id).collect()
}

fn assert_paths_sound(g: &Graph, removed: &HashSet<EdgeId>) {
    g.validate()
        .unwrap_or_else(|e| panic!("invalid graph after removing {removed:?}: {e}"));
    for path in g.paths() {
        assert!(!path.edges.is_empty());
        assert!(path.edges.iter().all(|e| !removed.contains(e)));
    }
    let owned: usize = g.paths().map(|p| p.edges.len()).sum();
    assert_eq!(owned, g.edge_count());
}

#[test]
fn example_three_edge_path_split_by_removal() {
    let src = "\\begin{tikzpicture}
\\node (0) at (0, 0) {};
\\node (1) at (1, 0) {};
\\node (2) at (2, 0) {};
\\node (3) at (3, 0) {};
\\draw (0) to (1) to (2) to (3);
\\end{tikzpicture}
";
    let g = parse_picture(src).unwrap().remove_edges([EdgeId(1)]);
    assert_eq!(g.edge_count(), 2);
    let lists: Vec<Vec<EdgeId>> = g.paths().map(|p| p.edges.to_vec()).collect();
    assert_eq!(lists, vec![vec![EdgeId(0)], vec![EdgeId(2)]]);
}

#[test]
fn path_repair_is_total_over_every_edge_subset() {
    let g = picture();
    let all = edge_ids(&g);
    assert_eq!(all.len(), 7);

    for mask in 0u32..(1 << all.len()) {
        let removed: HashSet<EdgeId> = all
            .iter()
            .enumerate()
            .filter(|(i, _)| mask & (1 << i) != 0)
            .map(|(_, e)| *e)
            .collect();
        let after = g.remove_edges(removed.iter().copied());
        assert_eq!(after.edge_count(), all.len() - removed.len());
        assert_paths_sound(&after, &removed);
    }
}

#[test]
fn node_removal_cascades_to_incident_edges() {
    let g = picture();
    for node in g.nodes().map(|n| n.id).collect::<Vec<_>>() {
        let after = g.remove_nodes([node]);
        assert!(after.node(node).is_none());
        assert!(after.edges().all(|e| e.source != node && e.target != node));
        let removed: HashSet<EdgeId> = g
            .edges_of_node(node)
            .map(|e| e.id)
            .collect();
        assert_eq!(after.edge_count(), g.edge_count() - removed.len());
        for edge in g.edges().filter(|e| !removed.contains(&e.id)) {
            assert!(after.edge(edge.id).is_some(), "{:?} was not incident", edge.id);
        }
        assert_paths_sound(&after, &removed);
    }
}

#[test]
fn split_then_join_reconstructs_every_path() {
    let g = picture();
    for original in g.paths() {
        let split = g.split_path(original.id);
        split.validate().unwrap();

        let start = split
            .paths()
            .position(|p| p.id == original.id)
            .expect("first piece keeps the id");
        let pieces: Vec<PathId> = split
            .paths()
            .skip(start)
            .take(original.edges.len())
            .map(|p| p.id)
            .collect();
        assert_eq!(pieces.len(), original.edges.len());

        let joined = split.join_paths(&pieces);
        let rebuilt = joined.path(original.id).unwrap();
        assert_eq!(rebuilt.edges, original.edges);
        assert_eq!(rebuilt.is_cycle, original.is_cycle);
        assert_eq!(joined.path_count(), g.path_count());
        joined.validate().unwrap();
    }
}

#[test]
fn join_paths_in_any_order() {
    let g = picture().split_path(PathId(0));
    let ids: Vec<PathId> = g.paths().map(|p| p.id).collect();
    // The square's pieces, first piece first, the rest in reverse order:
    // each later piece is prepended until the last one closes the loop.
    let square = [ids[0], ids[3], ids[2], ids[1]];
    let joined = g.join_paths(&square);
    let path = joined.path(PathId(0)).unwrap();
    assert_eq!(
        path.edges.as_slice(),
        &[EdgeId(2), EdgeId(3), EdgeId(0), EdgeId(1)]
    );
    assert!(path.is_cycle);
    assert_eq!(joined.path_count(), 3);
    joined.validate().unwrap();
}

#[test]
fn fresh_ids_never_reuse_deleted_ids() {
    let mut g = picture();
    let mut seen_nodes: HashSet<NodeId> = g.nodes().map(|n| n.id).collect();
    let mut seen_edges: HashSet<EdgeId> = g.edges().map(|e| e.id).collect();
    let mut seen_paths: HashSet<PathId> = g.paths().map(|p| p.id).collect();

    let steps: Vec<Box<dyn Fn(&Graph) -> Graph>> = vec![
        Box::new(|g: &Graph| g.remove_nodes([NodeId(4)])),
        Box::new(|g: &Graph| g.remove_edges([EdgeId(1)])),
        Box::new(|g: &Graph| g.split_path(PathId(0))),
        Box::new(|g: &Graph| g.insert_graph(g)),
        Box::new(|g: &Graph| g.remove_nodes(g.nodes().map(|n| n.id).collect::<Vec<_>>())),
    ];

    for step in steps {
        let before = g.fresh_ids();
        g = step(&g);
        let after = g.fresh_ids();
        assert!(after.node >= before.node);
        assert!(after.edge >= before.edge);
        assert!(after.path >= before.path);

        for node in g.nodes() {
            assert!(node.id.get() < after.node);
        }
        for edge in g.edges() {
            assert!(edge.id.get() < after.edge);
        }
        for path in g.paths() {
            assert!(path.id.get() < after.path);
        }
        for id in g.nodes().map(|n| n.id) {
            seen_nodes.insert(id);
        }
        for id in g.edges().map(|e| e.id) {
            seen_edges.insert(id);
        }
        for id in g.paths().map(|p| p.id) {
            seen_paths.insert(id);
        }
        assert!(seen_nodes.iter().all(|id| id.get() < after.node));
        assert!(seen_edges.iter().all(|id| id.get() < after.edge));
        assert!(seen_paths.iter().all(|id| id.get() < after.path));
    }
    assert!(g.is_empty());
}

#[test]
fn reversing_twice_is_identity() {
    let g = picture();
    for path in g.paths() {
        let twice = g.reverse_path(path.id).reverse_path(path.id);
        assert_eq!(twice.tikz(), g.tikz());
    }
}
