//! Emitter: Graph / Styles → TikZ text.
//!
//! Produces the canonical layout that round-trips through the parser.

use crate::format::FormatConfig;
use crate::graph::Graph;
use crate::id::{EdgeId, NodeId};
use crate::model::{Data, EdgeData, NodeData, PathData};
use crate::styles::Styles;
use std::fmt::Write;

/// Emit a picture in canonical layout.
#[must_use]
pub fn emit_graph(graph: &Graph) -> String {
    emit_graph_with(graph, &FormatConfig::default())
}

#[must_use]
pub fn emit_graph_with(graph: &Graph, config: &FormatConfig) -> String {
    let mut emitter = Emitter::new(config, Target::None);
    emitter.picture(graph);
    emitter.out
}

/// Emit a picture and report where one entity's property list ends.
///
/// The position is the 0-based `(line, column)` just after the `[...]` of
/// the node or edge, or just after `\node` / `\draw` / `to` when it has no
/// properties. A node match takes precedence over an edge match. `None` if
/// neither id is in the graph.
pub fn emit_graph_with_position(
    graph: &Graph,
    node: Option<NodeId>,
    edge: Option<EdgeId>,
) -> (String, Option<(usize, usize)>) {
    let target = match (node, edge) {
        (Some(n), _) if graph.node(n).is_some() => Target::Node(n),
        (_, Some(e)) if graph.edge(e).is_some() => Target::Edge(e),
        _ => Target::None,
    };
    let config = FormatConfig::default();
    let mut emitter = Emitter::new(&config, target);
    emitter.picture(graph);
    (emitter.out, emitter.mark)
}

/// Emit `\tikzstyle{name}=[...]` lines in declaration order.
#[must_use]
pub fn emit_styles(styles: &Styles) -> String {
    let mut out = String::with_capacity(64 * styles.len());
    for style in styles.iter() {
        let _ = write!(out, "\\tikzstyle{{{}}}=", style.name);
        if style.data.is_empty() {
            out.push_str("[]");
        } else {
            let _ = write!(out, "{}", style.data);
        }
        out.push('\n');
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    None,
    Node(NodeId),
    Edge(EdgeId),
}

struct Emitter<'c> {
    out: String,
    config: &'c FormatConfig,
    target: Target,
    mark: Option<(usize, usize)>,
}

impl<'c> Emitter<'c> {
    fn new(config: &'c FormatConfig, target: Target) -> Self {
        Self {
            out: String::with_capacity(1024),
            config,
            target,
            mark: None,
        }
    }

    fn indent(&mut self, depth: usize) {
        self.config.indent.write(&mut self.out, depth);
    }

    /// Record the current position if `here` is the entity being looked for.
    fn mark_if(&mut self, here: Target) {
        if here != Target::None && here == self.target && self.mark.is_none() {
            let line = self.out.matches('\n').count();
            let line_start = self.out.rfind('\n').map_or(0, |i| i + 1);
            let column = self.out[line_start..].chars().count();
            self.mark = Some((line, column));
        }
    }

    /// ` [k=v, ...]`, or nothing for an empty bag.
    fn properties(&mut self, data: &Data) {
        if !data.is_empty() {
            let _ = write!(self.out, " {data}");
        }
    }

    fn picture(&mut self, graph: &Graph) {
        self.out.push_str("\\begin{tikzpicture}");
        let _ = writeln!(self.out, "{}", graph.data());

        if let Some(bbox) = graph.bounding_box() {
            self.indent(1);
            let _ = writeln!(
                self.out,
                "\\path [use as bounding box] {} rectangle {};",
                bbox.from, bbox.to
            );
        }

        let depth = if self.config.layers { 2 } else { 1 };
        if graph.node_count() > 0 {
            self.begin_layer("nodelayer");
            for node in graph.nodes() {
                self.node(node, depth);
            }
            self.end_layer();
        }
        if graph.path_count() > 0 {
            self.begin_layer("edgelayer");
            for path in graph.paths() {
                self.path(graph, path, depth);
            }
            self.end_layer();
        }

        self.out.push_str("\\end{tikzpicture}\n");
    }

    fn begin_layer(&mut self, name: &str) {
        if self.config.layers {
            self.indent(1);
            let _ = writeln!(self.out, "\\begin{{pgfonlayer}}{{{name}}}");
        }
    }

    fn end_layer(&mut self) {
        if self.config.layers {
            self.indent(1);
            self.out.push_str("\\end{pgfonlayer}\n");
        }
    }

    fn node(&mut self, node: &NodeData, depth: usize) {
        self.indent(depth);
        self.out.push_str("\\node");
        self.properties(&node.data);
        self.mark_if(Target::Node(node.id));
        let _ = writeln!(
            self.out,
            " ({}) at {} {{{}}};",
            node.id, node.coord, node.label
        );
    }

    fn path(&mut self, graph: &Graph, path: &PathData, depth: usize) {
        let edges: Vec<&EdgeData> = graph.path_edges(path.id).map(|e| e.as_ref()).collect();
        let Some(first) = edges.first() else {
            return;
        };

        self.indent(depth);
        self.out.push_str("\\draw");
        self.properties(&first.data);
        self.mark_if(Target::Edge(first.id));
        let _ = write!(
            self.out,
            " {}",
            endpoint(first.source, first.source_anchor.as_deref())
        );

        let last = edges.len() - 1;
        for (i, edge) in edges.iter().enumerate() {
            self.out.push_str(" to");
            if i > 0 {
                self.properties(&edge.data);
                self.mark_if(Target::Edge(edge.id));
            }
            if let Some(label) = &edge.label {
                self.out.push_str(" node");
                self.properties(&label.data);
                let _ = write!(self.out, " {{{}}}", label.label);
            }
            if path.is_cycle && i == last {
                self.out.push_str(" cycle");
            } else if edge.loop_shorthand && edge.is_self_loop() && edge.target_anchor.is_none() {
                self.out.push_str(" ()");
            } else {
                let _ = write!(
                    self.out,
                    " {}",
                    endpoint(edge.target, edge.target_anchor.as_deref())
                );
            }
        }
        self.out.push_str(";\n");
    }
}

/// `(id)` or `(id.anchor)`.
fn endpoint(node: NodeId, anchor: Option<&str>) -> String {
    match anchor {
        Some(anchor) => format!("({node}.{anchor})"),
        None => format!("({node})"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::BoundingBox;
    use crate::id::PathId;
    use crate::model::{Coord, EdgeLabel};
    use crate::parser::parse_picture;
    use pretty_assertions::assert_eq;

    fn two_nodes() -> Graph {
        let mut g = Graph::new();
        g.insert_node(
            NodeData::new(NodeId(0))
                .with_data(Data::new().with_property("style", "red"))
                .with_label("$a$"),
        );
        g.insert_node(NodeData::new(NodeId(1)).with_coord(Coord::new(1.5, -1.0)));
        g
    }

    #[test]
    fn empty_picture() {
        assert_eq!(
            emit_graph(&Graph::new()),
            "\\begin{tikzpicture}\n\\end{tikzpicture}\n"
        );
    }

    #[test]
    fn nodes_only_skip_the_edge_layer() {
        assert_eq!(
            emit_graph(&two_nodes()),
            "\\begin{tikzpicture}\n\t\\begin{pgfonlayer}{nodelayer}\n\t\t\\node [style=red] (0) at (0, 0) {$a$};\n\t\t\\node (1) at (1.5, -1) {};\n\t\\end{pgfonlayer}\n\\end{tikzpicture}\n"
        );
    }

    #[test]
    fn edges_labels_loops_and_cycles() {
        let mut g = two_nodes()
            .with_data(Data::new().with_property("scale", "2"))
            .with_bounding_box(Some(BoundingBox {
                from: Coord::new(-1.0, -1.0),
                to: Coord::new(2.0, 1.0),
            }));
        g.insert_edge(
            EdgeData::new(EdgeId(0), NodeId(0), NodeId(1), PathId(0))
                .with_source(NodeId(0), Some("north".into()))
                .with_data(Data::new().with_atom("->"))
                .with_label(Some(EdgeLabel::new("f").with_data(Data::new().with_atom("above")))),
        );
        g.insert_edge(
            EdgeData::new(EdgeId(1), NodeId(1), NodeId(0), PathId(0))
                .with_target(NodeId(0), Some("north".into()))
                .with_data(Data::new().with_atom("bend left")),
        );
        g.insert_path(PathData::new(PathId(0), [EdgeId(0), EdgeId(1)]).with_cycle(true));
        g.insert_edge(
            EdgeData::new(EdgeId(2), NodeId(1), NodeId(1), PathId(1)).with_loop_shorthand(true),
        );
        g.insert_path(PathData::new(PathId(1), [EdgeId(2)]));
        g.insert_edge(EdgeData::new(EdgeId(3), NodeId(0), NodeId(0), PathId(2)));
        g.insert_path(PathData::new(PathId(2), [EdgeId(3)]));

        let expected = "\\begin{tikzpicture}[scale=2]\n\t\\path [use as bounding box] (-1, -1) rectangle (2, 1);\n\t\\begin{pgfonlayer}{nodelayer}\n\t\t\\node [style=red] (0) at (0, 0) {$a$};\n\t\t\\node (1) at (1.5, -1) {};\n\t\\end{pgfonlayer}\n\t\\begin{pgfonlayer}{edgelayer}\n\t\t\\draw [->] (0.north) to node [above] {f} (1) to [bend left] cycle;\n\t\t\\draw (1) to ();\n\t\t\\draw (0) to (0);\n\t\\end{pgfonlayer}\n\\end{tikzpicture}\n";
        assert_eq!(g.tikz(), expected);

        let reparsed = parse_picture(expected).unwrap();
        assert_eq!(reparsed.tikz(), expected);
    }

    #[test]
    fn position_after_properties_or_keyword() {
        let src = "\\begin{tikzpicture}\n\t\\begin{pgfonlayer}{nodelayer}\n\t\t\\node [style=red] (0) at (0, 0) {};\n\t\t\\node (1) at (1, 0) {};\n\t\\end{pgfonlayer}\n\t\\begin{pgfonlayer}{edgelayer}\n\t\t\\draw [bend left] (0) to (1) to [bend right] (0);\n\t\\end{pgfonlayer}\n\\end{tikzpicture}\n";
        let g = parse_picture(src).unwrap();

        let (text, pos) = emit_graph_with_position(&g, Some(NodeId(0)), None);
        assert_eq!(text, src);
        assert_eq!(pos, Some((2, 19)));

        let (_, pos) = emit_graph_with_position(&g, Some(NodeId(1)), None);
        assert_eq!(pos, Some((3, 7)));

        let (_, pos) = emit_graph_with_position(&g, None, Some(EdgeId(0)));
        assert_eq!(pos, Some((6, 19)));

        let (_, pos) = emit_graph_with_position(&g, None, Some(EdgeId(1)));
        assert_eq!(pos, Some((6, 46)));

        let (_, pos) = emit_graph_with_position(&g, Some(NodeId(9)), None);
        assert_eq!(pos, None);
    }

    #[test]
    fn styles_one_per_line() {
        let styles = Styles::new()
            .add_style(
                crate::model::StyleData::new("red node")
                    .with_data(Data::new().with_property("fill", "red")),
            )
            .add_style(crate::model::StyleData::new("plain"));
        assert_eq!(
            emit_styles(&styles),
            "\\tikzstyle{red node}=[fill=red]\n\\tikzstyle{plain}=[]\n"
        );
    }
}
