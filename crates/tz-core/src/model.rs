//! Immutable value types of a TikZ document.
//!
//! Entities are plain values. Editing one means building a modified copy
//! with the `with_*` methods; the `Graph` then swaps the new value in and
//! keeps sharing every untouched one.

use crate::id::{EdgeId, NodeId, PathId};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

// ─── Coordinates ─────────────────────────────────────────────────────────

/// A point in picture coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Coord {
    pub x: f64,
    pub y: f64,
}

impl Coord {
    pub const ZERO: Coord = Coord { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[must_use]
    pub fn translate(self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", format_num(self.x), format_num(self.y))
    }
}

/// Render a number the way it is written in source: no trailing zeros,
/// integers without a decimal point, never `-0`.
pub fn format_num(n: f64) -> String {
    if n == 0.0 {
        return "0".to_string();
    }
    if n == n.trunc() && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

// ─── Property bag ────────────────────────────────────────────────────────

/// Ordered `key[=value]` list as written between square brackets.
///
/// `None` marks an atom (`[thick]`), `Some` a keyed entry (`[style=red]`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Data(IndexMap<String, Option<String>>);

impl PartialEq for Data {
    fn eq(&self, other: &Self) -> bool {
        self.0.len() == other.0.len() && self.0.iter().eq(other.0.iter())
    }
}

impl Eq for Data {}

impl Data {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if `key` is present, as an atom or keyed.
    pub fn has(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn is_atom(&self, key: &str) -> bool {
        matches!(self.0.get(key), Some(None))
    }

    /// Value of a keyed entry. Atoms and absent keys give `None`.
    pub fn property(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.as_deref())
    }

    /// Raw entry: `None` if absent, `Some(None)` for an atom.
    pub fn get(&self, key: &str) -> Option<Option<&str>> {
        self.0.get(key).map(|v| v.as_deref())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_deref()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Add or replace an atom. Replacing keeps the key's position.
    pub fn set_atom(&mut self, key: impl Into<String>) {
        self.0.insert(key.into(), None);
    }

    /// Add or replace a keyed entry. Replacing keeps the key's position.
    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), Some(value.into()));
    }

    pub fn unset(&mut self, key: &str) {
        self.0.shift_remove(key);
    }

    #[must_use]
    pub fn with_atom(mut self, key: impl Into<String>) -> Self {
        self.set_atom(key);
        self
    }

    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_property(key, value);
        self
    }

    #[must_use]
    pub fn without(mut self, key: &str) -> Self {
        self.unset(key);
        self
    }

    /// Append every entry of `other`, replacing keys already present.
    pub fn extend(&mut self, other: Data) {
        self.0.extend(other.0);
    }

    /// Exchange the names of two keys in place, keeping entry order.
    #[must_use]
    pub fn swap_keys(&self, a: &str, b: &str) -> Data {
        if !self.has(a) && !self.has(b) {
            return self.clone();
        }
        let swapped = self
            .0
            .iter()
            .map(|(k, v)| {
                let key = if k == a {
                    b.to_string()
                } else if k == b {
                    a.to_string()
                } else {
                    k.clone()
                };
                (key, v.clone())
            })
            .collect();
        Data(swapped)
    }
}

impl FromIterator<(String, Option<String>)> for Data {
    fn from_iter<T: IntoIterator<Item = (String, Option<String>)>>(iter: T) -> Self {
        Data(iter.into_iter().collect())
    }
}

/// Characters allowed in an unbraced key or value, besides alphanumerics
/// and inner spaces.
const BARE_PUNCTUATION: &str = "-_.<>'|!+*/:;#()^&@\\";

/// True if `s` can be written between `[` `]` without braces.
pub fn is_bare_token(s: &str) -> bool {
    !s.is_empty()
        && s.trim() == s
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == ' ' || BARE_PUNCTUATION.contains(c))
}

fn write_token(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    if is_bare_token(s) {
        f.write_str(s)
    } else {
        write!(f, "{{{s}}}")
    }
}

impl fmt::Display for Data {
    /// `[k1=v1, k2]`, or nothing at all for an empty bag.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return Ok(());
        }
        f.write_str("[")?;
        for (i, (key, value)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write_token(f, key)?;
            if let Some(value) = value {
                f.write_str("=")?;
                write_token(f, value)?;
            }
        }
        f.write_str("]")
    }
}

// ─── Nodes ───────────────────────────────────────────────────────────────

/// `\node [data] (id) at (coord) {label};`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeData {
    pub id: NodeId,
    pub data: Data,
    pub coord: Coord,
    /// Label text without the outer braces.
    pub label: String,
}

impl NodeData {
    pub fn new(id: NodeId) -> Self {
        Self {
            id,
            data: Data::new(),
            coord: Coord::ZERO,
            label: String::new(),
        }
    }

    /// The `style=` value, or `none`.
    pub fn style_name(&self) -> &str {
        self.data.property("style").unwrap_or("none")
    }

    #[must_use]
    pub fn with_id(mut self, id: NodeId) -> Self {
        self.id = id;
        self
    }

    #[must_use]
    pub fn with_data(mut self, data: Data) -> Self {
        self.data = data;
        self
    }

    #[must_use]
    pub fn with_coord(mut self, coord: Coord) -> Self {
        self.coord = coord;
        self
    }

    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }
}

// ─── Edges ───────────────────────────────────────────────────────────────

/// A label drawn on an edge: `to node [data] {label} (target)`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EdgeLabel {
    pub data: Data,
    pub label: String,
}

impl EdgeLabel {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            data: Data::new(),
            label: label.into(),
        }
    }

    #[must_use]
    pub fn with_data(mut self, data: Data) -> Self {
        self.data = data;
        self
    }
}

/// Default angle for `bend left`/`bend right` given as atoms.
pub const DEFAULT_BEND: f64 = 30.0;

/// One `to` segment of a `\draw` statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeData {
    pub id: EdgeId,
    pub data: Data,
    pub source: NodeId,
    pub target: NodeId,
    /// Owning path.
    pub path: PathId,
    pub source_anchor: Option<String>,
    pub target_anchor: Option<String>,
    pub label: Option<EdgeLabel>,
    /// Written as `to ()`: a self-loop using the empty-target shorthand.
    #[serde(default)]
    pub loop_shorthand: bool,
}

impl EdgeData {
    pub fn new(id: EdgeId, source: NodeId, target: NodeId, path: PathId) -> Self {
        Self {
            id,
            data: Data::new(),
            source,
            target,
            path,
            source_anchor: None,
            target_anchor: None,
            label: None,
            loop_shorthand: false,
        }
    }

    pub fn style_name(&self) -> &str {
        self.data.property("style").unwrap_or("none")
    }

    pub fn is_self_loop(&self) -> bool {
        self.source == self.target
    }

    /// Signed bend angle: positive for `bend left`, negative for `bend right`.
    pub fn bend(&self) -> Option<f64> {
        let angle = |value: Option<&str>| {
            value
                .and_then(|v| v.trim().parse::<f64>().ok())
                .unwrap_or(DEFAULT_BEND)
        };
        if let Some(v) = self.data.get("bend left") {
            Some(angle(v))
        } else {
            self.data.get("bend right").map(|v| -angle(v))
        }
    }

    pub fn in_angle(&self) -> Option<f64> {
        self.data.property("in").and_then(|v| v.trim().parse().ok())
    }

    pub fn out_angle(&self) -> Option<f64> {
        self.data.property("out").and_then(|v| v.trim().parse().ok())
    }

    /// The same edge drawn in the opposite direction.
    ///
    /// Endpoints and anchors are swapped, and so are the `in`/`out` and
    /// `bend left`/`bend right` keys, so the curve keeps its shape.
    #[must_use]
    pub fn reversed(&self) -> Self {
        let data = self
            .data
            .swap_keys("in", "out")
            .swap_keys("bend left", "bend right");
        Self {
            data,
            source: self.target,
            target: self.source,
            source_anchor: self.target_anchor.clone(),
            target_anchor: self.source_anchor.clone(),
            ..self.clone()
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: EdgeId) -> Self {
        self.id = id;
        self
    }

    #[must_use]
    pub fn with_data(mut self, data: Data) -> Self {
        self.data = data;
        self
    }

    #[must_use]
    pub fn with_source(mut self, source: NodeId, anchor: Option<String>) -> Self {
        self.source = source;
        self.source_anchor = anchor;
        self
    }

    #[must_use]
    pub fn with_target(mut self, target: NodeId, anchor: Option<String>) -> Self {
        self.target = target;
        self.target_anchor = anchor;
        self
    }

    #[must_use]
    pub fn with_path(mut self, path: PathId) -> Self {
        self.path = path;
        self
    }

    #[must_use]
    pub fn with_label(mut self, label: Option<EdgeLabel>) -> Self {
        self.label = label;
        self
    }

    #[must_use]
    pub fn with_loop_shorthand(mut self, loop_shorthand: bool) -> Self {
        self.loop_shorthand = loop_shorthand;
        self
    }
}

// ─── Paths ───────────────────────────────────────────────────────────────

/// Edge ids of one path, in drawing order.
pub type EdgeList = SmallVec<[EdgeId; 4]>;

/// A contiguous chain of edges drawn by one `\draw` statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathData {
    pub id: PathId,
    pub edges: EdgeList,
    /// Set only when the statement ends in `to cycle`.
    pub is_cycle: bool,
}

impl PathData {
    pub fn new(id: PathId, edges: impl IntoIterator<Item = EdgeId>) -> Self {
        Self {
            id,
            edges: edges.into_iter().collect(),
            is_cycle: false,
        }
    }

    pub fn first_edge(&self) -> Option<EdgeId> {
        self.edges.first().copied()
    }

    pub fn last_edge(&self) -> Option<EdgeId> {
        self.edges.last().copied()
    }

    #[must_use]
    pub fn with_id(mut self, id: PathId) -> Self {
        self.id = id;
        self
    }

    #[must_use]
    pub fn with_edges(mut self, edges: impl IntoIterator<Item = EdgeId>) -> Self {
        self.edges = edges.into_iter().collect();
        self
    }

    #[must_use]
    pub fn with_cycle(mut self, is_cycle: bool) -> Self {
        self.is_cycle = is_cycle;
        self
    }
}

// ─── Styles ──────────────────────────────────────────────────────────────

/// Arrow tip drawn at one end of an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ArrowTip {
    #[default]
    None,
    Pointer,
    Flat,
}

/// Dash-pattern keys that mark a style as an edge style, with the
/// (tail, head) tips each one draws.
const ARROW_SPECS: [(&str, ArrowTip, ArrowTip); 9] = [
    ("-", ArrowTip::None, ArrowTip::None),
    ("->", ArrowTip::None, ArrowTip::Pointer),
    ("-|", ArrowTip::None, ArrowTip::Flat),
    ("<-", ArrowTip::Pointer, ArrowTip::None),
    ("<->", ArrowTip::Pointer, ArrowTip::Pointer),
    ("<-|", ArrowTip::Pointer, ArrowTip::Flat),
    ("|-", ArrowTip::Flat, ArrowTip::None),
    ("|->", ArrowTip::Flat, ArrowTip::Pointer),
    ("|-|", ArrowTip::Flat, ArrowTip::Flat),
];

/// `\tikzstyle{name}=[data]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleData {
    pub name: String,
    pub data: Data,
}

impl StyleData {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: Data::new(),
        }
    }

    #[must_use]
    pub fn with_data(mut self, data: Data) -> Self {
        self.data = data;
        self
    }

    fn arrow_spec(&self) -> Option<(ArrowTip, ArrowTip)> {
        ARROW_SPECS
            .iter()
            .find(|(key, _, _)| self.data.has(key))
            .map(|&(_, tail, head)| (tail, head))
    }

    /// Edge styles carry one of the dash-pattern keys (`-`, `->`, `<-|`, ...).
    pub fn is_edge_style(&self) -> bool {
        self.arrow_spec().is_some()
    }

    pub fn arrow_head(&self) -> ArrowTip {
        self.arrow_spec().map_or(ArrowTip::None, |(_, head)| head)
    }

    pub fn arrow_tail(&self) -> ArrowTip {
        self.arrow_spec().map_or(ArrowTip::None, |(tail, _)| tail)
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.data.property(key)
    }
}
