//! Errors: located parse failures and broken graph invariants.

use crate::id::{EdgeId, NodeId, PathId};
use thiserror::Error;

/// Which stage rejected the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// A character sequence that forms no token.
    Lex,
    /// Tokens in an order the grammar does not allow.
    Syntax,
    /// Well-formed text with a meaning error: an unknown node reference,
    /// a duplicate name, a misplaced `cycle`.
    Semantic,
}

/// A located parse failure. Line and column are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{line}:{column}: {message}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub line: usize,
    pub column: usize,
    pub message: String,
}

impl ParseError {
    pub fn new(
        kind: ParseErrorKind,
        (line, column): (usize, usize),
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            line,
            column,
            message: message.into(),
        }
    }

    pub fn lex(pos: (usize, usize), message: impl Into<String>) -> Self {
        Self::new(ParseErrorKind::Lex, pos, message)
    }

    pub fn syntax(pos: (usize, usize), message: impl Into<String>) -> Self {
        Self::new(ParseErrorKind::Syntax, pos, message)
    }

    pub fn semantic(pos: (usize, usize), message: impl Into<String>) -> Self {
        Self::new(ParseErrorKind::Semantic, pos, message)
    }
}

/// A broken structural invariant found by `Graph::validate`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("path {0} has no edges")]
    EmptyPath(PathId),
    #[error("path {path} lists missing edge {edge}")]
    DanglingEdge { path: PathId, edge: EdgeId },
    #[error("path {path} is broken before edge {edge}")]
    Discontiguous { path: PathId, edge: EdgeId },
    #[error("path {0} is marked as a cycle but does not close")]
    OpenCycle(PathId),
    #[error("edge {edge} belongs to {owners} paths")]
    Ownership { edge: EdgeId, owners: usize },
    #[error("edge {edge} names path {path} as owner, which does not list it")]
    OwnerMismatch { edge: EdgeId, path: PathId },
    #[error("edge {edge} references missing node {node}")]
    MissingNode { edge: EdgeId, node: NodeId },
}

/// Map a byte offset to a 1-based `(line, column)`, counting columns in
/// characters.
pub fn line_col(source: &str, offset: usize) -> (usize, usize) {
    let offset = offset.min(source.len());
    let before = &source[..offset];
    let line = before.matches('\n').count() + 1;
    let line_start = before.rfind('\n').map_or(0, |i| i + 1);
    let column = before[line_start..].chars().count() + 1;
    (line, column)
}
