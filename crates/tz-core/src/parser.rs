//! Recursive-descent parser for pictures and style files.
//!
//! Grammar rules build entities directly: each rule fills a small typed
//! builder and hands the finished node, edge or style to the document
//! being assembled. Node references are resolved as they are read.
//!
//! Lexical, syntax and unresolved-reference errors abort immediately.
//! Duplicate style names are collected so one pass reports all of them.

use crate::error::{ParseError, line_col};
use crate::graph::{BoundingBox, Graph};
use crate::id::{NodeId, PathId};
use crate::lexer::{Token, TokenKind, tokenize};
use crate::model::{Coord, Data, EdgeData, EdgeLabel, NodeData, PathData, StyleData};
use crate::styles::Styles;
use std::collections::HashMap;

type PResult<T> = Result<T, ParseError>;

/// Parse a `tikzpicture` document into a graph.
pub fn parse_picture(source: &str) -> Result<Graph, Vec<ParseError>> {
    let result = Parser::new(source).and_then(|mut p| parse_picture_body(&mut p));
    match result {
        Ok(graph) => {
            log::debug!(
                "parsed picture: {} nodes, {} edges, {} paths",
                graph.node_count(),
                graph.edge_count(),
                graph.path_count()
            );
            Ok(graph)
        }
        Err(err) => {
            log::debug!("picture parse failed: {err}");
            Err(vec![err])
        }
    }
}

/// Parse a `.tikzstyles` document.
pub fn parse_styles(source: &str) -> Result<Styles, Vec<ParseError>> {
    let mut parser = Parser::new(source).map_err(|e| vec![e])?;
    let mut styles = Styles::new();
    let mut errors = Vec::new();

    if let Err(err) = parse_style_list(&mut parser, &mut styles, &mut errors) {
        errors.push(err);
    }
    if errors.is_empty() {
        log::debug!("parsed {} styles", styles.len());
        Ok(styles)
    } else {
        log::debug!("style parse failed with {} errors", errors.len());
        Err(errors)
    }
}

// ─── Token cursor ────────────────────────────────────────────────────────

struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Token<'a>>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> PResult<Self> {
        Ok(Self {
            source,
            tokens: tokenize(source)?,
            pos: 0,
        })
    }

    fn peek(&self) -> Option<Token<'a>> {
        self.tokens.get(self.pos).copied()
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.peek().is_some_and(|t| t.kind == kind)
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn bump(&mut self) -> Option<Token<'a>> {
        let token = self.peek()?;
        self.pos += 1;
        Some(token)
    }

    /// Consume the next token if it is `kind`.
    fn eat(&mut self, kind: TokenKind) -> Option<Token<'a>> {
        if self.at(kind) { self.bump() } else { None }
    }

    fn expect(&mut self, kind: TokenKind) -> PResult<Token<'a>> {
        self.eat(kind)
            .ok_or_else(|| self.unexpected(kind.describe()))
    }

    /// Consume a token of any of `kinds`, naming `what` on failure.
    fn expect_any(&mut self, kinds: &[TokenKind], what: &str) -> PResult<Token<'a>> {
        match self.peek() {
            Some(t) if kinds.contains(&t.kind) => {
                self.pos += 1;
                Ok(t)
            }
            _ => Err(self.unexpected(what)),
        }
    }

    /// Byte offset of the next token, or the end of the source.
    fn offset(&self) -> usize {
        self.peek().map_or(self.source.len(), |t| t.offset)
    }

    fn position(&self, offset: usize) -> (usize, usize) {
        line_col(self.source, offset)
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        let found = match self.peek() {
            // Punctuation and keywords already quote their text.
            Some(t) if t.kind.describe().starts_with('\'') => t.kind.describe().to_string(),
            Some(t) => format!("{} '{}'", t.kind.describe(), t.text),
            None => "end of input".to_string(),
        };
        ParseError::syntax(
            self.position(self.offset()),
            format!("expected {expected}, found {found}"),
        )
    }
}

/// Text of a key, value or label with the outer braces of a `{...}` token
/// removed.
fn unbrace<'a>(token: &Token<'a>) -> &'a str {
    if token.kind == TokenKind::Str {
        &token.text[1..token.text.len() - 1]
    } else {
        token.text
    }
}

// ─── Shared rules ────────────────────────────────────────────────────────

/// `"[" (property ("," property)* ","?)? "]"`, or nothing.
fn parse_properties(p: &mut Parser<'_>) -> PResult<Data> {
    let mut data = Data::new();
    if p.eat(TokenKind::LBracket).is_none() {
        return Ok(data);
    }
    loop {
        if p.eat(TokenKind::RBracket).is_some() {
            return Ok(data);
        }
        let key = p.expect_any(&[TokenKind::PropWord, TokenKind::Str], "a property")?;
        let key = unbrace(&key).to_string();
        if p.eat(TokenKind::Equals).is_some() {
            let value = p.expect_any(&[TokenKind::PropWord, TokenKind::Str], "a property value")?;
            data.set_property(key, unbrace(&value));
        } else {
            data.set_atom(key);
        }
        if p.eat(TokenKind::Comma).is_none() {
            p.expect(TokenKind::RBracket)?;
            return Ok(data);
        }
    }
}

fn parse_number(p: &mut Parser<'_>) -> PResult<f64> {
    let token = p.expect_any(&[TokenKind::Int, TokenKind::Float], "a number")?;
    token.text.parse().map_err(|_| {
        ParseError::syntax(
            p.position(token.offset),
            format!("invalid number '{}'", token.text),
        )
    })
}

/// `"(" number "," number ")"`
fn parse_coord(p: &mut Parser<'_>) -> PResult<Coord> {
    p.expect(TokenKind::LParen)?;
    let x = parse_number(p)?;
    p.expect(TokenKind::Comma)?;
    let y = parse_number(p)?;
    p.expect(TokenKind::RParen)?;
    Ok(Coord::new(x, y))
}

const NAME_TOKENS: [TokenKind; 3] = [TokenKind::Int, TokenKind::Word, TokenKind::NumberUnit];

/// A node name or reference as written between parentheses.
struct NodeRef<'a> {
    name: &'a str,
    anchor: Option<String>,
    offset: usize,
}

/// `name ("." anchor)?` after the opening parenthesis, up to and including
/// the closing one. Anchors may span several words (`south west`).
fn parse_node_ref_tail<'a>(p: &mut Parser<'a>) -> PResult<NodeRef<'a>> {
    let name = p.expect_any(&NAME_TOKENS, "a node name")?;
    let mut anchor = None;
    if p.eat(TokenKind::Dot).is_some() {
        let mut words = vec![p.expect_any(&NAME_TOKENS, "an anchor")?.text];
        while let Some(word) = p.eat(TokenKind::Word) {
            words.push(word.text);
        }
        anchor = Some(words.join(" "));
    }
    p.expect(TokenKind::RParen)?;
    Ok(NodeRef {
        name: name.text,
        anchor,
        offset: name.offset,
    })
}

fn parse_node_ref<'a>(p: &mut Parser<'a>) -> PResult<NodeRef<'a>> {
    p.expect(TokenKind::LParen)?;
    parse_node_ref_tail(p)
}

// ─── Pictures ────────────────────────────────────────────────────────────

/// The picture under construction plus the name table.
struct PictureBuilder {
    graph: Graph,
    names: HashMap<String, NodeId>,
}

/// Table key of a node name: integers in canonical form, anything else
/// verbatim. Digit strings must fit below `u32::MAX` so a fresh id always
/// exists after them.
fn name_key(p: &Parser<'_>, name: &NodeRef<'_>) -> PResult<(String, Option<NodeId>)> {
    let digits = !name.name.is_empty() && name.name.bytes().all(|b| b.is_ascii_digit());
    match name.name.parse::<u32>() {
        Ok(n) if n < u32::MAX => Ok((n.to_string(), Some(NodeId(n)))),
        _ if digits => Err(ParseError::semantic(
            p.position(name.offset),
            format!("Node id '{}' is out of range", name.name),
        )),
        _ => Ok((name.name.to_string(), None)),
    }
}

impl PictureBuilder {
    fn new() -> Self {
        Self {
            graph: Graph::new(),
            names: HashMap::new(),
        }
    }

    /// Bind a declared name to an id: integers are used as the id, other
    /// names get the next fresh id.
    fn declare(&mut self, p: &Parser<'_>, name: &NodeRef<'_>) -> PResult<NodeId> {
        let (key, numeric) = name_key(p, name)?;
        let taken = self.names.contains_key(&key)
            || numeric.is_some_and(|id| self.graph.node(id).is_some());
        if taken {
            return Err(ParseError::semantic(
                p.position(name.offset),
                format!("Node '{}' is already defined", name.name),
            ));
        }
        let id = match numeric {
            Some(id) => id,
            None => self.graph.take_node_id(),
        };
        self.names.insert(key, id);
        Ok(id)
    }

    fn resolve(&self, p: &Parser<'_>, name: &NodeRef<'_>) -> PResult<NodeId> {
        let (key, _) = name_key(p, name)?;
        self.names.get(&key).copied().ok_or_else(|| {
            ParseError::semantic(
                p.position(name.offset),
                format!("Node reference not found: {}", name.name),
            )
        })
    }
}

fn parse_picture_body(p: &mut Parser<'_>) -> PResult<Graph> {
    let mut doc = PictureBuilder::new();
    p.expect(TokenKind::BeginPicture)?;
    let data = parse_properties(p)?;
    doc.graph.set_data(data);

    loop {
        let Some(token) = p.peek() else {
            return Err(p.unexpected(TokenKind::EndPicture.describe()));
        };
        match token.kind {
            TokenKind::EndPicture => {
                p.bump();
                break;
            }
            TokenKind::NodeCmd => parse_node(p, &mut doc)?,
            TokenKind::DrawCmd => parse_draw(p, &mut doc)?,
            TokenKind::PathCmd => parse_bounding_box(p, &mut doc)?,
            TokenKind::BeginLayer => {
                p.bump();
                p.expect(TokenKind::Str)?;
            }
            TokenKind::EndLayer => {
                p.bump();
            }
            _ => return Err(p.unexpected("'\\node', '\\draw' or '\\end{tikzpicture}'")),
        }
    }

    if !p.at_end() {
        return Err(p.unexpected("end of input"));
    }
    Ok(doc.graph)
}

/// `\node [data] (name) at (x, y) {label};`
fn parse_node(p: &mut Parser<'_>, doc: &mut PictureBuilder) -> PResult<()> {
    p.expect(TokenKind::NodeCmd)?;
    let data = parse_properties(p)?;
    p.expect(TokenKind::LParen)?;
    let name = p.expect_any(&NAME_TOKENS, "a node name")?;
    p.expect(TokenKind::RParen)?;
    p.expect(TokenKind::At)?;
    let coord = parse_coord(p)?;
    let label = p.expect(TokenKind::Str)?;
    p.expect(TokenKind::Semicolon)?;

    let name = NodeRef {
        name: name.text,
        anchor: None,
        offset: name.offset,
    };
    let id = doc.declare(p, &name)?;
    doc.graph.insert_node(
        NodeData::new(id)
            .with_data(data)
            .with_coord(coord)
            .with_label(unbrace(&label)),
    );
    Ok(())
}

/// Builder frame for one `\draw` statement.
struct DrawBuilder {
    path: PathId,
    /// Properties written before the source; they go to the first edge.
    leading: Data,
    /// Endpoint the next edge starts from.
    cursor: (NodeId, Option<String>),
    edges: Vec<EdgeData>,
    is_cycle: bool,
}

impl DrawBuilder {
    fn push(
        &mut self,
        doc: &mut PictureBuilder,
        data: Data,
        label: Option<EdgeLabel>,
        target: (NodeId, Option<String>),
        loop_shorthand: bool,
    ) {
        let data = if self.edges.is_empty() {
            let mut leading = std::mem::take(&mut self.leading);
            // A bend on `to` replaces a bend of the other direction on `\draw`.
            for (key, opposite) in [("bend left", "bend right"), ("bend right", "bend left")] {
                if data.has(key) {
                    leading = leading.without(opposite);
                }
            }
            leading.extend(data);
            leading
        } else {
            data
        };
        let (source, source_anchor) = self.cursor.clone();
        let edge = EdgeData::new(doc.graph.take_edge_id(), source, target.0, self.path)
            .with_source(source, source_anchor)
            .with_target(target.0, target.1.clone())
            .with_data(data)
            .with_label(label)
            .with_loop_shorthand(loop_shorthand);
        self.edges.push(edge);
        self.cursor = target;
    }

    /// Where `cycle` leads: the first edge's source.
    fn start(&self) -> Option<(NodeId, Option<String>)> {
        self.edges
            .first()
            .map(|e| (e.source, e.source_anchor.clone()))
    }
}

/// `\draw [data] (source) to [data] node [data] {label} (target) ... ;`
fn parse_draw(p: &mut Parser<'_>, doc: &mut PictureBuilder) -> PResult<()> {
    p.expect(TokenKind::DrawCmd)?;
    let leading = parse_properties(p)?;
    let source_ref = parse_node_ref(p)?;
    let source = doc.resolve(p, &source_ref)?;

    let mut draw = DrawBuilder {
        path: doc.graph.take_path_id(),
        leading,
        cursor: (source, source_ref.anchor),
        edges: Vec::new(),
        is_cycle: false,
    };

    loop {
        p.expect(TokenKind::To)?;
        let data = parse_properties(p)?;
        let label = if p.eat(TokenKind::NodeKw).is_some() {
            let label_data = parse_properties(p)?;
            let text = p.expect(TokenKind::Str)?;
            Some(EdgeLabel::new(unbrace(&text)).with_data(label_data))
        } else {
            None
        };

        let mut loop_shorthand = false;
        let target = if let Some(cycle) = p.eat(TokenKind::Cycle) {
            draw.is_cycle = true;
            draw.start().ok_or_else(|| {
                ParseError::semantic(
                    p.position(cycle.offset),
                    "'cycle' must follow at least one edge",
                )
            })?
        } else {
            p.expect(TokenKind::LParen)?;
            if p.eat(TokenKind::RParen).is_some() {
                loop_shorthand = true;
                (draw.cursor.0, None)
            } else {
                let target_ref = parse_node_ref_tail(p)?;
                (doc.resolve(p, &target_ref)?, target_ref.anchor)
            }
        };
        draw.push(doc, data, label, target, loop_shorthand);

        if draw.is_cycle {
            p.expect(TokenKind::Semicolon)?;
            break;
        }
        if p.eat(TokenKind::Semicolon).is_some() {
            break;
        }
    }

    let path = PathData::new(draw.path, draw.edges.iter().map(|e| e.id)).with_cycle(draw.is_cycle);
    for edge in draw.edges {
        doc.graph.insert_edge(edge);
    }
    doc.graph.insert_path(path);
    Ok(())
}

/// `\path [data] (x1, y1) rectangle (x2, y2);`
fn parse_bounding_box(p: &mut Parser<'_>, doc: &mut PictureBuilder) -> PResult<()> {
    p.expect(TokenKind::PathCmd)?;
    parse_properties(p)?;
    let from = parse_coord(p)?;
    p.expect(TokenKind::Rectangle)?;
    let to = parse_coord(p)?;
    p.expect(TokenKind::Semicolon)?;
    doc.graph.set_bounding_box(Some(BoundingBox { from, to }));
    Ok(())
}

// ─── Styles ──────────────────────────────────────────────────────────────

/// `(\tikzstyle{name}=[data])*`
fn parse_style_list(
    p: &mut Parser<'_>,
    styles: &mut Styles,
    errors: &mut Vec<ParseError>,
) -> PResult<()> {
    while !p.at_end() {
        p.expect(TokenKind::StyleCmd)?;
        let name = p.expect(TokenKind::Str)?;
        p.expect(TokenKind::Equals)?;
        let data = parse_properties(p)?;

        let style_name = unbrace(&name);
        if styles.contains(style_name) {
            errors.push(ParseError::semantic(
                p.position(name.offset),
                format!("Style '{style_name}' is already defined"),
            ));
            continue;
        }
        styles.insert(StyleData::new(style_name).with_data(data));
    }
    Ok(())
}
