//! Mode-sensitive lexer for TikZ picture and style files.
//!
//! Text outside square brackets is lexed in *global* mode: commands,
//! keywords, numbers, punctuation. Between `[` and `]` the lexer switches to
//! *property* mode, where almost anything up to `=`, `,` or `]` is one bare
//! word (`bend left`, `->`, `-latex'`, `0.5cm`). Brace-delimited strings are
//! scanned by hand in both modes so nested braces and `\` escapes survive.

use crate::error::{ParseError, line_col};
use winnow::ascii::multispace0;
use winnow::combinator::opt;
use winnow::error::{ContextError, ErrMode};
use winnow::prelude::*;
use winnow::token::{take_till, take_while};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    BeginPicture,
    EndPicture,
    BeginLayer,
    EndLayer,
    StyleCmd,
    DrawCmd,
    NodeCmd,
    PathCmd,
    /// Inline `node` introducing an edge label.
    NodeKw,
    Rectangle,
    At,
    To,
    Cycle,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Semicolon,
    Equals,
    Dot,
    Int,
    Float,
    /// A number glued to a unit, e.g. `2pt`. Never split.
    NumberUnit,
    /// `{...}` including the outer braces.
    Str,
    Word,
    /// Bare key or value inside `[...]`.
    PropWord,
}

impl TokenKind {
    /// How the token is named in error messages.
    pub fn describe(self) -> &'static str {
        match self {
            TokenKind::BeginPicture => "'\\begin{tikzpicture}'",
            TokenKind::EndPicture => "'\\end{tikzpicture}'",
            TokenKind::BeginLayer => "'\\begin{pgfonlayer}'",
            TokenKind::EndLayer => "'\\end{pgfonlayer}'",
            TokenKind::StyleCmd => "'\\tikzstyle'",
            TokenKind::DrawCmd => "'\\draw'",
            TokenKind::NodeCmd => "'\\node'",
            TokenKind::PathCmd => "'\\path'",
            TokenKind::NodeKw => "'node'",
            TokenKind::Rectangle => "'rectangle'",
            TokenKind::At => "'at'",
            TokenKind::To => "'to'",
            TokenKind::Cycle => "'cycle'",
            TokenKind::LParen => "'('",
            TokenKind::RParen => "')'",
            TokenKind::LBracket => "'['",
            TokenKind::RBracket => "']'",
            TokenKind::Comma => "','",
            TokenKind::Semicolon => "';'",
            TokenKind::Equals => "'='",
            TokenKind::Dot => "'.'",
            TokenKind::Int => "integer",
            TokenKind::Float => "number",
            TokenKind::NumberUnit => "dimension",
            TokenKind::Str => "braced string",
            TokenKind::Word => "name",
            TokenKind::PropWord => "property",
        }
    }
}

/// A token borrowing its text from the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    /// Byte offset of the first character.
    pub offset: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Global,
    Property,
}

pub struct Lexer<'a> {
    source: &'a str,
    rest: &'a str,
    mode: Mode,
    failed: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            rest: source,
            mode: Mode::Global,
            failed: false,
        }
    }

    fn offset(&self) -> usize {
        self.source.len() - self.rest.len()
    }

    fn error_at(&self, offset: usize, message: impl Into<String>) -> ParseError {
        ParseError::lex(line_col(self.source, offset), message)
    }

    /// Produce the next token, `Ok(None)` at end of input.
    pub fn next_token(&mut self) -> Result<Option<Token<'a>>, ParseError> {
        skip_trivia(&mut self.rest);
        if self.rest.is_empty() {
            return Ok(None);
        }
        match self.mode {
            Mode::Global => self.global_token().map(Some),
            Mode::Property => self.property_token().map(Some),
        }
    }

    /// Consume `len` bytes as a token of `kind`.
    fn emit(&mut self, kind: TokenKind, len: usize) -> Token<'a> {
        let offset = self.offset();
        let text = &self.rest[..len];
        self.rest = &self.rest[len..];
        Token { kind, text, offset }
    }

    fn braced(&mut self) -> Result<Token<'a>, ParseError> {
        match scan_braced(self.rest) {
            Some(len) => Ok(self.emit(TokenKind::Str, len)),
            None => Err(self.error_at(self.offset(), "unterminated '{'")),
        }
    }

    fn global_token(&mut self) -> Result<Token<'a>, ParseError> {
        let start = self.offset();
        let Some(c) = self.rest.chars().next() else {
            return Err(self.error_at(start, "unexpected end of input"));
        };
        let punct = match c {
            '(' => Some(TokenKind::LParen),
            ')' => Some(TokenKind::RParen),
            ',' => Some(TokenKind::Comma),
            ';' => Some(TokenKind::Semicolon),
            '=' => Some(TokenKind::Equals),
            '[' => Some(TokenKind::LBracket),
            ']' => Some(TokenKind::RBracket),
            _ => None,
        };
        if let Some(kind) = punct {
            if kind == TokenKind::LBracket {
                self.mode = Mode::Property;
            }
            return Ok(self.emit(kind, 1));
        }

        match c {
            '\\' => self.command(),
            '{' => self.braced(),
            c if starts_number(self.rest) => {
                let mut input = self.rest;
                let kind = lex_number
                    .parse_next(&mut input)
                    .map_err(|_| self.error_at(start, format!("malformed number near '{c}'")))?;
                let len = self.rest.len() - input.len();
                Ok(self.emit(kind, len))
            }
            '.' => Ok(self.emit(TokenKind::Dot, 1)),
            c if c.is_alphabetic() || c == '_' => {
                let mut input = self.rest;
                let word = lex_word
                    .parse_next(&mut input)
                    .map_err(|_| self.error_at(start, "malformed name"))?;
                let kind = match word {
                    "at" => TokenKind::At,
                    "to" => TokenKind::To,
                    "cycle" => TokenKind::Cycle,
                    "rectangle" => TokenKind::Rectangle,
                    "node" => TokenKind::NodeKw,
                    _ => TokenKind::Word,
                };
                let len = word.len();
                Ok(self.emit(kind, len))
            }
            other => Err(self.error_at(start, format!("unexpected character '{other}'"))),
        }
    }

    /// `\draw`, `\node`, `\path`, `\tikzstyle`, and `\begin{..}`/`\end{..}`
    /// for the picture and layer environments.
    fn command(&mut self) -> Result<Token<'a>, ParseError> {
        let start = self.offset();
        let mut input = &self.rest[1..];
        let name: &str = take_while::<_, _, ContextError>(1.., |c: char| c.is_ascii_alphabetic())
            .parse_next(&mut input)
            .map_err(|_| self.error_at(start, "expected a command name after '\\'"))?;

        let kind = match name {
            "draw" => TokenKind::DrawCmd,
            "node" => TokenKind::NodeCmd,
            "path" => TokenKind::PathCmd,
            "tikzstyle" => TokenKind::StyleCmd,
            "begin" | "end" => {
                let _: Result<&str, ErrMode<ContextError>> = multispace0.parse_next(&mut input);
                let env_len = scan_braced(input)
                    .ok_or_else(|| self.error_at(start, format!("expected '{{' after '\\{name}'")))?;
                let env = &input[1..env_len - 1];
                input = &input[env_len..];
                match (name, env.trim()) {
                    ("begin", "tikzpicture") => TokenKind::BeginPicture,
                    ("end", "tikzpicture") => TokenKind::EndPicture,
                    ("begin", "pgfonlayer") => TokenKind::BeginLayer,
                    ("end", "pgfonlayer") => TokenKind::EndLayer,
                    (_, other) => {
                        return Err(
                            self.error_at(start, format!("unsupported environment '{other}'"))
                        );
                    }
                }
            }
            other => {
                return Err(self.error_at(start, format!("unknown command '\\{other}'")));
            }
        };
        let len = self.rest.len() - input.len();
        Ok(self.emit(kind, len))
    }

    fn property_token(&mut self) -> Result<Token<'a>, ParseError> {
        let start = self.offset();
        match self.rest.chars().next() {
            Some(']') => {
                self.mode = Mode::Global;
                Ok(self.emit(TokenKind::RBracket, 1))
            }
            Some('=') => Ok(self.emit(TokenKind::Equals, 1)),
            Some(',') => Ok(self.emit(TokenKind::Comma, 1)),
            Some('{') => self.braced(),
            Some('[') => Err(self.error_at(start, "unexpected '[' inside a property list")),
            Some('}') => Err(self.error_at(start, "unmatched '}'")),
            _ => {
                let mut input = self.rest;
                let word: &str = take_till::<_, _, ContextError>(1.., |c: char| {
                    matches!(c, '=' | ',' | '[' | ']' | '{' | '}' | '%' | '\n' | '\r')
                })
                .parse_next(&mut input)
                .map_err(|_| self.error_at(start, "expected a property"))?;
                let trimmed = word.trim_end();
                Ok(self.emit(TokenKind::PropWord, trimmed.len()))
            }
        }
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Result<Token<'a>, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let next = self.next_token().transpose();
        if matches!(next, Some(Err(_))) {
            self.failed = true;
        }
        next
    }
}

/// Tokenize a whole document, stopping at the first lexical error.
pub fn tokenize(source: &str) -> Result<Vec<Token<'_>>, ParseError> {
    Lexer::new(source).collect()
}

// ─── Low-level scanners ──────────────────────────────────────────────────

/// Skip whitespace and `%` line comments.
fn skip_trivia(input: &mut &str) {
    loop {
        let _: Result<&str, ErrMode<ContextError>> = multispace0.parse_next(input);
        if input.starts_with('%') {
            let _ = take_till::<_, _, ContextError>(0.., '\n').parse_next(input);
        } else {
            break;
        }
    }
}

/// Length in bytes of the `{...}` group at the start of `input`, braces
/// included. A backslash escapes the character after it. `None` if the
/// group never closes.
fn scan_braced(input: &str) -> Option<usize> {
    if !input.starts_with('{') {
        return None;
    }
    let mut depth = 0usize;
    let mut chars = input.char_indices();
    while let Some((i, c)) = chars.next() {
        match c {
            '\\' => {
                chars.next();
            }
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }
    None
}

fn starts_number(s: &str) -> bool {
    let s = s.strip_prefix('-').unwrap_or(s);
    let s = s.strip_prefix('.').unwrap_or(s);
    s.starts_with(|c: char| c.is_ascii_digit())
}

fn lex_number(input: &mut &str) -> ModalResult<TokenKind> {
    let _ = opt('-').parse_next(input)?;
    let whole: &str = take_while(0.., |c: char| c.is_ascii_digit()).parse_next(input)?;
    let mut kind = TokenKind::Int;
    if input.starts_with('.') && input[1..].starts_with(|c: char| c.is_ascii_digit()) {
        let _ = '.'.parse_next(input)?;
        let _ = take_while(1.., |c: char| c.is_ascii_digit()).parse_next(input)?;
        kind = TokenKind::Float;
    } else if whole.is_empty() {
        return Err(ErrMode::Backtrack(ContextError::new()));
    }
    if input.starts_with(|c: char| c.is_ascii_alphabetic()) {
        let _ = take_while(1.., |c: char| c.is_ascii_alphabetic()).parse_next(input)?;
        kind = TokenKind::NumberUnit;
    }
    Ok(kind)
}

fn lex_word<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    take_while(1.., |c: char| c.is_alphanumeric() || c == '_').parse_next(input)
}
