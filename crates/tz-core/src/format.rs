//! Formatting pipeline: parse → emit in canonical layout.

use crate::emitter::emit_graph_with;
use crate::error::ParseError;
use crate::parser::{parse_picture, parse_styles};

// ─── Config ───────────────────────────────────────────────────────────────

/// Indentation unit for one nesting level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Indent {
    #[default]
    Tab,
    Spaces(usize),
}

impl Indent {
    pub(crate) fn write(self, out: &mut String, depth: usize) {
        for _ in 0..depth {
            match self {
                Indent::Tab => out.push('\t'),
                Indent::Spaces(n) => out.extend(std::iter::repeat_n(' ', n)),
            }
        }
    }
}

/// Layout options for emitted pictures.
///
/// The default is the canonical form: tab indentation, nodes and edges
/// wrapped in their `pgfonlayer` environments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatConfig {
    pub indent: Indent,
    /// Wrap nodes in `nodelayer` and edges in `edgelayer`. Default: **true**.
    pub layers: bool,
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            indent: Indent::Tab,
            layers: true,
        }
    }
}

// ─── Pipeline ─────────────────────────────────────────────────────────────

/// Parse a picture and re-emit it with `config`.
///
/// Idempotent: formatting already formatted text returns it unchanged.
///
/// # Errors
/// Returns the parse errors if the input is not a valid picture.
pub fn format_picture(text: &str, config: &FormatConfig) -> Result<String, Vec<ParseError>> {
    let graph = parse_picture(text)?;
    Ok(emit_graph_with(&graph, config))
}

/// Parse a style file and re-emit it, one declaration per line.
///
/// # Errors
/// Returns every parse error, duplicate style names included.
pub fn format_styles(text: &str) -> Result<String, Vec<ParseError>> {
    Ok(parse_styles(text)?.tikz())
}

/// Trailing whitespace trimmed, blank lines dropped, exactly one final
/// newline. Canonical documents are equal to their emitted form after this.
pub fn normalize_source(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for line in text.lines().map(str::trim_end).filter(|l| !l.is_empty()) {
        out.push_str(line);
        out.push('\n');
    }
    out
}

// ─── Tests ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const MESSY: &str = "\\begin{tikzpicture}\n  \\node [style=none]   (0) at (0.0, 1.50) {a};\n\n  \\node (1) at (2,0) {};\n  \\draw [->] (0) to (1);\n\\end{tikzpicture}";

    #[test]
    fn format_picture_is_canonical_and_idempotent() {
        let config = FormatConfig::default();
        let once = format_picture(MESSY, &config).unwrap();
        assert_eq!(
            once,
            "\\begin{tikzpicture}\n\t\\begin{pgfonlayer}{nodelayer}\n\t\t\\node [style=none] (0) at (0, 1.5) {a};\n\t\t\\node (1) at (2, 0) {};\n\t\\end{pgfonlayer}\n\t\\begin{pgfonlayer}{edgelayer}\n\t\t\\draw [->] (0) to (1);\n\t\\end{pgfonlayer}\n\\end{tikzpicture}\n"
        );
        assert_eq!(format_picture(&once, &config).unwrap(), once);
    }

    #[test]
    fn spaces_without_layers() {
        let config = FormatConfig {
            indent: Indent::Spaces(2),
            layers: false,
        };
        let out = format_picture(MESSY, &config).unwrap();
        assert_eq!(
            out,
            "\\begin{tikzpicture}\n  \\node [style=none] (0) at (0, 1.5) {a};\n  \\node (1) at (2, 0) {};\n  \\draw [->] (0) to (1);\n\\end{tikzpicture}\n"
        );
    }

    #[test]
    fn format_styles_reports_errors() {
        assert_eq!(
            format_styles("\\tikzstyle{a}=[ fill = red ]").unwrap(),
            "\\tikzstyle{a}=[fill=red]\n"
        );
        assert!(format_styles("\\tikzstyle{a}=[]\n\\tikzstyle{a}=[]").is_err());
    }

    #[test]
    fn normalize_drops_blank_lines_and_trailing_space() {
        assert_eq!(normalize_source("a  \n\n\tb\t\n"), "a\n\tb\n");
        assert_eq!(normalize_source("x"), "x\n");
        assert_eq!(normalize_source(""), "");
    }
}
