pub mod emitter;
pub mod error;
pub mod format;
pub mod graph;
pub mod id;
pub mod inherit;
pub mod lexer;
pub mod model;
pub mod parser;
pub mod styles;

pub use emitter::{emit_graph, emit_graph_with, emit_graph_with_position, emit_styles};
pub use error::{GraphError, ParseError, ParseErrorKind};
pub use format::{FormatConfig, Indent, format_picture, format_styles, normalize_source};
pub use graph::{BoundingBox, Graph};
pub use id::{EdgeId, FreshIds, NodeId, PathId};
pub use model::*;
pub use parser::{parse_picture, parse_styles};
pub use styles::Styles;
