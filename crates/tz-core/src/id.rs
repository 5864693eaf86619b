//! Integer identifiers for graph entities.
//!
//! Nodes, edges and paths each have their own id space. Ids are plain
//! `u32` values wrapped in newtypes so a `NodeId` can never be handed to an
//! operation expecting an `EdgeId`.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident, $tag:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl $name {
            /// The raw integer value.
            pub const fn get(self) -> u32 {
                self.0
            }
        }

        impl From<u32> for $name {
            fn from(raw: u32) -> Self {
                Self(raw)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($tag, "{}"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

entity_id!(
    /// Identifier of a node; also the name written in `\node (...)`.
    NodeId,
    "n"
);
entity_id!(
    /// Identifier of a single edge segment.
    EdgeId,
    "e"
);
entity_id!(
    /// Identifier of a path (one `\draw` statement).
    PathId,
    "p"
);

/// Per-entity-type "next unused id" counters.
///
/// Counters only move forward. Removing the entity holding the highest id
/// does not give that id back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreshIds {
    pub node: u32,
    pub edge: u32,
    pub path: u32,
}

impl FreshIds {
    pub(crate) fn observe_node(&mut self, id: NodeId) {
        self.node = self.node.max(id.0.saturating_add(1));
    }

    pub(crate) fn observe_edge(&mut self, id: EdgeId) {
        self.edge = self.edge.max(id.0.saturating_add(1));
    }

    pub(crate) fn observe_path(&mut self, id: PathId) {
        self.path = self.path.max(id.0.saturating_add(1));
    }

    /// Pointwise maximum of two counter sets.
    pub(crate) fn max(self, other: FreshIds) -> FreshIds {
        FreshIds {
            node: self.node.max(other.node),
            edge: self.edge.max(other.edge),
            path: self.path.max(other.path),
        }
    }

    pub(crate) fn take_node(&mut self) -> NodeId {
        let id = NodeId(self.node);
        self.node += 1;
        id
    }

    pub(crate) fn take_edge(&mut self) -> EdgeId {
        let id = EdgeId(self.edge);
        self.edge += 1;
        id
    }

    pub(crate) fn take_path(&mut self) -> PathId {
        let id = PathId(self.path);
        self.path += 1;
        id
    }
}
