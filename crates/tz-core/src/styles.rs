//! A `.tikzstyles` document: named property lists in declaration order.

use crate::inherit::splice_by_equality;
use crate::model::StyleData;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Name of the implicit style every node and edge falls back to.
pub const NONE_STYLE: &str = "none";

/// Persistent collection of style declarations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Styles {
    styles: IndexMap<String, Arc<StyleData>>,
}

impl Styles {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a style, replacing any style with the same name in place.
    /// The implicit `none` style is never stored.
    #[must_use]
    pub fn add_style(&self, style: StyleData) -> Styles {
        let mut s = self.clone();
        s.insert(style);
        s
    }

    pub(crate) fn insert(&mut self, style: StyleData) {
        if style.name == NONE_STYLE {
            log::trace!("styles: ignoring declaration of '{NONE_STYLE}'");
            return;
        }
        self.styles.insert(style.name.clone(), Arc::new(style));
    }

    #[must_use]
    pub fn remove_style(&self, name: &str) -> Styles {
        let mut s = self.clone();
        s.styles.shift_remove(name);
        s
    }

    pub fn style(&self, name: &str) -> Option<&Arc<StyleData>> {
        self.styles.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.styles.contains_key(name)
    }

    /// Styles in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<StyleData>> {
        self.styles.values()
    }

    pub fn node_styles(&self) -> impl Iterator<Item = &Arc<StyleData>> {
        self.iter().filter(|s| !s.is_edge_style())
    }

    pub fn edge_styles(&self) -> impl Iterator<Item = &Arc<StyleData>> {
        self.iter().filter(|s| s.is_edge_style())
    }

    pub fn len(&self) -> usize {
        self.styles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }

    /// Take `other`'s `Arc` for every style equal to the one of the same name.
    #[must_use]
    pub fn inherit_data_from(&self, other: &Styles) -> Styles {
        let mut s = self.clone();
        splice_by_equality(&mut s.styles, &other.styles);
        s
    }

    pub fn tikz(&self) -> String {
        crate::emitter::emit_styles(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Data;

    fn red() -> StyleData {
        StyleData::new("red").with_data(Data::new().with_property("fill", "red"))
    }

    fn arrow() -> StyleData {
        StyleData::new("arrow").with_data(Data::new().with_atom("->"))
    }

    #[test]
    fn replace_keeps_declaration_position() {
        let styles = Styles::new().add_style(red()).add_style(arrow());
        let styles = styles.add_style(StyleData::new("red").with_data(Data::new().with_atom("thick")));
        let names: Vec<&str> = styles.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["red", "arrow"]);
        assert!(styles.style("red").unwrap().data.is_atom("thick"));
    }

    #[test]
    fn none_is_never_stored() {
        let styles = Styles::new().add_style(StyleData::new(NONE_STYLE));
        assert!(styles.is_empty());
        assert!(!styles.contains(NONE_STYLE));
    }

    #[test]
    fn node_and_edge_styles_partition() {
        let styles = Styles::new().add_style(red()).add_style(arrow());
        assert_eq!(styles.node_styles().count(), 1);
        assert_eq!(styles.edge_styles().next().unwrap().name, "arrow");
        let without = styles.remove_style("arrow");
        assert_eq!(without.len(), 1);
        assert_eq!(styles.len(), 2);
    }

    #[test]
    fn inherit_shares_unchanged_styles() {
        let old = Styles::new().add_style(red()).add_style(arrow());
        let new = Styles::new()
            .add_style(red())
            .add_style(StyleData::new("arrow").with_data(Data::new().with_atom("<-")));
        let inherited = new.inherit_data_from(&old);
        assert!(Arc::ptr_eq(inherited.style("red").unwrap(), old.style("red").unwrap()));
        assert!(!Arc::ptr_eq(inherited.style("arrow").unwrap(), old.style("arrow").unwrap()));
    }
}
