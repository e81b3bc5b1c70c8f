//! Metadata oracle consumed by the emitter.
//!
//! The XML metadata reader lives outside this repository; what crosses the
//! boundary is its digested form: per-method code templates and per-symbol
//! attribute marks, keyed by dotted qualified name.

use crate::arena::{SymbolArena, SymbolId};
use indexmap::{IndexMap, IndexSet};

/// The dotted qualified name of a symbol (`Ns.Outer.Inner.Member`).
pub fn qualified_name(arena: &SymbolArena, symbol: SymbolId) -> String {
    let mut parts = Vec::new();
    let mut current = Some(symbol);
    while let Some(id) = current {
        let data = arena.get(id);
        parts.push(data.name.as_str());
        current = data.containing;
    }
    parts.reverse();
    parts.join(".")
}

/// Per-method overrides and attribute marks supplied by the external
/// metadata provider.
pub trait MetadataProvider {
    /// Code template overriding the default translation of `method`.
    fn code_template(&self, arena: &SymbolArena, method: SymbolId) -> Option<&str>;

    /// Whether the symbol is excluded from emission.
    fn is_ignored(&self, arena: &SymbolArena, symbol: SymbolId) -> bool;

    /// Whether a field-like property must emit accessor methods anyway.
    fn wants_no_field(&self, arena: &SymbolArena, symbol: SymbolId) -> bool;
}

/// In-memory metadata, filled from the provider's digested output files.
#[derive(Debug, Default, Clone)]
pub struct MetadataIndex {
    templates: IndexMap<String, String>,
    ignored: IndexSet<String>,
    no_field: IndexSet<String>,
}

impl MetadataIndex {
    pub fn new() -> Self {
        MetadataIndex::default()
    }

    pub fn add_template(&mut self, qualified: impl Into<String>, template: impl Into<String>) {
        self.templates.insert(qualified.into(), template.into());
    }

    pub fn mark_ignored(&mut self, qualified: impl Into<String>) {
        self.ignored.insert(qualified.into());
    }

    pub fn mark_no_field(&mut self, qualified: impl Into<String>) {
        self.no_field.insert(qualified.into());
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty() && self.ignored.is_empty() && self.no_field.is_empty()
    }

    /// Merge another index into this one; later entries win.
    pub fn merge(&mut self, other: MetadataIndex) {
        self.templates.extend(other.templates);
        self.ignored.extend(other.ignored);
        self.no_field.extend(other.no_field);
    }
}

impl MetadataProvider for MetadataIndex {
    fn code_template(&self, arena: &SymbolArena, method: SymbolId) -> Option<&str> {
        self.templates
            .get(&qualified_name(arena, method))
            .map(String::as_str)
    }

    fn is_ignored(&self, arena: &SymbolArena, symbol: SymbolId) -> bool {
        self.ignored.contains(&qualified_name(arena, symbol))
    }

    fn wants_no_field(&self, arena: &SymbolArena, symbol: SymbolId) -> bool {
        self.no_field.contains(&qualified_name(arena, symbol))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::{MethodInfo, SymbolData, SymbolKind};
    use crate::types::{SpecialType, TypeRef};

    #[test]
    fn qualified_names_walk_containers() {
        let mut arena = SymbolArena::new();
        let ns = arena.alloc(SymbolData::new("Sys", SymbolKind::Namespace));
        let ty = arena.alloc(
            SymbolData::new("Console", SymbolKind::Type(Default::default())).with_containing(ns),
        );
        let m = arena.alloc(
            SymbolData::new(
                "WriteLine",
                SymbolKind::Method(MethodInfo::new(TypeRef::Special(SpecialType::Void))),
            )
            .with_containing(ty),
        );

        assert_eq!(qualified_name(&arena, m), "Sys.Console.WriteLine");

        let mut index = MetadataIndex::new();
        index.add_template("Sys.Console.WriteLine", "print({0})");
        assert_eq!(index.code_template(&arena, m), Some("print({0})"));
        assert!(!index.is_ignored(&arena, m));
    }
}
