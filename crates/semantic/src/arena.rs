//! Symbol arena for resolved declarations.
//!
//! Every declaration the front-end resolves is allocated once in the arena
//! and referred to by id everywhere else in the tree.

use crate::symbol::SymbolData;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A unique identifier for a resolved symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SymbolId(u32);

impl SymbolId {
    /// Create a new symbol id from a u32.
    pub fn new(id: u32) -> Self {
        SymbolId(id)
    }

    /// Get the underlying id.
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Arena owning the symbol data for one compilation.
///
/// Allocation is write-once: symbol payloads are fixed by the front-end and
/// never change during the transform.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct SymbolArena {
    symbols: Vec<SymbolData>,
}

impl SymbolArena {
    /// Create an empty arena.
    pub fn new() -> Self {
        SymbolArena {
            symbols: Vec::new(),
        }
    }

    /// Allocate a symbol, returning its id.
    pub fn alloc(&mut self, data: SymbolData) -> SymbolId {
        let id = SymbolId(self.symbols.len() as u32);
        self.symbols.push(data);
        id
    }

    /// Get the data for a symbol id.
    ///
    /// Panics on an id that was not allocated by this arena; ids are only
    /// produced by `alloc`, so an out-of-range id is a front-end contract
    /// violation surfaced at the lookup site.
    pub fn get(&self, id: SymbolId) -> &SymbolData {
        &self.symbols[id.0 as usize]
    }

    /// Fallible lookup, for contract validation at the compilation boundary.
    pub fn try_get(&self, id: SymbolId) -> Option<&SymbolData> {
        self.symbols.get(id.0 as usize)
    }

    /// Mutable access, used by tree builders during the construction
    /// phase. Symbol data is frozen once the transform starts.
    pub fn get_mut(&mut self, id: SymbolId) -> &mut SymbolData {
        &mut self.symbols[id.0 as usize]
    }

    /// Number of allocated symbols.
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Whether the arena is empty.
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Iterate all ids with their data, in allocation order.
    pub fn iter(&self) -> impl Iterator<Item = (SymbolId, &SymbolData)> {
        self.symbols
            .iter()
            .enumerate()
            .map(|(i, s)| (SymbolId(i as u32), s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::{Accessibility, SymbolData, SymbolKind};

    #[test]
    fn alloc_and_resolve() {
        let mut arena = SymbolArena::new();
        let a = arena.alloc(SymbolData::new("A", SymbolKind::Namespace));
        let b = arena.alloc(SymbolData::new("B", SymbolKind::Namespace));

        assert_ne!(a, b);
        assert_eq!(arena.get(a).name, "A");
        assert_eq!(arena.get(b).name, "B");
        assert_eq!(arena.get(a).accessibility, Accessibility::Public);
        assert_eq!(arena.len(), 2);
    }
}
