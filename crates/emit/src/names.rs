//! Symbol naming service.
//!
//! Assigns every user symbol a Lua identifier that is collision-free within
//! its scope and never lands on a reserved word. Assignment is write-once:
//! the first request for a symbol fixes its name for the compilation.

use crate::error::{EmitError, EmitResult};
use indexmap::IndexMap;
use phf::{phf_set, Set};
use sharplua_semantic::{qualified_name, SymbolArena, SymbolId, SymbolKind};
use std::collections::{HashMap, HashSet};

/// Lua reserved words, usable only in their reserved grammar roles.
pub static RESERVED_WORDS: Set<&'static str> = phf_set! {
    "and", "break", "do", "else", "elseif", "end", "false", "for",
    "function", "goto", "if", "in", "local", "nil", "not", "or",
    "repeat", "return", "then", "true", "until", "while",
};

/// Names the compiler reserves for itself and the runtime, plus source
/// keywords that read confusingly when they survive into output.
pub static COMPILER_RESERVED: Set<&'static str> = phf_set! {
    "System", "Linq",
    "base", "class", "continue", "default", "delegate", "enum", "event",
    "interface", "namespace", "new", "object", "out", "override", "ref",
    "sizeof", "struct", "this", "typeof", "using", "void",
};

/// Metatable method names; a user method may not shadow them.
pub static METAMETHODS: Set<&'static str> = phf_set! {
    "__add", "__sub", "__mul", "__div", "__mod", "__pow", "__unm",
    "__idiv", "__band", "__bor", "__bxor", "__bnot", "__shl", "__shr",
    "__concat", "__len", "__eq", "__lt", "__le", "__index", "__newindex",
    "__call", "__gc", "__close", "__mode", "__name", "__tostring",
    "__metatable", "__pairs",
};

/// Runtime adapter members; likewise off-limits for user methods.
pub static RUNTIME_RESERVED: Set<&'static str> = phf_set! {
    "__ctor__", "__base__", "__inherits__", "__interfaces__",
    "__default__", "__attributes__", "__clone__", "__name__", "__kind__",
};

/// Whether a rendered identifier is structurally valid and not reserved.
pub fn is_safe_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !(first.is_ascii_alphabetic() || first == '_') {
        return false;
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return false;
    }
    !RESERVED_WORDS.contains(name)
}

const BASE63: &[u8; 63] = b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ_";

/// Escape an identifier into ASCII `[A-Za-z0-9_]`, encoding each offending
/// code point in the base-63 alphabet. A leading digit gets a `_` prefix.
pub fn escape_identifier(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            out.push(c);
        } else {
            let mut n = c as u32;
            let mut digits = Vec::new();
            loop {
                digits.push(BASE63[(n % 63) as usize] as char);
                n /= 63;
                if n == 0 {
                    break;
                }
            }
            digits.reverse();
            out.extend(digits);
        }
    }
    if out.is_empty() || out.as_bytes()[0].is_ascii_digit() {
        out.insert(0, '_');
    }
    out
}

/// Per-compilation name assignment table.
#[derive(Debug, Default)]
pub struct NameService {
    assigned: IndexMap<SymbolId, String>,
    /// Names already taken within each scope (keyed by containing symbol).
    scopes: HashMap<Option<SymbolId>, HashSet<String>>,
}

impl NameService {
    pub fn new() -> Self {
        NameService::default()
    }

    /// The Lua name for a symbol, assigning one on first request.
    ///
    /// Metadata symbols keep their declared names untouched; their shape is
    /// fixed by the runtime library.
    pub fn lua_name(&mut self, arena: &SymbolArena, symbol: SymbolId) -> EmitResult<String> {
        if let Some(name) = self.assigned.get(&symbol) {
            return Ok(name.clone());
        }
        let data = arena.get(symbol);
        if data.from_metadata {
            return Ok(data.name.clone());
        }

        let mut base = escape_identifier(&data.name);
        if let SymbolKind::Type(info) = &data.kind {
            if info.arity() > 0 {
                base = format!("{}_{}", base, info.arity());
            }
        }
        let is_method = matches!(data.kind, SymbolKind::Method(_));
        let name = self.disambiguate(&base, data.containing, is_method, arena)?;

        self.assigned.insert(symbol, name.clone());
        self.scopes
            .entry(data.containing)
            .or_default()
            .insert(name.clone());
        Ok(name)
    }

    /// Qualified display name of a type: `Outer.Inner`, arity-suffixed.
    pub fn type_path(&mut self, arena: &SymbolArena, symbol: SymbolId) -> EmitResult<String> {
        let data = arena.get(symbol);
        let own = self.lua_name(arena, symbol)?;
        match data.containing {
            Some(parent) if matches!(arena.get(parent).kind, SymbolKind::Type(_)) => {
                let outer = self.type_path(arena, parent)?;
                Ok(format!("{}.{}", outer, own))
            }
            Some(parent) if matches!(arena.get(parent).kind, SymbolKind::Namespace) => {
                let ns = qualified_name(arena, parent);
                Ok(format!("{}.{}", ns, own))
            }
            _ => Ok(own),
        }
    }

    fn taken(&self, scope: Option<SymbolId>, name: &str) -> bool {
        self.scopes
            .get(&scope)
            .map(|s| s.contains(name))
            .unwrap_or(false)
    }

    fn acceptable(&self, candidate: &str, scope: Option<SymbolId>, is_method: bool) -> bool {
        if RESERVED_WORDS.contains(candidate) || COMPILER_RESERVED.contains(candidate) {
            return false;
        }
        if is_method && (METAMETHODS.contains(candidate) || RUNTIME_RESERVED.contains(candidate)) {
            return false;
        }
        !self.taken(scope, candidate)
    }

    fn disambiguate(
        &self,
        base: &str,
        scope: Option<SymbolId>,
        is_method: bool,
        arena: &SymbolArena,
    ) -> EmitResult<String> {
        if self.acceptable(base, scope, is_method) {
            return Ok(base.to_string());
        }
        let trailing = format!("{}_", base);
        if self.acceptable(&trailing, scope, is_method) {
            return Ok(trailing);
        }
        let leading = format!("_{}", base);
        if self.acceptable(&leading, scope, is_method) {
            return Ok(leading);
        }
        for i in 1..u32::MAX {
            let numbered = format!("{}{}", base, i);
            if self.acceptable(&numbered, scope, is_method) {
                return Ok(numbered);
            }
        }
        Err(EmitError::Naming {
            identifier: base.to_string(),
            scope: scope
                .map(|s| qualified_name(arena, s))
                .unwrap_or_else(|| "<unit>".to_string()),
        })
    }

    /// Reserve a synthesised name (temporaries, flags) inside a scope so a
    /// later user symbol cannot land on it.
    pub fn reserve(&mut self, scope: Option<SymbolId>, name: &str) {
        self.scopes
            .entry(scope)
            .or_default()
            .insert(name.to_string());
    }

    /// Whether a name is already spoken for in a scope.
    pub fn is_taken(&self, scope: Option<SymbolId>, name: &str) -> bool {
        self.taken(scope, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escaping_is_injective_on_distinct_inputs() {
        let a = escape_identifier("café");
        let b = escape_identifier("cafe");
        assert_ne!(a, b);
        assert!(is_safe_identifier(&a));
        assert!(is_safe_identifier(&b));
    }

    #[test]
    fn leading_digit_gets_underscore() {
        // A lone non-ASCII character encodes to digits.
        let name = escape_identifier("é");
        assert!(name.starts_with('_') || name.chars().next().unwrap().is_ascii_alphabetic());
        assert!(is_safe_identifier(&name));
    }

    #[test]
    fn reserved_words_rejected() {
        assert!(!is_safe_identifier("end"));
        assert!(!is_safe_identifier("nil"));
        assert!(is_safe_identifier("end_"));
    }
}
