//! Type references and constant values.
//!
//! A `TypeRef` is how the resolved tree points at a type: either one of the
//! well-known special types, a named (possibly generic) type symbol, or one
//! of the structural shapes (array, nullable, tuple, type parameter).

use crate::arena::{SymbolArena, SymbolId};
use crate::symbol::{SymbolKind, TypeKind};
use serde::{Deserialize, Serialize};

/// Well-known types the emitter treats specially.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpecialType {
    Void,
    Bool,
    Char,
    SByte,
    Byte,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Single,
    Double,
    String,
    Object,
    ValueType,
}

impl SpecialType {
    /// Whether values of this type are represented by a Lua number.
    pub fn is_numeric(self) -> bool {
        !matches!(
            self,
            SpecialType::Void
                | SpecialType::Bool
                | SpecialType::String
                | SpecialType::Object
                | SpecialType::ValueType
        )
    }

    /// Whether this is an integral numeric type.
    pub fn is_integral(self) -> bool {
        self.is_numeric() && !matches!(self, SpecialType::Single | SpecialType::Double)
    }

    /// Size in bytes, as `sizeof` reports it.
    pub fn size_of(self) -> Option<u32> {
        match self {
            SpecialType::Bool | SpecialType::SByte | SpecialType::Byte => Some(1),
            SpecialType::Char | SpecialType::Int16 | SpecialType::UInt16 => Some(2),
            SpecialType::Int32 | SpecialType::UInt32 | SpecialType::Single => Some(4),
            SpecialType::Int64 | SpecialType::UInt64 | SpecialType::Double => Some(8),
            _ => None,
        }
    }
}

/// A resolved reference to a type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TypeRef {
    /// One of the well-known primitive types.
    Special(SpecialType),
    /// A named type symbol with its type arguments (empty when non-generic).
    Named(NamedTypeRef),
    /// An array of `element` with the given rank (1 = vector).
    Array(ArrayTypeRef),
    /// Nullable-of-T.
    Nullable(Box<TypeRef>),
    /// A value tuple with the given element types.
    Tuple(Vec<TypeRef>),
    /// A generic type parameter, by declaration order.
    TypeParam(TypeParamRef),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedTypeRef {
    pub symbol: SymbolId,
    pub type_args: Vec<TypeRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayTypeRef {
    pub element: Box<TypeRef>,
    pub rank: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeParamRef {
    pub name: String,
    pub index: u32,
}

impl TypeRef {
    pub fn named(symbol: SymbolId) -> Self {
        TypeRef::Named(NamedTypeRef {
            symbol,
            type_args: Vec::new(),
        })
    }

    pub fn generic(symbol: SymbolId, type_args: Vec<TypeRef>) -> Self {
        TypeRef::Named(NamedTypeRef { symbol, type_args })
    }

    pub fn array(element: TypeRef) -> Self {
        TypeRef::Array(ArrayTypeRef {
            element: Box::new(element),
            rank: 1,
        })
    }

    pub fn multi_array(element: TypeRef, rank: u32) -> Self {
        TypeRef::Array(ArrayTypeRef {
            element: Box::new(element),
            rank,
        })
    }

    pub fn nullable(inner: TypeRef) -> Self {
        TypeRef::Nullable(Box::new(inner))
    }

    /// The special-type tag, if this reference is a well-known primitive.
    pub fn special(&self) -> Option<SpecialType> {
        match self {
            TypeRef::Special(s) => Some(*s),
            _ => None,
        }
    }

    pub fn is_void(&self) -> bool {
        matches!(self, TypeRef::Special(SpecialType::Void))
    }

    pub fn is_string(&self) -> bool {
        matches!(self, TypeRef::Special(SpecialType::String))
    }

    /// Whether the default value of this type is the nil sentinel rather
    /// than a zero value.
    pub fn is_nil_defaulted(&self, arena: &SymbolArena) -> bool {
        match self {
            TypeRef::Special(s) => matches!(s, SpecialType::String | SpecialType::Object),
            TypeRef::Nullable(_) | TypeRef::Array(_) | TypeRef::Tuple(_) => true,
            TypeRef::Named(n) => match &arena.get(n.symbol).kind {
                SymbolKind::Type(info) => !matches!(info.kind, TypeKind::Struct | TypeKind::Enum),
                _ => true,
            },
            TypeRef::TypeParam(_) => true,
        }
    }

    /// Whether this reference names an enum type.
    pub fn is_enum(&self, arena: &SymbolArena) -> bool {
        match self {
            TypeRef::Named(n) => matches!(
                &arena.get(n.symbol).kind,
                SymbolKind::Type(info) if info.kind == TypeKind::Enum
            ),
            _ => false,
        }
    }

    /// Whether a value of this static type can hold Lua `false`, which
    /// makes `or`-based null coalescing unsound.
    pub fn can_be_false(&self) -> bool {
        match self {
            TypeRef::Special(SpecialType::Bool) => true,
            TypeRef::Special(SpecialType::Object) => true,
            TypeRef::Nullable(inner) => inner.can_be_false(),
            TypeRef::TypeParam(_) => true,
            _ => false,
        }
    }

    /// Structural subtype test against `other`, walking base types through
    /// the arena. Used for `is`-pattern constant folding.
    pub fn is_subtype_of(&self, other: &TypeRef, arena: &SymbolArena) -> bool {
        if self == other {
            return true;
        }
        if matches!(other, TypeRef::Special(SpecialType::Object)) {
            return true;
        }
        let TypeRef::Named(n) = self else {
            return false;
        };
        let SymbolKind::Type(info) = &arena.get(n.symbol).kind else {
            return false;
        };
        if info.interfaces.iter().any(|i| i == other) {
            return true;
        }
        match &info.base {
            Some(base) => base == other || base.is_subtype_of(other, arena),
            None => false,
        }
    }
}

/// A compile-time constant value produced by the front-end's evaluator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConstValue {
    Nil,
    Bool(bool),
    Char(char),
    Int(i64),
    Float(f64),
    Str(String),
}

impl ConstValue {
    /// The zero value for a type, used when `default(T)` has no
    /// oracle-provided constant.
    pub fn zero_of(ty: &TypeRef, arena: &SymbolArena) -> ConstValue {
        match ty {
            TypeRef::Special(SpecialType::Bool) => ConstValue::Bool(false),
            TypeRef::Special(SpecialType::Char) => ConstValue::Char('\0'),
            TypeRef::Special(s) if s.is_integral() => ConstValue::Int(0),
            TypeRef::Special(SpecialType::Single | SpecialType::Double) => ConstValue::Float(0.0),
            TypeRef::Named(_) if ty.is_enum(arena) => ConstValue::Int(0),
            _ => ConstValue::Nil,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::{SymbolData, SymbolKind, TypeInfo, TypeKind};

    fn class(arena: &mut SymbolArena, name: &str, base: Option<TypeRef>) -> SymbolId {
        arena.alloc(SymbolData::new(
            name,
            SymbolKind::Type(TypeInfo {
                kind: TypeKind::Class,
                base,
                ..TypeInfo::default()
            }),
        ))
    }

    #[test]
    fn subtype_walks_bases() {
        let mut arena = SymbolArena::new();
        let animal = class(&mut arena, "Animal", None);
        let dog = class(&mut arena, "Dog", Some(TypeRef::named(animal)));

        let dog_ty = TypeRef::named(dog);
        let animal_ty = TypeRef::named(animal);
        assert!(dog_ty.is_subtype_of(&animal_ty, &arena));
        assert!(!animal_ty.is_subtype_of(&dog_ty, &arena));
        assert!(dog_ty.is_subtype_of(&TypeRef::Special(SpecialType::Object), &arena));
    }

    #[test]
    fn zero_values() {
        let arena = SymbolArena::new();
        assert_eq!(
            ConstValue::zero_of(&TypeRef::Special(SpecialType::Int32), &arena),
            ConstValue::Int(0)
        );
        assert_eq!(
            ConstValue::zero_of(&TypeRef::Special(SpecialType::String), &arena),
            ConstValue::Nil
        );
    }
}
