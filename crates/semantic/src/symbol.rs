//! Symbol payloads attached to every resolved declaration.

use crate::arena::SymbolId;
use crate::types::{ConstValue, TypeRef};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Declared accessibility of a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Accessibility {
    #[default]
    Public,
    Internal,
    Protected,
    Private,
}

/// The data carried by every symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolData {
    pub name: String,
    pub kind: SymbolKind,
    /// Containing type or namespace, when any.
    pub containing: Option<SymbolId>,
    pub accessibility: Accessibility,
    pub is_static: bool,
    /// True when the symbol comes from a referenced binary rather than
    /// user source. Metadata symbols keep their original names.
    pub from_metadata: bool,
}

impl SymbolData {
    pub fn new(name: impl Into<String>, kind: SymbolKind) -> Self {
        SymbolData {
            name: name.into(),
            kind,
            containing: None,
            accessibility: Accessibility::Public,
            is_static: false,
            from_metadata: false,
        }
    }

    pub fn with_containing(mut self, containing: SymbolId) -> Self {
        self.containing = Some(containing);
        self
    }

    pub fn statics(mut self) -> Self {
        self.is_static = true;
        self
    }

    pub fn from_metadata(mut self) -> Self {
        self.from_metadata = true;
        self
    }

    /// The method payload, when this is a method symbol.
    pub fn as_method(&self) -> Option<&MethodInfo> {
        match &self.kind {
            SymbolKind::Method(m) => Some(m),
            _ => None,
        }
    }

    /// The type payload, when this is a type symbol.
    pub fn as_type(&self) -> Option<&TypeInfo> {
        match &self.kind {
            SymbolKind::Type(t) => Some(t),
            _ => None,
        }
    }
}

/// Per-kind symbol payloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SymbolKind {
    Namespace,
    Type(TypeInfo),
    Method(MethodInfo),
    Property(PropertyInfo),
    Event(EventInfo),
    Field(FieldInfo),
    Parameter(ParamData),
    Local(LocalInfo),
}

/// Kind of a type declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TypeKind {
    #[default]
    Class,
    Struct,
    Interface,
    Enum,
    Delegate,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TypeInfo {
    pub kind: TypeKind,
    /// Type parameter names, declaration order.
    pub type_params: Vec<String>,
    /// Direct base type, if declared. `None` means the runtime default
    /// (`System.Object` for classes, `System.ValueType` for structs).
    pub base: Option<TypeRef>,
    pub interfaces: Vec<TypeRef>,
    /// Number of declared instance constructors; chooses between the
    /// single-function and indexed `__ctor__` call forms.
    pub ctors: u32,
}

impl TypeInfo {
    /// Generic arity (number of type parameters).
    pub fn arity(&self) -> usize {
        self.type_params.len()
    }
}

/// Passing mode of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ParamMode {
    #[default]
    Value,
    Ref,
    Out,
}

/// A method parameter as seen from its method's signature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamInfo {
    /// The parameter's own symbol, for body references and renaming.
    pub symbol: SymbolId,
    pub name: String,
    pub ty: TypeRef,
    pub mode: ParamMode,
    pub is_params: bool,
    /// Declared default value, when the parameter is optional.
    pub default: Option<ConstValue>,
}

/// Payload for a parameter symbol itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamData {
    pub ty: TypeRef,
    pub mode: ParamMode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalInfo {
    pub ty: TypeRef,
}

/// Operator methods the emitter routes through stable names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperatorKind {
    Addition,
    Subtraction,
    Multiply,
    Division,
    Modulus,
    UnaryNegation,
    Equality,
    Inequality,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    Implicit,
    Explicit,
}

impl OperatorKind {
    /// The stable method name the runtime's metatable adapter looks up.
    pub fn method_name(self) -> &'static str {
        match self {
            OperatorKind::Addition => "op_Addition",
            OperatorKind::Subtraction => "op_Subtraction",
            OperatorKind::Multiply => "op_Multiply",
            OperatorKind::Division => "op_Division",
            OperatorKind::Modulus => "op_Modulus",
            OperatorKind::UnaryNegation => "op_UnaryNegation",
            OperatorKind::Equality => "op_Equality",
            OperatorKind::Inequality => "op_Inequality",
            OperatorKind::LessThan => "op_LessThan",
            OperatorKind::LessThanOrEqual => "op_LessThanOrEqual",
            OperatorKind::GreaterThan => "op_GreaterThan",
            OperatorKind::GreaterThanOrEqual => "op_GreaterThanOrEqual",
            OperatorKind::Implicit => "op_Implicit",
            OperatorKind::Explicit => "op_Explicit",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodInfo {
    pub params: SmallVec<[ParamInfo; 4]>,
    pub return_type: TypeRef,
    pub type_params: Vec<String>,
    /// 1-based overload index among the containing type's instance
    /// constructors, in source order. Zero for non-constructors.
    pub ctor_index: u32,
    pub is_static_ctor: bool,
    pub is_extension: bool,
    pub operator: Option<OperatorKind>,
    pub is_entry_point: bool,
    pub explicit_interface: bool,
    /// The overridden method, when this symbol overrides one.
    pub overrides: Option<SymbolId>,
    /// True when the body contains `yield`, making this an iterator.
    pub is_iterator: bool,
}

impl MethodInfo {
    pub fn new(return_type: TypeRef) -> Self {
        MethodInfo {
            params: SmallVec::new(),
            return_type,
            type_params: Vec::new(),
            ctor_index: 0,
            is_static_ctor: false,
            is_extension: false,
            operator: None,
            is_entry_point: false,
            explicit_interface: false,
            overrides: None,
            is_iterator: false,
        }
    }

    pub fn is_ctor(&self) -> bool {
        self.ctor_index != 0
    }

    pub fn returns_void(&self) -> bool {
        self.return_type.is_void()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyInfo {
    pub ty: TypeRef,
    pub has_getter: bool,
    pub has_setter: bool,
    /// Auto-property with no accessor bodies.
    pub is_auto: bool,
    /// Implements an interface member, which forces accessor methods.
    pub is_interface_impl: bool,
    pub is_indexer: bool,
    /// Virtual or override, which forces accessor methods.
    pub is_overridable: bool,
}

impl PropertyInfo {
    pub fn auto(ty: TypeRef) -> Self {
        PropertyInfo {
            ty,
            has_getter: true,
            has_setter: true,
            is_auto: true,
            is_interface_impl: false,
            is_indexer: false,
            is_overridable: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventInfo {
    pub ty: TypeRef,
    /// Declared add/remove accessors, which force method emission.
    pub has_accessors: bool,
    pub is_interface_impl: bool,
    pub is_overridable: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldInfo {
    pub ty: TypeRef,
    pub is_const: bool,
    /// Constant value for `const` fields and enum members.
    pub const_value: Option<ConstValue>,
}

impl FieldInfo {
    pub fn plain(ty: TypeRef) -> Self {
        FieldInfo {
            ty,
            is_const: false,
            const_value: None,
        }
    }
}
