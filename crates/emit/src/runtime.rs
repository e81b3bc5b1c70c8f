//! Fixed names of the Lua runtime ABI the emitted code links against.
//!
//! The runtime library itself is hand-written Lua shipped separately; these
//! names are its stable surface.

pub const SYSTEM: &str = "System";

pub const NEW: &str = "System.new";
pub const TRY: &str = "System.try";
pub const USING: &str = "System.using";
pub const USING_X: &str = "System.usingX";
pub const IS: &str = "System.is";
pub const AS: &str = "System.as";
pub const CAST: &str = "System.cast";
pub const THROW: &str = "System.throw";
pub const TYPEOF: &str = "System.typeof";
pub const EACH: &str = "System.each";
pub const ARRAY: &str = "System.Array";
pub const MULTI_ARRAY: &str = "System.MultiArray";
pub const VALUE_TUPLE_CREATE: &str = "System.ValueTuple.create";
/// Semantically a heap array; the emitted call has no stack semantics.
pub const STACKALLOC: &str = "System.stackalloc";
pub const DEFAULT: &str = "System.default";
pub const ANONYMOUS_TYPE_CREATE: &str = "System.AnonymousType.create";
/// Query-operator home; reached through metadata code templates.
pub const LINQ_ENUMERABLE: &str = "System.Linq.Enumerable";
pub const YIELD_ITERATOR: &str = "System.yieldIteratorEnumerable";
pub const YIELD_RETURN: &str = "System.yieldReturn";
pub const TO_STRING: &str = "System.toString";
/// Threads the freshly-created object through an initializer closure.
pub const CREATE: &str = "System.create";
pub const NULLABLE: &str = "System.Nullable";
/// Truncated (toward-zero) integer remainder; Lua's `%` floors.
pub const MOD: &str = "System.mod";
pub const FMOD: &str = "math.fmod";
pub const DELEGATE_COMBINE: &str = "System.combine";
pub const DELEGATE_REMOVE: &str = "System.remove";

// Classic-dialect arithmetic and bit helpers.
pub const DIV: &str = "System.div";
pub const BAND: &str = "System.band";
pub const BOR: &str = "System.bor";
pub const BXOR: &str = "System.bxor";
pub const BNOT: &str = "System.bnot";
pub const SHL: &str = "System.sl";
pub const SHR: &str = "System.sr";

// Declaration helpers on the namespace object.
pub const NAMESPACE: &str = "System.namespace";
pub const NAMESPACE_PARAM: &str = "namespace";
pub const DECL_CLASS: &str = "class";
pub const DECL_STRUCT: &str = "struct";
pub const DECL_INTERFACE: &str = "interface";
pub const DECL_ENUM: &str = "enum";
pub const EXPORT_ENUM: &str = "System.exportEnum";

// Per-type metatable member names.
pub const CTOR: &str = "__ctor__";
pub const BASE: &str = "__base__";
pub const INHERITS: &str = "__inherits__";
pub const INTERFACES: &str = "__interfaces__";
pub const DEFAULT_MEMBER: &str = "__default__";
pub const ATTRIBUTES: &str = "__attributes__";
pub const CLONE: &str = "__clone__";
pub const NAME_MEMBER: &str = "__name__";
pub const KIND_MEMBER: &str = "__kind__";
pub const STATIC_CTOR: &str = "static";

// Accessor method prefixes for accessor-backed properties and events.
pub const GET_PREFIX: &str = "get_";
pub const SET_PREFIX: &str = "set_";
pub const ADD_PREFIX: &str = "add_";
pub const REMOVE_PREFIX: &str = "remove_";

// Control-flow rewrite names.
pub const CONTINUE_VAR: &str = "__continue__";
pub const CONTINUE_LABEL: &str = "continue";
