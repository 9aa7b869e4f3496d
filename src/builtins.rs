//! Small, named enumerations with bidirectional name↔value lookup:
//! primitive builtin types, type prefixes, and diagnostic levels.

/// Primitive scalar type names plus the two pseudo-keywords `map` and
/// `max` that appear in the same lexical position in `.proto` grammar
/// (field types, and the `reserved ... max` range bound respectively).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    Int32,
    Int64,
    Uint32,
    Uint64,
    Sint32,
    Sint64,
    Float,
    Double,
    Fixed32,
    Fixed64,
    Sfixed32,
    Sfixed64,
    Bool,
    String,
    Bytes,
    Map,
    Max,
    /// Not a recognised builtin name; the caller should treat the
    /// identifier as a user-defined type reference.
    Unknown,
}

const BUILTIN_TABLE: &[(&str, Builtin)] = &[
    ("int32", Builtin::Int32),
    ("int64", Builtin::Int64),
    ("uint32", Builtin::Uint32),
    ("uint64", Builtin::Uint64),
    ("sint32", Builtin::Sint32),
    ("sint64", Builtin::Sint64),
    ("float", Builtin::Float),
    ("double", Builtin::Double),
    ("fixed32", Builtin::Fixed32),
    ("fixed64", Builtin::Fixed64),
    ("sfixed32", Builtin::Sfixed32),
    ("sfixed64", Builtin::Sfixed64),
    ("bool", Builtin::Bool),
    ("string", Builtin::String),
    ("bytes", Builtin::Bytes),
    ("map", Builtin::Map),
    ("max", Builtin::Max),
];

impl Builtin {
    /// Case-sensitive lookup by identifier text. Unknown names map to
    /// [`Builtin::Unknown`] rather than `None`, matching the "unknown
    /// sentinel" behaviour `spec.md` §4.5 asks for.
    pub fn lookup(name: &str) -> Builtin {
        BUILTIN_TABLE
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, b)| *b)
            .unwrap_or(Builtin::Unknown)
    }

    pub fn name(self) -> Option<&'static str> {
        BUILTIN_TABLE.iter().find(|(_, b)| *b == self).map(|(n, _)| *n)
    }

    /// Excludes `map` and `max`, which are builtins only in the sense of
    /// sharing a lexical slot with scalar type names.
    pub fn is_primitive(self) -> bool {
        !matches!(self, Builtin::Map | Builtin::Max | Builtin::Unknown)
    }
}

/// Field/type modifier keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypePrefix {
    Optional,
    Repeated,
    Required,
    Stream,
}

const PREFIX_TABLE: &[(&str, TypePrefix)] = &[
    ("optional", TypePrefix::Optional),
    ("repeated", TypePrefix::Repeated),
    ("required", TypePrefix::Required),
    ("stream", TypePrefix::Stream),
];

impl TypePrefix {
    pub fn lookup(name: &str) -> Option<TypePrefix> {
        PREFIX_TABLE.iter().find(|(n, _)| *n == name).map(|(_, p)| *p)
    }

    pub fn name(self) -> &'static str {
        PREFIX_TABLE
            .iter()
            .find(|(_, p)| *p == self)
            .map(|(n, _)| *n)
            .expect("every TypePrefix variant is in PREFIX_TABLE")
    }
}

/// Diagnostic severity. Lower integer values are more severe; this
/// ordering is what canonical sort (`spec.md` §4.4) and `Ord` both use.
///
/// `note_level` referenced in `spec.md` §4.5 is reserved for internal
/// use (diagnostics attached to another diagnostic's notes rather than
/// pushed onto a `Report` directly) and is intentionally not a variant
/// here — nothing in this crate constructs a standalone "note" level
/// diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[repr(u8)]
pub enum Level {
    Ice = 1,
    Error = 2,
    Warning = 3,
    Remark = 4,
}

impl Level {
    pub fn as_str(self) -> &'static str {
        match self {
            Level::Ice => "internal compiler error",
            Level::Error => "error",
            Level::Warning => "warning",
            Level::Remark => "remark",
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `.proto` keywords that introduce a declaration, used by the parser's
/// resynchronisation logic (`spec.md` §4.3) to find a safe restart
/// point after a syntax error.
pub const DECL_KEYWORDS: &[&str] = &[
    "syntax",
    "package",
    "import",
    "option",
    "message",
    "enum",
    "service",
    "extend",
    "rpc",
    "oneof",
    "reserved",
    "extensions",
    "group",
];

pub fn is_decl_keyword(name: &str) -> bool {
    DECL_KEYWORDS.contains(&name)
}
