//! Declaration nodes (`spec.md` §3: Empty, Syntax, Package, Import, Def,
//! Body, Range).

use super::{ExprAny, Path};
use crate::token::TokenId;

/// `;` with nothing before it.
#[derive(Debug, Clone, Copy)]
pub struct EmptyDecl {
    pub semicolon: TokenId,
}

/// `syntax = "proto3";`
#[derive(Debug, Clone, Copy)]
pub struct SyntaxDecl {
    pub keyword: TokenId,
    pub eq: TokenId,
    /// The string literal token carrying the syntax value.
    pub value: TokenId,
    pub semicolon: TokenId,
}

/// `package foo.bar;`
#[derive(Debug, Clone, Copy)]
pub struct PackageDecl {
    pub keyword: TokenId,
    pub path: Path,
    pub semicolon: TokenId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportModifier {
    Public,
    Weak,
}

/// `import [public|weak] "other.proto";`
#[derive(Debug, Clone, Copy)]
pub struct ImportDecl {
    pub keyword: TokenId,
    pub modifier: Option<ImportModifier>,
    pub modifier_token: Option<TokenId>,
    /// The string literal token naming the imported file.
    pub path: TokenId,
    pub semicolon: TokenId,
}

/// What kind of declaration a [`DefDecl`] represents. `spec.md` §3 calls
/// this `Classify()`; [`DefDecl::classify`] is the Rust spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefKind {
    Message,
    Enum,
    Service,
    Field,
    EnumValue,
    Method,
    OneOf,
    Extend,
    Group,
    Option,
}

/// A single `name = value` pair, standalone (`option foo = 1;`) or
/// inside an inline `[...]` option list on a field/enum value/method.
#[derive(Debug, Clone, Copy)]
pub struct OptionEntry {
    pub name: Path,
    /// `true` when the name was written as a parenthesized extension
    /// reference, e.g. `(custom.option)`. The parens themselves are not
    /// part of `name`.
    pub parenthesized: bool,
    pub eq: TokenId,
    pub value: ExprAny,
}

/// The unified declaration node for every construct `spec.md` §3 groups
/// under `Def`: message, enum, service, field, enum value, method,
/// oneof, extend, group, and standalone option. Which fields are
/// meaningful depends on `kind`; unused fields are left at their default
/// ([`TokenId::NONE`] / `None` / empty `Vec`).
#[derive(Debug, Clone)]
pub struct DefDecl {
    pub kind: DefKind,
    /// The introducing keyword (`message`, `enum`, `rpc`, ...). Absent
    /// (`TokenId::NONE`) for a bare proto3 field, which has none.
    pub keyword: TokenId,
    pub name: Path,
    /// Field/method parameter type, or (for a standalone `Field`) the
    /// declared type.
    pub ty: Option<super::TypeAny>,
    /// Field tag / enum value numeric literal, as an expression so that
    /// a `-1` enum value (a [`super::PrefixedExpr`]) is representable.
    pub number: Option<ExprAny>,
    pub number_token: Option<TokenId>,
    /// `extend`'s target message type.
    pub extendee: Option<Path>,
    /// Inline `[opt1 = v1, opt2 = v2]` list.
    pub options: Vec<OptionEntry>,
    /// Right-hand side of a standalone `option name = value;`.
    pub value: Option<ExprAny>,
    /// `rpc` request type and its `stream` modifier.
    pub request_type: Option<super::TypeAny>,
    pub request_stream: bool,
    /// `rpc` response type and its `stream` modifier.
    pub response_type: Option<super::TypeAny>,
    pub response_stream: bool,
    pub body: Option<crate::arena::Ptr<BodyDecl>>,
    pub semicolon: Option<TokenId>,
}

impl DefDecl {
    pub fn classify(&self) -> DefKind {
        self.kind
    }
}

/// A `{ ... }` block: a message/enum/service/oneof body, or the braced
/// form of a standalone declaration list.
#[derive(Debug, Clone)]
pub struct BodyDecl {
    pub open: TokenId,
    pub close: TokenId,
    pub decls: Vec<super::DeclAny>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeDeclKind {
    /// `reserved 1 to 5, 9, "foo";` — index ranges or name literals.
    Reserved,
    /// `extensions 100 to max;` — index ranges only.
    Extensions,
}

/// `reserved ...;` / `extensions ...;`
#[derive(Debug, Clone)]
pub struct RangeDecl {
    pub kind: RangeDeclKind,
    pub keyword: TokenId,
    pub ranges: Vec<ExprAny>,
    pub semicolon: TokenId,
}
