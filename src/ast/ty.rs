//! Type nodes (`spec.md` §3: path, prefixed, generic). Path types are a
//! [`super::TypeAny::Path`] variant, not a struct here.

use super::TypeAny;
use crate::builtins::TypePrefix;
use crate::token::TokenId;

/// `optional T` / `repeated T` / `required T` / `stream T`.
#[derive(Debug, Clone, Copy)]
pub struct PrefixedType {
    pub prefix: TypePrefix,
    pub prefix_token: TokenId,
    pub inner: TypeAny,
}

/// `map<K, V>`. `name_token` is the `map` identifier itself, kept for
/// span purposes even though the builtin is implied by being a
/// `GenericType` at all.
#[derive(Debug, Clone, Copy)]
pub struct GenericType {
    pub name_token: TokenId,
    pub open: TokenId,
    pub key: TypeAny,
    pub comma: TokenId,
    pub value: TypeAny,
    pub close: TokenId,
}
