//! AST nodes and the per-file [`Context`] that owns their arenas.
//!
//! Three type-erased wrappers — [`DeclAny`], [`ExprAny`], [`TypeAny`] —
//! stand in for the "kind tag + arena index" encoding `spec.md` §9
//! describes; a plain Rust enum already gives the niche-optimised,
//! compactly-encoded tagged union that description is asking for, so
//! there is no bit-packing to hand-roll. The one exception the spec
//! carves out — path nodes store their two token ids inline rather than
//! going through an arena — falls out naturally as an enum variant
//! holding a [`Path`] by value instead of a `Ptr<T>`.

pub mod decl;
pub mod expr;
pub mod ty;

use crate::arena::{Arena, Ptr};
use crate::token::{Kind, TokenId, TokenStream};

pub use decl::*;
pub use expr::*;
pub use ty::*;

/// A compact multi-identifier reference: an inclusive `[start, end]`
/// token range rather than a child collection (`spec.md` §3, §9).
///
/// Kept deliberately word-sized. Components are *not* materialised or
/// cached; [`Path::components`] and [`Path::split`] walk the token range
/// on demand. Both assume the common case of a path with no whitespace
/// or comments between its identifiers and separators — true for every
/// path the parser builds, since it consumes path tokens contiguously
/// off the cursor. A hand-constructed `Path` that violates this (e.g.
/// built directly from non-adjacent token ids) has unspecified
/// `components`/`split` behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Path {
    pub start: TokenId,
    pub end: TokenId,
}

impl Path {
    pub fn new(start: TokenId, end: TokenId) -> Self {
        Self { start, end }
    }

    /// A path consisting of a single token (the common case: an
    /// unqualified identifier).
    pub fn single(token: TokenId) -> Self {
        Self { start: token, end: token }
    }

    pub fn span(&self, stream: &TokenStream) -> crate::source::Span {
        stream.span(self.start).join(&stream.span(self.end))
    }

    fn ids(&self) -> impl Iterator<Item = TokenId> {
        let start = self.start.to_raw();
        let end = self.end.to_raw();
        (start..=end).map(TokenId::from_raw)
    }

    /// `true` if the path begins with a separator (`.foo.bar`), i.e. is
    /// rooted at the top-level package namespace.
    pub fn is_absolute(&self, stream: &TokenStream) -> bool {
        is_separator(stream.text(self.start))
    }

    /// The identifier text of each component, in order.
    pub fn components<'a>(&self, stream: &'a TokenStream) -> Vec<&'a str> {
        self.ids()
            .filter(|id| stream.kind(*id) == Kind::Ident)
            .map(|id| stream.text(id))
            .collect()
    }

    /// Splits this path into two contiguous halves after its `n`th
    /// component (1-indexed: `n == 1` puts one component in the first
    /// half). `join`ing the results (lexically concatenating their
    /// token ranges) always reproduces the original path exactly.
    ///
    /// Panics if `n` is zero or `n` is not less than the component
    /// count (there is nothing to split after the last component).
    pub fn split(&self, stream: &TokenStream, n: usize) -> (Path, Path) {
        let ids: Vec<TokenId> = self.ids().collect();
        let component_positions: Vec<usize> = ids
            .iter()
            .enumerate()
            .filter(|(_, id)| stream.kind(**id) == Kind::Ident)
            .map(|(i, _)| i)
            .collect();
        assert!(
            n >= 1 && n < component_positions.len(),
            "split index {n} out of range for a path with {} components",
            component_positions.len()
        );
        let first_last = component_positions[n - 1];
        let second_first = first_last + 1;
        let first = Path::new(ids[0], ids[first_last]);
        let second = Path::new(ids[second_first], ids[ids.len() - 1]);
        (first, second)
    }

    /// Lexically concatenates two token ranges back into one path.
    /// Requires `first.end`'s raw index to immediately precede
    /// `second.start`'s (i.e. the two halves came from a single
    /// contiguous range, as produced by [`Path::split`]).
    pub fn join(first: Path, second: Path) -> Path {
        assert_eq!(
            first.end.to_raw() + 1,
            second.start.to_raw(),
            "joined path halves must be contiguous in token order"
        );
        Path::new(first.start, second.end)
    }
}

fn is_separator(text: &str) -> bool {
    text == "." || text == "/"
}

/// A type-erased declaration. `Path`-free; declarations are never
/// paths, so every variant carries an arena pointer.
#[derive(Debug, Clone, Copy)]
pub enum DeclAny {
    Empty(Ptr<EmptyDecl>),
    Syntax(Ptr<SyntaxDecl>),
    Package(Ptr<PackageDecl>),
    Import(Ptr<ImportDecl>),
    Def(Ptr<DefDecl>),
    Body(Ptr<BodyDecl>),
    Range(Ptr<RangeDecl>),
}

/// A type-erased expression. The `Path` variant stores its two token
/// ids inline instead of going through an arena (`spec.md` §9).
#[derive(Debug, Clone, Copy)]
pub enum ExprAny {
    Literal(TokenId),
    Path(Path),
    Prefixed(Ptr<PrefixedExpr>),
    Range(Ptr<RangeExpr>),
    Array(Ptr<ArrayExpr>),
    Dict(Ptr<DictExpr>),
    KeyValue(Ptr<KeyValueExpr>),
}

/// A type-erased type reference. Same inline-`Path` treatment as
/// [`ExprAny`].
#[derive(Debug, Clone, Copy)]
pub enum TypeAny {
    Path(Path),
    Prefixed(Ptr<PrefixedType>),
    Generic(Ptr<GenericType>),
}

/// Owns one file's token stream and every per-kind AST arena. Node
/// factory methods live here so that the "every input token belongs to
/// this context" check (`spec.md` §9) happens at a single choke point.
pub struct Context {
    tokens: TokenStream,
    empties: Arena<EmptyDecl>,
    syntaxes: Arena<SyntaxDecl>,
    packages: Arena<PackageDecl>,
    imports: Arena<ImportDecl>,
    defs: Arena<DefDecl>,
    bodies: Arena<BodyDecl>,
    ranges: Arena<RangeDecl>,
    prefixed_exprs: Arena<PrefixedExpr>,
    range_exprs: Arena<RangeExpr>,
    array_exprs: Arena<ArrayExpr>,
    dict_exprs: Arena<DictExpr>,
    kv_exprs: Arena<KeyValueExpr>,
    prefixed_types: Arena<PrefixedType>,
    generic_types: Arena<GenericType>,
    root: Vec<DeclAny>,
}

impl Context {
    pub fn new(tokens: TokenStream) -> Self {
        Self {
            tokens,
            empties: Arena::new(),
            syntaxes: Arena::new(),
            packages: Arena::new(),
            imports: Arena::new(),
            defs: Arena::new(),
            bodies: Arena::new(),
            ranges: Arena::new(),
            prefixed_exprs: Arena::new(),
            range_exprs: Arena::new(),
            array_exprs: Arena::new(),
            dict_exprs: Arena::new(),
            kv_exprs: Arena::new(),
            prefixed_types: Arena::new(),
            generic_types: Arena::new(),
            root: Vec::new(),
        }
    }

    pub fn tokens(&self) -> &TokenStream {
        &self.tokens
    }

    pub fn tokens_mut(&mut self) -> &mut TokenStream {
        &mut self.tokens
    }

    pub fn root(&self) -> &[DeclAny] {
        &self.root
    }

    pub fn set_root(&mut self, decls: Vec<DeclAny>) {
        self.root = decls;
    }

    /// Panics if `id` is out of range for this context's stream — the
    /// "context membership" correctness check from `spec.md` §9, kept
    /// enabled unconditionally rather than gated behind `debug_assert!`.
    /// A bounds check is the full extent of what's verifiable: `TokenId`
    /// is a bare index with no context tag of its own (tagging it would
    /// double its size for every AST node that stores one), so a token
    /// id that happens to be in range for the wrong context's stream of
    /// similar length is not caught here.
    fn check_token(&self, id: TokenId) {
        assert!(
            id.is_none() || (id.to_raw() as usize) <= self.tokens.len(),
            "token {id:?} does not belong to this context"
        );
    }

    fn check_path(&self, path: Path) {
        self.check_token(path.start);
        self.check_token(path.end);
    }

    pub fn new_empty(&mut self, semicolon: TokenId) -> DeclAny {
        self.check_token(semicolon);
        DeclAny::Empty(self.empties.alloc(EmptyDecl { semicolon }))
    }

    pub fn new_syntax(&mut self, keyword: TokenId, eq: TokenId, value: TokenId, semicolon: TokenId) -> DeclAny {
        for id in [keyword, eq, value, semicolon] {
            self.check_token(id);
        }
        DeclAny::Syntax(self.syntaxes.alloc(SyntaxDecl {
            keyword,
            eq,
            value,
            semicolon,
        }))
    }

    pub fn new_package(&mut self, keyword: TokenId, path: Path, semicolon: TokenId) -> DeclAny {
        self.check_token(keyword);
        self.check_path(path);
        self.check_token(semicolon);
        DeclAny::Package(self.packages.alloc(PackageDecl {
            keyword,
            path,
            semicolon,
        }))
    }

    pub fn new_import(
        &mut self,
        keyword: TokenId,
        modifier: Option<ImportModifier>,
        modifier_token: Option<TokenId>,
        path: TokenId,
        semicolon: TokenId,
    ) -> DeclAny {
        self.check_token(keyword);
        if let Some(t) = modifier_token {
            self.check_token(t);
        }
        self.check_token(path);
        self.check_token(semicolon);
        DeclAny::Import(self.imports.alloc(ImportDecl {
            keyword,
            modifier,
            modifier_token,
            path,
            semicolon,
        }))
    }

    pub fn new_def(&mut self, def: DefDecl) -> DeclAny {
        self.check_token(def.keyword);
        self.check_path(def.name);
        if let Some(t) = def.number_token {
            self.check_token(t);
        }
        if let Some(s) = def.semicolon {
            self.check_token(s);
        }
        if let Some(extendee) = def.extendee {
            self.check_path(extendee);
        }
        for entry in &def.options {
            self.check_path(entry.name);
            self.check_token(entry.eq);
        }
        DeclAny::Def(self.defs.alloc(def))
    }

    pub fn new_body(&mut self, open: TokenId, close: TokenId, decls: Vec<DeclAny>) -> DeclAny {
        self.check_token(open);
        self.check_token(close);
        DeclAny::Body(self.bodies.alloc(BodyDecl { open, close, decls }))
    }

    pub fn new_range(&mut self, kind: RangeDeclKind, keyword: TokenId, ranges: Vec<ExprAny>, semicolon: TokenId) -> DeclAny {
        self.check_token(keyword);
        self.check_token(semicolon);
        DeclAny::Range(self.ranges.alloc(RangeDecl {
            kind,
            keyword,
            ranges,
            semicolon,
        }))
    }

    pub fn new_prefixed_expr(&mut self, op: TokenId, operand: ExprAny) -> ExprAny {
        self.check_token(op);
        ExprAny::Prefixed(self.prefixed_exprs.alloc(PrefixedExpr { op, operand }))
    }

    pub fn new_range_expr(&mut self, lo: ExprAny, to_keyword: TokenId, hi: Option<ExprAny>) -> ExprAny {
        self.check_token(to_keyword);
        ExprAny::Range(self.range_exprs.alloc(RangeExpr { lo, to_keyword, hi }))
    }

    pub fn new_array_expr(&mut self, open: TokenId, close: TokenId, elements: Vec<ExprAny>) -> ExprAny {
        self.check_token(open);
        self.check_token(close);
        ExprAny::Array(self.array_exprs.alloc(ArrayExpr { open, close, elements }))
    }

    pub fn new_dict_expr(&mut self, open: TokenId, close: TokenId, entries: Vec<ExprAny>) -> ExprAny {
        self.check_token(open);
        self.check_token(close);
        ExprAny::Dict(self.dict_exprs.alloc(DictExpr { open, close, entries }))
    }

    pub fn new_key_value_expr(&mut self, key: ExprAny, colon: Option<TokenId>, value: ExprAny) -> ExprAny {
        if let Some(c) = colon {
            self.check_token(c);
        }
        ExprAny::KeyValue(self.kv_exprs.alloc(KeyValueExpr { key, colon, value }))
    }

    pub fn new_prefixed_type(&mut self, prefix: crate::builtins::TypePrefix, prefix_token: TokenId, inner: TypeAny) -> TypeAny {
        self.check_token(prefix_token);
        TypeAny::Prefixed(self.prefixed_types.alloc(PrefixedType {
            prefix,
            prefix_token,
            inner,
        }))
    }

    pub fn new_generic_type(
        &mut self,
        name_token: TokenId,
        open: TokenId,
        key: TypeAny,
        comma: TokenId,
        value: TypeAny,
        close: TokenId,
    ) -> TypeAny {
        for id in [name_token, open, comma, close] {
            self.check_token(id);
        }
        TypeAny::Generic(self.generic_types.alloc(GenericType {
            name_token,
            open,
            key,
            comma,
            value,
            close,
        }))
    }

    pub fn empty(&self, ptr: Ptr<EmptyDecl>) -> &EmptyDecl {
        self.empties.deref(ptr)
    }
    pub fn syntax(&self, ptr: Ptr<SyntaxDecl>) -> &SyntaxDecl {
        self.syntaxes.deref(ptr)
    }
    pub fn package(&self, ptr: Ptr<PackageDecl>) -> &PackageDecl {
        self.packages.deref(ptr)
    }
    pub fn import(&self, ptr: Ptr<ImportDecl>) -> &ImportDecl {
        self.imports.deref(ptr)
    }
    pub fn def(&self, ptr: Ptr<DefDecl>) -> &DefDecl {
        self.defs.deref(ptr)
    }
    pub fn def_mut(&mut self, ptr: Ptr<DefDecl>) -> &mut DefDecl {
        self.defs.deref_mut(ptr)
    }
    pub fn body(&self, ptr: Ptr<BodyDecl>) -> &BodyDecl {
        self.bodies.deref(ptr)
    }
    pub fn range(&self, ptr: Ptr<RangeDecl>) -> &RangeDecl {
        self.ranges.deref(ptr)
    }
    pub fn prefixed_expr(&self, ptr: Ptr<PrefixedExpr>) -> &PrefixedExpr {
        self.prefixed_exprs.deref(ptr)
    }
    pub fn range_expr(&self, ptr: Ptr<RangeExpr>) -> &RangeExpr {
        self.range_exprs.deref(ptr)
    }
    pub fn array_expr(&self, ptr: Ptr<ArrayExpr>) -> &ArrayExpr {
        self.array_exprs.deref(ptr)
    }
    pub fn dict_expr(&self, ptr: Ptr<DictExpr>) -> &DictExpr {
        self.dict_exprs.deref(ptr)
    }
    pub fn key_value_expr(&self, ptr: Ptr<KeyValueExpr>) -> &KeyValueExpr {
        self.kv_exprs.deref(ptr)
    }
    pub fn prefixed_type(&self, ptr: Ptr<PrefixedType>) -> &PrefixedType {
        self.prefixed_types.deref(ptr)
    }
    pub fn generic_type(&self, ptr: Ptr<GenericType>) -> &GenericType {
        self.generic_types.deref(ptr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::File;
    use crate::token::Kind;

    fn path_stream(text: &str) -> (TokenStream, Path) {
        let file = File::new("p.proto", text);
        let mut stream = TokenStream::new(file);
        let mut ids = Vec::new();
        let mut offset = 0u32;
        for part in text.split_inclusive(['.', '/']) {
            let (ident, sep) = match part.strip_suffix(['.', '/']) {
                Some(ident) => (ident, Some(&part[ident.len()..])),
                None => (part, None),
            };
            let end = offset + ident.len() as u32;
            ids.push(stream.push_token(Kind::Ident, offset, end));
            offset = end;
            if let Some(sep) = sep {
                let sep_end = offset + sep.len() as u32;
                ids.push(stream.push_token(Kind::Punct, offset, sep_end));
                offset = sep_end;
            }
        }
        let path = Path::new(ids[0], *ids.last().unwrap());
        (stream, path)
    }

    #[test]
    fn components_split_on_dot() {
        let (stream, path) = path_stream("foo.bar.baz");
        assert_eq!(path.components(&stream), vec!["foo", "bar", "baz"]);
        assert!(!path.is_absolute(&stream));
    }

    #[test]
    fn absolute_path_detected() {
        let (stream, path) = path_stream(".foo.bar");
        assert!(path.is_absolute(&stream));
    }

    #[test]
    fn split_then_join_round_trips() {
        let (stream, path) = path_stream("foo.bar.baz");
        let (first, second) = path.split(&stream, 1);
        assert_eq!(first.components(&stream), vec!["foo"]);
        assert_eq!(second.components(&stream), vec!["bar", "baz"]);
        let joined = Path::join(first, second);
        assert_eq!(joined, path);
    }

    #[test]
    fn split_at_second_boundary() {
        let (stream, path) = path_stream("a.b.c.d");
        let (first, second) = path.split(&stream, 3);
        assert_eq!(first.components(&stream), vec!["a", "b", "c"]);
        assert_eq!(second.components(&stream), vec!["d"]);
        assert_eq!(Path::join(first, second), path);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn split_out_of_range_panics() {
        let (stream, path) = path_stream("foo.bar");
        let _ = path.split(&stream, 2);
    }

    #[test]
    fn context_rejects_out_of_range_token() {
        let file = File::new("a.proto", ";");
        let mut stream = TokenStream::new(file);
        stream.push_token(Kind::Punct, 0, 1);
        let mut ctx = Context::new(stream);

        let out_of_range = TokenId::from_raw(99);
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            ctx.new_empty(out_of_range);
        }));
        assert!(result.is_err());
    }
}
