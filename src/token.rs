//! Flat, indexable token stream with side tables for literals, bracket
//! fusion, and synthetic tokens.
//!
//! Tokens are identified by their integer index into the owning
//! [`TokenStream`]; index `0` (via [`TokenId::NONE`]) is the sentinel
//! "no token" and is never assigned to a real token.

use std::collections::HashMap;

use crate::source::{File, Span};

/// Stable token kind discriminants (`spec.md` §6: stable across
/// serialised forms).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[repr(u8)]
pub enum Kind {
    Unknown = 0,
    Space = 1,
    Comment = 2,
    Ident = 3,
    Number = 4,
    String = 5,
    Punct = 6,
    Unrecognized = 7,
}

/// Reified literal value for a `Number` or `String` token whose decoded
/// form differs from its raw source text.
///
/// Per `spec.md` §4.1/§4.2: a plain decimal integer that parses cleanly
/// as `u64` is *not* stored here — it is reparsed on demand from
/// `text()`. Only hex/octal/binary integers, overflowed floats, and
/// strings containing an escape or fusion are cached.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(u64),
    Float(f64),
    Str(String),
}

/// An index into a [`TokenStream`]. The zero value is the sentinel "no
/// token" ([`TokenId::NONE`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TokenId(u32);

impl TokenId {
    pub const NONE: TokenId = TokenId(0);

    pub fn is_none(self) -> bool {
        self.0 == 0
    }

    pub fn is_some(self) -> bool {
        !self.is_none()
    }

    fn slot(self) -> usize {
        debug_assert!(self.is_some(), "dereferenced the NONE token id");
        (self.0 - 1) as usize
    }

    fn from_slot(slot: usize) -> Self {
        TokenId(slot as u32 + 1)
    }

    /// Raw integer form, for embedding in type-erased AST wrappers and
    /// the serialised message form. `0` means "no token".
    pub fn to_raw(self) -> u32 {
        self.0
    }

    pub fn from_raw(raw: u32) -> Self {
        TokenId(raw)
    }
}

#[derive(Debug, Clone)]
struct Record {
    kind: Kind,
    start: u32,
    end: u32,
    synthetic: bool,
    /// Set when this token's source range has been logically absorbed
    /// into an earlier token (implicit string concatenation). The
    /// record itself is left in place — `around()` and raw indexing
    /// still see it — but default sibling iteration skips it.
    absorbed_into: Option<TokenId>,
}

/// Owns a file's token records plus the side tables keyed on
/// [`TokenId`]: literals, bracket fusion, and interior-child ranges.
pub struct TokenStream {
    file: File,
    records: Vec<Record>,
    literals: HashMap<TokenId, Literal>,
    open_to_close: HashMap<TokenId, TokenId>,
    close_to_open: HashMap<TokenId, TokenId>,
    /// For a fused open bracket: the inclusive range of interior tokens.
    children: HashMap<TokenId, (TokenId, TokenId)>,
    /// For a synthetic fused token (implicit string concatenation): the
    /// component tokens it replaces, in source order.
    synthetic_children: HashMap<TokenId, Vec<TokenId>>,
}

impl TokenStream {
    pub fn new(file: File) -> Self {
        Self {
            file,
            records: Vec::new(),
            literals: HashMap::new(),
            open_to_close: HashMap::new(),
            close_to_open: HashMap::new(),
            children: HashMap::new(),
            synthetic_children: HashMap::new(),
        }
    }

    pub fn file(&self) -> &File {
        &self.file
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn push(&mut self, kind: Kind, start: u32, end: u32, synthetic: bool) -> TokenId {
        let id = TokenId::from_slot(self.records.len());
        self.records.push(Record {
            kind,
            start,
            end,
            synthetic,
            absorbed_into: None,
        });
        id
    }

    pub fn push_token(&mut self, kind: Kind, start: u32, end: u32) -> TokenId {
        self.push(kind, start, end, false)
    }

    /// Mints a token not present in source text (e.g. the phantom
    /// closing bracket inserted during bracket legalisation).
    pub fn push_synthetic(&mut self, kind: Kind, at: u32) -> TokenId {
        self.push(kind, at, at, true)
    }

    pub fn kind(&self, id: TokenId) -> Kind {
        self.records[id.slot()].kind
    }

    pub fn set_kind(&mut self, id: TokenId, kind: Kind) {
        self.records[id.slot()].kind = kind;
    }

    pub fn is_synthetic(&self, id: TokenId) -> bool {
        self.records[id.slot()].synthetic
    }

    pub fn is_absorbed(&self, id: TokenId) -> bool {
        self.records[id.slot()].absorbed_into.is_some()
    }

    pub fn span(&self, id: TokenId) -> Span {
        let r = &self.records[id.slot()];
        self.file.span(r.start, r.end)
    }

    pub fn text(&self, id: TokenId) -> &str {
        let r = &self.records[id.slot()];
        &self.file.text()[r.start as usize..r.end as usize]
    }

    pub fn start(&self, id: TokenId) -> u32 {
        self.records[id.slot()].start
    }

    pub fn end(&self, id: TokenId) -> u32 {
        self.records[id.slot()].end
    }

    pub fn set_end(&mut self, id: TokenId, end: u32) {
        self.records[id.slot()].end = end;
    }

    pub fn literal(&self, id: TokenId) -> Option<&Literal> {
        self.literals.get(&id)
    }

    pub fn set_literal(&mut self, id: TokenId, literal: Literal) {
        self.literals.insert(id, literal);
    }

    pub fn delete_literal(&mut self, id: TokenId) {
        self.literals.remove(&id);
    }

    pub fn mark_absorbed(&mut self, id: TokenId, into: TokenId) {
        self.records[id.slot()].absorbed_into = Some(into);
    }

    /// Records that `open`/`close` are a matching bracket pair, and that
    /// the tokens strictly between them are `open`'s children.
    pub fn fuse_brackets(&mut self, open: TokenId, close: TokenId) {
        self.open_to_close.insert(open, close);
        self.close_to_open.insert(close, open);
        if close.0 > open.0 + 1 {
            self.children
                .insert(open, (TokenId(open.0 + 1), TokenId(close.0 - 1)));
        }
    }

    pub fn matching(&self, id: TokenId) -> Option<TokenId> {
        self.open_to_close
            .get(&id)
            .or_else(|| self.close_to_open.get(&id))
            .copied()
    }

    pub fn is_open_bracket(&self, id: TokenId) -> bool {
        self.open_to_close.contains_key(&id)
    }

    pub fn is_close_bracket(&self, id: TokenId) -> bool {
        self.close_to_open.contains_key(&id)
    }

    /// The interior token range of a fused open bracket, if it has any
    /// children (an empty `{}`/`()` pair has none).
    pub fn children(&self, open: TokenId) -> Option<(TokenId, TokenId)> {
        self.children.get(&open).copied()
    }

    pub fn set_synthetic_children(&mut self, id: TokenId, children: Vec<TokenId>) {
        self.synthetic_children.insert(id, children);
    }

    pub fn synthetic_children_of(&self, id: TokenId) -> Option<&[TokenId]> {
        self.synthetic_children.get(&id).map(Vec::as_slice)
    }

    /// Iterates every token id in source order, including whitespace,
    /// comments, and absorbed/synthetic tokens.
    pub fn all_ids(&self) -> impl Iterator<Item = TokenId> + '_ {
        (0..self.records.len()).map(TokenId::from_slot)
    }

    /// Iterates token ids in source order, skipping tokens absorbed by
    /// an earlier fused token. This is the view the parser's cursor
    /// walks by default.
    pub fn ids(&self) -> impl Iterator<Item = TokenId> + '_ {
        self.all_ids().filter(|id| !self.is_absorbed(*id))
    }

    /// Comments attributed to `id` as leading documentation: the maximal
    /// run of `Comment` tokens immediately before `id`, separated from
    /// each other and from `id` by at most one line break's worth of
    /// `Space` (a blank line breaks the run). Returned in source order.
    pub fn leading_comments(&self, id: TokenId) -> Vec<TokenId> {
        let mut comments = Vec::new();
        let mut i = id.slot();
        loop {
            if i == 0 {
                break;
            }
            let prev = TokenId::from_slot(i - 1);
            match self.kind(prev) {
                Kind::Space => {
                    if self.text(prev).matches('\n').count() > 1 {
                        break;
                    }
                    i -= 1;
                }
                Kind::Comment => {
                    comments.push(prev);
                    i -= 1;
                }
                _ => break,
            }
        }
        comments.reverse();
        comments
    }

    /// A single comment on the same source line as `id`, immediately
    /// following it with no intervening line break — e.g. `int32 x = 1;
    /// // trailing`.
    pub fn trailing_comment(&self, id: TokenId) -> Option<TokenId> {
        let mut i = id.slot() + 1;
        while i < self.records.len() {
            let next = TokenId::from_slot(i);
            match self.kind(next) {
                Kind::Space if !self.text(next).contains('\n') => i += 1,
                Kind::Comment => return Some(next),
                _ => return None,
            }
        }
        None
    }

    /// The innermost leaf token whose half-open span `[start, end)`
    /// contains `offset`, per `spec.md` §9's resolution of the
    /// `around()` open question. Offsets past the end of the file clamp
    /// to the last token.
    pub fn around(&self, offset: u32) -> TokenId {
        if self.records.is_empty() {
            return TokenId::NONE;
        }
        let text_len = self.file.text().len() as u32;
        let offset = offset.min(text_len);

        let mut best: Option<(usize, u32)> = None;
        for (i, r) in self.records.iter().enumerate() {
            let contains = r.start <= offset && (offset < r.end || (r.start == r.end && offset == r.start));
            if contains {
                let span_len = r.end - r.start;
                let better = match best {
                    Some((_, best_len)) => span_len <= best_len,
                    None => true,
                };
                if better {
                    best = Some((i, span_len));
                }
            }
        }
        match best {
            Some((i, _)) => TokenId::from_slot(i),
            None => TokenId::from_slot(self.records.len() - 1),
        }
    }
}

/// An ergonomic, borrowed view of a single token: the index plus a
/// reference to the owning stream, per `spec.md` §3 ("an index into a
/// per-context token stream plus a reference to that stream").
#[derive(Clone, Copy)]
pub struct Token<'a> {
    pub stream: &'a TokenStream,
    pub id: TokenId,
}

impl<'a> Token<'a> {
    pub fn kind(&self) -> Kind {
        self.stream.kind(self.id)
    }

    pub fn span(&self) -> Span {
        self.stream.span(self.id)
    }

    pub fn text(&self) -> &'a str {
        self.stream.text(self.id)
    }

    pub fn literal(&self) -> Option<&'a Literal> {
        self.stream.literal(self.id)
    }

    pub fn is_synthetic(&self) -> bool {
        self.stream.is_synthetic(self.id)
    }

    /// The integer value of a `Number` token, reparsing from `text()`
    /// when it wasn't cached (plain base-10 integers).
    pub fn as_int(&self) -> Option<u64> {
        match self.literal() {
            Some(Literal::Int(v)) => Some(*v),
            Some(Literal::Float(_)) | Some(Literal::Str(_)) => None,
            None => self.text().parse::<u64>().ok(),
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self.literal() {
            Some(Literal::Float(v)) => Some(*v),
            Some(Literal::Int(v)) => Some(*v as f64),
            Some(Literal::Str(_)) => None,
            None => self.text().parse::<f64>().ok(),
        }
    }

    /// The decoded value of a `String` token: the cached literal if any
    /// escape or fusion occurred, else the source text with its quotes
    /// stripped.
    pub fn as_string(&self) -> &'a str {
        match self.literal() {
            Some(Literal::Str(s)) => s.as_str(),
            _ => {
                let text = self.text();
                if text.len() >= 2 {
                    &text[1..text.len() - 1]
                } else {
                    text
                }
            }
        }
    }
}
