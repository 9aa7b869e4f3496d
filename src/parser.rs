//! Recursive-descent parser: [`crate::token::TokenStream`] → [`crate::ast::Context`].
//!
//! Grammar and resynchronisation policy per the Protocol Buffers language
//! reference, scoped to what [`crate::ast`] can represent.

use crate::ast::{
    Context, DeclAny, DefDecl, DefKind, ExprAny, ImportModifier, OptionEntry, Path, RangeDeclKind, TypeAny,
};
use crate::builtins::{is_decl_keyword, TypePrefix};
use crate::diagnostic::{Message, Report};
use crate::lexer;
use crate::source::File;
use crate::token::{Kind, TokenId};

/// Parses `file`'s text into a [`Context`], pushing diagnostics for
/// malformed input onto `report`. Never panics on malformed source.
///
/// # Examples
/// ```
/// use protocore::diagnostic::{Report, ReportOptions};
/// use protocore::parser::parse;
/// use protocore::source::File;
///
/// let file = File::new("a.proto", r#"syntax = "proto3"; message M { int32 x = 1; }"#);
/// let mut report = Report::new(ReportOptions::default());
/// let ctx = parse(&file, &mut report);
/// assert!(report.is_empty());
/// assert_eq!(ctx.root().len(), 2);
/// ```
pub fn parse(file: &File, report: &mut Report) -> Context {
    let _span = tracing::trace_span!("parse", path = file.path()).entered();
    let stream = lexer::lex(file, report);
    let significant: Vec<TokenId> = stream
        .ids()
        .filter(|id| !matches!(stream.kind(*id), Kind::Space | Kind::Comment))
        .collect();
    let mut ctx = Context::new(stream);
    let root = {
        let mut parser = Parser {
            ctx: &mut ctx,
            significant,
            pos: 0,
            report,
        };
        parser.parse_root()
    };
    ctx.set_root(root);
    ctx
}

struct Parser<'a> {
    ctx: &'a mut Context,
    significant: Vec<TokenId>,
    pos: usize,
    report: &'a mut Report,
}

impl<'a> Parser<'a> {
    fn current(&self) -> Option<TokenId> {
        self.significant.get(self.pos).copied()
    }

    fn current_text(&self) -> &str {
        match self.current() {
            Some(id) => self.ctx.tokens().text(id),
            None => "",
        }
    }

    fn is_eof(&self) -> bool {
        self.current().is_none()
    }

    fn bump(&mut self) -> TokenId {
        let id = self.current().expect("bump called at end of input");
        self.pos += 1;
        id
    }

    fn eat(&mut self, text: &str) -> Option<TokenId> {
        if self.current_text() == text {
            Some(self.bump())
        } else {
            None
        }
    }

    fn eat_kind(&mut self, kind: Kind) -> Option<TokenId> {
        match self.current() {
            Some(id) if self.ctx.tokens().kind(id) == kind => {
                self.pos += 1;
                Some(id)
            }
            _ => None,
        }
    }

    /// Like [`Self::eat_kind`], but reports an "expected-token" diagnostic
    /// when the current token doesn't match, for positions where the
    /// grammar requires a token of this kind rather than merely looking
    /// ahead for one.
    fn expect_kind(&mut self, kind: Kind, what: &str, production: &str) -> Option<TokenId> {
        if let Some(id) = self.eat_kind(kind) {
            return Some(id);
        }
        self.report_here(
            "expected-token",
            format!("expected {what} in {production}, found `{}`", self.current_text()),
        );
        None
    }

    /// Consumes `text`, reporting a "expected-token" diagnostic and
    /// leaving the cursor in place if it's not there.
    fn expect(&mut self, text: &str, production: &str) -> Option<TokenId> {
        if let Some(id) = self.eat(text) {
            return Some(id);
        }
        self.report_here(
            "expected-token",
            format!("expected `{text}` in {production}, found `{}`", self.current_text()),
        );
        None
    }

    fn report_here(&mut self, tag: &'static str, message: impl Into<String>) {
        let span = match self.current() {
            Some(id) => self.ctx.tokens().span(id),
            None => self.last_span(),
        };
        self.report.error(Message::new(tag, message).at(span, "here"));
    }

    fn last_span(&self) -> crate::source::Span {
        match self.significant.last() {
            Some(id) => self.ctx.tokens().span(*id),
            None => crate::source::Span::zero(),
        }
    }

    /// Skips tokens until `;` (consumed), `}` (left for the caller), a
    /// declaration keyword, or EOF.
    fn resync(&mut self) {
        while let Some(text) = self.current().map(|_| self.current_text().to_string()) {
            if text == ";" {
                self.bump();
                return;
            }
            if text == "}" || is_decl_keyword(&text) {
                return;
            }
            self.bump();
        }
    }

    fn parse_root(&mut self) -> Vec<DeclAny> {
        let mut decls = Vec::new();
        while !self.is_eof() {
            match self.parse_top_level_decl() {
                Some(decl) => decls.push(decl),
                None => self.resync(),
            }
        }
        decls
    }

    fn parse_top_level_decl(&mut self) -> Option<DeclAny> {
        match self.current_text() {
            ";" => Some(self.ctx.new_empty(self.bump())),
            "syntax" => self.parse_syntax(),
            "package" => self.parse_package(),
            "import" => self.parse_import(),
            "option" => self.parse_option_standalone(),
            "message" => self.parse_message(),
            "enum" => self.parse_enum(),
            "service" => self.parse_service(),
            "extend" => self.parse_extend(),
            _ => {
                self.report_here("unexpected-token", format!("unexpected `{}` at top level", self.current_text()));
                None
            }
        }
    }

    fn parse_syntax(&mut self) -> Option<DeclAny> {
        let keyword = self.bump();
        let eq = self.expect("=", "syntax declaration")?;
        let value = self.expect_kind(Kind::String, "a string literal", "syntax declaration")?;
        let semicolon = self.expect(";", "syntax declaration")?;
        Some(self.ctx.new_syntax(keyword, eq, value, semicolon))
    }

    fn parse_package(&mut self) -> Option<DeclAny> {
        let keyword = self.bump();
        let path = self.parse_path()?;
        let semicolon = self.expect(";", "package declaration")?;
        Some(self.ctx.new_package(keyword, path, semicolon))
    }

    fn parse_import(&mut self) -> Option<DeclAny> {
        let keyword = self.bump();
        let (modifier, modifier_token) = match self.current_text() {
            "public" => (Some(ImportModifier::Public), Some(self.bump())),
            "weak" => (Some(ImportModifier::Weak), Some(self.bump())),
            _ => (None, None),
        };
        let path = self.expect_kind(Kind::String, "a string literal", "import declaration")?;
        let semicolon = self.expect(";", "import declaration")?;
        Some(self.ctx.new_import(keyword, modifier, modifier_token, path, semicolon))
    }

    /// `name(.name)*`, optionally rooted with a leading `.`.
    fn parse_path(&mut self) -> Option<Path> {
        let start = if self.current_text() == "." {
            self.bump()
        } else {
            self.eat_kind(Kind::Ident)?
        };
        let mut end = start;
        if self.ctx.tokens().kind(start) == Kind::Punct {
            // Leading `.` consumed above; the root identifier follows it.
            end = self.eat_kind(Kind::Ident)?;
        }
        while self.current_text() == "." {
            self.bump();
            end = self.eat_kind(Kind::Ident)?;
        }
        Some(Path::new(start, end))
    }

    fn parse_type(&mut self) -> Option<TypeAny> {
        if self.current_text() == "map" && self.peek_is("<", 1) {
            let name_token = self.bump();
            let open = self.bump();
            let key = self.parse_type()?;
            let comma = self.expect(",", "map type")?;
            let value = self.parse_type()?;
            let close = self.expect(">", "map type")?;
            return Some(self.ctx.new_generic_type(name_token, open, key, comma, value, close));
        }
        if let Some(prefix) = TypePrefix::lookup(self.current_text()) {
            if prefix != TypePrefix::Stream {
                let prefix_token = self.bump();
                let inner = self.parse_type()?;
                return Some(self.ctx.new_prefixed_type(prefix, prefix_token, inner));
            }
        }
        self.parse_path().map(TypeAny::Path)
    }

    fn peek_is(&self, text: &str, offset: usize) -> bool {
        self.significant
            .get(self.pos + offset)
            .map(|id| self.ctx.tokens().text(*id) == text)
            .unwrap_or(false)
    }

    fn parse_message(&mut self) -> Option<DeclAny> {
        let keyword = self.bump();
        let name = self.parse_path()?;
        let body = self.parse_block(Self::parse_message_member)?;
        Some(self.ctx.new_def(DefDecl {
            kind: DefKind::Message,
            keyword,
            name,
            ty: None,
            number: None,
            number_token: None,
            extendee: None,
            options: Vec::new(),
            value: None,
            request_type: None,
            request_stream: false,
            response_type: None,
            response_stream: false,
            body: Some(body),
            semicolon: None,
        }))
    }

    fn parse_enum(&mut self) -> Option<DeclAny> {
        let keyword = self.bump();
        let name = self.parse_path()?;
        let body = self.parse_block(Self::parse_enum_member)?;
        Some(self.ctx.new_def(DefDecl {
            kind: DefKind::Enum,
            keyword,
            name,
            ty: None,
            number: None,
            number_token: None,
            extendee: None,
            options: Vec::new(),
            value: None,
            request_type: None,
            request_stream: false,
            response_type: None,
            response_stream: false,
            body: Some(body),
            semicolon: None,
        }))
    }

    fn parse_service(&mut self) -> Option<DeclAny> {
        let keyword = self.bump();
        let name = self.parse_path()?;
        let body = self.parse_block(Self::parse_service_member)?;
        Some(self.ctx.new_def(DefDecl {
            kind: DefKind::Service,
            keyword,
            name,
            ty: None,
            number: None,
            number_token: None,
            extendee: None,
            options: Vec::new(),
            value: None,
            request_type: None,
            request_stream: false,
            response_type: None,
            response_stream: false,
            body: Some(body),
            semicolon: None,
        }))
    }

    fn parse_extend(&mut self) -> Option<DeclAny> {
        let keyword = self.bump();
        let extendee = self.parse_path()?;
        let body = self.parse_block(Self::parse_message_member)?;
        Some(self.ctx.new_def(DefDecl {
            kind: DefKind::Extend,
            keyword,
            name: extendee,
            ty: None,
            number: None,
            number_token: None,
            extendee: Some(extendee),
            options: Vec::new(),
            value: None,
            request_type: None,
            request_stream: false,
            response_type: None,
            response_stream: false,
            body: Some(body),
            semicolon: None,
        }))
    }

    /// `{` member* `}`, calling `member` for each entry and resyncing
    /// past anything it rejects.
    fn parse_block(&mut self, mut member: impl FnMut(&mut Self) -> Option<DeclAny>) -> Option<crate::arena::Ptr<crate::ast::BodyDecl>> {
        let open = self.expect("{", "block")?;
        let mut decls = Vec::new();
        while self.current_text() != "}" && !self.is_eof() {
            match member(self) {
                Some(decl) => decls.push(decl),
                None => self.resync(),
            }
        }
        let close = self.expect("}", "block")?;
        match self.ctx.new_body(open, close, decls) {
            DeclAny::Body(ptr) => Some(ptr),
            _ => unreachable!("new_body always returns DeclAny::Body"),
        }
    }

    fn parse_message_member(&mut self) -> Option<DeclAny> {
        match self.current_text() {
            ";" => Some(self.ctx.new_empty(self.bump())),
            "message" => self.parse_message(),
            "enum" => self.parse_enum(),
            "extend" => self.parse_extend(),
            "oneof" => self.parse_oneof(),
            "reserved" => self.parse_reserved(),
            "extensions" => self.parse_extensions(),
            "option" => self.parse_option_standalone(),
            "group" => self.parse_group(),
            _ => self.parse_field(),
        }
    }

    fn parse_enum_member(&mut self) -> Option<DeclAny> {
        match self.current_text() {
            ";" => Some(self.ctx.new_empty(self.bump())),
            "option" => self.parse_option_standalone(),
            "reserved" => self.parse_reserved(),
            _ => self.parse_enum_value(),
        }
    }

    fn parse_service_member(&mut self) -> Option<DeclAny> {
        match self.current_text() {
            ";" => Some(self.ctx.new_empty(self.bump())),
            "option" => self.parse_option_standalone(),
            "rpc" => self.parse_method(),
            _ => {
                self.report_here("unexpected-token", format!("unexpected `{}` in service body", self.current_text()));
                None
            }
        }
    }

    fn parse_oneof_member(&mut self) -> Option<DeclAny> {
        match self.current_text() {
            ";" => Some(self.ctx.new_empty(self.bump())),
            "option" => self.parse_option_standalone(),
            _ => self.parse_field(),
        }
    }

    fn parse_oneof(&mut self) -> Option<DeclAny> {
        let keyword = self.bump();
        let name = self.parse_path()?;
        let body = self.parse_block(Self::parse_oneof_member)?;
        Some(self.ctx.new_def(DefDecl {
            kind: DefKind::OneOf,
            keyword,
            name,
            ty: None,
            number: None,
            number_token: None,
            extendee: None,
            options: Vec::new(),
            value: None,
            request_type: None,
            request_stream: false,
            response_type: None,
            response_stream: false,
            body: Some(body),
            semicolon: None,
        }))
    }

    fn parse_group(&mut self) -> Option<DeclAny> {
        let keyword = self.bump();
        let name = self.parse_path()?;
        let eq = self.expect("=", "group declaration")?;
        let number_token = self.expect_kind(Kind::Number, "a field number", "group declaration")?;
        let number = Some(ExprAny::Literal(number_token));
        let body = self.parse_block(Self::parse_message_member)?;
        let _ = eq;
        Some(self.ctx.new_def(DefDecl {
            kind: DefKind::Group,
            keyword,
            name,
            ty: None,
            number,
            number_token: Some(number_token),
            extendee: None,
            options: Vec::new(),
            value: None,
            request_type: None,
            request_stream: false,
            response_type: None,
            response_stream: false,
            body: Some(body),
            semicolon: None,
        }))
    }

    fn parse_field(&mut self) -> Option<DeclAny> {
        let ty = self.parse_type()?;
        let name = self.parse_path()?;
        let keyword = name.start; // proto3 bare fields have no introducing keyword; use the type's first token as the node's anchor.
        let eq = self.expect("=", "field declaration")?;
        let number_token = self.expect_kind(Kind::Number, "a field number", "field declaration")?;
        let _ = eq;
        let options = if self.current_text() == "[" {
            self.parse_inline_options()?
        } else {
            Vec::new()
        };
        let semicolon = self.expect(";", "field declaration")?;
        Some(self.ctx.new_def(DefDecl {
            kind: DefKind::Field,
            keyword,
            name,
            ty: Some(ty),
            number: Some(ExprAny::Literal(number_token)),
            number_token: Some(number_token),
            extendee: None,
            options,
            value: None,
            request_type: None,
            request_stream: false,
            response_type: None,
            response_stream: false,
            body: None,
            semicolon: Some(semicolon),
        }))
    }

    fn parse_enum_value(&mut self) -> Option<DeclAny> {
        let name = self.parse_path()?;
        let keyword = name.start;
        let eq = self.expect("=", "enum value declaration")?;
        let number = self.parse_expr()?;
        let _ = eq;
        let options = if self.current_text() == "[" {
            self.parse_inline_options()?
        } else {
            Vec::new()
        };
        let semicolon = self.expect(";", "enum value declaration")?;
        Some(self.ctx.new_def(DefDecl {
            kind: DefKind::EnumValue,
            keyword,
            name,
            ty: None,
            number: Some(number),
            number_token: None,
            extendee: None,
            options,
            value: None,
            request_type: None,
            request_stream: false,
            response_type: None,
            response_stream: false,
            body: None,
            semicolon: Some(semicolon),
        }))
    }

    fn parse_method(&mut self) -> Option<DeclAny> {
        let keyword = self.bump();
        let name = self.parse_path()?;
        self.expect("(", "rpc method")?;
        let request_stream = self.eat("stream").is_some();
        let request_type = self.parse_type()?;
        self.expect(")", "rpc method")?;
        self.expect("returns", "rpc method")?;
        self.expect("(", "rpc method")?;
        let response_stream = self.eat("stream").is_some();
        let response_type = self.parse_type()?;
        self.expect(")", "rpc method")?;

        let (body, semicolon) = if self.current_text() == "{" {
            (Some(self.parse_block(Self::parse_service_member)?), None)
        } else {
            (None, Some(self.expect(";", "rpc method")?))
        };

        Some(self.ctx.new_def(DefDecl {
            kind: DefKind::Method,
            keyword,
            name,
            ty: None,
            number: None,
            number_token: None,
            extendee: None,
            options: Vec::new(),
            value: None,
            request_type: Some(request_type),
            request_stream,
            response_type: Some(response_type),
            response_stream,
            body,
            semicolon,
        }))
    }

    fn parse_option_standalone(&mut self) -> Option<DeclAny> {
        let keyword = self.bump();
        let (name, _parenthesized) = self.parse_option_name()?;
        let eq = self.expect("=", "option declaration")?;
        let value = self.parse_expr()?;
        let _ = eq;
        let semicolon = self.expect(";", "option declaration")?;
        Some(self.ctx.new_def(DefDecl {
            kind: DefKind::Option,
            keyword,
            name,
            ty: None,
            number: None,
            number_token: None,
            extendee: None,
            options: Vec::new(),
            value: Some(value),
            request_type: None,
            request_stream: false,
            response_type: None,
            response_stream: false,
            body: None,
            semicolon: Some(semicolon),
        }))
    }

    fn parse_inline_options(&mut self) -> Option<Vec<OptionEntry>> {
        self.bump(); // "["
        let mut entries = Vec::new();
        if self.current_text() != "]" {
            loop {
                entries.push(self.parse_option_entry()?);
                if self.eat(",").is_none() {
                    break;
                }
            }
        }
        self.expect("]", "inline option list")?;
        Some(entries)
    }

    fn parse_option_entry(&mut self) -> Option<OptionEntry> {
        let (name, parenthesized) = self.parse_option_name()?;
        let eq = self.expect("=", "option entry")?;
        let value = self.parse_expr()?;
        Some(OptionEntry {
            name,
            parenthesized,
            eq,
            value,
        })
    }

    /// `name` or `(pkg.ext.name)`, optionally followed by `.more.path` —
    /// the extension reference's own trailing field path. The parens
    /// themselves are not part of the returned `Path`; whether they were
    /// present is reported separately, per `spec.md` §4.3.
    fn parse_option_name(&mut self) -> Option<(Path, bool)> {
        if self.current_text() == "(" {
            self.bump();
            let inner = self.parse_path()?;
            self.expect(")", "parenthesized option name")?;
            let mut end = inner.end;
            while self.current_text() == "." {
                self.bump();
                end = self.eat_kind(Kind::Ident)?;
            }
            Some((Path::new(inner.start, end), true))
        } else {
            Some((self.parse_path()?, false))
        }
    }

    fn parse_reserved(&mut self) -> Option<DeclAny> {
        let keyword = self.bump();
        let mut ranges = Vec::new();
        loop {
            if self.ctx.tokens().kind(self.current()?) == Kind::String {
                ranges.push(ExprAny::Literal(self.bump()));
            } else {
                ranges.push(self.parse_range_or_number()?);
            }
            if self.eat(",").is_none() {
                break;
            }
        }
        let semicolon = self.expect(";", "reserved declaration")?;
        Some(self.ctx.new_range(RangeDeclKind::Reserved, keyword, ranges, semicolon))
    }

    fn parse_extensions(&mut self) -> Option<DeclAny> {
        let keyword = self.bump();
        let mut ranges = Vec::new();
        loop {
            ranges.push(self.parse_range_or_number()?);
            if self.eat(",").is_none() {
                break;
            }
        }
        let semicolon = self.expect(";", "extensions declaration")?;
        Some(self.ctx.new_range(RangeDeclKind::Extensions, keyword, ranges, semicolon))
    }

    fn parse_range_or_number(&mut self) -> Option<ExprAny> {
        let lo = self.parse_expr()?;
        if let Some(to_keyword) = self.eat("to") {
            let hi = if self.current_text() == "max" {
                Some(ExprAny::Literal(self.bump()))
            } else {
                Some(self.parse_expr()?)
            };
            return Some(self.ctx.new_range_expr(lo, to_keyword, hi));
        }
        Some(lo)
    }

    fn parse_expr(&mut self) -> Option<ExprAny> {
        match self.current_text() {
            "[" => self.parse_array_expr(),
            "{" => self.parse_dict_expr(),
            "-" | "+" => {
                let op = self.bump();
                let operand = self.parse_expr()?;
                Some(self.ctx.new_prefixed_expr(op, operand))
            }
            _ => self.parse_primary_expr(),
        }
    }

    fn parse_primary_expr(&mut self) -> Option<ExprAny> {
        let id = self.current()?;
        match self.ctx.tokens().kind(id) {
            Kind::Number | Kind::String => {
                self.bump();
                Some(ExprAny::Literal(id))
            }
            Kind::Ident => self.parse_path().map(ExprAny::Path),
            _ => {
                self.report_here("unexpected-token", format!("expected a value, found `{}`", self.current_text()));
                None
            }
        }
    }

    fn parse_array_expr(&mut self) -> Option<ExprAny> {
        let open = self.bump();
        let mut elements = Vec::new();
        if self.current_text() != "]" {
            loop {
                elements.push(self.parse_expr()?);
                if self.eat(",").is_none() {
                    break;
                }
            }
        }
        let close = self.expect("]", "array literal")?;
        Some(self.ctx.new_array_expr(open, close, elements))
    }

    fn parse_dict_expr(&mut self) -> Option<ExprAny> {
        let open = self.bump();
        let mut entries = Vec::new();
        while self.current_text() != "}" && !self.is_eof() {
            entries.push(self.parse_dict_entry()?);
            self.eat(",");
        }
        let close = self.expect("}", "message literal")?;
        Some(self.ctx.new_dict_expr(open, close, entries))
    }

    fn parse_dict_entry(&mut self) -> Option<ExprAny> {
        let key = self.parse_primary_expr()?;
        let colon = self.eat(":");
        let value = self.parse_expr()?;
        Some(self.ctx.new_key_value_expr(key, colon, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::ReportOptions;

    fn parse_str(text: &str) -> (Context, Report) {
        let file = File::new("t.proto", text);
        let mut report = Report::new(ReportOptions::default());
        let ctx = parse(&file, &mut report);
        (ctx, report)
    }

    #[test]
    fn empty_source_parses_to_empty_root() {
        let (ctx, report) = parse_str("");
        assert!(report.is_empty());
        assert!(ctx.root().is_empty());
    }

    #[test]
    fn syntax_package_import_parse_cleanly() {
        let (ctx, report) = parse_str(
            r#"
            syntax = "proto3";
            package foo.bar;
            import public "other.proto";
            "#,
        );
        assert!(report.is_empty());
        assert_eq!(ctx.root().len(), 3);
    }

    #[test]
    fn message_with_fields_and_nested_types() {
        let (ctx, report) = parse_str(
            r#"
            message Outer {
                int32 id = 1;
                repeated string tags = 2;
                map<string, int32> counts = 3;
                enum Color { RED = 0; GREEN = 1; }
                message Inner { bool flag = 1; }
                oneof choice {
                    int32 a = 4;
                    string b = 5;
                }
                reserved 6, 9 to 11, "legacy_field";
                extensions 100 to max;
            }
            "#,
        );
        assert!(report.is_empty(), "{:#?}", report.diagnostics());
        assert_eq!(ctx.root().len(), 1);
        let DeclAny::Def(ptr) = ctx.root()[0] else { panic!("expected message Def") };
        let message = ctx.def(ptr);
        assert_eq!(message.classify(), DefKind::Message);
        let body = ctx.body(message.body.unwrap());
        assert_eq!(body.decls.len(), 7);
    }

    #[test]
    fn service_with_streaming_rpc() {
        let (ctx, report) = parse_str(
            r#"
            service Chat {
                rpc Stream(stream Message) returns (stream Message);
            }
            "#,
        );
        assert!(report.is_empty(), "{:#?}", report.diagnostics());
        let DeclAny::Def(service_ptr) = ctx.root()[0] else { panic!() };
        let body = ctx.body(ctx.def(service_ptr).body.unwrap());
        let DeclAny::Def(method_ptr) = body.decls[0] else { panic!() };
        let method = ctx.def(method_ptr);
        assert_eq!(method.classify(), DefKind::Method);
        assert!(method.request_stream);
        assert!(method.response_stream);
    }

    #[test]
    fn inline_and_standalone_options_parse() {
        let (ctx, report) = parse_str(
            r#"
            option java_package = "com.example";
            message M {
                int32 x = 1 [deprecated = true, (custom.rank) = 5];
            }
            "#,
        );
        assert!(report.is_empty(), "{:#?}", report.diagnostics());
        assert_eq!(ctx.root().len(), 2);
    }

    #[test]
    fn syntax_error_recovers_at_next_semicolon() {
        let (ctx, report) = parse_str(
            r#"
            message M { !!! int32 x = 1; }
            message N { bool ok = 1; }
            "#,
        );
        assert!(!report.is_empty());
        assert_eq!(ctx.root().len(), 2);
    }

    #[test]
    fn parser_never_panics_on_malformed_input() {
        for input in ["message", "message M {", "enum E { A = ", "service S { rpc", "syntax = ;"] {
            let (_, _report) = parse_str(input);
        }
    }
}
