//! Hand-driven cursor lexer: text → [`TokenStream`] plus diagnostics.
//!
//! # Examples
//! ```
//! use protocore::diagnostic::{Report, ReportOptions};
//! use protocore::lexer::lex;
//! use protocore::source::File;
//!
//! let file = File::new("a.proto", "syntax = \"proto3\";");
//! let mut report = Report::new(ReportOptions::default());
//! let stream = lex(&file, &mut report);
//! assert!(report.is_empty());
//! assert!(stream.len() > 0);
//! ```

use crate::diagnostic::{Message, Report};
use crate::source::{File, MAX_FILE_SIZE};
use crate::token::{Kind, Literal, TokenId, TokenStream};

/// A byte-offset cursor over a file's text, stepping one Unicode scalar
/// value ("rune") at a time.
struct Cursor<'a> {
    text: &'a str,
    offset: usize,
}

impl<'a> Cursor<'a> {
    fn new(text: &'a str) -> Self {
        Self { text, offset: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.text[self.offset..].chars().next()
    }

    fn peek2(&self) -> Option<char> {
        let mut chars = self.text[self.offset..].chars();
        chars.next();
        chars.next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.offset += c.len_utf8();
        Some(c)
    }

    fn at_eof(&self) -> bool {
        self.offset >= self.text.len()
    }
}

/// Tokenizes `file`'s text into a fresh [`TokenStream`], pushing
/// diagnostics for malformed input onto `report`. Never panics on
/// malformed *source* — only an internal bug (no forward progress)
/// aborts via panic, per `spec.md` §4.2/§7.
///
/// `file`'s text is a Rust `String`, so the "NotUTF8" pre-flight check
/// from `spec.md` §4.2 has nowhere to fire here — the type system
/// already rejects invalid UTF-8 at the point raw bytes are decoded
/// into a `File` (see [`crate::decode_source`]). Only the `FileTooBig`
/// check applies at this layer.
pub fn lex(file: &File, report: &mut Report) -> TokenStream {
    let _span = tracing::trace_span!("lex", path = file.path()).entered();
    let mut stream = TokenStream::new(file.clone());

    if file.text().len() > MAX_FILE_SIZE {
        tracing::error!(path = file.path(), "source exceeds MAX_FILE_SIZE");
        report.error(
            Message::new(
                "file-too-big",
                format!(
                    "source file is {} bytes, exceeding the {} byte limit",
                    file.text().len(),
                    MAX_FILE_SIZE
                ),
            )
            .at(file.span(0, 0), "whole file"),
        );
        return stream;
    }

    let mut cursor = Cursor::new(file.text());
    let mut bracket_stack: Vec<(char, TokenId)> = Vec::new();

    while !cursor.at_eof() {
        let before = cursor.offset;
        let before_len = stream.len();
        dispatch(file, &mut cursor, &mut stream, &mut bracket_stack, report);
        if cursor.offset == before && stream.len() == before_len {
            panic!("lexer failed to make progress at byte offset {before}");
        }
    }

    legalise_unclosed_brackets(file, &mut stream, &mut bracket_stack, report);
    fuse_implicit_string_concatenation(&mut stream);

    stream
}

fn dispatch(file: &File, cursor: &mut Cursor, stream: &mut TokenStream, brackets: &mut Vec<(char, TokenId)>, report: &mut Report) {
    let c = cursor.peek().expect("dispatch called at EOF");

    if c.is_whitespace() {
        let start = cursor.offset as u32;
        while matches!(cursor.peek(), Some(c) if c.is_whitespace()) {
            cursor.bump();
        }
        stream.push_token(Kind::Space, start, cursor.offset as u32);
        return;
    }

    if c == '/' && cursor.peek2() == Some('/') {
        let start = cursor.offset as u32;
        cursor.bump();
        cursor.bump();
        while matches!(cursor.peek(), Some(c) if c != '\n') {
            cursor.bump();
        }
        stream.push_token(Kind::Comment, start, cursor.offset as u32);
        return;
    }

    if c == '/' && cursor.peek2() == Some('*') {
        let start = cursor.offset as u32;
        cursor.bump();
        cursor.bump();
        let mut closed = false;
        while !cursor.at_eof() {
            if cursor.peek() == Some('*') && cursor.peek2() == Some('/') {
                cursor.bump();
                cursor.bump();
                closed = true;
                break;
            }
            cursor.bump();
        }
        let end = cursor.offset as u32;
        if !closed {
            report.error(
                Message::new("unterminated", "unterminated block comment").at(file.span(start, start + 2), "comment opens here"),
            );
        }
        stream.push_token(Kind::Comment, start, end);
        return;
    }

    if c == '*' && cursor.peek2() == Some('/') {
        let start = cursor.offset as u32;
        cursor.bump();
        cursor.bump();
        let end = cursor.offset as u32;
        report.error(Message::new("unrecognized", "`*/` with no matching `/*`").at(file.span(start, end), "stray block comment terminator"));
        stream.push_token(Kind::Unrecognized, start, end);
        return;
    }

    if ";,/:=-".contains(c) {
        let start = cursor.offset as u32;
        cursor.bump();
        stream.push_token(Kind::Punct, start, cursor.offset as u32);
        return;
    }

    if "([{<".contains(c) {
        let start = cursor.offset as u32;
        cursor.bump();
        let id = stream.push_token(Kind::Punct, start, cursor.offset as u32);
        brackets.push((c, id));
        return;
    }

    if ")]}>".contains(c) {
        let start = cursor.offset as u32;
        cursor.bump();
        let id = stream.push_token(Kind::Punct, start, cursor.offset as u32);
        match brackets.pop() {
            Some((open_char, open_id)) => {
                if !brackets_match(open_char, c) {
                    report.error(
                        Message::new("unterminated", "mismatched brackets")
                            .at(stream.span(open_id), "opened here")
                            .at(stream.span(id), "does not match this closing bracket"),
                    );
                }
                stream.fuse_brackets(open_id, id);
            }
            None => {
                report.error(Message::new("unterminated", "closing bracket with no matching open bracket").at(stream.span(id), "here"));
            }
        }
        return;
    }

    if c == '"' || c == '\'' {
        lex_string(file, cursor, stream, report);
        return;
    }

    if c == '.' {
        if matches!(cursor.peek2(), Some(d) if d.is_ascii_digit()) {
            lex_number(file, cursor, stream, report);
        } else {
            let start = cursor.offset as u32;
            cursor.bump();
            stream.push_token(Kind::Punct, start, cursor.offset as u32);
        }
        return;
    }

    if c.is_ascii_digit() {
        lex_number(file, cursor, stream, report);
        return;
    }

    if c == '_' || c.is_alphabetic() {
        let start = cursor.offset as u32;
        let mut any_non_ascii = false;
        while matches!(cursor.peek(), Some(c) if c == '_' || c.is_alphanumeric()) {
            let c = cursor.bump().unwrap();
            any_non_ascii |= !c.is_ascii();
        }
        let end = cursor.offset as u32;
        let id = stream.push_token(Kind::Ident, start, end);
        if any_non_ascii {
            report.error(Message::new("non-ascii-ident", "identifier contains non-ASCII characters").at(stream.span(id), "here"));
        }
        return;
    }

    let start = cursor.offset as u32;
    while {
        cursor.bump();
        !cursor.at_eof() && !is_recognized_start(cursor.peek().unwrap())
    } {}
    let end = cursor.offset as u32;
    let id = stream.push_token(Kind::Unrecognized, start, end);
    report.error(Message::new("unrecognized", "unrecognized input").at(stream.span(id), "here"));
}

fn is_recognized_start(c: char) -> bool {
    c.is_whitespace()
        || c == '/'
        || ";,:=-([{<)]}>\"'.".contains(c)
        || c.is_ascii_digit()
        || c == '_'
        || c.is_alphabetic()
}

fn brackets_match(open: char, close: char) -> bool {
    matches!((open, close), ('(', ')') | ('[', ']') | ('{', '}') | ('<', '>'))
}

fn legalise_unclosed_brackets(file: &File, stream: &mut TokenStream, brackets: &mut [(char, TokenId)], report: &mut Report) {
    for &(_, open_id) in brackets.iter() {
        report.error(Message::new("unterminated", "unterminated bracket").at(stream.span(open_id), "opened here, never closed"));
        let eof = file.text().len() as u32;
        let close = stream.push_synthetic(Kind::Punct, eof);
        stream.fuse_brackets(open_id, close);
    }
}

/// Post-pass 2 (`spec.md` §4.2): fuses runs of `String` tokens separated
/// only by `Space`/`Comment` into one logical token.
fn fuse_implicit_string_concatenation(stream: &mut TokenStream) {
    let ids: Vec<TokenId> = stream.all_ids().collect();
    let mut i = 0;
    while i < ids.len() {
        if stream.kind(ids[i]) != Kind::String {
            i += 1;
            continue;
        }
        let first = ids[i];
        let mut last = first;
        let mut j = i + 1;
        loop {
            let mut k = j;
            while k < ids.len() && matches!(stream.kind(ids[k]), Kind::Space | Kind::Comment) {
                k += 1;
            }
            if k < ids.len() && stream.kind(ids[k]) == Kind::String {
                last = ids[k];
                j = k + 1;
            } else {
                break;
            }
        }
        if last != first {
            let mut value = String::new();
            let mut components = Vec::new();
            let mut k = i;
            while ids[k] != last {
                if stream.kind(ids[k]) == Kind::String {
                    value.push_str(decoded_string_value(stream, ids[k]));
                    components.push(ids[k]);
                }
                k += 1;
            }
            value.push_str(decoded_string_value(stream, last));
            components.push(last);

            let end = stream.end(last);
            stream.set_end(first, end);
            stream.set_literal(first, Literal::Str(value));
            for &component in &components[1..] {
                stream.mark_absorbed(component, first);
                stream.delete_literal(component);
            }
            stream.set_synthetic_children(first, components);
        }
        i = j.max(i + 1);
    }
}

fn decoded_string_value(stream: &TokenStream, id: TokenId) -> &str {
    match stream.literal(id) {
        Some(Literal::Str(s)) => s.as_str(),
        _ => {
            let text = stream.text(id);
            if text.len() >= 2 {
                &text[1..text.len() - 1]
            } else {
                text
            }
        }
    }
}

/// Number lexer (`spec.md` §4.2): consumes a maximal run of
/// letters/digits/`.`/`_` (plus a trailing `+`/`-` immediately after an
/// `e`/`E`), then classifies the resulting text.
fn lex_number(file: &File, cursor: &mut Cursor, stream: &mut TokenStream, report: &mut Report) {
    let start = cursor.offset as u32;
    while let Some(c) = cursor.peek() {
        if c.is_ascii_alphanumeric() || c == '.' || c == '_' {
            cursor.bump();
            if (c == 'e' || c == 'E') && matches!(cursor.peek(), Some('+') | Some('-')) {
                cursor.bump();
            }
        } else {
            break;
        }
    }
    let end = cursor.offset as u32;
    let text = &file.text()[start as usize..end as usize];
    let id = stream.push_token(Kind::Number, start, end);

    if let Some(rest) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        match u64::from_str_radix(rest, 16) {
            Ok(v) => stream.set_literal(id, Literal::Int(v)),
            Err(_) => report.error(overflow_or_invalid(text, rest, 16, stream.span(id))),
        }
    } else if let Some(rest) = text.strip_prefix("0o").or_else(|| text.strip_prefix("0O")) {
        match u64::from_str_radix(rest, 8) {
            Ok(v) => stream.set_literal(id, Literal::Int(v)),
            Err(_) => report.error(overflow_or_invalid(text, rest, 8, stream.span(id))),
        }
    } else if let Some(rest) = text.strip_prefix("0b").or_else(|| text.strip_prefix("0B")) {
        match u64::from_str_radix(rest, 2) {
            Ok(v) => stream.set_literal(id, Literal::Int(v)),
            Err(_) => report.error(overflow_or_invalid(text, rest, 2, stream.span(id))),
        }
    } else if text.len() > 1 && text.starts_with('0') && text[1..].bytes().all(|b| (b'0'..=b'7').contains(&b)) {
        match u64::from_str_radix(&text[1..], 8) {
            Ok(v) => stream.set_literal(id, Literal::Int(v)),
            Err(_) => report.error(overflow_or_invalid(text, &text[1..], 8, stream.span(id))),
        }
    } else if text.parse::<u64>().is_ok() {
        // Plain decimal u64: intentionally left uncached, per spec — the
        // fast path reparses it from `text()` on demand.
    } else if text.contains('.') || text.contains('e') || text.contains('E') {
        match text.parse::<f64>() {
            Ok(v) => stream.set_literal(id, Literal::Float(v)),
            Err(_) => report.error(Message::new("invalid-number", format!("`{text}` is not a valid number")).at(stream.span(id), "here")),
        }
    } else if text.parse::<i128>().is_ok() {
        // Decimal integer overflowed u64 but is otherwise well-formed:
        // float fallback, per spec's "on u64 range overflow for decimals
        // ... parse as float64".
        let v: f64 = text.parse().unwrap_or(f64::INFINITY);
        stream.set_literal(id, Literal::Float(v));
    } else {
        match text.parse::<f64>() {
            Ok(v) => stream.set_literal(id, Literal::Float(v)),
            Err(_) => report.error(Message::new("invalid-number", format!("`{text}` is not a valid number")).at(stream.span(id), "here")),
        }
    }
}

fn overflow_or_invalid(full_text: &str, digits: &str, radix: u32, span: crate::source::Span) -> Message {
    let all_valid_digits = !digits.is_empty() && digits.chars().all(|c| c.is_digit(radix));
    if all_valid_digits {
        Message::new("integer-overflow", format!("`{full_text}` overflows a 64-bit integer")).at(span, "here")
    } else {
        Message::new("invalid-number", format!("`{full_text}` is not a valid number")).at(span, "here")
    }
}

/// String lexer (`spec.md` §4.2): consumes from the opening quote to an
/// unescaped matching quote (or EOF), decoding escape sequences.
fn lex_string(file: &File, cursor: &mut Cursor, stream: &mut TokenStream, report: &mut Report) {
    let start = cursor.offset as u32;
    let quote = cursor.bump().unwrap();
    let mut decoded = String::new();
    let mut had_escape = false;
    let mut terminated = false;

    while let Some(c) = cursor.peek() {
        if c == quote {
            cursor.bump();
            terminated = true;
            break;
        }
        if c == '\\' {
            had_escape = true;
            let escape_start = cursor.offset as u32;
            cursor.bump();
            match decode_escape(cursor) {
                Some(decoded_char) => decoded.push(decoded_char),
                None => {
                    let escape_end = cursor.offset as u32;
                    report.error(
                        Message::new("invalid-escape", "invalid escape sequence").at(file.span(escape_start, escape_end.max(escape_start + 1)), "here"),
                    );
                }
            }
            continue;
        }
        if !is_graphic_string_char(c) {
            let char_start = cursor.offset as u32;
            cursor.bump();
            report.warn(Message::new("non-graphic-char", "non-graphic character in string literal").at(file.span(char_start, cursor.offset as u32), "here"));
            decoded.push(c);
            continue;
        }
        decoded.push(c);
        cursor.bump();
    }

    let end = cursor.offset as u32;
    let id = stream.push_token(Kind::String, start, end);
    if !terminated {
        report.error(Message::new("unterminated-string-literal", "unterminated string literal").at(file.span(start, start + 1), "string opens here"));
    }
    if had_escape {
        stream.set_literal(id, Literal::Str(decoded));
    }
}

fn is_graphic_string_char(c: char) -> bool {
    !c.is_control() || matches!(c, ' ' | '\n' | '\t' | '\r')
}

/// Decodes one escape sequence, cursor positioned just past the `\`.
/// Returns `None` on an invalid escape (the cursor still advances past
/// whatever was consumed while trying).
fn decode_escape(cursor: &mut Cursor) -> Option<char> {
    let c = cursor.bump()?;
    match c {
        'a' => Some('\u{07}'),
        'b' => Some('\u{08}'),
        'f' => Some('\u{0C}'),
        'n' => Some('\n'),
        'r' => Some('\r'),
        't' => Some('\t'),
        'v' => Some('\u{0B}'),
        '\\' => Some('\\'),
        '\'' => Some('\''),
        '"' => Some('"'),
        '?' => Some('?'),
        '0'..='7' => decode_numeric_escape(cursor, c, 8, 3),
        'x' => decode_fixed_hex_escape(cursor, 2, true),
        'u' => decode_fixed_hex_escape(cursor, 4, false),
        'U' => decode_fixed_hex_escape(cursor, 8, false),
        _ => None,
    }
}

fn decode_numeric_escape(cursor: &mut Cursor, first: char, radix: u32, max_digits: usize) -> Option<char> {
    let mut digits = String::new();
    digits.push(first);
    while digits.len() < max_digits && matches!(cursor.peek(), Some(c) if c.is_digit(radix)) {
        digits.push(cursor.bump().unwrap());
    }
    let value = u32::from_str_radix(&digits, radix).ok()?;
    if value > 0xFF {
        return None;
    }
    char::from_u32(value)
}

/// `\xNN` (1-2 hex digits) and `\uNNNN`/`\UNNNNNNNN` (exactly 4/8 hex
/// digits) all decode to a `char` here — this crate's string literals
/// are stored as `String`, so a byte escape is only accepted when it is
/// itself a valid Unicode scalar value.
fn decode_fixed_hex_escape(cursor: &mut Cursor, max_digits: usize, variable_length: bool) -> Option<char> {
    let mut digits = String::new();
    let min_digits = if variable_length { 1 } else { max_digits };
    while digits.len() < max_digits && matches!(cursor.peek(), Some(c) if c.is_ascii_hexdigit()) {
        digits.push(cursor.bump().unwrap());
    }
    if digits.len() < min_digits {
        return None;
    }
    let value = u32::from_str_radix(&digits, 16).ok()?;
    char::from_u32(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::ReportOptions;

    fn lex_str(text: &str) -> (File, TokenStream, Report) {
        let file = File::new("t.proto", text);
        let mut report = Report::new(ReportOptions::default());
        let stream = lex(&file, &mut report);
        (file, stream, report)
    }

    #[test]
    fn tokens_partition_source_exactly() {
        let (file, stream, _) = lex_str("message M {\n  int32 x = 1;\n}\n");
        let concatenated: String = stream.all_ids().map(|id| stream.text(id)).collect();
        assert_eq!(concatenated, file.text());
    }

    #[test]
    fn empty_declarations_produce_no_diagnostics() {
        let (_, stream, report) = lex_str(";;;\n");
        assert!(report.is_empty());
        let puncts: Vec<_> = stream.ids().filter(|id| stream.kind(*id) == Kind::Punct).collect();
        assert_eq!(puncts.len(), 3);
    }

    #[test]
    fn unterminated_block_comment_reports_one_error() {
        let (_, stream, report) = lex_str("/* hi\n");
        assert_eq!(report.diagnostics().len(), 1);
        assert_eq!(report.diagnostics()[0].tag(), Some("unterminated"));
        let comment = stream.all_ids().find(|id| stream.kind(*id) == Kind::Comment).unwrap();
        assert_eq!(stream.text(comment), "/* hi\n");
    }

    #[test]
    fn bracket_mismatch_reports_both_spans() {
        let (_, _, report) = lex_str("message M { oneof x ) }");
        let mismatch = report.diagnostics().iter().find(|d| d.tag() == Some("unterminated")).unwrap();
        assert_eq!(mismatch.snippets.len(), 2);
    }

    #[test]
    fn implicit_string_concat_reifies_and_preserves_comment_token() {
        let (_, stream, report) = lex_str("x = \"a\" /* c */ \"b\";");
        assert!(report.is_empty());
        let strings: Vec<_> = stream.all_ids().filter(|id| stream.kind(*id) == Kind::String).collect();
        assert_eq!(strings.len(), 2);
        let fused = strings[0];
        assert!(matches!(stream.literal(fused), Some(Literal::Str(s)) if s == "ab"));
        assert!(stream.is_absorbed(strings[1]));
        let comment = stream.all_ids().find(|id| stream.kind(*id) == Kind::Comment).unwrap();
        assert!(stream.start(comment) > stream.start(fused) && stream.start(comment) < stream.end(fused));
    }

    #[test]
    fn integer_overflow_hex_reports_once_no_panic() {
        let (_, stream, report) = lex_str("x = 0xFFFFFFFFFFFFFFFFFF;");
        let number = stream.all_ids().find(|id| stream.kind(*id) == Kind::Number).unwrap();
        assert_eq!(stream.kind(number), Kind::Number);
        let overflow: Vec<_> = report.diagnostics().iter().filter(|d| d.tag() == Some("integer-overflow")).collect();
        assert_eq!(overflow.len(), 1);
    }

    #[test]
    fn plain_decimal_int_is_not_cached_but_reparses_correctly() {
        let (_, stream, report) = lex_str("123");
        assert!(report.is_empty());
        let id = stream.all_ids().next().unwrap();
        assert_eq!(stream.literal(id), None);
        let tok = crate::token::Token { stream: &stream, id };
        assert_eq!(tok.as_int(), Some(123));
    }

    #[test]
    fn string_without_escapes_decodes_via_raw_slice() {
        let (_, stream, report) = lex_str("\"hello\"");
        assert!(report.is_empty());
        let id = stream.all_ids().next().unwrap();
        assert_eq!(stream.literal(id), None);
        let tok = crate::token::Token { stream: &stream, id };
        assert_eq!(tok.as_string(), "hello");
    }

    #[test]
    fn string_with_escape_decodes_and_caches() {
        let (_, stream, report) = lex_str("\"a\\nb\"");
        assert!(report.is_empty());
        let id = stream.all_ids().next().unwrap();
        let tok = crate::token::Token { stream: &stream, id };
        assert_eq!(tok.as_string(), "a\nb");
    }

    #[test]
    fn unterminated_string_literal_reports_error() {
        let (_, _, report) = lex_str("\"unterminated");
        assert!(report.diagnostics().iter().any(|d| d.tag() == Some("unterminated-string-literal")));
    }

    #[test]
    fn non_ascii_ident_warns_but_keeps_token() {
        let (_, stream, report) = lex_str("café");
        let id = stream.all_ids().next().unwrap();
        assert_eq!(stream.kind(id), Kind::Ident);
        assert!(report.diagnostics().iter().any(|d| d.tag() == Some("non-ascii-ident")));
    }

    #[test]
    fn file_too_big_aborts_with_empty_stream() {
        let huge = "x".repeat(MAX_FILE_SIZE + 1);
        let (_, stream, report) = lex_str(&huge);
        assert!(stream.is_empty());
        assert_eq!(report.diagnostics().len(), 1);
        assert_eq!(report.diagnostics()[0].tag(), Some("file-too-big"));
    }

    #[test]
    fn lexer_never_panics_on_malformed_input() {
        for input in ["@@@", "\"\\q\"", "0xZZZ", "/*", "{[(<", ")]}>"] {
            let (_, _, _report) = lex_str(input);
        }
    }
}
