//! Lexer, span-preserving AST arena, and diagnostic engine for the
//! front-end of a Protocol Buffers compiler.
//!
//! # Examples
//! ```
//! use protocore::diagnostic::{Report, ReportOptions};
//! use protocore::parser::parse;
//! use protocore::source::File;
//!
//! let file = File::new("a.proto", r#"syntax = "proto3"; message M { int32 x = 1; }"#);
//! let mut report = Report::new(ReportOptions::default());
//! let ctx = parse(&file, &mut report);
//! assert!(!report.has_errors());
//! assert_eq!(ctx.root().len(), 2);
//! ```

pub mod arena;
pub mod ast;
pub mod builtins;
pub mod diagnostic;
pub mod lexer;
pub mod parser;
pub mod source;
pub mod token;

pub use ast::Context;
pub use parser::parse;

use diagnostic::{Message, Report};
use source::File;

/// Decodes raw bytes as UTF-8 into a [`File`], the boundary where
/// `spec.md` §4.2's `NotUTF8` fatal check actually fires: once bytes
/// have become a `File` (backed by a Rust `String`), the type system
/// already guarantees valid UTF-8, so [`lexer::lex`] has nothing left to
/// check on that front.
pub fn decode_source(path: impl Into<String>, bytes: Vec<u8>, report: &mut Report) -> Option<File> {
    let path = path.into();
    match String::from_utf8(bytes) {
        Ok(text) => Some(File::new(path, text)),
        Err(e) => {
            let offset = e.utf8_error().valid_up_to() as u32;
            let lossy = String::from_utf8_lossy(e.as_bytes()).into_owned();
            let file = File::new(path.clone(), lossy);
            let span = file.span(offset, offset);
            report.error(Message::new("not-utf8", format!("{path} is not valid UTF-8")).at(span, "invalid UTF-8 starts here"));
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use diagnostic::ReportOptions;

    #[test]
    fn decode_source_rejects_invalid_utf8() {
        let mut report = Report::new(ReportOptions::default());
        let result = decode_source("bad.proto", vec![0xFF, 0xFE], &mut report);
        assert!(result.is_none());
        assert!(report.diagnostics().iter().any(|d| d.tag() == Some("not-utf8")));
    }

    #[test]
    fn decode_source_accepts_valid_utf8() {
        let mut report = Report::new(ReportOptions::default());
        let result = decode_source("good.proto", b"syntax = \"proto3\";".to_vec(), &mut report);
        assert!(result.is_some());
        assert!(report.is_empty());
    }
}
