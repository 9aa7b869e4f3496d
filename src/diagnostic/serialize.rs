//! Portable, lossless serialisation of a [`Report`].
//!
//! The wire format is JSON via `serde_json` rather than raw protobuf
//! encoding (see `SPEC_FULL.md` §4.4/§9) — the file table records only
//! each file's path and declared byte length, never its text, so
//! `from_proto` can still validate that every offset is in range and
//! non-inverted without needing the original source available.

use serde::{Deserialize, Serialize};

use super::{Diagnostic, Edit, Report, ReportOptions, Snippet};
use crate::builtins::Level;
use crate::source::File;

#[derive(Debug, Serialize, Deserialize)]
pub struct FileDescriptor {
    pub path: String,
    pub len: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EditMessage {
    pub start: u32,
    pub end: u32,
    pub replace: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AnnotationMessage {
    pub file: Option<usize>,
    pub start: u32,
    pub end: u32,
    pub message: String,
    pub primary: bool,
    pub page_break: bool,
    pub edits: Vec<EditMessage>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DiagnosticMessage {
    pub level: Level,
    pub tag: Option<String>,
    pub message: Option<String>,
    pub in_file: Option<usize>,
    pub notes: Vec<String>,
    pub help: Vec<String>,
    pub debug: Vec<String>,
    pub sort_order: i64,
    pub annotations: Vec<AnnotationMessage>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReportMessage {
    pub files: Vec<FileDescriptor>,
    pub diagnostics: Vec<DiagnosticMessage>,
}

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("annotation references file index {0}, but the file table has only {1} entries")]
    FileIndexOutOfRange(usize, usize),
    #[error("annotation span [{0}, {1}) is inverted or out of range for file {2:?} (len {3})")]
    SpanOutOfRange(u32, u32, String, u32),
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub(super) fn to_proto(report: &Report) -> ReportMessage {
    let mut files: Vec<File> = Vec::new();
    let mut file_index = |f: Option<&File>| -> Option<usize> {
        let f = f?;
        if let Some(i) = files.iter().position(|seen| seen == f) {
            return Some(i);
        }
        files.push(f.clone());
        Some(files.len() - 1)
    };

    let mut diagnostics = Vec::with_capacity(report.diagnostics().len());
    for d in report.diagnostics() {
        let in_file = file_index(d.in_file());
        let annotations = d
            .snippets
            .iter()
            .map(|s| AnnotationMessage {
                file: file_index(s.span.file()),
                start: s.span.start,
                end: s.span.end,
                message: s.message.clone(),
                primary: s.primary,
                page_break: s.page_break,
                edits: s
                    .edits
                    .iter()
                    .map(|e| EditMessage {
                        start: e.start,
                        end: e.end,
                        replace: e.replace.clone(),
                    })
                    .collect(),
            })
            .collect();
        diagnostics.push(DiagnosticMessage {
            level: d.level,
            tag: d.tag().map(str::to_owned),
            message: d.message().map(str::to_owned),
            in_file,
            notes: d.notes.clone(),
            help: d.help.clone(),
            debug: d.debug.clone(),
            sort_order: d.sort_order,
            annotations,
        });
    }

    ReportMessage {
        files: files
            .iter()
            .map(|f| FileDescriptor {
                path: f.path().to_string(),
                len: f.text().len() as u32,
            })
            .collect(),
        diagnostics,
    }
}

pub(super) fn from_proto(message: ReportMessage) -> Result<Report, DecodeError> {
    // Placeholder files: no real source text survives the round trip,
    // only path and declared length. `File::eq` compares by path/identity
    // rather than content, so equality on the reconstructed `Report`
    // still holds; rendering source excerpts from these files would show
    // nothing useful and is out of scope for deserialised reports.
    let files: Vec<File> = message
        .files
        .iter()
        .map(|fd| File::new(fd.path.clone(), "\0".repeat(fd.len as usize)))
        .collect();

    let resolve_file = |idx: Option<usize>| -> Result<Option<File>, DecodeError> {
        match idx {
            None => Ok(None),
            Some(i) => files
                .get(i)
                .cloned()
                .map(Some)
                .ok_or(DecodeError::FileIndexOutOfRange(i, files.len())),
        }
    };

    let mut report = Report::new(ReportOptions::default());
    for dm in message.diagnostics {
        let in_file = resolve_file(dm.in_file)?;

        let mut snippets = Vec::with_capacity(dm.annotations.len());
        for a in dm.annotations {
            let file = resolve_file(a.file)?;
            if let Some(f) = &file {
                if a.start > a.end || a.end as usize > f.text().len() {
                    return Err(DecodeError::SpanOutOfRange(
                        a.start,
                        a.end,
                        f.path().to_string(),
                        f.text().len() as u32,
                    ));
                }
            }
            let span = match file {
                Some(f) => f.span(a.start, a.end),
                None => crate::source::Span::zero(),
            };
            snippets.push((
                Snippet {
                    span,
                    message: a.message,
                    primary: a.primary,
                    page_break: a.page_break,
                    edits: a
                        .edits
                        .into_iter()
                        .map(|e| Edit::new(e.start, e.end, e.replace))
                        .collect(),
                },
                a.primary,
            ));
        }

        // Primary-promotion: if no annotation claimed primary but at
        // least one exists, the first one becomes primary (spec §4.4).
        if !snippets.is_empty() && !snippets.iter().any(|(_, p)| *p) {
            snippets[0].0.primary = true;
        }

        let mut diagnostic = Diagnostic::new(dm.level);
        if let Some(tag) = dm.tag {
            diagnostic.set_tag(tag);
        }
        if let Some(msg) = dm.message {
            diagnostic.set_message(msg);
        }
        if let Some(f) = in_file {
            diagnostic.set_in_file(f);
        }
        diagnostic.notes = dm.notes;
        diagnostic.help = dm.help;
        diagnostic.debug = dm.debug;
        diagnostic.sort_order = dm.sort_order;
        diagnostic.snippets = snippets.into_iter().map(|(s, _)| s).collect();

        report.push(diagnostic);
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::ReportOptions;

    #[test]
    fn round_trip_preserves_diagnostics() {
        let file = File::new("a.proto", "message Foo {}\n");
        let mut report = Report::new(ReportOptions::default());
        let mut d = Diagnostic::new(Level::Error);
        d.set_tag("e0001");
        d.set_message("bad token");
        d.push_snippet(file.span(8, 11), "here");
        report.push(d);

        let message = report.to_proto();
        let json = serde_json::to_string(&message).unwrap();
        let decoded_message: ReportMessage = serde_json::from_str(&json).unwrap();
        let decoded = Report::from_proto(decoded_message).unwrap();

        assert_eq!(decoded.diagnostics().len(), 1);
        let d = &decoded.diagnostics()[0];
        assert_eq!(d.tag(), Some("e0001"));
        assert_eq!(d.message(), Some("bad token"));
        assert_eq!(d.primary_snippet().unwrap().span.start, 8);
        assert_eq!(d.primary_snippet().unwrap().span.end, 11);
    }

    #[test]
    fn from_proto_rejects_out_of_range_span() {
        let message = ReportMessage {
            files: vec![FileDescriptor {
                path: "a.proto".into(),
                len: 5,
            }],
            diagnostics: vec![DiagnosticMessage {
                level: Level::Error,
                tag: None,
                message: None,
                in_file: None,
                notes: vec![],
                help: vec![],
                debug: vec![],
                sort_order: 0,
                annotations: vec![AnnotationMessage {
                    file: Some(0),
                    start: 2,
                    end: 10,
                    message: "oops".into(),
                    primary: true,
                    page_break: false,
                    edits: vec![],
                }],
            }],
        };
        let result = Report::from_proto(message);
        assert!(matches!(result, Err(DecodeError::SpanOutOfRange(2, 10, _, 5))));
    }

    #[test]
    fn from_proto_promotes_first_annotation_to_primary_if_none_marked() {
        let file = File::new("a.proto", "0123456789");
        let message = ReportMessage {
            files: vec![FileDescriptor {
                path: "a.proto".into(),
                len: 10,
            }],
            diagnostics: vec![DiagnosticMessage {
                level: Level::Warning,
                tag: None,
                message: None,
                in_file: None,
                notes: vec![],
                help: vec![],
                debug: vec![],
                sort_order: 0,
                annotations: vec![AnnotationMessage {
                    file: Some(0),
                    start: 1,
                    end: 2,
                    message: "a".into(),
                    primary: false,
                    page_break: false,
                    edits: vec![],
                }],
            }],
        };
        let _ = &file;
        let decoded = Report::from_proto(message).unwrap();
        assert!(decoded.diagnostics()[0].snippets[0].primary);
    }
}
