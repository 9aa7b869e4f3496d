//! Levelled diagnostics with annotated spans, edit suggestions, and a
//! `Report` collection that supports canonical sorting, dedup, and
//! serialisation.

mod ice;
mod render;
mod serialize;

pub use ice::catch_ice;
pub use render::{hunk_diff, unified_diff, DiffHunk, RenderStyle};
pub use serialize::{DecodeError, ReportMessage};

use crate::builtins::Level;
use crate::source::Span;

/// A single machine-applicable text replacement, relative to the
/// offsets of the [`Snippet`] it's attached to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub start: u32,
    pub end: u32,
    pub replace: String,
}

impl Edit {
    pub fn new(start: u32, end: u32, replace: impl Into<String>) -> Self {
        Self {
            start,
            end,
            replace: replace.into(),
        }
    }
}

/// One annotated span within a [`Diagnostic`].
#[derive(Debug, Clone)]
pub struct Snippet {
    pub span: Span,
    pub message: String,
    pub primary: bool,
    pub page_break: bool,
    pub edits: Vec<Edit>,
}

impl Snippet {
    /// Checks that every edit's `[start, end]` lies inside this
    /// snippet's span, per the non-widening `suggest_edits` contract.
    fn edits_fit(&self) -> bool {
        self.edits
            .iter()
            .all(|e| e.start <= e.end && e.end <= self.span.len())
    }
}

/// A levelled diagnostic: a message plus any number of annotated
/// source spans, free-text notes and help, and ICE debug lines.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub level: Level,
    tag: Option<String>,
    message: Option<String>,
    in_file: Option<crate::source::File>,
    pub snippets: Vec<Snippet>,
    pub notes: Vec<String>,
    pub help: Vec<String>,
    pub debug: Vec<String>,
    pub sort_order: i64,
}

/// Populates an empty [`Diagnostic`]. Implemented by whatever
/// higher-level error value a caller wants to report; `Report::error`
/// and friends take one of these rather than a bare `Diagnostic` so
/// that the tag/message/snippet invariants are always applied through
/// the same narrow setter API.
pub trait Diagnose {
    fn diagnose(self, diagnostic: &mut Diagnostic);
}

impl Diagnostic {
    pub fn new(level: Level) -> Self {
        Self {
            level,
            tag: None,
            message: None,
            in_file: None,
            snippets: Vec::new(),
            notes: Vec::new(),
            help: Vec::new(),
            debug: Vec::new(),
            sort_order: 0,
        }
    }

    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    /// Sets the diagnostic's tag. Panics if already set — re-setting a
    /// tag is a programmer error (`spec.md` §7), not a user-input one.
    pub fn set_tag(&mut self, tag: impl Into<String>) -> &mut Self {
        assert!(self.tag.is_none(), "diagnostic tag set twice");
        self.tag = Some(tag.into());
        self
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn set_message(&mut self, message: impl Into<String>) -> &mut Self {
        assert!(self.message.is_none(), "diagnostic message set twice");
        self.message = Some(message.into());
        self
    }

    pub fn in_file(&self) -> Option<&crate::source::File> {
        self.in_file.as_ref()
    }

    pub fn set_in_file(&mut self, file: crate::source::File) -> &mut Self {
        assert!(self.in_file.is_none(), "diagnostic in_file set twice");
        self.in_file = Some(file);
        self
    }

    /// Adds an annotated span. A zero span is silently dropped (§3
    /// invariant). The first non-dropped snippet added becomes the
    /// diagnostic's primary snippet; every later one is secondary,
    /// regardless of what the caller might otherwise have wanted — "one
    /// primary, and it's the first one" is an invariant, not a choice.
    pub fn push_snippet(&mut self, span: Span, message: impl Into<String>) -> Option<usize> {
        self.push_snippet_with(span, message, false)
    }

    pub fn push_page_break_snippet(&mut self, span: Span, message: impl Into<String>) -> Option<usize> {
        self.push_snippet_with(span, message, true)
    }

    fn push_snippet_with(&mut self, span: Span, message: impl Into<String>, page_break: bool) -> Option<usize> {
        if span.is_zero() {
            return None;
        }
        let primary = self.snippets.is_empty();
        self.snippets.push(Snippet {
            span,
            message: message.into(),
            primary,
            page_break,
            edits: Vec::new(),
        });
        Some(self.snippets.len() - 1)
    }

    pub fn primary_snippet(&self) -> Option<&Snippet> {
        self.snippets.iter().find(|s| s.primary)
    }

    /// Attaches edits to a new snippet over `span`. Every edit's
    /// `[start, end]` must lie inside `span` (offsets are
    /// snippet-relative); violating that is a programmer error and
    /// panics, per §7. Renders in its own window prefixed `help:`.
    pub fn suggest_edits(&mut self, span: Span, message: impl Into<String>, edits: Vec<Edit>) {
        let Some(idx) = self.push_snippet(span, message) else {
            return;
        };
        self.snippets[idx].edits = edits;
        assert!(
            self.snippets[idx].edits_fit(),
            "suggested edit falls outside its snippet's span"
        );
    }

    /// Like [`Diagnostic::suggest_edits`], but widens the snippet's span
    /// to enclose every edit instead of panicking when one doesn't fit.
    pub fn suggest_edits_widening(&mut self, span: Span, message: impl Into<String>, edits: Vec<Edit>) {
        // Edit offsets are snippet-relative u32s that double as a
        // two's-complement i32 when an edit needs to reach before the
        // snippet's current start; that's why the widening math below
        // round-trips through i32, not a plain u32-to-i64 zero-extension.
        let offset = |raw: u32| -> i64 { raw as i32 as i64 };

        let mut widened_start = 0i64;
        let mut widened_end = span.len() as i64;
        for e in &edits {
            widened_start = widened_start.min(offset(e.start));
            widened_end = widened_end.max(offset(e.end));
        }
        let file = span.file().cloned();
        let new_span = match file {
            Some(file) => {
                let abs_start = (span.start as i64 + widened_start).max(0) as u32;
                let abs_end = (span.start as i64 + widened_end) as u32;
                file.span(abs_start, abs_end)
            }
            None => span,
        };
        let rebased: Vec<Edit> = edits
            .into_iter()
            .map(|e| Edit {
                start: (offset(e.start) - widened_start) as u32,
                end: (offset(e.end) - widened_start) as u32,
                replace: e.replace,
            })
            .collect();
        let Some(idx) = self.push_snippet(new_span, message) else {
            return;
        };
        self.snippets[idx].edits = rebased;
    }
}

/// Options controlling how a [`Report`] collects diagnostics.
#[derive(Debug, Clone)]
pub struct ReportOptions {
    /// Seed value for `Diagnostic::sort_order`; distinguishes
    /// diagnostics from different compiler stages in canonical sort.
    pub stage: i64,
    /// Number of stack frames to capture as debug text at each push.
    /// `0` disables tracing.
    pub tracing_depth: u32,
    pub keep_duplicates: bool,
    pub suppress_warnings: bool,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            stage: 0,
            tracing_depth: 0,
            keep_duplicates: false,
            suppress_warnings: false,
        }
    }
}

/// A collection of diagnostics accumulated over the course of parsing
/// (or any later compiler stage). Not safe to mutate from more than one
/// thread at a time (`spec.md` §5); parallelism is achieved by building
/// one `Report` per file and merging.
#[derive(Debug, Clone, Default)]
pub struct Report {
    pub options: ReportOptions,
    diagnostics: Vec<Diagnostic>,
}

impl Report {
    pub fn new(options: ReportOptions) -> Self {
        Self {
            options,
            diagnostics: Vec::new(),
        }
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn max_level(&self) -> Option<Level> {
        self.diagnostics.iter().map(|d| d.level).min()
    }

    /// `true` when the report contains a diagnostic at `Error` level or
    /// more severe — downstream stages should refuse to proceed
    /// (`spec.md` §7 "User-visible failure").
    pub fn has_errors(&self) -> bool {
        self.max_level().is_some_and(|l| l <= Level::Error)
    }

    pub fn error(&mut self, d: impl Diagnose) {
        self.push_level(Level::Error, d);
    }

    pub fn warn(&mut self, d: impl Diagnose) {
        self.push_level(Level::Warning, d);
    }

    pub fn remark(&mut self, d: impl Diagnose) {
        self.push_level(Level::Remark, d);
    }

    pub fn fatal(&mut self, d: impl Diagnose) {
        self.push_level(Level::Ice, d);
    }

    fn push_level(&mut self, level: Level, d: impl Diagnose) {
        if level == Level::Warning && self.options.suppress_warnings {
            return;
        }
        let mut diagnostic = Diagnostic::new(level);
        d.diagnose(&mut diagnostic);
        diagnostic.sort_order = self.options.stage;
        if self.options.tracing_depth > 0 {
            diagnostic.debug.extend(capture_trace(self.options.tracing_depth));
        }
        self.diagnostics.push(diagnostic);
    }

    /// Low-level push used by code that already built a full
    /// [`Diagnostic`] (e.g. `catch_ice`).
    pub fn push(&mut self, mut diagnostic: Diagnostic) {
        if diagnostic.level == Level::Warning && self.options.suppress_warnings {
            return;
        }
        if diagnostic.sort_order == 0 {
            diagnostic.sort_order = self.options.stage;
        }
        self.diagnostics.push(diagnostic);
    }

    /// Drops earlier duplicates of `(primary_span, tag)` for non-empty
    /// tags — the later one by original insertion order wins — then
    /// sorts into canonical order (primary file path, stage, primary
    /// start, primary end, tag, message). Dedup runs on insertion order,
    /// before the sort, so which duplicate survives never depends on
    /// how the sort key happens to order the message text. Idempotent:
    /// calling this twice in a row is the same as calling it once.
    pub fn canonicalize(&mut self) {
        if !self.options.keep_duplicates {
            let mut seen: std::collections::HashSet<(Option<(String, u32, u32)>, String)> =
                std::collections::HashSet::new();
            let mut keep = vec![true; self.diagnostics.len()];
            for i in (0..self.diagnostics.len()).rev() {
                let d = &self.diagnostics[i];
                let tag = d.tag().unwrap_or("").to_string();
                if tag.is_empty() {
                    continue;
                }
                let key = (dedup_span_key(d), tag);
                if seen.contains(&key) {
                    keep[i] = false;
                } else {
                    seen.insert(key);
                }
            }
            let mut idx = 0;
            self.diagnostics.retain(|_| {
                let k = keep[idx];
                idx += 1;
                k
            });
        }

        self.diagnostics.sort_by(|a, b| sort_key(a).cmp(&sort_key(b)));
    }

    pub fn render(&self, style: RenderStyle) -> String {
        render::render_report(self, style)
    }

    pub fn to_proto(&self) -> ReportMessage {
        serialize::to_proto(self)
    }

    pub fn from_proto(message: ReportMessage) -> Result<Report, DecodeError> {
        serialize::from_proto(message)
    }

    /// Merges another report's diagnostics into this one, preserving
    /// relative insertion order of each half.
    pub fn append(&mut self, mut other: Report) {
        self.diagnostics.append(&mut other.diagnostics);
    }
}

fn dedup_span_key(d: &Diagnostic) -> Option<(String, u32, u32)> {
    d.primary_snippet().map(|s| {
        (
            s.span.file().map(|f| f.path().to_string()).unwrap_or_default(),
            s.span.start,
            s.span.end,
        )
    })
}

fn sort_key(d: &Diagnostic) -> (String, i64, u32, u32, String, String) {
    let primary = d.primary_snippet();
    let path = primary
        .and_then(|s| s.span.file().map(|f| f.path().to_string()))
        .unwrap_or_default();
    let start = primary.map(|s| s.span.start).unwrap_or(0);
    let end = primary.map(|s| s.span.end).unwrap_or(0);
    (
        path,
        d.sort_order,
        start,
        end,
        d.tag().unwrap_or("").to_string(),
        d.message().unwrap_or("").to_string(),
    )
}

fn capture_trace(depth: u32) -> Vec<String> {
    let backtrace = std::backtrace::Backtrace::force_capture();
    format!("{backtrace}")
        .lines()
        .take(depth as usize)
        .map(str::to_owned)
        .collect()
}

/// Ad-hoc diagnostic: a plain message with zero or one primary
/// annotated span, for call sites that don't want to define a named
/// `Diagnose` type.
pub struct Message {
    pub tag: &'static str,
    pub text: String,
    pub span: Option<(Span, String)>,
}

impl Message {
    pub fn new(tag: &'static str, text: impl Into<String>) -> Self {
        Self {
            tag,
            text: text.into(),
            span: None,
        }
    }

    pub fn at(mut self, span: Span, label: impl Into<String>) -> Self {
        self.span = Some((span, label.into()));
        self
    }
}

impl Diagnose for Message {
    fn diagnose(self, diagnostic: &mut Diagnostic) {
        diagnostic.set_tag(self.tag);
        diagnostic.set_message(self.text);
        if let Some((span, label)) = self.span {
            diagnostic.push_snippet(span, label);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::File;

    fn file() -> File {
        File::new("a.proto", "0123456789")
    }

    #[test]
    fn tag_set_twice_panics() {
        let mut d = Diagnostic::new(Level::Error);
        d.set_tag("x");
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            d.set_tag("y");
        }));
        assert!(result.is_err());
    }

    #[test]
    fn zero_span_snippet_dropped() {
        let mut d = Diagnostic::new(Level::Error);
        assert_eq!(d.push_snippet(Span::zero(), "nope"), None);
        assert!(d.snippets.is_empty());
    }

    #[test]
    fn first_snippet_is_primary() {
        let f = file();
        let mut d = Diagnostic::new(Level::Error);
        d.push_snippet(f.span(0, 1), "first");
        d.push_snippet(f.span(2, 3), "second");
        assert!(d.snippets[0].primary);
        assert!(!d.snippets[1].primary);
    }

    #[test]
    fn suggest_edits_checks_bounds() {
        let f = file();
        let mut d = Diagnostic::new(Level::Error);
        let span = f.span(2, 8);
        d.suggest_edits(span, "help", vec![Edit::new(0, 2, "xx")]);
        assert_eq!(d.snippets[0].edits.len(), 1);
    }

    #[test]
    #[should_panic(expected = "outside its snippet")]
    fn suggest_edits_panics_out_of_bounds() {
        let f = file();
        let mut d = Diagnostic::new(Level::Error);
        let span = f.span(2, 4);
        d.suggest_edits(span, "help", vec![Edit::new(0, 10, "x")]);
    }

    #[test]
    fn suggest_edits_widening_expands_span() {
        let f = file();
        let mut d = Diagnostic::new(Level::Error);
        let span = f.span(4, 6);
        d.suggest_edits_widening(span, "help", vec![Edit::new(-2i64 as u32, 4, "x")]);
        // widened to start 2 positions earlier
        assert_eq!(d.snippets[0].span.start, 2);
    }

    #[test]
    fn canonicalize_sorts_by_path_then_stage_then_offset() {
        let f = file();
        let mut report = Report::default();
        let mut d1 = Diagnostic::new(Level::Error);
        d1.push_snippet(f.span(5, 6), "later");
        let mut d2 = Diagnostic::new(Level::Error);
        d2.push_snippet(f.span(1, 2), "earlier");
        report.push(d1);
        report.push(d2);
        report.canonicalize();
        assert_eq!(report.diagnostics()[0].primary_snippet().unwrap().span.start, 1);
    }

    #[test]
    fn canonicalize_dedups_same_tag_and_span_keeping_last() {
        let f = file();
        let mut report = Report::default();
        let mut d1 = Diagnostic::new(Level::Error);
        d1.set_tag("dup");
        d1.set_message("old");
        d1.push_snippet(f.span(1, 2), "x");
        let mut d2 = Diagnostic::new(Level::Error);
        d2.set_tag("dup");
        d2.set_message("new");
        d2.push_snippet(f.span(1, 2), "x");
        report.push(d1);
        report.push(d2);
        report.canonicalize();
        assert_eq!(report.diagnostics().len(), 1);
        assert_eq!(report.diagnostics()[0].message(), Some("new"));
    }

    #[test]
    fn canonicalize_is_idempotent() {
        let f = file();
        let mut report = Report::default();
        for i in 0..5u32 {
            let mut d = Diagnostic::new(Level::Warning);
            d.push_snippet(f.span(i, i + 1), "m");
            report.push(d);
        }
        report.canonicalize();
        let first_pass: Vec<_> = report
            .diagnostics()
            .iter()
            .map(|d| d.primary_snippet().unwrap().span.start)
            .collect();
        report.canonicalize();
        let second_pass: Vec<_> = report
            .diagnostics()
            .iter()
            .map(|d| d.primary_snippet().unwrap().span.start)
            .collect();
        assert_eq!(first_pass, second_pass);
    }

    #[test]
    fn suppress_warnings_drops_warnings() {
        let mut report = Report::new(ReportOptions {
            suppress_warnings: true,
            ..Default::default()
        });
        report.warn(Message::new("w", "a warning"));
        assert!(report.is_empty());
    }

    #[test]
    fn max_level_reports_most_severe() {
        let mut report = Report::default();
        report.warn(Message::new("w", "warn"));
        report.error(Message::new("e", "err"));
        assert_eq!(report.max_level(), Some(Level::Error));
        assert!(report.has_errors());
    }
}
