//! Terminal rendering of a [`Report`]: level/message headers, annotated
//! source excerpts with caret underlines, and unified/hunk diffs for
//! edit-suggesting snippets.

use super::{Diagnostic, Edit, Report, Snippet};
use crate::builtins::Level;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStyle {
    Colored,
    Monochrome,
}

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";

fn level_color(level: Level) -> &'static str {
    match level {
        Level::Ice => "\x1b[35m",
        Level::Error => "\x1b[31m",
        Level::Warning => "\x1b[33m",
        Level::Remark => "\x1b[36m",
    }
}

pub(super) fn render_report(report: &Report, style: RenderStyle) -> String {
    let mut out = String::new();
    for diagnostic in report.diagnostics() {
        render_diagnostic(diagnostic, style, &mut out);
        out.push('\n');
    }
    out
}

fn paint(style: RenderStyle, code: &str, text: &str, out: &mut String) {
    match style {
        RenderStyle::Colored => {
            out.push_str(code);
            out.push_str(text);
            out.push_str(RESET);
        }
        RenderStyle::Monochrome => out.push_str(text),
    }
}

fn render_diagnostic(diagnostic: &Diagnostic, style: RenderStyle, out: &mut String) {
    paint(style, level_color(diagnostic.level), diagnostic.level.as_str(), out);
    if let Some(tag) = diagnostic.tag() {
        out.push('[');
        out.push_str(tag);
        out.push(']');
    }
    out.push_str(": ");
    paint(style, BOLD, diagnostic.message().unwrap_or(""), out);
    out.push('\n');

    for snippet in &diagnostic.snippets {
        render_snippet(snippet, style, out);
        if snippet.page_break {
            out.push_str("...\n");
        }
    }

    for note in &diagnostic.notes {
        out.push_str("  = note: ");
        out.push_str(note);
        out.push('\n');
    }
    for help in &diagnostic.help {
        out.push_str("  = help: ");
        out.push_str(help);
        out.push('\n');
    }
}

fn render_snippet(snippet: &Snippet, style: RenderStyle, out: &mut String) {
    let Some(file) = snippet.span.file() else {
        out.push_str("  --> <no file>\n");
        return;
    };
    let loc = snippet.span.start_loc().expect("file present implies location");
    out.push_str(&format!(
        "  --> {}:{}:{}\n",
        file.path(),
        loc.line + 1,
        loc.column_utf8 + 1
    ));

    let line_start = file.text()[..snippet.span.start as usize]
        .rfind('\n')
        .map(|i| i + 1)
        .unwrap_or(0);
    let line_end = file.text()[snippet.span.end as usize..]
        .find('\n')
        .map(|i| i + snippet.span.end as usize)
        .unwrap_or(file.text().len());
    let line_text = &file.text()[line_start..line_end];
    out.push_str("   | ");
    out.push_str(line_text);
    out.push('\n');

    let caret_start = snippet.span.start as usize - line_start;
    let caret_len = (snippet.span.end - snippet.span.start).max(1) as usize;
    out.push_str("   | ");
    out.push_str(&" ".repeat(caret_start));
    let caret_color = if snippet.primary { "\x1b[31m" } else { "\x1b[34m" };
    paint(style, caret_color, &"^".repeat(caret_len), out);
    out.push(' ');
    out.push_str(&snippet.message);
    out.push('\n');

    if !snippet.edits.is_empty() {
        out.push_str("  help:\n");
        for hunk in hunk_diff(snippet) {
            render_hunk(&hunk, out);
        }
    }
}

/// A single line of a textual diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffHunk {
    Unchanged(String),
    Delete(String),
    Add(String),
}

fn render_hunk(hunk: &DiffHunk, out: &mut String) {
    match hunk {
        DiffHunk::Unchanged(s) => {
            out.push_str("    ");
            out.push_str(s);
            out.push('\n');
        }
        DiffHunk::Delete(s) => {
            out.push_str("  - ");
            out.push_str(s);
            out.push('\n');
        }
        DiffHunk::Add(s) => {
            out.push_str("  + ");
            out.push_str(s);
            out.push('\n');
        }
    }
}

/// Finds the smallest region covering every edit, snapped to line
/// boundaries, and returns `(region_start, region_end)` as absolute file
/// offsets.
fn snapped_region(file: &crate::source::File, abs_edits: &[(u32, u32)]) -> (u32, u32) {
    let min = abs_edits.iter().map(|(s, _)| *s).min().unwrap_or(0);
    let max = abs_edits.iter().map(|(_, e)| *e).max().unwrap_or(0);
    let text = file.text();
    let region_start = text[..min as usize]
        .rfind('\n')
        .map(|i| i as u32 + 1)
        .unwrap_or(0);
    let region_end = text[max as usize..]
        .find('\n')
        .map(|i| i as u32 + max)
        .unwrap_or(text.len() as u32);
    (region_start, region_end)
}

/// Renders one snippet's edits as a single alternating sequence of
/// unchanged/delete/add hunks over the smallest line-snapped region
/// enclosing all edits, in edit order.
pub fn hunk_diff(snippet: &Snippet) -> Vec<DiffHunk> {
    let Some(file) = snippet.span.file() else {
        return Vec::new();
    };
    if snippet.edits.is_empty() {
        return Vec::new();
    }
    let abs_edits: Vec<(u32, u32, &str)> = snippet
        .edits
        .iter()
        .map(|e| (snippet.span.start + e.start, snippet.span.start + e.end, e.replace.as_str()))
        .collect();
    let pairs: Vec<(u32, u32)> = abs_edits.iter().map(|(s, e, _)| (*s, *e)).collect();
    let (region_start, region_end) = snapped_region(file, &pairs);

    let text = file.text();
    let mut hunks = Vec::new();
    let mut cursor = region_start;
    for (start, end, replace) in &abs_edits {
        if *start > cursor {
            hunks.push(DiffHunk::Unchanged(text[cursor as usize..*start as usize].to_string()));
        }
        let deleted = &text[*start as usize..*end as usize];
        if !deleted.is_empty() {
            hunks.push(DiffHunk::Delete(deleted.to_string()));
        }
        if !replace.is_empty() {
            hunks.push(DiffHunk::Add(replace.to_string()));
        }
        cursor = *end;
    }
    if cursor < region_end {
        hunks.push(DiffHunk::Unchanged(text[cursor as usize..region_end as usize].to_string()));
    }
    hunks
}

/// Like [`hunk_diff`], but groups edits separated by a blank line (at
/// least one newline between them in the source) into independent
/// delete/add pairs, each over its own line-snapped sub-region — a
/// classic unified-diff shape rather than one run-on hunk.
pub fn unified_diff(snippet: &Snippet) -> Vec<Vec<DiffHunk>> {
    let Some(file) = snippet.span.file() else {
        return Vec::new();
    };
    if snippet.edits.is_empty() {
        return Vec::new();
    }
    let text = file.text();
    let abs_edits: Vec<Edit> = snippet
        .edits
        .iter()
        .map(|e| Edit {
            start: snippet.span.start + e.start,
            end: snippet.span.start + e.end,
            replace: e.replace.clone(),
        })
        .collect();

    let mut groups: Vec<Vec<Edit>> = Vec::new();
    for edit in abs_edits {
        match groups.last_mut() {
            Some(group) if !text[group.last().unwrap().end as usize..edit.start as usize].contains('\n') => {
                group.push(edit);
            }
            _ => groups.push(vec![edit]),
        }
    }

    groups
        .into_iter()
        .map(|group| {
            let pairs: Vec<(u32, u32)> = group.iter().map(|e| (e.start, e.end)).collect();
            let (region_start, region_end) = snapped_region(file, &pairs);
            let mut hunks = Vec::new();
            let mut cursor = region_start;
            for edit in &group {
                if edit.start > cursor {
                    hunks.push(DiffHunk::Unchanged(text[cursor as usize..edit.start as usize].to_string()));
                }
                let deleted = &text[edit.start as usize..edit.end as usize];
                if !deleted.is_empty() {
                    hunks.push(DiffHunk::Delete(deleted.to_string()));
                }
                if !edit.replace.is_empty() {
                    hunks.push(DiffHunk::Add(edit.replace.clone()));
                }
                cursor = edit.end;
            }
            if cursor < region_end {
                hunks.push(DiffHunk::Unchanged(text[cursor as usize..region_end as usize].to_string()));
            }
            hunks
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins::Level;
    use crate::diagnostic::{Diagnostic, Report, ReportOptions};
    use crate::source::File;

    #[test]
    fn monochrome_render_contains_message_and_location() {
        let file = File::new("a.proto", "message Foo {}\n");
        let mut report = Report::new(ReportOptions::default());
        let mut d = Diagnostic::new(Level::Error);
        d.set_tag("e0001");
        d.set_message("unexpected token");
        d.push_snippet(file.span(8, 11), "here");
        report.push(d);
        let rendered = report.render(RenderStyle::Monochrome);
        assert!(rendered.contains("unexpected token"));
        assert!(rendered.contains("a.proto:1:9"));
        assert!(rendered.contains("here"));
    }

    #[test]
    fn hunk_diff_single_edit() {
        let file = File::new("a.proto", "int32 x = 1;\n");
        let span = file.span(0, 13);
        let snippet = Snippet {
            span,
            message: "m".into(),
            primary: true,
            page_break: false,
            edits: vec![Edit::new(0, 5, "int64")],
        };
        let hunks = hunk_diff(&snippet);
        assert_eq!(hunks[0], DiffHunk::Delete("int32".to_string()));
        assert_eq!(hunks[1], DiffHunk::Add("int64".to_string()));
        assert!(matches!(&hunks[2], DiffHunk::Unchanged(s) if s.starts_with(" x = 1;")));
    }

    #[test]
    fn unified_diff_splits_on_blank_line_between_edits() {
        let text = "a = 1;\n\nb = 2;\n";
        let file = File::new("a.proto", text);
        let span = file.span(0, text.len() as u32);
        let snippet = Snippet {
            span,
            message: "m".into(),
            primary: true,
            page_break: false,
            edits: vec![Edit::new(4, 5, "9"), Edit::new(12, 13, "9")],
        };
        let groups = unified_diff(&snippet);
        assert_eq!(groups.len(), 2);
    }
}
