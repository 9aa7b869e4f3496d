//! Source files and byte-offset spans.

use std::cell::OnceCell;
use std::fmt;
use std::rc::Rc;

/// Upper bound on source size the lexer will accept, in bytes.
///
/// Chosen to comfortably exceed any real `.proto` file while still
/// catching pathological input (e.g. an accidentally concatenated
/// binary blob) in bounded memory. See `DESIGN.md` for the Open
/// Question this resolves.
pub const MAX_FILE_SIZE: usize = 256 * 1024 * 1024;

/// A named, immutable source text.
///
/// Cheap to clone: the path and text are held behind an `Rc` and the
/// line index is built lazily, once, on first access.
#[derive(Clone)]
pub struct File {
    inner: Rc<FileInner>,
}

struct FileInner {
    path: String,
    text: String,
    line_index: OnceCell<LineIndex>,
}

impl File {
    pub fn new(path: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            inner: Rc::new(FileInner {
                path: path.into(),
                text: text.into(),
                line_index: OnceCell::new(),
            }),
        }
    }

    pub fn path(&self) -> &str {
        &self.inner.path
    }

    pub fn text(&self) -> &str {
        &self.inner.text
    }

    /// Byte span `[start, end)` within this file. Panics if the range is
    /// inverted or falls outside the text, matching the invariant in
    /// `spec.md` §3 (`Span`).
    pub fn span(&self, start: u32, end: u32) -> Span {
        assert!(start <= end, "span start {start} > end {end}");
        assert!(
            end as usize <= self.inner.text.len(),
            "span end {end} past end of file ({} bytes)",
            self.inner.text.len()
        );
        Span {
            file: Some(self.clone()),
            start,
            end,
        }
    }

    fn line_index(&self) -> &LineIndex {
        self.inner
            .line_index
            .get_or_init(|| LineIndex::new(&self.inner.text))
    }

    /// Resolves a byte offset to `(line, column_utf8, column_utf16)`, all
    /// zero-based.
    pub fn location(&self, offset: u32) -> Location {
        self.line_index().resolve(&self.inner.text, offset)
    }
}

impl fmt::Debug for File {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("File").field("path", &self.path()).finish()
    }
}

impl PartialEq for File {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner) || self.path() == other.path()
    }
}
impl Eq for File {}

/// Zero-based `(line, column)` pair, in both UTF-8 and UTF-16 code units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub line: u32,
    pub column_utf8: u32,
    pub column_utf16: u32,
}

/// Maps byte offsets to line/column. Built once per [`File`], on demand.
struct LineIndex {
    /// Byte offset of the start of each line; `line_starts[0] == 0`.
    line_starts: Vec<u32>,
}

impl LineIndex {
    fn new(text: &str) -> Self {
        let mut line_starts = vec![0u32];
        for (i, b) in text.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i as u32 + 1);
            }
        }
        Self { line_starts }
    }

    fn resolve(&self, text: &str, offset: u32) -> Location {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(exact) => exact,
            Err(next) => next.saturating_sub(1),
        };
        let line_start = self.line_starts[line];
        let prefix = &text[line_start as usize..offset as usize];
        let column_utf8 = prefix.chars().count() as u32;
        let column_utf16 = prefix.chars().map(|c| c.len_utf16() as u32).sum();
        Location {
            line: line as u32,
            column_utf8,
            column_utf16,
        }
    }
}

/// A byte range `[start, end)` within a file.
///
/// The all-zero span (no file, `start == end == 0`) is the canonical
/// "zero span" from `spec.md` §3; [`Span::is_zero`] detects it.
#[derive(Clone)]
pub struct Span {
    file: Option<File>,
    pub start: u32,
    pub end: u32,
}

impl Span {
    /// The canonical zero span: no file, zero-length, at offset zero.
    pub fn zero() -> Self {
        Self {
            file: None,
            start: 0,
            end: 0,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.file.is_none() && self.start == 0 && self.end == 0
    }

    pub fn file(&self) -> Option<&File> {
        self.file.as_ref()
    }

    pub fn len(&self) -> u32 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn text(&self) -> &str {
        match &self.file {
            Some(file) => &file.text()[self.start as usize..self.end as usize],
            None => "",
        }
    }

    pub fn start_loc(&self) -> Option<Location> {
        self.file.as_ref().map(|f| f.location(self.start))
    }

    pub fn end_loc(&self) -> Option<Location> {
        self.file.as_ref().map(|f| f.location(self.end))
    }

    /// The smallest span enclosing both `self` and `other`.
    ///
    /// Both spans must be zero or share a file: joining spans from two
    /// different files is a caller bug (diagnostics, fusion, and path
    /// splitting never need it), so it panics rather than picking one
    /// file arbitrarily.
    pub fn join(&self, other: &Span) -> Span {
        if self.is_zero() {
            return other.clone();
        }
        if other.is_zero() {
            return self.clone();
        }
        assert_eq!(
            self.file, other.file,
            "cannot join spans from different files"
        );
        Span {
            file: self.file.clone(),
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.file {
            Some(file) => write!(f, "{}[{}..{}]", file.path(), self.start, self.end),
            None => write!(f, "<zero span>"),
        }
    }
}

impl PartialEq for Span {
    fn eq(&self, other: &Self) -> bool {
        self.file == other.file && self.start == other.start && self.end == other.end
    }
}
impl Eq for Span {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_span_detection() {
        assert!(Span::zero().is_zero());
        let file = File::new("a.proto", "x");
        assert!(!file.span(0, 1).is_zero());
    }

    #[test]
    fn line_col_basic() {
        let file = File::new("a.proto", "ab\ncd");
        assert_eq!(
            file.location(0),
            Location {
                line: 0,
                column_utf8: 0,
                column_utf16: 0
            }
        );
        assert_eq!(
            file.location(3),
            Location {
                line: 1,
                column_utf8: 0,
                column_utf16: 0
            }
        );
        assert_eq!(
            file.location(4),
            Location {
                line: 1,
                column_utf8: 1,
                column_utf16: 1
            }
        );
    }

    #[test]
    fn utf16_column_counts_surrogate_pairs() {
        // U+1F600 is one UTF-8-decoded char but two UTF-16 code units.
        let file = File::new("a.proto", "\u{1F600}x");
        let loc = file.location(4); // after the 4-byte emoji, at 'x'
        assert_eq!(loc.column_utf8, 1);
        assert_eq!(loc.column_utf16, 2);
    }

    #[test]
    fn join_smallest_enclosing() {
        let file = File::new("a.proto", "0123456789");
        let a = file.span(2, 4);
        let b = file.span(6, 8);
        let j = a.join(&b);
        assert_eq!((j.start, j.end), (2, 8));
    }

    #[test]
    fn join_with_zero_span_is_identity() {
        let file = File::new("a.proto", "0123456789");
        let a = file.span(2, 4);
        let j = a.join(&Span::zero());
        assert_eq!((j.start, j.end), (2, 4));
    }

    #[test]
    #[should_panic(expected = "different files")]
    fn join_across_files_panics() {
        let a = File::new("a.proto", "0123456789").span(0, 1);
        let b = File::new("b.proto", "0123456789").span(0, 1);
        let _ = a.join(&b);
    }
}
