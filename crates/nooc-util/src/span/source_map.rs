//! Source map for managing source files and computing source locations.
//!
//! The typer works across files (`import "p"` pulls in other `.noo` files),
//! so diagnostics need a central registry that maps a [`FileId`] back to its
//! path and content, and a byte offset back to line/column.

use std::sync::Arc;

use crate::error::{SourceMapError, SourceMapResult};

use super::{FileId, Span};

/// A source file with its content and metadata.
///
/// # Examples
///
/// ```
/// use nooc_util::span::SourceFile;
///
/// let file = SourceFile::new(0, "main.noo", "x = 1");
/// assert_eq!(file.name(), "main.noo");
/// assert_eq!(file.content(), "x = 1");
/// ```
#[derive(Clone)]
pub struct SourceFile {
    /// Unique file identifier
    id: FileId,
    /// File name (path or display name)
    name: String,
    /// File content
    content: Arc<str>,
    /// Precomputed line start offsets
    line_starts: Arc<[usize]>,
}

impl SourceFile {
    /// Create a new source file.
    pub fn new(id: usize, name: impl Into<String>, content: impl Into<Arc<str>>) -> Self {
        let content = content.into();
        let line_starts = Self::compute_line_starts(&content);
        Self {
            id: FileId(id),
            name: name.into(),
            content,
            line_starts,
        }
    }

    fn compute_line_starts(content: &str) -> Arc<[usize]> {
        let mut line_starts = vec![0];
        for (i, ch) in content.char_indices() {
            if ch == '\n' {
                line_starts.push(i + 1);
            }
        }
        line_starts.into()
    }

    /// Get the file identifier.
    #[inline]
    pub fn id(&self) -> FileId {
        self.id
    }

    /// Get the file name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the file content.
    #[inline]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Number of lines in the file.
    #[inline]
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Convert a byte offset into a (line, column) pair, both 1-based.
    pub fn location(&self, offset: usize) -> (u32, u32) {
        let line_idx = match self.line_starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i - 1,
        };
        let column = offset - self.line_starts[line_idx] + 1;
        (line_idx as u32 + 1, column as u32)
    }

    /// Extract the text of a single line (1-based), without the newline.
    pub fn line_text(&self, line: u32) -> SourceMapResult<&str> {
        let idx = line.checked_sub(1).ok_or(SourceMapError::InvalidLineNumber {
            line: line as usize,
            max_lines: self.line_count(),
        })? as usize;
        let start = *self
            .line_starts
            .get(idx)
            .ok_or(SourceMapError::InvalidLineNumber {
                line: line as usize,
                max_lines: self.line_count(),
            })?;
        let end = self
            .line_starts
            .get(idx + 1)
            .map(|&e| e)
            .unwrap_or(self.content.len());
        Ok(self.content[start..end].trim_end_matches(['\n', '\r']))
    }

    /// Extract the source text covered by a span.
    pub fn snippet(&self, span: Span) -> SourceMapResult<&str> {
        if span.start > span.end {
            return Err(SourceMapError::InvalidSpan {
                start: span.start,
                end: span.end,
            });
        }
        if span.end > self.content.len() {
            return Err(SourceMapError::SpanOutOfBounds {
                file_len: self.content.len(),
                span_start: span.start,
                span_end: span.end,
            });
        }
        Ok(&self.content[span.start..span.end])
    }
}

/// Registry of all source files seen during a run.
///
/// Files are added as they are read (the entry file first, then any files
/// pulled in by `import`). Each file gets a sequential [`FileId`].
#[derive(Default)]
pub struct SourceMap {
    files: Vec<SourceFile>,
}

impl SourceMap {
    /// Create an empty source map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file, returning its id.
    pub fn add(&mut self, name: impl Into<String>, content: impl Into<Arc<str>>) -> FileId {
        let id = self.files.len();
        self.files.push(SourceFile::new(id, name, content));
        FileId(id)
    }

    /// Look up a file by id.
    pub fn get(&self, id: FileId) -> Option<&SourceFile> {
        self.files.get(id.0)
    }

    /// Look up a file by name.
    pub fn by_name(&self, name: &str) -> SourceMapResult<&SourceFile> {
        self.files
            .iter()
            .find(|f| f.name() == name)
            .ok_or_else(|| SourceMapError::FileNotFound(name.to_string()))
    }

    /// Number of registered files.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// True if no files are registered.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Iterate over all files.
    pub fn iter(&self) -> impl Iterator<Item = &SourceFile> {
        self.files.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_file_location() {
        let file = SourceFile::new(0, "t.noo", "ab\ncd\nef");
        assert_eq!(file.location(0), (1, 1));
        assert_eq!(file.location(1), (1, 2));
        assert_eq!(file.location(3), (2, 1));
        assert_eq!(file.location(7), (3, 2));
    }

    #[test]
    fn test_source_file_line_text() {
        let file = SourceFile::new(0, "t.noo", "ab\ncd\nef");
        assert_eq!(file.line_text(1).unwrap(), "ab");
        assert_eq!(file.line_text(2).unwrap(), "cd");
        assert_eq!(file.line_text(3).unwrap(), "ef");
        assert!(file.line_text(4).is_err());
    }

    #[test]
    fn test_source_file_snippet() {
        let file = SourceFile::new(0, "t.noo", "x = 1 + 2");
        let span = Span::new(4, 9, 1, 5);
        assert_eq!(file.snippet(span).unwrap(), "1 + 2");
    }

    #[test]
    fn test_snippet_out_of_bounds() {
        let file = SourceFile::new(0, "t.noo", "x");
        let span = Span::new(0, 10, 1, 1);
        assert!(matches!(
            file.snippet(span),
            Err(SourceMapError::SpanOutOfBounds { .. })
        ));
    }

    #[test]
    fn test_source_map_add_and_get() {
        let mut map = SourceMap::new();
        let a = map.add("a.noo", "1");
        let b = map.add("b.noo", "2");
        assert_ne!(a, b);
        assert_eq!(map.get(a).unwrap().content(), "1");
        assert_eq!(map.by_name("b.noo").unwrap().content(), "2");
        assert!(map.by_name("c.noo").is_err());
    }
}
