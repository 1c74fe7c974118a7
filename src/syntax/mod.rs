//! Parsed PHP source.
//!
//! Parsing is delegated to `mago_syntax`.  Its AST borrows from an arena
//! that lives only for the duration of a pass, so a [`ParsedDocument`]
//! keeps the source text and a line index, and hands a freshly parsed
//! [`Program`] to [`ParsedDocument::with_program`] whenever a reader walks
//! the file.

mod comments;
pub mod walk;

use std::path::Path;

use mago_span::Span;
use memchr::memchr_iter;
use mago_syntax::ast::Program;
use tracing::error;

use crate::types::{HashedLocation, Location, Position, Range, hash32};

pub use comments::{Comments, DocBlock};

/// A PHP file: its text, uri and a line index for position lookups.
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    uri: String,
    text: String,
    line_starts: Vec<u32>,
    uri_hash: u32,
}

/// Byte offsets at which each line starts.
fn line_starts(text: &str) -> Vec<u32> {
    let mut starts = vec![0u32];
    starts.extend(memchr_iter(b'\n', text.as_bytes()).map(|i| i as u32 + 1));
    starts
}

impl ParsedDocument {
    pub fn new(uri: impl Into<String>, text: impl Into<String>) -> Self {
        let uri = uri.into();
        let text = text.into();
        let line_starts = line_starts(&text);
        let uri_hash = hash32(&uri);
        Self {
            uri,
            text,
            line_starts,
            uri_hash,
        }
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn uri_hash(&self) -> u32 {
        self.uri_hash
    }

    /// Parse the document and run `f` over the resulting program.
    ///
    /// Syntax errors do not fail the parse; the program simply holds fewer
    /// nodes.  `None` is returned only if the parser itself panicked.
    pub fn with_program<R>(&self, f: impl FnOnce(&Program<'_>) -> R) -> Option<R> {
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let arena = bumpalo::Bump::new();
            let file_id = mago_database::file::FileId::new(&self.uri);
            let program = mago_syntax::parser::parse_file_content(&arena, file_id, &self.text);
            f(&program)
        }));

        match result {
            Ok(value) => Some(value),
            Err(_) => {
                error!(uri = %self.uri, "parser panicked");
                None
            }
        }
    }

    /// Source text covered by a span.
    pub fn span_text(&self, span: Span) -> &str {
        self.text
            .get(span.start.offset as usize..span.end.offset as usize)
            .unwrap_or("")
    }

    /// Convert a byte offset to a line/character position.
    pub fn position_at(&self, offset: u32) -> Position {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next.saturating_sub(1),
        };
        let line_start = self.line_starts.get(line).copied().unwrap_or(0) as usize;
        let end = (offset as usize).min(self.text.len());
        let character = self
            .text
            .get(line_start..end)
            .map(|s| s.encode_utf16().count())
            .unwrap_or(0);
        Position::new(line as u32, character as u32)
    }

    /// Convert a line/character position to a byte offset.
    pub fn offset_at(&self, position: Position) -> u32 {
        let Some(&line_start) = self.line_starts.get(position.line as usize) else {
            return self.text.len() as u32;
        };
        let mut units = 0u32;
        let rest = self.text.get(line_start as usize..).unwrap_or("");
        for (i, c) in rest.char_indices() {
            if units >= position.character || c == '\n' {
                return line_start + i as u32;
            }
            units += c.len_utf16() as u32;
        }
        self.text.len() as u32
    }

    pub fn span_range(&self, span: Span) -> Range {
        Range::new(
            self.position_at(span.start.offset),
            self.position_at(span.end.offset),
        )
    }

    pub fn span_location(&self, span: Span) -> Location {
        Location::new(self.uri.clone(), self.span_range(span))
    }

    pub fn span_hashed_location(&self, span: Span) -> HashedLocation {
        self.hashed_location(span.start.offset, span.end.offset)
    }

    /// Location of the byte range `start..end`.
    pub fn hashed_location(&self, start: u32, end: u32) -> HashedLocation {
        HashedLocation {
            uri_hash: self.uri_hash,
            range: Range::new(self.position_at(start), self.position_at(end)),
        }
    }

    /// Range covering the whole document.
    pub fn document_range(&self) -> Range {
        Range::new(Position::new(0, 0), self.position_at(self.text.len() as u32))
    }

    /// Synthesized name for an anonymous class or function starting at
    /// `offset`, unique within the project: `#anon#<file name>#<offset>`.
    pub fn create_anonymous_name(&self, offset: u32) -> String {
        let file = Path::new(&self.uri)
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or(&self.uri);
        format!("#anon#{file}#{offset}")
    }
}
