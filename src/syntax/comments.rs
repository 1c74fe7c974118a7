//! Comment index for documentation lookups.
//!
//! The parser keeps comments out of the AST as trivia.  [`Comments`]
//! copies their spans out of the arena so the readers can ask for the
//! documentation comment preceding any node after the program is gone.

use mago_syntax::ast::{Trivia, TriviaKind};

#[derive(Debug, Clone, Copy)]
struct Comment {
    start: u32,
    end: u32,
    doc: bool,
}

/// A documentation comment and its byte offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocBlock<'t> {
    pub text: &'t str,
    pub start: u32,
    pub end: u32,
}

/// Comments of one file, in source order.
#[derive(Debug, Clone, Default)]
pub struct Comments {
    entries: Vec<Comment>,
}

impl Comments {
    pub fn new(trivia: &[Trivia<'_>]) -> Self {
        let entries = trivia
            .iter()
            .filter_map(|t| {
                let doc = match t.kind {
                    TriviaKind::DocBlockComment => true,
                    TriviaKind::SingleLineComment
                    | TriviaKind::MultiLineComment
                    | TriviaKind::HashComment => false,
                    TriviaKind::WhiteSpace => return None,
                };
                Some(Comment {
                    start: t.span.start.offset,
                    end: t.span.end.offset,
                    doc,
                })
            })
            .collect();
        Self { entries }
    }

    /// The `/** ... */` comment immediately preceding `offset`.
    ///
    /// Only whitespace and plain comments may sit between the docblock and
    /// the node, so a docblock never attaches past the end of the statement
    /// it precedes.
    pub fn doc_before<'t>(&self, text: &'t str, offset: u32) -> Option<DocBlock<'t>> {
        let candidate = self.entries.partition_point(|c| c.start < offset);
        let bytes = text.as_bytes();
        let mut covered_from = offset;

        for comment in self.entries[..candidate].iter().rev() {
            let gap = bytes
                .get(comment.end as usize..covered_from as usize)
                .unwrap_or(&[]);
            if !gap.iter().all(u8::is_ascii_whitespace) {
                return None;
            }
            if comment.doc {
                return text
                    .get(comment.start as usize..comment.end as usize)
                    .map(|doc| DocBlock {
                        text: doc,
                        start: comment.start,
                        end: comment.end,
                    });
            }
            covered_from = comment.start;
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use crate::syntax::ParsedDocument;

    use super::*;

    fn doc_at(src: &str, needle: &str) -> Option<String> {
        let doc = ParsedDocument::new("file:///a.php", src);
        let offset = src.find(needle).unwrap() as u32;
        doc.with_program(|program| {
            Comments::new(program.trivia.as_slice())
                .doc_before(doc.text(), offset)
                .map(|block| block.text.to_string())
        })
        .unwrap()
    }

    #[test]
    fn docblock_attaches_across_plain_comments() {
        let src = "<?php\n/** Doc. */\n// note\nfunction f() {}\n";
        assert_eq!(doc_at(src, "function").as_deref(), Some("/** Doc. */"));
    }

    #[test]
    fn docblock_stops_at_code() {
        let src = "<?php\n/** Doc. */\n$a = 1;\nfunction f() {}\n";
        assert_eq!(doc_at(src, "function"), None);
        assert_eq!(doc_at(src, "$a").as_deref(), Some("/** Doc. */"));
    }

    #[test]
    fn plain_comments_are_not_documentation() {
        let src = "<?php\n/* not doc */\nfunction f() {}\n";
        assert_eq!(doc_at(src, "function"), None);
    }
}
