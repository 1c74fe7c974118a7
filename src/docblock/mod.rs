//! PHPDoc block parsing.
//!
//! This module turns a documentation comment (`/** ... */`) into a
//! [`PhpDoc`]: the free-text summary plus the structured tags the reader
//! passes care about:
//!
//!   - `@param Type $name`
//!   - `@var Type [$name]`
//!   - `@return Type`
//!   - `@property Type $name` / `@property-read` / `@property-write`
//!   - `@method [static] [Type] name(params)`
//!
//! Types are returned as the raw text written in the comment; callers
//! parse them into [`TypeDescriptor`](crate::type_string::TypeDescriptor)s
//! and resolve names against their own context.
//!
//! # Submodules
//!
//! - [`tags`]: per-tag line parsers.
//! - [`types`]: text helpers (`split_type_token`, comment line splitting).

mod tags;
pub(crate) mod types;

use tags::{parse_method_tag, parse_return_tag, parse_typed_tag};
use types::content_lines;

/// Which tag a [`Tag`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagKind {
    Param,
    Var,
    Return,
    Property,
    PropertyRead,
    PropertyWrite,
    Method,
}

impl TagKind {
    fn from_name(name: &str) -> Option<TagKind> {
        let kind = match name {
            "@param" => TagKind::Param,
            "@var" => TagKind::Var,
            "@return" => TagKind::Return,
            "@property" => TagKind::Property,
            "@property-read" => TagKind::PropertyRead,
            "@property-write" => TagKind::PropertyWrite,
            "@method" => TagKind::Method,
            _ => return None,
        };
        Some(kind)
    }

    pub fn is_property(self) -> bool {
        matches!(
            self,
            TagKind::Property | TagKind::PropertyRead | TagKind::PropertyWrite
        )
    }
}

/// A parameter of a `@method` tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodTagParameter {
    /// Name with the `$` prefix.
    pub name: String,
    pub type_string: String,
}

/// One recognised tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub kind: TagKind,
    /// `$name` for param/var/property tags, the method name for `@method`,
    /// empty otherwise.
    pub name: String,
    /// The type as written, empty when omitted.
    pub type_string: String,
    pub description: String,
    /// `@method static ...`
    pub is_static: bool,
    pub parameters: Vec<MethodTagParameter>,
}

/// A parsed documentation comment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhpDoc {
    /// Summary and description text preceding the first tag.
    pub text: String,
    pub tags: Vec<Tag>,
}

impl PhpDoc {
    /// Parse a documentation comment.  Returns `None` for text that is
    /// not a `/** */` block.
    pub fn parse(comment: &str) -> Option<PhpDoc> {
        let comment = comment.trim();
        if !comment.starts_with("/**") || !comment.ends_with("*/") {
            return None;
        }

        let mut text_lines: Vec<&str> = Vec::new();
        let mut tags: Vec<Tag> = Vec::new();
        let mut in_tags = false;
        // whether the last tag line was recognised
        let mut continues = false;

        for line in content_lines(comment) {
            if line.starts_with('@') {
                in_tags = true;
                let (name, rest) = match line.find(char::is_whitespace) {
                    Some(i) => (&line[..i], &line[i..]),
                    None => (line, ""),
                };
                let tag = TagKind::from_name(name).and_then(|kind| match kind {
                    TagKind::Return => parse_return_tag(rest),
                    TagKind::Method => parse_method_tag(rest),
                    _ => parse_typed_tag(kind, rest),
                });
                continues = tag.is_some();
                tags.extend(tag);
            } else if !in_tags {
                text_lines.push(line);
            } else if let Some(last) = tags.last_mut()
                && continues
                && !line.is_empty()
            {
                // continuation of the previous tag's description
                if !last.description.is_empty() {
                    last.description.push(' ');
                }
                last.description.push_str(line);
            }
        }

        Some(PhpDoc {
            text: text_lines.join("\n").trim().to_string(),
            tags,
        })
    }

    pub fn return_tag(&self) -> Option<&Tag> {
        self.tags.iter().find(|t| t.kind == TagKind::Return)
    }

    pub fn var_tags(&self) -> impl Iterator<Item = &Tag> {
        self.tags.iter().filter(|t| t.kind == TagKind::Var)
    }

    pub fn property_tags(&self) -> impl Iterator<Item = &Tag> {
        self.tags.iter().filter(|t| t.kind.is_property())
    }

    pub fn method_tags(&self) -> impl Iterator<Item = &Tag> {
        self.tags.iter().filter(|t| t.kind == TagKind::Method)
    }

    /// The `@param` tag for `name` (with `$`).
    pub fn find_param_tag(&self, name: &str) -> Option<&Tag> {
        self.tags
            .iter()
            .find(|t| t.kind == TagKind::Param && t.name == name)
    }

    /// The `@var` tag naming `name`, or the first unnamed one.
    pub fn find_var_tag(&self, name: &str) -> Option<&Tag> {
        self.var_tags()
            .find(|t| t.name == name)
            .or_else(|| self.var_tags().find(|t| t.name.is_empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_and_tags() {
        let doc = PhpDoc::parse(concat!(
            "/**\n",
            " * Finds a user.\n",
            " *\n",
            " * Looks in the cache first.\n",
            " * @param int $id the id\n",
            " *        which must exist\n",
            " * @return User|null\n",
            " * @throws NotFound\n",
            " */",
        ))
        .unwrap();
        assert_eq!(doc.text, "Finds a user.\n\nLooks in the cache first.");
        assert_eq!(doc.tags.len(), 2, "unknown tags are skipped");
        let param = doc.find_param_tag("$id").unwrap();
        assert_eq!(param.type_string, "int");
        assert_eq!(param.description, "the id which must exist");
        assert_eq!(doc.return_tag().unwrap().type_string, "User|null");
    }

    #[test]
    fn var_tag_lookup_falls_back_to_unnamed() {
        let doc = PhpDoc::parse("/** @var Foo */").unwrap();
        assert_eq!(doc.find_var_tag("$a").unwrap().type_string, "Foo");

        let doc = PhpDoc::parse("/** @var Foo $a\n * @var Bar $b */").unwrap();
        assert_eq!(doc.find_var_tag("$b").unwrap().type_string, "Bar");
        assert!(doc.find_var_tag("$c").is_none());
    }

    #[test]
    fn magic_member_tags() {
        let doc = PhpDoc::parse(concat!(
            "/**\n",
            " * @property int $id\n",
            " * @property-read string $name\n",
            " * @method static self make(array $attrs)\n",
            " */",
        ))
        .unwrap();
        let kinds: Vec<TagKind> = doc.property_tags().map(|t| t.kind).collect();
        assert_eq!(kinds, vec![TagKind::Property, TagKind::PropertyRead]);
        let method = doc.method_tags().next().unwrap();
        assert_eq!(method.name, "make");
        assert!(method.is_static);
        assert_eq!(method.type_string, "self");
    }

    #[test]
    fn non_doc_comments_are_rejected() {
        assert!(PhpDoc::parse("/* plain */").is_none());
        assert!(PhpDoc::parse("// line").is_none());
        assert_eq!(PhpDoc::parse("/** */").unwrap(), PhpDoc::default());
    }
}
