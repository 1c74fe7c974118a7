//! Parsers for the individual tag lines of a documentation comment.
//!
//! Each parser receives the text following the tag name (already trimmed)
//! and returns `None` when the line does not have the expected shape.

use super::types::{split_type_token, split_word};
use super::{MethodTagParameter, Tag, TagKind};

/// `@param Type $name description`, `@var Type [$name] [description]`,
/// `@property Type $name description`.
///
/// The type may be omitted (`@param $name`).  For `@param` and
/// `@property` a name is required.
pub(super) fn parse_typed_tag(kind: TagKind, rest: &str) -> Option<Tag> {
    let rest = rest.trim_start();
    if rest.is_empty() {
        return None;
    }

    let (type_string, after_type) = if rest.starts_with('$') {
        ("", rest)
    } else {
        let (ty, remainder) = split_type_token(rest);
        (ty, remainder.trim_start())
    };

    let (name, description) = match split_word(after_type) {
        (word, tail) if word.starts_with('$') && word.len() > 1 => (word, tail),
        _ => ("", after_type),
    };

    if name.is_empty() && kind != TagKind::Var {
        return None;
    }

    Some(Tag {
        kind,
        name: name.to_string(),
        type_string: type_string.to_string(),
        description: description.trim().to_string(),
        is_static: false,
        parameters: Vec::new(),
    })
}

/// `@return Type description`
pub(super) fn parse_return_tag(rest: &str) -> Option<Tag> {
    let rest = rest.trim_start();
    if rest.is_empty() {
        return None;
    }
    let (type_string, description) = split_type_token(rest);
    Some(Tag {
        kind: TagKind::Return,
        name: String::new(),
        type_string: type_string.to_string(),
        description: description.trim().to_string(),
        is_static: false,
        parameters: Vec::new(),
    })
}

/// `@method [static] [ReturnType] name([Type] $param, ...) description`
pub(super) fn parse_method_tag(rest: &str) -> Option<Tag> {
    let rest = rest.trim_start();
    let paren = rest.find('(')?;
    let close = matching_paren(rest, paren)?;

    let mut head: Vec<&str> = rest[..paren].split_whitespace().collect();
    let name = head.pop()?.to_string();
    let is_static = head.first().is_some_and(|w| w.eq_ignore_ascii_case("static"));
    let type_words = if is_static { &head[1..] } else { &head[..] };
    // `@method static foo()` declares a method named foo returning static.
    let type_string = match (is_static, type_words.is_empty()) {
        (true, true) => String::new(),
        _ => type_words.join(" "),
    };

    let parameters = split_parameters(&rest[paren + 1..close])
        .filter_map(parse_method_parameter)
        .collect();

    Some(Tag {
        kind: TagKind::Method,
        name,
        type_string,
        description: rest[close + 1..].trim().to_string(),
        is_static,
        parameters,
    })
}

fn matching_paren(s: &str, open: usize) -> Option<usize> {
    let mut depth = 0i32;
    for (i, c) in s[open..].char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Split a parameter list on top-level commas.
fn split_parameters(list: &str) -> impl Iterator<Item = &str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, c) in list.char_indices() {
        match c {
            '<' | '(' | '{' | '[' => depth += 1,
            '>' | ')' | '}' | ']' => depth -= 1,
            ',' if depth <= 0 => {
                parts.push(&list[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&list[start..]);
    parts.into_iter().map(str::trim).filter(|p| !p.is_empty())
}

/// `[Type] [&][...]$name [= default]`
fn parse_method_parameter(text: &str) -> Option<MethodTagParameter> {
    let text = match text.find('=') {
        Some(eq) => &text[..eq],
        None => text,
    };
    let dollar = text.find('$')?;
    let name: String = text[dollar..]
        .chars()
        .take_while(|c| *c == '$' || c.is_alphanumeric() || *c == '_')
        .collect();
    if name.len() < 2 {
        return None;
    }
    let type_string = text[..dollar].trim().trim_end_matches(['&', '.']).trim();
    Some(MethodTagParameter {
        name,
        type_string: type_string.to_string(),
    })
}
