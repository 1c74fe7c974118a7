//! Low-level text helpers shared by the tag parsers.

/// Split off the first type token from `s`, respecting `<…>`, `(…)` and
/// `{…}` nesting so that `array<int, User>` or `array{a: int}` stay whole.
///
/// Returns `(type_token, remainder)`.
pub(crate) fn split_type_token(s: &str) -> (&str, &str) {
    let mut depth = 0i32;
    for (i, c) in s.char_indices() {
        match c {
            '<' | '(' | '{' => depth += 1,
            '>' | ')' | '}' => depth -= 1,
            c if c.is_whitespace() && depth <= 0 => {
                return (&s[..i], &s[i..]);
            }
            _ => {}
        }
    }
    (s, "")
}

/// The content lines of a `/** ... */` block with the delimiters and the
/// leading `*` of each line removed.
pub(crate) fn content_lines(docblock: &str) -> impl Iterator<Item = &str> {
    let trimmed = docblock.trim();
    let inner = trimmed.strip_prefix("/**").unwrap_or(trimmed);
    let inner = inner.strip_suffix("*/").unwrap_or(inner);
    inner.lines().map(|line| {
        let line = line.trim();
        let line = line.strip_prefix('*').unwrap_or(line);
        line.trim()
    })
}

/// First whitespace-delimited word of `s` and the rest.
pub(crate) fn split_word(s: &str) -> (&str, &str) {
    let s = s.trim_start();
    match s.find(char::is_whitespace) {
        Some(i) => (&s[..i], s[i..].trim_start()),
        None => (s, ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_token_respects_nesting() {
        assert_eq!(
            split_type_token("array<int, User> $users rest"),
            ("array<int, User>", " $users rest")
        );
        assert_eq!(split_type_token("array{a: int} $x"), ("array{a: int}", " $x"));
        assert_eq!(split_type_token("Foo"), ("Foo", ""));
    }

    #[test]
    fn content_lines_strip_stars() {
        let lines: Vec<&str> = content_lines("/**\n * Hello\n * @return int\n */").collect();
        assert_eq!(lines, vec!["", "Hello", "@return int", ""]);
    }
}
