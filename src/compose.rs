use std::collections::HashMap;

use crate::exec::Search;
use crate::matcher::Matcher;
use crate::native::escape;
use crate::{Engine, Error, Result};

/// How [`Engine::union`] joins its parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Conjunction {
    /// Alternation: any part may match.
    #[default]
    Or,
    /// Concatenation: the parts match in sequence.
    None,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnionOptions {
    pub conjunction: Conjunction,
}

/// A named piece of a pattern built with [`Engine::build`].
#[derive(Debug, Clone, Copy)]
pub enum Subpattern<'a> {
    /// Extended syntax, inserted as written.
    Pattern(&'a str),
    /// A compiled matcher; its native source is inserted with a leading `^`
    /// and trailing `$` removed.
    Regex(&'a Matcher),
}

impl<'a> From<&'a str> for Subpattern<'a> {
    fn from(value: &'a str) -> Self {
        Self::Pattern(value)
    }
}

impl<'a> From<&'a Matcher> for Subpattern<'a> {
    fn from(value: &'a Matcher) -> Self {
        Self::Regex(value)
    }
}

impl Engine {
    /// Combines literals and matchers into one matcher. Literals are
    /// escaped; each matcher's groups keep their names and its numbered
    /// backreferences are shifted past the groups of earlier parts. Two parts
    /// using the same group name is a syntax error.
    pub fn union(&self, patterns: &[Search<'_>], flags: &str, options: &UnionOptions) -> Result<Matcher> {
        if patterns.is_empty() {
            return Err(Error::Type(
                "must provide a nonempty list of patterns to merge".to_string(),
            ));
        }

        let mut parts = Vec::with_capacity(patterns.len());
        let mut prior_groups = 0;
        for pattern in patterns {
            match pattern {
                Search::Literal(text) => parts.push(escape(text).into_owned()),
                Search::Regex(matcher) => {
                    let normalized = self.compile(matcher.source(), "")?;
                    let names: Vec<Option<String>> = normalized
                        .capture_names()
                        .iter()
                        .enumerate()
                        .map(|(idx, fallback)| {
                            matcher
                                .capture_names()
                                .get(idx)
                                .cloned()
                                .flatten()
                                .or_else(|| fallback.clone())
                        })
                        .collect();
                    parts.push(rewrite_groups(normalized.source(), &names, prior_groups));
                    prior_groups += names.len();
                }
            }
        }

        let separator = match options.conjunction {
            Conjunction::Or => "|",
            Conjunction::None => "",
        };
        self.compile(&parts.join(separator), flags)
    }

    /// Compiles `pattern` with every `{{name}}` replaced by the subpattern of
    /// that name, wrapped in a non-capturing group. Subpatterns may refer to
    /// each other; an unknown name is a reference error.
    pub fn build(&self, pattern: &str, subpatterns: &[(&str, Subpattern<'_>)], flags: &str) -> Result<Matcher> {
        let mut data = HashMap::with_capacity(subpatterns.len());
        for (name, sub) in subpatterns {
            let source = match sub {
                Subpattern::Pattern(text) => (*text).to_string(),
                Subpattern::Regex(matcher) => strip_anchors(matcher.source()).to_string(),
            };
            data.insert((*name).to_string(), source);
        }
        self.compile_with(pattern, flags, Some(data))
    }
}

/// Renames capturing groups to `names` and shifts numbered backreferences
/// by `offset`. Character classes and escapes are copied as they are.
fn rewrite_groups(source: &str, names: &[Option<String>], offset: usize) -> String {
    let mut out = String::with_capacity(source.len() + 8);
    let mut chars = source.char_indices().peekable();
    let mut next_group = 0;
    let mut in_class = false;

    while let Some((idx, ch)) = chars.next() {
        match ch {
            '\\' => {
                let digits: String = source[idx + 1..]
                    .chars()
                    .take_while(char::is_ascii_digit)
                    .collect();
                let numbered = !in_class && !digits.is_empty() && !digits.starts_with('0');
                match digits.parse::<usize>() {
                    Ok(index) if numbered => {
                        out.push_str(&format!("\\{}", index + offset));
                        for _ in 0..digits.len() {
                            chars.next();
                        }
                    }
                    _ => {
                        out.push('\\');
                        if let Some((_, escaped)) = chars.next() {
                            out.push(escaped);
                        }
                    }
                }
            }
            '[' if !in_class => {
                in_class = true;
                out.push('[');
            }
            ']' if in_class => {
                in_class = false;
                out.push(']');
            }
            '(' if !in_class && chars.peek().map(|&(_, next)| next) != Some('?') => {
                match names.get(next_group).cloned().flatten() {
                    Some(name) => out.push_str(&format!("(?<{name}>")),
                    None => out.push('('),
                }
                next_group += 1;
            }
            _ => out.push(ch),
        }
    }
    out
}

fn strip_anchors(source: &str) -> &str {
    let source = source.strip_prefix('^').unwrap_or(source);
    match source.strip_suffix('$') {
        Some(stripped) => {
            let backslashes = stripped.chars().rev().take_while(|&ch| ch == '\\').count();
            if backslashes % 2 == 0 { stripped } else { source }
        }
        None => source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewrite_groups_names_groups_and_shifts_backrefs() {
        let names = vec![Some("pet".to_string()), None];
        assert_eq!(
            rewrite_groups(r"(fish)\1(?:x)(\d)[(\1]", &names, 2),
            r"(?<pet>fish)\3(?:x)(\d)[(\1]"
        );
    }

    #[test]
    fn strip_anchors_keeps_escaped_dollar() {
        assert_eq!(strip_anchors("^abc$"), "abc");
        assert_eq!(strip_anchors(r"abc\$"), r"abc\$");
        assert_eq!(strip_anchors(r"abc\\$"), r"abc\\");
    }
}
