//! Thin wrapper over the host engine (`fancy-regex`). Everything above this
//! module speaks in byte spans and never touches backend types directly.

use std::borrow::Cow;
use std::fmt;

#[derive(Debug, Clone)]
pub(crate) struct Regex {
    backend: fancy_regex::Regex,
}

impl Regex {
    pub(crate) fn captures_from_pos(
        &self,
        input: &str,
        start: usize,
    ) -> Result<Option<Captures>, RegexError> {
        let captures = self
            .backend
            .captures_from_pos(input, start)
            .map_err(RegexError::from)?;
        Ok(captures.as_ref().map(Captures::from_backend))
    }

    /// Number of capturing groups, not counting the implicit whole-match group.
    pub(crate) fn group_count(&self) -> usize {
        self.backend.captures_len().saturating_sub(1)
    }

    /// Group names as the host sees them, aligned with groups `1..`.
    pub(crate) fn group_names(&self) -> Vec<Option<String>> {
        self.backend
            .capture_names()
            .skip(1)
            .map(|name| name.map(str::to_string))
            .collect()
    }
}

#[derive(Debug, Clone)]
pub(crate) struct RegexBuilder {
    pattern: String,
    case_insensitive: bool,
    multi_line: bool,
}

impl RegexBuilder {
    pub(crate) fn new(pattern: &str) -> Self {
        Self {
            pattern: pattern.to_string(),
            case_insensitive: false,
            multi_line: false,
        }
    }

    pub(crate) fn case_insensitive(&mut self, enabled: bool) -> &mut Self {
        self.case_insensitive = enabled;
        self
    }

    pub(crate) fn multi_line(&mut self, enabled: bool) -> &mut Self {
        self.multi_line = enabled;
        self
    }

    pub(crate) fn build(&self) -> Result<Regex, RegexError> {
        let mut builder = fancy_regex::RegexBuilder::new(&self.pattern);
        builder.case_insensitive(self.case_insensitive);
        builder.multi_line(self.multi_line);
        let backend = builder.build().map_err(RegexError::from)?;
        Ok(Regex { backend })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Captures {
    groups: Vec<Option<Span>>,
}

impl Captures {
    fn from_backend(captures: &fancy_regex::Captures<'_>) -> Self {
        let mut groups = Vec::with_capacity(captures.len());
        for idx in 0..captures.len() {
            let span = captures.get(idx).map(|matched| Span {
                start: matched.start(),
                end: matched.end(),
            });
            groups.push(span);
        }
        Self { groups }
    }

    pub(crate) fn into_spans(self) -> Vec<Option<Span>> {
        self.groups
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Span {
    pub(crate) start: usize,
    pub(crate) end: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RegexError {
    message: String,
}

impl fmt::Display for RegexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for RegexError {}

impl From<fancy_regex::Error> for RegexError {
    fn from(value: fancy_regex::Error) -> Self {
        Self {
            message: value.to_string(),
        }
    }
}

/// Escapes every regex metacharacter (and whitespace, so the result survives
/// free-spacing mode) for literal embedding in a pattern.
pub fn escape(value: &str) -> Cow<'_, str> {
    let mut out = String::with_capacity(value.len());
    let mut changed = false;

    for ch in value.chars() {
        if ch.is_whitespace() && ch != ' ' {
            // Control and non-ASCII whitespace go through as code points.
            out.push_str(&format!("\\x{{{:X}}}", u32::from(ch)));
            changed = true;
            continue;
        }
        if is_regex_meta(ch) {
            out.push('\\');
            changed = true;
        }
        out.push(ch);
    }

    if changed {
        Cow::Owned(out)
    } else {
        Cow::Borrowed(value)
    }
}

fn is_regex_meta(ch: char) -> bool {
    matches!(
        ch,
        '-' | '[' | ']' | '{' | '}' | '(' | ')' | '*' | '+' | '?' | '.' | ',' | '\\' | '^' | '$'
            | '|' | '#'
    ) || ch == ' '
}
