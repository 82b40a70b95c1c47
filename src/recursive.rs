use crate::compose::UnionOptions;
use crate::exec::{Search, advance};
use crate::matcher::Matcher;
use crate::native::escape;
use crate::{Engine, Error, Result, Side};

/// What to do with a delimiter that has no partner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Unbalanced {
    /// Fail with [`Error::Unbalanced`].
    #[default]
    Error,
    /// Resume after the whole unmatched left delimiter.
    Skip,
    /// Resume one character after where the unmatched left delimiter started.
    SkipLazy,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecursiveOptions {
    /// Character that makes the following character literal, so escaped
    /// delimiters are never counted.
    pub escape_char: Option<char>,
    pub unbalanced: Unbalanced,
}

/// Names for the four kinds of segment; an unnamed kind is not reported.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValueNames {
    /// Text outside any match.
    pub between: Option<String>,
    /// The outermost left delimiter.
    pub left: Option<String>,
    /// Everything between the outermost delimiters.
    pub matched: Option<String>,
    /// The outermost right delimiter.
    pub right: Option<String>,
}

impl ValueNames {
    pub fn new(
        between: Option<&str>,
        left: Option<&str>,
        matched: Option<&str>,
        right: Option<&str>,
    ) -> Self {
        Self {
            between: between.map(str::to_string),
            left: left.map(str::to_string),
            matched: matched.map(str::to_string),
            right: right.map(str::to_string),
        }
    }

    fn values_only() -> Self {
        Self::new(None, None, Some("match"), None)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub name: String,
    pub value: String,
    pub start: usize,
    pub end: usize,
}

impl Segment {
    fn slice(name: &str, subject: &str, start: usize, end: usize) -> Self {
        Self {
            name: name.to_string(),
            value: subject[start..end].to_string(),
            start,
            end,
        }
    }
}

impl Engine {
    /// Text between balanced, possibly nested, `left`/`right` delimiter
    /// pairs. `left` and `right` are extended patterns compiled with `flags`
    /// (minus `y`). Without `g` only the first outermost pair is reported;
    /// with `y` matches must follow one another without gaps.
    pub fn match_recursive(
        &self,
        subject: &str,
        left: &str,
        right: &str,
        flags: &str,
        options: &RecursiveOptions,
    ) -> Result<Vec<String>> {
        let segments =
            self.scan_recursive(subject, left, right, flags, options, &ValueNames::values_only())?;
        Ok(segments.into_iter().map(|segment| segment.value).collect())
    }

    /// Like [`Engine::match_recursive`], but reports named segments with
    /// offsets. Under `g` (and without `y`) trailing text is reported as a
    /// final between segment, so the segments cover the whole subject.
    pub fn match_recursive_segments(
        &self,
        subject: &str,
        left: &str,
        right: &str,
        flags: &str,
        options: &RecursiveOptions,
        names: &ValueNames,
    ) -> Result<Vec<Segment>> {
        self.scan_recursive(subject, left, right, flags, options, names)
    }

    fn scan_recursive(
        &self,
        subject: &str,
        left: &str,
        right: &str,
        flags: &str,
        options: &RecursiveOptions,
        names: &ValueNames,
    ) -> Result<Vec<Segment>> {
        let global = flags.contains('g');
        let sticky = flags.contains('y');
        let basic_flags: String = flags.chars().filter(|&ch| ch != 'y').collect();
        let left = self.compile(left, &basic_flags)?;
        let right = self.compile(right, &basic_flags)?;
        let escape = match options.escape_char {
            Some(escape_char) => Some(self.escape_matcher(escape_char, &left, &right, flags)?),
            None => None,
        };

        let mut output = Vec::new();
        let mut open_tokens = 0usize;
        let mut delim_start = 0;
        let mut delim_end = 0;
        let mut last_outer_end = 0;
        let mut outer_start = 0;
        let mut inner_start = 0;

        loop {
            if let Some(escape) = &escape {
                if let Some(skipped) = escape.search_at(subject, delim_end, true)? {
                    delim_end = skipped.end();
                }
            }
            let mut left_match = left.search_at(subject, delim_end, false)?;
            let mut right_match = right.search_at(subject, delim_end, false)?;
            if let (Some(found_left), Some(found_right)) = (&left_match, &right_match) {
                if found_left.index() <= found_right.index() {
                    right_match = None;
                } else {
                    left_match = None;
                }
            }

            if let Some(found) = left_match.as_ref().or(right_match.as_ref()) {
                delim_start = found.index();
                delim_end = found.end();
            } else if open_tokens == 0 {
                break;
            }
            if sticky && open_tokens == 0 && delim_start > last_outer_end {
                break;
            }

            if left_match.is_some() {
                if open_tokens == 0 {
                    outer_start = delim_start;
                    inner_start = delim_end;
                }
                open_tokens += 1;
            } else if right_match.is_some() && open_tokens > 0 {
                open_tokens -= 1;
                if open_tokens == 0 {
                    if let Some(name) = &names.between {
                        if outer_start > last_outer_end {
                            output.push(Segment::slice(name, subject, last_outer_end, outer_start));
                        }
                    }
                    if let Some(name) = &names.left {
                        output.push(Segment::slice(name, subject, outer_start, inner_start));
                    }
                    if let Some(name) = &names.matched {
                        output.push(Segment::slice(name, subject, inner_start, delim_start));
                    }
                    if let Some(name) = &names.right {
                        output.push(Segment::slice(name, subject, delim_start, delim_end));
                    }
                    last_outer_end = delim_end;
                    if !global {
                        break;
                    }
                }
            } else if options.unbalanced == Unbalanced::Error {
                let (side, position) = if right_match.is_some() {
                    (Side::Right, delim_start)
                } else {
                    (Side::Left, outer_start)
                };
                return Err(Error::Unbalanced { side, position });
            } else if left_match.is_none() && right_match.is_none() {
                // Ran out of input with an open left delimiter: drop it and
                // rescan from just after where it began.
                delim_end = match options.unbalanced {
                    Unbalanced::Skip => {
                        let left_len = left
                            .search_at(subject, outer_start, true)?
                            .map_or(0, |found| found.end() - found.index());
                        if left_len == 0 {
                            advance(subject, outer_start)
                        } else {
                            outer_start + left_len
                        }
                    }
                    _ => advance(subject, outer_start),
                };
                open_tokens = 0;
            }

            if delim_start == delim_end {
                delim_end = advance(subject, delim_end);
            }
        }

        if global && !sticky && !output.is_empty() && subject.len() > last_outer_end {
            if let Some(name) = &names.between {
                output.push(Segment::slice(name, subject, last_outer_end, subject.len()));
            }
        }
        Ok(output)
    }

    /// Sticky matcher for a run of escaped characters and text that contains
    /// neither delimiter.
    fn escape_matcher(
        &self,
        escape_char: char,
        left: &Matcher,
        right: &Matcher,
        flags: &str,
    ) -> Result<Matcher> {
        let escaped = escape(&escape_char.to_string()).into_owned();
        let delimiters = self.union(
            &[Search::Regex(left), Search::Regex(right)],
            "",
            &UnionOptions::default(),
        )?;
        let pattern = format!(
            r"(?:{escaped}[\s\S]|(?:(?!{})[^{escaped}])+)+",
            delimiters.source()
        );
        let native_flags: String = flags.chars().filter(|ch| matches!(ch, 'i' | 'm')).collect();
        Matcher::native(&pattern, &native_flags)
    }
}
