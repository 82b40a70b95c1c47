use std::fmt;
use std::ops::{Index, Range};

use crate::matcher::Matcher;
use crate::native::{Span, escape};
use crate::replacement;
use crate::{Error, Result};

/// One match: the whole-match span, every group span (absent when the group
/// did not participate) and the names of the groups. Borrows the subject it
/// was found in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match<'t> {
    input: &'t str,
    groups: Vec<Option<Span>>,
    names: &'t [Option<String>],
}

impl<'t> Match<'t> {
    pub(crate) fn from_spans(
        input: &'t str,
        groups: Vec<Option<Span>>,
        names: &'t [Option<String>],
    ) -> Self {
        Self {
            input,
            groups,
            names,
        }
    }

    /// The whole matched text.
    pub fn as_str(&self) -> &'t str {
        self.get(0).unwrap_or("")
    }

    /// Text of group `index`; group 0 is the whole match.
    pub fn get(&self, index: usize) -> Option<&'t str> {
        let span = self.groups.get(index).copied().flatten()?;
        self.input.get(span.start..span.end)
    }

    pub fn range(&self, index: usize) -> Option<Range<usize>> {
        let span = self.groups.get(index).copied().flatten()?;
        Some(span.start..span.end)
    }

    /// Text of the group called `name`. `None` both for unknown names and for
    /// groups that did not participate; see [`Match::has_group_name`].
    pub fn name(&self, name: &str) -> Option<&'t str> {
        let index = self.group_index(name)?;
        self.get(index)
    }

    pub fn has_group_name(&self, name: &str) -> bool {
        self.group_index(name).is_some()
    }

    fn group_index(&self, name: &str) -> Option<usize> {
        self.names
            .iter()
            .position(|entry| entry.as_deref() == Some(name))
            .map(|idx| idx + 1)
    }

    /// Start offset of the whole match.
    pub fn index(&self) -> usize {
        self.groups
            .first()
            .copied()
            .flatten()
            .map_or(0, |span| span.start)
    }

    /// End offset of the whole match.
    pub fn end(&self) -> usize {
        self.groups
            .first()
            .copied()
            .flatten()
            .map_or(0, |span| span.end)
    }

    /// The subject the match was found in.
    pub fn input(&self) -> &'t str {
        self.input
    }

    /// Number of capturing groups, not counting the whole match.
    pub fn group_count(&self) -> usize {
        self.groups.len().saturating_sub(1)
    }

    /// Every group from 1 upward, in order.
    pub fn groups(&self) -> impl Iterator<Item = Option<&'t str>> + '_ {
        (1..self.groups.len()).map(|idx| self.get(idx))
    }

    /// `(name, text)` for every named group.
    pub fn named_groups(&self) -> impl Iterator<Item = (&'t str, Option<&'t str>)> + '_ {
        self.names
            .iter()
            .enumerate()
            .filter_map(|(idx, name)| name.as_deref().map(|name| (name, self.get(idx + 1))))
    }
}

impl Index<usize> for Match<'_> {
    type Output = str;

    fn index(&self, index: usize) -> &str {
        self.get(index)
            .unwrap_or_else(|| panic!("no group at index '{index}'"))
    }
}

impl Index<&str> for Match<'_> {
    type Output = str;

    fn index(&self, name: &str) -> &str {
        self.name(name)
            .unwrap_or_else(|| panic!("no group named '{name}'"))
    }
}

/// What to search for in [`replace`] and [`split`].
#[derive(Debug, Clone, Copy)]
pub enum Search<'a> {
    /// Matched literally, never as a pattern.
    Literal(&'a str),
    Regex(&'a Matcher),
}

impl<'a> From<&'a str> for Search<'a> {
    fn from(value: &'a str) -> Self {
        Self::Literal(value)
    }
}

impl<'a> From<&'a Matcher> for Search<'a> {
    fn from(value: &'a Matcher) -> Self {
        Self::Regex(value)
    }
}

/// Replacement text (with `$` references) or a function of the match.
#[derive(Clone, Copy)]
pub enum Replacement<'a> {
    Text(&'a str),
    With(&'a dyn Fn(&Match<'_>) -> String),
}

impl fmt::Debug for Replacement<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::With(_) => f.write_str("With(<fn>)"),
        }
    }
}

impl<'a> From<&'a str> for Replacement<'a> {
    fn from(value: &'a str) -> Self {
        Self::Text(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplaceScope {
    One,
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchScope {
    One,
    All,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Matched {
    One(Option<String>),
    All(Vec<String>),
}

/// One pass of [`replace_each`].
#[derive(Debug, Clone, Copy)]
pub struct ReplaceStep<'a> {
    pub search: Search<'a>,
    pub replacement: Replacement<'a>,
    pub scope: Option<ReplaceScope>,
}

impl<'a> ReplaceStep<'a> {
    pub fn new(search: impl Into<Search<'a>>, replacement: impl Into<Replacement<'a>>) -> Self {
        Self {
            search: search.into(),
            replacement: replacement.into(),
            scope: None,
        }
    }

    pub fn scope(mut self, scope: ReplaceScope) -> Self {
        self.scope = Some(scope);
        self
    }
}

/// Which part of a chain stage's match feeds the next stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backref<'a> {
    Index(usize),
    Name(&'a str),
}

#[derive(Debug, Clone, Copy)]
pub struct ChainStage<'a> {
    pub matcher: &'a Matcher,
    pub backref: Option<Backref<'a>>,
}

impl<'a> ChainStage<'a> {
    pub fn new(matcher: &'a Matcher) -> Self {
        Self {
            matcher,
            backref: None,
        }
    }

    pub fn backref(mut self, backref: Backref<'a>) -> Self {
        self.backref = Some(backref);
        self
    }
}

impl<'a> From<&'a Matcher> for ChainStage<'a> {
    fn from(value: &'a Matcher) -> Self {
        Self::new(value)
    }
}

/// Smallest char boundary at or after `pos`.
pub(crate) fn ceil_char_boundary(subject: &str, pos: usize) -> usize {
    let mut pos = pos.min(subject.len());
    while !subject.is_char_boundary(pos) {
        pos += 1;
    }
    pos
}

/// The position one character past `pos` (or one past the end).
pub(crate) fn advance(subject: &str, pos: usize) -> usize {
    match subject.get(pos..).and_then(|rest| rest.chars().next()) {
        Some(ch) => pos + ch.len_utf8(),
        None => pos + 1,
    }
}

/// Walks every match from offset 0, stepping one character past empty
/// matches. Honours the matcher's sticky flag (matches must be contiguous)
/// and never reads or writes its cursor. `visit` returns whether to go on.
pub(crate) fn scan<'t, F>(subject: &'t str, matcher: &'t Matcher, mut visit: F) -> Result<()>
where
    F: FnMut(Match<'t>) -> Result<bool>,
{
    let sticky = matcher.sticky();
    let mut pos = 0;
    while pos <= subject.len() {
        let Some(found) = matcher.search_at(subject, pos, sticky)? else {
            break;
        };
        pos = if found.end() == found.index() {
            advance(subject, found.end())
        } else {
            found.end()
        };
        if !visit(found)? {
            break;
        }
    }
    Ok(())
}

/// Searches `subject` from `pos`. With `sticky` (or a sticky matcher) the
/// match must start exactly at `pos`. Global matchers have their cursor set
/// to the match end, or reset to 0 when nothing matches.
pub fn exec<'t>(
    subject: &'t str,
    matcher: &'t Matcher,
    pos: usize,
    sticky: bool,
) -> Result<Option<Match<'t>>> {
    let found = matcher.search_at(subject, pos, sticky || matcher.sticky())?;
    if matcher.global() {
        matcher.set_last_index(found.as_ref().map_or(0, Match::end));
    }
    Ok(found)
}

pub fn test(subject: &str, matcher: &Matcher, pos: usize, sticky: bool) -> Result<bool> {
    Ok(exec(subject, matcher, pos, sticky)?.is_some())
}

/// First match text or every match text. Without an explicit scope, global
/// matchers collect all matches and others return the first.
pub fn match_scoped(subject: &str, matcher: &Matcher, scope: Option<MatchScope>) -> Result<Matched> {
    let scope = scope.unwrap_or(if matcher.global() {
        MatchScope::All
    } else {
        MatchScope::One
    });
    match scope {
        MatchScope::One => {
            let found = matcher.search_at(subject, 0, matcher.sticky())?;
            if matcher.global() {
                matcher.set_last_index(found.as_ref().map_or(0, Match::end));
            }
            Ok(Matched::One(found.map(|found| found.as_str().to_string())))
        }
        MatchScope::All => {
            let mut texts = Vec::new();
            scan(subject, matcher, |found| {
                texts.push(found.as_str().to_string());
                Ok(true)
            })?;
            if matcher.global() {
                matcher.set_last_index(0);
            }
            Ok(Matched::All(texts))
        }
    }
}

/// Calls `callback(match, ordinal, subject, matcher)` for every match.
/// Global matchers see their cursor at the current match end inside the
/// callback and reset to 0 afterwards; changing the cursor from the callback
/// does not steer the iteration.
pub fn for_each<F>(subject: &str, matcher: &Matcher, mut callback: F) -> Result<()>
where
    F: FnMut(&Match<'_>, usize, &str, &Matcher),
{
    let mut ordinal = 0;
    scan(subject, matcher, |found| {
        if matcher.global() {
            matcher.set_last_index(found.end());
        }
        callback(&found, ordinal, subject, matcher);
        ordinal += 1;
        Ok(true)
    })?;
    if matcher.global() {
        matcher.set_last_index(0);
    }
    Ok(())
}

/// Replaces the first match, or every match for [`ReplaceScope::All`].
/// Without an explicit scope a regex search follows its global flag and a
/// literal search replaces once.
pub fn replace(
    subject: &str,
    search: Search<'_>,
    replacement: Replacement<'_>,
    scope: Option<ReplaceScope>,
) -> Result<String> {
    let literal: Matcher;
    let (matcher, all) = match search {
        Search::Regex(matcher) => (
            matcher,
            scope.map_or(matcher.global(), |scope| scope == ReplaceScope::All),
        ),
        Search::Literal(text) => {
            literal = Matcher::native(&escape(text), "")?;
            (&literal, scope == Some(ReplaceScope::All))
        }
    };

    let mut out = String::with_capacity(subject.len());
    let mut last_end = 0;
    scan(subject, matcher, |found| {
        out.push_str(&subject[last_end..found.index()]);
        if matcher.global() {
            matcher.set_last_index(found.end());
        }
        match replacement {
            Replacement::Text(template) => out.push_str(&replacement::expand(template, &found)?),
            Replacement::With(function) => out.push_str(&function(&found)),
        }
        last_end = found.end();
        Ok(all)
    })?;
    out.push_str(&subject[last_end..]);

    if matcher.global() {
        matcher.set_last_index(0);
    }
    Ok(out)
}

/// Runs each replacement over the previous one's output.
pub fn replace_each(subject: &str, steps: &[ReplaceStep<'_>]) -> Result<String> {
    let mut output = subject.to_string();
    for step in steps {
        output = replace(&output, step.search, step.replacement, step.scope)?;
    }
    Ok(output)
}

/// Splits around every separator match. Groups captured by a regex
/// separator are spliced in, `None` where they did not participate. `limit`
/// caps the number of pieces returned.
pub fn split(subject: &str, separator: Search<'_>, limit: Option<usize>) -> Result<Vec<Option<String>>> {
    let literal: Matcher;
    let separator = match separator {
        Search::Regex(matcher) => matcher,
        Search::Literal(text) => {
            literal = Matcher::native(&escape(text), "")?;
            &literal
        }
    };
    let limit = limit.unwrap_or(usize::MAX);
    if limit == 0 {
        return Ok(Vec::new());
    }

    let mut output = Vec::new();
    let mut last_last = 0;
    let mut last_length = 0;
    let mut pos = 0;
    while pos <= subject.len() {
        let Some(found) = separator.search_at(subject, pos, false)? else {
            break;
        };
        let end = found.end();
        if end > last_last {
            output.push(Some(subject[last_last..found.index()].to_string()));
            if found.group_count() > 0 && found.index() < subject.len() {
                output.extend(found.groups().map(|group| group.map(str::to_string)));
            }
            last_length = end - found.index();
            last_last = end;
            if output.len() >= limit {
                break;
            }
        }
        pos = if end == found.index() {
            advance(subject, end)
        } else {
            end
        };
    }

    if last_last == subject.len() {
        if last_length > 0 || separator.search_at("", 0, false)?.is_none() {
            output.push(Some(String::new()));
        }
    } else {
        output.push(Some(subject[last_last..].to_string()));
    }
    output.truncate(limit);
    Ok(output)
}

/// Feeds every match of one stage into the next and returns the last
/// stage's matches. A stage's backreference picks the group passed on.
pub fn match_chain(subject: &str, stages: &[ChainStage<'_>]) -> Result<Vec<String>> {
    if stages.is_empty() {
        return Err(Error::Type(
            "match chain needs at least one stage".to_string(),
        ));
    }

    let mut values = vec![subject.to_string()];
    for (level, stage) in stages.iter().enumerate() {
        let mut matches = Vec::new();
        for value in &values {
            scan(value, stage.matcher, |found| {
                let text = match stage.backref {
                    None => Some(found.as_str()),
                    Some(Backref::Index(index)) => {
                        if index > found.group_count() {
                            return Err(Error::Reference(format!(
                                "backreference to undefined group: {index}"
                            )));
                        }
                        found.get(index)
                    }
                    Some(Backref::Name(name)) => {
                        if !found.has_group_name(name) {
                            return Err(Error::Reference(format!(
                                "backreference to undefined group: {name}"
                            )));
                        }
                        found.name(name)
                    }
                };
                matches.push(text.unwrap_or("").to_string());
                Ok(true)
            })?;
        }
        if stage.matcher.global() {
            stage.matcher.set_last_index(0);
        }
        if level + 1 == stages.len() || matches.is_empty() {
            return Ok(matches);
        }
        values = matches;
    }
    Ok(values)
}
