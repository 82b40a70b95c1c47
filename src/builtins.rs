//! The syntax every engine understands out of the box. Built-ins rank below
//! custom tokens and among themselves the later entry of [`BUILTINS`] wins.

use std::collections::HashSet;

use crate::compiler::{ParseContext, starts_with_quantifier};
use crate::exec::Match;
use crate::flags::{ITERATION_FLAGS, is_flag_char, is_known_flag};
use crate::native::Span;
use crate::token::{Scope, TokenHit};
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Builtin {
    /// `[]` and `[^]`, which the host would reject.
    EmptyClass,
    /// `(?#...)`
    InlineComment,
    /// Leading `(?imnsx)`.
    ModeModifier,
    /// `\k<name>`
    NamedBackref,
    /// `\1`, `\0`, and octal-looking escapes.
    NumberedBackref,
    /// Whitespace and `#` comments under flag `x`.
    FreeSpacing,
    /// `.` under flag `s`.
    DotAll,
    /// `(?<name>` and `(?P<name>`
    NamedGroup,
    /// `(` under flag `n`, and group bookkeeping otherwise.
    CaptureGroup,
    /// `{{name}}` while building from subpatterns.
    Subpattern,
}

/// In registration order.
pub(crate) const BUILTINS: [Builtin; 10] = [
    Builtin::EmptyClass,
    Builtin::InlineComment,
    Builtin::ModeModifier,
    Builtin::NamedBackref,
    Builtin::NumberedBackref,
    Builtin::FreeSpacing,
    Builtin::DotAll,
    Builtin::NamedGroup,
    Builtin::CaptureGroup,
    Builtin::Subpattern,
];

impl Builtin {
    fn scope(self) -> Scope {
        match self {
            Self::NumberedBackref | Self::Subpattern => Scope::All,
            _ => Scope::Default,
        }
    }

    fn reparse(self) -> bool {
        self == Self::Subpattern
    }

    fn triggered(self, ctx: &ParseContext) -> bool {
        match self {
            Self::FreeSpacing => ctx.has_flag('x'),
            Self::DotAll => ctx.has_flag('s'),
            Self::Subpattern => ctx.subpatterns.is_some(),
            _ => true,
        }
    }

    /// Matches this token at exactly `pos`.
    fn scan(self, pattern: &str, pos: usize) -> Option<Match<'_>> {
        let rest = &pattern[pos..];
        match self {
            Self::EmptyClass => {
                if rest.starts_with("[]") {
                    Some(token_match(pattern, pos, 2, &[(pos + 1, pos + 1)]))
                } else if rest.starts_with("[^]") {
                    Some(token_match(pattern, pos, 3, &[(pos + 1, pos + 2)]))
                } else {
                    None
                }
            }
            Self::InlineComment => {
                let body = rest.strip_prefix("(?#")?;
                let close = body.find(')')?;
                Some(token_match(pattern, pos, 3 + close + 1, &[]))
            }
            Self::ModeModifier => {
                if pos != 0 {
                    return None;
                }
                let body = rest.strip_prefix("(?")?;
                let name_len = flag_run(body);
                if name_len == 0 || body.as_bytes().get(name_len) != Some(&b')') {
                    return None;
                }
                Some(token_match(pattern, pos, 2 + name_len + 1, &[(pos + 2, pos + 2 + name_len)]))
            }
            Self::NamedBackref => {
                let body = rest.strip_prefix("\\k<")?;
                let name_len = flag_run(body);
                if name_len == 0 || body.as_bytes().get(name_len) != Some(&b'>') {
                    return None;
                }
                Some(token_match(pattern, pos, 3 + name_len + 1, &[(pos + 3, pos + 3 + name_len)]))
            }
            Self::NumberedBackref => {
                let body = rest.strip_prefix('\\')?;
                let digits = body.bytes().take_while(u8::is_ascii_digit).count();
                if digits == 0 {
                    return None;
                }
                Some(token_match(pattern, pos, 1 + digits, &[(pos + 1, pos + 1 + digits)]))
            }
            Self::FreeSpacing => {
                let len = free_spacing_len(rest);
                (len > 0).then(|| token_match(pattern, pos, len, &[]))
            }
            Self::DotAll => rest
                .starts_with('.')
                .then(|| token_match(pattern, pos, 1, &[])),
            Self::NamedGroup => {
                let prefix = if rest.starts_with("(?P<") {
                    4
                } else if rest.starts_with("(?<") {
                    3
                } else {
                    return None;
                };
                let name_len = flag_run(&rest[prefix..]);
                if name_len == 0 || rest.as_bytes().get(prefix + name_len) != Some(&b'>') {
                    return None;
                }
                Some(token_match(
                    pattern,
                    pos,
                    prefix + name_len + 1,
                    &[(pos + prefix, pos + prefix + name_len)],
                ))
            }
            Self::CaptureGroup => {
                let bytes = rest.as_bytes();
                (bytes.first() == Some(&b'(') && bytes.get(1) != Some(&b'?'))
                    .then(|| token_match(pattern, pos, 1, &[]))
            }
            Self::Subpattern => {
                let body = rest.strip_prefix("{{")?;
                let name_len = flag_run(body);
                if name_len == 0 || !body[name_len..].starts_with("}}") {
                    return None;
                }
                Some(token_match(pattern, pos, 2 + name_len + 2, &[(pos + 2, pos + 2 + name_len)]))
            }
        }
    }

    fn handle(
        self,
        found: &Match<'_>,
        scope: Scope,
        ctx: &mut ParseContext,
        custom_flags: &HashSet<char>,
    ) -> Result<String> {
        let after = &found.input()[found.end()..];
        match self {
            Self::EmptyClass => Ok(if found.get(1) == Some("^") {
                r"[\s\S]".to_string()
            } else {
                r"\b\B".to_string()
            }),
            Self::InlineComment | Self::FreeSpacing => Ok(separator_before(after)),
            Self::ModeModifier => {
                let flags = found.get(1).unwrap_or("");
                for flag in flags.chars() {
                    if ITERATION_FLAGS.contains(flag) {
                        return Err(Error::Syntax(format!(
                            "can't use flag {flag} in mode modifier {}",
                            found.as_str()
                        )));
                    }
                    if !is_known_flag(flag, custom_flags) {
                        return Err(Error::Syntax(format!(
                            "unknown flag {flag} in mode modifier {}",
                            found.as_str()
                        )));
                    }
                    ctx.set_flag(flag);
                }
                Ok(String::new())
            }
            Self::NamedBackref => {
                let name = found.get(1).unwrap_or("");
                let index = ctx.capture_index(name).ok_or_else(|| {
                    Error::Syntax(format!("backreference to undefined group {}", found.as_str()))
                })?;
                Ok(numbered_backref(index, after))
            }
            Self::NumberedBackref => {
                let digits = found.get(1).unwrap_or("");
                if digits == "0" {
                    return Ok(r"\x00".to_string());
                }
                if digits.starts_with('0') {
                    return Err(Error::Syntax(format!(
                        "octal escapes are not supported: {}",
                        found.as_str()
                    )));
                }
                if scope == Scope::Class {
                    return Err(Error::Syntax(format!(
                        "can't use backreference {} inside a character class",
                        found.as_str()
                    )));
                }
                let index = digits
                    .parse::<usize>()
                    .ok()
                    .filter(|&index| index <= ctx.capture_count())
                    .ok_or_else(|| {
                        Error::Syntax(format!(
                            "backreference to undefined group {}",
                            found.as_str()
                        ))
                    })?;
                Ok(format!("\\{index}"))
            }
            Self::DotAll => Ok(r"[\s\S]".to_string()),
            Self::NamedGroup => {
                ctx.add_capture(found.get(1))?;
                Ok("(".to_string())
            }
            Self::CaptureGroup => {
                if ctx.has_flag('n') {
                    return Ok("(?:".to_string());
                }
                ctx.add_capture(None)?;
                Ok("(".to_string())
            }
            Self::Subpattern => {
                let name = found.get(1).unwrap_or("");
                let sub = ctx
                    .subpatterns
                    .as_ref()
                    .and_then(|subs| subs.get(name))
                    .ok_or_else(|| Error::Reference(format!("undefined subpattern: {name}")))?;
                Ok(format!("(?:{sub})"))
            }
        }
    }
}

/// Runs the built-ins at `pos`, last registered first.
pub(crate) fn run(
    pattern: &str,
    pos: usize,
    scope: Scope,
    ctx: &mut ParseContext,
    custom_flags: &HashSet<char>,
) -> Result<Option<TokenHit>> {
    for builtin in BUILTINS.iter().rev().copied() {
        if !builtin.scope().admits(scope) || !builtin.triggered(ctx) {
            continue;
        }
        let Some(found) = builtin.scan(pattern, pos) else {
            continue;
        };
        let output = builtin.handle(&found, scope, ctx, custom_flags)?;
        return Ok(Some(TokenHit {
            output,
            len: found.end() - found.index(),
            reparse: builtin.reparse(),
        }));
    }
    Ok(None)
}

fn token_match<'t>(
    pattern: &'t str,
    pos: usize,
    len: usize,
    groups: &[(usize, usize)],
) -> Match<'t> {
    let mut spans = Vec::with_capacity(groups.len() + 1);
    spans.push(Some(Span {
        start: pos,
        end: pos + len,
    }));
    spans.extend(
        groups
            .iter()
            .map(|&(start, end)| Some(Span { start, end })),
    );
    Match::from_spans(pattern, spans, &[])
}

fn flag_run(text: &str) -> usize {
    text.chars()
        .take_while(|&ch| is_flag_char(ch))
        .map(char::len_utf8)
        .sum()
}

/// Whitespace and `#` line comments, as consumed under flag `x`.
fn free_spacing_len(rest: &str) -> usize {
    let mut len = 0;
    loop {
        let tail = &rest[len..];
        let Some(ch) = tail.chars().next() else {
            break;
        };
        if ch.is_whitespace() {
            len += ch.len_utf8();
        } else if ch == '#' {
            len += tail.find(['\n', '\r']).unwrap_or(tail.len());
        } else {
            break;
        }
    }
    len
}

/// Keeps the tokens on either side of a removed span apart, unless a
/// quantifier follows and would then bind to the separator.
fn separator_before(after: &str) -> String {
    if starts_with_quantifier(after) {
        String::new()
    } else {
        "(?:)".to_string()
    }
}

fn numbered_backref(index: usize, after: &str) -> String {
    if after.starts_with(|ch: char| ch.is_ascii_digit()) {
        format!("\\{index}(?:)")
    } else {
        format!("\\{index}")
    }
}
