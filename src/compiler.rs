use std::collections::HashMap;

use crate::builtins;
use crate::engine::Engine;
use crate::flags::{self, NativeFlags, is_flag_char};
use crate::matcher::{Matcher, Origin};
use crate::token::{Scope, TokenHit, TokenRegistry};
use crate::{Error, Result};

/// Per-compilation state handed to token handlers and triggers.
#[derive(Debug, Clone, Default)]
pub struct ParseContext {
    flags: String,
    capture_names: Vec<Option<String>>,
    has_named_capture: bool,
    pub(crate) subpatterns: Option<HashMap<String, String>>,
}

impl ParseContext {
    pub(crate) fn new(flags: &str, subpatterns: Option<HashMap<String, String>>) -> Self {
        Self {
            flags: flags.to_string(),
            subpatterns,
            ..Self::default()
        }
    }

    pub fn has_flag(&self, flag: char) -> bool {
        self.flags.contains(flag)
    }

    /// Adds a flag for the rest of this compilation; no-op if already set.
    pub fn set_flag(&mut self, flag: char) {
        if !self.has_flag(flag) {
            self.flags.push(flag);
        }
    }

    pub fn flags(&self) -> &str {
        &self.flags
    }

    /// Names of the capturing groups seen so far, `None` for unnamed ones.
    pub fn capture_names(&self) -> &[Option<String>] {
        &self.capture_names
    }

    pub fn capture_count(&self) -> usize {
        self.capture_names.len()
    }

    pub fn has_named_capture(&self) -> bool {
        self.has_named_capture
    }

    /// 1-based group number of `name`.
    pub fn capture_index(&self, name: &str) -> Option<usize> {
        self.capture_names
            .iter()
            .position(|entry| entry.as_deref() == Some(name))
            .map(|idx| idx + 1)
    }

    /// Records a capturing group the handler is about to emit and returns
    /// its group number. Every `(` a token emits as a capturing group must be
    /// recorded here, or the compile fails.
    pub fn add_capture(&mut self, name: Option<&str>) -> Result<usize> {
        if let Some(name) = name {
            if name.is_empty() || !name.chars().all(is_flag_char) {
                return Err(Error::Syntax(format!("invalid capture group name: {name:?}")));
            }
            if name.bytes().all(|b| b.is_ascii_digit()) {
                return Err(Error::Syntax(format!(
                    "can't use integer as capture name: {name}"
                )));
            }
            if self.capture_index(name).is_some() {
                return Err(Error::Syntax(format!(
                    "can't use same name for multiple groups: {name}"
                )));
            }
            self.has_named_capture = true;
        }
        self.capture_names.push(name.map(str::to_string));
        Ok(self.capture_names.len())
    }
}

impl Engine {
    /// Compiles extended syntax into a [`Matcher`].
    ///
    /// Flags may be any of `gimy` (native), `nsx` (implemented here) and flags
    /// added by registered tokens; each at most once.
    pub fn compile(&self, pattern: &str, flags: &str) -> Result<Matcher> {
        self.compile_with(pattern, flags, None)
    }

    pub(crate) fn compile_with(
        &self,
        pattern: &str,
        flags: &str,
        subpatterns: Option<HashMap<String, String>>,
    ) -> Result<Matcher> {
        let _guard = self.enter_compile()?;
        let registry = self.registry.borrow();
        flags::validate(flags, registry.custom_flags())?;

        let mut ctx = ParseContext::new(flags, subpatterns);
        let output = self.translate(&registry, pattern, &mut ctx)?;
        drop(registry);

        let info = NativeFlags::from_validated(ctx.flags());
        let group_count = ctx.capture_count();
        let matcher = Matcher::from_compiled(
            output,
            info,
            ctx.capture_names,
            Origin::Extended {
                source: pattern.to_string(),
                flags: flags.to_string(),
            },
        )?;
        self.trace_line(format!(
            "[compile] /{pattern}/{flags} -> /{}/{} groups={group_count}",
            matcher.source(),
            matcher.flags()
        ));
        Ok(matcher)
    }

    fn translate(
        &self,
        registry: &TokenRegistry,
        pattern: &str,
        ctx: &mut ParseContext,
    ) -> Result<String> {
        let mut working = pattern.to_string();
        let mut output = String::with_capacity(pattern.len());
        let mut scope = Scope::Default;
        let mut pos = 0;
        let mut expansions = 0usize;

        while pos < working.len() {
            if let Some(hit) = run_tokens(registry, &working, pos, scope, ctx)? {
                if hit.reparse {
                    expansions += 1;
                    if expansions > self.reparse_limit() {
                        return Err(Error::Usage(format!(
                            "token reparsing exceeded {} expansions while compiling /{pattern}/",
                            self.reparse_limit()
                        )));
                    }
                    working.replace_range(pos..pos + hit.len, &hit.output);
                    continue;
                }
                output.push_str(&hit.output);
                pos = if hit.len == 0 {
                    crate::exec::advance(&working, pos)
                } else {
                    pos + hit.len
                };
                continue;
            }

            if let Some(len) = native_sequence_len(&working, pos, scope) {
                output.push_str(&working[pos..pos + len]);
                pos += len;
                continue;
            }

            if scope == Scope::Default && starts_with_inline_modifier(&working[pos..]) {
                return Err(Error::Syntax(format!(
                    "mode modifier only allowed at pattern start: /{pattern}/"
                )));
            }

            let Some(ch) = working[pos..].chars().next() else {
                break;
            };
            match (scope, ch) {
                (Scope::Default, '[') => {
                    scope = Scope::Class;
                    output.push('[');
                }
                (Scope::Class, ']') => {
                    scope = Scope::Default;
                    output.push(']');
                }
                // Set-operation syntax of the host that is literal here.
                (Scope::Class, '[' | '&' | '~') => {
                    output.push('\\');
                    output.push(ch);
                }
                // Counted quantifiers were taken as native sequences above.
                (Scope::Default, '{' | '}' | ']') => {
                    output.push('\\');
                    output.push(ch);
                }
                _ => output.push(ch),
            }
            pos += ch.len_utf8();
        }
        Ok(output)
    }
}

fn run_tokens(
    registry: &TokenRegistry,
    pattern: &str,
    pos: usize,
    scope: Scope,
    ctx: &mut ParseContext,
) -> Result<Option<TokenHit>> {
    if let Some(hit) = registry.run(pattern, pos, scope, ctx)? {
        return Ok(Some(hit));
    }
    builtins::run(pattern, pos, scope, ctx, registry.custom_flags())
}

/// Length of a native sequence starting at `pos` that is copied through
/// untouched: an escape, a non-capturing or lookaround group opener, a lazy
/// quantifier suffix or a counted quantifier.
fn native_sequence_len(pattern: &str, pos: usize, scope: Scope) -> Option<usize> {
    let rest = &pattern[pos..];
    if rest.starts_with('\\') {
        return Some(escape_len(rest));
    }
    if scope == Scope::Class {
        return None;
    }
    for opener in ["(?<=", "(?<!"] {
        if rest.starts_with(opener) {
            return Some(opener.len());
        }
    }
    for opener in ["(?:", "(?=", "(?!", "(?>"] {
        if rest.starts_with(opener) {
            return Some(opener.len());
        }
    }
    let bytes = rest.as_bytes();
    if matches!(bytes[0], b'?' | b'*' | b'+') && bytes.get(1) == Some(&b'?') {
        return Some(2);
    }
    if bytes[0] == b'{' {
        return quantifier_len(rest);
    }
    None
}

/// Length of the escape sequence at the start of `rest` (which begins with a
/// backslash). Hex, Unicode and property escapes are taken whole.
fn escape_len(rest: &str) -> usize {
    let bytes = rest.as_bytes();
    let Some(next) = rest[1..].chars().next() else {
        return 1;
    };
    let hex_run = |from: usize, count: usize| {
        bytes.len() >= from + count && bytes[from..from + count].iter().all(u8::is_ascii_hexdigit)
    };
    let braced = |from: usize| {
        if bytes.get(from) != Some(&b'{') {
            return None;
        }
        rest[from..].find('}').map(|close| from + close + 1)
    };

    match next {
        'x' => braced(2).unwrap_or(if hex_run(2, 2) { 4 } else { 2 }),
        'u' => braced(2).unwrap_or(if hex_run(2, 4) { 6 } else { 2 }),
        'U' => {
            if hex_run(2, 8) {
                10
            } else {
                2
            }
        }
        'p' | 'P' => braced(2).unwrap_or_else(|| {
            match rest[2..].chars().next() {
                Some(ch) if ch.is_ascii_alphabetic() => 3,
                _ => 2,
            }
        }),
        other => 1 + other.len_utf8(),
    }
}

/// Length of a `{n}`, `{n,}` or `{n,m}` quantifier (plus a lazy `?`) at the
/// start of `rest`.
pub(crate) fn quantifier_len(rest: &str) -> Option<usize> {
    let bytes = rest.as_bytes();
    if bytes.first() != Some(&b'{') {
        return None;
    }
    let mut idx = 1;
    let digits_start = idx;
    while bytes.get(idx).is_some_and(u8::is_ascii_digit) {
        idx += 1;
    }
    if idx == digits_start {
        return None;
    }
    if bytes.get(idx) == Some(&b',') {
        idx += 1;
        while bytes.get(idx).is_some_and(u8::is_ascii_digit) {
            idx += 1;
        }
    }
    if bytes.get(idx) != Some(&b'}') {
        return None;
    }
    idx += 1;
    if bytes.get(idx) == Some(&b'?') {
        idx += 1;
    }
    Some(idx)
}

/// `(?flags)`, `(?flags:` or `(?-flags)` that the leading mode modifier
/// did not take. The host would apply these from that point on.
fn starts_with_inline_modifier(rest: &str) -> bool {
    let Some(body) = rest.strip_prefix("(?") else {
        return false;
    };
    let run = body
        .bytes()
        .take_while(|&b| b.is_ascii_alphabetic() || b == b'-')
        .count();
    run > 0 && matches!(body.as_bytes().get(run), Some(b')' | b':'))
}

/// Whether `rest` starts with a quantifier, so a separator emitted before it
/// would change what it applies to.
pub(crate) fn starts_with_quantifier(rest: &str) -> bool {
    match rest.as_bytes().first() {
        Some(b'?' | b'*' | b'+') => true,
        Some(b'{') => quantifier_len(rest).is_some(),
        _ => false,
    }
}
