use std::collections::HashSet;
use std::fmt;

use crate::compiler::ParseContext;
use crate::exec::Match;
use crate::flags::{self, is_flag_char};
use crate::matcher::Matcher;
use crate::{Error, Result};

/// Turns a token match into the native text emitted in its place.
pub type TokenHandler = Box<dyn Fn(&Match<'_>, Scope, &mut ParseContext) -> Result<String>>;

/// Extra condition checked before a token pattern is tried.
pub type TokenTrigger = Box<dyn Fn(&ParseContext) -> bool>;

/// Where in a pattern a token applies: outside character classes, inside
/// them, or both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scope {
    #[default]
    Default,
    Class,
    All,
}

impl Scope {
    pub(crate) fn admits(self, current: Scope) -> bool {
        self == Scope::All || self == current
    }
}

/// Registration options for [`crate::Engine::register_token`].
#[derive(Default)]
pub struct TokenOptions {
    scope: Scope,
    trigger: Option<TokenTrigger>,
    flag: Option<char>,
    optional_flags: Vec<char>,
    reparse: bool,
    flag_error: Option<Error>,
}

impl fmt::Debug for TokenOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenOptions")
            .field("scope", &self.scope)
            .field("trigger", &self.trigger.as_ref().map(|_| "<fn>"))
            .field("flag", &self.flag)
            .field("optional_flags", &self.optional_flags)
            .field("reparse", &self.reparse)
            .finish()
    }
}

impl TokenOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scope(&mut self, scope: Scope) -> &mut Self {
        self.scope = scope;
        self
    }

    pub fn trigger<F>(&mut self, trigger: F) -> &mut Self
    where
        F: Fn(&ParseContext) -> bool + 'static,
    {
        self.trigger = Some(Box::new(trigger));
        self
    }

    /// Registers a single-character flag and only runs the token while the
    /// pattern carries it. Anything but one flag character is rejected at
    /// registration.
    pub fn flag(&mut self, flag: &str) -> &mut Self {
        let mut chars = flag.chars();
        match (chars.next(), chars.next()) {
            (Some(ch), None) if is_flag_char(ch) => self.flag = Some(ch),
            _ => {
                self.flag_error = Some(Error::Usage(format!(
                    "flag must be a single character A-Za-z0-9_$, got {flag:?}"
                )));
            }
        }
        self
    }

    /// Flags to register without making the token depend on them.
    pub fn optional_flags(&mut self, flags: &str) -> &mut Self {
        self.optional_flags = flags.chars().collect();
        self
    }

    /// Splice the handler output back into the pattern and scan it again.
    pub fn reparse(&mut self, reparse: bool) -> &mut Self {
        self.reparse = reparse;
        self
    }
}

pub(crate) struct CustomToken {
    pattern: Matcher,
    handler: TokenHandler,
    scope: Scope,
    flag: Option<char>,
    trigger: Option<TokenTrigger>,
    reparse: bool,
}

impl CustomToken {
    fn triggered(&self, ctx: &ParseContext) -> bool {
        if let Some(flag) = self.flag {
            if !ctx.has_flag(flag) {
                return false;
            }
        }
        self.trigger.as_ref().is_none_or(|trigger| trigger(ctx))
    }
}

/// A token that matched at the scan position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TokenHit {
    pub(crate) output: String,
    pub(crate) len: usize,
    pub(crate) reparse: bool,
}

/// User-registered tokens and the flags they introduced.
#[derive(Default)]
pub(crate) struct TokenRegistry {
    tokens: Vec<CustomToken>,
    flags: HashSet<char>,
}

impl TokenRegistry {
    pub(crate) fn register(
        &mut self,
        pattern: Matcher,
        handler: TokenHandler,
        options: TokenOptions,
    ) -> Result<()> {
        if let Some(err) = options.flag_error {
            return Err(err);
        }
        for ch in &options.optional_flags {
            if !is_flag_char(*ch) {
                return Err(Error::Usage(format!(
                    "flags must be characters A-Za-z0-9_$, got {ch:?}"
                )));
            }
        }
        for ch in options.flag.iter().chain(options.optional_flags.iter()) {
            if !flags::is_known_flag(*ch, &self.flags) {
                self.flags.insert(*ch);
            }
        }
        self.tokens.push(CustomToken {
            pattern,
            handler,
            scope: options.scope,
            flag: options.flag,
            trigger: options.trigger,
            reparse: options.reparse,
        });
        Ok(())
    }

    pub(crate) fn custom_flags(&self) -> &HashSet<char> {
        &self.flags
    }

    pub(crate) fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Tries custom tokens newest first; the first sticky match at `pos` wins.
    pub(crate) fn run(
        &self,
        pattern: &str,
        pos: usize,
        scope: Scope,
        ctx: &mut ParseContext,
    ) -> Result<Option<TokenHit>> {
        for token in self.tokens.iter().rev() {
            if !token.scope.admits(scope) || !token.triggered(ctx) {
                continue;
            }
            let Some(found) = token.pattern.search_at(pattern, pos, true)? else {
                continue;
            };
            let output = (token.handler)(&found, scope, ctx)?;
            return Ok(Some(TokenHit {
                output,
                len: found.end() - found.index(),
                reparse: token.reparse,
            }));
        }
        Ok(None)
    }
}
