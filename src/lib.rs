//! Extended regular expressions compiled down to `fancy-regex`.
//!
//! An [`Engine`] owns the token registry, the optional-feature switches and
//! the pattern cache. It turns extended pattern syntax (named capture,
//! free-spacing, dot-all, explicit capture, leading mode modifiers and any
//! user-registered syntax) into a native pattern, and wraps the result in a
//! [`Matcher`] that remembers group names and how it was built.
//!
//! The free functions ([`exec`], [`replace`], [`split`], ...) give the same
//! result shape regardless of host quirks: nonparticipating groups are
//! `None`, searches start where they are told to, and a matcher's own cursor
//! is only touched when it iterates.
//!
//! ```no_run
//! use xregex::{Engine, Replacement, Search, replace};
//!
//! # fn main() -> xregex::Result<()> {
//! let engine = Engine::new();
//! let name = engine.compile(r"(?<first>\w+) (?<last>\w+)", "")?;
//! let swapped = replace("John Smith", Search::Regex(&name), Replacement::Text("${last}, ${first}"), None)?;
//! assert_eq!(swapped, "Smith, John");
//! # Ok(())
//! # }
//! ```

use std::error::Error as StdError;
use std::fmt;

mod builtins;
mod compiler;
mod compose;
mod engine;
mod exec;
mod flags;
mod matcher;
mod native;
mod recursive;
mod replacement;
mod token;

pub use compiler::ParseContext;
pub use compose::{Conjunction, Subpattern, UnionOptions};
pub use engine::{Engine, Feature};
pub use exec::{
    Backref, ChainStage, Match, MatchScope, Matched, ReplaceScope, ReplaceStep, Replacement,
    Search, exec, for_each, match_chain, match_scoped, replace, replace_each, split, test,
};
pub use matcher::{Matcher, Origin};
pub use native::escape;
pub use recursive::{RecursiveOptions, Segment, Unbalanced, ValueNames};
pub use token::{Scope, TokenHandler, TokenOptions, TokenTrigger};

pub type Result<T> = std::result::Result<T, Error>;

/// Which delimiter of a recursive match was left without a partner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Left => write!(f, "left"),
            Self::Right => write!(f, "right"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Malformed flags, extended syntax the compiler cannot accept, a pattern
    /// the host engine rejects, or an unresolvable replacement reference.
    Syntax(String),
    /// An argument of the wrong shape (empty pattern list, empty chain, ...).
    Type(String),
    /// A named reference that does not resolve (subpattern or chained backreference).
    Reference(String),
    /// API misuse: reentrant compilation, registration while extensibility is
    /// off, invalid configuration values, runaway reparse chains.
    Usage(String),
    /// The host engine failed while matching (e.g. backtrack limit).
    Runtime(String),
    /// The recursive matcher found a delimiter without a partner.
    Unbalanced { side: Side, position: usize },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Syntax(msg) => write!(f, "syntax error: {msg}"),
            Self::Type(msg) => write!(f, "type error: {msg}"),
            Self::Reference(msg) => write!(f, "reference error: {msg}"),
            Self::Usage(msg) => write!(f, "usage error: {msg}"),
            Self::Runtime(msg) => write!(f, "regular expression runtime error: {msg}"),
            Self::Unbalanced { side, position } => write!(
                f,
                "unbalanced {side} delimiter found in string at position {position}"
            ),
        }
    }
}

impl StdError for Error {}

#[cfg(test)]
mod tests;
