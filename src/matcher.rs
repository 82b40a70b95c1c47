use std::cell::{Cell, OnceCell};

use crate::exec::{Match, ceil_char_boundary};
use crate::flags::{self, NativeFlags};
use crate::native::{self, RegexBuilder};
use crate::{Engine, Error, Result};

/// Where a matcher's pattern came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    /// A plain host pattern; copying never reapplies extended syntax.
    Native,
    /// Compiled from extended syntax; keeps the precompilation source and flags
    /// so copies can recompile and reapply nonnative flags.
    Extended { source: String, flags: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RegexData {
    /// One entry per capturing group, `None` for unnamed groups.
    pub(crate) capture_names: Vec<Option<String>>,
    pub(crate) origin: Origin,
}

/// A compiled pattern plus everything needed to reproduce and describe it.
///
/// The iteration cursor (`last_index`) only moves for global matchers, and
/// only through the operations in [`crate::exec`].
#[derive(Debug, Clone)]
pub struct Matcher {
    regex: native::Regex,
    /// `\G(?:source)`, built on the first sticky search. `None` when the
    /// host refuses the wrapped form; sticky searches then filter unanchored
    /// results instead.
    anchored: OnceCell<Option<native::Regex>>,
    source: String,
    flags: NativeFlags,
    data: RegexData,
    last_index: Cell<usize>,
}

impl Matcher {
    /// Builds a matcher from host syntax without running the extended
    /// compiler. Only native flags (`gimy`) are accepted.
    pub fn native(pattern: &str, flags: &str) -> Result<Self> {
        let info = NativeFlags::parse(flags)?;
        let regex = build_native(pattern, flags, info)?;
        let capture_names = regex.group_names();
        Ok(Self {
            regex,
            anchored: OnceCell::new(),
            source: pattern.to_string(),
            flags: info,
            data: RegexData {
                capture_names,
                origin: Origin::Native,
            },
            last_index: Cell::new(0),
        })
    }

    pub(crate) fn from_compiled(
        source: String,
        info: NativeFlags,
        capture_names: Vec<Option<String>>,
        origin: Origin,
    ) -> Result<Self> {
        let shown_flags = match &origin {
            Origin::Extended { flags, .. } => flags.clone(),
            Origin::Native => info.as_string(),
        };
        let regex = build_native(&source, &shown_flags, info)?;
        if regex.group_count() != capture_names.len() {
            return Err(Error::Syntax(format!(
                "compiled pattern /{source}/ has {} capturing groups but {} were recorded; \
                 a token emitted a group without registering it",
                regex.group_count(),
                capture_names.len()
            )));
        }
        Ok(Self {
            regex,
            anchored: OnceCell::new(),
            source,
            flags: info,
            data: RegexData {
                capture_names,
                origin,
            },
            last_index: Cell::new(0),
        })
    }

    /// The host-native pattern actually handed to the engine.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Native flags in canonical `gimy` order.
    pub fn flags(&self) -> String {
        self.flags.as_string()
    }

    pub fn global(&self) -> bool {
        self.flags.global
    }

    pub fn ignore_case(&self) -> bool {
        self.flags.ignore_case
    }

    pub fn multiline(&self) -> bool {
        self.flags.multiline
    }

    pub fn sticky(&self) -> bool {
        self.flags.sticky
    }

    pub fn origin(&self) -> &Origin {
        &self.data.origin
    }

    pub fn is_native(&self) -> bool {
        self.data.origin == Origin::Native
    }

    pub fn precompilation_source(&self) -> Option<&str> {
        match &self.data.origin {
            Origin::Extended { source, .. } => Some(source),
            Origin::Native => None,
        }
    }

    pub fn precompilation_flags(&self) -> Option<&str> {
        match &self.data.origin {
            Origin::Extended { flags, .. } => Some(flags),
            Origin::Native => None,
        }
    }

    pub fn capture_names(&self) -> &[Option<String>] {
        &self.data.capture_names
    }

    pub fn has_named_capture(&self) -> bool {
        self.data.capture_names.iter().any(Option::is_some)
    }

    pub fn group_count(&self) -> usize {
        self.data.capture_names.len()
    }

    /// 1-based group number for `name`.
    pub fn group_index(&self, name: &str) -> Option<usize> {
        self.data
            .capture_names
            .iter()
            .position(|entry| entry.as_deref() == Some(name))
            .map(|idx| idx + 1)
    }

    pub fn last_index(&self) -> usize {
        self.last_index.get()
    }

    pub fn set_last_index(&self, value: usize) {
        self.last_index.set(value);
    }

    /// Searches from `pos` without looking at or touching the cursor.
    pub(crate) fn search_at<'t>(
        &'t self,
        subject: &'t str,
        pos: usize,
        sticky: bool,
    ) -> Result<Option<Match<'t>>> {
        if pos > subject.len() {
            return Ok(None);
        }
        let start = if subject.is_char_boundary(pos) {
            pos
        } else if sticky {
            return Ok(None);
        } else {
            ceil_char_boundary(subject, pos)
        };

        let regex = if sticky {
            self.anchored_regex()
        } else {
            &self.regex
        };
        let captures = regex
            .captures_from_pos(subject, start)
            .map_err(|err| Error::Runtime(err.to_string()))?;
        let Some(captures) = captures else {
            return Ok(None);
        };
        let spans = captures.into_spans();
        let Some(Some(whole)) = spans.first() else {
            return Ok(None);
        };
        if sticky && whole.start != start {
            return Ok(None);
        }
        Ok(Some(Match::from_spans(subject, spans, &self.data.capture_names)))
    }

    /// The host regex anchored at the search start with `\G`, so a sticky
    /// search fails at once instead of scanning the rest of the subject.
    fn anchored_regex(&self) -> &native::Regex {
        self.anchored
            .get_or_init(|| {
                let mut builder = RegexBuilder::new(&format!(r"\G(?:{})", self.source));
                builder.case_insensitive(self.flags.ignore_case);
                builder.multi_line(self.flags.multiline);
                builder
                    .build()
                    .ok()
                    .filter(|anchored| anchored.group_count() == self.regex.group_count())
            })
            .as_ref()
            .unwrap_or(&self.regex)
    }
}

fn build_native(pattern: &str, flags: &str, info: NativeFlags) -> Result<native::Regex> {
    let mut builder = RegexBuilder::new(pattern);
    builder.case_insensitive(info.ignore_case);
    builder.multi_line(info.multiline);
    builder.build().map_err(|err| {
        Error::Syntax(format!(
            "invalid regular expression: /{pattern}/{flags}: {err}"
        ))
    })
}

impl Engine {
    /// Copies `matcher`, adding and removing flags on the way. Extended
    /// matchers are recompiled from their precompilation source so nonnative
    /// flags take effect again; native ones are rebuilt from their source.
    /// The copy starts with a fresh cursor and its own metadata.
    pub fn copy(&self, matcher: &Matcher, add_flags: &str, remove_flags: &str) -> Result<Matcher> {
        match matcher.origin() {
            Origin::Extended { source, flags } => {
                let flags = flags::adjust(flags, add_flags, remove_flags);
                self.compile(source, &flags)
            }
            Origin::Native => {
                let flags = flags::adjust(&matcher.flags(), add_flags, remove_flags);
                Matcher::native(matcher.source(), &flags)
            }
        }
    }

    /// Copy with the global flag forced on.
    pub fn globalize(&self, matcher: &Matcher) -> Result<Matcher> {
        self.copy(matcher, "g", "")
    }
}
