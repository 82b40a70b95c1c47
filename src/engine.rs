use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use crate::compiler::ParseContext;
use crate::exec::Match;
use crate::matcher::Matcher;
use crate::token::{Scope, TokenOptions, TokenRegistry};
use crate::{Error, Result};

const DEFAULT_REPARSE_LIMIT: usize = 10_000;
const DEFAULT_TRACE_LOG_LIMIT: usize = 10_000;

/// Optional behaviour that is off until installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    /// Allows [`Engine::register_token`].
    Extensibility,
}

impl Feature {
    pub const ALL: [Feature; 1] = [Feature::Extensibility];

    /// Parses a space- or comma-separated feature list; `all` names every
    /// feature.
    pub fn parse_list(options: &str) -> Result<Vec<Feature>> {
        let mut features = Vec::new();
        for name in options
            .split(|ch: char| ch.is_whitespace() || ch == ',')
            .filter(|name| !name.is_empty())
        {
            if name == "all" {
                features.extend(Self::ALL);
            } else {
                features.push(name.parse()?);
            }
        }
        Ok(features)
    }
}

impl FromStr for Feature {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "extensibility" => Ok(Self::Extensibility),
            other => Err(Error::Usage(format!("unknown feature: {other}"))),
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Extensibility => write!(f, "extensibility"),
        }
    }
}

/// Compiler state shared by every pattern built through it: registered
/// tokens, installed features, the pattern cache and the trace log.
///
/// All pattern work goes through `&self`; an engine is meant to be owned by
/// one thread and reused.
pub struct Engine {
    pub(crate) registry: RefCell<TokenRegistry>,
    extensibility: Cell<bool>,
    cache: RefCell<HashMap<String, Rc<Matcher>>>,
    compiling: Cell<bool>,
    reparse_limit: usize,
    trace: bool,
    trace_to_stderr: bool,
    trace_logs: RefCell<VecDeque<String>>,
    trace_log_limit: usize,
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("custom_tokens", &self.registry.borrow().len())
            .field("extensibility", &self.extensibility.get())
            .field("cached", &self.cache.borrow().len())
            .field("reparse_limit", &self.reparse_limit)
            .field("trace", &self.trace)
            .finish()
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

/// Clears the compile-in-progress flag however the compile ends.
pub(crate) struct CompileGuard<'a> {
    compiling: &'a Cell<bool>,
}

impl Drop for CompileGuard<'_> {
    fn drop(&mut self) {
        self.compiling.set(false);
    }
}

impl Engine {
    pub fn new() -> Self {
        Self {
            registry: RefCell::new(TokenRegistry::default()),
            extensibility: Cell::new(false),
            cache: RefCell::new(HashMap::new()),
            compiling: Cell::new(false),
            reparse_limit: DEFAULT_REPARSE_LIMIT,
            trace: false,
            trace_to_stderr: true,
            trace_logs: RefCell::new(VecDeque::new()),
            trace_log_limit: DEFAULT_TRACE_LOG_LIMIT,
        }
    }

    pub(crate) fn enter_compile(&self) -> Result<CompileGuard<'_>> {
        if self.compiling.get() {
            return Err(Error::Usage(
                "can't compile a pattern from inside a token handler".to_string(),
            ));
        }
        self.compiling.set(true);
        Ok(CompileGuard {
            compiling: &self.compiling,
        })
    }

    pub fn install(&self, feature: Feature) {
        match feature {
            Feature::Extensibility => self.extensibility.set(true),
        }
        self.trace_line(format!("[feature] install {feature}"));
    }

    pub fn uninstall(&self, feature: Feature) {
        match feature {
            Feature::Extensibility => self.extensibility.set(false),
        }
        self.trace_line(format!("[feature] uninstall {feature}"));
    }

    pub fn is_installed(&self, feature: Feature) -> bool {
        match feature {
            Feature::Extensibility => self.extensibility.get(),
        }
    }

    /// [`Engine::install`] for every feature in a list such as
    /// `"extensibility"` or `"all"`.
    pub fn install_features(&self, options: &str) -> Result<()> {
        for feature in Feature::parse_list(options)? {
            self.install(feature);
        }
        Ok(())
    }

    pub fn uninstall_features(&self, options: &str) -> Result<()> {
        for feature in Feature::parse_list(options)? {
            self.uninstall(feature);
        }
        Ok(())
    }

    /// Adds syntax to the compiler. `pattern` is tried sticky at each scan
    /// position; newer tokens win over older ones and over the built-ins.
    ///
    /// Fails unless [`Feature::Extensibility`] is installed, and while a
    /// compile is running (from inside a handler or trigger).
    pub fn register_token<H>(&self, pattern: Matcher, handler: H, options: TokenOptions) -> Result<()>
    where
        H: Fn(&Match<'_>, Scope, &mut ParseContext) -> Result<String> + 'static,
    {
        if !self.is_installed(Feature::Extensibility) {
            return Err(Error::Usage(
                "extensibility must be installed before adding new tokens".to_string(),
            ));
        }
        if self.compiling.get() {
            return Err(Error::Usage(
                "can't register tokens while a pattern is compiling".to_string(),
            ));
        }
        let source = pattern.source().to_string();
        self.registry
            .borrow_mut()
            .register(pattern, Box::new(handler), options)?;
        self.trace_line(format!("[token] registered /{source}/"));
        Ok(())
    }

    /// Compiles through a cache keyed by pattern and flags, so the same
    /// pattern and flags always yield the same matcher.
    pub fn cache(&self, pattern: &str, flags: &str) -> Result<Rc<Matcher>> {
        let key = format!("{pattern}/{flags}");
        if let Some(hit) = self.cache.borrow().get(&key) {
            return Ok(Rc::clone(hit));
        }
        let matcher = Rc::new(self.compile(pattern, flags)?);
        self.cache.borrow_mut().insert(key, Rc::clone(&matcher));
        self.trace_line(format!("[cache] stored /{pattern}/{flags}"));
        Ok(matcher)
    }

    pub fn flush_cache(&self) {
        self.cache.borrow_mut().clear();
    }

    pub fn cached_len(&self) -> usize {
        self.cache.borrow().len()
    }

    /// Caps how many reparse expansions one compile may perform.
    pub fn set_reparse_limit(&mut self, max_expansions: usize) -> Result<()> {
        if max_expansions == 0 {
            return Err(Error::Usage(
                "reparse limit must be greater than zero".to_string(),
            ));
        }
        self.reparse_limit = max_expansions;
        Ok(())
    }

    pub fn reparse_limit(&self) -> usize {
        self.reparse_limit
    }

    pub fn enable_trace(&mut self, enabled: bool) {
        self.trace = enabled;
    }

    pub fn set_trace_stderr(&mut self, enabled: bool) {
        self.trace_to_stderr = enabled;
    }

    pub fn set_trace_log_limit(&mut self, max_entries: usize) -> Result<()> {
        if max_entries == 0 {
            return Err(Error::Usage(
                "trace log limit must be greater than zero".to_string(),
            ));
        }
        self.trace_log_limit = max_entries;
        let logs = self.trace_logs.get_mut();
        while logs.len() > self.trace_log_limit {
            logs.pop_front();
        }
        Ok(())
    }

    pub fn take_trace_logs(&mut self) -> Vec<String> {
        self.trace_logs.get_mut().drain(..).collect()
    }

    pub(crate) fn trace_line(&self, line: String) {
        if self.trace {
            if self.trace_to_stderr {
                eprintln!("{line}");
            }
            let mut logs = self.trace_logs.borrow_mut();
            if logs.len() >= self.trace_log_limit {
                logs.pop_front();
            }
            logs.push_back(line);
        }
    }
}
