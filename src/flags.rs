use std::collections::HashSet;

use crate::{Error, Result};

/// Flags the host understands (`i`, `m`) or that drive iteration (`g`, `y`).
pub(crate) const NATIVE_FLAGS: &str = "gimy";

/// Flags implemented by built-in tokens.
pub(crate) const NONNATIVE_FLAGS: &str = "nsx";

/// Flags a leading mode modifier may not carry.
pub(crate) const ITERATION_FLAGS: &str = "gy";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct NativeFlags {
    pub(crate) global: bool,
    pub(crate) ignore_case: bool,
    pub(crate) multiline: bool,
    pub(crate) sticky: bool,
}

impl NativeFlags {
    /// Picks the native flags out of an already validated flag string.
    pub(crate) fn from_validated(flags: &str) -> Self {
        let mut info = Self::default();
        for ch in flags.chars() {
            info.set(ch);
        }
        info
    }

    /// Parses a flag string meant for a plain (non-extended) pattern.
    pub(crate) fn parse(flags: &str) -> Result<Self> {
        let mut info = Self::default();
        let mut seen = HashSet::new();
        for ch in flags.chars() {
            if !seen.insert(ch) {
                return Err(Error::Syntax(format!(
                    "invalid duplicate regular expression flag: {flags}"
                )));
            }
            if !NATIVE_FLAGS.contains(ch) {
                return Err(Error::Syntax(format!(
                    "unknown regular expression flag {ch:?} for a native pattern: {flags}"
                )));
            }
            info.set(ch);
        }
        Ok(info)
    }

    fn set(&mut self, ch: char) {
        match ch {
            'g' => self.global = true,
            'i' => self.ignore_case = true,
            'm' => self.multiline = true,
            'y' => self.sticky = true,
            _ => {}
        }
    }

    pub(crate) fn as_string(&self) -> String {
        let mut out = String::with_capacity(4);
        for (enabled, ch) in [
            (self.global, 'g'),
            (self.ignore_case, 'i'),
            (self.multiline, 'm'),
            (self.sticky, 'y'),
        ] {
            if enabled {
                out.push(ch);
            }
        }
        out
    }
}

pub(crate) fn is_flag_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_' || ch == '$'
}

pub(crate) fn is_known_flag(ch: char, custom: &HashSet<char>) -> bool {
    NATIVE_FLAGS.contains(ch) || NONNATIVE_FLAGS.contains(ch) || custom.contains(&ch)
}

/// Rejects duplicated and unknown flags before a compile starts.
pub(crate) fn validate(flags: &str, custom: &HashSet<char>) -> Result<()> {
    let mut seen = HashSet::new();
    for ch in flags.chars() {
        if !seen.insert(ch) {
            return Err(Error::Syntax(format!(
                "invalid duplicate regular expression flag {ch:?} in {flags:?}"
            )));
        }
        if !is_known_flag(ch, custom) {
            return Err(Error::Syntax(format!(
                "unknown regular expression flag {ch:?} in {flags:?}"
            )));
        }
    }
    Ok(())
}

/// `flags` plus `add`, minus anything in `remove`, first occurrence kept.
pub(crate) fn adjust(flags: &str, add: &str, remove: &str) -> String {
    let mut out = String::with_capacity(flags.len() + add.len());
    for ch in flags.chars().chain(add.chars()) {
        if !remove.contains(ch) && !out.contains(ch) {
            out.push(ch);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adjust_deduplicates_and_removes() {
        assert_eq!(adjust("gix", "gs", "i"), "gxs");
        assert_eq!(adjust("", "g", ""), "g");
        assert_eq!(adjust("gy", "", "gy"), "");
    }

    #[test]
    fn native_flags_render_in_canonical_order() -> Result<()> {
        let info = NativeFlags::parse("ymig")?;
        assert_eq!(info.as_string(), "gimy");
        Ok(())
    }

    #[test]
    fn native_flags_reject_nonnative_and_duplicates() {
        assert!(matches!(NativeFlags::parse("x"), Err(Error::Syntax(_))));
        assert!(matches!(NativeFlags::parse("gg"), Err(Error::Syntax(_))));
    }

    #[test]
    fn validate_accepts_custom_flags() -> Result<()> {
        let custom: HashSet<char> = ['$'].into_iter().collect();
        validate("gimnsxy$", &custom)?;
        assert!(matches!(validate("q", &custom), Err(Error::Syntax(_))));
        assert!(matches!(validate("xx", &custom), Err(Error::Syntax(_))));
        Ok(())
    }
}
