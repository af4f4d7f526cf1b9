//! Pattern keys: configuration keys that match scope names by regex.
//!
//! A pattern key is written `/regex/flags`, for example `/.*/` or
//! `/widget-.*/i`. The regex must match the whole scope name. Flags are
//! regex inline flags (`i`, `m`, `s`, `x`, `U`).

use regex::Regex;

use crate::error::Result;

/// A compiled `/regex/flags` key.
#[derive(Debug, Clone)]
pub struct PatternKey {
    raw: String,
    regex: Regex,
}

impl PatternKey {
    /// Parse `raw` as a pattern key.
    ///
    /// Returns `None` when `raw` is a literal key, and `Some(Err(..))` when it
    /// has pattern syntax but the regex does not compile.
    pub fn parse(raw: &str) -> Option<Result<Self>> {
        let (pattern, flags) = split_pattern(raw)?;
        let flags = if flags.is_empty() {
            String::new()
        } else {
            format!("(?{})", flags)
        };
        Some(
            Regex::new(&format!(r"{}\A(?:{})\z", flags, pattern))
                .map(|regex| PatternKey {
                    raw: raw.to_string(),
                    regex,
                })
                .map_err(Into::into),
        )
    }

    /// The key as written in the document.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Whether the pattern matches the whole of `name`.
    pub fn matches(&self, name: &str) -> bool {
        self.regex.is_match(name)
    }
}

/// Whether `raw` uses pattern syntax, regardless of whether it compiles.
pub fn is_pattern_key(raw: &str) -> bool {
    split_pattern(raw).is_some()
}

fn split_pattern(raw: &str) -> Option<(&str, &str)> {
    let body = raw.strip_prefix('/')?;
    let end = body.rfind('/')?;
    Some((&body[..end], &body[end + 1..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(raw: &str) -> PatternKey {
        PatternKey::parse(raw).unwrap().unwrap()
    }

    #[test]
    fn test_literal_keys_are_not_patterns() {
        assert!(PatternKey::parse("acme").is_none());
        assert!(PatternKey::parse("/unterminated").is_none());
        assert!(!is_pattern_key("github.com"));
        assert!(is_pattern_key("/.*/"));
    }

    #[test]
    fn test_full_match_only() {
        let widgets = key("/widget/");
        assert!(widgets.matches("widget"));
        assert!(!widgets.matches("widgets"));
        assert!(!widgets.matches("my-widget"));
    }

    #[test]
    fn test_alternation_is_anchored_as_a_whole() {
        let either = key("/a|b/");
        assert!(either.matches("a"));
        assert!(!either.matches("ab"));
    }

    #[test]
    fn test_flags() {
        let insensitive = key("/widget-.*/i");
        assert!(insensitive.matches("WIDGET-one"));
        assert!(!key("/widget-.*/").matches("WIDGET-one"));
    }

    #[test]
    fn test_multi_line_flag_still_matches_whole_name() {
        let infra = key("/infra/m");
        assert!(infra.matches("infra"));
        assert!(!infra.matches("legacy\ninfra"));
        assert!(!infra.matches("infra\nlegacy"));
    }

    #[test]
    fn test_slashes_inside_pattern() {
        let nested = key("/team/.*/");
        assert!(nested.matches("team/infra"));
        assert_eq!(nested.raw(), "/team/.*/");
    }

    #[test]
    fn test_invalid_regex() {
        assert!(PatternKey::parse("/[a-/").unwrap().is_err());
    }
}
