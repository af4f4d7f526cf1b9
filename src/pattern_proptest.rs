//! Property-based tests for pattern keys and scoped lookup.

#[cfg(test)]
mod proptest_tests {
    use std::sync::Arc;

    use crate::config::pattern::{is_pattern_key, PatternKey};
    use crate::config::{ConfigStore, ConfigView};
    use proptest::prelude::*;

    fn compile(raw: &str) -> PatternKey {
        PatternKey::parse(raw)
            .expect("pattern syntax")
            .expect("valid regex")
    }

    proptest! {
        /// Property: keys that do not start with a slash are literal
        #[test]
        fn literal_keys_are_never_patterns(name in "[a-zA-Z0-9_.-][a-zA-Z0-9_./-]{0,20}") {
            prop_assert!(!is_pattern_key(&name));
            prop_assert!(PatternKey::parse(&name).is_none());
        }

        /// Property: an escaped name matches itself and nothing longer
        #[test]
        fn patterns_are_anchored(name in "[a-z0-9.-]{1,12}", suffix in "[a-z0-9]{1,4}") {
            let key = compile(&format!("/{}/", regex::escape(&name)));
            prop_assert!(key.matches(&name));
            let longer = format!("{}{}", name, suffix);
            let prefixed = format!("{}{}", suffix, name);
            prop_assert!(!key.matches(&longer));
            prop_assert!(!key.matches(&prefixed));
        }

        /// Property: the catch-all pattern matches every scope name
        #[test]
        fn catch_all_matches_everything(name in "[^/\\n]{0,30}") {
            prop_assert!(compile("/.*/").matches(&name));
        }

        /// Property: the `i` flag ignores case
        #[test]
        fn case_insensitive_flag(name in "[a-z]{1,12}") {
            let key = compile(&format!("/{}/i", name));
            prop_assert!(key.matches(&name.to_uppercase()));
        }

        /// Property: a literal key always beats a pattern that also matches
        #[test]
        fn literal_scope_wins_over_pattern(name in "[a-z][a-z0-9-]{0,12}") {
            let yaml = format!(
                "providers:\n  github.com:\n    orgs:\n      '/.*/':\n        marker: pattern\n      '{}':\n        marker: literal\n",
                name
            );
            let store = Arc::new(ConfigStore::from_yaml(&yaml).unwrap());
            let view = ConfigView::root(store, &["providers", "github.com"]).scope("orgs", &name);
            prop_assert_eq!(view.get::<String>(&["marker"]), Some("literal".to_string()));
        }
    }
}
