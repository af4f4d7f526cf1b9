//! Scoped, immutable views into a [`ConfigStore`].

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_yaml::Value;

use super::{ConfigStore, ScopeKey, SCOPE_MARKER};

/// A position in the policy tree, such as "github.com org `acme`, repo
/// `widgets`".
///
/// Narrowing a view returns a new one; the original is unchanged, so a view
/// can be handed to many repositories at once.
#[derive(Clone)]
pub struct ConfigView {
    store: Arc<ConfigStore>,
    path: Vec<String>,
    keys: Vec<ScopeKey>,
}

impl ConfigView {
    /// A view rooted at a literal path, e.g. `["providers", "github.com"]`.
    pub fn root(store: Arc<ConfigStore>, path: &[&str]) -> Self {
        Self {
            store,
            path: path.iter().map(|s| s.to_string()).collect(),
            keys: Vec::new(),
        }
    }

    /// Narrow to the scope `name` within `section`, literal child first.
    pub fn scope(&self, section: &str, name: &str) -> Self {
        self.push_scope(section, ScopeKey::Name(name.to_string()))
    }

    /// Narrow to the literal child `name` of `section`, ignoring patterns.
    pub fn scope_literal(&self, section: &str, name: &str) -> Self {
        self.push_scope(section, ScopeKey::Literal(name.to_string()))
    }

    /// Narrow to `section`, matching `name` against pattern children only.
    pub fn scope_wildcard(&self, section: &str, name: &str) -> Self {
        self.push_scope(section, ScopeKey::Wildcard(name.to_string()))
    }

    /// Narrow by literal path segments.
    pub fn child(&self, path: &[&str]) -> Self {
        let mut view = self.clone();
        view.path.extend(path.iter().map(|s| s.to_string()));
        view
    }

    pub fn store(&self) -> &Arc<ConfigStore> {
        &self.store
    }

    pub fn get_value(&self, path: &[&str]) -> Option<&Value> {
        let mut full: Vec<&str> = self.path.iter().map(String::as_str).collect();
        full.extend_from_slice(path);
        self.store.lookup(&full, &self.keys)
    }

    /// Typed lookup. A value of the wrong type is treated as missing.
    pub fn get<T: DeserializeOwned>(&self, path: &[&str]) -> Option<T> {
        self.get_value(path)
            .and_then(|value| serde_yaml::from_value(value.clone()).ok())
    }

    pub fn get_or<T: DeserializeOwned>(&self, path: &[&str], default: T) -> T {
        self.get(path).unwrap_or(default)
    }

    fn push_scope(&self, section: &str, key: ScopeKey) -> Self {
        let mut view = self.clone();
        view.path.push(section.to_string());
        view.path.push(SCOPE_MARKER.to_string());
        view.keys.push(key);
        view
    }
}

impl fmt::Debug for ConfigView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys = self.keys.iter();
        let rendered: Vec<String> = self
            .path
            .iter()
            .map(|segment| {
                if segment == SCOPE_MARKER {
                    match keys.next() {
                        Some(ScopeKey::Name(name)) => name.clone(),
                        Some(ScopeKey::Literal(name)) => format!("={}", name),
                        Some(ScopeKey::Wildcard(name)) => format!("*{}", name),
                        None => segment.clone(),
                    }
                } else {
                    segment.clone()
                }
            })
            .collect();
        write!(f, "ConfigView({})", rendered.join("."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> Arc<ConfigStore> {
        let doc = serde_yaml::from_str(
            r#"
providers:
  github.com:
    orgs:
      /.*/:
        default_branches: [main]
        repos:
          /.*/:
            actions: {active: [pull]}
      acme:
        default_branches: [main, develop]
        repos:
          widgets:
            actions: {active: [clone, pull]}
"#,
        )
        .unwrap();
        Arc::new(ConfigStore::new(doc).unwrap())
    }

    #[test]
    fn test_scope_narrows_without_mutating() {
        let provider = ConfigView::root(store(), &["providers", "github.com"]);
        let acme = provider.scope("orgs", "acme");
        let globex = provider.scope("orgs", "globex");

        let branches: Vec<String> = acme.get_or(&["default_branches"], Vec::new());
        assert_eq!(branches, vec!["main", "develop"]);
        let branches: Vec<String> = globex.get_or(&["default_branches"], Vec::new());
        assert_eq!(branches, vec!["main"]);
        assert!(provider.get_value(&["default_branches"]).is_none());
    }

    #[test]
    fn test_nested_scopes() {
        let provider = ConfigView::root(store(), &["providers", "github.com"]);
        let widgets = provider.scope("orgs", "acme").scope("repos", "widgets");
        let actions: Option<Vec<String>> = widgets.get(&["actions", "active"]);
        assert_eq!(actions, Some(vec!["clone".to_string(), "pull".to_string()]));

        let anything = provider.scope("orgs", "globex").scope("repos", "anything");
        let actions: Option<Vec<String>> = anything.child(&["actions"]).get(&["active"]);
        assert_eq!(actions, Some(vec!["pull".to_string()]));
    }

    #[test]
    fn test_wildcard_scope_ignores_literal_org() {
        let provider = ConfigView::root(store(), &["providers", "github.com"]);
        let repo = provider
            .scope_wildcard("orgs", "acme")
            .scope("repos", "widgets");
        let actions: Option<Vec<String>> = repo.get(&["actions", "active"]);
        assert_eq!(actions, Some(vec!["pull".to_string()]));
    }

    #[test]
    fn test_literal_scope_has_no_pattern_fallback() {
        let provider = ConfigView::root(store(), &["providers", "github.com"]);
        let globex: Option<Vec<String>> = provider
            .scope_literal("orgs", "globex")
            .get(&["default_branches"]);
        assert_eq!(globex, None);
        let acme: Option<Vec<String>> = provider
            .scope_literal("orgs", "acme")
            .get(&["default_branches"]);
        assert_eq!(acme, Some(vec!["main".to_string(), "develop".to_string()]));
    }

    #[test]
    fn test_debug_renders_scopes() {
        let view = ConfigView::root(store(), &["providers", "github.com"])
            .scope_wildcard("orgs", "acme")
            .scope("repos", "widgets");
        assert_eq!(
            format!("{:?}", view),
            "ConfigView(providers.github.com.orgs.*acme.repos.widgets)"
        );
    }
}
