//! Versioned validation of the merged policy document.
//!
//! Every supported document version has a validator registered in
//! [`SCHEMAS`]. Validation fails closed: a document declaring a version newer
//! than [`SUPPORTED_VERSION`](crate::defaults::SUPPORTED_VERSION), or one for
//! which no validator is registered, is rejected rather than read with an
//! older schema.

use semver::Version;
use serde_yaml::{Mapping, Value};

use super::merge::type_name;
use super::pattern::PatternKey;
use crate::action::{CloneScheme, RepoAction, RepoState};
use crate::defaults::SUPPORTED_VERSION;
use crate::error::{Error, Result};

type Validator = fn(&Value) -> Result<()>;

/// Validators by document version.
const SCHEMAS: &[(&str, Validator)] = &[("0.8", validate_v0_8)];

/// Top-level keys allowed in a 0.8 document.
const TOP_LEVEL_KEYS: &[&str] = &[
    "version",
    "src_dir",
    "concurrency",
    "clean_on_raise",
    "git",
    "providers",
];

/// Scope sections whose children are named (or pattern-keyed) scopes.
const SCOPE_SECTIONS: &[&str] = &["orgs", "repos", "topics", "groups", "projects"];

/// Parse a loose version such as `0.8` or `1` into a full semantic version.
pub fn parse_version(raw: &str) -> Result<Version> {
    let raw = raw.trim();
    let parts = raw.split('.').count();
    let padded = match parts {
        1 => format!("{}.0.0", raw),
        2 => format!("{}.0", raw),
        _ => raw.to_string(),
    };
    Ok(Version::parse(&padded)?)
}

/// The version a document declares.
pub fn document_version(doc: &Value) -> Result<Version> {
    let raw = match doc.get("version") {
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => {
            return Err(Error::Schema {
                path: "version".to_string(),
                message: format!("expected a number or string, found {}", type_name(other)),
            })
        }
        None => {
            return Err(Error::Schema {
                path: "version".to_string(),
                message: "missing".to_string(),
            })
        }
    };
    parse_version(&raw)
}

/// Validate `doc` against the schema registered for its declared version.
pub fn validate(doc: &Value) -> Result<Version> {
    let version = document_version(doc)?;
    let supported = parse_version(SUPPORTED_VERSION)?;
    if version > supported {
        return Err(Error::UnsupportedVersion {
            found: version.to_string(),
            supported: supported.to_string(),
        });
    }

    let validator = SCHEMAS
        .iter()
        .find_map(|(raw, validator)| {
            parse_version(raw)
                .ok()
                .filter(|v| *v == version)
                .map(|_| *validator)
        })
        .ok_or_else(|| Error::UnsupportedVersion {
            found: version.to_string(),
            supported: supported.to_string(),
        })?;

    validator(doc)?;
    Ok(version)
}

fn validate_v0_8(doc: &Value) -> Result<()> {
    let root = expect_mapping(doc, "<root>")?;
    for (key, value) in root {
        let name = key_name(key, "<root>")?;
        let name = name.as_str();
        match name {
            "version" => {}
            "src_dir" => expect_string(value, name)?,
            "concurrency" => {
                if value.as_u64().is_none() {
                    return Err(schema_error(name, "expected a non-negative integer"));
                }
            }
            "clean_on_raise" => expect_bool(value, name)?,
            "git" => validate_git(value)?,
            "providers" => {
                for (host, provider) in expect_mapping(value, name)? {
                    let host = key_name(host, name)?;
                    let host = host.as_str();
                    validate_scope(provider, &format!("providers.{}", host))?;
                }
            }
            other => {
                return Err(schema_error(
                    other,
                    &format!("unknown key, expected one of: {}", TOP_LEVEL_KEYS.join(", ")),
                ))
            }
        }
    }
    Ok(())
}

fn validate_git(value: &Value) -> Result<()> {
    for (key, op) in expect_mapping(value, "git")? {
        let name = key_name(key, "git")?;
        let name = name.as_str();
        let path = format!("git.{}", name);
        if !matches!(name, "clone" | "fetch" | "pull") {
            return Err(schema_error(&path, "expected one of: clone, fetch, pull"));
        }
        for (key, args) in expect_mapping(op, &path)? {
            let arg_key = key_name(key, &path)?;
            let arg_key = arg_key.as_str();
            let arg_path = format!("{}.{}", path, arg_key);
            if arg_key != "args" {
                return Err(schema_error(&arg_path, "unknown key, expected: args"));
            }
            expect_string_list(args, &arg_path)?;
        }
    }
    Ok(())
}

/// Validate one level of a provider subtree, recursing into named scopes.
fn validate_scope(value: &Value, path: &str) -> Result<()> {
    for (key, child) in expect_mapping(value, path)? {
        let name = key_name(key, path)?;
        let name = name.as_str();
        let child_path = format!("{}.{}", path, name);
        match name {
            "enabled" => expect_bool(child, &child_path)?,
            "state" => expect_enum::<RepoState>(child, &child_path)?,
            "default_branch" => expect_string(child, &child_path)?,
            "default_branches" => expect_string_list(child, &child_path)?,
            "clone_scheme" => expect_enum::<CloneScheme>(child, &child_path)?,
            "actions" => validate_actions(child, &child_path)?,
            "auth" => {
                for (key, token) in expect_mapping(child, &child_path)? {
                    let auth_key = key_name(key, &child_path)?;
                    let auth_key = auth_key.as_str();
                    let auth_path = format!("{}.{}", child_path, auth_key);
                    if auth_key != "token" {
                        return Err(schema_error(&auth_path, "unknown key, expected: token"));
                    }
                    expect_string(token, &auth_path)?;
                }
            }
            section if SCOPE_SECTIONS.contains(&section) => {
                for (scope_key, scope) in expect_mapping(child, &child_path)? {
                    let scope_name = key_name(scope_key, &child_path)?;
                    let scope_name = scope_name.as_str();
                    let scope_path = format!("{}.{}", child_path, scope_name);
                    if let Some(pattern) = PatternKey::parse(scope_name) {
                        pattern.map_err(|e| schema_error(&scope_path, &e.to_string()))?;
                    }
                    validate_scope(scope, &scope_path)?;
                }
            }
            _ => return Err(schema_error(&child_path, "unknown key")),
        }
    }
    Ok(())
}

fn validate_actions(value: &Value, path: &str) -> Result<()> {
    for (key, actions) in expect_mapping(value, path)? {
        let state = key_name(key, path)?;
        let state = state.as_str();
        let state_path = format!("{}.{}", path, state);
        state
            .parse::<RepoState>()
            .map_err(|e| schema_error(&state_path, &e))?;
        let Some(list) = actions.as_sequence() else {
            return Err(schema_error(&state_path, "expected a list of actions"));
        };
        for action in list {
            let Some(action) = action.as_str() else {
                return Err(schema_error(&state_path, "expected a list of action names"));
            };
            action
                .parse::<RepoAction>()
                .map_err(|e| schema_error(&state_path, &e))?;
        }
    }
    Ok(())
}

fn schema_error(path: &str, message: &str) -> Error {
    Error::Schema {
        path: path.to_string(),
        message: message.to_string(),
    }
}

fn key_name(key: &Value, path: &str) -> Result<String> {
    match key {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(schema_error(
            path,
            &format!("keys must be scalars, found {}", type_name(other)),
        )),
    }
}

fn expect_mapping<'a>(value: &'a Value, path: &str) -> Result<&'a Mapping> {
    value.as_mapping().ok_or_else(|| {
        schema_error(path, &format!("expected a mapping, found {}", type_name(value)))
    })
}

fn expect_bool(value: &Value, path: &str) -> Result<()> {
    match value {
        Value::Bool(_) => Ok(()),
        other => Err(schema_error(
            path,
            &format!("expected a boolean, found {}", type_name(other)),
        )),
    }
}

fn expect_string(value: &Value, path: &str) -> Result<()> {
    match value {
        Value::String(_) => Ok(()),
        other => Err(schema_error(
            path,
            &format!("expected a string, found {}", type_name(other)),
        )),
    }
}

fn expect_string_list(value: &Value, path: &str) -> Result<()> {
    match value.as_sequence() {
        Some(items) if items.iter().all(Value::is_string) => Ok(()),
        _ => Err(schema_error(path, "expected a list of strings")),
    }
}

fn expect_enum<T: std::str::FromStr<Err = String>>(value: &Value, path: &str) -> Result<()> {
    let raw = value
        .as_str()
        .ok_or_else(|| schema_error(path, "expected a string"))?;
    raw.parse::<T>().map(|_| ()).map_err(|e| schema_error(path, &e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::merge::merge_documents;
    use crate::defaults::default_document;

    fn with_defaults(user: &str) -> Value {
        merge_documents(default_document().unwrap(), serde_yaml::from_str(user).unwrap())
    }

    #[test]
    fn test_parse_version_pads_components() {
        assert_eq!(parse_version("0.8").unwrap(), Version::new(0, 8, 0));
        assert_eq!(parse_version("1").unwrap(), Version::new(1, 0, 0));
        assert_eq!(parse_version("0.8.1").unwrap(), Version::new(0, 8, 1));
        assert!(parse_version("eight").is_err());
    }

    #[test]
    fn test_defaults_are_valid() {
        let version = validate(&default_document().unwrap()).unwrap();
        assert_eq!(version, Version::new(0, 8, 0));
    }

    #[test]
    fn test_newer_version_fails_closed() {
        let err = validate(&with_defaults("version: 0.9")).unwrap_err();
        assert!(matches!(err, Error::UnsupportedVersion { .. }));
    }

    #[test]
    fn test_version_without_schema_is_rejected() {
        let err = validate(&with_defaults("version: 0.7")).unwrap_err();
        assert!(matches!(err, Error::UnsupportedVersion { .. }));
    }

    #[test]
    fn test_string_version_accepted() {
        assert!(validate(&with_defaults("version: '0.8'")).is_ok());
    }

    #[test]
    fn test_unknown_top_level_key() {
        let err = validate(&with_defaults("colour: blue")).unwrap_err();
        assert!(err.to_string().contains("colour"));
    }

    #[test]
    fn test_bad_action_name() {
        let doc = with_defaults(
            r#"
providers:
  github.com:
    orgs:
      acme:
        repos:
          widgets:
            actions:
              active: [push]
"#,
        );
        let err = validate(&doc).unwrap_err();
        match err {
            Error::Schema { path, message } => {
                assert_eq!(path, "providers.github.com.orgs.acme.repos.widgets.actions.active");
                assert!(message.contains("push"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_bad_state_key_in_actions() {
        let doc = with_defaults("providers: {generic: {repos: {x: {actions: {stale: []}}}}}");
        assert!(validate(&doc).is_err());
    }

    #[test]
    fn test_enabled_must_be_bool() {
        let doc = with_defaults("providers: {github.com: {orgs: {acme: {enabled: 'yes'}}}}");
        let err = validate(&doc).unwrap_err();
        assert!(err.to_string().contains("expected a boolean"));
    }

    #[test]
    fn test_invalid_pattern_key() {
        let doc = with_defaults("providers: {github.com: {orgs: {'/[a-/': {enabled: true}}}}");
        let err = validate(&doc).unwrap_err();
        assert!(err.to_string().contains("/[a-/"));
    }

    #[test]
    fn test_git_args_must_be_strings() {
        assert!(validate(&with_defaults("git: {clone: {args: ['--depth=1']}}")).is_ok());
        assert!(validate(&with_defaults("git: {clone: {args: [1]}}")).is_err());
        assert!(validate(&with_defaults("git: {push: {args: []}}")).is_err());
    }

    #[test]
    fn test_negative_concurrency_rejected() {
        assert!(validate(&with_defaults("concurrency: -1")).is_err());
        assert!(validate(&with_defaults("concurrency: 0")).is_ok());
    }

    #[test]
    fn test_clone_scheme_and_auth() {
        let doc = with_defaults(
            "providers: {github.com: {auth: {token: abc}, orgs: {acme: {repos: {'/.*/': {clone_scheme: ssh}}}}}}",
        );
        assert!(validate(&doc).is_ok());
        let doc = with_defaults("providers: {github.com: {orgs: {acme: {repos: {x: {clone_scheme: ftp}}}}}}");
        assert!(validate(&doc).is_err());
    }
}
