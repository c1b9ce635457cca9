//! Stack inheritance resolution.
//!
//! A stack may name a parent with `extends`. The resolved stack is the parent's
//! resolved configuration deep-merged with the child's own keys, with the
//! `extends` key removed. Chains are followed to their root, so a grandchild
//! carries every ancestor's settings.

use std::collections::BTreeMap;

use serde_yaml::{Mapping, Value};
use tracing::debug;

use crate::error::{ConfigError, Result};

use super::merge::merge_values;

/// Key naming the parent stack.
pub const EXTENDS_KEY: &str = "extends";

/// Resolves `extends` references for every stack.
///
/// # Errors
///
/// Returns an error if a parent is missing, if `extends` is not a non-empty
/// string, or if the inheritance chain loops back on itself.
pub fn resolve_stacks(raw: &BTreeMap<String, Mapping>) -> Result<BTreeMap<String, Mapping>> {
    let mut resolved = BTreeMap::new();

    for name in raw.keys() {
        let mut chain = Vec::new();
        resolve_one(name, raw, &mut resolved, &mut chain)?;
    }

    Ok(resolved)
}

/// Resolves a single stack, memoizing results in `resolved`.
fn resolve_one(
    name: &str,
    raw: &BTreeMap<String, Mapping>,
    resolved: &mut BTreeMap<String, Mapping>,
    chain: &mut Vec<String>,
) -> Result<Mapping> {
    if let Some(done) = resolved.get(name) {
        return Ok(done.clone());
    }

    if chain.iter().any(|seen| seen == name) {
        let mut cycle = chain.clone();
        cycle.push(name.to_string());
        return Err(ConfigError::CircularInheritance {
            cycle: cycle.join(" -> "),
        }
        .into());
    }

    let Some(config) = raw.get(name) else {
        // Callers only pass names that were checked against `raw`.
        return Err(ConfigError::StackNotFound {
            name: name.to_string(),
        }
        .into());
    };

    let mut result = match parent_of(name, config)? {
        Some(parent) => {
            if !raw.contains_key(parent) {
                return Err(ConfigError::ParentNotFound {
                    stack: name.to_string(),
                    parent: parent.to_string(),
                }
                .into());
            }

            chain.push(name.to_string());
            let parent_config = resolve_one(parent, raw, resolved, chain)?;
            chain.pop();

            debug!("Stack '{name}' extends '{parent}'");
            match merge_values(Value::Mapping(parent_config), Value::Mapping(config.clone())) {
                Value::Mapping(merged) => merged,
                _ => config.clone(),
            }
        }
        None => config.clone(),
    };
    // A null `extends` means no parent, but the key still goes.
    result.shift_remove(EXTENDS_KEY);

    resolved.insert(name.to_string(), result.clone());
    Ok(result)
}

/// Reads the `extends` value of a raw stack, if any.
fn parent_of<'a>(name: &str, config: &'a Mapping) -> Result<Option<&'a str>> {
    match config.get(EXTENDS_KEY) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(parent)) if !parent.is_empty() => Ok(Some(parent.as_str())),
        Some(_) => Err(ConfigError::parse(
            format!("'{EXTENDS_KEY}' of stack '{name}' must be a non-empty stack name"),
            None,
        )
        .into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stacks(src: &str) -> BTreeMap<String, Mapping> {
        serde_yaml::from_str(src).expect("valid stacks yaml")
    }

    fn yaml(src: &str) -> Mapping {
        serde_yaml::from_str(src).expect("valid yaml mapping")
    }

    #[test]
    fn test_child_inherits_and_overrides() {
        let raw = stacks("base: {x: 1, y: 2}\nchild: {extends: base, y: 3}");
        let resolved = resolve_stacks(&raw).expect("resolution succeeds");

        assert_eq!(resolved["child"], yaml("x: 1\ny: 3"));
        assert!(resolved["child"].get(EXTENDS_KEY).is_none());
        assert_eq!(resolved["base"], raw["base"]);
    }

    #[test]
    fn test_missing_parent_is_reference_error() {
        let raw = stacks("child: {extends: ghost, y: 3}");
        let err = resolve_stacks(&raw).expect_err("missing parent must fail");

        assert!(matches!(
            err,
            crate::error::DeployError::Config(ConfigError::ParentNotFound { ref parent, .. })
                if parent == "ghost"
        ));
    }

    #[test]
    fn test_chain_resolves_transitively() {
        let raw = stacks(
            "root: {type: standard, gcp: {region: europe-west1}}\n\
             mid: {extends: root, gcp: {project_id: acme}}\n\
             leaf: {extends: mid, enabled: false}",
        );
        let resolved = resolve_stacks(&raw).expect("resolution succeeds");

        assert_eq!(
            resolved["leaf"],
            yaml("type: standard\ngcp: {region: europe-west1, project_id: acme}\nenabled: false")
        );
    }

    #[test]
    fn test_nested_sections_deep_merge() {
        let raw = stacks(
            "base: {superset: {replicas: 2, resources: {cpu: '1', memory: 2Gi}}}\n\
             prod: {extends: base, superset: {resources: {memory: 4Gi}}}",
        );
        let resolved = resolve_stacks(&raw).expect("resolution succeeds");

        assert_eq!(
            resolved["prod"],
            yaml("superset: {replicas: 2, resources: {cpu: '1', memory: 4Gi}}")
        );
    }

    #[test]
    fn test_cycle_is_rejected() {
        let raw = stacks("a: {extends: b}\nb: {extends: a}");
        let err = resolve_stacks(&raw).expect_err("cycle must fail");
        assert!(err.to_string().contains("a -> b -> a"));
    }

    #[test]
    fn test_self_extension_is_rejected() {
        let raw = stacks("a: {extends: a}");
        assert!(resolve_stacks(&raw).is_err());
    }

    #[test]
    fn test_non_string_extends_is_parse_error() {
        let raw = stacks("a: {extends: 3}");
        let err = resolve_stacks(&raw).expect_err("bad extends must fail");
        assert!(matches!(
            err,
            crate::error::DeployError::Config(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn test_null_extends_is_dropped() {
        let raw = stacks("s: {type: minimal, extends: null}");
        let resolved = resolve_stacks(&raw).expect("resolution succeeds");

        assert_eq!(resolved["s"], yaml("type: minimal"));
    }

    #[test]
    fn test_stacks_without_extends_are_copies() {
        let raw = stacks("solo: {type: minimal, environment: local}");
        let mut resolved = resolve_stacks(&raw).expect("resolution succeeds");
        if let Some(solo) = resolved.get_mut("solo") {
            solo.insert(Value::from("enabled"), Value::from(false));
        }
        assert!(raw["solo"].get("enabled").is_none());
    }
}
