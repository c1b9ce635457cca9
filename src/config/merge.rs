//! Deep merge of configuration trees.
//!
//! Merge semantics:
//! - Mappings: deep-merge by key (recursive)
//! - Sequences: REPLACE (override wins entirely)
//! - Scalars: override wins
//! - Null: override (null replaces any value)

use serde_yaml::{Mapping, Value};

/// Deep merges `overlay` on top of `base`, returning a new mapping.
///
/// Neither input is modified. Keys present only in `base` are kept as-is.
#[must_use]
pub fn merge(base: &Mapping, overlay: &Mapping) -> Mapping {
    match merge_values(Value::Mapping(base.clone()), Value::Mapping(overlay.clone())) {
        Value::Mapping(result) => result,
        // Two mappings always merge into a mapping.
        _ => Mapping::new(),
    }
}

/// Deep merges two owned YAML values.
///
/// Two mappings merge key by key; in every other combination the overlay wins.
#[must_use]
pub fn merge_values(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Mapping(mut base_map), Value::Mapping(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(slot) => {
                        let base_value = std::mem::take(slot);
                        *slot = merge_values(base_value, overlay_value);
                    }
                    None => {
                        base_map.insert(key, overlay_value);
                    }
                }
            }
            Value::Mapping(base_map)
        }
        (_, overlay) => overlay,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(src: &str) -> Mapping {
        serde_yaml::from_str(src).expect("valid yaml mapping")
    }

    #[test]
    fn test_nested_keys_merge() {
        let result = merge(&yaml("a: {b: 1}"), &yaml("a: {c: 2}"));
        assert_eq!(result, yaml("a: {b: 1, c: 2}"));
    }

    #[test]
    fn test_scalar_replaced_by_mapping() {
        let result = merge(&yaml("a: 1"), &yaml("a: {b: 2}"));
        assert_eq!(result, yaml("a: {b: 2}"));
    }

    #[test]
    fn test_sequences_are_replaced() {
        let result = merge(&yaml("e: [1, 2, 3]"), &yaml("e: [9]"));
        assert_eq!(result, yaml("e: [9]"));
    }

    #[test]
    fn test_null_override_wins() {
        let result = merge(&yaml("value: 100"), &yaml("value: null"));
        assert_eq!(result.get("value"), Some(&Value::Null));
    }

    #[test]
    fn test_mixed_document() {
        let base = yaml("a: 1\nb: {c: 2, d: 3}\ne: [1, 2, 3]");
        let overlay = yaml("a: 10\nb: {c: 20, f: 4}\ng: 5");
        let result = merge(&base, &overlay);

        assert_eq!(
            result,
            yaml("a: 10\nb: {c: 20, d: 3, f: 4}\ne: [1, 2, 3]\ng: 5")
        );
    }

    #[test]
    fn test_merge_with_self_is_identity() {
        let base = yaml("type: standard\ngcp: {project_id: p, region: r}\nlist: [1]");
        assert_eq!(merge(&base, &base), base);
    }

    #[test]
    fn test_inputs_untouched() {
        let base = yaml("a: {b: 1}");
        let overlay = yaml("a: {b: 2, c: 3}");
        let base_before = base.clone();
        let overlay_before = overlay.clone();

        let _merged = merge(&base, &overlay);

        assert_eq!(base, base_before);
        assert_eq!(overlay, overlay_before);
    }

    #[test]
    fn test_merge_values_agrees_with_merge() {
        let base = yaml("a: {b: 1, x: [1]}\nz: true");
        let overlay = yaml("a: {b: {deep: 1}, x: [2]}\ny: s");

        let owned = merge_values(Value::Mapping(base.clone()), Value::Mapping(overlay.clone()));
        assert_eq!(owned, Value::Mapping(merge(&base, &overlay)));
    }

    #[test]
    fn test_overridden_keys_keep_their_position() {
        let result = merge(&yaml("type: standard\nenvironment: local\nenabled: true"), &yaml("environment: gcp"));
        let keys: Vec<_> = result.keys().filter_map(Value::as_str).collect();
        assert_eq!(keys, vec!["type", "environment", "enabled"]);
    }
}
