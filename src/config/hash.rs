//! Configuration hashing for change detection.
//!
//! Produces a deterministic SHA-256 fingerprint of a resolved stack. Mapping
//! keys are hashed in sorted order, so two stacks that differ only in key
//! order share a fingerprint.

use serde_yaml::{Mapping, Value};
use sha2::{Digest, Sha256};

use super::spec::SystemConfig;

/// Hasher for computing configuration fingerprints.
#[derive(Debug, Default)]
pub struct ConfigHasher;

impl ConfigHasher {
    /// Creates a new configuration hasher.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Computes the fingerprint of a single resolved stack.
    #[must_use]
    pub fn hash_stack(&self, stack: &Mapping) -> String {
        let mut hasher = Sha256::new();
        feed_mapping(&mut hasher, stack);
        hex::encode(hasher.finalize())
    }

    /// Computes a fingerprint covering `global` and every stack.
    #[must_use]
    pub fn hash_system(&self, config: &SystemConfig) -> String {
        let mut hasher = Sha256::new();
        feed_mapping(&mut hasher, &config.global);

        for (name, stack) in &config.stacks {
            hasher.update(name.as_bytes());
            hasher.update(self.hash_stack(stack).as_bytes());
        }

        hex::encode(hasher.finalize())
    }

    /// Computes a short hash (first 8 characters) for display purposes.
    #[must_use]
    pub fn short_hash(&self, hash: &str) -> String {
        hash.chars().take(8).collect()
    }
}

/// Feeds a value with a one-byte type tag so that `"1"` and `1` differ.
fn feed_value(hasher: &mut Sha256, value: &Value) {
    match value {
        Value::Null => hasher.update([0u8]),
        Value::Bool(b) => hasher.update([1u8, u8::from(*b)]),
        Value::Number(n) => {
            hasher.update([2u8]);
            feed_str(hasher, &n.to_string());
        }
        Value::String(s) => {
            hasher.update([3u8]);
            feed_str(hasher, s);
        }
        Value::Sequence(items) => {
            hasher.update([4u8]);
            hasher.update((items.len() as u64).to_be_bytes());
            for item in items {
                feed_value(hasher, item);
            }
        }
        Value::Mapping(map) => feed_mapping(hasher, map),
        Value::Tagged(tagged) => {
            hasher.update([6u8]);
            feed_str(hasher, &tagged.tag.to_string());
            feed_value(hasher, &tagged.value);
        }
    }
}

fn feed_mapping(hasher: &mut Sha256, map: &Mapping) {
    // Keys sorted by their YAML rendering for determinism.
    let mut entries: Vec<_> = map
        .iter()
        .map(|(key, value)| (key_repr(key), value))
        .collect();
    entries.sort_by(|a, b| a.0.cmp(&b.0));

    hasher.update([5u8]);
    hasher.update((entries.len() as u64).to_be_bytes());
    for (key, value) in entries {
        feed_str(hasher, &key);
        feed_value(hasher, value);
    }
}

/// Length-prefixed so that adjacent strings cannot run together.
fn feed_str(hasher: &mut Sha256, s: &str) {
    hasher.update((s.len() as u64).to_be_bytes());
    hasher.update(s.as_bytes());
}

fn key_repr(key: &Value) -> String {
    match key {
        Value::String(s) => s.clone(),
        other => serde_yaml::to_string(other).unwrap_or_default(),
    }
}
