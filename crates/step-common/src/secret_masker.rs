// Thread-safe store of secret values, replaced with `***` in any string
// headed for a human-readable log. Child processes still receive real
// values; only rendering goes through the masker.

use parking_lot::RwLock;
use std::sync::Arc;

/// Replacement text for a masked secret.
const MASK: &str = "***";

/// Masks registered secret values in arbitrary strings.
#[derive(Debug, Clone, Default)]
pub struct SecretMasker {
    /// Secrets ordered longest-first so a secret that is a substring of
    /// another cannot leave a partial value behind.
    secrets: Arc<RwLock<Vec<String>>>,
}

impl SecretMasker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a value to be masked. Blank values are ignored.
    pub fn add_value(&self, secret: &str) {
        let trimmed = secret.trim();
        if trimmed.is_empty() {
            return;
        }
        let mut secrets = self.secrets.write();
        if secrets.iter().any(|s| s == trimmed) {
            return;
        }
        let pos = secrets
            .iter()
            .position(|s| s.len() < trimmed.len())
            .unwrap_or(secrets.len());
        secrets.insert(pos, trimmed.to_string());
    }

    /// Replace every registered secret in `input` with `***`.
    pub fn mask(&self, input: &str) -> String {
        let secrets = self.secrets.read();
        if secrets.is_empty() {
            return input.to_string();
        }
        secrets
            .iter()
            .fold(input.to_string(), |acc, secret| acc.replace(secret, MASK))
    }

    pub fn is_empty(&self) -> bool {
        self.secrets.read().is_empty()
    }

    pub fn len(&self) -> usize {
        self.secrets.read().len()
    }
}
