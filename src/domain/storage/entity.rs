//! Storage entity traits and types

use std::fmt::Debug;

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};

/// Trait for types that can be used as storage keys
pub trait StorageKey: Clone + Debug + Send + Sync + Eq + std::hash::Hash {
    /// Returns the key as a string for storage backends that require string keys
    fn as_str(&self) -> &str;
}

/// Trait for types that can be stored
pub trait StorageEntity: Clone + Debug + Send + Sync + Serialize + DeserializeOwned {
    /// The key type for this entity
    type Key: StorageKey;

    /// Returns the entity's key
    fn key(&self) -> &Self::Key;

    /// Creation timestamp, used for listing order
    fn created_at(&self) -> DateTime<Utc>;
}

/// Options for listing entities
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListOptions {
    /// Order by creation time, newest first
    pub newest_first: bool,
    /// Maximum number of entities to return
    pub limit: Option<usize>,
}

impl ListOptions {
    pub fn newest_first() -> Self {
        Self {
            newest_first: true,
            limit: None,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
    struct TestKey(String);

    impl StorageKey for TestKey {
        fn as_str(&self) -> &str {
            &self.0
        }
    }

    #[test]
    fn test_storage_key_as_str() {
        let key = TestKey("run-1".to_string());
        assert_eq!(key.as_str(), "run-1");
    }

    #[test]
    fn test_list_options_builder() {
        let options = ListOptions::newest_first().with_limit(50);
        assert!(options.newest_first);
        assert_eq!(options.limit, Some(50));

        let default = ListOptions::default();
        assert!(!default.newest_first);
        assert!(default.limit.is_none());
    }
}
