//! Hopscotch hash table configuration.

use super::{parse_env_bool, parse_env_var, read_json, write_json, Config, ValidationError};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Largest neighborhood that fits the hop-info bitmap below the occupancy bit.
pub const MAX_NEIGHBORHOOD_SIZE: usize = 31;

/// Upper bound on the grow-and-rehash retry budget.
pub const MAX_FAIL_RETRIES_LIMIT: usize = 32;

/// Configuration for [`HopscotchTable`](crate::HopscotchTable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashTableConfig {
    /// Slots, starting at a home bucket, in which its entries must reside
    pub neighborhood_size: usize,
    /// Grow-and-rehash attempts before an insert or rehash gives up
    pub max_fail_retries: usize,
    /// Keep a per-slot copy of each entry's hash
    pub store_hashes: bool,
}

impl Default for HashTableConfig {
    fn default() -> Self {
        Self {
            neighborhood_size: 8,
            max_fail_retries: 5,
            store_hashes: false,
        }
    }
}

impl Config for HashTableConfig {
    fn validate(&self) -> Result<()> {
        if self.neighborhood_size == 0 || self.neighborhood_size > MAX_NEIGHBORHOOD_SIZE {
            return Err(ValidationError::new(
                "neighborhood_size",
                &self.neighborhood_size.to_string(),
                "neighborhood must fit in the hop-info bitmap",
            )
            .with_suggestion("1 to 31")
            .into());
        }
        if self.max_fail_retries > MAX_FAIL_RETRIES_LIMIT {
            return Err(ValidationError::new(
                "max_fail_retries",
                &self.max_fail_retries.to_string(),
                "each retry doubles the table",
            )
            .with_suggestion("0 to 32")
            .into());
        }
        Ok(())
    }

    fn from_env_with_prefix(prefix: &str) -> Result<Self> {
        let mut config = Self::default();
        config.neighborhood_size = parse_env_var(
            &format!("{}HASH_NEIGHBORHOOD_SIZE", prefix),
            config.neighborhood_size,
        );
        config.max_fail_retries = parse_env_var(
            &format!("{}HASH_MAX_FAIL_RETRIES", prefix),
            config.max_fail_retries,
        );
        config.store_hashes =
            parse_env_bool(&format!("{}HASH_STORE_HASHES", prefix), config.store_hashes);
        config.validate()?;
        Ok(config)
    }

    fn performance_preset() -> Self {
        Self {
            neighborhood_size: 16,
            max_fail_retries: 8,
            store_hashes: true,
        }
    }

    fn memory_preset() -> Self {
        Self {
            neighborhood_size: 31,
            max_fail_retries: 5,
            store_hashes: false,
        }
    }

    fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        write_json(self, path, "hash table")
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config: Self = read_json(path, "hash table")?;
        config.validate()?;
        Ok(config)
    }
}

impl HashTableConfig {
    /// Create a new hash table configuration builder.
    pub fn builder() -> HashTableConfigBuilder {
        HashTableConfigBuilder::new()
    }
}

/// Builder for constructing hash table configurations.
#[derive(Debug, Clone, Default)]
pub struct HashTableConfigBuilder {
    config: HashTableConfig,
}

impl HashTableConfigBuilder {
    /// Create a new hash table configuration builder.
    pub fn new() -> Self {
        Self {
            config: HashTableConfig::default(),
        }
    }

    /// Set the neighborhood size.
    pub fn neighborhood_size(mut self, size: usize) -> Self {
        self.config.neighborhood_size = size;
        self
    }

    /// Set the retry budget.
    pub fn max_fail_retries(mut self, retries: usize) -> Self {
        self.config.max_fail_retries = retries;
        self
    }

    /// Enable the per-slot hash cache.
    pub fn store_hashes(mut self, enabled: bool) -> Self {
        self.config.store_hashes = enabled;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> Result<HashTableConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = HashTableConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.neighborhood_size, 8);
        assert_eq!(config.max_fail_retries, 5);
        assert!(!config.store_hashes);
    }

    #[test]
    fn test_builder_pattern() {
        let config = HashTableConfig::builder()
            .neighborhood_size(4)
            .max_fail_retries(2)
            .store_hashes(true)
            .build()
            .expect("Failed to build hash table config");

        assert_eq!(config.neighborhood_size, 4);
        assert_eq!(config.max_fail_retries, 2);
        assert!(config.store_hashes);
    }

    #[test]
    fn test_validation() {
        assert!(HashTableConfig::builder().neighborhood_size(0).build().is_err());
        assert!(HashTableConfig::builder().neighborhood_size(32).build().is_err());
        assert!(HashTableConfig::builder().neighborhood_size(31).build().is_ok());
        assert!(HashTableConfig::builder().max_fail_retries(33).build().is_err());
        assert!(HashTableConfig::builder().max_fail_retries(0).build().is_ok());
    }

    #[test]
    fn test_serialization() {
        let config = HashTableConfig::performance_preset();
        let json = serde_json::to_string(&config).expect("Failed to serialize");
        let deserialized: HashTableConfig =
            serde_json::from_str(&json).expect("Failed to deserialize");
        assert_eq!(config, deserialized);
    }
}
