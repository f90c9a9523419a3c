//! Growable array configuration.

use super::{parse_env_var, read_json, write_json, Config, ValidationError};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

/// Largest first allocation a configuration may request.
pub const MAX_DEFAULT_SIZE_BYTES: usize = 1 << 20;

/// How a growable array picks its next capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum GrowthStrategy {
    /// Round the required length up to the next power of two
    #[default]
    PowerOfTwo,
    /// Allocate exactly the required length
    Exact,
}

impl FromStr for GrowthStrategy {
    type Err = ValidationError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "power_of_two" | "pow2" | "doubling" => Ok(Self::PowerOfTwo),
            "exact" => Ok(Self::Exact),
            _ => Err(ValidationError::new("growth", s, "unknown growth strategy")
                .with_suggestion("power_of_two, exact")),
        }
    }
}

/// Configuration for [`DynArray`](crate::DynArray).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArrayConfig {
    /// Bytes reserved by the first implicit growth of a null array
    pub default_size_bytes: usize,
    /// Growth policy once the array is allocated
    pub growth: GrowthStrategy,
}

impl Default for ArrayConfig {
    fn default() -> Self {
        Self {
            default_size_bytes: 16,
            growth: GrowthStrategy::PowerOfTwo,
        }
    }
}

impl Config for ArrayConfig {
    fn validate(&self) -> Result<()> {
        if self.default_size_bytes > MAX_DEFAULT_SIZE_BYTES {
            return Err(ValidationError::new(
                "default_size_bytes",
                &self.default_size_bytes.to_string(),
                "initial allocation is too large",
            )
            .with_suggestion("0 to 1048576")
            .into());
        }
        Ok(())
    }

    fn from_env_with_prefix(prefix: &str) -> Result<Self> {
        let mut config = Self::default();
        config.default_size_bytes = parse_env_var(
            &format!("{}ARRAY_DEFAULT_SIZE_BYTES", prefix),
            config.default_size_bytes,
        );
        config.growth = parse_env_var(&format!("{}ARRAY_GROWTH", prefix), config.growth);
        config.validate()?;
        Ok(config)
    }

    fn performance_preset() -> Self {
        Self {
            default_size_bytes: 256,
            growth: GrowthStrategy::PowerOfTwo,
        }
    }

    fn memory_preset() -> Self {
        Self {
            default_size_bytes: 0,
            growth: GrowthStrategy::Exact,
        }
    }

    fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        write_json(self, path, "array")
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config: Self = read_json(path, "array")?;
        config.validate()?;
        Ok(config)
    }
}

impl ArrayConfig {
    /// Create a new array configuration builder.
    pub fn builder() -> ArrayConfigBuilder {
        ArrayConfigBuilder::new()
    }

    /// Capacity of the first implicit allocation for elements of `element_size` bytes.
    ///
    /// Never less than one element.
    pub fn initial_capacity(&self, element_size: usize) -> usize {
        (self.default_size_bytes / element_size.max(1)).max(1)
    }
}

/// Builder for constructing array configurations.
#[derive(Debug, Clone, Default)]
pub struct ArrayConfigBuilder {
    config: ArrayConfig,
}

impl ArrayConfigBuilder {
    /// Create a new array configuration builder.
    pub fn new() -> Self {
        Self {
            config: ArrayConfig::default(),
        }
    }

    /// Set the size of the first implicit allocation in bytes.
    pub fn default_size_bytes(mut self, bytes: usize) -> Self {
        self.config.default_size_bytes = bytes;
        self
    }

    /// Set the growth strategy.
    pub fn growth(mut self, growth: GrowthStrategy) -> Self {
        self.config.growth = growth;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> Result<ArrayConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ArrayConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.initial_capacity(4), 4);
        assert_eq!(config.initial_capacity(8), 2);
        assert_eq!(config.initial_capacity(64), 1);
    }

    #[test]
    fn test_builder_pattern() {
        let config = ArrayConfig::builder()
            .default_size_bytes(64)
            .growth(GrowthStrategy::Exact)
            .build()
            .expect("Failed to build array config");

        assert_eq!(config.default_size_bytes, 64);
        assert_eq!(config.growth, GrowthStrategy::Exact);
    }

    #[test]
    fn test_validation() {
        let config = ArrayConfig {
            default_size_bytes: MAX_DEFAULT_SIZE_BYTES + 1,
            ..ArrayConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert_eq!(err.category(), "config");
    }

    #[test]
    fn test_growth_strategy_parsing() {
        assert_eq!("exact".parse::<GrowthStrategy>().unwrap(), GrowthStrategy::Exact);
        assert_eq!("POW2".parse::<GrowthStrategy>().unwrap(), GrowthStrategy::PowerOfTwo);
        assert!("fibonacci".parse::<GrowthStrategy>().is_err());
    }
}
