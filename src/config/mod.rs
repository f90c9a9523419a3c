//! Configuration APIs for fatbuf containers
//!
//! Growable arrays and hash tables read their tunables from small
//! serializable configuration structs. Every configuration type implements
//! the [`Config`] trait, which provides validation, environment
//! initialization, presets and JSON persistence.
//!
//! # Core Configuration Types
//!
//! - [`ArrayConfig`]: initial allocation and growth policy of [`DynArray`](crate::DynArray)
//! - [`HashTableConfig`]: neighborhood size, retry budget and hash caching of
//!   [`HopscotchTable`](crate::HopscotchTable)
//!
//! # Builder Patterns
//!
//! ```rust
//! use fatbuf::config::HashTableConfig;
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = HashTableConfig::builder()
//!     .neighborhood_size(16)
//!     .max_fail_retries(8)
//!     .store_hashes(true)
//!     .build()?;
//! # Ok(())
//! # }
//! ```
//!
//! # Environment Initialization
//!
//! ```rust
//! use fatbuf::config::{ArrayConfig, Config};
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Reads FATBUF_ARRAY_DEFAULT_SIZE_BYTES and friends
//! let config = ArrayConfig::from_env()?;
//!
//! // Same variables under a custom prefix
//! let config = ArrayConfig::from_env_with_prefix("MYAPP_")?;
//! # Ok(())
//! # }
//! ```

use crate::error::Result;
use std::env;
use std::fmt;
use std::path::Path;

pub mod array;
pub mod hash_table;

#[cfg(test)]
mod tests;

pub use array::{ArrayConfig, ArrayConfigBuilder, GrowthStrategy};
pub use hash_table::{HashTableConfig, HashTableConfigBuilder};

/// Prefix used by [`Config::from_env`]
pub const ENV_PREFIX: &str = "FATBUF_";

/// Common configuration trait providing validation, environment initialization,
/// and preset management functionality.
pub trait Config: Clone + fmt::Debug {
    /// Validate the configuration for correctness and consistency.
    fn validate(&self) -> Result<()>;

    /// Initialize configuration from environment variables.
    ///
    /// Environment variables use the format `FATBUF_{COMPONENT}_{FIELD}`, for
    /// example `FATBUF_HASH_NEIGHBORHOOD_SIZE=16`.
    fn from_env() -> Result<Self>
    where
        Self: Default,
    {
        Self::from_env_with_prefix(ENV_PREFIX)
    }

    /// Initialize configuration from environment variables with a custom prefix.
    ///
    /// Unset or unparsable variables keep their default values; the result
    /// is validated before it is returned.
    fn from_env_with_prefix(prefix: &str) -> Result<Self>
    where
        Self: Default;

    /// Preset favoring speed over memory.
    fn performance_preset() -> Self;

    /// Preset favoring a small footprint over speed.
    fn memory_preset() -> Self;

    /// Balanced preset; the defaults.
    fn balanced_preset() -> Self
    where
        Self: Default,
    {
        Self::default()
    }

    /// Save configuration to a JSON file.
    fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()>;

    /// Load and validate configuration from a JSON file.
    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self>;
}

/// Configuration validation error details.
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// The field that failed validation
    pub field: String,
    /// The invalid value
    pub value: String,
    /// Description of why the value is invalid
    pub reason: String,
    /// Suggested valid values or ranges
    pub suggestion: Option<String>,
}

impl ValidationError {
    /// Create a new validation error.
    pub fn new(field: &str, value: &str, reason: &str) -> Self {
        Self {
            field: field.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
            suggestion: None,
        }
    }

    /// Add a suggestion for valid values.
    pub fn with_suggestion(mut self, suggestion: &str) -> Self {
        self.suggestion = Some(suggestion.to_string());
        self
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Invalid configuration for field '{}': value '{}' is invalid ({})",
            self.field, self.value, self.reason
        )?;

        if let Some(ref suggestion) = self.suggestion {
            write!(f, ". Suggested values: {}", suggestion)?;
        }

        Ok(())
    }
}

impl std::error::Error for ValidationError {}

impl From<ValidationError> for crate::error::FatBufError {
    fn from(err: ValidationError) -> Self {
        crate::error::FatBufError::configuration(err.to_string())
    }
}

/// Parse an environment variable, falling back to `default` when unset or invalid.
pub fn parse_env_var<T>(var_name: &str, default: T) -> T
where
    T: std::str::FromStr + Clone,
{
    env::var(var_name)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

/// Parse a boolean environment variable.
///
/// Accepts: "true", "1", "yes", "on" (case-insensitive) as true,
/// everything else as false.
pub fn parse_env_bool(var_name: &str, default: bool) -> bool {
    env::var(var_name)
        .ok()
        .map(|s| {
            let s = s.trim().to_lowercase();
            matches!(s.as_str(), "true" | "1" | "yes" | "on")
        })
        .unwrap_or(default)
}

pub(crate) fn write_json<T: serde::Serialize, P: AsRef<Path>>(
    value: &T,
    path: P,
    what: &str,
) -> Result<()> {
    let serialized = serde_json::to_string_pretty(value).map_err(|e| {
        crate::error::FatBufError::configuration(format!("Failed to serialize {} config: {}", what, e))
    })?;
    std::fs::write(path, serialized)?;
    Ok(())
}

pub(crate) fn read_json<T: serde::de::DeserializeOwned, P: AsRef<Path>>(
    path: P,
    what: &str,
) -> Result<T> {
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|e| {
        crate::error::FatBufError::configuration(format!("Failed to parse {} config file: {}", what, e))
    })
}
