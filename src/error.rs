//! Error handling for the fatbuf library
//!
//! Recoverable failures (allocation, configuration, a hash table running out
//! of retry budget) are reported through [`FatBufError`]. Violated
//! preconditions such as an out-of-range index are programming errors and
//! panic instead.

use thiserror::Error;

/// Main error type for the fatbuf library
#[derive(Error, Debug)]
pub enum FatBufError {
    /// I/O related errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid data format or corruption
    #[error("Invalid data: {message}")]
    InvalidData {
        /// Error message describing the issue
        message: String,
    },

    /// Memory allocation failures
    #[error("Memory allocation failed: requested {size} bytes")]
    OutOfMemory {
        /// Number of bytes requested
        size: usize,
    },

    /// A requested element count does not fit in the address space
    #[error("Capacity overflow: {elements} elements of {element_size} bytes")]
    CapacityOverflow {
        /// Requested element count
        elements: usize,
        /// Size of one element in bytes
        element_size: usize,
    },

    /// Configuration or parameter errors
    #[error("Invalid configuration: {message}")]
    Configuration {
        /// Configuration error message
        message: String,
    },

    /// A hash table insert could not place its entry within the retry budget
    #[error("Hash table insert failed after {retries} resize attempts")]
    InsertFailed {
        /// Number of grow-and-rehash attempts made
        retries: usize,
    },

    /// A rehash could not restore the neighborhood invariant within the retry budget
    #[error("Hash table rehash failed after {retries} resize attempts")]
    RehashFailed {
        /// Number of grow-and-rehash attempts made
        retries: usize,
    },
}

impl FatBufError {
    /// Create an invalid data error
    pub fn invalid_data<S: Into<String>>(message: S) -> Self {
        Self::InvalidData { message: message.into() }
    }

    /// Create an out of memory error
    pub fn out_of_memory(size: usize) -> Self {
        Self::OutOfMemory { size }
    }

    /// Create a capacity overflow error
    pub fn capacity_overflow(elements: usize, element_size: usize) -> Self {
        Self::CapacityOverflow { elements, element_size }
    }

    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration { message: message.into() }
    }

    /// Create an insert failure
    pub fn insert_failed(retries: usize) -> Self {
        Self::InsertFailed { retries }
    }

    /// Create a rehash failure
    pub fn rehash_failed(retries: usize) -> Self {
        Self::RehashFailed { retries }
    }

    /// Check if this is a recoverable error
    ///
    /// Hash table placement failures are recoverable: the caller can retry
    /// with a pre-sized table.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Io(_) => true,
            Self::OutOfMemory { .. } => true,
            Self::InsertFailed { .. } => true,
            Self::RehashFailed { .. } => true,
            Self::InvalidData { .. } => false,
            Self::CapacityOverflow { .. } => false,
            Self::Configuration { .. } => false,
        }
    }

    /// Get the error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            Self::Io(_) => "io",
            Self::InvalidData { .. } => "data",
            Self::OutOfMemory { .. } => "memory",
            Self::CapacityOverflow { .. } => "memory",
            Self::Configuration { .. } => "config",
            Self::InsertFailed { .. } => "hash_table",
            Self::RehashFailed { .. } => "hash_table",
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, FatBufError>;
