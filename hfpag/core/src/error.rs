//! Error Types
//!
//! Three layers of errors:
//! - [`DecodeError`]: a bus reply did not have the shape or types a decoder expected
//! - [`Error`]: failures surfaced by enumeration, selection and session coordination
//! - [`CommandDeliveryError`]: best-effort RFCOMM signaling failures, only ever logged

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::bus::{BusError, ValueKind};

// =============================================================================
// Decoding
// =============================================================================

/// A reply did not match the expected message shape
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// The node is not shaped the way the decoder requires
    #[error("Incorrect signature: {found} != {expected}")]
    Malformed {
        /// Expected signature
        expected: &'static str,
        /// Signature actually found
        found: String,
    },

    /// A typed accessor was applied to a value of another type
    #[error("Unexpected value type: {actual} != {expected}")]
    TypeMismatch {
        /// Type the accessor requires
        expected: ValueKind,
        /// Type the value carries
        actual: ValueKind,
    },

    /// A recognized property carried a variant of the wrong type
    #[error("Incorrect variant for '{key}': {actual} != {expected}")]
    UnexpectedType {
        /// Property name
        key: String,
        /// Type required for this property
        expected: ValueKind,
        /// Type found in the variant
        actual: ValueKind,
    },
}

impl DecodeError {
    /// Attach the property name to a bare type mismatch
    #[must_use]
    pub fn for_key(self, key: &str) -> Self {
        match self {
            Self::TypeMismatch { expected, actual } => Self::UnexpectedType {
                key: key.to_string(),
                expected,
                actual,
            },
            other => other,
        }
    }
}

// =============================================================================
// Public Errors
// =============================================================================

/// Errors returned by the hfpag core
#[derive(Debug, Error)]
pub enum Error {
    /// Transport or remote failure
    #[error("D-Bus call failed: {0}")]
    Bus(#[from] BusError),

    /// Reply did not match the expected shape or types
    #[error("Malformed D-Bus message: {0}")]
    MalformedMessage(#[from] DecodeError),

    /// No PCM matched the selection criteria
    #[error("PCM not found")]
    NotFound,

    /// The lock file could not be opened, inspected or locked
    #[error("Lock file {path:?}: {source}")]
    LockFile {
        /// Lock file path
        path: PathBuf,
        /// Underlying OS error
        #[source]
        source: std::io::Error,
    },

    /// The lock file kept being replaced while waiting for the mutex
    #[error("Unable to open lock file {path:?} - maximum retries ({attempts}) exceeded")]
    LockRaceExhausted {
        /// Lock file path
        path: PathBuf,
        /// Number of attempts made
        attempts: u32,
    },

    /// A device object path that cannot be mapped to an RFCOMM path
    #[error("Invalid PCM device path: {0}")]
    InvalidDevicePath(String),
}

impl Error {
    pub(crate) fn lock_file(path: &Path, source: impl Into<std::io::Error>) -> Self {
        Self::LockFile {
            path: path.to_path_buf(),
            source: source.into(),
        }
    }
}

// =============================================================================
// Command Delivery
// =============================================================================

/// An RFCOMM command sequence could not be delivered
#[derive(Debug, Error)]
pub enum CommandDeliveryError {
    /// The control channel could not be opened
    #[error("Couldn't open RFCOMM: {0}")]
    Open(#[source] Error),

    /// A command was only partially written
    #[error("Couldn't complete RFCOMM sequence: command {index} short write ({written} of {expected} bytes)")]
    ShortWrite {
        /// Index of the failed command
        index: usize,
        /// Bytes written
        written: usize,
        /// Command length
        expected: usize,
    },

    /// Writing a command failed
    #[error("Couldn't complete RFCOMM sequence: command {index}: {source}")]
    Write {
        /// Index of the failed command
        index: usize,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },
}
