//! Error types for the quantum log.
//!
//! Error codes and severities:
//! - `QUANTA_BOOTSTRAP_FAILED` (FATAL): the writer could not be constructed
//! - `QUANTA_APPEND_FAILED` (ERROR): one envelope failed, the log continues
//! - `QUANTA_SYNC_FAILED` (FATAL): a force to stable storage failed; the
//!   durability contract can no longer be honored for the pending batch
//! - `QUANTA_CLOSE_FAILED` (ERROR): best-effort shutdown I/O failed
//! - `QUANTA_READ_FAILED` (ERROR): a quantum file could not be read back

use std::io;

use thiserror::Error;

/// Severity of a quantum log error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The operation fails, the host continues
    Error,
    /// The durability contract is broken; the enclosing process decides
    Fatal,
}

impl Severity {
    /// Returns the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Error => "ERROR",
            Severity::Fatal => "FATAL",
        }
    }
}

/// Errors raised by the quantum log writer.
#[derive(Debug, Error)]
pub enum QuantumError {
    /// The log file could not be created or the first window could not be
    /// mapped. Fatal: the writer never starts.
    #[error("QUANTA_BOOTSTRAP_FAILED: {message}")]
    Bootstrap {
        /// What failed during construction
        message: String,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// A single envelope could not be encoded or written. The worker loop
    /// logs and skips it.
    #[error("QUANTA_APPEND_FAILED: {message}")]
    Append {
        /// What failed for this envelope
        message: String,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// A force to stable storage failed. The pending batch is withheld and
    /// the first such error is surfaced from `close`.
    #[error("QUANTA_SYNC_FAILED: {message}")]
    Sync {
        /// What failed during the force
        message: String,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Shutdown-time I/O failed after ordering was already guaranteed.
    #[error("QUANTA_CLOSE_FAILED: {message}")]
    Close {
        /// What failed during shutdown
        message: String,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// A quantum file could not be opened or its byte stream is malformed.
    #[error("QUANTA_READ_FAILED: {message}")]
    Read {
        /// What failed while reading
        message: String,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },
}

impl QuantumError {
    /// Bootstrap failure (file creation, first window mapping)
    pub fn bootstrap(message: impl Into<String>, source: io::Error) -> Self {
        Self::Bootstrap {
            message: message.into(),
            source,
        }
    }

    /// Per-envelope write or encode failure
    pub fn append(message: impl Into<String>, source: io::Error) -> Self {
        Self::Append {
            message: message.into(),
            source,
        }
    }

    /// Force-to-stable-storage failure
    pub fn sync(message: impl Into<String>, source: io::Error) -> Self {
        Self::Sync {
            message: message.into(),
            source,
        }
    }

    /// Shutdown-time failure
    pub fn close(message: impl Into<String>, source: io::Error) -> Self {
        Self::Close {
            message: message.into(),
            source,
        }
    }

    /// Read-side failure
    pub fn read(message: impl Into<String>, source: io::Error) -> Self {
        Self::Read {
            message: message.into(),
            source,
        }
    }

    /// Returns the stable string code for this error
    pub fn code(&self) -> &'static str {
        match self {
            QuantumError::Bootstrap { .. } => "QUANTA_BOOTSTRAP_FAILED",
            QuantumError::Append { .. } => "QUANTA_APPEND_FAILED",
            QuantumError::Sync { .. } => "QUANTA_SYNC_FAILED",
            QuantumError::Close { .. } => "QUANTA_CLOSE_FAILED",
            QuantumError::Read { .. } => "QUANTA_READ_FAILED",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        match self {
            QuantumError::Bootstrap { .. } | QuantumError::Sync { .. } => Severity::Fatal,
            QuantumError::Append { .. }
            | QuantumError::Close { .. }
            | QuantumError::Read { .. } => Severity::Error,
        }
    }

    /// Whether this error breaks the durability contract
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

/// Result type for quantum log operations
pub type QuantumResult<T> = Result<T, QuantumError>;
