//! Error types for opnsense-auto-dns
//!
//! Every failure a reconciliation pass can hit is one of these variants.
//! Errors stay local to the hostname being reconciled; only configuration
//! errors are fatal, and only at startup.

use std::fmt;
use thiserror::Error;

/// Result type alias for opnsense-auto-dns operations
pub type Result<T> = std::result::Result<T, Error>;

/// Remote mutation kinds, used to label mutation failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Creating a new host override
    Create,
    /// Updating an existing host override
    Update,
    /// Reloading the resolver configuration
    Reconfigure,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Reconfigure => "reconfigure",
        })
    }
}

/// Core error type
#[derive(Error, Debug)]
pub enum Error {
    /// The record store could not be reached (DNS, TCP or TLS failure)
    #[error("Connectivity error: {0}")]
    Connectivity(String),

    /// The record store answered with a non-success HTTP status
    #[error("HTTP {status} from record store: {body}")]
    Transport {
        /// HTTP status code
        status: u16,
        /// Raw response body, kept for diagnostics
        body: String,
    },

    /// A response body did not have the expected shape or signalled failure
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Searching for an existing record failed
    #[error("Record lookup failed: {source}")]
    Lookup {
        /// Underlying transport or parse failure
        #[source]
        source: Box<Error>,
    },

    /// A create, update or reconfigure request failed
    #[error("{operation} failed: {source}")]
    Mutation {
        /// Which mutation failed
        operation: Operation,
        /// Underlying transport or validation failure
        #[source]
        source: Box<Error>,
    },

    /// The record was written but the follow-up resolver reload failed.
    ///
    /// The change is durable on the remote side; it is just not live yet.
    #[error("{operation} succeeded but the resolver reload failed, record is written but not live: {source}")]
    ReconfigurePending {
        /// The mutation that did take effect
        operation: Operation,
        /// The reconfigure failure
        #[source]
        source: Box<Error>,
    },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Local IP detection failed
    #[error("IP source error: {0}")]
    IpSource(String),

    /// The machine hostname could not be determined
    #[error("Hostname error: {0}")]
    Hostname(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Local I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a connectivity error
    pub fn connectivity(msg: impl Into<String>) -> Self {
        Self::Connectivity(msg.into())
    }

    /// Create an invalid-response error
    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an IP source error
    pub fn ip_source(msg: impl Into<String>) -> Self {
        Self::IpSource(msg.into())
    }

    /// Wrap a failure as a lookup error
    pub fn lookup(source: Error) -> Self {
        Self::Lookup {
            source: Box::new(source),
        }
    }

    /// Wrap a failure as a mutation error for `operation`
    pub fn mutation(operation: Operation, source: Error) -> Self {
        Self::Mutation {
            operation,
            source: Box::new(source),
        }
    }

    /// A mutation that landed but whose reconfigure step failed
    pub fn reconfigure_pending(operation: Operation, source: Error) -> Self {
        Self::ReconfigurePending {
            operation,
            source: Box::new(source),
        }
    }

    /// The mutation this error belongs to, if it is a mutation error
    pub fn operation(&self) -> Option<Operation> {
        match self {
            Self::Mutation { operation, .. } | Self::ReconfigurePending { operation, .. } => {
                Some(*operation)
            }
            _ => None,
        }
    }

    /// Whether the remote write took effect despite the error
    pub fn write_applied(&self) -> bool {
        matches!(self, Self::ReconfigurePending { .. })
    }
}
