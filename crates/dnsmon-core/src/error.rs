//! Error types for the dnsmon system
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

use crate::record::RecordKind;
use crate::retry::RetryError;

/// Result type alias for dnsmon operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the dnsmon system
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors (fatal at startup only)
    #[error("Configuration error: {0}")]
    Config(String),

    /// A single DNS query failed at the transport level
    #[error("DNS query for {kind} {name} failed: {message}")]
    Query {
        /// Queried name
        name: String,
        /// Queried record kind
        kind: RecordKind,
        /// Failure description
        message: String,
    },

    /// The resolver answered with a non-success response code
    #[error("DNS query for {kind} {name} returned non-success response: {rcode}")]
    ResponseCode {
        /// Queried name
        name: String,
        /// Queried record kind
        kind: RecordKind,
        /// Response code as reported by the resolver
        rcode: String,
    },

    /// The queried name could not be turned into a DNS name
    #[error("Invalid domain name '{name}': {message}")]
    InvalidName {
        /// Offending name
        name: String,
        /// Parser message
        message: String,
    },

    /// State store-related errors
    #[error("State store error: {0}")]
    StateStore(String),

    /// Notification delivery errors
    #[error("Notifier error ({notifier}): {message}")]
    Notifier {
        /// Notifier name
        notifier: String,
        /// Error message
        message: String,
    },

    /// A backoff wait was interrupted by shutdown
    #[error("operation cancelled")]
    Cancelled,

    /// All retry attempts failed
    #[error("operation failed after {attempts} attempts: {source}")]
    RetryExhausted {
        /// Number of attempts made
        attempts: usize,
        /// The most recent underlying error
        #[source]
        source: Box<Error>,
    },

    /// HTTP client errors (from notifier APIs)
    #[error("HTTP error: {0}")]
    Http(String),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a transport-level query error
    pub fn query(name: impl Into<String>, kind: RecordKind, message: impl Into<String>) -> Self {
        Self::Query {
            name: name.into(),
            kind,
            message: message.into(),
        }
    }

    /// Create a non-success response code error
    pub fn response_code(name: impl Into<String>, kind: RecordKind, rcode: impl Into<String>) -> Self {
        Self::ResponseCode {
            name: name.into(),
            kind,
            rcode: rcode.into(),
        }
    }

    /// Create an invalid name error
    pub fn invalid_name(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidName {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create a state store error
    pub fn state_store(msg: impl Into<String>) -> Self {
        Self::StateStore(msg.into())
    }

    /// Create a notifier error
    pub fn notifier(notifier: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Notifier {
            notifier: notifier.into(),
            message: message.into(),
        }
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Whether retrying the failed operation could succeed
    ///
    /// Transport failures and non-success response codes are transient.
    /// Malformed names, configuration and cancellation are not.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Query { .. }
            | Error::ResponseCode { .. }
            | Error::Http(_)
            | Error::Notifier { .. } => true,
            Error::Config(_)
            | Error::InvalidName { .. }
            | Error::Cancelled
            | Error::RetryExhausted { .. }
            | Error::StateStore(_)
            | Error::Other(_) => false,
        }
    }

    /// Whether this error was caused by shutdown
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }
}

impl From<RetryError<Error>> for Error {
    fn from(err: RetryError<Error>) -> Self {
        match err {
            RetryError::Cancelled => Error::Cancelled,
            RetryError::Exhausted { attempts, source } => Error::RetryExhausted {
                attempts,
                source: Box::new(source),
            },
            RetryError::Permanent { source, .. } => source,
        }
    }
}
