//! Error taxonomy for discovery-backed RPC clients.
//!
//! Failures fall in two families:
//!
//! - [`TransportError`]: the client could not get a usable stub. The registry
//!   had no instance, the registry itself was unreachable, or dialing the
//!   resolved address failed. These are retryable, except [`TransportError::Closed`].
//! - [`ClientError`]: what a caller of `invoke` sees. It wraps transport
//!   failures and adds the outcomes of the remote call itself: a transient call
//!   failure, an application-level rejection, cancellation, or exhaustion of the
//!   retry budget.
//!
//! # Pattern Matching
//!
//! ```rust
//! use beacon_rpc_core::{ClientError, TransportError};
//!
//! fn describe(err: &ClientError<std::io::Error>) -> &'static str {
//!     match err {
//!         ClientError::RemoteRejected(_) => "the service said no",
//!         ClientError::Cancelled => "caller gave up",
//!         ClientError::RetriesExhausted { .. } => "service unreachable",
//!         ClientError::Transport(TransportError::Closed) => "client already closed",
//!         _ => "other",
//!     }
//! }
//! # let _ = describe(&ClientError::Cancelled);
//! ```

use std::fmt;

/// Boxed collaborator error, following the tower convention.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failure to obtain a live stub for the target role.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The registry has no instance registered under the role.
    #[error("no available instance registered for role `{role}`, check that the service is running")]
    NoAvailableInstance {
        /// The role that was looked up.
        role: String,
    },

    /// The registry query itself failed.
    #[error("discovery registry unavailable while resolving `{role}`: {source}")]
    DiscoveryUnavailable {
        /// The role that was looked up.
        role: String,
        /// The registry error.
        #[source]
        source: BoxError,
    },

    /// Dialing or handshaking with a resolved address failed.
    #[error("failed to connect to {address}: {source}")]
    ConnectFailed {
        /// The resolved address.
        address: String,
        /// The connector error (or a dial timeout).
        #[source]
        source: BoxError,
    },

    /// The client was closed by its owner.
    #[error("client is closed")]
    Closed,
}

impl TransportError {
    /// Returns `true` if another attempt may succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, TransportError::Closed)
    }
}

/// Error returned by `invoke`.
///
/// `E` is the error type produced by the remote call closure, typically the
/// RPC framework's status type.
#[derive(Debug)]
pub enum ClientError<E> {
    /// No usable connection could be obtained.
    Transport(TransportError),

    /// The remote call failed with an error classified as transient.
    ///
    /// Callers normally only see this inside [`ClientError::RetriesExhausted`].
    CallFailed(E),

    /// The remote endpoint processed the request and rejected it.
    RemoteRejected(E),

    /// The caller's cancellation signal fired.
    Cancelled,

    /// Every attempt failed with a retryable error.
    RetriesExhausted {
        /// Number of attempts made.
        attempts: usize,
        /// The error from the final attempt.
        last: Box<ClientError<E>>,
    },
}

impl<E> From<TransportError> for ClientError<E> {
    fn from(err: TransportError) -> Self {
        ClientError::Transport(err)
    }
}

impl<E> ClientError<E> {
    /// Returns `true` if this is a cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ClientError::Cancelled)
    }

    /// Returns `true` if the remote side rejected the request.
    pub fn is_remote_rejected(&self) -> bool {
        matches!(self, ClientError::RemoteRejected(_))
    }

    /// Returns `true` if the retry budget ran out.
    pub fn is_retries_exhausted(&self) -> bool {
        matches!(self, ClientError::RetriesExhausted { .. })
    }

    /// Returns `true` if the failure was a connectivity problem rather than
    /// a decision made by the remote service.
    pub fn is_connectivity(&self) -> bool {
        match self {
            ClientError::Transport(_) | ClientError::CallFailed(_) => true,
            ClientError::RetriesExhausted { last, .. } => last.is_connectivity(),
            ClientError::RemoteRejected(_) | ClientError::Cancelled => false,
        }
    }

    /// Returns the transport error, looking through `RetriesExhausted`.
    pub fn transport_error(&self) -> Option<&TransportError> {
        match self {
            ClientError::Transport(e) => Some(e),
            ClientError::RetriesExhausted { last, .. } => last.transport_error(),
            _ => None,
        }
    }

    /// Returns the innermost error of a `RetriesExhausted` chain, or `self`.
    pub fn last_error(&self) -> &ClientError<E> {
        match self {
            ClientError::RetriesExhausted { last, .. } => last.last_error(),
            other => other,
        }
    }

    /// Extracts the remote call error, if any.
    pub fn remote_error(self) -> Option<E> {
        match self {
            ClientError::CallFailed(e) | ClientError::RemoteRejected(e) => Some(e),
            ClientError::RetriesExhausted { last, .. } => last.remote_error(),
            ClientError::Transport(_) | ClientError::Cancelled => None,
        }
    }

    /// Maps the remote call error using a function.
    ///
    /// ```
    /// use beacon_rpc_core::ClientError;
    ///
    /// let err: ClientError<String> = ClientError::RemoteRejected("denied".to_string());
    /// let mapped: ClientError<usize> = err.map_remote(|s| s.len());
    /// assert_eq!(mapped.remote_error(), Some(6));
    /// ```
    pub fn map_remote<F, T>(self, f: F) -> ClientError<T>
    where
        F: FnOnce(E) -> T,
    {
        match self {
            ClientError::Transport(e) => ClientError::Transport(e),
            ClientError::CallFailed(e) => ClientError::CallFailed(f(e)),
            ClientError::RemoteRejected(e) => ClientError::RemoteRejected(f(e)),
            ClientError::Cancelled => ClientError::Cancelled,
            ClientError::RetriesExhausted { attempts, last } => ClientError::RetriesExhausted {
                attempts,
                last: Box::new(last.map_remote(f)),
            },
        }
    }
}

impl<E> fmt::Display for ClientError<E>
where
    E: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::Transport(e) => write!(f, "{}", e),
            ClientError::CallFailed(e) => write!(f, "remote call failed: {}", e),
            ClientError::RemoteRejected(e) => write!(f, "remote rejected the request: {}", e),
            ClientError::Cancelled => write!(f, "request cancelled"),
            ClientError::RetriesExhausted { attempts, last } => {
                write!(f, "retries exhausted after {} attempts: {}", attempts, last)
            }
        }
    }
}

impl<E> std::error::Error for ClientError<E>
where
    E: std::error::Error + 'static,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ClientError::Transport(e) => Some(e),
            ClientError::CallFailed(e) | ClientError::RemoteRejected(e) => Some(e),
            ClientError::Cancelled => None,
            ClientError::RetriesExhausted { last, .. } => Some(last.as_ref()),
        }
    }
}
