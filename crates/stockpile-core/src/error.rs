//! Client error types.
//!
//! This module defines all error types that can occur while coordinating
//! requests and session state against the inventory backend.

/// Errors produced by the request pipeline and session layer.
///
/// The taxonomy distinguishes transport failures (no response at all) from
/// HTTP-level failures, application-level envelope failures, and the
/// cancellation signal used by request deduplication.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// No response was received: timeout, DNS failure, connection refused.
    #[error("Network error: {message}")]
    Network {
        /// Description of the transport failure.
        message: String,
    },

    /// The request was rejected as malformed (HTTP 400 or an equivalent
    /// envelope code).
    #[error("Validation error: {message}")]
    Validation {
        /// Description of what was invalid.
        message: String,
    },

    /// The request lacked valid credentials and could not be recovered by a
    /// token refresh.
    #[error("Unauthorized: {message}")]
    Unauthorized {
        /// Description of why the request is unauthorized.
        message: String,
    },

    /// The authenticated user may not perform this action (HTTP 403).
    #[error("Forbidden: {message}")]
    Forbidden {
        /// Description of why access is forbidden.
        message: String,
    },

    /// The requested resource does not exist (HTTP 404).
    #[error("Not found: {message}")]
    NotFound {
        /// Description of what was missing.
        message: String,
    },

    /// The server failed to process the request (HTTP 5xx).
    #[error("Server error: {message}")]
    Server {
        /// Description of the server failure.
        message: String,
    },

    /// The response envelope carried a non-success code that does not map to
    /// a more specific variant.
    #[error("API error {code}: {message}")]
    Api {
        /// Application-level code from the response envelope.
        code: i64,
        /// Message from the response envelope.
        message: String,
    },

    /// The request was cancelled because a newer request with the same
    /// signature superseded it.
    #[error("Request superseded by a newer duplicate")]
    Superseded,

    /// Reading or writing persisted session state failed.
    #[error("Storage error: {message}")]
    Storage {
        /// Description of the storage failure.
        message: String,
    },

    /// An unexpected internal error occurred.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl ApiError {
    /// Creates a new `Network` error.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Creates a new `Validation` error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Creates a new `Unauthorized` error.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    /// Creates a new `Forbidden` error.
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    /// Creates a new `NotFound` error.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Creates a new `Server` error.
    #[must_use]
    pub fn server(message: impl Into<String>) -> Self {
        Self::Server {
            message: message.into(),
        }
    }

    /// Creates a new `Storage` error.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Classifies an HTTP status code, preferring the server-provided message
    /// when one was extracted from the response body.
    #[must_use]
    pub fn from_status(status: u16, message: Option<String>) -> Self {
        let msg = |fallback: &str| message.clone().unwrap_or_else(|| fallback.to_string());
        match status {
            400 => Self::validation(msg("invalid request parameters")),
            401 => Self::unauthorized(msg("missing or expired credentials")),
            403 => Self::forbidden(msg("access to this resource is denied")),
            404 => Self::not_found(msg("the requested resource does not exist")),
            500..=599 => Self::server(msg("the server failed to process the request")),
            _ => Self::Api {
                code: i64::from(status),
                message: msg("request failed"),
            },
        }
    }

    /// Classifies an application-level envelope code (`code != 200` inside an
    /// HTTP 200 response).
    ///
    /// Envelope codes mirror HTTP semantics, so codes in the status range are
    /// classified the same way; anything else is surfaced verbatim.
    #[must_use]
    pub fn from_envelope(code: i64, message: impl Into<String>) -> Self {
        let message = message.into();
        match u16::try_from(code) {
            Ok(status @ 400..=599) => Self::from_status(status, Some(message)),
            _ => Self::Api { code, message },
        }
    }

    /// Returns `true` if this is the supersession signal.
    #[must_use]
    pub fn is_superseded(&self) -> bool {
        matches!(self, Self::Superseded)
    }

    /// Returns `true` if this error means the session is no longer valid.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }

    /// Returns the presentation category for this error.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Network { .. } => ErrorCategory::Network,
            Self::Unauthorized { .. } => ErrorCategory::Auth,
            Self::Validation { .. } | Self::Forbidden { .. } | Self::NotFound { .. } => {
                ErrorCategory::Client
            }
            Self::Server { .. } | Self::Api { .. } => ErrorCategory::Server,
            Self::Superseded => ErrorCategory::Cancelled,
            Self::Storage { .. } | Self::Internal { .. } => ErrorCategory::Internal,
        }
    }
}

/// Coarse error grouping used to decide how a failure is presented.
///
/// Transient categories surface as dismissible notifications; `Auth` triggers
/// navigation away from the current view; `Cancelled` is a no-op signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Transport-level failure, likely transient.
    Network,
    /// The session is invalid; the user must authenticate again.
    Auth,
    /// The request itself was wrong; handled by the calling form.
    Client,
    /// The server failed; surfaced as a notification.
    Server,
    /// Superseded by a newer duplicate; ignored silently.
    Cancelled,
    /// Local storage or invariant failure.
    Internal,
}
