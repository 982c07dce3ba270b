//! # stockpile-core
//!
//! Shared foundation types for the Stockpile inventory client.
//!
//! This crate provides:
//! - The error taxonomy used across the session and request layers
//! - The `{code, message, data}` response envelope the backend wraps every
//!   JSON payload in
//! - Canonical request signatures used for response caching and in-flight
//!   request deduplication
//!
//! ## Modules
//!
//! - [`error`] - `ApiError` and its presentation categories
//! - [`envelope`] - Response envelope decoding
//! - [`signature`] - Canonical request identity

pub mod envelope;
pub mod error;
pub mod signature;

pub use envelope::ResponseEnvelope;
pub use error::{ApiError, ErrorCategory};
pub use signature::{RequestSignature, canonical_json};

/// Type alias for results in the client stack.
pub type ApiResult<T> = Result<T, ApiError>;
