//! Response envelope decoding.
//!
//! Every JSON response from the backend is wrapped in a
//! `{code, message, data}` envelope. `code == 200` means success; any other
//! code is an application-level failure even when the HTTP status is 200.

use serde::Deserialize;

use crate::error::ApiError;

/// Envelope code that indicates success.
pub const ENVELOPE_OK: i64 = 200;

/// The `{code, message, data}` wrapper the backend puts around every JSON
/// payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct ResponseEnvelope<T> {
    /// Application-level status code; 200 is success.
    pub code: i64,

    /// Human-readable message, typically populated on failure.
    #[serde(default)]
    pub message: String,

    /// The payload. Absent or null on failures and on void operations.
    #[serde(default)]
    pub data: Option<T>,
}

impl<T> ResponseEnvelope<T> {
    /// Returns `true` if the envelope carries a success code.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.code == ENVELOPE_OK
    }

    /// Unwraps the payload, classifying non-success codes.
    ///
    /// # Errors
    ///
    /// Returns the classified envelope error when `code != 200`, or an
    /// internal error when a success envelope is missing its payload.
    pub fn into_result(self) -> Result<T, ApiError> {
        if !self.is_success() {
            return Err(ApiError::from_envelope(self.code, self.message));
        }
        self.data
            .ok_or_else(|| ApiError::internal("success envelope without payload"))
    }

    /// Checks the code and discards the payload, for void operations such as
    /// logout.
    ///
    /// # Errors
    ///
    /// Returns the classified envelope error when `code != 200`.
    pub fn into_unit(self) -> Result<(), ApiError> {
        if !self.is_success() {
            return Err(ApiError::from_envelope(self.code, self.message));
        }
        Ok(())
    }
}
