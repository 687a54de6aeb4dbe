//! # Sandbox Errors
//!
//! This module defines the errors surfaced by the mock `OpenID` for Verifiable
//! Credential Issuance endpoints.
//!
//! Each variant carries the message returned to the caller. Transport layers
//! choose the status code from the variant and the body from [`Error::to_json`]
//! (`OpenID` endpoints) or the plain message (everything else).

use std::fmt::Debug;

use serde::{Serialize, Serializer};
use thiserror::Error;

/// Errors returned by the sandbox issuer endpoints.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The request is missing a required parameter, includes an unsupported
    /// parameter value, or refers to a correlation id (state, code, token,
    /// transaction) that is unknown or expired.
    #[error("{0}")]
    InvalidRequest(String),

    /// The caller is not allowed to perform the request: missing or invalid
    /// state cookie, empty bearer token, or an access token bound to another
    /// issuer.
    #[error("{0}")]
    AccessDenied(String),

    /// The authorization grant type is not supported by the authorization
    /// server. Only `authorization_code` is accepted.
    #[error("{0}")]
    UnsupportedGrantType(String),

    /// Requested credential format is not supported.
    #[error("{0}")]
    UnsupportedFormat(String),

    /// The server encountered an unexpected condition that prevented it from
    /// fulfilling the request.
    #[error("{0}")]
    ServerError(String),
}

/// Error response body for the `OpenID` endpoints.
#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
}

impl Serialize for Error {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let msg = self.to_string();
        ErrorBody { error: &msg }.serialize(serializer)
    }
}

impl Error {
    /// Transform error to the compact `{"error": "<message>"}` envelope.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }

    /// Returns `true` when the error was caused by the caller rather than the
    /// server or one of its collaborators.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        !matches!(self, Self::ServerError(_))
    }
}
