//! # Authorization Endpoint
//!
//! The Authorization Endpoint is used by Wallets to request access to the
//! Credential Endpoint. Authorization happens in two steps:
//!
//! 1. [`authorize`] records the wallet's request under a fresh authorization
//!    state id. The transport hands the id to the browser in a short-lived
//!    `state` cookie and redirects to the login page.
//! 2. Once the user has logged in, [`authorize_response`] resolves the cookie
//!    back to the stored request, mints an authorization code, and returns the
//!    wallet redirect carrying `code` and the wallet's own `state`.
//!
//! ```text
//! +--------+         +---------+                 +--------+
//! | Wallet |         | Browser |                 | Issuer |
//! +--------+         +---------+                 +--------+
//!     | (1) authorize     |                          |
//!     |---------------------------------------------->|
//!     |                   |  302 /oidc/login          |
//!     |                   |  Set-Cookie: state=...    |
//!     |                   |<--------------------------|
//!     |                   | (2) login                 |
//!     |                   |-------------------------->|
//!     |                   |  302 redirect_uri?code=.. |
//!     |<------------------|<--------------------------|
//! ```
//!
//! Claims are not used to select the credential: the credential served by the
//! session was fixed when issuance was initiated.

use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::gen;
use crate::provider::Provider;
use crate::state::{AuthorizationRequestState, AuthorizationState, Repository, Stage};
use crate::{Error, Result};

/// Path of the login page the user is sent to after [`authorize`].
pub const LOGIN_PATH: &str = "/oidc/login";

/// Name of the cookie carrying the authorization state id.
pub const STATE_COOKIE: &str = "state";

/// Lifetime of the [`STATE_COOKIE`], in seconds.
pub const STATE_COOKIE_MAX_AGE: i64 = 5 * 60;

/// Authorization request, as received from the wallet (form or query).
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct AuthorizationRequest {
    /// Requested claims, possibly percent-encoded.
    pub claims: String,

    /// Where to send the authorization code, possibly percent-encoded.
    pub redirect_uri: String,

    /// Requested scope.
    pub scope: String,

    /// Wallet correlation value.
    pub state: String,

    /// Requested response type.
    pub response_type: String,

    /// Wallet client id.
    pub client_id: String,
}

/// Result of a successful authorization request.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct AuthorizationResponse {
    /// Authorization state id to set as the [`STATE_COOKIE`].
    pub auth_state: String,

    /// Where to redirect the browser.
    pub location: String,
}

/// Authorization request handler.
///
/// # Errors
///
/// Returns `InvalidRequest` when `claims`, `redirect_uri`, `client_id` or
/// `state` is missing, and `ServerError` when the request cannot be saved.
#[instrument(level = "debug", skip(provider))]
pub async fn authorize(
    provider: impl Provider, request: &AuthorizationRequest,
) -> Result<AuthorizationResponse> {
    let request = verify(request)?;
    process(&provider, request).await
}

// Decode and validate the request. Nothing is stored for invalid requests.
fn verify(request: &AuthorizationRequest) -> Result<AuthorizationRequestState> {
    tracing::debug!("authorize::verify");

    let claims = urlencoding::decode(&request.claims)
        .map_err(|e| Error::InvalidRequest(format!("failed to read claims : {e}")))?;
    let redirect_uri = urlencoding::decode(&request.redirect_uri)
        .map_err(|e| Error::InvalidRequest(format!("failed to read redirect URI : {e}")))?;

    if claims.is_empty()
        || redirect_uri.is_empty()
        || request.client_id.is_empty()
        || request.state.is_empty()
    {
        return Err(Error::InvalidRequest("Invalid Request".into()));
    }

    Ok(AuthorizationRequestState {
        claims: claims.into_owned(),
        scope: request.scope.clone(),
        state: request.state.clone(),
        response_type: request.response_type.clone(),
        client_id: request.client_id.clone(),
        redirect_uri: redirect_uri.into_owned(),
    })
}

async fn process(
    provider: &impl Provider, request: AuthorizationRequestState,
) -> Result<AuthorizationResponse> {
    tracing::debug!("authorize::process");

    let auth_state = gen::auth_state();
    let state = AuthorizationState {
        request,
        stage: Stage::Requested,
    };
    Repository::new(provider)
        .put_auth_state(&auth_state, &state)
        .await
        .map_err(|e| Error::ServerError(format!("failed to save state : {e}")))?;

    Ok(AuthorizationResponse {
        auth_state,
        location: LOGIN_PATH.into(),
    })
}

/// Request to complete authorization after the user has logged in.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct AuthorizeResponseRequest {
    /// Value of the [`STATE_COOKIE`], if the browser sent one.
    pub auth_state: Option<String>,
}

/// Wallet redirect carrying the authorization code.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct AuthorizeResponseRedirect {
    /// The authorization code.
    pub code: String,

    /// `{redirect_uri}?code={code}&state={state}`.
    pub location: String,
}

/// Completes authorization: mints an authorization code for the stored
/// request and builds the redirect back to the wallet.
///
/// # Errors
///
/// Returns `AccessDenied` without a state cookie, `InvalidRequest` when the
/// state is unknown, and `ServerError` when the stored request is unusable or
/// the code cannot be saved.
#[instrument(level = "debug", skip(provider))]
pub async fn authorize_response(
    provider: impl Provider, request: &AuthorizeResponseRequest,
) -> Result<AuthorizeResponseRedirect> {
    tracing::debug!("authorize_response::verify");

    let Some(auth_state) = request.auth_state.as_deref().filter(|s| !s.is_empty()) else {
        return Err(Error::AccessDenied("invalid state".into()));
    };

    let repo = Repository::new(&provider);
    let mut state = match repo.get_auth_state(auth_state).await {
        Ok(Some(state)) => state,
        Ok(None) => return Err(Error::InvalidRequest("invalid request".into())),
        Err(e) => {
            tracing::error!("authorize_response: {e}");
            return Err(Error::ServerError("failed to read request".into()));
        }
    };

    if state.request.redirect_uri.is_empty() {
        return Err(Error::ServerError("failed to redirect, invalid URL".into()));
    }
    if state.request.state.is_empty() {
        return Err(Error::ServerError("failed to redirect, invalid state".into()));
    }

    tracing::debug!("authorize_response::process");

    let code = gen::auth_code();
    repo.put_auth_code(&code, auth_state)
        .await
        .map_err(|e| Error::ServerError(format!("failed to store state cookie value: {e}")))?;

    let location = redirect_location(&state.request.redirect_uri, &code, &state.request.state);

    state.stage = Stage::CodeIssued { code: code.clone() };
    repo.put_auth_state(auth_state, &state)
        .await
        .map_err(|e| Error::ServerError(format!("failed to save state : {e}")))?;

    Ok(AuthorizeResponseRedirect { code, location })
}

// Append `code` and `state` to the wallet's redirect URI as given, keeping any
// query it already carries. Relative URIs are passed through untouched.
fn redirect_location(redirect_uri: &str, code: &str, state: &str) -> String {
    let separator = match redirect_uri.find('?') {
        None => "?",
        Some(_) if redirect_uri.ends_with(['?', '&']) => "",
        Some(_) => "&",
    };
    format!(
        "{redirect_uri}{separator}code={}&state={}",
        urlencoding::encode(code),
        urlencoding::encode(state)
    )
}
