//! # Credential Endpoint
//!
//! The Credential Endpoint issues the credential pending for an issuer
//! session. The wallet presents the access token obtained from the Token
//! Endpoint as a bearer token; the token must have been minted for the same
//! issuer session as the one named in the request path.
//!
//! The credential is signed on the way out with an `Ed25519Signature2018`
//! linked data proof. The stored credential is left untouched, so every
//! successful request returns a freshly signed copy.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::instrument;

use crate::model::VerifiableCredential;
use crate::proof;
use crate::provider::Provider;
use crate::state::{AccessToken, Repository, Stage};
use crate::{Error, Result};

/// The only credential format supported (an empty format is also accepted).
pub const LDP_VC: &str = "ldp_vc";

/// Credential request.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct CredentialRequest {
    /// The issuer session (`{id}` path segment). Set by the transport.
    #[serde(skip)]
    pub issuer_id: String,

    /// Raw `Authorization` header value. Set by the transport.
    #[serde(skip)]
    pub authorization: Option<String>,

    /// Requested format. Empty or `ldp_vc`.
    pub format: String,
}

/// Credential response.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct CredentialResponse {
    /// The requested format, echoed.
    pub format: String,

    /// The signed credential.
    pub credential: Value,
}

/// Credential request handler.
///
/// # Errors
///
/// Returns `UnsupportedFormat` for formats other than `ldp_vc`,
/// `InvalidRequest` for a malformed or unknown bearer token, `AccessDenied`
/// for an empty token or one bound to another session, and `ServerError` when
/// the credential cannot be loaded, parsed or signed.
#[instrument(level = "debug", skip(provider))]
pub async fn credential(
    provider: impl Provider, request: &CredentialRequest,
) -> Result<CredentialResponse> {
    let token_state = verify(&provider, request).await?;
    process(&provider, request, &token_state).await
}

async fn verify(provider: &impl Provider, request: &CredentialRequest) -> Result<AccessToken> {
    tracing::debug!("credential::verify");

    if !request.format.is_empty() && request.format != LDP_VC {
        return Err(Error::UnsupportedFormat("unsupported format requested".into()));
    }

    let Some(token) = request.authorization.as_deref().and_then(|h| h.strip_prefix("Bearer "))
    else {
        return Err(Error::InvalidRequest("malformed token".into()));
    };
    if token.is_empty() {
        return Err(Error::AccessDenied("invalid token".into()));
    }

    let token_state = match Repository::new(provider).get_access_token(token).await {
        Ok(Some(token_state)) => token_state,
        Ok(None) => return Err(Error::InvalidRequest("invalid token".into())),
        Err(e) => {
            tracing::error!("credential: {e}");
            return Err(Error::ServerError("failed to read token state".into()));
        }
    };

    if token_state.issuer_id != request.issuer_id {
        return Err(Error::AccessDenied("invalid transaction".into()));
    }

    Ok(token_state)
}

async fn process(
    provider: &impl Provider, request: &CredentialRequest, token_state: &AccessToken,
) -> Result<CredentialResponse> {
    tracing::debug!("credential::process");

    let repo = Repository::new(provider);

    let buf = match repo.get_credential(&request.issuer_id).await {
        Ok(Some(buf)) => buf,
        Ok(None) => {
            tracing::error!("credential: nothing pending for {}", request.issuer_id);
            return Err(Error::ServerError("failed to get credential".into()));
        }
        Err(e) => {
            tracing::error!("credential: {e}");
            return Err(Error::ServerError("failed to get credential".into()));
        }
    };
    let mut vc: VerifiableCredential = serde_json::from_slice(&buf).map_err(|e| {
        tracing::error!("credential: {e}");
        Error::ServerError("failed to prepare credential".into())
    })?;

    proof::sign(&mut vc, provider).await.map_err(|e| {
        tracing::error!("credential: {e}");
        Error::ServerError("failed to issue credential".into())
    })?;

    let credential = serde_json::to_value(&vc)
        .map_err(|e| Error::ServerError(format!("failed to write credential bytes: {e}")))?;

    // the stage is tracked against the authorization the token came from
    if let Some(mut state) = repo
        .get_auth_state(&token_state.auth_state)
        .await
        .map_err(|e| Error::ServerError(format!("failed to read request: {e}")))?
    {
        state.stage = Stage::Delivered {
            delivered_at: chrono::Utc::now(),
        };
        repo.put_auth_state(&token_state.auth_state, &state)
            .await
            .map_err(|e| Error::ServerError(format!("failed to save state: {e}")))?;
    }

    Ok(CredentialResponse {
        format: request.format.clone(),
        credential,
    })
}
