//! # Token Endpoint
//!
//! The Token Endpoint issues an Access Token in exchange for the Authorization
//! Code the wallet obtained in a successful Authorization Response. Only the
//! `authorization_code` grant is supported.
//!
//! The access token is a mock bearer secret bound to the issuer session named
//! in the request path. It carries no claims and is never introspected.
//!
//! The authorization server MUST include the HTTP "Cache-Control" response header
//! field [RFC2616](https://www.rfc-editor.org/rfc/rfc2616) with a value of "no-store" in any response containing tokens,
//! credentials, or other sensitive information, as well as the "Pragma" response
//! header field [RFC2616](https://www.rfc-editor.org/rfc/rfc2616) with a value of "no-cache".
//!
//! Authorization codes remain valid after exchange unless the crate is built
//! with the `single-use-codes` feature.

use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::gen;
use crate::provider::Provider;
use crate::state::{AccessToken, AuthorizationState, Repository, Stage};
use crate::{Error, Result};

/// The only grant type accepted.
pub const AUTHORIZATION_CODE: &str = "authorization_code";

/// Lifetime advertised for access tokens, in seconds.
pub const EXPIRES_IN: i64 = 3600;

/// Token request.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct TokenRequest {
    /// The issuer session (`{id}` path segment). Set by the transport.
    #[serde(skip)]
    pub issuer_id: String,

    /// The authorization code.
    pub code: String,

    /// Must match the `redirect_uri` of the authorization request.
    pub redirect_uri: String,

    /// Must be `authorization_code`.
    pub grant_type: String,
}

/// Token response.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct TokenResponse {
    /// Always `Bearer`.
    pub token_type: String,

    /// The mock access token.
    pub access_token: String,

    /// Token lifetime in seconds.
    pub expires_in: i64,
}

/// Token request handler.
///
/// # Errors
///
/// Returns `UnsupportedGrantType` for any grant other than
/// `authorization_code`, `InvalidRequest` for unknown codes or state, and
/// `ServerError` when state is unreadable, the `redirect_uri` differs from the
/// authorized one, or the token cannot be saved.
#[instrument(level = "debug", skip(provider))]
pub async fn token(provider: impl Provider, request: &TokenRequest) -> Result<TokenResponse> {
    // reject before touching state
    if request.grant_type != AUTHORIZATION_CODE {
        return Err(Error::UnsupportedGrantType("unsupported grant type".into()));
    }

    let repo = Repository::new(&provider);

    let auth_state = match repo.get_auth_code(&request.code).await {
        Ok(Some(auth_state)) => auth_state,
        Ok(None) => return Err(Error::InvalidRequest("invalid state".into())),
        Err(e) => {
            tracing::error!("token: {e}");
            return Err(Error::ServerError("failed to read request".into()));
        }
    };
    let state = match repo.get_auth_state(&auth_state).await {
        Ok(Some(state)) => state,
        Ok(None) => return Err(Error::InvalidRequest("invalid request".into())),
        Err(e) => {
            tracing::error!("token: {e}");
            return Err(Error::ServerError("failed to read request".into()));
        }
    };

    let ctx = Context { auth_state, state };

    verify(&ctx, request)?;
    process(ctx, &provider, request).await
}

#[derive(Debug)]
struct Context {
    auth_state: String,
    state: AuthorizationState,
}

fn verify(context: &Context, request: &TokenRequest) -> Result<()> {
    tracing::debug!("token::verify");

    // TODO: a mismatch is a client error and should be reported as such
    if context.state.request.redirect_uri != request.redirect_uri {
        return Err(Error::ServerError("request validation failed".into()));
    }

    Ok(())
}

async fn process(
    mut context: Context, provider: &impl Provider, request: &TokenRequest,
) -> Result<TokenResponse> {
    tracing::debug!("token::process");

    let repo = Repository::new(provider);

    let access_token = gen::access_token();
    let token_state = AccessToken {
        issuer_id: request.issuer_id.clone(),
        auth_state: context.auth_state.clone(),
    };
    repo.put_access_token(&access_token, &token_state)
        .await
        .map_err(|e| Error::ServerError(format!("failed to save token state: {e}")))?;

    #[cfg(feature = "single-use-codes")]
    repo.purge_auth_code(&request.code)
        .await
        .map_err(|e| Error::ServerError(format!("failed to save token state: {e}")))?;

    context.state.stage = Stage::TokenIssued {
        access_token: access_token.clone(),
    };
    repo.put_auth_state(&context.auth_state, &context.state)
        .await
        .map_err(|e| Error::ServerError(format!("failed to save token state: {e}")))?;

    Ok(TokenResponse {
        token_type: "Bearer".into(),
        access_token,
        expires_in: EXPIRES_IN,
    })
}

#[cfg(test)]
mod tests {
    use test_utils::issuer::{Provider, CLIENT_ID, REDIRECT_URI};

    use super::*;
    use crate::authorize::{
        authorize, authorize_response, AuthorizationRequest, AuthorizeResponseRequest,
    };

    // Run the authorization steps, returning the auth state id and code.
    async fn authorized(provider: &Provider) -> (String, String) {
        let request = AuthorizationRequest {
            claims: "{}".into(),
            redirect_uri: REDIRECT_URI.into(),
            state: "wallet-state".into(),
            client_id: CLIENT_ID.into(),
            ..AuthorizationRequest::default()
        };
        let authorized = authorize(provider.clone(), &request).await.expect("should authorize");

        let request = AuthorizeResponseRequest {
            auth_state: Some(authorized.auth_state.clone()),
        };
        let redirect =
            authorize_response(provider.clone(), &request).await.expect("should redirect");
        (authorized.auth_state, redirect.code)
    }

    fn request(code: &str) -> TokenRequest {
        TokenRequest {
            issuer_id: "issuer-1".into(),
            code: code.into(),
            redirect_uri: REDIRECT_URI.into(),
            grant_type: AUTHORIZATION_CODE.into(),
        }
    }

    #[tokio::test]
    async fn exchange_code() {
        test_utils::init_tracer();

        let provider = Provider::new();
        let (auth_state, code) = authorized(&provider).await;

        let response = token(provider.clone(), &request(&code)).await.expect("should exchange");
        assert_eq!(response.token_type, "Bearer");
        assert_eq!(response.expires_in, 3600);
        assert!(uuid_like(&response.access_token));

        let repo = Repository::new(&provider);
        let token_state = repo
            .get_access_token(&response.access_token)
            .await
            .expect("should load")
            .expect("token exists");
        assert_eq!(
            token_state,
            AccessToken {
                issuer_id: "issuer-1".into(),
                auth_state: auth_state.clone(),
            }
        );

        let state =
            repo.get_auth_state(&auth_state).await.expect("should load").expect("state exists");
        assert_eq!(
            state.stage,
            Stage::TokenIssued {
                access_token: response.access_token
            }
        );
    }

    #[tokio::test]
    async fn unsupported_grant() {
        test_utils::init_tracer();

        let provider = Provider::new();
        let request = TokenRequest {
            grant_type: "urn:ietf:params:oauth:grant-type:pre-authorized_code".into(),
            ..request("anything")
        };
        let err = token(provider.clone(), &request).await.expect_err("should fail");
        assert_eq!(err.to_json(), serde_json::json!({"error": "unsupported grant type"}));
        assert!(provider.state.is_empty());
    }

    #[tokio::test]
    async fn unknown_code() {
        let provider = Provider::new();
        let err = token(provider, &request("unknown")).await.expect_err("should fail");
        assert_eq!(err, Error::InvalidRequest("invalid state".into()));
    }

    // A mismatched redirect_uri currently surfaces as a server error.
    #[tokio::test]
    async fn redirect_uri_mismatch() {
        let provider = Provider::new();
        let (_, code) = authorized(&provider).await;

        let request = TokenRequest {
            redirect_uri: "https://elsewhere.example/callback".into(),
            ..request(&code)
        };
        let err = token(provider, &request).await.expect_err("should fail");
        assert_eq!(err, Error::ServerError("request validation failed".into()));
    }

    // Codes are not invalidated on exchange.
    #[cfg(not(feature = "single-use-codes"))]
    #[tokio::test]
    async fn code_replay_succeeds() {
        let provider = Provider::new();
        let (_, code) = authorized(&provider).await;

        let first = token(provider.clone(), &request(&code)).await.expect("should exchange");
        let second = token(provider, &request(&code)).await.expect("should exchange again");
        assert_ne!(first.access_token, second.access_token);
    }

    #[cfg(feature = "single-use-codes")]
    #[tokio::test]
    async fn code_replay_fails() {
        let provider = Provider::new();
        let (_, code) = authorized(&provider).await;

        token(provider.clone(), &request(&code)).await.expect("should exchange");
        let err = token(provider, &request(&code)).await.expect_err("should fail");
        assert_eq!(err, Error::InvalidRequest("invalid state".into()));
    }

    fn uuid_like(token: &str) -> bool {
        token.len() == 36 && token.chars().filter(|c| *c == '-').count() == 4
    }
}
