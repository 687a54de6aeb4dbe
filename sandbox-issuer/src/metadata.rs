//! # Well-Known Configuration Endpoint
//!
//! Serves the `OpenID4VCI` configuration stored for an issuer session when
//! issuance was initiated. The document is returned exactly as stored.
//!
//! ```http
//! GET /{id}/.well-known/openid-configuration HTTP/1.1
//!     Host: issuer.example.com
//! ```

use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::provider::Provider;
use crate::state::Repository;
use crate::{Error, Result};

/// Request for an issuer session's well-known configuration.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct WellKnownRequest {
    /// The issuer session key (the `{id}` path segment).
    pub id: String,
}

/// The stored well-known configuration, as raw JSON bytes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WellKnownResponse {
    /// Serialized configuration document.
    pub configuration: Vec<u8>,
}

/// Well-known configuration request handler.
///
/// # Errors
///
/// Returns a `ServerError` when no configuration is stored for the session;
/// the id is issued by this server, so a miss is a server-side inconsistency.
#[instrument(level = "debug", skip(provider))]
pub async fn well_known(
    provider: impl Provider, request: &WellKnownRequest,
) -> Result<WellKnownResponse> {
    tracing::debug!("well_known::process");

    let configuration = Repository::new(&provider)
        .get_issuer_config(&request.id)
        .await
        .map_err(|e| Error::ServerError(format!("failed to get well known configuration: {e}")))?
        .ok_or_else(|| {
            Error::ServerError(format!("no well known configuration for {}", request.id))
        })?;

    Ok(WellKnownResponse { configuration })
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};
    use test_utils::issuer::{Provider, ISSUER_URL, WALLET_URL};

    use super::*;
    use crate::initiate::{initiate_issuance, InitiateIssuanceRequest};

    #[tokio::test]
    async fn returns_stored_document() {
        test_utils::init_tracer();

        let provider = Provider::new();
        let initiated = initiate_issuance(
            provider.clone(),
            &InitiateIssuanceRequest {
                wallet_init_issuance_url: WALLET_URL.into(),
                issuer_url: ISSUER_URL.into(),
                cred_manifest: json!({"id": "m1"}),
                ..InitiateIssuanceRequest::default()
            },
        )
        .await
        .expect("should initiate");

        let request = WellKnownRequest { id: initiated.key.clone() };
        let response = well_known(provider.clone(), &request).await.expect("should be found");

        assert_eq!(Some(response.configuration.clone()), provider.state.raw(&initiated.key));
        let doc: Value = serde_json::from_slice(&response.configuration).expect("should be json");
        assert_eq!(doc["issuer"], json!(initiated.issuer));
        assert_eq!(doc["credential_manifests"], json!({"id": "m1"}));
    }

    #[tokio::test]
    async fn unknown_session() {
        let provider = Provider::new();
        let request = WellKnownRequest { id: "unknown".into() };
        let err = well_known(provider, &request).await.expect_err("should fail");
        assert!(matches!(err, Error::ServerError(_)));
    }
}
