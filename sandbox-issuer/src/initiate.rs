//! # Initiate Issuance Endpoint
//!
//! Starts a mock `OpenID4VCI` issuance. The caller supplies the credential to
//! be issued, the credential manifests to advertise, and the base URL the
//! issuer is reachable at. The endpoint:
//!
//! 1. mints a fresh issuer key and derives the issuer identifier
//!    `{issuerURL}/{key}`,
//! 2. stores the issuer's well-known configuration under `key` and the pending
//!    credential under `cred_store_{key}`,
//! 3. returns the wallet deep link used to start the flow.
//!
//! ```text
//! +--------+                          +--------+                      +--------+
//! | Caller |                          | Issuer |                      | Wallet |
//! +--------+                          +--------+                      +--------+
//!     |  (1) initiate issuance            |                               |
//!     |---------------------------------->|                               |
//!     |      wallet deep link             |                               |
//!     |<----------------------------------|                               |
//!     |  (2) redirect user to deep link   |                               |
//!     |------------------------------------------------------------------>|
//!     |                                   |  (3) well-known configuration |
//!     |                                   |<----------------------------->|
//!     |                                   |  (4) authorize, token,        |
//!     |                                   |      credential               |
//!     |                                   |<----------------------------->|
//! ```

use serde::{Deserialize, Serialize};
use serde_json::ser::PrettyFormatter;
use serde_json::Value;
use tracing::instrument;
use url::Url;

use crate::gen;
use crate::provider::Provider;
use crate::state::Repository;
use crate::{Error, Result};

/// Request to initiate an issuance.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct InitiateIssuanceRequest {
    /// Wallet URL initiating the issuance. Transports substitute their
    /// configured default when the caller leaves it empty.
    #[serde(rename = "walletInitIssuanceURL")]
    pub wallet_init_issuance_url: String,

    /// Comma-separated credential types offered.
    #[serde(rename = "credentialTypes")]
    pub credential_types: String,

    /// Comma-separated manifest ids offered.
    #[serde(rename = "manifestIDs")]
    pub manifest_ids: String,

    /// Base URL of this issuer.
    #[serde(rename = "issuerURL")]
    pub issuer_url: String,

    /// Credential manifests advertised in the well-known configuration.
    #[serde(rename = "credManifest")]
    pub cred_manifest: Value,

    /// The credential to issue. Either the credential itself or its JSON
    /// serialization as a string.
    pub credential: Value,
}

/// Response to a successful initiation.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct InitiateIssuanceResponse {
    /// The key identifying the new issuer session.
    pub key: String,

    /// The issuer identifier, `{issuerURL}/{key}`.
    pub issuer: String,

    /// Wallet deep link starting the flow.
    pub wallet_url: String,
}

/// The `OpenID4VCI` well-known configuration advertised for an issuer
/// session.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct IssuerConfiguration {
    /// Issuer identifier.
    pub issuer: String,

    /// Authorization endpoint URL.
    pub authorization_endpoint: String,

    /// Token endpoint URL.
    pub token_endpoint: String,

    /// Credential endpoint URL.
    pub credential_endpoint: String,

    /// Supported credential manifests.
    pub credential_manifests: Value,
}

impl IssuerConfiguration {
    /// Derive the endpoint URLs for `issuer`.
    #[must_use]
    pub fn new(issuer: &str, credential_manifests: Value) -> Self {
        Self {
            issuer: issuer.to_string(),
            authorization_endpoint: format!("{issuer}/oidc/authorize"),
            token_endpoint: format!("{issuer}/oidc/token"),
            credential_endpoint: format!("{issuer}/oidc/credential"),
            credential_manifests,
        }
    }

    // Serialized with tab indentation so the stored document reads well when
    // served back verbatim.
    fn to_vec(&self) -> anyhow::Result<Vec<u8>> {
        let mut buf = Vec::new();
        let formatter = PrettyFormatter::with_indent(b"\t");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut ser)?;
        Ok(buf)
    }
}

/// Initiate issuance request handler.
///
/// # Errors
///
/// Returns a `ServerError` if the configuration cannot be stored or the wallet
/// URL cannot be parsed.
#[instrument(level = "debug", skip(provider))]
pub async fn initiate_issuance(
    provider: impl Provider, request: &InitiateIssuanceRequest,
) -> Result<InitiateIssuanceResponse> {
    process(provider, request).await
}

async fn process(
    provider: impl Provider, request: &InitiateIssuanceRequest,
) -> Result<InitiateIssuanceResponse> {
    tracing::debug!("initiate::process");

    let key = gen::issuer_key();
    let issuer = format!("{}/{key}", request.issuer_url);

    let config = IssuerConfiguration::new(&issuer, request.cred_manifest.clone())
        .to_vec()
        .map_err(|e| {
            Error::ServerError(format!("failed to prepare issuer wellknown configuration : {e}"))
        })?;

    let credential = match &request.credential {
        Value::String(s) => s.as_bytes().to_vec(),
        other => serde_json::to_vec(other).map_err(|e| {
            Error::ServerError(format!("failed to store issuer server configuration : {e}"))
        })?,
    };

    let repo = Repository::new(&provider);
    repo.put_issuer_config(&key, config).await.map_err(|e| {
        Error::ServerError(format!("failed to store issuer server configuration : {e}"))
    })?;
    repo.put_credential(&key, credential).await.map_err(|e| {
        Error::ServerError(format!("failed to store issuer server configuration : {e}"))
    })?;

    let wallet_url = wallet_url(
        &request.wallet_init_issuance_url,
        &issuer,
        &split_csv(&request.credential_types),
        &split_csv(&request.manifest_ids),
    )
    .map_err(|e| Error::ServerError(format!("failed to parse wallet init issuance URL : {e}")))?;

    Ok(InitiateIssuanceResponse {
        key,
        issuer,
        wallet_url,
    })
}

// Build the wallet deep link: any existing query is kept (bar `issuer`),
// followed by `issuer`, then every `credential_type`, then every `manifest_id`.
fn wallet_url(
    wallet: &str, issuer: &str, credential_types: &[&str], manifest_ids: &[&str],
) -> anyhow::Result<String> {
    let mut url = Url::parse(wallet)?;

    let existing: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != "issuer")
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    {
        let mut query = url.query_pairs_mut();
        query.clear();
        query.extend_pairs(existing);
        query.append_pair("issuer", issuer);
        for credential_type in credential_types {
            query.append_pair("credential_type", credential_type);
        }
        for manifest_id in manifest_ids {
            query.append_pair("manifest_id", manifest_id);
        }
    }

    Ok(url.to_string())
}

fn split_csv(csv: &str) -> Vec<&str> {
    csv.split(',').map(str::trim).filter(|s| !s.is_empty()).collect()
}
