//! # Interaction Initiation
//!
//! The demo pages start an `OpenID4CI` interaction on the VC service and show
//! the wallet the resulting credential offer (as a QR code) together with the
//! PIN, if one is required. Progress is then reported through the
//! [`events`](crate::events) relay.
//!
//! Two flows are supported:
//!
//! - pre-authorized: the claims are supplied up front and a PIN is required
//!   unless the page asks otherwise,
//! - authorization code: the VC service fetches claims from the claim
//!   endpoint once the user has authorized.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::instrument;

use crate::gen;
use crate::provider::{InitiateOidcRequest, Interactions, Provider};
use crate::{Error, Result};

/// Credential template configured on the demo issuer profile.
pub const CREDENTIAL_TEMPLATE_ID: &str = "templateID";

/// Credential type issued by the demo template.
pub const CREDENTIAL_TYPE: &str = "VerifiedEmployee";

/// Which issuance flow to start.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Flow {
    /// Pre-authorized code flow with fixed demo claims.
    PreAuthorized {
        /// Whether the wallet must enter a PIN.
        require_pin: bool,
    },

    /// Authorization code flow; claims are served from `claim_endpoint`.
    AuthorizationCode {
        /// Where the VC service fetches claim data.
        claim_endpoint: String,
    },
}

impl Default for Flow {
    fn default() -> Self {
        Self::PreAuthorized { require_pin: true }
    }
}

/// Request to start an interaction.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct InteractionRequest {
    /// The flow to start.
    pub flow: Flow,

    /// Client the interaction is issued by, shown in the success text.
    pub issued_by: String,
}

/// What the demo page needs to render.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InteractionResponse {
    /// Credential offer URL.
    pub url: String,

    /// Transaction id to poll events for.
    #[serde(rename = "txID")]
    pub tx_id: String,

    /// Message shown once issuance succeeds.
    pub success_text: String,

    /// PIN to enter in the wallet, empty when none is required.
    pub pin: String,
}

/// Start an interaction on the VC service.
///
/// # Errors
///
/// Returns a `ServerError` when the VC service cannot be reached or rejects
/// the request.
#[instrument(level = "debug", skip(provider))]
pub async fn initiate_interaction(
    provider: impl Provider, request: &InteractionRequest,
) -> Result<InteractionResponse> {
    tracing::debug!("interaction::process");

    let initiate = match &request.flow {
        Flow::PreAuthorized { require_pin } => InitiateOidcRequest {
            credential_template_id: CREDENTIAL_TEMPLATE_ID.into(),
            claim_data: Some(demo_claims()),
            user_pin_required: *require_pin,
            ..InitiateOidcRequest::default()
        },
        Flow::AuthorizationCode { claim_endpoint } => InitiateOidcRequest {
            credential_template_id: CREDENTIAL_TEMPLATE_ID.into(),
            grant_type: Some("authorization_code".into()),
            response_type: Some("code".into()),
            scope: vec!["openid".into(), "profile".into()],
            op_state: Some(gen::transaction_id()),
            claim_endpoint: Some(claim_endpoint.clone()),
            ..InitiateOidcRequest::default()
        },
    };

    let initiated = Interactions::initiate_oidc(&provider, &initiate)
        .await
        .map_err(|e| Error::ServerError(format!("unable to send request for initiate: {e}")))?;

    Ok(InteractionResponse {
        url: initiated.offer_credential_url,
        tx_id: initiated.tx_id,
        success_text: success_text(&initiate, &request.issued_by),
        pin: initiated.user_pin.unwrap_or_default(),
    })
}

// Claims issued by the pre-authorized demo.
fn demo_claims() -> Map<String, Value> {
    let claims = json!({
        "displayName": "John Doe",
        "givenName": "John",
        "jobTitle": "Software Developer",
        "surname": "Doe",
        "preferredLanguage": "English",
        "mail": "john.doe@foo.bar",
    });
    match claims {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn success_text(request: &InitiateOidcRequest, issued_by: &str) -> String {
    let claims = request.claim_data.as_ref().map_or_else(String::new, |claims| {
        let listed: String = claims
            .iter()
            .map(|(k, v)| {
                let v = v.as_str().map_or_else(|| v.to_string(), ToString::to_string);
                format!("{k}:{v} ")
            })
            .collect();
        format!("and claims: {listed}")
    });

    format!(
        "Credentials with template [{}] and type [{CREDENTIAL_TYPE}] {claims}was successfully issued by [{issued_by}]",
        request.credential_template_id
    )
}
