//! # Provider Traits
//!
//! The sandbox issuer does not talk to storage, key material, the VC service,
//! or the CMS directly. Implementers supply these collaborators through the
//! traits below, which are combined into a single [`Provider`].

use std::future::Future;

pub use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Issuer Provider trait.
pub trait Provider:
    StateStore + Signer + Profiles + Cms + Interactions + Issuance + Clone
{
}

/// `StateStore` is a flat key-value store shared by every issuance flow.
///
/// Expiry and eviction are the implementer's concern; the library never
/// assumes a record disappears on its own.
pub trait StateStore: Send + Sync {
    /// Store `value` under `key`, replacing any existing value.
    fn put(&self, key: &str, value: Vec<u8>) -> impl Future<Output = Result<()>> + Send;

    /// Retrieve the value stored under `key`. Returns `Ok(None)` when the key
    /// is unknown.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<Vec<u8>>>> + Send;

    /// Remove the value stored under `key`, if any.
    fn purge(&self, key: &str) -> impl Future<Output = Result<()>> + Send;
}

/// `Signer` produces the signatures embedded in issued credentials.
pub trait Signer: Send + Sync {
    /// Sign the message, returning the raw signature bytes.
    fn try_sign(&self, msg: &[u8]) -> impl Future<Output = Result<Vec<u8>>> + Send;

    /// The verification method (DID URL) a verifier should use to check
    /// signatures produced by this signer.
    fn verification_method(&self) -> String;
}

/// `Profiles` resolves issuer profiles held by the external VC service.
pub trait Profiles: Send + Sync {
    /// Returns the issuer profile registered under `name`.
    fn profile(&self, name: &str) -> impl Future<Output = Result<IssuerProfile>> + Send;
}

/// `Cms` fetches user and subject records from the content management system
/// backing the demo.
pub trait Cms: Send + Sync {
    /// Returns the single user matching the (URL-encoded) search query.
    fn user(&self, query: &str, token: &str) -> impl Future<Output = Result<User>> + Send;

    /// Returns the single subject record of kind `scope` owned by `user_id`.
    fn subject_data(
        &self, scope: &str, user_id: &str, token: &str,
    ) -> impl Future<Output = Result<Map<String, Value>>> + Send;
}

/// `Interactions` starts `OpenID4CI` interactions on the external VC service
/// for the demo pages.
pub trait Interactions: Send + Sync {
    /// Initiate an issuance interaction, returning the credential offer URL
    /// and the transaction id used to correlate webhook events.
    fn initiate_oidc(
        &self, request: &InitiateOidcRequest,
    ) -> impl Future<Output = Result<InitiateOidcResponse>> + Send;
}

/// `Issuance` hands assembled credentials to the VC service, which signs and
/// issues them under one of its issuer profiles.
pub trait Issuance: Send + Sync {
    /// Issue `credential` under the issuer profile `profile`, returning the
    /// issued (signed) credential.
    fn issue_credential(
        &self, profile: &str, credential: &Value,
    ) -> impl Future<Output = Result<Value>> + Send;
}

/// Issuer profile metadata held by the VC service.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct IssuerProfile {
    /// Profile name, also used as the issuer display name.
    pub name: String,

    /// The issuer's DID.
    pub did: String,

    /// Base URI used to mint credential ids.
    pub uri: String,
}

/// A CMS user record.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct User {
    /// CMS user id.
    #[serde(rename = "userid")]
    pub user_id: String,

    /// Display name.
    #[serde(default)]
    pub name: String,

    /// E-mail address.
    #[serde(default)]
    pub email: String,
}

/// Request to initiate an `OpenID4CI` interaction on the VC service.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct InitiateOidcRequest {
    /// Credential template configured on the VC service issuer profile.
    pub credential_template_id: String,

    /// Grant type the wallet is expected to use.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grant_type: Option<String>,

    /// Response type for the authorization code flow.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_type: Option<String>,

    /// Scopes for the authorization code flow.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub scope: Vec<String>,

    /// Issuer state passed back to the claim endpoint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub op_state: Option<String>,

    /// Endpoint the VC service calls to fetch claim data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claim_endpoint: Option<String>,

    /// Claims issued in a pre-authorized flow.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claim_data: Option<Map<String, Value>>,

    /// Whether the wallet must supply a PIN.
    #[serde(default)]
    pub user_pin_required: bool,
}

/// Response from the VC service interaction initiation.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct InitiateOidcResponse {
    /// Credential offer URL to render as a QR code.
    pub offer_credential_url: String,

    /// Transaction id correlating webhook events.
    pub tx_id: String,

    /// PIN the user must enter in the wallet, when required.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_pin: Option<String>,
}
