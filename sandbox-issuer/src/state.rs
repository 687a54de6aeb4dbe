//! State is used by the library to persist request information between steps
//! in the issuance process.
//!
//! Every record lives in the provider's single, flat [`StateStore`]. Record
//! kinds are partitioned by key prefix, and the prefixes are only ever built
//! here so that endpoints cannot collide with one another.

use anyhow::{anyhow, Context};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::provider::StateStore;

const AUTH_STATE_PREFIX: &str = "authstate_";
const AUTH_CODE_PREFIX: &str = "authcode_";
const ACCESS_TOKEN_PREFIX: &str = "access_token_";
const CRED_STORE_PREFIX: &str = "cred_store_";

/// The authorization request received at the authorize endpoint.
///
/// Immutable once stored.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct AuthorizationRequestState {
    /// Requested claims (URL-decoded).
    pub claims: String,

    /// Requested scope.
    #[serde(default)]
    pub scope: String,

    /// Client-supplied correlation value, echoed back with the code.
    pub state: String,

    /// Requested response type.
    #[serde(default)]
    pub response_type: String,

    /// The wallet's client id.
    pub client_id: String,

    /// Where the wallet expects the authorization code.
    pub redirect_uri: String,
}

/// Authorization state: the original request together with how far the
/// wallet has progressed through the flow.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct AuthorizationState {
    /// The authorization request.
    #[serde(flatten)]
    pub request: AuthorizationRequestState,

    /// The current stage of the flow.
    #[serde(default)]
    pub stage: Stage,
}

/// Issuance stages for a single authorization attempt.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Authorization requested; waiting for the user to log in.
    #[default]
    Requested,

    /// An authorization code was sent to the wallet's redirect URI.
    CodeIssued {
        /// The most recently issued code.
        code: String,
    },

    /// The code was exchanged for an access token.
    TokenIssued {
        /// The most recently issued access token.
        access_token: String,
    },

    /// The signed credential was returned to the wallet.
    Delivered {
        /// When the credential was delivered.
        delivered_at: DateTime<Utc>,
    },
}

/// Access token state: binds a mock bearer token to the issuer session it
/// was minted for.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct AccessToken {
    /// The issuer session (`{id}` path segment) the token was issued for.
    pub issuer_id: String,

    /// The authorization state the token was derived from.
    pub auth_state: String,
}

/// Transaction data bridging the CMS login callback to a later search.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct TxnData {
    /// CMS user id.
    #[serde(rename = "UserID")]
    pub user_id: String,

    /// Scope granted at login.
    #[serde(rename = "Scope")]
    pub scope: String,

    /// Access token for CMS calls.
    #[serde(rename = "Token")]
    pub token: String,
}

/// The outcome of a CMS search, stored for later retrieval.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    /// Scope the data was fetched for.
    pub scope: String,

    /// The subject record returned by the CMS.
    pub user_data: Map<String, Value>,
}

/// Typed access to the records held in the [`StateStore`].
#[derive(Debug)]
pub struct Repository<'a, S: StateStore> {
    store: &'a S,
}

impl<'a, S: StateStore> Repository<'a, S> {
    /// Wrap a state store.
    pub const fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Save authorization state under `authstate_{id}`.
    pub async fn put_auth_state(&self, id: &str, state: &AuthorizationState) -> anyhow::Result<()> {
        self.put_json(&auth_state_key(id), state).await
    }

    /// Load authorization state. `Ok(None)` when unknown.
    pub async fn get_auth_state(&self, id: &str) -> anyhow::Result<Option<AuthorizationState>> {
        self.get_json(&auth_state_key(id)).await
    }

    /// Save the authorization state id an authorization code refers to.
    pub async fn put_auth_code(&self, code: &str, auth_state: &str) -> anyhow::Result<()> {
        self.store.put(&auth_code_key(code), auth_state.as_bytes().to_vec()).await
    }

    /// Resolve an authorization code to its authorization state id.
    pub async fn get_auth_code(&self, code: &str) -> anyhow::Result<Option<String>> {
        let Some(buf) = self.store.get(&auth_code_key(code)).await? else {
            return Ok(None);
        };
        let auth_state = String::from_utf8(buf).context("authorization code state is not utf-8")?;
        Ok(Some(auth_state))
    }

    /// Remove an authorization code.
    pub async fn purge_auth_code(&self, code: &str) -> anyhow::Result<()> {
        self.store.purge(&auth_code_key(code)).await
    }

    /// Save access token state.
    pub async fn put_access_token(&self, token: &str, state: &AccessToken) -> anyhow::Result<()> {
        self.put_json(&access_token_key(token), state).await
    }

    /// Load access token state. `Ok(None)` when unknown.
    pub async fn get_access_token(&self, token: &str) -> anyhow::Result<Option<AccessToken>> {
        self.get_json(&access_token_key(token)).await
    }

    /// Save the serialized well-known configuration of an issuer session.
    pub async fn put_issuer_config(&self, key: &str, config: Vec<u8>) -> anyhow::Result<()> {
        self.store.put(key, config).await
    }

    /// Load the serialized well-known configuration of an issuer session.
    pub async fn get_issuer_config(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        self.store.get(key).await
    }

    /// Save the credential pending issuance for an issuer session.
    pub async fn put_credential(&self, key: &str, credential: Vec<u8>) -> anyhow::Result<()> {
        self.store.put(&cred_store_key(key), credential).await
    }

    /// Load the credential pending issuance for an issuer session.
    pub async fn get_credential(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        self.store.get(&cred_store_key(key)).await
    }

    /// Save CMS transaction data.
    pub async fn put_txn(&self, txn_id: &str, txn: &TxnData) -> anyhow::Result<()> {
        self.put_json(txn_id, txn).await
    }

    /// Load CMS transaction data. `Ok(None)` when unknown.
    pub async fn get_txn(&self, txn_id: &str) -> anyhow::Result<Option<TxnData>> {
        self.get_json(txn_id).await
    }

    /// Save a CMS search result.
    pub async fn put_search_result(&self, id: &str, result: &SearchResult) -> anyhow::Result<()> {
        self.put_json(id, result).await
    }

    /// Load a CMS search result. `Ok(None)` when unknown.
    pub async fn get_search_result(&self, id: &str) -> anyhow::Result<Option<SearchResult>> {
        self.get_json(id).await
    }

    async fn put_json(&self, key: &str, value: &impl Serialize) -> anyhow::Result<()> {
        let buf = serde_json::to_vec(value).map_err(|e| anyhow!("issue serializing state: {e}"))?;
        self.store.put(key, buf).await
    }

    async fn get_json<T>(&self, key: &str) -> anyhow::Result<Option<T>>
    where
        T: for<'de> Deserialize<'de>,
    {
        let Some(buf) = self.store.get(key).await? else {
            return Ok(None);
        };
        let value = serde_json::from_slice(&buf)
            .map_err(|e| anyhow!("failed to deserialize state for {key}: {e}"))?;
        Ok(Some(value))
    }
}

fn auth_state_key(id: &str) -> String {
    format!("{AUTH_STATE_PREFIX}{id}")
}

fn auth_code_key(code: &str) -> String {
    format!("{AUTH_CODE_PREFIX}{code}")
}

fn access_token_key(token: &str) -> String {
    format!("{ACCESS_TOKEN_PREFIX}{token}")
}

fn cred_store_key(key: &str) -> String {
    format!("{CRED_STORE_PREFIX}{key}")
}
