//! # Provider
//!
//! Production [`Provider`](sandbox_issuer::provider::Provider): state is held
//! in memory and wallet credentials are signed with the demo key, while issuer
//! profiles, CMS records, interactions and VC service issuance go to the
//! external services named in the [`Config`].

use std::sync::Arc;

use anyhow::{anyhow, bail, Result};
use oauth2::basic::BasicClient;
use oauth2::reqwest::async_http_client;
use oauth2::{AuthType, AuthUrl, ClientId, ClientSecret, Scope, TokenResponse, TokenUrl};
use reqwest::{RequestBuilder, StatusCode};
use sandbox_issuer::provider::{
    Cms, InitiateOidcRequest, InitiateOidcResponse, Interactions, Issuance, IssuerProfile, Profiles,
    Signer, StateStore, User,
};
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use test_utils::store::keystore::IssuerKeystore;
use test_utils::store::state;

use crate::config::Config;

/// Provider backed by the external VC service and CMS.
#[derive(Clone, Debug)]
pub struct Provider {
    /// In-memory issuer state.
    pub state: state::Store,
    config: Arc<Config>,
    http: reqwest::Client,
}

impl Provider {
    /// Create a provider for the services in `config`.
    #[must_use]
    pub fn new(config: Arc<Config>) -> Self {
        Self {
            state: state::Store::new(),
            config,
            http: reqwest::Client::new(),
        }
    }

    // Client-credentials access token for the VC service API.
    async fn api_token(&self) -> Result<String> {
        let token_url = format!("{}/oauth2/token", self.config.token_host);
        let client = BasicClient::new(
            ClientId::new(self.config.client_id.clone()),
            Some(ClientSecret::new(self.config.client_secret.clone())),
            AuthUrl::new(token_url.clone())?,
            Some(TokenUrl::new(token_url)?),
        )
        .set_auth_type(AuthType::BasicAuth);

        let token = client
            .exchange_client_credentials()
            .add_scope(Scope::new(self.config.token_scope.clone()))
            .request_async(async_http_client)
            .await
            .map_err(|e| anyhow!("failed to get token: {e}"))?;
        Ok(token.access_token().secret().clone())
    }
}

impl sandbox_issuer::provider::Provider for Provider {}

impl StateStore for Provider {
    async fn put(&self, key: &str, value: Vec<u8>) -> Result<()> {
        self.state.put(key, value)
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.state.get(key)
    }

    async fn purge(&self, key: &str) -> Result<()> {
        self.state.purge(key)
    }
}

impl Signer for Provider {
    async fn try_sign(&self, msg: &[u8]) -> Result<Vec<u8>> {
        IssuerKeystore::try_sign(msg)
    }

    fn verification_method(&self) -> String {
        IssuerKeystore::verification_method()
    }
}

impl Profiles for Provider {
    async fn profile(&self, name: &str) -> Result<IssuerProfile> {
        let url = format!("{}/profile/{name}", self.config.vcs_url);
        let req = bearer(self.http.get(url), &self.config.vcs_token);
        send(req, StatusCode::OK).await
    }
}

impl Cms for Provider {
    async fn user(&self, query: &str, token: &str) -> Result<User> {
        let url = format!("{}/users?{query}", self.config.cms_url);
        let users: Vec<User> = send(bearer(self.http.get(url), token), StatusCode::OK).await?;
        single(users, "user")
    }

    async fn subject_data(
        &self, scope: &str, user_id: &str, token: &str,
    ) -> Result<Map<String, Value>> {
        let url = format!("{}/{scope}?userid={}", self.config.cms_url, urlencoding::encode(user_id));
        let records: Vec<Map<String, Value>> =
            send(bearer(self.http.get(url), token), StatusCode::OK).await?;
        single(records, "record")
    }
}

impl Interactions for Provider {
    async fn initiate_oidc(&self, request: &InitiateOidcRequest) -> Result<InitiateOidcResponse> {
        let access_token =
            self.api_token().await.map_err(|e| anyhow!("unable to get access token: {e}"))?;

        let url = format!(
            "{}/issuer/profiles/{}/interactions/initiate-oidc",
            self.config.vcs_api_url, self.config.vcs_demo_issuer
        );
        let req = self.http.post(url).bearer_auth(access_token).json(request);
        send(req, StatusCode::OK)
            .await
            .map_err(|e| anyhow!("unable to decode initiate response: {e}"))
    }
}

impl Issuance for Provider {
    async fn issue_credential(&self, profile: &str, credential: &Value) -> Result<Value> {
        let url = format!("{}/{profile}/credentials/issue", self.config.vcs_url);
        let req = bearer(self.http.post(url), &self.config.vcs_token)
            .json(&json!({"credential": credential}));
        send(req, StatusCode::CREATED).await
    }
}

// Services are called without credentials when no token is configured.
fn bearer(req: RequestBuilder, token: &str) -> RequestBuilder {
    if token.is_empty() {
        req
    } else {
        req.bearer_auth(token)
    }
}

// Send the request, expecting `expected` and a JSON body.
async fn send<T: DeserializeOwned>(req: RequestBuilder, expected: StatusCode) -> Result<T> {
    let resp = req.send().await?;
    let status = resp.status();
    if status != expected {
        let body = resp.text().await.unwrap_or_default();
        bail!("{status}: {body}");
    }
    Ok(resp.json().await?)
}

// CMS searches must match exactly one record.
fn single<T>(mut items: Vec<T>, kind: &str) -> Result<T> {
    match items.len() {
        0 => bail!("{kind} not found"),
        1 => Ok(items.remove(0)),
        _ => bail!("multiple {kind}s found"),
    }
}
