//! # Configuration
//!
//! Server settings, read from `ISSUER_*` environment variables (or a `.env`
//! file). Unset variables fall back to defaults suitable for a local demo.

use std::net::SocketAddr;

use anyhow::{anyhow, Result};
use url::Url;

/// Server configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Address to listen on.
    pub listen_addr: String,

    /// Wallet deep link used when an issuance request does not name one.
    pub wallet_url: String,

    /// VC service base URL, used for issuer profile lookups.
    pub vcs_url: String,

    /// Bearer token for the VC service.
    pub vcs_token: String,

    /// CMS base URL.
    pub cms_url: String,

    /// VC service API base URL, used to initiate interactions.
    pub vcs_api_url: String,

    /// Issuer profile interactions are initiated for.
    pub vcs_demo_issuer: String,

    /// Claim endpoint handed to the VC service in the authorization code flow.
    pub claim_data_url: String,

    /// OAuth2 server issuing VC service API access tokens.
    pub token_host: String,

    /// Client id for VC service API access tokens.
    pub client_id: String,

    /// Client secret for VC service API access tokens.
    pub client_secret: String,

    /// Scope requested for VC service API access tokens.
    pub token_scope: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".into(),
            wallet_url: "https://wallet.example/initiate".into(),
            vcs_url: "http://localhost:8070".into(),
            vcs_token: String::new(),
            cms_url: "http://localhost:1337".into(),
            vcs_api_url: "http://localhost:8075".into(),
            vcs_demo_issuer: "demo-issuer".into(),
            claim_data_url: "http://localhost:8080/claim-data".into(),
            token_host: "http://localhost:4444".into(),
            client_id: "demo-client".into(),
            client_secret: String::new(),
            token_scope: "org_admin".into(),
        }
    }
}

impl Config {
    /// Load configuration from the environment, loading `.env` first if
    /// present.
    #[must_use]
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| dotenvy::var(key).ok())
    }

    /// Load configuration using `lookup` to resolve variable names.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let var = |key: &str, default: String| lookup(key).unwrap_or(default);

        Self {
            listen_addr: var("ISSUER_LISTEN_ADDR", defaults.listen_addr),
            wallet_url: var("ISSUER_WALLET_URL", defaults.wallet_url),
            vcs_url: var("ISSUER_VCS_URL", defaults.vcs_url),
            vcs_token: var("ISSUER_VCS_TOKEN", defaults.vcs_token),
            cms_url: var("ISSUER_CMS_URL", defaults.cms_url),
            vcs_api_url: var("ISSUER_VCS_API_URL", defaults.vcs_api_url),
            vcs_demo_issuer: var("ISSUER_VCS_DEMO_ISSUER", defaults.vcs_demo_issuer),
            claim_data_url: var("ISSUER_VCS_CLAIM_DATA_URL", defaults.claim_data_url),
            token_host: var("ISSUER_VCS_TOKEN_HOST", defaults.token_host),
            client_id: var("ISSUER_VCS_CLIENT_ID", defaults.client_id),
            client_secret: var("ISSUER_VCS_CLIENT_SECRET", defaults.client_secret),
            token_scope: var("ISSUER_VCS_TOKEN_SCOPE", defaults.token_scope),
        }
    }

    /// Check the settings the server cannot start without.
    ///
    /// # Errors
    ///
    /// Returns an error when the listen address or the wallet URL is invalid.
    pub fn validate(&self) -> Result<SocketAddr> {
        Url::parse(&self.wallet_url)
            .map_err(|e| anyhow!("invalid wallet URL {}: {e}", self.wallet_url))?;
        self.listen_addr
            .parse()
            .map_err(|e| anyhow!("invalid listen address {}: {e}", self.listen_addr))
    }
}
