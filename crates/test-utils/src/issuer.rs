use sandbox_core::provider::{
    Cms, InitiateOidcRequest, InitiateOidcResponse, Interactions, Issuance, IssuerProfile, Profiles,
    Result, Signer, StateStore, User,
};
use serde_json::{Map, Value};

pub use crate::store::cms::{CMS_TOKEN, NORMAL_USER};
pub use crate::store::interactions::OFFER_URL;
pub use crate::store::profiles::VCS_PROFILE;
use crate::store::keystore::IssuerKeystore;
use crate::store::{cms, interactions, issuance, profiles, state};

pub const ISSUER_URL: &str = "https://issuer.example";
pub const WALLET_URL: &str = "https://wallet.example/initiate";
pub const CLIENT_ID: &str = "96bfb9cb-0513-7d64-5532-bed74c48f9ab";
pub const REDIRECT_URI: &str = "https://wallet.example/callback";

#[derive(Default, Clone, Debug)]
pub struct Provider {
    pub state: state::Store,
    pub profiles: profiles::ProfileStore,
    pub cms: cms::CmsStore,
    pub interactions: interactions::InteractionStore,
    pub issuance: issuance::IssuanceStore,
}

impl Provider {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: state::Store::new(),
            profiles: profiles::ProfileStore::new(),
            cms: cms::CmsStore::new(),
            interactions: interactions::InteractionStore::new(),
            issuance: issuance::IssuanceStore::new(),
        }
    }
}

impl sandbox_core::provider::Provider for Provider {}

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
        self.profiles.get(name)
    }
}

impl Cms for Provider {
    async fn user(&self, query: &str, token: &str) -> Result<User> {
        self.cms.user(query, token)
    }

    async fn subject_data(
        &self, scope: &str, user_id: &str, token: &str,
    ) -> Result<Map<String, Value>> {
        self.cms.subject_data(scope, user_id, token)
    }
}

impl Interactions for Provider {
    async fn initiate_oidc(&self, request: &InitiateOidcRequest) -> Result<InitiateOidcResponse> {
        self.interactions.initiate(request)
    }
}

impl Issuance for Provider {
    async fn issue_credential(&self, profile: &str, credential: &Value) -> Result<Value> {
        self.issuance.issue(profile, credential)
    }
}
