use anyhow::anyhow;
use sandbox_core::provider::IssuerProfile;

pub const VCS_PROFILE: &str = "example-issuer";

#[derive(Default, Clone, Debug)]
pub struct ProfileStore;

impl ProfileStore {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    pub fn get(&self, name: &str) -> anyhow::Result<IssuerProfile> {
        if name != VCS_PROFILE {
            return Err(anyhow!("profile not found: {name}"));
        }
        Ok(IssuerProfile {
            name: "Example Issuer".into(),
            did: "did:example:issuer".into(),
            uri: "https://issuer.example/credentials".into(),
        })
    }
}
