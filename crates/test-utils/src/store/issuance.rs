use std::sync::{Arc, Mutex};

use anyhow::{anyhow, bail};
use serde_json::{json, Value};

use crate::store::profiles::VCS_PROFILE;

/// Stands in for the VC service issuing endpoint. Issued credentials gain a
/// placeholder proof and are remembered.
#[derive(Default, Clone, Debug)]
pub struct IssuanceStore {
    issued: Arc<Mutex<Vec<Value>>>,
}

impl IssuanceStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&self, profile: &str, credential: &Value) -> anyhow::Result<Value> {
        if profile != VCS_PROFILE {
            bail!("profile not found: {profile}");
        }

        let mut issued = credential.clone();
        let Value::Object(map) = &mut issued else {
            bail!("credential is not an object");
        };
        map.insert(
            "proof".into(),
            json!({
                "type": "Ed25519Signature2018",
                "proofPurpose": "assertionMethod",
                "verificationMethod": "did:example:issuer#key-1",
            }),
        );

        self.issued.lock().map_err(|_| anyhow!("store poisoned"))?.push(issued.clone());
        Ok(issued)
    }

    /// Every credential issued so far.
    ///
    /// # Panics
    ///
    /// Panics if the store lock is poisoned.
    #[must_use]
    pub fn issued(&self) -> Vec<Value> {
        self.issued.lock().expect("should lock").clone()
    }
}
