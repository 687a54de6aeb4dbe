use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use sandbox_core::provider::{InitiateOidcRequest, InitiateOidcResponse};
use uuid::Uuid;

pub const OFFER_URL: &str = "openid-initiate-issuance://?credential_offer_uri=https%3A%2F%2Fvcs.example%2Foffer";
const USER_PIN: &str = "123456";

/// Stands in for the VC service, remembering the last interaction requested.
#[derive(Default, Clone, Debug)]
pub struct InteractionStore {
    last: Arc<Mutex<Option<InitiateOidcRequest>>>,
}

impl InteractionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn initiate(&self, request: &InitiateOidcRequest) -> anyhow::Result<InitiateOidcResponse> {
        *self.last.lock().map_err(|_| anyhow!("store poisoned"))? = Some(request.clone());

        Ok(InitiateOidcResponse {
            offer_credential_url: OFFER_URL.into(),
            tx_id: Uuid::new_v4().to_string(),
            user_pin: request.user_pin_required.then(|| USER_PIN.into()),
        })
    }

    /// The most recent request sent.
    ///
    /// # Panics
    ///
    /// Panics if the store lock is poisoned.
    #[must_use]
    pub fn last_request(&self) -> Option<InitiateOidcRequest> {
        self.last.lock().expect("should lock").clone()
    }
}
