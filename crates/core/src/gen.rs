//! # Generate
//!
//! Generate the opaque correlation ids binding the steps of an issuance flow
//! together: issuer keys, authorization state, authorization codes, access
//! tokens, and transaction ids.

// TODO: access tokens are bearer secrets; move to a CSPRNG-backed token

use uuid::Uuid;

/// Generates the key identifying an issuer session (and its well-known
/// configuration).
#[must_use]
pub fn issuer_key() -> String {
    Uuid::new_v4().to_string()
}

/// Generates the id of a pending authorization request.
#[must_use]
pub fn auth_state() -> String {
    Uuid::new_v4().to_string()
}

/// Generates an authorization code.
#[must_use]
pub fn auth_code() -> String {
    Uuid::new_v4().to_string()
}

/// Generates a mock access token.
#[must_use]
pub fn access_token() -> String {
    Uuid::new_v4().to_string()
}

/// Generates a transaction id for CMS lookups and stored search results.
#[must_use]
pub fn transaction_id() -> String {
    Uuid::new_v4().to_string()
}

/// Generates a credential id suffix.
#[must_use]
pub fn credential_id() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_uuids() {
        let code = auth_code();
        assert!(Uuid::parse_str(&code).is_ok());
        assert_ne!(code, auth_code());
    }
}
