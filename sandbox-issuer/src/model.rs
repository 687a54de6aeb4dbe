//! # Verifiable Credential Data Model
//!
//! A pared-down W3C [Verifiable Credentials Data Model v1.1] covering the
//! properties the sandbox issuer reads or writes. Anything else found in a
//! credential is carried through untouched in `extra`.
//!
//! [Verifiable Credentials Data Model v1.1]: (https://www.w3.org/TR/vc-data-model)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::proof::Proof;
use crate::{Kind, Quota};

/// Base context every credential starts with.
pub const CREDENTIAL_CONTEXT: &str = "https://www.w3.org/2018/credentials/v1";

/// Example extension context used by the demo credentials.
pub const EXAMPLE_EXT_CONTEXT: &str =
    "https://trustbloc.github.io/context/vc/examples-ext-v1.jsonld";

/// Citizenship vocabulary used by permanent resident cards.
pub const CITIZENSHIP_CONTEXT: &str = "https://w3id.org/citizenship/v1";

/// `VerifiableCredential` is the credential as assembled by the issuer and
/// delivered to the wallet.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct VerifiableCredential {
    /// JSON-LD contexts. The first item is [`CREDENTIAL_CONTEXT`].
    #[serde(rename = "@context")]
    pub context: Vec<Value>,

    /// The credential's URI.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,

    /// Credential types, starting with `VerifiableCredential`.
    #[serde(rename = "type")]
    pub type_: Quota<String>,

    /// The issuer DID, optionally with a display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuer: Option<Kind<Issuer>>,

    /// When the credential was issued.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuance_date: Option<DateTime<Utc>>,

    /// Claims about the subject.
    #[serde(skip_serializing_if = "Value::is_null")]
    pub credential_subject: Value,

    /// Display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Display description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Embedded proofs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proof: Option<Quota<Proof>>,

    /// Properties not modelled above.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl VerifiableCredential {
    /// Adds a proof, keeping any proofs already present.
    pub fn add_proof(&mut self, proof: Proof) {
        self.proof = Some(match self.proof.take() {
            Some(existing) => existing.add(proof),
            None => Quota::One(proof),
        });
    }
}

/// Issuer identifies the issuer of the credential.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct Issuer {
    /// The issuer DID.
    pub id: String,

    /// The issuer's display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn unknown_properties_survive() {
        let vc: VerifiableCredential = serde_json::from_value(json!({
            "@context": [CREDENTIAL_CONTEXT, {"@vocab": "https://example.com/"}],
            "type": "VerifiableCredential",
            "issuer": "did:example:123",
            "credentialSubject": {"id": "did:example:456"},
            "credentialStatus": {"id": "https://example.com/status/1"}
        }))
        .expect("should deserialize");

        assert_eq!(vc.issuer, Some(Kind::String("did:example:123".into())));
        assert!(vc.extra.contains_key("credentialStatus"));

        let value = serde_json::to_value(&vc).expect("should serialize");
        assert_eq!(value["credentialStatus"], json!({"id": "https://example.com/status/1"}));
        assert_eq!(value["@context"][1], json!({"@vocab": "https://example.com/"}));
        assert!(value.get("proof").is_none());
        assert!(value.get("issuanceDate").is_none());
    }

    #[test]
    fn issuer_with_name() {
        let vc = VerifiableCredential {
            issuer: Some(Kind::Object(Issuer {
                id: "did:example:issuer".into(),
                name: Some("Example Issuer".into()),
            })),
            ..VerifiableCredential::default()
        };
        let value = serde_json::to_value(&vc).expect("should serialize");
        assert_eq!(value["issuer"], json!({"id": "did:example:issuer", "name": "Example Issuer"}));
    }
}
