//! # Linked Data Proof
//!
//! Embeds an `Ed25519Signature2018` proof in a credential.
//!
//! To create the proof, the credential (without any proof) and the proof
//! options are each canonicalized, hashed with SHA-256, and the concatenation
//! `hash(options) || hash(credential)` is signed. The signature is carried in
//! `proofValue`, base64url encoded without padding.
//!
//! Canonicalization here is JSON with lexicographically sorted object keys and
//! no insignificant whitespace. It is deterministic and sufficient for wallets
//! verifying against the same canonical form, but it is not JSON-LD
//! (URDNA2015) normalization.

use base64ct::{Base64UrlUnpadded, Encoding};
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};

use crate::model::VerifiableCredential;
use crate::provider::Signer;

/// Proof type produced by [`sign`].
pub const PROOF_TYPE: &str = "Ed25519Signature2018";

/// Proof purpose used for issued credentials.
pub const ASSERTION_METHOD: &str = "assertionMethod";

/// An embedded linked data proof.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct Proof {
    /// The proof type, e.g. `Ed25519Signature2018`.
    #[serde(rename = "type")]
    pub type_: String,

    /// When the proof was created.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,

    /// DID URL of the key that verifies the proof.
    pub verification_method: String,

    /// Why the proof was created.
    pub proof_purpose: String,

    /// The signature.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub proof_value: String,
}

/// Sign the credential, appending an `Ed25519Signature2018` proof created now.
pub async fn sign(vc: &mut VerifiableCredential, signer: &impl Signer) -> anyhow::Result<()> {
    let mut proof = Proof {
        type_: PROOF_TYPE.into(),
        created: Some(Utc::now().trunc_subsecs(0)),
        verification_method: signer.verification_method(),
        proof_purpose: ASSERTION_METHOD.into(),
        proof_value: String::new(),
    };

    let msg = signing_input(vc, &proof)?;
    let signature = signer.try_sign(&msg).await?;
    proof.proof_value = Base64UrlUnpadded::encode_string(&signature);

    vc.add_proof(proof);
    Ok(())
}

/// The bytes signed for `proof`: `sha256(options) || sha256(document)`.
///
/// `vc` is hashed without its `proof` property, and `proof` without its
/// `proofValue`, so the same input can be rebuilt by a verifier.
pub fn signing_input(vc: &VerifiableCredential, proof: &Proof) -> anyhow::Result<Vec<u8>> {
    let mut document = serde_json::to_value(vc)?;
    if let Value::Object(map) = &mut document {
        map.remove("proof");
    }

    let mut options = json!({
        "@context": vc.context,
        "type": proof.type_,
        "verificationMethod": proof.verification_method,
        "proofPurpose": proof.proof_purpose,
    });
    if let Some(created) = proof.created {
        options["created"] = Value::String(created.to_rfc3339_opts(SecondsFormat::Secs, true));
    }

    let mut msg = Sha256::digest(canonicalize(&options)?.as_bytes()).to_vec();
    msg.extend_from_slice(&Sha256::digest(canonicalize(&document)?.as_bytes()));
    Ok(msg)
}

// Compact JSON with object keys sorted at every level.
fn canonicalize(value: &Value) -> anyhow::Result<String> {
    Ok(serde_json::to_string(&sorted(value))?)
}

// `Map` only keeps keys sorted while serde_json's `preserve_order` feature is
// off, and any crate in the build can turn it on.
fn sorted(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut out = Map::with_capacity(map.len());
            for key in keys {
                out.insert(key.clone(), sorted(&map[key]));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(sorted).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use assert_let_bind::assert_let;
    use ed25519_dalek::{Signature, Verifier, VerifyingKey};
    use test_utils::issuer::Provider;
    use test_utils::store::keystore::IssuerKeystore;

    use super::*;
    use crate::model::CREDENTIAL_CONTEXT;
    use crate::Quota;

    fn credential() -> VerifiableCredential {
        serde_json::from_value(json!({
            "@context": [CREDENTIAL_CONTEXT],
            "type": ["VerifiableCredential", "VerifiedEmployee"],
            "issuer": "did:example:issuer",
            "credentialSubject": {"givenName": "John", "surname": "Doe"}
        }))
        .expect("should deserialize")
    }

    #[tokio::test]
    async fn signature_verifies() {
        test_utils::init_tracer();

        let provider = Provider::new();
        let mut vc = credential();
        sign(&mut vc, &provider).await.expect("should sign");

        assert_let!(Some(Quota::One(proof)), &vc.proof);
        assert_eq!(proof.type_, PROOF_TYPE);
        assert_eq!(proof.proof_purpose, ASSERTION_METHOD);
        assert_eq!(proof.verification_method, IssuerKeystore::verification_method());

        // rebuild the signing input without the proof and check the signature
        let mut unsigned = vc.clone();
        unsigned.proof = None;
        let msg = signing_input(&unsigned, proof).expect("should build input");

        let sig_bytes = Base64UrlUnpadded::decode_vec(&proof.proof_value).expect("should decode");
        let signature = Signature::from_slice(&sig_bytes).expect("should be a signature");
        let verifying_key =
            VerifyingKey::from_bytes(&IssuerKeystore::public_key()).expect("should be a key");
        verifying_key.verify(&msg, &signature).expect("signature should verify");
    }

    #[test]
    fn key_order_does_not_matter() {
        let a = json!({"b": 1, "a": {"d": [1, {"f": 2, "e": 3}], "c": null}});
        let b = json!({"a": {"c": null, "d": [1, {"e": 3, "f": 2}]}, "b": 1});
        assert_eq!(
            canonicalize(&a).expect("should canonicalize"),
            canonicalize(&b).expect("should canonicalize")
        );
        assert_eq!(
            canonicalize(&a).expect("should canonicalize"),
            r#"{"a":{"c":null,"d":[1,{"e":3,"f":2}]},"b":1}"#
        );
    }
}
