use anyhow::anyhow;
use ed25519_dalek::{Signer, SigningKey};

// base58btc-encoded Ed25519 keypair (secret || public) of the demo issuer
const ISSUER_KEYPAIR: &str =
    "2MP5gWCnf67jvW3E4Lz8PpVrDWAXMYY1sDxjnkEnKhkkbKD7yP2mkVeyVpu5nAtr3TeDgMNjBPirk2XcQacs3dvZ";
const ISSUER_DID: &str = "did:key:z6MknC1wwS6DEYwtGbZZo2QvjQjkh2qSBjb4GYmbye8dv4S5";
const ISSUER_VERIFY_KEY: &str = "z6MknC1wwS6DEYwtGbZZo2QvjQjkh2qSBjb4GYmbye8dv4S5";

#[derive(Default, Clone, Debug)]
pub struct IssuerKeystore;

impl IssuerKeystore {
    #[must_use]
    pub fn verification_method() -> String {
        format!("{ISSUER_DID}#{ISSUER_VERIFY_KEY}")
    }

    pub fn try_sign(msg: &[u8]) -> anyhow::Result<Vec<u8>> {
        let signing_key = signing_key()?;
        Ok(signing_key.sign(msg).to_bytes().to_vec())
    }

    /// The issuer's public key bytes.
    ///
    /// # Panics
    ///
    /// Panics if the embedded keypair is invalid.
    #[must_use]
    pub fn public_key() -> [u8; 32] {
        signing_key().expect("keypair should be valid").verifying_key().to_bytes()
    }
}

fn signing_key() -> anyhow::Result<SigningKey> {
    let (_, decoded) = multibase::decode(format!("z{ISSUER_KEYPAIR}"))
        .map_err(|e| anyhow!("issue decoding key: {e}"))?;
    let keypair: [u8; 64] =
        decoded.try_into().map_err(|_| anyhow!("invalid keypair length"))?;
    SigningKey::from_keypair_bytes(&keypair).map_err(|e| anyhow!("invalid keypair: {e}"))
}
