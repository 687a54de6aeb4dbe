//! # Credential Issuance
//!
//! Issues credentials through the VC service rather than the wallet flow. A
//! credential is assembled from CMS data by [`prepare`](crate::prepare), bound
//! to the holder, and handed to the VC service to be signed under the
//! requested issuer profile.
//!
//! Two entry points differ only in where the subject record comes from:
//!
//! - [`create_credential`] reads it straight from a CMS collection,
//! - [`generate_credential`] reads the result of an earlier
//!   [`search`](crate::search::search).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::instrument;

use crate::prepare::{self, PrepareCredentialRequest};
use crate::provider::{Cms, Issuance, Provider};
use crate::state::Repository;
use crate::{Error, Result};

// Subject record property replacing the credential subject.
const CREDENTIAL_SUBJECT: &str = "vccredentialsubject";

/// Request to issue a credential from a CMS collection.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct CreateCredentialRequest {
    /// CMS collection holding the subject record.
    pub collection: String,

    /// CMS user id owning the record.
    #[serde(rename = "userID")]
    pub user_id: String,

    /// Scope used to type the credential.
    pub scope: String,

    /// VC service issuer profile to issue under.
    pub vcs_profile: String,

    /// The holder's DID, set as the credential subject id.
    pub holder: String,

    /// Extra subject claims, merged into the credential subject.
    pub custom_subject_data: Map<String, Value>,

    /// Access token for the CMS, if it requires one.
    pub token: String,
}

/// Request to issue a credential from a stored search result.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct GenerateCredentialRequest {
    /// Id returned by [`search`](crate::search::search).
    pub id: String,

    /// The holder's DID, set as the credential subject id.
    pub holder: String,

    /// VC service issuer profile to issue under.
    pub vcs_profile: String,
}

/// Issue a credential for a CMS record.
///
/// # Errors
///
/// Returns a `ServerError` when the record cannot be fetched, the credential
/// cannot be assembled, or the VC service fails to issue it.
#[instrument(level = "debug", skip(provider))]
pub async fn create_credential(
    provider: impl Provider, request: &CreateCredentialRequest,
) -> Result<Value> {
    tracing::debug!("create_credential::process");

    let mut subject =
        Cms::subject_data(&provider, &request.collection, &request.user_id, &request.token)
            .await
            .map_err(|e| Error::ServerError(format!("failed to get cms user data : {e}")))?;
    add_subject_data(&mut subject, &request.custom_subject_data);

    let prepare = PrepareCredentialRequest {
        subject,
        scope: request.scope.clone(),
        vcs_profile: request.vcs_profile.clone(),
    };
    issue(&provider, &prepare, &request.holder).await
}

/// Issue a credential for a stored search result.
///
/// # Errors
///
/// Returns `InvalidRequest` for an unknown id, and `ServerError` when the
/// stored result is unreadable, the credential cannot be assembled, or the VC
/// service fails to issue it.
#[instrument(level = "debug", skip(provider))]
pub async fn generate_credential(
    provider: impl Provider, request: &GenerateCredentialRequest,
) -> Result<Value> {
    tracing::debug!("generate_credential::verify");

    let result = match Repository::new(&provider).get_search_result(&request.id).await {
        Ok(Some(result)) => result,
        Ok(None) => {
            return Err(Error::InvalidRequest(format!(
                "failed to get user data using id '{}'",
                request.id
            )));
        }
        Err(e) => return Err(Error::ServerError(format!("failed to unmarshal user data : {e}"))),
    };

    tracing::debug!("generate_credential::process");

    let prepare = PrepareCredentialRequest {
        subject: result.user_data,
        scope: result.scope,
        vcs_profile: request.vcs_profile.clone(),
    };
    issue(&provider, &prepare, &request.holder).await
}

// Merge custom claims into the record's credential subject, creating one when
// the record has none.
fn add_subject_data(subject: &mut Map<String, Value>, custom: &Map<String, Value>) {
    if custom.is_empty() {
        return;
    }
    match subject.get_mut(CREDENTIAL_SUBJECT) {
        Some(Value::Object(existing)) => {
            existing.extend(custom.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        Some(_) => {}
        None => {
            subject.insert(CREDENTIAL_SUBJECT.into(), Value::Object(custom.clone()));
        }
    }
}

async fn issue(
    provider: &impl Provider, request: &PrepareCredentialRequest, holder: &str,
) -> Result<Value> {
    let vc = prepare::prepare_credential(provider.clone(), request)
        .await
        .map_err(|e| Error::ServerError(format!("failed to create credential: {e}")))?;

    let mut credential = serde_json::to_value(&vc)
        .map_err(|e| Error::ServerError(format!("failed to create credential: {e}")))?;
    bind_holder(&mut credential, holder)
        .map_err(|e| Error::ServerError(format!("failed to sign credential: {e}")))?;

    Issuance::issue_credential(provider, &request.vcs_profile, &credential)
        .await
        .map_err(|e| Error::ServerError(format!("failed to sign credential: {e}")))
}

// The holder becomes the id of the (first) credential subject.
fn bind_holder(credential: &mut Value, holder: &str) -> anyhow::Result<()> {
    let subject = credential.get_mut("credentialSubject").and_then(|subject| match subject {
        Value::Array(subjects) => subjects.first_mut(),
        subject => Some(subject),
    });
    match subject {
        Some(Value::Object(subject)) => {
            subject.insert("id".into(), Value::String(holder.into()));
            Ok(())
        }
        _ => Err(anyhow::anyhow!("invalid credential subject")),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use test_utils::issuer::{Provider, CMS_TOKEN, NORMAL_USER, VCS_PROFILE};

    use super::*;
    use crate::search::{self, SearchRequest};
    use crate::state::TxnData;

    const HOLDER: &str = "did:example:holder";

    fn create_request() -> CreateCredentialRequest {
        CreateCredentialRequest {
            collection: "studentcards".into(),
            user_id: NORMAL_USER.into(),
            scope: "StudentCard".into(),
            vcs_profile: VCS_PROFILE.into(),
            holder: HOLDER.into(),
            token: CMS_TOKEN.into(),
            ..CreateCredentialRequest::default()
        }
    }

    #[tokio::test]
    async fn create_from_cms() {
        test_utils::init_tracer();

        let provider = Provider::new();
        let vc = create_credential(provider.clone(), &create_request())
            .await
            .expect("should issue");

        assert_eq!(vc["type"], json!(["VerifiableCredential", "StudentCard"]));
        assert_eq!(vc["credentialSubject"]["id"], json!(HOLDER));
        assert_eq!(vc["credentialSubject"]["studentid"], json!("1234568"));
        assert_eq!(vc["proof"]["type"], json!("Ed25519Signature2018"));
        assert_eq!(provider.issuance.issued(), vec![vc]);
    }

    #[tokio::test]
    async fn custom_subject_data() {
        let provider = Provider::new();
        let request = CreateCredentialRequest {
            custom_subject_data: serde_json::from_value(json!({"degree": "BSc"}))
                .expect("should be a map"),
            ..create_request()
        };
        let vc = create_credential(provider, &request).await.expect("should issue");

        // the custom data replaces the record's own claims
        assert_eq!(vc["credentialSubject"], json!({"degree": "BSc", "id": HOLDER}));
    }

    #[test]
    fn custom_data_merges_into_subject() {
        let mut subject: Map<String, Value> =
            serde_json::from_value(json!({"vccredentialsubject": {"name": "Foo"}}))
                .expect("should be a map");
        let custom: Map<String, Value> =
            serde_json::from_value(json!({"degree": "BSc"})).expect("should be a map");

        add_subject_data(&mut subject, &custom);
        assert_eq!(subject[CREDENTIAL_SUBJECT], json!({"name": "Foo", "degree": "BSc"}));
    }

    #[tokio::test]
    async fn create_without_record() {
        let provider = Provider::new();
        let request = CreateCredentialRequest {
            user_id: "unknown".into(),
            ..create_request()
        };
        let err = create_credential(provider.clone(), &request).await.expect_err("should fail");
        assert!(matches!(err, Error::ServerError(msg) if msg.starts_with("failed to get cms user data")));
        assert!(provider.issuance.issued().is_empty());
    }

    #[tokio::test]
    async fn create_with_unknown_profile() {
        let provider = Provider::new();
        let request = CreateCredentialRequest {
            vcs_profile: "unknown".into(),
            ..create_request()
        };
        let err = create_credential(provider, &request).await.expect_err("should fail");
        assert!(matches!(err, Error::ServerError(msg) if msg.starts_with("failed to create credential")));
    }

    #[tokio::test]
    async fn generate_from_search() {
        test_utils::init_tracer();

        let provider = Provider::new();
        let txn = TxnData {
            user_id: NORMAL_USER.into(),
            scope: "StudentCard".into(),
            token: CMS_TOKEN.into(),
        };
        let saved = search::save_transaction(provider.clone(), &txn).await.expect("should save");
        let found = search::search(provider.clone(), &SearchRequest { txn_id: saved.txn_id })
            .await
            .expect("should search");

        let request = GenerateCredentialRequest {
            id: found.id,
            holder: HOLDER.into(),
            vcs_profile: VCS_PROFILE.into(),
        };
        let vc = generate_credential(provider, &request).await.expect("should issue");

        assert_eq!(vc["credentialSubject"]["id"], json!(HOLDER));
        assert_eq!(vc["credentialSubject"]["name"], json!("Foo Bar"));
        assert!(vc["credentialSubject"].get("userid").is_none());
    }

    #[tokio::test]
    async fn generate_unknown_id() {
        let provider = Provider::new();
        let request = GenerateCredentialRequest {
            id: "unknown".into(),
            holder: HOLDER.into(),
            vcs_profile: VCS_PROFILE.into(),
        };
        let err = generate_credential(provider, &request).await.expect_err("should fail");
        assert_eq!(err, Error::InvalidRequest("failed to get user data using id 'unknown'".into()));
    }

    #[test]
    fn holder_on_first_subject() {
        let mut vc = json!({"credentialSubject": [{"name": "a"}, {"name": "b"}]});
        bind_holder(&mut vc, HOLDER).expect("should bind");
        assert_eq!(vc["credentialSubject"][0]["id"], json!(HOLDER));
        assert!(vc["credentialSubject"][1].get("id").is_none());

        let mut vc = json!({"credentialSubject": "did:example:other"});
        bind_holder(&mut vc, HOLDER).expect_err("should fail");
    }
}
