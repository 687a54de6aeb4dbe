//! # Credential Assembly
//!
//! Builds an unsigned credential from a CMS subject record. The record's
//! bookkeeping fields are dropped, the issuer is taken from the VC service
//! profile, and the credential type is derived from the scope the data was
//! fetched for.
//!
//! Two properties of the subject record steer the result:
//!
//! - `vcmetadata`: an object whose `@context` replaces the default contexts
//!   and whose `name` and `description` become the credential's display
//!   fields.
//! - `vccredentialsubject`: an object that replaces the credential subject
//!   wholesale, for records holding the subject as a single JSON blob.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::instrument;

use crate::gen;
use crate::model::{
    Issuer, VerifiableCredential, CITIZENSHIP_CONTEXT, CREDENTIAL_CONTEXT, EXAMPLE_EXT_CONTEXT,
};
use crate::provider::{Profiles, Provider};
use crate::{Error, Kind, Quota, Result};

/// Scope used by the external data source flow.
pub const SUBJECT_DATA_SCOPE: &str = "subject_data";

const PERMANENT_RESIDENT_CARD: &str = "PermanentResidentCard";

// CMS bookkeeping fields never copied into a credential.
const CMS_FIELDS: [&str; 4] = ["created_at", "updated_at", "userid", "vcmetadata"];

/// Request to assemble a credential.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct PrepareCredentialRequest {
    /// The CMS subject record.
    pub subject: Map<String, Value>,

    /// The scope the record was fetched for.
    pub scope: String,

    /// Name of the VC service issuer profile to issue under.
    pub vcs_profile: String,
}

/// Credential assembly handler.
///
/// # Errors
///
/// Returns a `ServerError` when the issuer profile cannot be retrieved.
#[instrument(level = "debug", skip(provider))]
pub async fn prepare_credential(
    provider: impl Provider, request: &PrepareCredentialRequest,
) -> Result<VerifiableCredential> {
    tracing::debug!("prepare::process");

    let mut subject = request.subject.clone();

    // replaced by the holder's DID once known
    subject.insert("id".into(), Value::String(String::new()));

    let mut context = vec![Value::from(CREDENTIAL_CONTEXT), Value::from(EXAMPLE_EXT_CONTEXT)];
    let mut name = None;
    let mut description = None;
    if let Some(Value::Object(metadata)) = subject.get("vcmetadata") {
        if let Some(Value::Array(custom)) = metadata.get("@context") {
            context.clone_from(custom);
        }
        name = metadata.get("name").and_then(Value::as_str).map(ToString::to_string);
        description = metadata.get("description").and_then(Value::as_str).map(ToString::to_string);
    }

    for field in CMS_FIELDS {
        subject.remove(field);
    }

    let profile = Profiles::profile(&provider, &request.vcs_profile).await.map_err(|e| {
        Error::ServerError(format!("retrieve profile - name={} err={e}", request.vcs_profile))
    })?;

    let override_subject = match subject.get("vccredentialsubject") {
        Some(Value::Object(s)) => Some(Value::Object(s.clone())),
        _ => None,
    };

    let (type_, credential_subject) = if request.scope == SUBJECT_DATA_SCOPE {
        context = vec![Value::from(CREDENTIAL_CONTEXT), Value::from(CITIZENSHIP_CONTEXT)];
        name = Some("Permanent Resident Card".into());
        let data = subject.get("subjectData").cloned().unwrap_or_default();
        (vec!["VerifiableCredential".to_string(), PERMANENT_RESIDENT_CARD.to_string()], data)
    } else {
        (vec!["VerifiableCredential".to_string(), request.scope.clone()], Value::Object(subject))
    };

    Ok(VerifiableCredential {
        context,
        id: format!("{}/{}", profile.uri, gen::credential_id()),
        type_: Quota::Many(type_),
        issuer: Some(Kind::Object(Issuer {
            id: profile.did,
            name: Some(profile.name),
        })),
        issuance_date: Some(Utc::now()),
        credential_subject: override_subject.unwrap_or(credential_subject),
        name,
        description,
        ..VerifiableCredential::default()
    })
}
