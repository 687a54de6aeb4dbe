//! # CMS Search
//!
//! Bridges the CMS login callback to a later search. The callback saves the
//! logged-in user, scope and CMS token as a transaction; a search then loads the
//! transaction, fetches the subject record for the scope, and stores it under a
//! new id for the page that asked.
//!
//! The login itself happens at the identity provider. [`cms_login`] receives
//! the resolved subject (the user's e-mail) and looks the user up in the CMS.

use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::gen;
use crate::provider::{Cms, Provider};
use crate::state::{Repository, SearchResult, TxnData};
use crate::{Error, Result};

/// A completed identity provider login.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct CmsLoginRequest {
    /// The logged-in subject's e-mail address.
    pub subject: String,

    /// Scope granted at login, e.g. `StudentCard`.
    pub scope: String,

    /// Access token for the CMS.
    pub token: String,
}

/// Response to a saved transaction.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct SaveTransactionResponse {
    /// The transaction id to search with.
    #[serde(rename = "txnID")]
    pub txn_id: String,
}

/// Save transaction data for a later [`search`].
///
/// # Errors
///
/// Returns a `ServerError` when the transaction cannot be saved.
#[instrument(level = "debug", skip(provider))]
pub async fn save_transaction(
    provider: impl Provider, request: &TxnData,
) -> Result<SaveTransactionResponse> {
    tracing::debug!("save_transaction::process");

    let txn_id = gen::transaction_id();
    Repository::new(&provider)
        .put_txn(&txn_id, request)
        .await
        .map_err(|e| Error::ServerError(format!("failed to save txn data: {e}")))?;

    Ok(SaveTransactionResponse { txn_id })
}

/// Look up the logged-in user in the CMS and save a transaction for them.
///
/// # Errors
///
/// Returns `InvalidRequest` when the subject or scope is missing or the CMS has
/// no single matching user, and `ServerError` when the transaction cannot be
/// saved.
#[instrument(level = "debug", skip(provider))]
pub async fn cms_login(
    provider: impl Provider, request: &CmsLoginRequest,
) -> Result<SaveTransactionResponse> {
    tracing::debug!("cms_login::verify");

    if request.subject.is_empty() || request.scope.is_empty() {
        return Err(Error::InvalidRequest("subject and scope are mandatory".into()));
    }

    let query = format!("email={}", urlencoding::encode(&request.subject));
    let user = Cms::user(&provider, &query, &request.token)
        .await
        .map_err(|e| Error::InvalidRequest(format!("failed to get cms data: {e}")))?;

    let txn = TxnData {
        user_id: user.user_id,
        scope: request.scope.clone(),
        token: request.token.clone(),
    };
    save_transaction(provider, &txn).await
}

/// Search request.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct SearchRequest {
    /// Transaction id returned by [`save_transaction`].
    #[serde(rename = "txnID")]
    pub txn_id: String,
}

/// Search response.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct SearchResponse {
    /// Id the [`SearchResult`] is stored under.
    pub id: String,
}

/// Search request handler.
///
/// # Errors
///
/// Returns `InvalidRequest` for a missing or unknown transaction and
/// `ServerError` when the CMS lookup or the save fails.
#[instrument(level = "debug", skip(provider))]
pub async fn search(provider: impl Provider, request: &SearchRequest) -> Result<SearchResponse> {
    tracing::debug!("search::verify");

    if request.txn_id.is_empty() {
        return Err(Error::InvalidRequest("txnID is mandatory".into()));
    }

    let repo = Repository::new(&provider);
    let txn = match repo.get_txn(&request.txn_id).await {
        Ok(Some(txn)) => txn,
        Ok(None) => return Err(Error::InvalidRequest("failed to get txn data".into())),
        Err(e) => return Err(Error::InvalidRequest(format!("unmarshal session data: {e}"))),
    };

    tracing::debug!("search::process");

    // CMS collections are the lower-cased scope, pluralized
    let collection = format!("{}s", txn.scope.to_lowercase());
    let user_data = Cms::subject_data(&provider, &collection, &txn.user_id, &txn.token)
        .await
        .map_err(|e| Error::ServerError(format!("failed to get user data : {e}")))?;

    let id = gen::transaction_id();
    let result = SearchResult {
        scope: txn.scope,
        user_data,
    };
    repo.put_search_result(&id, &result)
        .await
        .map_err(|e| Error::ServerError(format!("failed to save search result : {e}")))?;

    Ok(SearchResponse { id })
}
