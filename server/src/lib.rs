//! # Sandbox Server
//!
//! Serves the sandbox issuer endpoints over HTTP using axum.
//!
//! The `OpenID` endpoints (token and credential) answer with JSON and the
//! compact `{"error": "<message>"}` envelope. Everything else answers with
//! plain text errors.

pub mod config;
pub mod pages;
pub mod provider;

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use sandbox_issuer::authorize::{
    AuthorizationRequest, AuthorizeResponseRequest, LOGIN_PATH, STATE_COOKIE,
    STATE_COOKIE_MAX_AGE,
};
use sandbox_issuer::credential::{CredentialRequest, CredentialResponse};
use sandbox_issuer::events::{CheckRequest, Event, EventsTopic};
use sandbox_issuer::initiate::InitiateIssuanceRequest;
use sandbox_issuer::interaction::{Flow, InteractionRequest};
use sandbox_issuer::issue::{CreateCredentialRequest, GenerateCredentialRequest};
use sandbox_issuer::metadata::WellKnownRequest;
use sandbox_issuer::model::VerifiableCredential;
use sandbox_issuer::prepare::PrepareCredentialRequest;
use sandbox_issuer::provider::Provider;
use sandbox_issuer::search::{
    CmsLoginRequest, SaveTransactionResponse, SearchRequest, SearchResponse,
};
use sandbox_issuer::token::{TokenRequest, TokenResponse};
use sandbox_issuer::Error;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::pages::{AUTHORIZE_REQUEST_PATH, CHECK_PATH};

/// Shared handler state.
#[derive(Clone, Debug)]
pub struct AppState<P> {
    /// Issuer collaborators.
    pub provider: P,

    /// Interaction events awaiting a poll.
    pub events: EventsTopic,

    /// Server configuration.
    pub config: Arc<Config>,
}

impl<P: Provider> AppState<P> {
    /// Create state with an empty event topic.
    pub fn new(provider: P, config: Arc<Config>) -> Self {
        Self {
            provider,
            events: EventsTopic::new(),
            config,
        }
    }
}

/// Build the router for every sandbox endpoint.
pub fn router<P: Provider + 'static>(state: AppState<P>) -> Router {
    let cors = CorsLayer::new().allow_methods(Any).allow_origin(Any).allow_headers(Any);

    Router::new()
        .route("/oidc/issuance", post(initiate::<P>))
        .route("/:id/.well-known/openid-configuration", get(well_known::<P>))
        .route("/:id/oidc/authorize", get(authorize::<P>))
        .route(LOGIN_PATH, get(login))
        .route(AUTHORIZE_REQUEST_PATH, post(authorize_request::<P>))
        .route("/:id/oidc/token", post(token::<P>))
        .route("/:id/oidc/credential", post(credential::<P>))
        .route("/verify/openid4ci/webhook", post(receive_event::<P>))
        .route(CHECK_PATH, get(check_event::<P>))
        .route("/search", get(search::<P>))
        .route("/search/transaction", post(cms_login::<P>))
        .route("/credential", post(create_credential::<P>))
        .route("/credential/generate", post(generate_credential::<P>))
        .route("/credential/prepare", post(prepare::<P>))
        .route("/pre-authorize", get(pre_authorize::<P>))
        .route("/auth-code-flow", get(auth_code_flow::<P>))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// Initiate issuance endpoint
async fn initiate<P: Provider + 'static>(
    State(app): State<AppState<P>>, body: Bytes,
) -> Result<String, TextError> {
    let mut req: InitiateIssuanceRequest = serde_json::from_slice(&body)
        .map_err(|e| Error::InvalidRequest(format!("failed to decode request: {e}")))?;
    if req.wallet_init_issuance_url.is_empty() {
        req.wallet_init_issuance_url.clone_from(&app.config.wallet_url);
    }

    let resp = sandbox_issuer::initiate::initiate_issuance(app.provider, &req).await?;
    Ok(resp.wallet_url)
}

// Well-known configuration endpoint
async fn well_known<P: Provider + 'static>(
    State(app): State<AppState<P>>, Path(id): Path<String>,
) -> Result<Response, TextError> {
    let req = WellKnownRequest { id };
    let resp = sandbox_issuer::metadata::well_known(app.provider, &req).await?;
    Ok(([(header::CONTENT_TYPE, "application/json")], resp.configuration).into_response())
}

/// Authorize endpoint
///
/// Saves the request, hands its id to the browser in the `state` cookie and
/// sends the user to the login page.
async fn authorize<P: Provider + 'static>(
    State(app): State<AppState<P>>, Path(_id): Path<String>, jar: CookieJar,
    Query(req): Query<AuthorizationRequest>,
) -> Result<(CookieJar, Response), TextError> {
    let resp = sandbox_issuer::authorize::authorize(app.provider, &req).await?;

    let cookie = Cookie::parse(format!(
        "{STATE_COOKIE}={}; Path=/; Max-Age={STATE_COOKIE_MAX_AGE}",
        resp.auth_state
    ))
    .map_err(|e| Error::ServerError(format!("failed to set state cookie: {e}")))?;

    Ok((jar.add(cookie), found(&resp.location)))
}

async fn login() -> Html<String> {
    Html(pages::login())
}

// Completes authorization once the user has logged in.
async fn authorize_request<P: Provider + 'static>(
    State(app): State<AppState<P>>, jar: CookieJar,
) -> Result<Response, TextError> {
    let req = AuthorizeResponseRequest {
        auth_state: jar.get(STATE_COOKIE).map(|c| c.value().to_string()),
    };
    let resp = sandbox_issuer::authorize::authorize_response(app.provider, &req).await?;
    Ok(found(&resp.location))
}

/// Token endpoint
/// RFC 6749: https://tools.ietf.org/html/rfc6749#section-5.1
async fn token<P: Provider + 'static>(
    State(app): State<AppState<P>>, Path(id): Path<String>, body: Bytes,
) -> AxResult<TokenResponse> {
    let mut req: TokenRequest = match form(&body) {
        Ok(req) => req,
        Err(e) => return AxResult(Err(e)),
    };
    req.issuer_id = id;
    sandbox_issuer::token::token(app.provider, &req).await.into()
}

// Credential endpoint
async fn credential<P: Provider + 'static>(
    State(app): State<AppState<P>>, Path(id): Path<String>, headers: HeaderMap, body: Bytes,
) -> AxResult<CredentialResponse> {
    let mut req: CredentialRequest = match form(&body) {
        Ok(req) => req,
        Err(e) => return AxResult(Err(e)),
    };
    req.issuer_id = id;
    req.authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string);
    sandbox_issuer::credential::credential(app.provider, &req).await.into()
}

// Form bodies are parsed whatever the content type; an empty body yields the
// request's defaults.
fn form<T: DeserializeOwned>(body: &Bytes) -> sandbox_issuer::Result<T> {
    serde_urlencoded::from_bytes(body)
        .map_err(|e| Error::InvalidRequest(format!("failed to parse form: {e}")))
}

// Webhook the VC service posts interaction events to
async fn receive_event<P: Provider + 'static>(
    State(app): State<AppState<P>>, Json(event): Json<Event>,
) -> Result<StatusCode, TextError> {
    app.events.receive(event)?;
    Ok(StatusCode::OK)
}

async fn check_event<P: Provider + 'static>(
    State(app): State<AppState<P>>, Query(req): Query<CheckRequest>,
) -> Result<Json<Option<Event>>, TextError> {
    Ok(Json(app.events.check(&req)?))
}

async fn search<P: Provider + 'static>(
    State(app): State<AppState<P>>, Query(req): Query<SearchRequest>,
) -> Result<Json<SearchResponse>, TextError> {
    Ok(Json(sandbox_issuer::search::search(app.provider, &req).await?))
}

async fn cms_login<P: Provider + 'static>(
    State(app): State<AppState<P>>, Json(req): Json<CmsLoginRequest>,
) -> Result<Json<SaveTransactionResponse>, TextError> {
    Ok(Json(sandbox_issuer::search::cms_login(app.provider, &req).await?))
}

async fn prepare<P: Provider + 'static>(
    State(app): State<AppState<P>>, Json(req): Json<PrepareCredentialRequest>,
) -> Result<Json<VerifiableCredential>, TextError> {
    Ok(Json(sandbox_issuer::prepare::prepare_credential(app.provider, &req).await?))
}

// Issue a credential for a CMS record through the VC service
async fn create_credential<P: Provider + 'static>(
    State(app): State<AppState<P>>, Json(req): Json<CreateCredentialRequest>,
) -> Result<Json<Value>, TextError> {
    Ok(Json(sandbox_issuer::issue::create_credential(app.provider, &req).await?))
}

// Issue a credential for a search result through the VC service
async fn generate_credential<P: Provider + 'static>(
    State(app): State<AppState<P>>, Json(req): Json<GenerateCredentialRequest>,
) -> Result<Json<Value>, TextError> {
    Ok(Json(sandbox_issuer::issue::generate_credential(app.provider, &req).await?))
}

#[derive(Deserialize)]
struct PreAuthorizeQuery {
    require_pin: Option<bool>,
}

async fn pre_authorize<P: Provider + 'static>(
    State(app): State<AppState<P>>, Query(query): Query<PreAuthorizeQuery>,
) -> Result<Html<String>, TextError> {
    let req = InteractionRequest {
        flow: Flow::PreAuthorized {
            require_pin: query.require_pin.unwrap_or(true),
        },
        issued_by: app.config.client_id.clone(),
    };
    let resp = sandbox_issuer::interaction::initiate_interaction(app.provider, &req).await?;
    Ok(Html(pages::interaction("Pre-Authorized Code Flow", &resp)))
}

async fn auth_code_flow<P: Provider + 'static>(
    State(app): State<AppState<P>>,
) -> Result<Html<String>, TextError> {
    let req = InteractionRequest {
        flow: Flow::AuthorizationCode {
            claim_endpoint: app.config.claim_data_url.clone(),
        },
        issued_by: app.config.client_id.clone(),
    };
    let resp = sandbox_issuer::interaction::initiate_interaction(app.provider, &req).await?;
    Ok(Html(pages::interaction("Authorization Code Flow", &resp)))
}

// 302 Found. `Redirect` only offers 303, 307 and 308.
fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

const fn status(err: &Error) -> StatusCode {
    match err {
        Error::InvalidRequest(_) | Error::UnsupportedGrantType(_) | Error::UnsupportedFormat(_) => {
            StatusCode::BAD_REQUEST
        }
        Error::AccessDenied(_) => StatusCode::FORBIDDEN,
        Error::ServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn log(err: &Error) {
    if err.is_client_error() {
        tracing::warn!("{err}");
    } else {
        tracing::error!("{err}");
    }
}

// ----------------------------------------------------------------------------
// Axum Response
// ----------------------------------------------------------------------------

/// Wrapper for `axum::Response` on the `OpenID` endpoints.
pub struct AxResult<T>(sandbox_issuer::Result<T>);

impl<T> IntoResponse for AxResult<T>
where
    T: Serialize,
{
    fn into_response(self) -> Response {
        let headers = [(header::CACHE_CONTROL, "no-store"), (header::PRAGMA, "no-cache")];
        match self.0 {
            Ok(v) => (StatusCode::OK, headers, Json(json!(v))),
            Err(e) => {
                log(&e);
                (status(&e), headers, Json(e.to_json()))
            }
        }
        .into_response()
    }
}

impl<T> From<sandbox_issuer::Result<T>> for AxResult<T> {
    fn from(val: sandbox_issuer::Result<T>) -> Self {
        Self(val)
    }
}

/// Plain text error response.
pub struct TextError(Error);

impl IntoResponse for TextError {
    fn into_response(self) -> Response {
        log(&self.0);
        (status(&self.0), self.0.to_string()).into_response()
    }
}

impl From<Error> for TextError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}
