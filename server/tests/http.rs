use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use sandbox_server::config::Config;
use sandbox_server::{router, AppState};
use serde_json::{json, Value};
use test_utils::issuer::{
    Provider, CLIENT_ID, CMS_TOKEN, ISSUER_URL, NORMAL_USER, OFFER_URL, REDIRECT_URI, VCS_PROFILE,
};
use tower::ServiceExt;
use url::Url;

fn app() -> Router {
    test_utils::init_tracer();
    router(AppState::new(Provider::new(), Arc::new(Config::default())))
}

async fn send(app: &Router, req: Request<Body>) -> Response {
    app.clone().oneshot(req).await.expect("should respond")
}

async fn body(resp: Response) -> String {
    let bytes = resp.into_body().collect().await.expect("should read body").to_bytes();
    String::from_utf8(bytes.to_vec()).expect("body is utf-8")
}

fn header_value(resp: &Response, name: header::HeaderName) -> String {
    resp.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string)
        .unwrap_or_default()
}

fn query_param(url: &str, name: &str) -> String {
    Url::parse(url)
        .expect("should parse")
        .query_pairs()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.into_owned())
        .unwrap_or_default()
}

fn form(uri: &str, body: &str) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .expect("should build request")
}

// Initiate issuance, returning the issuer session id.
async fn initiate(app: &Router) -> String {
    let issuance = json!({
        "credentialTypes": "VerifiedEmployee",
        "manifestIDs": "m1",
        "issuerURL": ISSUER_URL,
        "credManifest": [{"id": "m1"}],
        "credential": json!({
            "@context": ["https://www.w3.org/2018/credentials/v1"],
            "type": ["VerifiableCredential", "VerifiedEmployee"],
            "issuer": "did:example:issuer",
            "issuanceDate": "2024-01-01T00:00:00Z",
            "credentialSubject": {"id": "did:example:holder", "givenName": "John"}
        })
        .to_string(),
    });
    let req = Request::post("/oidc/issuance")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(issuance.to_string()))
        .expect("should build request");
    let resp = send(app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let wallet_url = body(resp).await;
    assert!(wallet_url.starts_with(&Config::default().wallet_url));
    assert_eq!(query_param(&wallet_url, "credential_type"), "VerifiedEmployee");
    assert_eq!(query_param(&wallet_url, "manifest_id"), "m1");

    let issuer = query_param(&wallet_url, "issuer");
    issuer.strip_prefix(&format!("{ISSUER_URL}/")).expect("issuer is under issuer URL").to_string()
}

// Authorize and log in, returning the authorization code.
async fn authorize(app: &Router, id: &str) -> String {
    let uri = format!(
        "/{id}/oidc/authorize?claims={}&redirect_uri={}&scope=openid&state=wallet-state&response_type=code&client_id={CLIENT_ID}",
        urlencoding::encode(r#"{"credential_type":"VerifiedEmployee"}"#),
        urlencoding::encode(REDIRECT_URI),
    );
    let resp = send(app, Request::get(uri).body(Body::empty()).expect("should build")).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(header_value(&resp, header::LOCATION), "/oidc/login");

    let set_cookie = header_value(&resp, header::SET_COOKIE);
    assert!(set_cookie.contains("Max-Age=300"));
    assert!(set_cookie.contains("Path=/"));
    let cookie = set_cookie.split(';').next().expect("cookie pair").to_string();

    let req = Request::post("/oidc/authorize-request")
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .expect("should build request");
    let resp = send(app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);

    let location = header_value(&resp, header::LOCATION);
    assert!(location.starts_with(REDIRECT_URI));
    assert_eq!(query_param(&location, "state"), "wallet-state");
    query_param(&location, "code")
}

async fn token(app: &Router, id: &str, code: &str) -> Response {
    let body = format!(
        "grant_type=authorization_code&code={code}&redirect_uri={}",
        urlencoding::encode(REDIRECT_URI)
    );
    send(app, form(&format!("/{id}/oidc/token"), &body)).await
}

#[tokio::test]
async fn issuance_flow() {
    let app = app();
    let id = initiate(&app).await;

    // well-known configuration
    let req = Request::get(format!("/{id}/.well-known/openid-configuration"))
        .body(Body::empty())
        .expect("should build request");
    let resp = send(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(header_value(&resp, header::CONTENT_TYPE), "application/json");
    let config: Value = serde_json::from_str(&body(resp).await).expect("should be json");
    assert_eq!(config["issuer"], json!(format!("{ISSUER_URL}/{id}")));
    assert_eq!(config["credential_endpoint"], json!(format!("{ISSUER_URL}/{id}/oidc/credential")));

    // authorization code
    let code = authorize(&app, &id).await;

    // access token
    let resp = token(&app, &id, &code).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(header_value(&resp, header::CACHE_CONTROL), "no-store");
    assert_eq!(header_value(&resp, header::PRAGMA), "no-cache");
    let token: Value = serde_json::from_str(&body(resp).await).expect("should be json");
    assert_eq!(token["token_type"], json!("Bearer"));
    assert_eq!(token["expires_in"], json!(3600));
    let access_token = token["access_token"].as_str().expect("token is a string").to_string();

    // credential
    let req = Request::post(format!("/{id}/oidc/credential"))
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .header(header::AUTHORIZATION, format!("Bearer {access_token}"))
        .body(Body::from("format=ldp_vc"))
        .expect("should build request");
    let resp = send(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let credential: Value = serde_json::from_str(&body(resp).await).expect("should be json");
    assert_eq!(credential["format"], json!("ldp_vc"));
    assert_eq!(credential["credential"]["proof"]["type"], json!("Ed25519Signature2018"));
    assert_eq!(credential["credential"]["credentialSubject"]["givenName"], json!("John"));
}

#[tokio::test]
async fn credential_for_other_session() {
    let app = app();
    let id = initiate(&app).await;
    let other = initiate(&app).await;

    let code = authorize(&app, &id).await;
    let token: Value =
        serde_json::from_str(&body(token(&app, &id, &code).await).await).expect("should be json");

    let req = Request::post(format!("/{other}/oidc/credential"))
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .header(
            header::AUTHORIZATION,
            format!("Bearer {}", token["access_token"].as_str().expect("token")),
        )
        .body(Body::empty())
        .expect("should build request");
    let resp = send(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert_eq!(body(resp).await, r#"{"error":"invalid transaction"}"#);
}

#[tokio::test]
async fn credential_without_body() {
    let app = app();
    let id = initiate(&app).await;
    let code = authorize(&app, &id).await;
    let token: Value =
        serde_json::from_str(&body(token(&app, &id, &code).await).await).expect("should be json");

    // no content type and no form: format defaults to empty
    let req = Request::post(format!("/{id}/oidc/credential"))
        .header(
            header::AUTHORIZATION,
            format!("Bearer {}", token["access_token"].as_str().expect("token")),
        )
        .body(Body::empty())
        .expect("should build request");
    let resp = send(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(header_value(&resp, header::CACHE_CONTROL), "no-store");
    let credential: Value = serde_json::from_str(&body(resp).await).expect("should be json");
    assert_eq!(credential["format"], json!(""));
    assert_eq!(credential["credential"]["proof"]["type"], json!("Ed25519Signature2018"));
}

#[tokio::test]
async fn bodyless_errors_are_json() {
    let app = app();

    let req = Request::post("/abc/oidc/credential")
        .header(header::AUTHORIZATION, "Bearer unknown")
        .body(Body::empty())
        .expect("should build request");
    let resp = send(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body(resp).await, r#"{"error":"invalid token"}"#);

    let req = Request::post("/abc/oidc/token").body(Body::empty()).expect("should build request");
    let resp = send(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body(resp).await, r#"{"error":"unsupported grant type"}"#);
}

#[tokio::test]
async fn unsupported_grant_type() {
    let app = app();
    let resp = send(&app, form("/abc/oidc/token", "grant_type=password&code=x")).await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body(resp).await, r#"{"error":"unsupported grant type"}"#);
}

#[tokio::test]
async fn authorize_missing_params() {
    let app = app();
    let req = Request::get("/abc/oidc/authorize?scope=openid&client_id=c1")
        .body(Body::empty())
        .expect("should build request");
    let resp = send(&app, req).await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(header_value(&resp, header::SET_COOKIE).is_empty());
    assert_eq!(body(resp).await, "Invalid Request");
}

#[tokio::test]
async fn authorize_request_without_cookie() {
    let app = app();
    let req = Request::post("/oidc/authorize-request").body(Body::empty()).expect("should build");
    let resp = send(&app, req).await;

    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert_eq!(body(resp).await, "invalid state");
}

#[tokio::test]
async fn unknown_well_known() {
    let app = app();
    let req = Request::get("/unknown/.well-known/openid-configuration")
        .body(Body::empty())
        .expect("should build request");
    let resp = send(&app, req).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn malformed_issuance() {
    let app = app();
    let req = Request::post("/oidc/issuance")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{"))
        .expect("should build request");
    let resp = send(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn webhook_events() {
    let app = app();

    let check = || {
        Request::get("/verify/openid4ci/webhook/check?tx=tx-1")
            .body(Body::empty())
            .expect("should build request")
    };

    let resp = send(&app, check()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body(resp).await, "null");

    let event = json!({
        "id": "e1",
        "type": "oidc_interaction_qr_scanned",
        "data": {"txID": "tx-1"}
    });
    let req = Request::post("/verify/openid4ci/webhook")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(event.to_string()))
        .expect("should build request");
    assert_eq!(send(&app, req).await.status(), StatusCode::OK);

    let resp = send(&app, check()).await;
    let received: Value = serde_json::from_str(&body(resp).await).expect("should be json");
    assert_eq!(received["type"], json!("oidc_interaction_qr_scanned"));

    let req = Request::get("/verify/openid4ci/webhook/check")
        .body(Body::empty())
        .expect("should build request");
    assert_eq!(send(&app, req).await.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn pre_authorize_page() {
    let app = app();
    let req = Request::get("/pre-authorize").body(Body::empty()).expect("should build request");
    let resp = send(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let html = body(resp).await;
    assert!(html.contains(OFFER_URL));
    assert!(html.contains("PIN:"));

    let req = Request::get("/pre-authorize?require_pin=false")
        .body(Body::empty())
        .expect("should build request");
    let html = body(send(&app, req).await).await;
    assert!(!html.contains("PIN:"));
}

#[tokio::test]
async fn search_flow() {
    let app = app();

    let login = json!({"subject": "foo@bar.com", "scope": "StudentCard", "token": "cms-token"});
    let req = Request::post("/search/transaction")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(login.to_string()))
        .expect("should build request");
    let resp = send(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let saved: Value = serde_json::from_str(&body(resp).await).expect("should be json");
    let txn_id = saved["txnID"].as_str().expect("txnID is a string");

    let req = Request::get(format!("/search?txnID={txn_id}"))
        .body(Body::empty())
        .expect("should build request");
    let resp = send(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = Request::get("/search").body(Body::empty()).expect("should build request");
    let resp = send(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body(resp).await, "txnID is mandatory");
}

fn json_post(uri: &str, body: &Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("should build request")
}

#[tokio::test]
async fn generate_after_search() {
    let app = app();

    let login = json!({"subject": "foo@bar.com", "scope": "StudentCard", "token": CMS_TOKEN});
    let resp = send(&app, json_post("/search/transaction", &login)).await;
    let saved: Value = serde_json::from_str(&body(resp).await).expect("should be json");
    let txn_id = saved["txnID"].as_str().expect("txnID is a string");

    let req = Request::get(format!("/search?txnID={txn_id}"))
        .body(Body::empty())
        .expect("should build request");
    let found: Value =
        serde_json::from_str(&body(send(&app, req).await).await).expect("should be json");

    let generate =
        json!({"id": found["id"], "holder": "did:example:holder", "vcsProfile": VCS_PROFILE});
    let resp = send(&app, json_post("/credential/generate", &generate)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let vc: Value = serde_json::from_str(&body(resp).await).expect("should be json");
    assert_eq!(vc["credentialSubject"]["id"], json!("did:example:holder"));
    assert_eq!(vc["type"], json!(["VerifiableCredential", "StudentCard"]));

    let unknown =
        json!({"id": "unknown", "holder": "did:example:holder", "vcsProfile": VCS_PROFILE});
    let resp = send(&app, json_post("/credential/generate", &unknown)).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body(resp).await, "failed to get user data using id 'unknown'");
}

#[tokio::test]
async fn create_from_cms() {
    let app = app();

    let create = json!({
        "collection": "studentcards",
        "userID": NORMAL_USER,
        "scope": "StudentCard",
        "vcsProfile": VCS_PROFILE,
        "holder": "did:example:holder",
        "customSubjectData": {"degree": "BSc"},
        "token": CMS_TOKEN,
    });
    let resp = send(&app, json_post("/credential", &create)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let vc: Value = serde_json::from_str(&body(resp).await).expect("should be json");
    assert_eq!(vc["credentialSubject"], json!({"degree": "BSc", "id": "did:example:holder"}));

    let create = json!({"collection": "studentcards", "userID": "unknown", "token": CMS_TOKEN});
    let resp = send(&app, json_post("/credential", &create)).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
