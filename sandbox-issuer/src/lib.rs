//! A mock issuer for demonstrating the issuance of Verifiable Credentials
//! based on [OpenID for Verifiable Credential Issuance].
//!
//! # [OpenID for Verifiable Credential Issuance]
//!
//! This library plays both the Credential Issuer and a minimal Authorization
//! Server for a demonstration wallet. Wallets obtain an authorization code via
//! an authorize/login round trip, exchange it for an access token, and present
//! the token to receive a signed credential.
//!
//! Security properties of a real deployment (PKCE, nonce replay protection,
//! introspected access tokens) are deliberately left out. Tokens and codes are
//! opaque correlation ids binding the steps of a flow together.
//!
//! # Design
//!
//! **Endpoints**
//!
//! The library is architected around the issuance endpoints, each with its own
//! `XxxRequest` and `XxxResponse` types:
//!
//! - [`initiate`]: start an issuance, returning the wallet deep link.
//! - [`metadata`]: the issuer session's well-known configuration.
//! - [`authorize`]: the authorization request and its post-login response.
//! - [`token`]: exchange an authorization code for an access token.
//! - [`credential`]: deliver the signed credential.
//!
//! Supporting the demo pages are [`prepare`] (assemble a credential from a CMS
//! record), [`issue`] (have the VC service issue it to a holder), [`search`]
//! (CMS transaction bridge), [`interaction`] (start an interaction on the VC
//! service) and [`events`] (relay interaction progress).
//!
//! **State**
//!
//! Every step persists its state through the [`provider::StateStore`] using
//! the typed [`state::Repository`]. Each authorization attempt records the
//! [`state::Stage`] it has reached.
//!
//! **Running**
//!
//! Endpoints are transport-agnostic. The `sandbox-server` crate surfaces them
//! over HTTP using [axum](https://docs.rs/axum/latest/axum/).
//!
//! Implementors supply collaborators (storage, signing, the VC service and
//! the CMS) by implementing the [`provider`] traits.
//!
//! # Example
//!
//! ```rust,ignore
//! // Token endpoint
//! async fn token(
//!     State(provider): State<Provider>, Path(id): Path<String>, Form(mut req): Form<TokenRequest>,
//! ) -> AxResult<TokenResponse> {
//!     req.issuer_id = id;
//!     sandbox_issuer::token::token(provider, &req).await.into()
//! }
//! ```
//!
//! [OpenID for Verifiable Credential Issuance]: (https://openid.net/specs/openid-4-verifiable-credential-issuance-1_0.html)

pub mod authorize;
pub mod credential;
pub mod events;
pub mod initiate;
pub mod interaction;
pub mod issue;
pub mod metadata;
pub mod model;
pub mod prepare;
pub mod proof;
pub mod search;
pub mod state;
pub mod token;

pub use sandbox_core::{gen, provider, Error, Kind, Quota, Result};
