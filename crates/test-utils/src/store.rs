//! In-memory stand-ins for the issuer's collaborators.

pub mod cms;
pub mod interactions;
pub mod issuance;
pub mod keystore;
pub mod profiles;
pub mod state;
