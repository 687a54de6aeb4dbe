//! # Sandbox Core
//!
//! Types shared by the sandbox issuer crates: the error type, the provider
//! traits implementers supply, and a few serde helpers.
//!
//! This crate is not intended to be used directly.

pub mod error;
pub mod gen;
pub mod provider;

pub use crate::error::Error;

/// Result type for the sandbox issuer endpoints.
pub type Result<T, E = Error> = core::result::Result<T, E>;

use serde::{Deserialize, Serialize};

/// `Kind` holds either a bare string or an object, as the W3C data model
/// allows for properties such as `issuer`.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum Kind<T> {
    /// Simple string value
    String(String),

    /// Complex object value
    Object(T),
}

impl<T: Default> Default for Kind<T> {
    fn default() -> Self {
        Self::String(String::new())
    }
}

/// `Quota` holds a single value or a set of values. Serializes to a bare
/// value or an array accordingly.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum Quota<T> {
    /// Single value
    One(T),

    /// Set of values
    Many(Vec<T>),
}

impl<T: Default> Default for Quota<T> {
    fn default() -> Self {
        Self::Many(Vec::new())
    }
}

impl<T: PartialEq> Quota<T> {
    /// Adds a value. A single value is promoted to a set.
    pub fn add(self, item: T) -> Self {
        match self {
            Self::One(one) => Self::Many(vec![one, item]),
            Self::Many(mut many) => {
                many.push(item);
                Self::Many(many)
            }
        }
    }

    /// Returns `true` if the quota holds `item`.
    pub fn contains(&self, item: &T) -> bool {
        match self {
            Self::One(one) => one == item,
            Self::Many(many) => many.contains(item),
        }
    }

    /// Returns the values as a slice-backed iterator.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        match self {
            Self::One(one) => std::slice::from_ref(one).iter(),
            Self::Many(many) => many.iter(),
        }
    }
}

impl<T> From<Vec<T>> for Quota<T> {
    fn from(many: Vec<T>) -> Self {
        Self::Many(many)
    }
}
