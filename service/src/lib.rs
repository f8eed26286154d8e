//! Service contains the business logic of the inventory application:
//! registration and authentication of users, and products management.
//!
//! List of available Cargo features:
#![doc = document_features::document_features!()]
#![deny(
    nonstandard_style,
    rust_2018_idioms,
    rustdoc::all,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code
)]
#![forbid(non_ascii_idents)]
#![warn(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    clippy::pedantic,
    clippy::wildcard_enum_match_arm,
    deprecated_in_future,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    unreachable_pub,
    unused_crate_dependencies,
    unused_import_braces,
    unused_labels,
    unused_lifetimes,
    unused_qualifications,
    unused_results
)]

pub mod command;
pub mod crypto;
pub mod domain;
pub mod infra;
pub mod query;
pub mod read;

// Used in tests only.
#[cfg(test)]
use tokio as _;

#[cfg(doc)]
use domain::{user::Session, User};
#[cfg(doc)]
use infra::Database;

pub use self::{command::Command, query::Query};

/// [`Service`] configuration.
///
/// Everything the [`Service`] needs (signing secret, tokens lifetime, hashing
/// work factor) is passed in explicitly through this [`Config`].
#[derive(Clone, Debug)]
pub struct Config {
    /// [`crypto::PasswordHasher`] of [`User`] passwords.
    pub password_hasher: crypto::PasswordHasher,

    /// [`crypto::TokenCodec`] signing and verifying [`Session`] tokens.
    pub token_codec: crypto::TokenCodec,
}

/// Domain service.
#[derive(Clone, Debug)]
pub struct Service<Db> {
    /// Configuration of this [`Service`].
    config: Config,

    /// [`Database`] of this [`Service`].
    database: Db,
}

impl<Db> Service<Db> {
    /// Creates a new [`Service`] with the provided parameters.
    #[must_use]
    pub fn new(config: Config, database: Db) -> Self {
        Self { config, database }
    }

    /// Returns [`Config`] of this [`Service`].
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns [`Database`] of this [`Service`].
    #[must_use]
    pub fn database(&self) -> &Db {
        &self.database
    }
}
