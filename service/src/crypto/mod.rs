//! Cryptographic primitives of the [`Service`].
//!
//! [`Service`]: crate::Service

pub mod password;
pub mod token;

use derive_more::{Display, Error};

pub use self::{password::PasswordHasher, token::TokenCodec};

/// Error of misconfigured cryptographic primitives.
///
/// Such errors are expected to be detected on startup, so the application
/// refuses to start rather than failing on every request.
#[derive(Clone, Copy, Debug, Display, Error, Eq, PartialEq)]
pub enum ConfigError {
    /// [`PasswordHasher`] work factor is out of the supported range.
    #[display(
        "password hashing cost `{_0}` is out of [{}, {}] range",
        PasswordHasher::MIN_COST,
        PasswordHasher::MAX_COST,
    )]
    InvalidCost(#[error(not(source))] u32),

    /// [`TokenCodec`] secret is empty.
    #[display("token signing secret must not be empty")]
    EmptySecret,

    /// [`TokenCodec`] tokens lifetime is zero.
    #[display("token lifetime must not be zero")]
    ZeroTtl,
}
