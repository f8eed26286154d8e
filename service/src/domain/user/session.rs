//! [`Session`] definitions.

#[cfg(doc)]
use common::DateTime;
use common::{unit, DateTimeOf};
use derive_more::{AsRef, FromStr, Into};
use serde::{Deserialize, Serialize};

#[cfg(doc)]
use crate::domain::User;
use crate::domain::user;

/// Authenticated session of a [`User`], carried as [`Token`] claims.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Session {
    /// ID of the [`User`] this [`Session`] belongs to.
    #[serde(rename = "sub")]
    pub user_id: user::Id,

    /// [`user::Username`] of the [`User`] at the moment of this [`Session`]
    /// issuance.
    pub username: user::Username,

    /// [`DateTime`] when this [`Session`] was issued.
    #[serde(rename = "iat", with = "common::datetime::serde::unix_timestamp")]
    pub issued_at: IssuanceDateTime,

    /// [`DateTime`] when this [`Session`] expires.
    #[serde(rename = "exp", with = "common::datetime::serde::unix_timestamp")]
    pub expires_at: ExpirationDateTime,
}

/// Signed access token of a [`Session`].
#[derive(AsRef, Clone, Debug, Eq, FromStr, Into, PartialEq)]
#[as_ref(str)]
pub struct Token(String);

impl Token {
    /// Creates a new [`Token`] without checking its contents.
    ///
    /// # Safety
    ///
    /// The provided `token` must be a valid [`Token`] representation.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub const unsafe fn new_unchecked(token: String) -> Self {
        Self(token)
    }
}

/// [`DateTime`] of a [`Session`] issuance.
pub type IssuanceDateTime = DateTimeOf<(Session, unit::Issuance)>;

/// [`DateTime`] of a [`Session`] expiration.
pub type ExpirationDateTime = DateTimeOf<(Session, unit::Expiration)>;
