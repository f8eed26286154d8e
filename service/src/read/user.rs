//! [`User`] read model definition.

#[cfg(doc)]
use common::DateTime;

use crate::domain::{self, user};

/// Public view of a [`domain::User`], safe to be exposed to its owner.
///
/// Never contains a [`user::PasswordHash`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct User {
    /// ID of this [`User`].
    pub id: user::Id,

    /// [`user::Username`] of this [`User`].
    pub username: user::Username,

    /// [`user::Email`] of this [`User`].
    pub email: user::Email,

    /// [`DateTime`] when this [`User`] was created.
    pub created_at: user::CreationDateTime,

    /// [`DateTime`] when this [`User`] was modified last time.
    pub updated_at: user::ModificationDateTime,
}

impl From<domain::User> for User {
    fn from(user: domain::User) -> Self {
        let domain::User {
            id,
            username,
            email,
            password_hash: _,
            created_at,
            updated_at,
        } = user;
        Self {
            id,
            username,
            email,
            created_at,
            updated_at,
        }
    }
}
