//! [`Command`] for validating [`User`] credentials.

use common::operations::{By, Select};
use derive_more::{Display, Error, From};
use secrecy::{ExposeSecret as _, SecretBox};
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::user::{Password, Username};
use crate::{
    domain::{user, User},
    infra::{database, Database},
    read, Service,
};

use super::Command;

/// [`Command`] for validating [`User`] credentials.
///
/// Resolves into [`None`] if there is no [`User`] with the provided
/// [`Username`], or the provided [`Password`] doesn't match. Both cases take
/// one password hash comparison, so they can't be told apart by timing.
#[derive(Debug)]
pub struct ValidateUserCredentials {
    /// [`Username`] of the [`User`].
    pub username: user::Username,

    /// [`Password`] of the [`User`].
    pub password: SecretBox<user::Password>,
}

impl<Db> Command<ValidateUserCredentials> for Service<Db>
where
    Db: for<'l> Database<
        Select<By<Option<User>, &'l user::Username>>,
        Ok = Option<User>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = Option<read::User>;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: ValidateUserCredentials,
    ) -> Result<Self::Ok, Self::Err> {
        let ValidateUserCredentials { username, password } = cmd;

        let hasher = &self.config().password_hasher;

        let Some(user) = self
            .database()
            .execute(Select(By::new(&username)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> ExecutionError))?
        else {
            _ = hasher.compare_nothing(password.expose_secret());
            tracing::debug!(%username, "user not found");
            return Ok(None);
        };

        if !hasher.compare(password.expose_secret(), &user.password_hash) {
            tracing::debug!(%username, "wrong password");
            return Ok(None);
        }

        Ok(Some(user.into()))
    }
}

/// Error of [`ValidateUserCredentials`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),
}
