//! [`Command`] for registering a new [`User`].

use common::{
    operations::{By, Commit, Insert, Select, Transact, Transacted},
    DateTime,
};
use derive_more::{Display, Error, From};
use secrecy::{ExposeSecret as _, SecretBox};
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::user::{Email, Password, Username};
use crate::{
    domain::{user, User},
    infra::{database, Database},
    read, Service,
};

use super::Command;

/// [`Command`] for registering a new [`User`].
#[derive(Debug)]
pub struct CreateUser {
    /// [`Username`] of a new [`User`].
    pub username: user::Username,

    /// [`Email`] of a new [`User`].
    pub email: user::Email,

    /// [`Password`] of a new [`User`].
    pub password: SecretBox<user::Password>,
}

impl CreateUser {
    /// Name of the storage constraint keeping [`Username`]s unique.
    pub const USERNAME_CONSTRAINT: &'static str = "users_username_key";

    /// Name of the storage constraint keeping [`Email`]s unique.
    pub const EMAIL_CONSTRAINT: &'static str = "users_email_key";
}

impl<Db> Command<CreateUser> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: for<'l> Database<
            Select<By<Option<User>, &'l user::Username>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + for<'l> Database<
            Select<By<Option<User>, &'l user::Email>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<Insert<User>, Ok = (), Err = Traced<database::Error>>
        + Database<Commit, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = read::User;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: CreateUser) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateUser {
            username,
            email,
            password,
        } = cmd;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let by_username = tx
            .execute(Select(By::<Option<User>, _>::new(&username)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if by_username.is_some() {
            tracing::debug!(%username, "username is occupied");
            return Err(tracerr::new!(E::DuplicateUser));
        }

        let by_email = tx
            .execute(Select(By::<Option<User>, _>::new(&email)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if by_email.is_some() {
            tracing::debug!(%username, "email is occupied");
            return Err(tracerr::new!(E::DuplicateUser));
        }

        let password_hash = self
            .config()
            .password_hasher
            .hash(password.expose_secret())
            .map_err(tracerr::from_and_wrap!(=> E))?;

        let now = DateTime::now();
        let user = User {
            id: user::Id::new(),
            username,
            email,
            password_hash,
            created_at: now.coerce(),
            updated_at: now.coerce(),
        };

        // Concurrent registrations may pass the checks above, so the storage
        // constraints have the last word.
        tx.execute(Insert(user.clone())).await.map_err(|e| {
            let constraints =
                [CreateUser::USERNAME_CONSTRAINT, CreateUser::EMAIL_CONSTRAINT];
            if constraints
                .into_iter()
                .any(|c| e.as_ref().is_unique_violation(Some(c)))
            {
                tracerr::new!(E::DuplicateUser)
            } else {
                (tracerr::map_from_and_wrap!(=> E))(e)
            }
        })?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tracing::info!(user.id = %user.id, "user registered");

        Ok(user.into())
    }
}

/// Error of [`CreateUser`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Username`] or [`Email`] is occupied by another [`User`].
    #[display("`User` with the same username or email already exists")]
    #[from(ignore)]
    DuplicateUser,

    /// Failed to hash the [`Password`].
    #[display("Failed to hash the password: {_0}")]
    PasswordHashing(bcrypt::BcryptError),
}
