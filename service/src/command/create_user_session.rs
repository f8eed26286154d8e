//! [`Command`] for creating a [`Session`].

use common::operations::{By, Select};
use derive_more::{Display, Error, From};
use secrecy::SecretBox;
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::user::{session::Token, Password, Username};
use crate::{
    command::{validate_user_credentials, ValidateUserCredentials},
    crypto::token::SignError,
    domain::{
        user::{self, session, Session},
        User,
    },
    infra::{database, Database},
    read, Service,
};

use super::Command;

/// [`Command`] for creating a [`Session`].
#[derive(Debug, From)]
pub enum CreateUserSession {
    /// Create a new [`Session`] by [`User`] credentials.
    ByCredentials {
        /// [`Username`] of a [`User`].
        username: user::Username,

        /// [`Password`] of a [`User`].
        password: SecretBox<user::Password>,
    },

    /// Create a new [`Session`] by [`User`] ID.
    ByUserId(user::Id),
}

/// Output of [`CreateUserSession`] [`Command`].
#[derive(Clone, Debug)]
pub struct Output {
    /// [`Token`] of the created [`Session`].
    pub token: session::Token,

    /// Claims of the created [`Session`].
    pub session: Session,

    /// [`User`] whose [`Session`] has been created.
    pub user: read::User,
}

impl<Db> Command<CreateUserSession> for Service<Db>
where
    Db: Database<
            Select<By<Option<User>, user::Id>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + for<'l> Database<
            Select<By<Option<User>, &'l user::Username>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        >,
{
    type Ok = Output;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: CreateUserSession,
    ) -> Result<Self::Ok, Self::Err> {
        use CreateUserSession as Cmd;
        use ExecutionError as E;

        let user: read::User = match cmd {
            Cmd::ByCredentials { username, password } => self
                .execute(ValidateUserCredentials { username, password })
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?
                .ok_or(E::InvalidCredentials)
                .map_err(tracerr::wrap!())?,
            Cmd::ByUserId(user_id) => self
                .database()
                .execute(Select(By::new(user_id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?
                .ok_or(E::UserNotExists(user_id))
                .map_err(tracerr::wrap!())?
                .into(),
        };

        let (token, session) = self
            .config()
            .token_codec
            .sign(user.id, user.username.clone())
            .map_err(tracerr::from_and_wrap!(=> E))?;

        tracing::debug!(user.id = %user.id, "session created");

        Ok(Output {
            token,
            session,
            user,
        })
    }
}

/// Error of [`CreateUserSession`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`ValidateUserCredentials`] [`Command`] failed.
    #[display("Failed to validate `User` credentials: {_0}")]
    CredentialsValidation(validate_user_credentials::ExecutionError),

    /// [`CreateUserSession::ByCredentials`] contains wrong credentials.
    ///
    /// Never tells whether the [`Username`] or the [`Password`] is wrong.
    #[display("Wrong `User` credentials")]
    #[from(ignore)]
    InvalidCredentials,

    /// [`Token`] cannot be issued.
    #[display("Failed to issue a `Session` token: {_0}")]
    TokenIssuanceFailed(SignError),

    /// [`User`] with the provided ID does not exist.
    #[display("`User(id: {_0})` does not exist")]
    #[from(ignore)]
    UserNotExists(#[error(not(source))] user::Id),
}
