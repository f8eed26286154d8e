//! [`Command`] for authorizing a [`User`] by a [`Session`] token.

use common::operations::{By, Select};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{
        user::{self, session, Session},
        User,
    },
    infra::{database, Database},
    read, Service,
};

use super::Command;

/// [`Command`] for authorizing a [`User`] by a [`Session`] token.
///
/// Besides the [`session::Token`] verification, checks that its [`User`]
/// still exists.
#[derive(Clone, Debug, From)]
pub struct AuthorizeUserSession {
    /// [`Session`] token to authorize.
    pub token: session::Token,
}

/// Output of [`AuthorizeUserSession`] [`Command`].
#[derive(Clone, Debug)]
pub struct Output {
    /// Authorized [`Session`].
    pub session: Session,

    /// [`User`] the [`Session`] belongs to.
    pub user: read::User,
}

impl<Db> Command<AuthorizeUserSession> for Service<Db>
where
    Db: Database<
        Select<By<Option<User>, user::Id>>,
        Ok = Option<User>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = Output;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: AuthorizeUserSession,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let AuthorizeUserSession { token } = cmd;

        let session = self
            .config()
            .token_codec
            .verify(&token)
            .map_err(|_| tracerr::new!(E::InvalidSession))?;

        let Some(user) = self
            .database()
            .execute(Select(By::new(session.user_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
        else {
            tracing::debug!(
                user.id = %session.user_id,
                "session of non-existent user"
            );
            return Err(tracerr::new!(E::InvalidSession));
        };

        Ok(Output {
            session,
            user: user.into(),
        })
    }
}

/// Error of [`AuthorizeUserSession`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`session::Token`] is malformed, expired, forged, or belongs to a
    /// [`User`] who doesn't exist anymore.
    #[display("Invalid `Session`")]
    #[from(ignore)]
    InvalidSession,
}
