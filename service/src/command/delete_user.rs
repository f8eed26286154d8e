//! [`Command`] for deleting a [`User`].

use common::operations::{By, Delete};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{user, User},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for deleting a [`User`].
///
/// [`Session`]s of the deleted [`User`] are not authorized anymore.
///
/// [`Session`]: user::Session
#[derive(Clone, Copy, Debug, From)]
pub struct DeleteUser {
    /// ID of the [`User`] to delete.
    pub user_id: user::Id,
}

impl<Db> Command<DeleteUser> for Service<Db>
where
    Db: Database<
        Delete<By<User, user::Id>>,
        Ok = bool,
        Err = Traced<database::Error>,
    >,
{
    type Ok = ();
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: DeleteUser) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let DeleteUser { user_id } = cmd;

        let existed = self
            .database()
            .execute(Delete(By::new(user_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if !existed {
            return Err(tracerr::new!(E::UserNotExists(user_id)));
        }

        tracing::info!(user.id = %user_id, "user deleted");

        Ok(())
    }
}

/// Error of [`DeleteUser`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`User`] doesn't exist.
    #[display("`User(id: {_0})` does not exist")]
    #[from(ignore)]
    UserNotExists(#[error(not(source))] user::Id),
}
