//! Postgres [`Database`] implementation.

pub mod client;
pub mod connection;
mod impls;

use deadpool_postgres::Runtime;
use derive_more::{Deref, Display, Error as StdError, From};
use tokio_postgres::{error::SqlState, NoTls};
use tracerr::Traced;

use crate::infra::database;
#[cfg(doc)]
use crate::infra::Database;

pub use refinery::embed_migrations;

pub use self::{
    client::{NonTx, Tx},
    connection::Connection,
};

pub use deadpool_postgres::Config;

/// Postgres [`Database`] client.
#[derive(Clone, Copy, Debug, Deref)]
pub struct Postgres<T = NonTx>(T);

impl Postgres {
    /// Creates a new [`Postgres`] client with the provided [`Config`].
    ///
    /// No connection is established until the first operation.
    ///
    /// # Errors
    ///
    /// If failed to create a new [`connection::Pool`].
    pub fn new(conf: &Config) -> Result<Self, Traced<database::Error>> {
        let pool = conf
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(tracerr::from_and_wrap!(=> Error))
            .map_err(tracerr::map_from)?;
        Ok(Self(NonTx::from_pool(pool)))
    }
}

/// Postgres database [`Error`].
#[derive(Debug, Display, StdError, From)]
pub enum Error {
    /// [`Connection`] error.
    #[display("`Connection` error: {_0}")]
    Connection(connection::Error),

    /// Error of creating a new [`connection::Pool`].
    #[display("Failed to create a new `connection::Pool`: {_0}")]
    PoolCreationError(connection::PoolCreationError),

    /// [`connection::Pool`] error.
    #[display("`connection::Pool` error: {_0}")]
    PoolError(connection::PoolError),

    /// Statement issued on an already committed transaction.
    #[display("Transaction is committed already")]
    Committed,
}

impl Error {
    /// Returns the name of the unique constraint violated by this [`Error`],
    /// if any.
    #[must_use]
    pub fn violated_unique_constraint(&self) -> Option<&str> {
        match self {
            Self::Connection(e)
                if e.code() == Some(&SqlState::UNIQUE_VIOLATION) =>
            {
                e.as_db_error().and_then(|e| e.constraint())
            }
            Self::Connection(_)
            | Self::PoolError(..)
            | Self::PoolCreationError(..)
            | Self::Committed => None,
        }
    }

    /// Checks whether this [`Error`] is a violation of the unique `constraint`
    /// (or of any unique constraint, if [`None`]).
    #[must_use]
    pub fn is_unique_violation(&self, constraint: Option<&str>) -> bool {
        match self {
            Self::Connection(e) => {
                e.code() == Some(&SqlState::UNIQUE_VIOLATION)
                    && constraint.map_or(true, |c| {
                        e.as_db_error().and_then(|e| e.constraint()) == Some(c)
                    })
            }
            Self::PoolError(..)
            | Self::PoolCreationError(..)
            | Self::Committed => false,
        }
    }
}

#[cfg(test)]
mod spec {
    use common::operations::Transact;

    use crate::infra::Database as _;

    use super::{Config, Postgres};

    fn unreachable() -> Postgres {
        let mut conf = Config::new();
        conf.host = Some("127.0.0.1".to_owned());
        conf.port = Some(1);
        conf.user = Some("postgres".to_owned());
        conf.dbname = Some("inventory".to_owned());
        Postgres::new(&conf).unwrap()
    }

    #[tokio::test]
    async fn transaction_reports_unavailable_server() {
        let err = unreachable().execute(Transact).await.unwrap_err();

        assert!(!err.as_ref().is_unique_violation(None));
        assert!(err.to_string().contains("Pool"), "{err}");
    }
}
