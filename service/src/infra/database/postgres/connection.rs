//! Pooled Postgres [`Connection`]s.

use std::{fmt, future::Future};

use futures::{FutureExt as _, TryFutureExt as _};
use ouroboros::self_referencing;
use tokio_postgres::{types::ToSql, Row, ToStatement};
use tracerr::Traced;

use crate::infra::database::{self, postgres};

pub use deadpool_postgres::{
    Client as Pooled, CreatePoolError as PoolCreationError, Pool, PoolError,
};
pub use tokio_postgres::Error;

/// Transaction owning the [`Pooled`] connection it runs on.
///
/// Rolled back on drop, unless committed.
#[self_referencing]
pub struct Tx {
    /// [`Pooled`] connection the transaction runs on.
    conn: Pooled,

    /// Running transaction, or [`None`] once committed.
    #[borrows(mut conn)]
    #[not_covariant]
    tx: Option<deadpool_postgres::Transaction<'this>>,
}

impl fmt::Debug for Tx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tx")
            .field("committed", &self.with_tx(|tx| tx.is_none()))
            .finish_non_exhaustive()
    }
}

impl Tx {
    /// Begins a new [`Tx`] on the provided [`Pooled`] connection.
    ///
    /// # Errors
    ///
    /// If Postgres refuses to start a transaction.
    pub async fn begin(conn: Pooled) -> Result<Self, postgres::Error> {
        Self::try_new_async_send(conn, |c| c.transaction().map_ok(Some).boxed())
            .await
            .map_err(Into::into)
    }

    /// Returns the running transaction of this [`Tx`].
    ///
    /// # Errors
    ///
    /// If this [`Tx`] is committed already.
    pub fn running(
        &self,
    ) -> Result<&deadpool_postgres::Transaction<'_>, postgres::Error> {
        let tx: Option<&deadpool_postgres::Transaction<'_>> =
            self.with_tx(|tx| tx.as_ref());
        tx.ok_or(postgres::Error::Committed)
    }

    /// Commits this [`Tx`].
    ///
    /// # Errors
    ///
    /// If this [`Tx`] is committed already, or Postgres fails to commit it.
    pub async fn commit(&mut self) -> Result<(), postgres::Error> {
        #[expect(
            clippy::redundant_closure_for_method_calls,
            reason = "different variance, see \
                      https://doc.rust-lang.org/nomicon/subtyping.html#variance"
        )]
        let tx = self.with_tx_mut(|tx| tx.take());
        tx.ok_or(postgres::Error::Committed)?
            .commit()
            .await
            .map_err(Into::into)
    }
}

/// Postgres connection able to run statements.
pub trait Connection {
    /// Queries the provided statement with the given parameters and returns the
    /// resulting rows.
    ///
    /// # Errors
    ///
    /// If failed to query the statement.
    fn query<T>(
        &self,
        stmt: &T,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl Future<Output = Result<Vec<Row>, Traced<database::Error>>>
    where
        T: ToStatement + ?Sized;

    /// Queries the provided statement with the given parameters and returns
    /// its first resulting row, if any.
    ///
    /// # Errors
    ///
    /// If failed to query the statement.
    fn query_opt<T>(
        &self,
        stmt: &T,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl Future<Output = Result<Option<Row>, Traced<database::Error>>>
    where
        T: ToStatement + ?Sized,
    {
        self.query(stmt, params)
            .map(|rows| rows.map(|rows| rows.into_iter().next()))
    }

    /// Executes the provided statement with the given parameters and returns
    /// the number of affected rows.
    ///
    /// # Errors
    ///
    /// If failed to execute the statement.
    fn exec<T>(
        &self,
        stmt: &T,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl Future<Output = Result<u64, Traced<database::Error>>>
    where
        T: ToStatement + ?Sized;
}
