//! [`Tx`] client definitions.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio_postgres::{types::ToSql, Row, ToStatement};
use tracerr::Traced;

use crate::infra::database::{
    self,
    postgres::{self, connection, Connection},
};

use super::NonTx;

/// Transactional Postgres database client.
///
/// Its clones share the same transaction, which is rolled back once the last
/// of them is dropped without a [`Tx::commit()`].
#[derive(Clone, Debug)]
pub struct Tx(Arc<Mutex<connection::Tx>>);

impl Tx {
    /// Begins a new transaction on a connection taken by the provided
    /// [`NonTx`] client.
    ///
    /// # Errors
    ///
    /// If no connection is available, or Postgres refuses to start a
    /// transaction.
    pub async fn begin(client: &NonTx) -> Result<Self, Traced<database::Error>> {
        let conn = client.connection().await.map_err(tracerr::wrap!())?;
        let tx = connection::Tx::begin(conn)
            .await
            .map_err(tracerr::wrap!())
            .map_err(tracerr::map_from)?;
        Ok(Self(Arc::new(Mutex::new(tx))))
    }

    /// Commits the transaction of this [`Tx`] client.
    ///
    /// # Errors
    ///
    /// If the transaction is committed already, or Postgres fails to commit
    /// it.
    pub async fn commit(&self) -> Result<(), Traced<database::Error>> {
        self.0
            .lock()
            .await
            .commit()
            .await
            .map_err(tracerr::wrap!())
            .map_err(tracerr::map_from)
    }
}

impl Connection for Tx {
    async fn query<T>(
        &self,
        stmt: &T,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<Vec<Row>, Traced<database::Error>>
    where
        T: ToStatement + ?Sized,
    {
        let tx = self.0.lock().await;
        tx.running()
            .map_err(tracerr::wrap!())
            .map_err(tracerr::map_from)?
            .query(stmt, params)
            .await
            .map_err(tracerr::from_and_wrap!(=> postgres::Error))
            .map_err(tracerr::map_from)
    }

    async fn exec<T>(
        &self,
        stmt: &T,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<u64, Traced<database::Error>>
    where
        T: ToStatement + ?Sized,
    {
        let tx = self.0.lock().await;
        tx.running()
            .map_err(tracerr::wrap!())
            .map_err(tracerr::map_from)?
            .execute(stmt, params)
            .await
            .map_err(tracerr::from_and_wrap!(=> postgres::Error))
            .map_err(tracerr::map_from)
    }
}
