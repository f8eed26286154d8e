//! [`ProductType`]-related [`Database`] implementations.

use common::operations::{By, Select};
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{product_type, ProductType},
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
};

/// Reads a [`ProductType`] from the provided [`Row`].
fn from_row(row: &Row) -> ProductType {
    ProductType {
        id: row.get("id"),
        name: row.get("name"),
        description: row.get("description"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

impl<C> Database<Select<By<Option<ProductType>, product_type::Id>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<ProductType>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<ProductType>, product_type::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();

        const SQL: &str = "\
            SELECT id, name, description, created_at, updated_at \
            FROM product_types \
            WHERE id = $1::UUID";
        Ok(self
            .query_opt(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())?
            .as_ref()
            .map(from_row))
    }
}

impl<C> Database<Select<By<Vec<ProductType>, ()>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<ProductType>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Select<By<Vec<ProductType>, ()>>,
    ) -> Result<Self::Ok, Self::Err> {
        const SQL: &str = "\
            SELECT id, name, description, created_at, updated_at \
            FROM product_types \
            ORDER BY name ASC";
        Ok(self
            .query(SQL, &[])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(from_row)
            .collect())
    }
}
