//! [`Product`]-related [`Database`] implementations.

use common::operations::{By, Delete, Insert, Lock, Select, Update};
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{product, Product, ProductType},
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
    read,
};

/// Columns of the `products` table, in the order [`from_row()`] expects.
const COLUMNS: &str = "\
    p.id, p.name, p.description, p.product_type_id, \
    p.opening_stock, p.current_stock, p.reorder_level, \
    p.measurement_unit, p.image_path, \
    p.created_at, p.updated_at";

/// Columns of the joined `product_types` table, in the order
/// [`read_from_row()`] expects.
const TYPE_COLUMNS: &str = "\
    t.name AS type_name, t.description AS type_description, \
    t.created_at AS type_created_at, t.updated_at AS type_updated_at";

/// Reads a [`Product`] from the provided [`Row`] selected with [`COLUMNS`].
fn from_row(row: &Row) -> Product {
    Product {
        id: row.get("id"),
        name: row.get("name"),
        description: row.get("description"),
        product_type_id: row.get("product_type_id"),
        opening_stock: row.get("opening_stock"),
        current_stock: row.get("current_stock"),
        reorder_level: row.get("reorder_level"),
        measurement_unit: row.get("measurement_unit"),
        image_path: row.get("image_path"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

/// Reads a [`read::Product`] from the provided [`Row`] selected with
/// [`COLUMNS`] and [`TYPE_COLUMNS`].
fn read_from_row(row: &Row) -> read::Product {
    let product = from_row(row);
    read::Product {
        product_type: ProductType {
            id: product.product_type_id,
            name: row.get("type_name"),
            description: row.get("type_description"),
            created_at: row.get("type_created_at"),
            updated_at: row.get("type_updated_at"),
        },
        product,
    }
}

impl<C> Database<Select<By<Option<Product>, product::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Product>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Product>, product::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();

        let sql =
            format!("SELECT {COLUMNS} FROM products p WHERE p.id = $1::UUID");
        Ok(self
            .query_opt(&sql, &[&id])
            .await
            .map_err(tracerr::wrap!())?
            .as_ref()
            .map(from_row))
    }
}

impl<'l, C> Database<Select<By<Option<Product>, &'l product::Name>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Product>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Product>, &'l product::Name>>,
    ) -> Result<Self::Ok, Self::Err> {
        let name = by.into_inner();

        let sql = format!(
            "SELECT {COLUMNS} FROM products p WHERE p.name = $1::VARCHAR"
        );
        Ok(self
            .query_opt(&sql, &[&name])
            .await
            .map_err(tracerr::wrap!())?
            .as_ref()
            .map(from_row))
    }
}

impl<C> Database<Select<By<Option<read::Product>, product::Id>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<read::Product>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<read::Product>, product::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();

        let sql = format!(
            "SELECT {COLUMNS}, {TYPE_COLUMNS} \
             FROM products p \
             JOIN product_types t ON t.id = p.product_type_id \
             WHERE p.id = $1::UUID"
        );
        Ok(self
            .query_opt(&sql, &[&id])
            .await
            .map_err(tracerr::wrap!())?
            .as_ref()
            .map(read_from_row))
    }
}

impl<C>
    Database<
        Select<By<read::product::list::Page, read::product::list::Selector>>,
    > for Postgres<C>
where
    C: Connection,
{
    type Ok = read::product::list::Page;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<read::product::list::Page, read::product::list::Selector>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let read::product::list::Selector {
            arguments,
            filter: read::product::list::Filter { product_type_id },
        } = by.into_inner();

        let limit = i64::from(arguments.limit());
        let offset = i64::try_from(arguments.offset()).unwrap_or(i64::MAX);

        let sql = format!(
            "SELECT {COLUMNS}, {TYPE_COLUMNS} \
             FROM products p \
             JOIN product_types t ON t.id = p.product_type_id \
             WHERE $3::UUID IS NULL OR p.product_type_id = $3::UUID \
             ORDER BY p.created_at DESC, p.id DESC \
             LIMIT $1::INT8 OFFSET $2::INT8"
        );
        let nodes = self
            .query(&sql, &[&limit, &offset, &product_type_id])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(read_from_row)
            .collect::<Vec<_>>();

        const COUNT_SQL: &str = "\
            SELECT COUNT(*) \
            FROM products p \
            WHERE $1::UUID IS NULL OR p.product_type_id = $1::UUID";
        let total_count = self
            .query(COUNT_SQL, &[&product_type_id])
            .await
            .map_err(tracerr::wrap!())?
            .first()
            .map_or(0, |row| row.get::<_, i64>(0));

        Ok(read::product::list::Page::new(
            nodes,
            u64::try_from(total_count).unwrap_or_default(),
        ))
    }
}

impl<C> Database<Insert<Product>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(product): Insert<Product>,
    ) -> Result<Self::Ok, Self::Err> {
        let Product {
            id,
            name,
            description,
            product_type_id,
            opening_stock,
            current_stock,
            reorder_level,
            measurement_unit,
            image_path,
            created_at,
            updated_at,
        } = product;

        const SQL: &str = "\
            INSERT INTO products (\
                id, name, description, product_type_id, \
                opening_stock, current_stock, reorder_level, \
                measurement_unit, image_path, \
                created_at, updated_at\
            ) \
            VALUES (\
                $1::UUID, $2::VARCHAR, $3::TEXT, $4::UUID, \
                $5::NUMERIC, $6::NUMERIC, $7::NUMERIC, \
                $8::INT2, $9::VARCHAR, \
                $10::TIMESTAMPTZ, $11::TIMESTAMPTZ\
            )";
        self.exec(
            SQL,
            &[
                &id,
                &name,
                &description,
                &product_type_id,
                &opening_stock,
                &current_stock,
                &reorder_level,
                &measurement_unit,
                &image_path,
                &created_at,
                &updated_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Update<Product>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(product): Update<Product>,
    ) -> Result<Self::Ok, Self::Err> {
        let Product {
            id,
            name,
            description,
            product_type_id,
            opening_stock,
            current_stock,
            reorder_level,
            measurement_unit,
            image_path,
            created_at: _,
            updated_at,
        } = product;

        const SQL: &str = "\
            UPDATE products \
            SET name = $2::VARCHAR, \
                description = $3::TEXT, \
                product_type_id = $4::UUID, \
                opening_stock = $5::NUMERIC, \
                current_stock = $6::NUMERIC, \
                reorder_level = $7::NUMERIC, \
                measurement_unit = $8::INT2, \
                image_path = $9::VARCHAR, \
                updated_at = $10::TIMESTAMPTZ \
            WHERE id = $1::UUID";
        self.exec(
            SQL,
            &[
                &id,
                &name,
                &description,
                &product_type_id,
                &opening_stock,
                &current_stock,
                &reorder_level,
                &measurement_unit,
                &image_path,
                &updated_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Delete<By<Product, product::Id>>> for Postgres<C>
where
    C: Connection,
{
    /// Whether the [`Product`] existed before the deletion.
    type Ok = bool;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<Product, product::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();

        const SQL: &str = "DELETE FROM products WHERE id = $1::UUID";
        self.exec(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(|affected| affected > 0)
    }
}

impl<C> Database<Lock<By<Product, product::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Product, product::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id: product::Id = by.into_inner();

        const SQL: &str = "\
            INSERT INTO products_lock \
            VALUES ($1::UUID) \
            ON CONFLICT (id) DO UPDATE SET id = EXCLUDED.id";
        self.exec(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}
