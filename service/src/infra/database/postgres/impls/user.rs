//! [`User`]-related [`Database`] implementations.

use common::operations::{By, Delete, Insert, Lock, Select, Update};
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{user, User},
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
};

/// Columns of the `users` table, in the order [`from_row()`] expects.
const COLUMNS: &str = "\
    id, username, email, password_hash, created_at, updated_at";

/// Reads a [`User`] from the provided [`Row`] selected with [`COLUMNS`].
fn from_row(row: &Row) -> User {
    User {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

impl<C> Database<Select<By<Option<User>, user::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<User>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<User>, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();

        let sql = format!("SELECT {COLUMNS} FROM users WHERE id = $1::UUID");
        Ok(self
            .query_opt(&sql, &[&id])
            .await
            .map_err(tracerr::wrap!())?
            .as_ref()
            .map(from_row))
    }
}

impl<'l, C> Database<Select<By<Option<User>, &'l user::Username>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<User>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<User>, &'l user::Username>>,
    ) -> Result<Self::Ok, Self::Err> {
        let username = by.into_inner();

        let sql = format!(
            "SELECT {COLUMNS} FROM users WHERE username = $1::VARCHAR"
        );
        Ok(self
            .query_opt(&sql, &[&username])
            .await
            .map_err(tracerr::wrap!())?
            .as_ref()
            .map(from_row))
    }
}

impl<'l, C> Database<Select<By<Option<User>, &'l user::Email>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<User>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<User>, &'l user::Email>>,
    ) -> Result<Self::Ok, Self::Err> {
        let email = by.into_inner();

        let sql =
            format!("SELECT {COLUMNS} FROM users WHERE email = $1::VARCHAR");
        Ok(self
            .query_opt(&sql, &[&email])
            .await
            .map_err(tracerr::wrap!())?
            .as_ref()
            .map(from_row))
    }
}

impl<C> Database<Insert<User>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(user): Insert<User>,
    ) -> Result<Self::Ok, Self::Err> {
        let User {
            id,
            username,
            email,
            password_hash,
            created_at,
            updated_at,
        } = user;

        const SQL: &str = "\
            INSERT INTO users (\
                id, username, email, password_hash, created_at, updated_at\
            ) \
            VALUES (\
                $1::UUID, \
                $2::VARCHAR, $3::VARCHAR, $4::VARCHAR, \
                $5::TIMESTAMPTZ, $6::TIMESTAMPTZ\
            )";
        self.exec(
            SQL,
            &[
                &id,
                &username,
                &email,
                &password_hash,
                &created_at,
                &updated_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Update<User>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(user): Update<User>,
    ) -> Result<Self::Ok, Self::Err> {
        let User {
            id,
            username,
            email,
            password_hash,
            created_at: _,
            updated_at,
        } = user;

        const SQL: &str = "\
            UPDATE users \
            SET username = $2::VARCHAR, \
                email = $3::VARCHAR, \
                password_hash = $4::VARCHAR, \
                updated_at = $5::TIMESTAMPTZ \
            WHERE id = $1::UUID";
        self.exec(SQL, &[&id, &username, &email, &password_hash, &updated_at])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C> Database<Delete<By<User, user::Id>>> for Postgres<C>
where
    C: Connection,
{
    /// Whether the [`User`] existed before the deletion.
    type Ok = bool;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<User, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();

        const SQL: &str = "DELETE FROM users WHERE id = $1::UUID";
        self.exec(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(|affected| affected > 0)
    }
}

impl<C> Database<Lock<By<User, user::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<User, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: user::Id = by.into_inner();

        // `DO UPDATE` holds the row lock until the transaction ends.
        const SQL: &str = "\
            INSERT INTO users_lock \
            VALUES ($1::UUID) \
            ON CONFLICT (id) DO UPDATE SET id = EXCLUDED.id";
        self.exec(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}
