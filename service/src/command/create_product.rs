//! [`Command`] for creating a new [`Product`].

use common::{
    operations::{By, Commit, Insert, Select, Transact, Transacted},
    DateTime, Quantity,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{product, product_type, Product, ProductType},
    infra::{database, Database},
    read, Service,
};

use super::Command;

/// [`Command`] for creating a new [`Product`].
///
/// Its current stock equals to the `opening_stock`.
#[derive(Clone, Debug)]
pub struct CreateProduct {
    /// [`product::Name`] of a new [`Product`].
    pub name: product::Name,

    /// [`product::Description`] of a new [`Product`], if any.
    pub description: Option<product::Description>,

    /// ID of the [`ProductType`] a new [`Product`] belongs to.
    pub product_type_id: product_type::Id,

    /// Stock of a new [`Product`].
    pub opening_stock: Quantity,

    /// Stock level at which a new [`Product`] should be reordered.
    pub reorder_level: Quantity,

    /// [`product::MeasurementUnit`] of a new [`Product`].
    pub measurement_unit: product::MeasurementUnit,

    /// [`product::ImagePath`] of a new [`Product`] picture, if any.
    pub image_path: Option<product::ImagePath>,
}

impl CreateProduct {
    /// Name of the storage constraint keeping [`product::Name`]s unique.
    pub const NAME_CONSTRAINT: &'static str = "products_name_key";
}

impl<Db> Command<CreateProduct> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: for<'l> Database<
            Select<By<Option<Product>, &'l product::Name>>,
            Ok = Option<Product>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<ProductType>, product_type::Id>>,
            Ok = Option<ProductType>,
            Err = Traced<database::Error>,
        > + Database<Insert<Product>, Ok = (), Err = Traced<database::Error>>
        + Database<Commit, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = read::Product;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: CreateProduct) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateProduct {
            name,
            description,
            product_type_id,
            opening_stock,
            reorder_level,
            measurement_unit,
            image_path,
        } = cmd;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let existing = tx
            .execute(Select(By::<Option<Product>, _>::new(&name)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if existing.is_some() {
            return Err(tracerr::new!(E::NameOccupied(name)));
        }

        let product_type = tx
            .execute(Select(By::<Option<ProductType>, _>::new(product_type_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::ProductTypeNotExists(product_type_id))
            .map_err(tracerr::wrap!())?;

        let now = DateTime::now();
        let product = Product {
            id: product::Id::new(),
            name,
            description,
            product_type_id,
            opening_stock,
            current_stock: opening_stock,
            reorder_level,
            measurement_unit,
            image_path,
            created_at: now.coerce(),
            updated_at: now.coerce(),
        };

        tx.execute(Insert(product.clone())).await.map_err(|e| {
            if e.as_ref().is_unique_violation(Some(CreateProduct::NAME_CONSTRAINT))
            {
                tracerr::new!(E::NameOccupied(product.name.clone()))
            } else {
                (tracerr::map_from_and_wrap!(=> E))(e)
            }
        })?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tracing::info!(product.id = %product.id, "product created");

        Ok(read::Product {
            product,
            product_type,
        })
    }
}

/// Error of [`CreateProduct`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`product::Name`] is occupied by another [`Product`].
    #[display("`{_0}` product name is occupied")]
    #[from(ignore)]
    NameOccupied(#[error(not(source))] product::Name),

    /// [`ProductType`] with the provided ID doesn't exist.
    #[display("`ProductType(id: {_0})` does not exist")]
    #[from(ignore)]
    ProductTypeNotExists(#[error(not(source))] product_type::Id),
}
