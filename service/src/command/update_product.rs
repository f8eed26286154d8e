//! [`Command`] for updating a [`Product`].

use common::{
    operations::{By, Commit, Lock, Select, Transact, Transacted, Update},
    DateTime, Quantity,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{product, product_type, Product, ProductType},
    infra::{database, Database},
    read, Service,
};

use super::{create_product::CreateProduct, Command};

/// [`Command`] for updating a [`Product`].
///
/// Only the provided fields are changed. The current stock is never touched.
#[derive(Clone, Debug, Default)]
pub struct UpdateProduct {
    /// ID of the [`Product`] to update.
    pub id: product::Id,

    /// New [`product::Name`] of the [`Product`].
    pub name: Option<product::Name>,

    /// New [`product::Description`] of the [`Product`].
    pub description: Option<product::Description>,

    /// ID of the new [`ProductType`] of the [`Product`].
    pub product_type_id: Option<product_type::Id>,

    /// New opening stock of the [`Product`].
    pub opening_stock: Option<Quantity>,

    /// New reorder level of the [`Product`].
    pub reorder_level: Option<Quantity>,

    /// New [`product::MeasurementUnit`] of the [`Product`].
    pub measurement_unit: Option<product::MeasurementUnit>,

    /// New [`product::ImagePath`] of the [`Product`] picture.
    pub image_path: Option<product::ImagePath>,
}

/// Output of [`UpdateProduct`] [`Command`].
#[derive(Clone, Debug)]
pub struct Output {
    /// Updated [`Product`].
    pub product: read::Product,

    /// [`product::ImagePath`] the [`Product`] had before, if it was replaced.
    pub replaced_image: Option<product::ImagePath>,
}

impl<Db> Command<UpdateProduct> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Lock<By<Product, product::Id>>,
            Ok = (),
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Product>, product::Id>>,
            Ok = Option<Product>,
            Err = Traced<database::Error>,
        > + for<'l> Database<
            Select<By<Option<Product>, &'l product::Name>>,
            Ok = Option<Product>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<ProductType>, product_type::Id>>,
            Ok = Option<ProductType>,
            Err = Traced<database::Error>,
        > + Database<Update<Product>, Ok = (), Err = Traced<database::Error>>
        + Database<Commit, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = Output;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: UpdateProduct) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let UpdateProduct {
            id,
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

        // Avoid concurrent actions upon the same `Product`.
        tx.execute(Lock(By::new(id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let mut product = tx
            .execute(Select(By::<Option<Product>, _>::new(id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::ProductNotExists(id))
            .map_err(tracerr::wrap!())?;

        if let Some(name) = name.filter(|n| *n != product.name) {
            let existing = tx
                .execute(Select(By::<Option<Product>, _>::new(&name)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?;
            if existing.is_some_and(|p| p.id != id) {
                return Err(tracerr::new!(E::NameOccupied(name)));
            }
            product.name = name;
        }

        let type_id = product_type_id.unwrap_or(product.product_type_id);
        let product_type = tx
            .execute(Select(By::<Option<ProductType>, _>::new(type_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::ProductTypeNotExists(type_id))
            .map_err(tracerr::wrap!())?;
        product.product_type_id = type_id;

        if let Some(description) = description {
            product.description = Some(description);
        }
        if let Some(stock) = opening_stock {
            product.opening_stock = stock;
        }
        if let Some(level) = reorder_level {
            product.reorder_level = level;
        }
        if let Some(unit) = measurement_unit {
            product.measurement_unit = unit;
        }
        let replaced_image = image_path
            .and_then(|path| product.image_path.replace(path))
            .filter(|old| Some(old) != product.image_path.as_ref());
        product.updated_at = DateTime::now().coerce();

        tx.execute(Update(product.clone())).await.map_err(|e| {
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

        tracing::info!(product.id = %id, "product updated");

        Ok(Output {
            product: read::Product {
                product,
                product_type,
            },
            replaced_image,
        })
    }
}

/// Error of [`UpdateProduct`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// New [`product::Name`] is occupied by another [`Product`].
    #[display("`{_0}` product name is occupied")]
    #[from(ignore)]
    NameOccupied(#[error(not(source))] product::Name),

    /// [`Product`] with the provided ID doesn't exist.
    #[display("`Product(id: {_0})` does not exist")]
    #[from(ignore)]
    ProductNotExists(#[error(not(source))] product::Id),

    /// [`ProductType`] with the provided ID doesn't exist.
    #[display("`ProductType(id: {_0})` does not exist")]
    #[from(ignore)]
    ProductTypeNotExists(#[error(not(source))] product_type::Id),
}
