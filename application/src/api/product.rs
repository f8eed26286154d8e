//! [`Product`] endpoints.

use std::sync::Arc;

use axum::{
    extract::{
        multipart::MultipartRejection,
        rejection::{PathRejection, QueryRejection},
        Multipart, Path, Query,
    },
    Extension, Json,
};
use common::Quantity;
use http::StatusCode;
use serde::{Deserialize, Serialize};
use service::{
    command::{
        self, create_product, delete_product, update_product, Command as _,
    },
    domain::{self, product, product_type},
    query,
    read,
};

use crate::{
    define_error,
    session,
    upload::{Image, Uploads},
    AsError, Error, Service,
};

/// Public view of a [`read::Product`].
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// ID of this [`Product`].
    pub id: product::Id,

    /// Name of this [`Product`].
    pub name: String,

    /// Description of this [`Product`].
    pub description: Option<String>,

    /// ID of the [`ProductType`] of this [`Product`].
    pub product_type_id: product_type::Id,

    /// [`ProductType`] of this [`Product`].
    pub product_type: ProductType,

    /// Stock at the moment of registration.
    pub opening_stock: Quantity,

    /// Current stock.
    pub current_stock: Quantity,

    /// Stock level to reorder at.
    pub reorder_level: Quantity,

    /// Unit the stock is measured in.
    pub measurement_unit: String,

    /// Path of the image, relative to `/uploads/`.
    pub image_path: Option<String>,

    /// When this [`Product`] was created.
    pub created_at: product::CreationDateTime,

    /// When this [`Product`] was modified last time.
    pub updated_at: product::ModificationDateTime,
}

impl From<read::Product> for Product {
    fn from(product: read::Product) -> Self {
        let read::Product {
            product,
            product_type,
        } = product;
        let domain::Product {
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

        Self {
            id,
            name: name.to_string(),
            description: description.map(|d| d.to_string()),
            product_type_id,
            product_type: product_type.into(),
            opening_stock,
            current_stock,
            reorder_level,
            measurement_unit: measurement_unit.to_string(),
            image_path: image_path.map(|p| p.to_string()),
            created_at,
            updated_at,
        }
    }
}

/// Public view of a [`domain::ProductType`].
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductType {
    /// ID of this [`ProductType`].
    pub id: product_type::Id,

    /// Name of this [`ProductType`].
    pub name: String,

    /// Description of this [`ProductType`].
    pub description: Option<String>,

    /// When this [`ProductType`] was created.
    pub created_at: product_type::CreationDateTime,

    /// When this [`ProductType`] was modified last time.
    pub updated_at: product_type::ModificationDateTime,
}

impl From<domain::ProductType> for ProductType {
    fn from(product_type: domain::ProductType) -> Self {
        let domain::ProductType {
            id,
            name,
            description,
            created_at,
            updated_at,
        } = product_type;
        Self {
            id,
            name: name.to_string(),
            description: description.map(|d| d.to_string()),
            created_at,
            updated_at,
        }
    }
}

/// Query parameters of a [`Product`]s list.
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    /// Number of the page, starting from `1`.
    pub page: Option<u32>,

    /// Maximum number of [`Product`]s on the page.
    pub limit: Option<u32>,

    /// ID of the [`ProductType`] to list [`Product`]s of only.
    pub product_type_id: Option<product_type::Id>,
}

/// A page of [`Product`]s.
#[derive(Clone, Debug, Serialize)]
pub struct List {
    /// [`Product`]s on the page.
    pub data: Vec<Product>,

    /// Total number of [`Product`]s.
    pub count: u64,
}

/// Lists [`Product`]s, newest first.
///
/// # Errors
///
/// If the pagination parameters are invalid.
#[tracing::instrument(skip_all)]
pub async fn list(
    _: session::Current,
    Extension(service): Extension<Service>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<List>, Error> {
    let Query(ListParams {
        page,
        limit,
        product_type_id,
    }) = params.map_err(|e| e.as_error())?;

    let arguments = read::product::list::Arguments::new(page, limit)
        .ok_or(ValidationError::Pagination)?;

    let page = service
        .execute(query::products::List::by(read::product::list::Selector {
            arguments,
            filter: read::product::list::Filter { product_type_id },
        }))
        .await
        .map_err(AsError::into_error)?;

    Ok(Json(List {
        count: page.total_count,
        data: page.nodes.into_iter().map(Into::into).collect(),
    }))
}

/// Returns a single [`Product`].
///
/// # Errors
///
/// If the [`Product`] doesn't exist.
#[tracing::instrument(skip_all)]
pub async fn get(
    _: session::Current,
    Extension(service): Extension<Service>,
    id: Result<Path<product::Id>, PathRejection>,
) -> Result<Json<Product>, Error> {
    let Path(id) = id.map_err(|e| e.as_error())?;

    let product = service
        .execute(query::product::ById::by(id))
        .await
        .map_err(AsError::into_error)?
        .ok_or(ProductError::NotExists)?;

    Ok(Json(product.into()))
}

/// Lists all the [`ProductType`]s, ordered by name.
///
/// # Errors
///
/// If the [`ProductType`]s cannot be loaded.
#[tracing::instrument(skip_all)]
pub async fn types(
    _: session::Current,
    Extension(service): Extension<Service>,
) -> Result<Json<Vec<ProductType>>, Error> {
    let types = service
        .execute(query::product_types::All::by(()))
        .await
        .map_err(AsError::into_error)?;

    Ok(Json(types.into_iter().map(Into::into).collect()))
}

/// Registers a new [`Product`].
///
/// # Errors
///
/// If the form is invalid, the name is occupied, or the [`ProductType`]
/// doesn't exist.
#[tracing::instrument(skip_all)]
pub async fn create(
    _: session::Current,
    Extension(service): Extension<Service>,
    Extension(uploads): Extension<Arc<Uploads>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<Product>), Error> {
    let form = Form::read(multipart.map_err(|e| e.as_error())?, &uploads)
        .await?;

    let mut cmd = form.creation()?;

    let image_path = match &form.image {
        Some(image) => Some(uploads.store(image).await?),
        None => None,
    };

    cmd.image_path.clone_from(&image_path);

    let result = service.execute(cmd).await;
    let product = match result {
        Ok(product) => product,
        Err(e) => {
            if let Some(path) = &image_path {
                uploads.remove(path).await;
            }
            return Err(e.into_error());
        }
    };

    Ok((StatusCode::CREATED, Json(product.into())))
}

/// Updates an existing [`Product`].
///
/// Omitted fields stay unchanged.
///
/// # Errors
///
/// If the form is invalid, the [`Product`] or [`ProductType`] doesn't exist,
/// or the new name is occupied.
#[tracing::instrument(skip_all)]
pub async fn update(
    _: session::Current,
    Extension(service): Extension<Service>,
    Extension(uploads): Extension<Arc<Uploads>>,
    id: Result<Path<product::Id>, PathRejection>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Product>, Error> {
    let Path(id) = id.map_err(|e| e.as_error())?;
    let form = Form::read(multipart.map_err(|e| e.as_error())?, &uploads)
        .await?;

    let mut cmd = command::UpdateProduct {
        id,
        name: form.name()?,
        description: form.description()?,
        product_type_id: form.product_type_id()?,
        opening_stock: form.opening_stock()?,
        reorder_level: form.reorder_level()?,
        measurement_unit: form.measurement_unit()?,
        image_path: None,
    };

    let image_path = match &form.image {
        Some(image) => Some(uploads.store(image).await?),
        None => None,
    };

    cmd.image_path.clone_from(&image_path);

    let result = service.execute(cmd).await;
    let update_product::Output {
        product,
        replaced_image,
    } = match result {
        Ok(out) => out,
        Err(e) => {
            if let Some(path) = &image_path {
                uploads.remove(path).await;
            }
            return Err(e.into_error());
        }
    };
    if let Some(path) = &replaced_image {
        uploads.remove(path).await;
    }

    Ok(Json(product.into()))
}

/// Deletes a [`Product`] along with its image.
///
/// # Errors
///
/// If the [`Product`] doesn't exist.
#[tracing::instrument(skip_all)]
pub async fn delete(
    _: session::Current,
    Extension(service): Extension<Service>,
    Extension(uploads): Extension<Arc<Uploads>>,
    id: Result<Path<product::Id>, PathRejection>,
) -> Result<StatusCode, Error> {
    let Path(id) = id.map_err(|e| e.as_error())?;

    let product = service
        .execute(command::DeleteProduct { id })
        .await
        .map_err(AsError::into_error)?;
    if let Some(path) = &product.image_path {
        uploads.remove(path).await;
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Raw multipart form of a [`Product`].
///
/// Empty text fields are considered absent.
#[derive(Clone, Debug, Default)]
struct Form {
    name: Option<String>,
    description: Option<String>,
    product_type_id: Option<String>,
    opening_stock: Option<String>,
    reorder_level: Option<String>,
    measurement_unit: Option<String>,
    image: Option<Image>,
}

impl Form {
    /// Reads a [`Form`] out of the provided [`Multipart`].
    async fn read(
        mut multipart: Multipart,
        uploads: &Uploads,
    ) -> Result<Self, Error> {
        let mut form = Self::default();

        while let Some(field) =
            multipart.next_field().await.map_err(|e| e.as_error())?
        {
            let Some(name) = field.name().map(ToOwned::to_owned) else {
                continue;
            };

            if name == "image" {
                // Browsers send an empty part for an untouched file input.
                if field.file_name().map_or(true, str::is_empty) {
                    continue;
                }
                form.image = Some(uploads.read(field).await?);
                continue;
            }

            let value = field.text().await.map_err(|e| e.as_error())?;
            let value = Some(value.trim().to_owned()).filter(|v| !v.is_empty());
            match name.as_str() {
                "name" => form.name = value,
                "description" => form.description = value,
                "productTypeId" => form.product_type_id = value,
                "openingStock" => form.opening_stock = value,
                "reorderLevel" => form.reorder_level = value,
                "measurementUnit" => form.measurement_unit = value,
                _ => tracing::debug!(field = %name, "unknown field skipped"),
            }
        }

        Ok(form)
    }

    fn name(&self) -> Result<Option<product::Name>, ValidationError> {
        self.name
            .as_deref()
            .map(|v| product::Name::new(v).ok_or(ValidationError::Name))
            .transpose()
    }

    fn description(
        &self,
    ) -> Result<Option<product::Description>, ValidationError> {
        self.description
            .as_deref()
            .map(|v| {
                product::Description::new(v)
                    .ok_or(ValidationError::Description)
            })
            .transpose()
    }

    fn product_type_id(
        &self,
    ) -> Result<Option<product_type::Id>, ValidationError> {
        self.product_type_id
            .as_deref()
            .map(|v| v.parse().map_err(|_| ValidationError::ProductTypeId))
            .transpose()
    }

    /// Forms a [`command::CreateProduct`] without an image out of this
    /// [`Form`], requiring all the fields except the description.
    fn creation(&self) -> Result<command::CreateProduct, ValidationError> {
        Ok(command::CreateProduct {
            name: self.name()?.ok_or(ValidationError::NameRequired)?,
            description: self.description()?,
            product_type_id: self
                .product_type_id()?
                .ok_or(ValidationError::ProductTypeRequired)?,
            opening_stock: self
                .opening_stock()?
                .ok_or(ValidationError::OpeningStockRequired)?,
            reorder_level: self
                .reorder_level()?
                .ok_or(ValidationError::ReorderLevelRequired)?,
            measurement_unit: self
                .measurement_unit()?
                .ok_or(ValidationError::MeasurementUnitRequired)?,
            image_path: None,
        })
    }

    fn opening_stock(&self) -> Result<Option<Quantity>, ValidationError> {
        quantity(self.opening_stock.as_deref())
    }

    fn reorder_level(&self) -> Result<Option<Quantity>, ValidationError> {
        quantity(self.reorder_level.as_deref())
    }

    fn measurement_unit(
        &self,
    ) -> Result<Option<product::MeasurementUnit>, ValidationError> {
        self.measurement_unit
            .as_deref()
            .map(|v| {
                v.to_ascii_lowercase()
                    .parse()
                    .map_err(|_| ValidationError::MeasurementUnit)
            })
            .transpose()
    }
}

/// Parses an optional stock [`Quantity`].
fn quantity(value: Option<&str>) -> Result<Option<Quantity>, ValidationError> {
    value
        .map(|v| v.parse().map_err(|_| ValidationError::Quantity))
        .transpose()
}

impl AsError for create_product::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::NameOccupied(_) => Some(ProductError::NameOccupied.into()),
            Self::ProductTypeNotExists(_) => {
                Some(ProductError::TypeNotExists.into())
            }
        }
    }
}

impl AsError for update_product::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::NameOccupied(_) => Some(ProductError::NameOccupied.into()),
            Self::ProductNotExists(_) => Some(ProductError::NotExists.into()),
            Self::ProductTypeNotExists(_) => {
                Some(ProductError::TypeNotExists.into())
            }
        }
    }
}

impl AsError for delete_product::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::ProductNotExists(_) => Some(ProductError::NotExists.into()),
        }
    }
}

define_error! {
    enum ProductError {
        #[code = "PRODUCT_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "Product does not exist"]
        NotExists,

        #[code = "PRODUCT_NAME_OCCUPIED"]
        #[status = CONFLICT]
        #[message = "Product with the same name already exists"]
        NameOccupied,

        #[code = "PRODUCT_TYPE_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "Product type does not exist"]
        TypeNotExists,
    }
}

define_error! {
    enum ValidationError {
        #[code = "INVALID_PAGINATION"]
        #[status = BAD_REQUEST]
        #[message = "`page` must be positive and `limit` between 1 and 100"]
        Pagination,

        #[code = "PRODUCT_NAME_REQUIRED"]
        #[status = BAD_REQUEST]
        #[message = "Product name is required"]
        NameRequired,

        #[code = "INVALID_PRODUCT_NAME"]
        #[status = BAD_REQUEST]
        #[message = "Product name must be at most 255 bytes long"]
        Name,

        #[code = "INVALID_PRODUCT_DESCRIPTION"]
        #[status = BAD_REQUEST]
        #[message = "Product description must be at most 4096 bytes long"]
        Description,

        #[code = "PRODUCT_TYPE_REQUIRED"]
        #[status = BAD_REQUEST]
        #[message = "Product type is required"]
        ProductTypeRequired,

        #[code = "INVALID_PRODUCT_TYPE_ID"]
        #[status = BAD_REQUEST]
        #[message = "Product type ID must be a UUID"]
        ProductTypeId,

        #[code = "OPENING_STOCK_REQUIRED"]
        #[status = BAD_REQUEST]
        #[message = "Opening stock is required"]
        OpeningStockRequired,

        #[code = "REORDER_LEVEL_REQUIRED"]
        #[status = BAD_REQUEST]
        #[message = "Reorder level is required"]
        ReorderLevelRequired,

        #[code = "MEASUREMENT_UNIT_REQUIRED"]
        #[status = BAD_REQUEST]
        #[message = "Measurement unit is required"]
        MeasurementUnitRequired,

        #[code = "INVALID_QUANTITY"]
        #[status = BAD_REQUEST]
        #[message = "Stock quantities must be non-negative decimal numbers"]
        Quantity,

        #[code = "INVALID_MEASUREMENT_UNIT"]
        #[status = BAD_REQUEST]
        #[message = "Measurement unit must be one of: kg, g, l, ml, piece, box, pack"]
        MeasurementUnit,
    }
}

#[cfg(test)]
mod spec {
    use service::domain::product::MeasurementUnit;

    use super::{Form, ValidationError};

    fn form() -> Form {
        Form {
            name: Some("Milk".to_owned()),
            description: None,
            product_type_id: Some(
                "6f1c2a1e-0b1d-4b7e-9a51-1d7d1a7b0001".to_owned(),
            ),
            opening_stock: Some("12.5".to_owned()),
            reorder_level: None,
            measurement_unit: Some("L".to_owned()),
            image: None,
        }
    }

    #[test]
    fn parses_fields() {
        let form = form();

        assert_eq!(form.name().unwrap().unwrap().to_string(), "Milk");
        assert!(form.description().unwrap().is_none());
        assert!(form.product_type_id().unwrap().is_some());
        assert_eq!(form.opening_stock().unwrap().unwrap().to_string(), "12.50");
        assert!(form.reorder_level().unwrap().is_none());
        assert_eq!(form.measurement_unit().unwrap(), Some(MeasurementUnit::L));
    }

    #[test]
    fn rejects_invalid_fields() {
        let invalid = Form {
            name: Some("x".repeat(256)),
            product_type_id: Some("not-a-uuid".to_owned()),
            opening_stock: Some("-1".to_owned()),
            measurement_unit: Some("ton".to_owned()),
            ..form()
        };

        assert_eq!(invalid.name().unwrap_err(), ValidationError::Name);
        assert_eq!(
            invalid.product_type_id().unwrap_err(),
            ValidationError::ProductTypeId,
        );
        assert_eq!(
            invalid.opening_stock().unwrap_err(),
            ValidationError::Quantity,
        );
        assert_eq!(
            invalid.measurement_unit().unwrap_err(),
            ValidationError::MeasurementUnit,
        );
    }

    #[test]
    fn creation_requires_stock_fields() {
        let complete = Form {
            reorder_level: Some("2".to_owned()),
            ..form()
        };
        let cmd = complete.creation().unwrap();
        assert_eq!(cmd.opening_stock.to_string(), "12.50");
        assert_eq!(cmd.reorder_level.to_string(), "2.00");
        assert_eq!(cmd.measurement_unit, MeasurementUnit::L);
        assert!(cmd.description.is_none());
        assert!(cmd.image_path.is_none());

        for (form, err) in [
            (
                Form {
                    name: None,
                    ..complete.clone()
                },
                ValidationError::NameRequired,
            ),
            (
                Form {
                    product_type_id: None,
                    ..complete.clone()
                },
                ValidationError::ProductTypeRequired,
            ),
            (
                Form {
                    opening_stock: None,
                    ..complete.clone()
                },
                ValidationError::OpeningStockRequired,
            ),
            (
                Form {
                    reorder_level: None,
                    ..complete.clone()
                },
                ValidationError::ReorderLevelRequired,
            ),
            (
                Form {
                    measurement_unit: None,
                    ..complete.clone()
                },
                ValidationError::MeasurementUnitRequired,
            ),
        ] {
            assert_eq!(form.creation().unwrap_err(), err);
        }
    }
}
