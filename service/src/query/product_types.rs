//! [`Query`] collection related to [`ProductType`]s.

use common::operations::By;

use crate::domain::ProductType;
#[cfg(doc)]
use crate::Query;

use super::DatabaseQuery;

/// Queries all the [`ProductType`]s ordered by their names.
pub type All = DatabaseQuery<By<Vec<ProductType>, ()>>;
