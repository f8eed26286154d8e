//! [`Query`] collection related to a single [`Product`].

use common::operations::By;

use crate::{domain::product, read};
#[cfg(doc)]
use crate::{read::Product, Query};

use super::DatabaseQuery;

/// Queries a [`Product`] along with its type by its [`product::Id`].
pub type ById = DatabaseQuery<By<Option<read::Product>, product::Id>>;
