//! [`Query`] collection related to the multiple [`Product`]s.

use common::operations::By;

use crate::read;
#[cfg(doc)]
use crate::{read::Product, Query};

use super::DatabaseQuery;

/// Queries a page of [`Product`]s, newest first.
pub type List =
    DatabaseQuery<By<read::product::list::Page, read::product::list::Selector>>;
