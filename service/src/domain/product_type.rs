//! [`ProductType`] definitions.

#[cfg(doc)]
use common::DateTime;
use common::{unit, DateTimeOf};
use derive_more::{AsRef, Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Category of [`Product`]s.
///
/// [`ProductType`]s are a fixed catalogue, provisioned by migrations.
///
/// [`Product`]: crate::domain::Product
#[derive(Clone, Debug)]
pub struct ProductType {
    /// ID of this [`ProductType`].
    pub id: Id,

    /// Unique [`Name`] of this [`ProductType`].
    pub name: Name,

    /// [`Description`] of this [`ProductType`], if any.
    pub description: Option<Description>,

    /// [`DateTime`] when this [`ProductType`] was created.
    pub created_at: CreationDateTime,

    /// [`DateTime`] when this [`ProductType`] was modified last time.
    pub updated_at: ModificationDateTime,
}

/// ID of a [`ProductType`].
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Display,
    Eq,
    From,
    FromStr,
    Hash,
    Into,
    PartialEq,
    Serialize,
)]
#[cfg_attr(feature = "postgres", derive(ToSql, FromSql), postgres(transparent))]
pub struct Id(Uuid);

impl Id {
    /// Creates a new random [`Id`].
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

/// Name of a [`ProductType`].
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Name(String);

impl Name {
    /// Creates a new [`Name`].
    ///
    /// # Safety
    ///
    /// The caller must ensure that the given `name` matches the format.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Creates a new [`Name`] if the given `name` is valid.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Option<Self> {
        let name = name.into();
        Self::check(&name).then_some(Self(name))
    }

    /// Checks whether the given `name` is a valid [`Name`].
    fn check(name: impl AsRef<str>) -> bool {
        let name = name.as_ref();
        name.trim() == name && !name.is_empty() && name.len() <= 255
    }
}

/// Free-form description of a [`ProductType`].
#[derive(AsRef, Clone, Debug, Display, Eq, From, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Description(String);

/// [`DateTime`] when a [`ProductType`] was created.
pub type CreationDateTime = DateTimeOf<(ProductType, unit::Creation)>;

/// [`DateTime`] when a [`ProductType`] was modified last time.
pub type ModificationDateTime = DateTimeOf<(ProductType, unit::Modification)>;
