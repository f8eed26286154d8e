//! [`Product`] definitions.

use std::path::{Component, Path};

#[cfg(doc)]
use common::DateTime;
use common::{define_kind, unit, DateTimeOf, Quantity};
use derive_more::{AsRef, Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::product_type;

/// Product kept in the inventory.
#[derive(Clone, Debug)]
pub struct Product {
    /// ID of this [`Product`].
    pub id: Id,

    /// Unique [`Name`] of this [`Product`].
    pub name: Name,

    /// [`Description`] of this [`Product`], if any.
    pub description: Option<Description>,

    /// ID of the [`ProductType`] this [`Product`] belongs to.
    ///
    /// [`ProductType`]: crate::domain::ProductType
    pub product_type_id: product_type::Id,

    /// Stock of this [`Product`] at the moment it was registered.
    pub opening_stock: Quantity,

    /// Current stock of this [`Product`].
    pub current_stock: Quantity,

    /// Stock level at which this [`Product`] should be reordered.
    pub reorder_level: Quantity,

    /// [`MeasurementUnit`] of this [`Product`] stock.
    pub measurement_unit: MeasurementUnit,

    /// [`ImagePath`] of this [`Product`] picture, if any.
    pub image_path: Option<ImagePath>,

    /// [`DateTime`] when this [`Product`] was created.
    pub created_at: CreationDateTime,

    /// [`DateTime`] when this [`Product`] was modified last time.
    pub updated_at: ModificationDateTime,
}

/// ID of a [`Product`].
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

/// Name of a [`Product`].
#[derive(AsRef, Clone, Debug, Display, Eq, Hash, PartialEq)]
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

impl FromStr for Name {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Name`")
    }
}

/// Description of a [`Product`].
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Description(String);

impl Description {
    /// Creates a new [`Description`] if the given `text` is valid.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Option<Self> {
        let text = text.into();
        (text.len() <= 4096).then_some(Self(text))
    }
}

define_kind! {
    #[doc = "Unit a [`Product`] stock is measured in."]
    enum MeasurementUnit {
        #[doc = "Kilograms."]
        Kg = 1,

        #[doc = "Grams."]
        G = 2,

        #[doc = "Liters."]
        L = 3,

        #[doc = "Milliliters."]
        Ml = 4,

        #[doc = "Separate pieces."]
        Piece = 5,

        #[doc = "Boxes."]
        Box = 6,

        #[doc = "Packs."]
        Pack = 7,
    }
}

impl Default for MeasurementUnit {
    fn default() -> Self {
        Self::Piece
    }
}

/// Path of a [`Product`] image, relative to the uploads root.
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct ImagePath(String);

impl ImagePath {
    /// Directory (relative to the uploads root) [`Product`] images are stored
    /// in.
    pub const DIRECTORY: &'static str = "products";

    /// Creates a new [`ImagePath`] if the given `path` is valid.
    ///
    /// A valid [`ImagePath`] is relative and never escapes the uploads root.
    #[must_use]
    pub fn new(path: impl Into<String>) -> Option<Self> {
        let path = path.into();
        Self::check(&path).then_some(Self(path))
    }

    /// Creates a new [`ImagePath`] of the provided stored `file_name` inside
    /// the [`ImagePath::DIRECTORY`].
    #[must_use]
    pub fn of_file(file_name: &str) -> Option<Self> {
        Self::new(format!("{}/{file_name}", Self::DIRECTORY))
    }

    /// Checks whether the given `path` is a valid [`ImagePath`].
    fn check(path: impl AsRef<str>) -> bool {
        let path = path.as_ref();
        !path.is_empty()
            && path.len() <= 512
            && !path.contains('\\')
            && Path::new(path)
                .components()
                .all(|c| matches!(c, Component::Normal(_)))
    }
}

/// [`DateTime`] when a [`Product`] was created.
pub type CreationDateTime = DateTimeOf<(Product, unit::Creation)>;

/// [`DateTime`] when a [`Product`] was modified last time.
pub type ModificationDateTime = DateTimeOf<(Product, unit::Modification)>;

#[cfg(test)]
mod spec {
    use super::{ImagePath, MeasurementUnit, Name};

    #[test]
    fn name() {
        assert!(Name::new("Milk 2.5%").is_some());
        assert!(Name::new("").is_none());
        assert!(Name::new(" Milk").is_none());
        assert!(Name::new("Milk ").is_none());
        assert!(Name::new("x".repeat(255)).is_some());
        assert!(Name::new("x".repeat(256)).is_none());
    }

    #[test]
    fn measurement_unit() {
        assert_eq!(MeasurementUnit::default(), MeasurementUnit::Piece);
        assert_eq!(MeasurementUnit::Ml.to_string(), "ml");
        assert_eq!("box".parse::<MeasurementUnit>().unwrap(), MeasurementUnit::Box);
        assert!("ton".parse::<MeasurementUnit>().is_err());
        assert_eq!(MeasurementUnit::ALL.len(), 7);
    }

    #[test]
    fn image_path() {
        assert_eq!(
            ImagePath::of_file("1700000000000-abc.png").unwrap().to_string(),
            "products/1700000000000-abc.png",
        );
        assert!(ImagePath::new("products/x.gif").is_some());

        for invalid in ["", "/etc/passwd", "../x.png", "products/../../x", "a\\b"] {
            assert!(ImagePath::new(invalid).is_none(), "accepted `{invalid}`");
        }
    }
}
