//! [`Product`] read model definition.

use derive_more::Deref;

use crate::domain::{self, ProductType};

/// [`domain::Product`] along with its [`ProductType`].
#[derive(Clone, Debug, Deref)]
pub struct Product {
    /// The [`domain::Product`] itself.
    #[deref]
    pub product: domain::Product,

    /// [`ProductType`] the [`domain::Product`] belongs to.
    pub product_type: ProductType,
}

pub mod list {
    //! [`Product`]s list definitions.

    use common::define_pagination;

    use crate::domain::product_type;

    use super::Product;

    define_pagination!(Product, Filter);

    /// Filter for [`Selector`].
    #[derive(Clone, Copy, Debug, Default)]
    pub struct Filter {
        /// ID of the [`ProductType`] to list [`Product`]s of only.
        ///
        /// [`ProductType`]: crate::domain::ProductType
        pub product_type_id: Option<product_type::Id>,
    }
}
