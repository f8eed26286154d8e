//! Domain definitions.

pub mod product;
pub mod product_type;
pub mod user;

pub use self::{product::Product, product_type::ProductType, user::User};
