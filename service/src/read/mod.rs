//! Read entities definitions.

pub mod product;
pub mod user;

pub use self::{product::Product, user::User};
