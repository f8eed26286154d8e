//! [`Database`]-related implementations.

#[cfg(feature = "postgres")]
pub mod postgres;

use derive_more::{Display, Error as StdError};

#[cfg(feature = "postgres")]
pub use self::postgres::Postgres;

/// Database operation.
pub use common::Handler as Database;

/// [`Database`] error.
#[derive(Debug, Display, StdError)]
pub enum Error {
    #[cfg(feature = "postgres")]
    /// [`Postgres`] error.
    Postgres(postgres::Error),

    /// Violation of the named unique constraint.
    #[display("unique constraint `{_0}` is violated")]
    UniqueViolation(#[error(not(source))] String),
}

#[cfg(feature = "postgres")]
impl From<postgres::Error> for Error {
    fn from(e: postgres::Error) -> Self {
        match e.violated_unique_constraint().map(ToOwned::to_owned) {
            Some(constraint) => Self::UniqueViolation(constraint),
            None => Self::Postgres(e),
        }
    }
}

impl Error {
    /// Checks whether this [`Error`] is a violation of the unique `constraint`
    /// (or of any unique constraint, if [`None`]).
    #[must_use]
    pub fn is_unique_violation(&self, constraint: Option<&str>) -> bool {
        match self {
            #[cfg(feature = "postgres")]
            Self::Postgres(e) => e.is_unique_violation(constraint),
            Self::UniqueViolation(c) => constraint.map_or(true, |n| n == c),
        }
    }
}

#[cfg(test)]
mod spec {
    use super::Error;

    #[test]
    fn matches_violated_constraint() {
        let err = Error::UniqueViolation("users_email_key".to_owned());

        assert!(err.is_unique_violation(None));
        assert!(err.is_unique_violation(Some("users_email_key")));
        assert!(!err.is_unique_violation(Some("users_username_key")));
    }
}
