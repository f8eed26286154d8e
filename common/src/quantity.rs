//! [`Quantity`]-related definitions.

use std::{fmt, str::FromStr};

use derive_more::{Display, Error as StdError};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use rust_decimal::Decimal;

/// Non-negative amount of something measured with a two-digit fractional
/// precision (stock levels, for example).
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Quantity(Decimal);

impl Quantity {
    /// Number of fractional digits kept by a [`Quantity`].
    pub const SCALE: u32 = 2;

    /// Zero [`Quantity`].
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Maximum representable [`Quantity`] (fits `NUMERIC(10, 2)`).
    pub const MAX: Self = Self(Decimal::from_parts(
        1_410_065_407,
        2,
        0,
        false,
        Self::SCALE,
    ));

    /// Creates a new [`Quantity`] out of the provided `value`, rounding it to
    /// [`Quantity::SCALE`] fractional digits.
    ///
    /// # Errors
    ///
    /// If the `value` is negative or exceeds [`Quantity::MAX`].
    pub fn new(value: Decimal) -> Result<Self, Error> {
        let value = value.round_dp(Self::SCALE);
        if value.is_sign_negative() && !value.is_zero() {
            return Err(Error::Negative);
        }
        if value > Self::MAX.0 {
            return Err(Error::TooLarge);
        }
        Ok(Self(value.abs()))
    }

    /// Returns the inner [`Decimal`] value of this [`Quantity`].
    #[must_use]
    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut value = self.0;
        value.rescale(Self::SCALE);
        write!(f, "{value}")
    }
}

impl FromStr for Quantity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::from_str(s.trim())
            .map_err(|_| Error::Malformed)
            .and_then(Self::new)
    }
}

impl TryFrom<Decimal> for Quantity {
    type Error = Error;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Error of constructing a [`Quantity`].
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq, StdError)]
pub enum Error {
    /// Provided value is not a decimal number.
    #[display("not a decimal number")]
    Malformed,

    /// Provided value is negative.
    #[display("must not be negative")]
    Negative,

    /// Provided value exceeds [`Quantity::MAX`].
    #[display("is too large")]
    TooLarge,
}

#[cfg(feature = "serde")]
mod serde {
    //! Module providing integration with [`serde`] crate.
    //!
    //! A [`Quantity`] is serialized as a decimal string (e.g. `"12.50"`) to
    //! avoid precision loss, and deserialized from either a string or a JSON
    //! number.

    use std::fmt;

    use rust_decimal::Decimal;
    use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

    use super::Quantity;

    impl Serialize for Quantity {
        fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            serializer.collect_str(self)
        }
    }

    impl<'de> Deserialize<'de> for Quantity {
        fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
        where
            D: Deserializer<'de>,
        {
            deserializer.deserialize_any(Visitor)
        }
    }

    /// [`de::Visitor`] of a [`Quantity`].
    struct Visitor;

    impl de::Visitor<'_> for Visitor {
        type Value = Quantity;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a non-negative decimal number")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Quantity, E> {
            v.parse().map_err(E::custom)
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Quantity, E> {
            Quantity::new(Decimal::from(v)).map_err(E::custom)
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Quantity, E> {
            Quantity::new(Decimal::from(v)).map_err(E::custom)
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<Quantity, E> {
            Decimal::try_from(v)
                .map_err(E::custom)
                .and_then(|d| Quantity::new(d).map_err(E::custom))
        }
    }
}

#[cfg(test)]
mod spec {
    use std::str::FromStr as _;

    use rust_decimal::Decimal;

    use super::{Error, Quantity};

    fn decimal(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn from_str() {
        assert_eq!(
            Quantity::from_str("12.5").unwrap().value(),
            decimal("12.50"),
        );
        assert_eq!(Quantity::from_str(" 7 ").unwrap().value(), decimal("7"));
        assert_eq!(
            Quantity::from_str("1.005").unwrap().value(),
            decimal("1.00"),
        );

        assert_eq!(Quantity::from_str("-1"), Err(Error::Negative));
        assert_eq!(Quantity::from_str("abc"), Err(Error::Malformed));
        assert_eq!(Quantity::from_str("100000000"), Err(Error::TooLarge));
        assert!(Quantity::from_str("99999999.99").is_ok());
        assert!(Quantity::from_str("-0.001").is_ok());
    }

    #[test]
    fn to_string() {
        assert_eq!(Quantity::from_str("12.5").unwrap().to_string(), "12.50");
        assert_eq!(Quantity::from_str("3").unwrap().to_string(), "3.00");
        assert_eq!(Quantity::ZERO.to_string(), "0.00");
        assert_eq!(Quantity::MAX.to_string(), "99999999.99");
    }
}
