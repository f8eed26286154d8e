//! [`PasswordHasher`] definitions.

use std::{
    fmt,
    sync::{Arc, OnceLock},
};

use crate::domain::user::{Password, PasswordHash};

use super::ConfigError;

/// Adaptive one-way hasher of [`Password`]s, backed by [`bcrypt`].
///
/// Every produced [`PasswordHash`] embeds its own random salt and work
/// factor, so hashing the same [`Password`] twice gives different results.
#[derive(Clone)]
pub struct PasswordHasher {
    /// Work factor of the produced [`PasswordHash`]es.
    cost: u32,

    /// Hash compared against when there is no real [`PasswordHash`] to
    /// compare with, so such comparisons cost the same time.
    dummy: Arc<OnceLock<Option<String>>>,
}

impl fmt::Debug for PasswordHasher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordHasher")
            .field("cost", &self.cost)
            .finish_non_exhaustive()
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self {
            cost: Self::DEFAULT_COST,
            dummy: Arc::default(),
        }
    }
}

impl PasswordHasher {
    /// Default work factor.
    pub const DEFAULT_COST: u32 = 10;

    /// Minimum supported work factor.
    pub const MIN_COST: u32 = 4;

    /// Maximum supported work factor.
    pub const MAX_COST: u32 = 31;

    /// Creates a new [`PasswordHasher`] with the provided work factor.
    ///
    /// # Errors
    ///
    /// If the `cost` is out of [[`MIN_COST`], [`MAX_COST`]] range.
    ///
    /// [`MAX_COST`]: Self::MAX_COST
    /// [`MIN_COST`]: Self::MIN_COST
    pub fn new(cost: u32) -> Result<Self, ConfigError> {
        if !(Self::MIN_COST..=Self::MAX_COST).contains(&cost) {
            return Err(ConfigError::InvalidCost(cost));
        }
        Ok(Self {
            cost,
            dummy: Arc::default(),
        })
    }

    /// Returns the work factor of this [`PasswordHasher`].
    #[must_use]
    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// Hashes the provided [`Password`].
    ///
    /// # Errors
    ///
    /// If [`bcrypt`] fails to produce a hash.
    pub fn hash(
        &self,
        password: &Password,
    ) -> Result<PasswordHash, bcrypt::BcryptError> {
        let hash = bcrypt::hash(password.as_ref(), self.cost)?;

        // SAFETY: `bcrypt::hash()` always returns a valid `PasswordHash`.
        #[expect(unsafe_code, reason = "invariants are preserved")]
        let hash = unsafe { PasswordHash::new_unchecked(hash) };
        Ok(hash)
    }

    /// Checks whether the provided [`Password`] matches the provided
    /// [`PasswordHash`].
    ///
    /// Malformed [`PasswordHash`]es never match.
    #[must_use]
    pub fn compare(&self, password: &Password, hash: &PasswordHash) -> bool {
        bcrypt::verify(password.as_ref(), hash.as_ref()).unwrap_or_else(|e| {
            tracing::warn!("malformed password hash: {e}");
            false
        })
    }

    /// Spends the same time as [`PasswordHasher::compare()`] does, without
    /// any real [`PasswordHash`] to compare with.
    ///
    /// Always returns `false`.
    #[must_use]
    pub fn compare_nothing(&self, password: &Password) -> bool {
        let dummy = self.dummy.get_or_init(|| {
            bcrypt::hash("dummy password", self.cost)
                .inspect_err(|e| {
                    tracing::warn!("failed to prepare dummy hash: {e}");
                })
                .ok()
        });
        if let Some(dummy) = dummy {
            _ = bcrypt::verify(password.as_ref(), dummy);
        }
        false
    }
}

#[cfg(test)]
mod spec {
    use crate::domain::user::{Password, PasswordHash};

    use super::{super::ConfigError, PasswordHasher};

    fn hasher() -> PasswordHasher {
        PasswordHasher::new(PasswordHasher::MIN_COST).unwrap()
    }

    #[test]
    fn matches_only_same_password() {
        let hasher = hasher();
        let password = Password::new("secret12").unwrap();

        let hash = hasher.hash(&password).unwrap();

        assert!(hasher.compare(&password, &hash));
        assert!(!hasher.compare(&Password::new("secret13").unwrap(), &hash));
    }

    #[test]
    fn salts_every_hash() {
        let hasher = hasher();
        let password = Password::new("secret12").unwrap();

        let first = hasher.hash(&password).unwrap();
        let second = hasher.hash(&password).unwrap();

        assert_ne!(first, second);
        assert!(hasher.compare(&password, &first));
        assert!(hasher.compare(&password, &second));
    }

    #[test]
    fn hash_never_contains_password() {
        let password = Password::new("secret12").unwrap();

        let hash = hasher().hash(&password).unwrap();

        assert!(!hash.as_ref().contains("secret12"));
    }

    #[test]
    fn malformed_hash_never_matches() {
        #[expect(unsafe_code, reason = "test")]
        let hash = unsafe { PasswordHash::new_unchecked("not a hash") };

        assert!(!hasher().compare(&Password::new("secret12").unwrap(), &hash));
    }

    #[test]
    fn compare_nothing_never_matches() {
        assert!(!hasher().compare_nothing(&Password::new("secret12").unwrap()));
    }

    #[test]
    fn rejects_invalid_cost() {
        assert_eq!(
            PasswordHasher::new(3).unwrap_err(),
            ConfigError::InvalidCost(3),
        );
        assert_eq!(
            PasswordHasher::new(32).unwrap_err(),
            ConfigError::InvalidCost(32),
        );
        assert_eq!(PasswordHasher::default().cost(), 10);
    }

    #[test]
    fn hashes_with_configured_cost() {
        let hasher = PasswordHasher::new(PasswordHasher::MIN_COST).unwrap();
        let hash = hasher.hash(&Password::new("secret12").unwrap()).unwrap();

        let parts: &str = hash.as_ref();
        assert!(parts.starts_with("$2b$04$"), "{parts}");
    }
}
