//! [`TokenCodec`] definitions.

use std::{fmt, time::Duration};

use common::DateTime;
use derive_more::{Display, Error};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret as _, SecretString};

use crate::domain::user::{
    self,
    session::{self, Session},
};

use super::ConfigError;

/// Signer and verifier of [`session::Token`]s, carrying [`Session`] claims
/// as an HMAC-SHA256 signed JSON Web Token.
#[derive(Clone)]
pub struct TokenCodec {
    /// Key to sign [`session::Token`]s with.
    encoding_key: EncodingKey,

    /// Key to verify [`session::Token`] signatures with.
    decoding_key: DecodingKey,

    /// Lifetime of the issued [`session::Token`]s.
    ttl: Duration,
}

impl fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCodec")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl TokenCodec {
    /// Default lifetime of the issued [`session::Token`]s.
    pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

    /// Creates a new [`TokenCodec`] with the provided signing `secret` and
    /// tokens lifetime.
    ///
    /// # Errors
    ///
    /// If the `secret` is empty or the `ttl` is zero.
    pub fn new(secret: &SecretString, ttl: Duration) -> Result<Self, ConfigError> {
        let secret = secret.expose_secret();
        if secret.is_empty() {
            return Err(ConfigError::EmptySecret);
        }
        if ttl.is_zero() {
            return Err(ConfigError::ZeroTtl);
        }
        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        })
    }

    /// Returns lifetime of the [`session::Token`]s issued by this
    /// [`TokenCodec`].
    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issues a new [`session::Token`] for the provided [`User`], valid from
    /// now on and for the [`TokenCodec::ttl()`].
    ///
    /// # Errors
    ///
    /// If [`jsonwebtoken`] fails to encode the claims.
    ///
    /// [`User`]: crate::domain::User
    pub fn sign(
        &self,
        user_id: user::Id,
        username: user::Username,
    ) -> Result<(session::Token, Session), SignError> {
        self.sign_at(user_id, username, DateTime::now().coerce())
    }

    /// Issues a new [`session::Token`] as if it was issued at the provided
    /// moment.
    ///
    /// # Errors
    ///
    /// If [`jsonwebtoken`] fails to encode the claims.
    pub fn sign_at(
        &self,
        user_id: user::Id,
        username: user::Username,
        issued_at: session::IssuanceDateTime,
    ) -> Result<(session::Token, Session), SignError> {
        let session = Session {
            user_id,
            username,
            issued_at,
            expires_at: (issued_at + self.ttl).coerce(),
        };

        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &session,
            &self.encoding_key,
        )
        .map_err(SignError)?;

        // SAFETY: `jsonwebtoken::encode()` always returns a valid
        //         `session::Token`.
        #[expect(unsafe_code, reason = "invariants are preserved")]
        let token = unsafe { session::Token::new_unchecked(token) };

        Ok((token, session))
    }

    /// Verifies the provided [`session::Token`] and returns the [`Session`]
    /// claims it carries.
    ///
    /// No leeway is applied to the expiration check, and a [`Session`] is
    /// already expired at its `exp` second.
    ///
    /// # Errors
    ///
    /// If the [`session::Token`] is malformed, has a wrong signature, or is
    /// expired.
    pub fn verify(&self, token: &session::Token) -> Result<Session, InvalidToken> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        jsonwebtoken::decode::<Session>(
            token.as_ref(),
            &self.decoding_key,
            &validation,
        )
        .map_err(|e| {
            tracing::debug!("rejected session token: {e}");
            InvalidToken
        })
        .and_then(|data| {
            // `jsonwebtoken` still accepts a token in its `exp` second.
            let session = data.claims;
            if session.expires_at.unix_timestamp()
                <= DateTime::now().unix_timestamp()
            {
                tracing::debug!("rejected session token: expired");
                return Err(InvalidToken);
            }
            Ok(session)
        })
    }
}

/// Error of signing a [`session::Token`].
#[derive(Debug, Display, Error)]
#[display("failed to encode a JSON Web Token: {_0}")]
pub struct SignError(jsonwebtoken::errors::Error);

/// Error of verifying a [`session::Token`].
///
/// Doesn't tell the exact reason, which is only logged.
#[derive(Clone, Copy, Debug, Display, Eq, Error, PartialEq)]
#[display("invalid session token")]
pub struct InvalidToken;

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use common::DateTime;
    use secrecy::SecretString;

    use crate::domain::user::{self, session};

    use super::{super::ConfigError, InvalidToken, TokenCodec};

    fn codec(secret: &str) -> TokenCodec {
        TokenCodec::new(&SecretString::from(secret), TokenCodec::DEFAULT_TTL)
            .unwrap()
    }

    fn alice() -> user::Username {
        user::Username::new("alice").unwrap()
    }

    #[test]
    fn verifies_signed_token() {
        let codec = codec("s3cr3t");
        let id = user::Id::new();

        let (token, issued) = codec.sign(id, alice()).unwrap();
        let session = codec.verify(&token).unwrap();

        assert_eq!(session.user_id, id);
        assert_eq!(session.username, alice());
        assert_eq!(
            session.expires_at.unix_timestamp(),
            issued.expires_at.unix_timestamp(),
        );
        assert_eq!(
            session.expires_at.unix_timestamp()
                - session.issued_at.unix_timestamp(),
            24 * 60 * 60,
        );
    }

    #[test]
    fn rejects_expired_token() {
        let codec = codec("s3cr3t");
        let issued_at =
            (DateTime::now() - codec.ttl() - Duration::from_secs(10)).coerce();

        let (token, _) =
            codec.sign_at(user::Id::new(), alice(), issued_at).unwrap();

        assert_eq!(codec.verify(&token).unwrap_err(), InvalidToken);
    }

    #[test]
    fn accepts_token_close_to_expiration() {
        let codec = codec("s3cr3t");
        let issued_at =
            (DateTime::now() - codec.ttl() + Duration::from_secs(30)).coerce();

        let (token, _) =
            codec.sign_at(user::Id::new(), alice(), issued_at).unwrap();

        assert!(codec.verify(&token).is_ok());
    }

    #[test]
    fn rejects_token_at_expiration_second() {
        let codec = codec("s3cr3t");
        let issued_at = (DateTime::now() - codec.ttl()).coerce();

        let (token, session) =
            codec.sign_at(user::Id::new(), alice(), issued_at).unwrap();
        assert!(
            session.expires_at.unix_timestamp()
                <= DateTime::now().unix_timestamp(),
        );

        assert_eq!(codec.verify(&token).unwrap_err(), InvalidToken);
    }

    #[test]
    fn rejects_token_signed_with_another_secret() {
        let (token, _) =
            codec("other").sign(user::Id::new(), alice()).unwrap();

        assert_eq!(codec("s3cr3t").verify(&token).unwrap_err(), InvalidToken);
    }

    #[test]
    fn rejects_corrupted_token() {
        let codec = codec("s3cr3t");
        let (token, _) = codec.sign(user::Id::new(), alice()).unwrap();
        let token = token.as_ref();

        for corrupted in [
            format!("{token}x"),
            token[..token.len() - 4].to_owned(),
            token.replacen('.', "x.", 1),
            "garbage".to_owned(),
            String::new(),
        ] {
            #[expect(unsafe_code, reason = "test")]
            let corrupted = unsafe { session::Token::new_unchecked(corrupted) };

            assert_eq!(codec.verify(&corrupted).unwrap_err(), InvalidToken);
        }
    }

    #[test]
    fn rejects_invalid_config() {
        assert_eq!(
            TokenCodec::new(&SecretString::from(""), TokenCodec::DEFAULT_TTL)
                .unwrap_err(),
            ConfigError::EmptySecret,
        );
        assert_eq!(
            TokenCodec::new(&SecretString::from("s3cr3t"), Duration::ZERO)
                .unwrap_err(),
            ConfigError::ZeroTtl,
        );
    }
}
