//! Session transport: the session cookie and token extraction.

use std::time;

use axum::{async_trait, extract::FromRequestParts};
use axum_extra::{
    extract::cookie::{Cookie, CookieJar, SameSite},
    headers::{authorization::Bearer, Authorization, HeaderMapExt as _},
};
use service::{
    command::{self, Command as _},
    domain::user::{self, session},
    read,
};

use crate::{config, define_error, AsError, Error, Service};

/// Name of the session cookie.
pub const COOKIE_NAME: &str = "access_token";

/// Builder of the session cookies.
#[derive(Clone, Debug)]
pub struct Cookies {
    /// Domain the cookies are pinned to.
    domain: Option<String>,

    /// Whether the cookies are sent over HTTPS only.
    secure: bool,

    /// Lifetime of the issued cookies.
    max_age: time::Duration,
}

impl Cookies {
    /// Creates new [`Cookies`] living for `max_age`.
    #[must_use]
    pub fn new(config: &config::Cookie, max_age: time::Duration) -> Self {
        Self {
            domain: config.domain.clone(),
            secure: config.secure,
            max_age,
        }
    }

    /// Builds a cookie carrying the provided [`session::Token`].
    #[must_use]
    pub fn issue(&self, token: &session::Token) -> Cookie<'static> {
        let max_age = ::time::Duration::try_from(self.max_age)
            .unwrap_or(::time::Duration::MAX);
        self.build(token.as_ref().to_owned(), max_age)
    }

    /// Builds a cookie removing the session cookie on the client.
    ///
    /// All its attributes but the value and lifetime match the ones of
    /// [`Cookies::issue()`], otherwise the client won't remove the cookie.
    #[must_use]
    pub fn clear(&self) -> Cookie<'static> {
        self.build(String::new(), ::time::Duration::ZERO)
    }

    fn build(&self, value: String, max_age: ::time::Duration) -> Cookie<'static> {
        let mut cookie = Cookie::build((COOKIE_NAME, value))
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Lax)
            .path("/")
            .max_age(max_age);
        if let Some(domain) = &self.domain {
            cookie = cookie.domain(domain.clone());
        }
        cookie.build()
    }
}

/// Extracts a [`session::Token`] out of the provided request `headers`.
///
/// `Authorization: Bearer` header takes precedence over the session cookie.
/// Empty values are considered absent.
#[must_use]
pub fn extract_token(headers: &http::HeaderMap) -> Option<session::Token> {
    let from_header = headers
        .typed_get::<Authorization<Bearer>>()
        .map(|Authorization(bearer)| bearer.token().to_owned());
    let from_cookie = || {
        CookieJar::from_headers(headers)
            .get(COOKIE_NAME)
            .map(|c| c.value().to_owned())
    };

    let token = from_header
        .filter(|t| !t.is_empty())
        .or_else(|| from_cookie().filter(|t| !t.is_empty()))?;

    #[expect(unsafe_code, reason = "verified by `AuthorizeUserSession`")]
    let token = unsafe { session::Token::new_unchecked(token) };
    Some(token)
}

/// Checks whether the provided request `headers` carry the session cookie.
///
/// Its value is not verified.
#[must_use]
pub fn has_cookie(headers: &http::HeaderMap) -> bool {
    CookieJar::from_headers(headers)
        .get(COOKIE_NAME)
        .is_some_and(|c| !c.value().is_empty())
}

/// Authorized session of the current request.
#[derive(Clone, Debug)]
pub struct Current {
    /// Claims of the authorized [`user::Session`].
    pub session: user::Session,

    /// [`read::User`] the [`user::Session`] belongs to.
    pub user: read::User,
}

#[async_trait]
impl<S> FromRequestParts<S> for Current
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(
        parts: &mut http::request::Parts,
        _: &S,
    ) -> Result<Self, Self::Rejection> {
        let token =
            extract_token(&parts.headers).ok_or(SessionError::Required)?;
        let service = parts
            .extensions
            .get::<Service>()
            .cloned()
            .ok_or_else(|| Error::internal(&"missing `Service` extension"))?;

        let command::authorize_user_session::Output { session, user } = service
            .execute(command::AuthorizeUserSession { token })
            .await
            .map_err(AsError::into_error)?;

        Ok(Self { session, user })
    }
}

impl AsError for command::authorize_user_session::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::InvalidSession => Some(SessionError::Invalid.into()),
        }
    }
}

define_error! {
    enum SessionError {
        #[code = "AUTHORIZATION_REQUIRED"]
        #[status = UNAUTHORIZED]
        #[message = "Authorization required"]
        Required,

        #[code = "INVALID_SESSION"]
        #[status = UNAUTHORIZED]
        #[message = "Invalid or expired session"]
        Invalid,
    }
}

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use axum_extra::extract::cookie::SameSite;
    use http::{header, HeaderMap, HeaderValue};

    use crate::config;

    use super::{extract_token, has_cookie, Cookies, COOKIE_NAME};

    fn cookies() -> Cookies {
        Cookies::new(
            &config::Cookie {
                domain: Some("localhost".to_owned()),
                secure: false,
            },
            Duration::from_secs(86_400),
        )
    }

    fn headers(pairs: &[(header::HeaderName, &str)]) -> HeaderMap {
        pairs
            .iter()
            .map(|(k, v)| (k.clone(), HeaderValue::from_str(v).unwrap()))
            .collect()
    }

    #[test]
    fn issued_cookie_attributes() {
        let token = "a.b.c".parse().unwrap();
        let cookie = cookies().issue(&token);

        assert_eq!(cookie.name(), COOKIE_NAME);
        assert_eq!(cookie.value(), "a.b.c");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(false));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.domain(), Some("localhost"));
        assert_eq!(cookie.max_age(), Some(::time::Duration::seconds(86_400)));
    }

    #[test]
    fn clearing_cookie_mirrors_issued_one() {
        let cookies = cookies();
        let issued = cookies.issue(&"a.b.c".parse().unwrap());
        let cleared = cookies.clear();

        assert_eq!(cleared.name(), issued.name());
        assert_eq!(cleared.value(), "");
        assert_eq!(cleared.http_only(), issued.http_only());
        assert_eq!(cleared.secure(), issued.secure());
        assert_eq!(cleared.same_site(), issued.same_site());
        assert_eq!(cleared.path(), issued.path());
        assert_eq!(cleared.domain(), issued.domain());
        assert_eq!(cleared.max_age(), Some(::time::Duration::ZERO));
    }

    #[test]
    fn header_takes_precedence_over_cookie() {
        let both = headers(&[
            (header::AUTHORIZATION, "Bearer from-header"),
            (header::COOKIE, "access_token=from-cookie"),
        ]);
        assert_eq!(
            extract_token(&both).unwrap().as_ref(),
            "from-header",
        );

        let cookie_only = headers(&[(
            header::COOKIE,
            "theme=dark; access_token=from-cookie",
        )]);
        assert_eq!(
            extract_token(&cookie_only).unwrap().as_ref(),
            "from-cookie",
        );
    }

    #[test]
    fn absent_or_empty_token() {
        assert!(extract_token(&HeaderMap::new()).is_none());
        assert!(extract_token(&headers(&[(
            header::COOKIE,
            "access_token="
        )]))
        .is_none());
        assert!(extract_token(&headers(&[(
            header::AUTHORIZATION,
            "Basic dXNlcjpwYXNz"
        )]))
        .is_none());
    }

    #[test]
    fn cookie_presence() {
        assert!(has_cookie(&headers(&[(header::COOKIE, "access_token=x")])));
        assert!(!has_cookie(&headers(&[(header::COOKIE, "other=x")])));
        assert!(!has_cookie(&HeaderMap::new()));
    }
}
