//! Authentication endpoints.

use std::sync::Arc;

use axum::{
    response::{IntoResponse, Response},
    Extension, Json,
};
use axum_extra::extract::CookieJar;
use http::StatusCode;
use secrecy::SecretBox;
use serde::{Deserialize, Serialize};
use service::{
    command::{
        self, create_user, create_user_session, update_user_password,
        Command as _,
    },
    domain::user,
    read,
};

use crate::{
    define_error,
    session::{self, Cookies},
    AsError, Error, Service,
};

use super::JsonOrForm;

/// Public view of a [`read::User`].
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// ID of this [`User`].
    pub id: user::Id,

    /// Username of this [`User`].
    pub username: user::Username,

    /// Email of this [`User`].
    pub email: String,

    /// When this [`User`] was registered.
    pub created_at: user::CreationDateTime,

    /// When this [`User`] was modified last time.
    pub updated_at: user::ModificationDateTime,
}

impl From<read::User> for User {
    fn from(user: read::User) -> Self {
        let read::User {
            id,
            username,
            email,
            created_at,
            updated_at,
        } = user;
        Self {
            id,
            username,
            email: email.to_string(),
            created_at,
            updated_at,
        }
    }
}

/// Body of a response carrying a [`User`].
#[derive(Clone, Debug, Serialize)]
pub struct UserBody {
    /// The [`User`] itself.
    pub user: User,
}

/// Registration request body.
#[derive(Clone, Debug, Deserialize)]
pub struct Registration {
    /// Desired username.
    pub username: String,

    /// Email address.
    pub email: String,

    /// Plaintext password.
    pub password: String,
}

/// Registers a new [`User`].
///
/// # Errors
///
/// If the input is invalid, or the username or email is occupied.
#[tracing::instrument(skip_all, fields(username = %body.username))]
pub async fn register(
    Extension(service): Extension<Service>,
    Json(body): Json<Registration>,
) -> Result<(StatusCode, Json<User>), Error> {
    let Registration {
        username,
        email,
        password,
    } = body;

    let username =
        user::Username::new(username).ok_or(ValidationError::Username)?;
    let email = user::Email::new(email).ok_or(ValidationError::Email)?;
    let password = password_from(password)?;

    let user = service
        .execute(command::CreateUser {
            username,
            email,
            password,
        })
        .await
        .map_err(AsError::into_error)?;

    Ok((StatusCode::CREATED, Json(user.into())))
}

/// Login request body.
#[derive(Clone, Debug, Deserialize)]
pub struct Credentials {
    /// Username of the [`User`].
    pub username: String,

    /// Plaintext password of the [`User`].
    pub password: String,
}

/// Logs a [`User`] in, setting the session cookie.
///
/// # Errors
///
/// If the credentials are wrong.
#[tracing::instrument(skip_all, fields(username = %body.username))]
pub async fn login(
    Extension(service): Extension<Service>,
    Extension(cookies): Extension<Arc<Cookies>>,
    jar: CookieJar,
    JsonOrForm(body): JsonOrForm<Credentials>,
) -> Result<(CookieJar, Json<UserBody>), Error> {
    let Credentials { username, password } = body;

    // Malformed credentials can't belong to anyone.
    let (Some(username), Some(password)) =
        (user::Username::new(username), user::Password::new(password))
    else {
        return Err(LoginError::InvalidCredentials.into());
    };

    let create_user_session::Output { token, user, .. } = service
        .execute(command::CreateUserSession::ByCredentials {
            username,
            password: SecretBox::new(Box::new(password)),
        })
        .await
        .map_err(AsError::into_error)?;

    Ok(signed_in(jar, &cookies, &token, user))
}

/// Forms a response to a successful login: the session cookie carrying the
/// `token` along with the public view of the `user`.
fn signed_in(
    jar: CookieJar,
    cookies: &Cookies,
    token: &user::session::Token,
    user: read::User,
) -> (CookieJar, Json<UserBody>) {
    (jar.add(cookies.issue(token)), Json(UserBody { user: user.into() }))
}

/// Body of a logout response.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct Message {
    /// Human-readable message.
    pub message: &'static str,
}

/// Logs out by clearing the session cookie.
///
/// Issued tokens stay valid until they expire.
#[tracing::instrument(skip_all)]
pub async fn logout(
    Extension(cookies): Extension<Arc<Cookies>>,
    jar: CookieJar,
) -> (CookieJar, Json<Message>) {
    (
        jar.add(cookies.clear()),
        Json(Message {
            message: "Logout successful",
        }),
    )
}

/// Body of a failed session verification response.
#[derive(Clone, Copy, Debug, Serialize)]
struct Invalid {
    /// Always `false`.
    valid: bool,
}

/// Verifies the current session.
#[tracing::instrument(skip_all)]
pub async fn verify(current: Result<session::Current, Error>) -> Response {
    match current {
        Ok(session::Current { user, .. }) => {
            Json(UserBody { user: user.into() }).into_response()
        }
        Err(e) if e.status_code == StatusCode::UNAUTHORIZED => {
            (StatusCode::UNAUTHORIZED, Json(Invalid { valid: false }))
                .into_response()
        }
        Err(e) => e.into_response(),
    }
}

/// Password change request body.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordChange {
    /// Current password.
    pub old_password: String,

    /// New password.
    pub new_password: String,
}

/// Changes the password of the current [`User`].
///
/// # Errors
///
/// If the new password is invalid, or the old one is wrong.
#[tracing::instrument(skip_all, fields(user.id = %current.user.id))]
pub async fn change_password(
    current: session::Current,
    Extension(service): Extension<Service>,
    Json(body): Json<PasswordChange>,
) -> Result<Json<UserBody>, Error> {
    let PasswordChange {
        old_password,
        new_password,
    } = body;

    let Some(old_password) = user::Password::new(old_password) else {
        return Err(PasswordError::WrongPassword.into());
    };
    let new_password = password_from(new_password)?;

    let user = service
        .execute(command::UpdateUserPassword {
            user_id: current.user.id,
            old_password: SecretBox::new(Box::new(old_password)),
            new_password,
        })
        .await
        .map_err(AsError::into_error)?;

    Ok(Json(UserBody { user: user.into() }))
}

/// Parses a new [`user::Password`].
fn password_from(
    password: String,
) -> Result<SecretBox<user::Password>, ValidationError> {
    user::Password::new(password)
        .map(|p| SecretBox::new(Box::new(p)))
        .ok_or(ValidationError::Password)
}

impl AsError for create_user::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::DuplicateUser => Some(RegistrationError::DuplicateUser.into()),
            Self::PasswordHashing(_) => None,
        }
    }
}

impl AsError for create_user_session::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::InvalidCredentials | Self::UserNotExists(_) => {
                Some(LoginError::InvalidCredentials.into())
            }
            Self::CredentialsValidation(_) | Self::TokenIssuanceFailed(_) => {
                None
            }
        }
    }
}

impl AsError for update_user_password::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::WrongPassword => Some(PasswordError::WrongPassword.into()),
            Self::UserNotExists(_) => Some(session::SessionError::Invalid.into()),
            Self::PasswordHashing(_) => None,
        }
    }
}

define_error! {
    enum ValidationError {
        #[code = "INVALID_USERNAME"]
        #[status = BAD_REQUEST]
        #[message = "Username must be 2 to 100 letters, digits, `_`, `.` or `-`"]
        Username,

        #[code = "INVALID_EMAIL"]
        #[status = BAD_REQUEST]
        #[message = "Email address is invalid"]
        Email,

        #[code = "INVALID_PASSWORD"]
        #[status = BAD_REQUEST]
        #[message = "Password must be 2 to 72 bytes long"]
        Password,
    }
}

define_error! {
    enum RegistrationError {
        #[code = "DUPLICATE_USER"]
        #[status = CONFLICT]
        #[message = "User with the same username or email already exists"]
        DuplicateUser,
    }
}

define_error! {
    enum LoginError {
        #[code = "INVALID_CREDENTIALS"]
        #[status = UNAUTHORIZED]
        #[message = "Invalid username or password"]
        InvalidCredentials,
    }
}

define_error! {
    enum PasswordError {
        #[code = "WRONG_PASSWORD"]
        #[status = CONFLICT]
        #[message = "Old password is wrong"]
        WrongPassword,
    }
}

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use axum::response::IntoResponse as _;
    use axum_extra::extract::CookieJar;
    use common::DateTime;
    use http::{header, StatusCode};
    use service::{domain::user, read};

    use crate::{
        config,
        session::{Cookies, SessionError},
        Error,
    };

    use super::{signed_in, verify};

    #[tokio::test]
    async fn login_sets_session_cookie() {
        let cookies =
            Cookies::new(&config::Cookie::default(), Duration::from_secs(60));
        let token = "h.p.s".parse().unwrap();
        let now = DateTime::now();
        let user = read::User {
            id: user::Id::new(),
            username: user::Username::new("alice").unwrap(),
            email: user::Email::new("alice@example.com").unwrap(),
            created_at: now.coerce(),
            updated_at: now.coerce(),
        };

        let resp = signed_in(CookieJar::new(), &cookies, &token, user)
            .into_response();
        assert_eq!(resp.status(), StatusCode::OK);

        let cookie = resp
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap()
            .to_owned();
        assert!(cookie.starts_with("access_token=h.p.s;"), "{cookie}");
        assert!(cookie.contains("HttpOnly"), "{cookie}");
        assert!(cookie.contains("Max-Age=60"), "{cookie}");

        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["user"]["username"], "alice");
        assert_eq!(json["user"]["email"], "alice@example.com");
        assert!(json["user"].get("passwordHash").is_none());
        assert!(json["user"].get("createdAt").is_some());
    }

    #[tokio::test]
    async fn verify_hides_failure_reason() {
        let resp = verify(Err(SessionError::Invalid.into())).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json, serde_json::json!({ "valid": false }));
    }

    #[tokio::test]
    async fn verify_propagates_internal_errors() {
        let resp = verify(Err(Error::internal(&"db is down"))).await;

        assert_eq!(
            resp.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR,
        );
    }
}
