//! Route gate deciding whether a page navigation is permitted.
//!
//! The edge [`middleware()`] inspects the session cookie presence only, while
//! the [`Client`] gate follows the outcome of the session verification.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse as _, Redirect, Response},
};

use crate::{config, session};

/// Class of a page path.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Route {
    /// Page available to unauthenticated clients only (login, for example).
    AuthOnly,

    /// Page available to authenticated clients only.
    Protected,

    /// Page available to everyone.
    Public,
}

/// Outcome of a [`Gate`] check.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Decision {
    /// Navigation is permitted.
    Pass,

    /// Client should be redirected to the provided path.
    Redirect(String),
}

/// Route gate.
#[derive(Clone, Debug)]
pub struct Gate {
    /// Configuration of this [`Gate`].
    config: config::Gate,
}

impl Gate {
    /// Creates a new [`Gate`] out of the provided [`config::Gate`].
    #[must_use]
    pub fn new(config: config::Gate) -> Self {
        Self { config }
    }

    /// Path of the login page.
    #[must_use]
    pub fn login(&self) -> &str {
        &self.config.login
    }

    /// Path authenticated clients land on.
    #[must_use]
    pub fn landing(&self) -> &str {
        &self.config.landing
    }

    /// Checks whether the provided `path` is never gated.
    #[must_use]
    pub fn is_excluded(&self, path: &str) -> bool {
        matches_any(&self.config.excluded, path)
    }

    /// Classifies the provided page `path`.
    #[must_use]
    pub fn classify(&self, path: &str) -> Route {
        if matches_any(&self.config.auth_only, path) {
            Route::AuthOnly
        } else if matches_any(&self.config.protected, path) {
            Route::Protected
        } else {
            Route::Public
        }
    }

    /// Decides whether a navigation to the `path` is permitted, given whether
    /// the client has a session cookie.
    #[must_use]
    pub fn decide(&self, path: &str, has_cookie: bool) -> Decision {
        if self.is_excluded(path) {
            return Decision::Pass;
        }
        match (self.classify(path), has_cookie) {
            (Route::AuthOnly, true) => {
                Decision::Redirect(self.config.landing.clone())
            }
            (Route::Protected, false) => {
                Decision::Redirect(self.config.login.clone())
            }
            (Route::AuthOnly | Route::Protected | Route::Public, _) => {
                Decision::Pass
            }
        }
    }
}

/// Checks whether the `path` equals to any of the `prefixes` or lies under it.
fn matches_any(prefixes: &[String], path: &str) -> bool {
    prefixes.iter().any(|prefix| {
        path.strip_prefix(prefix.as_str()).is_some_and(|rest| {
            rest.is_empty() || rest.starts_with('/') || prefix.ends_with('/')
        })
    })
}

/// Edge gate middleware.
///
/// Redirects with `307 Temporary Redirect` when the navigation is not
/// permitted.
pub async fn middleware(
    State(gate): State<Arc<Gate>>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_owned();
    match gate.decide(&path, session::has_cookie(request.headers())) {
        Decision::Pass => next.run(request).await,
        Decision::Redirect(to) => {
            tracing::debug!(%path, %to, "navigation redirected");
            Redirect::temporary(&to).into_response()
        }
    }
}

/// Client-side gate, driven by the session verification outcome.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Client<U> {
    /// Session verification is in progress.
    Loading,

    /// Session is verified and belongs to the provided user.
    Authenticated(U),

    /// Client should navigate to the provided path.
    Redirect(String),
}

impl<U> Default for Client<U> {
    fn default() -> Self {
        Self::Loading
    }
}

impl<U> Client<U> {
    /// Applies the outcome of a session verification.
    ///
    /// A failed verification sends the client to the login page, unless it's
    /// already being redirected somewhere.
    #[must_use]
    pub fn verified(self, user: Option<U>, gate: &Gate) -> Self {
        match (self, user) {
            (_, Some(user)) => Self::Authenticated(user),
            (Self::Redirect(to), None) => Self::Redirect(to),
            (Self::Loading | Self::Authenticated(_), None) => {
                Self::Redirect(gate.login().to_owned())
            }
        }
    }

    /// Decides whether the client may show the page of the provided `path`.
    #[must_use]
    pub fn navigate(&self, path: &str, gate: &Gate) -> Decision {
        match self {
            Self::Loading => Decision::Pass,
            Self::Redirect(to) => Decision::Redirect(to.clone()),
            Self::Authenticated(_) => match gate.classify(path) {
                Route::AuthOnly => Decision::Redirect(gate.landing().to_owned()),
                Route::Protected | Route::Public => Decision::Pass,
            },
        }
    }

    /// Returns the authenticated user, if any.
    #[must_use]
    pub fn user(&self) -> Option<&U> {
        match self {
            Self::Authenticated(user) => Some(user),
            Self::Loading | Self::Redirect(_) => None,
        }
    }
}
