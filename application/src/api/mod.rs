//! HTTP API definitions.

pub mod auth;
pub mod product;

use std::sync::Arc;

use axum::{
    async_trait,
    extract::{DefaultBodyLimit, FromRequest, Request},
    routing::{get, post, put},
    Extension, Form, Json, Router,
};
use http::{header, HeaderValue, Method};
use serde::de::DeserializeOwned;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    services::ServeDir,
};

use crate::{config, session::Cookies, upload::Uploads, AsError as _, Error};

/// Builds the HTTP API [`Router`].
///
/// [`Service`] is expected to be provided as an [`Extension`] layer on top.
///
/// [`Service`]: crate::Service
pub fn router(cookies: Cookies, uploads: Uploads) -> Router {
    // Multipart overhead on top of the image itself.
    let body_limit = uploads.max_size() + 64 * 1024;

    let products = Router::new()
        .route("/", get(product::list).post(product::create))
        .route("/types/all", get(product::types))
        .route(
            "/:id",
            get(product::get)
                .put(product::update)
                .delete(product::delete),
        )
        .layer(DefaultBodyLimit::max(body_limit));

    Router::new()
        .route("/health", get(health))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/verify", post(auth::verify))
        .route("/auth/password", put(auth::change_password))
        .nest("/products", products)
        .nest_service("/uploads", ServeDir::new(uploads.root()))
        .layer(Extension(Arc::new(cookies)))
        .layer(Extension(Arc::new(uploads)))
}

/// Builds the [`CorsLayer`] allowing credentialed requests from all the
/// configured origins.
///
/// # Errors
///
/// If any of the configured origins is not a valid header value.
pub fn cors(
    config: &config::Cors,
) -> Result<CorsLayer, http::header::InvalidHeaderValue> {
    let origins = config
        .origins
        .iter()
        .map(|o| o.parse::<HeaderValue>())
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CorsLayer::new()
        .allow_credentials(true)
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::OPTIONS,
            Method::POST,
            Method::PUT,
            Method::DELETE,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]))
}

/// Health check handler.
#[expect(clippy::unused_async, reason = "`async` is required by `axum`")]
pub async fn health() -> &'static str {
    "OK"
}

/// Extractor of a request body encoded either as JSON or as a URL-encoded
/// form, depending on its `Content-Type`.
#[derive(Clone, Copy, Debug)]
pub struct JsonOrForm<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonOrForm<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = Error;

    async fn from_request(req: Request, state: &S) -> Result<Self, Error> {
        let is_form = req
            .headers()
            .get(http::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| {
                ct.starts_with("application/x-www-form-urlencoded")
            });

        if is_form {
            Form::<T>::from_request(req, state)
                .await
                .map(|Form(v)| Self(v))
                .map_err(|e| e.as_error())
        } else {
            Json::<T>::from_request(req, state)
                .await
                .map(|Json(v)| Self(v))
                .map_err(|e| e.as_error())
        }
    }
}

#[cfg(test)]
mod spec {
    use std::{path::PathBuf, time::Duration};

    use axum::{body::Body, routing::post, Router};
    use http::{header, Method, Request, StatusCode};
    use tower::ServiceExt as _;

    use crate::{config, session::Cookies, upload::Uploads};

    use super::{auth::Credentials, JsonOrForm};

    fn app() -> Router {
        super::router(
            Cookies::new(&config::Cookie::default(), Duration::from_secs(60)),
            Uploads::new(&config::Uploads {
                directory: PathBuf::from("target/test-uploads"),
                max_size: 1024,
            }),
        )
    }

    async fn call(
        method: Method,
        uri: &str,
    ) -> (StatusCode, http::HeaderMap, serde_json::Value) {
        let resp = app()
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = resp.status();
        let headers = resp.headers().clone();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes)
            .unwrap_or(serde_json::Value::Null);
        (status, headers, json)
    }

    #[tokio::test]
    async fn health() {
        let (status, _, _) = call(Method::GET, "/health").await;

        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn logout_clears_cookie() {
        let (status, headers, json) = call(Method::POST, "/auth/logout").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["message"], "Logout successful");

        let cookie = headers
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap();
        assert!(cookie.starts_with("access_token=;"), "{cookie}");
        assert!(cookie.contains("Max-Age=0"), "{cookie}");
        assert!(cookie.contains("HttpOnly"), "{cookie}");
    }

    #[tokio::test]
    async fn verify_without_session() {
        let (status, _, json) = call(Method::POST, "/auth/verify").await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json, serde_json::json!({ "valid": false }));
    }

    #[tokio::test]
    async fn products_require_session() {
        for (method, uri) in [
            (Method::GET, "/products"),
            (Method::GET, "/products/types/all"),
            (Method::DELETE, "/products/00000000-0000-0000-0000-000000000000"),
        ] {
            let (status, _, json) = call(method, uri).await;

            assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
            assert_eq!(json["code"], "AUTHORIZATION_REQUIRED", "{uri}");
        }
    }

    #[tokio::test]
    async fn allows_every_configured_origin() {
        let cors = super::cors(&config::Cors {
            origins: vec![
                "http://localhost:3000".to_owned(),
                "http://localhost:5173".to_owned(),
            ],
        })
        .unwrap();
        let app = app().layer(cors);

        for origin in ["http://localhost:3000", "http://localhost:5173"] {
            let resp = app
                .clone()
                .oneshot(
                    Request::builder()
                        .uri("/health")
                        .header(header::ORIGIN, origin)
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();

            let headers = resp.headers();
            assert_eq!(
                headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
                origin,
            );
            assert_eq!(
                headers
                    .get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS)
                    .unwrap(),
                "true",
            );
        }

        let resp = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .header(header::ORIGIN, "http://evil.example")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert!(resp
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_none());
    }

    #[test]
    fn rejects_invalid_origin() {
        assert!(super::cors(&config::Cors {
            origins: vec!["http://localhost\n:3000".to_owned()],
        })
        .is_err());
    }

    #[tokio::test]
    async fn reads_credentials_as_json_or_form() {
        let app = Router::new().route(
            "/",
            post(|JsonOrForm(c): JsonOrForm<Credentials>| async move {
                format!("{}:{}", c.username, c.password)
            }),
        );

        for (content_type, body) in [
            (
                "application/x-www-form-urlencoded",
                "username=alice&password=s3cr3t%21",
            ),
            (
                "application/x-www-form-urlencoded; charset=utf-8",
                "password=s3cr3t%21&username=alice",
            ),
            ("application/json", r#"{"username":"alice","password":"s3cr3t!"}"#),
        ] {
            let resp = app
                .clone()
                .oneshot(
                    Request::builder()
                        .method(Method::POST)
                        .uri("/")
                        .header(header::CONTENT_TYPE, content_type)
                        .body(Body::from(body))
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(resp.status(), StatusCode::OK, "{content_type}");

            let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
                .await
                .unwrap();
            assert_eq!(&bytes[..], b"alice:s3cr3t!", "{content_type}");
        }

        let resp = app
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/")
                    .header(
                        header::CONTENT_TYPE,
                        "application/x-www-form-urlencoded",
                    )
                    .body(Body::from("username=alice"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert!(resp.status().is_client_error());
    }
}
