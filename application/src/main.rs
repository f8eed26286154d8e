use std::{
    future::IntoFuture as _,
    io,
    sync::{Arc, OnceLock},
    time,
};

use application::{api, gate, Args, Config, Cookies, Gate, Uploads};
use axum::{
    body::Body, extract::MatchedPath, middleware, Extension, Router,
};
use axum_client_ip::InsecureClientIp;
use futures::{future, TryFutureExt as _};
use service::{
    infra::{postgres, Postgres},
    Service,
};
use tokio::net::TcpListener;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing as log;
use tracing_subscriber::{
    filter::filter_fn,
    layer::{Layer as _, SubscriberExt as _},
    util::SubscriberInitExt as _,
};

const STDERR_LEVELS: &[log::Level] = &[log::Level::WARN, log::Level::ERROR];

static LOG_LEVEL: OnceLock<log::Level> = OnceLock::new();

postgres::embed_migrations!("../migrations");

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_ansi(true)
                .with_thread_names(true)
                .with_writer(io::stdout)
                .with_filter(filter_fn(|meta| {
                    meta.is_span()
                        || (!STDERR_LEVELS.contains(meta.level()))
                            && LOG_LEVEL
                                .get()
                                .copied()
                                .unwrap_or(log::Level::INFO)
                                >= *meta.level()
                })),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_ansi(true)
                .with_thread_names(true)
                .with_writer(io::stderr)
                .with_filter(filter_fn(|meta| {
                    meta.is_span()
                        || (STDERR_LEVELS.contains(meta.level()))
                            && LOG_LEVEL
                                .get()
                                .copied()
                                .unwrap_or(log::Level::INFO)
                                >= *meta.level()
                })),
        )
        .init();

    _ = start().await;
}

async fn start() -> Result<(), ()> {
    let Args { config } = Args::parse().map_err(|e| {
        log::error!("failed to parse command line arguments: {e}");
    })?;

    let config = Config::new(config).map_err(|e| {
        log::error!("failed to load `Config`: {e}");
    })?;

    LOG_LEVEL
        .set(config.log.level.into())
        .unwrap_or_else(|_| unreachable!("first initialization"));

    if config.session.has_default_secret() {
        log::warn!(
            "session tokens are signed with the default secret, \
             set `session.secret` for any real deployment",
        );
    }

    let service_config = config.service().map_err(|e| {
        log::error!("invalid `Service` configuration: {e}");
    })?;

    let Config {
        server,
        session,
        uploads,
        gate,
        pages,
        postgres,
        ..
    } = config;

    let postgres_config = postgres.into();
    let mut postgres = Postgres::new(&postgres_config).map_err(|e| {
        log::error!("failed to initialize `Postgres` client: {e}");
    })?;

    migrations::runner()
        .run_async(&mut postgres)
        .await
        .map_err(|e| {
            log::error!("failed to run database migrations: {e}");
        })?;

    let service = Service::new(service_config, postgres);

    tokio::fs::create_dir_all(uploads.directory.join("products"))
        .await
        .map_err(|e| {
            log::error!(
                "failed to create uploads directory `{}`: {e}",
                uploads.directory.display(),
            );
        })?;

    let cors = api::cors(&server.cors).map_err(|e| {
        log::error!("invalid CORS origins: {e}");
    })?;

    let app = api::router(
        Cookies::new(&session.cookie, session.ttl),
        Uploads::new(&uploads),
    )
    .layer(Extension(service))
    .layer(cors)
    .layer(
        TraceLayer::new_for_http()
            .make_span_with(make_span)
            .on_response(log_response),
    );

    let listener = TcpListener::bind((server.host.clone(), server.port))
        .await
        .map_err(|e| {
            log::error!(
                "failed to listen on `{}:{}`: {e}",
                server.host,
                server.port,
            );
        })?;

    log::info!("listening on `{}:{}`", server.host, server.port);

    let api = axum::serve(listener, app)
        .into_future()
        .map_err(|e| log::error!("webserver failed: {e}"));

    let Some(pages) = pages else {
        return api.await;
    };

    let pages_app = Router::new()
        .fallback_service(ServeDir::new(&pages.directory))
        .layer(middleware::from_fn_with_state(
            Arc::new(Gate::new(gate)),
            gate::middleware,
        ))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(make_span)
                .on_response(log_response),
        );

    let listener = TcpListener::bind((server.host.clone(), pages.port))
        .await
        .map_err(|e| {
            log::error!(
                "failed to listen on `{}:{}`: {e}",
                server.host,
                pages.port,
            );
        })?;

    log::info!(
        "serving pages from `{}` on `{}:{}`",
        pages.directory.display(),
        server.host,
        pages.port,
    );

    future::try_join(
        api,
        axum::serve(listener, pages_app)
            .into_future()
            .map_err(|e| log::error!("pages server failed: {e}")),
    )
    .await
    .map(drop)
}

/// Creates a [`tracing::Span`] of the provided HTTP request.
fn make_span(r: &http::Request<Body>) -> tracing::Span {
    tracing::info_span!(
        "HTTP request",
        http.client_ip = InsecureClientIp::from(r.headers(), r.extensions())
            .map(|ip| ip.0.to_string())
            .ok(),
        http.flavor = ?r.version(),
        http.host = r.uri().host(),
        http.method = r.method().as_str(),
        http.route = r
            .extensions()
            .get::<MatchedPath>()
            .map(MatchedPath::as_str),
        http.scheme = r.uri().scheme().map(http::uri::Scheme::as_str),
        http.target = r
            .uri()
            .path_and_query()
            .map(http::uri::PathAndQuery::as_str),
        http.user_agent = r
            .headers()
            .get("User-Agent")
            .and_then(|h| h.to_str().ok()),
        http.status_code = tracing::field::Empty,
    )
}

/// Logs the provided HTTP response in its request `span`.
fn log_response(
    r: &http::Response<Body>,
    dur: time::Duration,
    span: &tracing::Span,
) {
    _ = span.record(
        "http.status_code",
        tracing::field::display(r.status().as_u16()),
    );

    if r.status().is_server_error() {
        tracing::error!(duration = format!("{}ms", dur.as_millis()));
    } else if r.status().is_client_error() {
        tracing::warn!(duration = format!("{}ms", dur.as_millis()));
    } else {
        tracing::info!(duration = format!("{}ms", dur.as_millis()));
    }
}
