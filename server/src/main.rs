mod api;
mod auth;
mod cache;
mod catalog;
mod config;
mod db;
mod models;
mod schema;
mod state;
mod store;
mod telemetry;
#[cfg(test)]
mod testing;

use std::env;
use std::sync::Arc;

use anyhow::Context;
use axum::extract::MatchedPath;
use axum::http::Request;
use axum::Router;
use larder_core::BatchImporter;
use tower_http::trace::TraceLayer;
use tracing::Span;
use utoipa_swagger_ui::SwaggerUi;

use crate::cache::ListingCache;
use crate::config::ServerConfig;
use crate::state::AppState;
use crate::store::PgStore;

/// Print a fresh bearer token for `username`, creating the user if needed.
fn issue_token(username: &str) -> anyhow::Result<()> {
    let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let pool = db::create_pool(&database_url)?;
    let mut conn = pool.get().context("Failed to get DB connection")?;
    let token = auth::issue_session(&mut conn, username)
        .with_context(|| format!("Failed to issue session for {}", username))?;
    println!("{}", token);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();

    // Check for --openapi flag to dump spec and exit
    if args.iter().any(|arg| arg == "--openapi") {
        let spec = api::openapi().to_pretty_json()?;
        println!("{}", spec);
        return Ok(());
    }

    if let Some(pos) = args.iter().position(|arg| arg == "--issue-token") {
        let username = args
            .get(pos + 1)
            .context("usage: larder-server --issue-token <username>")?;
        return issue_token(username);
    }

    telemetry::init_telemetry()?;

    let config = ServerConfig::from_env()?;
    let pool = db::create_pool(&config.database_url)?;
    let store = Arc::new(PgStore::new(pool));
    let listings = Arc::new(ListingCache::new());

    let importer = BatchImporter::new(
        config.build_extractors()?,
        config.build_generator()?,
        store.clone(),
        listings.clone(),
        config.importer.clone(),
    );

    let state = AppState {
        importer,
        sessions: store.clone(),
        catalog: store,
        listings,
    };

    let swagger_ui = SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", api::openapi());

    let app = Router::new()
        .merge(api::router())
        .merge(swagger_ui)
        .with_state(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<_>| {
                    let matched_path = request
                        .extensions()
                        .get::<MatchedPath>()
                        .map(MatchedPath::as_str)
                        .unwrap_or(request.uri().path());

                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        path = %matched_path,
                    )
                })
                .on_request(|_request: &Request<_>, _span: &Span| {})
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     _span: &Span| {
                        let status = response.status().as_u16();
                        if status >= 500 {
                            tracing::error!(
                                status = %status,
                                latency_ms = %latency.as_millis(),
                                "request failed with server error"
                            );
                        } else {
                            tracing::info!(
                                status = %status,
                                latency_ms = %latency.as_millis(),
                                "request completed"
                            );
                        }
                    },
                )
                .on_failure(
                    |error: tower_http::classify::ServerErrorsFailureClass,
                     latency: std::time::Duration,
                     _span: &Span| {
                        tracing::error!(
                            error = %error,
                            latency_ms = %latency.as_millis(),
                            "request failed"
                        );
                    },
                ),
        );

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;

    let local_addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", local_addr);
    tracing::info!(
        concurrency = config.importer.concurrency,
        stage_timeout_secs = config.importer.stage_timeout.as_secs(),
        "Batch import configured"
    );
    tracing::info!("Swagger UI available at http://{}/swagger-ui/", local_addr);

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
