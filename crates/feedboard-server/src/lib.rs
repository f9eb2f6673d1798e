//! # Feedboard Server
//!
//! Session-authenticated dashboard over the live feeds in `feedboard-feed`.
//!
//! | Route                    | Access    | Purpose                              |
//! |--------------------------|-----------|--------------------------------------|
//! | `GET /login`, `/signup`  | public    | HTML forms                           |
//! | `POST /login`, `/signup` | public    | account JSON endpoints               |
//! | `GET /logout`            | public    | end the session, back to `/login`    |
//! | `GET /`                  | session   | dashboard page                       |
//! | `GET /api/data`          | session   | static item list                     |
//! | `POST /api/submit`       | session   | echo a form field                    |
//! | `GET /api/feeds`         | session   | live subscriber counts               |
//! | `POST /send`             | session   | publish to the message feed          |
//! | `GET /stream`            | session   | SSE message feed                     |
//! | `GET /chart-stream-line` | session   | SSE line chart                       |
//! | `GET /chart-stream-bar`  | session   | SSE bar chart                        |
//! | `GET /feeds/{feed}`      | session   | SSE for any feed by name             |
//! | `GET /assets/{*path}`    | public    | embedded JS/CSS                      |
//!
//! Requests without a valid session are redirected to `/login`.

use std::sync::Arc;

use axum::{
    Router,
    http::{Method, header::CONTENT_TYPE},
    routing::{get, post},
};
use tokio::net::TcpListener;
use tokio::signal::{self, ctrl_c};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;

pub use config::ServerConfig;
pub use error::{AppError, ServerError};
pub use state::AppState;

use routes::{accounts, api, feeds, pages};

/// Build the dashboard router over `state`
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE]);

    Router::new()
        .route("/", get(pages::dashboard))
        .route("/login", get(pages::login_page).post(accounts::login))
        .route("/signup", get(pages::signup_page).post(accounts::signup))
        .route("/logout", get(accounts::logout))
        .route("/api/data", get(api::data))
        .route("/api/submit", post(api::submit))
        .route("/api/feeds", get(api::feeds))
        .route("/send", post(feeds::send))
        .route("/stream", get(feeds::stream_messages))
        .route("/chart-stream-line", get(feeds::stream_line))
        .route("/chart-stream-bar", get(feeds::stream_bar))
        .route("/feeds/{feed}", get(feeds::stream_named))
        .route("/assets/{*path}", get(pages::asset))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Bind and serve until Ctrl-C or SIGTERM
pub async fn serve(config: ServerConfig) -> Result<(), ServerError> {
    let bind = config.server.bind;
    let state = AppState::new(config)?;
    let app = router(Arc::clone(&state));

    let listener = TcpListener::bind(bind).await?;
    info!(address = %listener.local_addr()?, "Dashboard listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(state))
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Resolves on the first shutdown signal, after cancelling every live stream
/// so open SSE connections drain.
async fn shutdown_signal(state: Arc<AppState>) {
    let ctrl_c = async {
        match ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                warn!(error = %e, "Failed to install Ctrl+C handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                warn!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    state.registry.shutdown();
}
