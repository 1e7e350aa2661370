//! Axum-based HTTP surface — serves the tutoring API under `/api/`.
//!
//! The transport layer is deliberately thin: handlers validate input,
//! delegate to [`TutorRouter`], and map outcomes onto status codes. The
//! existing [`CancellationToken`] is wired to axum's graceful shutdown.
//!
//! ## URL layout
//!
//! ```text
//! GET  /api/health
//! POST /api/ask
//! GET  /api/users/{user_id}/conversations
//! GET  /api/users/{user_id}/conversations/{conversation_id}
//! ```

mod api;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::AppError;
use crate::router::TutorRouter;

/// Axum router state injected into every handler. Cheap to clone.
#[derive(Clone)]
pub(crate) struct ApiState {
    pub router: Arc<TutorRouter>,
}

/// Bind and drive the API event loop until `shutdown` is cancelled.
pub async fn run(
    bind_addr: &str,
    router: Arc<TutorRouter>,
    shutdown: CancellationToken,
) -> Result<(), AppError> {
    let state = ApiState { router };
    let app = Router::new()
        .route("/api/health", get(api::health))
        .route("/api/ask", post(api::ask))
        .route("/api/users/{user_id}/conversations", get(api::conversations))
        .route(
            "/api/users/{user_id}/conversations/{conversation_id}",
            get(api::conversation),
        )
        .with_state(state);

    let listener = TcpListener::bind(bind_addr)
        .await
        .map_err(|e| AppError::Config(format!("cannot bind {bind_addr}: {e}")))?;
    info!(addr = %bind_addr, "API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(AppError::Io)?;

    info!("API stopped");
    Ok(())
}
