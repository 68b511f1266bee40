//! Axum application assembly and serving.

use std::net::SocketAddr;

use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::limit::RequestBodyLimitLayer;
use tracing::info;

use crate::handlers::{agents, channels, chat, conversations, models, roots, triggers, webhook};
use crate::state::AppState;

/// Build the full application router.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/agents", post(agents::create).get(agents::list))
        .route(
            "/agents/{id}",
            get(agents::get).put(agents::update).delete(agents::delete),
        )
        .route("/conversations", post(conversations::create).get(conversations::list))
        .route(
            "/conversations/{id}",
            get(conversations::get).delete(conversations::delete),
        )
        .route("/conversations/{id}/messages", get(conversations::messages))
        .route("/conversations/{id}/chat", post(chat::chat))
        .route("/conversations/{id}/events", get(chat::events))
        .route("/triggers", post(triggers::create).get(triggers::list))
        .route(
            "/triggers/{id}",
            get(triggers::get).put(triggers::update).delete(triggers::delete),
        )
        .route("/triggers/{id}/runs", get(triggers::runs))
        .route("/channels", post(channels::create).get(channels::list))
        .route(
            "/channels/{id}",
            get(channels::get).put(channels::update).delete(channels::delete),
        )
        .route("/roots", post(roots::create).get(roots::list))
        .route("/roots/{id}", get(roots::get).put(roots::update).delete(roots::delete))
        .route("/models", get(models::list));

    Router::new()
        .nest("/api", api)
        .route("/webhooks/trigger", post(webhook::trigger))
        .layer(RequestBodyLimitLayer::new(1024 * 1024))
        .with_state(state)
}

/// Bind and serve until the shutdown token fires.
pub async fn listen(
    state: AppState,
    port: u16,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    let bound = listener.local_addr()?;
    info!(addr = %bound, "blippy listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move {
            shutdown.cancelled().await;
            info!("server shutdown initiated");
        })
        .await
}
