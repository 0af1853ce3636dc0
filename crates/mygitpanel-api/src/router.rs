use axum::routing::{delete, get};
use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;

use crate::handlers;
use crate::state::AppState;

/// Builds the full router. A [`CatchPanicLayer`] recovers handler panics
/// into a 500 with the request path logged (spec §7's panic policy).
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/prs", get(handlers::list_prs))
        .route("/api/v1/prs/attention", get(handlers::list_attention_prs))
        .route(
            "/api/v1/repos/{owner}/{repo}/prs/{number}",
            get(handlers::get_pr),
        )
        .route(
            "/api/v1/repos",
            get(handlers::list_repos).post(handlers::add_repo),
        )
        .route("/api/v1/repos/{owner}/{repo}", delete(handlers::delete_repo))
        .route("/api/v1/health", get(handlers::health))
        .layer(CatchPanicLayer::custom(handle_panic))
        .with_state(state)
}

fn handle_panic(
    err: Box<dyn std::any::Any + Send + 'static>,
) -> axum::response::Response {
    let message = if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    };

    log::error!("handler panicked: {message}");
    axum::response::IntoResponse::into_response((
        axum::http::StatusCode::INTERNAL_SERVER_ERROR,
        axum::Json(serde_json::json!({ "error": "internal server error" })),
    ))
}
