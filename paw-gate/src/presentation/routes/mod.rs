use axum::{Router, middleware, routing::get};

use super::AppState;
use super::handlers::health::healthz;
use super::middleware::session_gate::session_gate;

pub(crate) mod auth;
pub(crate) mod pages;

pub(crate) fn router(state: AppState) -> Router {
    // Gate стоит только перед страницами; auth-действия и healthz открыты.
    let pages = pages::router().layer(middleware::from_fn_with_state(
        state.clone(),
        session_gate,
    ));

    Router::new()
        .route("/healthz", get(healthz))
        .nest("/auth", auth::router())
        .merge(pages)
        .with_state(state)
}
