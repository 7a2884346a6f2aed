use axum::{Router, routing::get};

use crate::presentation::AppState;
use crate::presentation::handlers::pages::{
    admin_dashboard, home, login_page, register_page, user_dashboard,
};

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(home))
        .route("/login", get(login_page))
        .route("/register", get(register_page))
        .route("/user", get(user_dashboard))
        .route("/user/{*rest}", get(user_dashboard))
        .route("/admin", get(admin_dashboard))
        .route("/admin/{*rest}", get(admin_dashboard))
}
