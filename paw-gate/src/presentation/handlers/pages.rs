use axum::{Json, http::Uri};
use serde::Serialize;

use crate::infrastructure::jwt::SessionClaims;
use crate::presentation::middleware::session_gate::AuthenticatedUser;

/// Описание страницы вместо разметки.
#[derive(Debug, Serialize)]
pub(crate) struct PageDto {
    page: &'static str,
    path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    session: Option<SessionDto>,
}

/// Публичные claims сессии.
#[derive(Debug, Serialize)]
pub(crate) struct SessionDto {
    id: String,
    role: String,
    name: Option<String>,
    email: Option<String>,
    phone: Option<String>,
}

impl From<SessionClaims> for SessionDto {
    fn from(claims: SessionClaims) -> Self {
        Self {
            id: claims.id,
            role: claims.role,
            name: claims.name,
            email: claims.email,
            phone: claims.phone,
        }
    }
}

fn page(page: &'static str, uri: &Uri, session: Option<AuthenticatedUser>) -> Json<PageDto> {
    Json(PageDto {
        page,
        path: uri.path().to_string(),
        session: session.map(|user| user.claims.into()),
    })
}

pub(crate) async fn home(uri: Uri) -> Json<PageDto> {
    page("home", &uri, None)
}

pub(crate) async fn login_page(uri: Uri) -> Json<PageDto> {
    page("login", &uri, None)
}

pub(crate) async fn register_page(uri: Uri) -> Json<PageDto> {
    page("register", &uri, None)
}

pub(crate) async fn user_dashboard(user: AuthenticatedUser, uri: Uri) -> Json<PageDto> {
    page("user-dashboard", &uri, Some(user))
}

pub(crate) async fn admin_dashboard(user: AuthenticatedUser, uri: Uri) -> Json<PageDto> {
    page("admin-dashboard", &uri, Some(user))
}
