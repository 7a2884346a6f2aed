use std::sync::Arc;

use crate::application::auth_service::AuthService;
use crate::domain::gate::AccessPolicy;
use crate::infrastructure::jwt::JwtService;

pub(crate) mod app_error;
pub(crate) mod cookies;
pub(crate) mod handlers;
pub(crate) mod middleware;
pub(crate) mod openapi;
pub(crate) mod routes;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) auth_service: Arc<AuthService>,
    pub(crate) jwt: Arc<JwtService>,
    pub(crate) policy: Arc<AccessPolicy>,
    pub(crate) cookies: cookies::CookieSettings,
}

impl AppState {
    pub(crate) fn new(
        auth_service: Arc<AuthService>,
        jwt: Arc<JwtService>,
        cookies: cookies::CookieSettings,
    ) -> Self {
        Self {
            auth_service,
            jwt,
            policy: Arc::new(AccessPolicy::default()),
            cookies,
        }
    }
}
