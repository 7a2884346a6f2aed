use std::sync::Arc;

use anyhow::Result;
use tracing::info;

mod application;
mod data;
mod domain;
mod infrastructure;
mod presentation;
mod server;

use application::auth_service::AuthService;
use data::paw_backend::PawApiBackend;
use infrastructure::jwt::JwtService;
use infrastructure::logging::init_logging;
use infrastructure::settings::Settings;
use presentation::AppState;
use presentation::cookies::CookieSettings;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let settings = Settings::from_env()?;

    init_logging(&settings.log_level)?;

    let backend = Arc::new(PawApiBackend::new(settings.api_url.clone()));
    let auth_service = Arc::new(AuthService::new(backend));
    let jwt = Arc::new(JwtService::new(&settings.jwt_secret));
    let state = AppState::new(auth_service, jwt, CookieSettings::from(&settings));

    info!(api_url = %settings.api_url, "starting session gate");
    server::run_http(&settings, state).await
}
