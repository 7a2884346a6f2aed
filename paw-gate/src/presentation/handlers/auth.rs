use axum::{Json, extract::State, response::Redirect};
use axum_extra::extract::cookie::CookieJar;
use paw_client::{LoginRequest, RegisterRequest};
use serde::Deserialize;
use tracing::info;
use utoipa::ToSchema;
use validator::Validate;

use crate::domain::gate::LOGIN_PATH;
use crate::presentation::AppState;
use crate::presentation::app_error::AppResult;
use crate::presentation::cookies::{clear_session, session_cookie};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub(crate) struct LoginDto {
    #[validate(email)]
    pub(crate) email: String,
    #[validate(length(min = 1))]
    pub(crate) password: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub(crate) struct RegisterDto {
    #[validate(length(min = 1, max = 100))]
    pub(crate) name: String,
    #[validate(email)]
    pub(crate) email: String,
    #[validate(length(min = 6, max = 128))]
    pub(crate) password: String,
    pub(crate) phone: Option<String>,
    pub(crate) address: Option<String>,
}

#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "auth",
    request_body = LoginDto,
    responses(
        (status = 303, description = "Logged in; `accessToken` cookie set, redirect to the role landing page"),
        (status = 400, description = "Validation error", body = crate::presentation::app_error::ErrorBody),
        (status = 401, description = "Invalid credentials", body = crate::presentation::app_error::ErrorBody),
        (status = 502, description = "Backend unavailable", body = crate::presentation::app_error::ErrorBody)
    )
)]
pub(crate) async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(dto): Json<LoginDto>,
) -> AppResult<(CookieJar, Redirect)> {
    dto.validate()?;

    let req = LoginRequest {
        email: dto.email,
        password: dto.password,
    };
    let auth = state.auth_service.login(req).await?;

    let landing = auth.landing_path();
    let jar = jar.add(session_cookie(state.cookies, auth.token));
    Ok((jar, Redirect::to(landing)))
}

#[utoipa::path(
    post,
    path = "/auth/register",
    tag = "auth",
    request_body = RegisterDto,
    responses(
        (status = 303, description = "Registered; `accessToken` cookie set, redirect to the role landing page"),
        (status = 400, description = "Validation error", body = crate::presentation::app_error::ErrorBody),
        (status = 409, description = "User already exists", body = crate::presentation::app_error::ErrorBody),
        (status = 502, description = "Backend unavailable", body = crate::presentation::app_error::ErrorBody)
    )
)]
pub(crate) async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(dto): Json<RegisterDto>,
) -> AppResult<(CookieJar, Redirect)> {
    dto.validate()?;

    let req = RegisterRequest {
        name: dto.name,
        email: dto.email,
        password: dto.password,
        phone: dto.phone.filter(|phone| !phone.trim().is_empty()),
        address: dto.address.filter(|address| !address.trim().is_empty()),
    };
    let auth = state.auth_service.register(req).await?;

    let landing = auth.landing_path();
    let jar = jar.add(session_cookie(state.cookies, auth.token));
    Ok((jar, Redirect::to(landing)))
}

#[utoipa::path(
    post,
    path = "/auth/logout",
    tag = "auth",
    responses((status = 303, description = "Session cookies removed, redirect to /login"))
)]
pub(crate) async fn logout(jar: CookieJar) -> (CookieJar, Redirect) {
    info!("logout");
    (clear_session(jar), Redirect::to(LOGIN_PATH))
}
