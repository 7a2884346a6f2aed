use utoipa::OpenApi;

use crate::presentation::app_error::ErrorBody;
use crate::presentation::handlers::auth::{LoginDto, RegisterDto};
use crate::presentation::handlers::health::HealthzResponse;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::presentation::handlers::auth::login,
        crate::presentation::handlers::auth::register,
        crate::presentation::handlers::auth::logout,
        crate::presentation::handlers::health::healthz
    ),
    components(schemas(LoginDto, RegisterDto, ErrorBody, HealthzResponse)),
    tags(
        (name = "auth", description = "Session cookie actions"),
        (name = "health", description = "Liveness probe")
    )
)]
pub(crate) struct ApiDoc;
