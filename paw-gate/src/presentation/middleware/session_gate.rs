use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use tracing::{debug, info};

use crate::domain::gate::{GateDecision, SessionState};
use crate::infrastructure::jwt::SessionClaims;
use crate::presentation::AppState;
use crate::presentation::app_error::AppError;
use crate::presentation::cookies::access_token;

/// Проверенная сессия, которую gate кладёт в extensions запроса.
#[derive(Debug, Clone)]
pub(crate) struct AuthenticatedUser {
    pub(crate) claims: SessionClaims,
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or(AppError::Unauthorized)
    }
}

/// Gate перед страницами: проверяет cookie `accessToken` и роль.
pub(crate) async fn session_gate(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    if !state.policy.is_gated(&path) {
        return next.run(request).await;
    }

    let claims = access_token(&jar).and_then(|token| match state.jwt.verify_token(token) {
        Ok(claims) => Some(claims),
        Err(err) => {
            debug!(path = %path, error = %err, "session token rejected");
            None
        }
    });

    let session = match &claims {
        Some(claims) => SessionState::Authenticated {
            role: claims.role.as_str(),
        },
        None => SessionState::Unauthenticated,
    };
    let decision = state.policy.decide(&path, session);

    match (decision.location(), claims) {
        (Some(location), _) => {
            info!(path = %path, ?decision, location, "gate redirect");
            Redirect::temporary(location).into_response()
        }
        (None, claims) => {
            if let Some(claims) = claims {
                request
                    .extensions_mut()
                    .insert(AuthenticatedUser { claims });
            }
            debug!(path = %path, "gate passed");
            next.run(request).await
        }
    }
}
