use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use paw_client::PawClientError;
use serde::Serialize;
use thiserror::Error;
use tracing::error;
use utoipa::ToSchema;
use validator::ValidationErrors;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error(transparent)]
    Backend(#[from] PawClientError),

    #[error("validation error: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("unauthorized")]
    Unauthorized,
}

pub(crate) type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Serialize, ToSchema)]
pub(crate) struct ErrorBody {
    pub(crate) message: String,
}

impl AppError {
    fn status_and_message(self) -> (StatusCode, String) {
        match self {
            AppError::Backend(err) => match err {
                // Отказ бэкенда отдаётся клиенту с тем же статусом и сообщением.
                PawClientError::Api { status, message } => (
                    StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY),
                    message,
                ),
                PawClientError::Validation(message) => (StatusCode::BAD_REQUEST, message),
                PawClientError::MissingToken => {
                    (StatusCode::UNAUTHORIZED, "unauthorized".to_string())
                }
                PawClientError::Network(_) | PawClientError::Decode(_) => {
                    error!(error = %err, "backend call failed");
                    (StatusCode::BAD_GATEWAY, "backend unavailable".to_string())
                }
                PawClientError::Storage(_) => {
                    error!(error = %err, "session storage failed");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "internal error".to_string(),
                    )
                }
            },
            AppError::Validation(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized".to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        (status, Json(ErrorBody { message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_rejection_keeps_status_and_message() {
        let (status, message) = AppError::from(PawClientError::Api {
            status: 401,
            message: "Invalid credentials".to_string(),
        })
        .status_and_message();
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(message, "Invalid credentials");
    }

    #[test]
    fn transport_failures_are_hidden_behind_bad_gateway() {
        let (status, message) =
            AppError::from(PawClientError::Network("connection refused".to_string()))
                .status_and_message();
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(message, "backend unavailable");
    }

    #[test]
    fn invalid_backend_status_falls_back_to_bad_gateway() {
        let (status, _) = AppError::from(PawClientError::Api {
            status: 42,
            message: "odd".to_string(),
        })
        .status_and_message();
        assert_eq!(status, StatusCode::BAD_GATEWAY);
    }
}
