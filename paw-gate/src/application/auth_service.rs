use std::sync::Arc;

use async_trait::async_trait;
use paw_client::{AuthResponse, LoginRequest, PawClientError, RegisterRequest};
use tracing::{info, warn};

/// Бэкенд, выпускающий токены. В gate это REST API, в тестах фейк.
#[async_trait]
pub(crate) trait AuthBackend: Send + Sync {
    async fn login(&self, req: LoginRequest) -> Result<AuthResponse, PawClientError>;
    async fn register(&self, req: RegisterRequest) -> Result<AuthResponse, PawClientError>;
}

pub(crate) struct AuthService {
    backend: Arc<dyn AuthBackend>,
}

impl AuthService {
    pub(crate) fn new(backend: Arc<dyn AuthBackend>) -> Self {
        Self { backend }
    }

    pub(crate) async fn login(&self, req: LoginRequest) -> Result<AuthResponse, PawClientError> {
        let email = req.email.trim().to_lowercase();
        let req = LoginRequest { email, ..req };

        let auth = self.backend.login(req).await.inspect_err(|err| {
            warn!(error = %err, "backend rejected login");
        })?;
        let auth = ensure_token(auth, "Login failed")?;

        info!(role = %auth.user.role, "login accepted");
        Ok(auth)
    }

    pub(crate) async fn register(
        &self,
        req: RegisterRequest,
    ) -> Result<AuthResponse, PawClientError> {
        let req = RegisterRequest {
            name: req.name.trim().to_string(),
            email: req.email.trim().to_lowercase(),
            ..req
        };

        let auth = self.backend.register(req).await.inspect_err(|err| {
            warn!(error = %err, "backend rejected registration");
        })?;
        let auth = ensure_token(auth, "Registration failed")?;

        info!(role = %auth.user.role, "registration accepted");
        Ok(auth)
    }
}

// Пустой токен не должен попасть в cookie.
fn ensure_token(auth: AuthResponse, fallback: &str) -> Result<AuthResponse, PawClientError> {
    if auth.token.trim().is_empty() {
        return Err(PawClientError::Api {
            status: 502,
            message: fallback.to_string(),
        });
    }
    Ok(auth)
}
