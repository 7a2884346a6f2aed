use async_trait::async_trait;
use paw_client::{AuthResponse, LoginRequest, PawClient, PawClientError, RegisterRequest, Session};

use crate::application::auth_service::AuthBackend;

/// Вход и регистрация через REST API бэкенда.
///
/// На каждый запрос создаётся клиент с пустой сессией в памяти: gate не
/// хранит токены пользователей, токен уходит только в cookie ответа.
pub(crate) struct PawApiBackend {
    api_url: String,
}

impl PawApiBackend {
    pub(crate) fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
        }
    }

    fn client(&self) -> Result<PawClient, PawClientError> {
        PawClient::new(self.api_url.clone(), Session::in_memory())
    }
}

#[async_trait]
impl AuthBackend for PawApiBackend {
    async fn login(&self, req: LoginRequest) -> Result<AuthResponse, PawClientError> {
        self.client()?.login(&req).await
    }

    async fn register(&self, req: RegisterRequest) -> Result<AuthResponse, PawClientError> {
        self.client()?.register(&req).await
    }
}
