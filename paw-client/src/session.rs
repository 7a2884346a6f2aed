use std::sync::Arc;

use tracing::warn;

use crate::error::PawClientResult;
use crate::models::AuthUser;
use crate::storage::{MemoryTokenStore, StoredSession, TokenStore};

#[derive(Clone)]
/// Контекст сессии, который получает каждый сетевой вызов.
///
/// Единственный путь чтения токена: значение берётся из хранилища на каждый
/// запрос, поэтому выход из аккаунта сразу виден всем запросам.
pub struct Session {
    store: Arc<dyn TokenStore>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("authenticated", &self.token().is_some())
            .finish()
    }
}

impl Session {
    /// Сессия поверх произвольного хранилища.
    pub fn new(store: impl TokenStore + 'static) -> Self {
        Self {
            store: Arc::new(store),
        }
    }

    /// Пустая сессия в памяти процесса.
    pub fn in_memory() -> Self {
        Self::new(MemoryTokenStore::new())
    }

    fn snapshot(&self) -> StoredSession {
        match self.store.load() {
            Ok(stored) => stored,
            Err(err) => {
                // Нечитаемая сессия равносильна её отсутствию.
                warn!(error = %err, "failed to load session, treating as anonymous");
                StoredSession::default()
            }
        }
    }

    /// Текущий bearer-токен.
    pub fn token(&self) -> Option<String> {
        self.snapshot().token
    }

    /// Денормализованный профиль пользователя.
    pub fn profile(&self) -> Option<AuthUser> {
        self.snapshot().profile
    }

    /// Идентификатор текущего пользователя, если он известен.
    pub fn viewer_id(&self) -> Option<String> {
        self.profile().and_then(|profile| profile.id)
    }

    /// Устанавливает токен вручную, сохраняя профиль.
    pub fn set_token(&self, token: impl Into<String>) -> PawClientResult<()> {
        let mut stored = self.snapshot();
        stored.token = crate::storage::parse_token(&token.into());
        self.store.save(&stored)
    }

    pub(crate) fn establish(&self, token: &str, profile: AuthUser) -> PawClientResult<()> {
        self.store.save(&StoredSession {
            token: crate::storage::parse_token(token),
            profile: Some(profile),
        })
    }

    /// Удаляет токен и профиль.
    pub fn clear(&self) -> PawClientResult<()> {
        self.store.clear()
    }
}
