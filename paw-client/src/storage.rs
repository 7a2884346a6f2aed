use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use serde::{Deserialize, Serialize};

use crate::error::{PawClientError, PawClientResult};
use crate::models::AuthUser;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
/// Сохранённая сессия: bearer-токен и денормализованный профиль.
pub struct StoredSession {
    /// Bearer-токен.
    pub token: Option<String>,
    /// Профиль пользователя из ответа на вход.
    pub profile: Option<AuthUser>,
}

/// Хранилище сессии.
///
/// Реализации обязаны отдавать актуальное состояние на каждый `load`:
/// `Session` не держит копию токена между запросами.
pub trait TokenStore: Send + Sync {
    /// Читает сохранённую сессию.
    fn load(&self) -> PawClientResult<StoredSession>;
    /// Перезаписывает сессию.
    fn save(&self, session: &StoredSession) -> PawClientResult<()>;
    /// Удаляет сессию.
    fn clear(&self) -> PawClientResult<()>;
}

#[derive(Debug, Default)]
/// Хранилище в памяти процесса.
pub struct MemoryTokenStore {
    inner: RwLock<StoredSession>,
}

impl MemoryTokenStore {
    /// Пустое хранилище.
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> PawClientResult<StoredSession> {
        Ok(self
            .inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn save(&self, session: &StoredSession) -> PawClientResult<()> {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = session.clone();
        Ok(())
    }

    fn clear(&self) -> PawClientResult<()> {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = StoredSession::default();
        Ok(())
    }
}

#[derive(Debug, Clone)]
/// Хранилище в JSON-файле (аналог cookie + localStorage для CLI).
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    /// Хранилище по указанному пути. Файл создаётся при первом `save`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Путь к файлу сессии.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> PawClientResult<StoredSession> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Ok(StoredSession::default());
            }
            Err(err) => return Err(PawClientError::Storage(err.to_string())),
        };
        Ok(parse_session(&raw))
    }

    fn save(&self, session: &StoredSession) -> PawClientResult<()> {
        let raw = serde_json::to_string_pretty(session)
            .map_err(|err| PawClientError::Storage(err.to_string()))?;
        fs::write(&self.path, raw).map_err(|err| PawClientError::Storage(err.to_string()))
    }

    fn clear(&self) -> PawClientResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(PawClientError::Storage(err.to_string())),
        }
    }
}

pub(crate) fn parse_token(raw: &str) -> Option<String> {
    let token = raw.trim().to_string();
    if token.is_empty() {
        return None;
    }
    Some(token)
}

// Повреждённый файл считается отсутствующей сессией.
fn parse_session(raw: &str) -> StoredSession {
    let stored = serde_json::from_str::<StoredSession>(raw).unwrap_or_default();
    StoredSession {
        token: stored.token.as_deref().and_then(parse_token),
        profile: stored.profile,
    }
}
