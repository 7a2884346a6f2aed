//! Кэш ресурсов с чтением через кэш и инвалидацией после мутаций.
//!
//! Ключ записи: полный URL ресурса. Инвалидация помечает запись устаревшей и
//! отбрасывает текущую загрузку, следующее чтение идёт в сеть. Одновременные
//! чтения одного ключа разделяют один запрос.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use tracing::debug;

use crate::error::{PawClientError, PawClientResult};
use crate::models::{Post, User};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Кэшируемые ресурсы API.
pub enum Resource {
    /// Лента всех постов.
    Posts,
    /// Посты текущего пользователя.
    MyPosts,
    /// Профиль текущего пользователя.
    CurrentUser,
    /// Все пользователи (для администратора).
    AllUsers,
}

impl Resource {
    /// Путь ресурса относительно базового URL API.
    pub fn path(&self) -> &'static str {
        match self {
            Self::Posts => "/pet/posts",
            Self::MyPosts => "/pet/posts/MyContents",
            Self::CurrentUser => "/users/me",
            Self::AllUsers => "/users/allUsers",
        }
    }

    pub(crate) fn fetch_error(&self) -> &'static str {
        match self {
            Self::Posts => "Failed to fetch posts",
            Self::MyPosts => "Failed to fetch pet posts",
            Self::CurrentUser => "Failed to fetch user data",
            Self::AllUsers => "Failed to fetch users",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
/// Ключ записи кэша: полный URL ресурса.
pub struct CacheKey(String);

impl CacheKey {
    /// Ключ для ресурса относительно базового URL.
    pub fn new(base_url: &str, resource: Resource) -> Self {
        Self(crate::http_client::join_url(base_url, resource.path()))
    }

    /// URL ресурса.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone)]
/// Данные, хранящиеся в кэше.
pub enum CachedData {
    /// Список постов.
    Posts(Arc<Vec<Post>>),
    /// Один пользователь.
    User(Arc<User>),
    /// Список пользователей.
    Users(Arc<Vec<User>>),
}

impl CachedData {
    pub(crate) fn into_posts(self) -> PawClientResult<Arc<Vec<Post>>> {
        match self {
            Self::Posts(posts) => Ok(posts),
            _ => Err(PawClientError::Decode(
                "cached payload is not a post list".to_string(),
            )),
        }
    }

    pub(crate) fn into_user(self) -> PawClientResult<Arc<User>> {
        match self {
            Self::User(user) => Ok(user),
            _ => Err(PawClientError::Decode(
                "cached payload is not a user".to_string(),
            )),
        }
    }

    pub(crate) fn into_users(self) -> PawClientResult<Arc<Vec<User>>> {
        match self {
            Self::Users(users) => Ok(users),
            _ => Err(PawClientError::Decode(
                "cached payload is not a user list".to_string(),
            )),
        }
    }
}

#[derive(Debug, Clone, Default)]
/// Снимок состояния записи: данные, ошибка и флаги загрузки.
pub struct QueryState {
    /// Последние успешно загруженные данные (могут быть устаревшими).
    pub data: Option<CachedData>,
    /// Ошибка последней загрузки.
    pub error: Option<PawClientError>,
    /// Идёт ли сейчас загрузка.
    pub is_validating: bool,
    /// Помечена ли запись устаревшей.
    pub is_stale: bool,
}

impl QueryState {
    /// Данных ещё нет и ошибки тоже нет.
    pub fn is_loading(&self) -> bool {
        self.data.is_none() && self.error.is_none()
    }
}

type SharedFetch = Shared<BoxFuture<'static, PawClientResult<CachedData>>>;

#[derive(Default)]
struct CacheEntry {
    data: Option<CachedData>,
    error: Option<PawClientError>,
    stale: bool,
    in_flight: Option<(u64, SharedFetch)>,
}

impl CacheEntry {
    fn fresh_data(&self) -> Option<CachedData> {
        if self.stale {
            return None;
        }
        self.data.clone()
    }
}

#[derive(Default)]
/// Кэш ресурсов.
pub struct ResourceCache {
    entries: Mutex<HashMap<CacheKey, CacheEntry>>,
    next_fetch_id: AtomicU64,
}

impl ResourceCache {
    /// Пустой кэш.
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<CacheKey, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Возвращает свежие данные из кэша или загружает их через `fetch`.
    ///
    /// Если загрузка по этому ключу уже идёт, `fetch` не вызывается: читатель
    /// дожидается результата текущего запроса.
    pub async fn read<F>(&self, key: &CacheKey, fetch: F) -> PawClientResult<CachedData>
    where
        F: FnOnce() -> BoxFuture<'static, PawClientResult<CachedData>>,
    {
        let (fetch_id, shared) = {
            let mut entries = self.entries();
            let entry = entries.entry(key.clone()).or_default();

            if let Some(data) = entry.fresh_data() {
                debug!(key = %key, "cache hit");
                return Ok(data);
            }

            match &entry.in_flight {
                Some((id, shared)) => {
                    debug!(key = %key, "joining in-flight fetch");
                    (*id, shared.clone())
                }
                None => {
                    debug!(key = %key, "cache miss, fetching");
                    let id = self.next_fetch_id.fetch_add(1, Ordering::Relaxed);
                    let shared = fetch().shared();
                    entry.in_flight = Some((id, shared.clone()));
                    (id, shared)
                }
            }
        };

        let result = shared.await;
        self.settle(key, fetch_id, &result);
        result
    }

    fn settle(&self, key: &CacheKey, fetch_id: u64, result: &PawClientResult<CachedData>) {
        let mut entries = self.entries();
        let Some(entry) = entries.get_mut(key) else {
            return;
        };

        // Загрузка, отменённая инвалидацией, не делает запись свежей.
        match &entry.in_flight {
            Some((id, _)) if *id == fetch_id => {}
            _ => return,
        }
        entry.in_flight = None;

        match result {
            Ok(data) => {
                entry.data = Some(data.clone());
                entry.error = None;
                entry.stale = false;
            }
            Err(err) => {
                entry.error = Some(err.clone());
                entry.stale = true;
            }
        }
    }

    /// Помечает запись устаревшей; следующее чтение выполнит новый запрос.
    pub fn invalidate(&self, key: &CacheKey) {
        let mut entries = self.entries();
        if let Some(entry) = entries.get_mut(key) {
            entry.stale = true;
            entry.in_flight = None;
            debug!(key = %key, "cache entry invalidated");
        }
    }

    /// Удаляет все записи. Загрузки, начатые до очистки, в кэш не попадут.
    pub fn clear(&self) {
        let mut entries = self.entries();
        let dropped = entries.len();
        entries.clear();
        debug!(dropped, "cache cleared");
    }

    /// Снимок состояния записи.
    pub fn state(&self, key: &CacheKey) -> QueryState {
        let entries = self.entries();
        match entries.get(key) {
            Some(entry) => QueryState {
                data: entry.data.clone(),
                error: entry.error.clone(),
                is_validating: entry.in_flight.is_some(),
                is_stale: entry.stale,
            },
            None => QueryState::default(),
        }
    }
}
