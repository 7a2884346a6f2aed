//! Клиентская библиотека для REST API PawPedia.
//!
//! Предоставляет единый API (`PawClient`) поверх HTTP (`reqwest`):
//! - контекст сессии (`Session`) с единственным путём чтения токена;
//! - кэш ресурсов с дедупликацией одновременных чтений;
//! - мутации, которые после успешной записи инвалидируют затронутые ресурсы
//!   согласно таблице `Mutation::invalidates`;
//! - смена сессии (вход, регистрация, выход), которая очищает кэш целиком.
#![warn(missing_docs)]

mod cache;
mod error;
mod http_client;
mod models;
mod mutation;
mod session;
mod storage;
pub mod visibility;

use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use tracing::{debug, info, warn};
use validator::Validate;

pub use cache::{CacheKey, CachedData, QueryState, Resource, ResourceCache};
pub use error::{PawClientError, PawClientResult};
pub use models::{
    AuthResponse, AuthUser, Category, Comment, DashboardTotals, ImageUpload, LoginRequest,
    NewComment, NewPost, NutritionRequest, PaymentSession, Post, ProfileUpdate, RegisterRequest,
    Role, UnknownRole, User, UserRef, Vote, VoteTally,
};
pub use mutation::Mutation;
pub use session::Session;
pub use storage::{FileTokenStore, MemoryTokenStore, StoredSession, TokenStore};

use http_client::HttpClient;

/// Базовый URL API по умолчанию.
pub const DEFAULT_API_URL: &str = "http://localhost:5000/api";

#[derive(Clone)]
/// Клиент PawPedia: чтение через кэш и мутации с инвалидацией.
pub struct PawClient {
    http: HttpClient,
    cache: Arc<ResourceCache>,
}

impl PawClient {
    /// Создаёт клиент для API по `base_url` с заданной сессией.
    pub fn new(base_url: impl Into<String>, session: Session) -> PawClientResult<Self> {
        Ok(Self {
            http: HttpClient::new(base_url, session)?,
            cache: Arc::new(ResourceCache::new()),
        })
    }

    /// Контекст сессии клиента.
    pub fn session(&self) -> &Session {
        self.http.session()
    }

    /// Ключ кэша для ресурса.
    pub fn cache_key(&self, resource: Resource) -> CacheKey {
        CacheKey::new(self.http.base_url(), resource)
    }

    /// Текущее состояние ресурса в кэше (данные, ошибка, флаги загрузки).
    pub fn query_state(&self, resource: Resource) -> QueryState {
        self.cache.state(&self.cache_key(resource))
    }

    /// Выполняет вход и сохраняет токен и профиль в сессии.
    pub async fn login(&self, req: &LoginRequest) -> PawClientResult<AuthResponse> {
        req.validate()?;
        let auth = self.http.login(req).await?;
        self.start_session(&auth)?;
        info!(role = %auth.user.role, "logged in");
        Ok(auth)
    }

    /// Регистрирует пользователя и сохраняет токен и профиль в сессии.
    pub async fn register(&self, req: &RegisterRequest) -> PawClientResult<AuthResponse> {
        req.validate()?;
        let auth = self.http.register(req).await?;
        self.start_session(&auth)?;
        info!(role = %auth.user.role, "registered");
        Ok(auth)
    }

    fn start_session(&self, auth: &AuthResponse) -> PawClientResult<()> {
        self.session().establish(&auth.token, auth.user.clone())?;
        self.forget_session_data();
        Ok(())
    }

    /// Завершает сессию: удаляет токен и профиль.
    pub fn logout(&self) -> PawClientResult<()> {
        self.session().clear()?;
        self.forget_session_data();
        info!("logged out");
        Ok(())
    }

    /// Сбрасывает весь кэш вместе с текущими загрузками.
    ///
    /// Ответы сервера зависят от зрителя (список пользователей только для
    /// администратора, платное содержимое только для автора и оплативших),
    /// поэтому ни одна запись не переживает смену сессии.
    fn forget_session_data(&self) {
        self.cache.clear();
        debug!("cache cleared on session change");
    }

    async fn read(&self, resource: Resource) -> PawClientResult<CachedData> {
        let key = self.cache_key(resource);
        let http = self.http.clone();
        self.cache
            .read(&key, move || {
                async move { http.fetch_resource(resource).await }.boxed()
            })
            .await
    }

    /// Лента всех постов.
    pub async fn posts(&self) -> PawClientResult<Arc<Vec<Post>>> {
        self.read(Resource::Posts).await?.into_posts()
    }

    /// Посты текущего пользователя.
    pub async fn my_posts(&self) -> PawClientResult<Arc<Vec<Post>>> {
        self.read(Resource::MyPosts).await?.into_posts()
    }

    /// Профиль текущего пользователя.
    pub async fn current_user(&self) -> PawClientResult<Arc<User>> {
        self.read(Resource::CurrentUser).await?.into_user()
    }

    /// Все пользователи (для администратора).
    pub async fn all_users(&self) -> PawClientResult<Arc<Vec<User>>> {
        self.read(Resource::AllUsers).await?.into_users()
    }

    /// Счётчики пользователей и постов для панели администратора.
    pub async fn dashboard_totals(&self) -> PawClientResult<DashboardTotals> {
        let (users, posts) = futures::try_join!(self.all_users(), self.posts())?;
        Ok(DashboardTotals {
            users: users.len(),
            posts: posts.len(),
        })
    }

    fn invalidate_for(&self, mutation: Mutation) {
        for resource in mutation.invalidates() {
            self.cache.invalidate(&self.cache_key(*resource));
        }
    }

    async fn run_mutation<T, Fut>(&self, mutation: Mutation, write: Fut) -> PawClientResult<T>
    where
        Fut: Future<Output = PawClientResult<T>>,
    {
        match write.await {
            Ok(value) => {
                // Инвалидация только после подтверждённой записи.
                self.invalidate_for(mutation);
                info!(?mutation, "mutation applied");
                Ok(value)
            }
            Err(err) => {
                warn!(?mutation, error = %err, "mutation failed, cache left untouched");
                Err(err)
            }
        }
    }

    /// Создаёт пост от имени текущего пользователя.
    pub async fn create_post(&self, post: &NewPost) -> PawClientResult<Post> {
        post.validate()?;
        let author_id = match self.session().viewer_id() {
            Some(id) => id,
            None => self.current_user().await?.id.clone(),
        };
        self.run_mutation(Mutation::CreatePost, self.http.create_post(&author_id, post))
            .await
    }

    /// Удаляет пост.
    pub async fn delete_post(&self, post_id: &str) -> PawClientResult<()> {
        let post_id = require_id(post_id, "post id")?;
        self.run_mutation(Mutation::DeletePost, self.http.delete_post(post_id))
            .await
    }

    /// Голос "за". Повторный голос сервер обязан обработать идемпотентно.
    pub async fn upvote(&self, post_id: &str) -> PawClientResult<()> {
        let post_id = require_id(post_id, "post id")?;
        self.run_mutation(Mutation::Upvote, self.http.vote(post_id, Mutation::Upvote))
            .await
    }

    /// Голос "против".
    pub async fn downvote(&self, post_id: &str) -> PawClientResult<()> {
        let post_id = require_id(post_id, "post id")?;
        self.run_mutation(
            Mutation::Downvote,
            self.http.vote(post_id, Mutation::Downvote),
        )
        .await
    }

    /// Подписка на автора поста.
    pub async fn follow_author(&self, post_id: &str) -> PawClientResult<()> {
        let post_id = require_id(post_id, "post id")?;
        self.run_mutation(Mutation::Follow, self.http.follow_author(post_id))
            .await
    }

    /// Добавляет комментарий к посту.
    pub async fn create_comment(&self, comment: &NewComment) -> PawClientResult<Comment> {
        comment.validate()?;
        self.run_mutation(Mutation::CreateComment, self.http.create_comment(comment))
            .await
    }

    /// Открывает оплату платного поста и возвращает URL внешней страницы оплаты.
    pub async fn pay_for_post(&self, post_id: &str) -> PawClientResult<PaymentSession> {
        let post_id = require_id(post_id, "post id")?;
        self.run_mutation(Mutation::Payment, self.http.pay_for_post(post_id))
            .await
    }

    /// Обновляет профиль текущего пользователя.
    pub async fn update_profile(&self, update: &ProfileUpdate) -> PawClientResult<User> {
        update.validate()?;
        self.run_mutation(Mutation::UpdateProfile, self.http.update_profile(update))
            .await
    }

    /// Удаляет пользователя (для администратора).
    pub async fn delete_user(&self, user_id: &str) -> PawClientResult<()> {
        let user_id = require_id(user_id, "user id")?;
        self.run_mutation(Mutation::DeleteUser, self.http.delete_user(user_id))
            .await
    }

    /// Генерирует PDF с планом питания и возвращает его байты.
    pub async fn generate_nutrition_pdf(&self, req: &NutritionRequest) -> PawClientResult<Vec<u8>> {
        req.validate()?;
        self.run_mutation(
            Mutation::GenerateNutritionPdf,
            self.http.generate_nutrition_pdf(req),
        )
        .await
    }
}

fn require_id<'a>(id: &'a str, what: &str) -> PawClientResult<&'a str> {
    let id = id.trim();
    if id.is_empty() || id.contains('/') {
        return Err(PawClientError::Validation(format!("{what} is required")));
    }
    Ok(id)
}
