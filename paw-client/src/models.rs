use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
/// Роль пользователя, зашитая в токен.
pub enum Role {
    /// Обычный пользователь.
    User,
    /// Администратор.
    Admin,
}

#[derive(Debug, Clone, Error)]
#[error("unknown role: {0}")]
/// Строка роли не соответствует ни одной известной роли.
pub struct UnknownRole(pub String);

impl Role {
    /// Строковое представление роли (как в токене).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }

    /// Страница, на которую попадает пользователь после входа.
    pub fn landing_path(&self) -> &'static str {
        match self {
            Self::User => "/user",
            Self::Admin => "/admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
/// Категория поста.
pub enum Category {
    /// Совет.
    Tip,
    /// История.
    Story,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Ссылка на пользователя: только id или id с подгруженными полями.
pub struct UserRef {
    /// Идентификатор пользователя.
    pub id: String,
    /// Имя, если сервер его подгрузил.
    pub name: Option<String>,
    /// Роль, если сервер её подгрузил.
    pub role: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
/// Публичная модель пользователя.
pub struct User {
    /// Идентификатор пользователя.
    pub id: String,
    /// Имя.
    pub name: String,
    /// Email.
    pub email: String,
    /// Телефон.
    pub phone: Option<String>,
    /// Адрес.
    pub address: Option<String>,
    /// Роль.
    pub role: Role,
    /// Подписчики.
    pub followers: Vec<UserRef>,
    /// Подписки.
    pub following: Vec<UserRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
/// Комментарий к посту. После создания не меняется.
pub struct Comment {
    /// Идентификатор комментария.
    pub id: String,
    /// Пост, к которому относится комментарий.
    pub post_id: String,
    /// Автор комментария.
    pub author_id: String,
    /// Имя автора.
    pub author_name: Option<String>,
    /// Текст.
    pub content: String,
    /// Дата и время создания (UTC).
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
/// Публичная модель поста.
pub struct Post {
    /// Идентификатор поста.
    pub id: String,
    /// Автор.
    pub author: UserRef,
    /// Заголовок.
    pub title: String,
    /// Содержимое (санитизированный HTML). `None`, если сервер его не отдал.
    pub content: Option<String>,
    /// Категория.
    pub category: Category,
    /// Платный ли пост.
    pub is_premium: bool,
    /// Цена доступа к платному посту.
    pub premium_amount: Option<f64>,
    /// URL изображений в исходном порядке.
    pub images: Vec<String>,
    /// Кто проголосовал "за".
    pub upvotes: BTreeSet<String>,
    /// Кто проголосовал "против".
    pub downvotes: BTreeSet<String>,
    /// Кто оплатил доступ.
    pub paid_by: BTreeSet<String>,
    /// Комментарии в порядке создания.
    pub comments: Vec<Comment>,
    /// Дата и время создания (UTC).
    pub created_at: DateTime<Utc>,
    /// Дата и время последнего обновления (UTC).
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Голос конкретного пользователя за пост.
pub enum Vote {
    /// Голос "за".
    Up,
    /// Голос "против".
    Down,
    /// Нет голоса (или голос противоречив).
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
/// Подсчёт голосов.
///
/// Пользователь, оказавшийся сразу в обоих множествах, не учитывается ни в
/// одном из счётчиков и попадает в `conflicted`.
pub struct VoteTally {
    /// Голоса "за".
    pub up: usize,
    /// Голоса "против".
    pub down: usize,
    /// Противоречивые голоса.
    pub conflicted: usize,
}

impl Post {
    /// Является ли `viewer` автором поста.
    pub fn is_author(&self, viewer: &str) -> bool {
        self.author.id == viewer
    }

    /// Оплатил ли `viewer` доступ к посту.
    pub fn has_paid(&self, viewer: &str) -> bool {
        self.paid_by.contains(viewer)
    }

    /// Подсчитывает голоса с учётом взаимоисключения "за"/"против".
    pub fn tally(&self) -> VoteTally {
        let conflicted = self.upvotes.intersection(&self.downvotes).count();
        VoteTally {
            up: self.upvotes.len() - conflicted,
            down: self.downvotes.len() - conflicted,
            conflicted,
        }
    }

    /// Голос пользователя `viewer`.
    pub fn vote_of(&self, viewer: &str) -> Vote {
        match (self.upvotes.contains(viewer), self.downvotes.contains(viewer)) {
            (true, false) => Vote::Up,
            (false, true) => Vote::Down,
            _ => Vote::None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
/// Денормализованный профиль из ответа на вход/регистрацию.
pub struct AuthUser {
    /// Идентификатор пользователя, если сервер его вернул.
    pub id: Option<String>,
    /// Имя.
    pub name: Option<String>,
    /// Email.
    pub email: Option<String>,
    /// Роль.
    pub role: Role,
}

#[derive(Debug, Clone)]
/// Ответ после успешной регистрации или входа.
pub struct AuthResponse {
    /// Bearer-токен.
    pub token: String,
    /// Профиль пользователя.
    pub user: AuthUser,
}

impl AuthResponse {
    /// Куда направить пользователя после входа.
    pub fn landing_path(&self) -> &'static str {
        self.user.role.landing_path()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Сессия оплаты платного поста.
pub struct PaymentSession {
    /// Внешняя страница оплаты.
    pub payment_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Счётчики для панели администратора.
pub struct DashboardTotals {
    /// Количество пользователей.
    pub users: usize,
    /// Количество постов.
    pub posts: usize,
}

#[derive(Debug, Clone, Validate)]
/// Данные формы входа.
pub struct LoginRequest {
    /// Email.
    #[validate(email)]
    pub email: String,
    /// Пароль.
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Clone, Validate)]
/// Данные формы регистрации.
pub struct RegisterRequest {
    /// Имя.
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    /// Email.
    #[validate(email)]
    pub email: String,
    /// Пароль.
    #[validate(length(min = 6, max = 128))]
    pub password: String,
    /// Телефон.
    pub phone: Option<String>,
    /// Адрес.
    pub address: Option<String>,
}

#[derive(Debug, Clone)]
/// Изображение, прикладываемое к посту.
pub struct ImageUpload {
    /// Имя файла.
    pub file_name: String,
    /// MIME-тип, например `image/png`.
    pub mime: String,
    /// Содержимое файла.
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Validate)]
/// Данные формы создания поста.
pub struct NewPost {
    /// Заголовок.
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    /// Содержимое (HTML).
    #[validate(length(min = 1))]
    pub content: String,
    /// Категория.
    pub category: Category,
    /// Платный ли пост.
    pub is_premium: bool,
    /// Необязательное изображение.
    pub image: Option<ImageUpload>,
}

#[derive(Debug, Clone, Validate)]
/// Данные формы комментария.
pub struct NewComment {
    /// Пост.
    #[validate(length(min = 1))]
    pub post_id: String,
    /// Текст комментария.
    #[validate(length(min = 1, max = 2000))]
    pub content: String,
}

#[derive(Debug, Clone, Default, Serialize, Validate)]
/// Частичное обновление профиля: отправляются только заданные поля.
pub struct ProfileUpdate {
    /// Имя.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    /// Email.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(email)]
    pub email: Option<String>,
    /// Телефон.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Адрес.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

#[derive(Debug, Clone, Validate)]
/// Параметры для генерации PDF с планом питания.
pub struct NutritionRequest {
    /// Вид питомца, например `dog`.
    #[validate(length(min = 1, max = 32))]
    pub pet_type: String,
    /// Возраст в годах.
    #[validate(range(max = 40))]
    pub age: u32,
    /// Вес в килограммах.
    #[validate(range(min = 0.1, max = 200.0))]
    pub weight: f64,
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use chrono::Utc;
    use validator::Validate;

    use super::*;

    fn post_with_votes(up: &[&str], down: &[&str]) -> Post {
        Post {
            id: "p1".to_string(),
            author: UserRef {
                id: "author".to_string(),
                name: None,
                role: None,
            },
            title: "title".to_string(),
            content: Some("body".to_string()),
            category: Category::Tip,
            is_premium: false,
            premium_amount: None,
            images: Vec::new(),
            upvotes: up.iter().map(|id| id.to_string()).collect(),
            downvotes: down.iter().map(|id| id.to_string()).collect(),
            paid_by: BTreeSet::new(),
            comments: Vec::new(),
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn role_parses_known_values_and_rejects_others() {
        assert_eq!("user".parse::<Role>().ok(), Some(Role::User));
        assert_eq!(" admin ".parse::<Role>().ok(), Some(Role::Admin));
        assert!("moderator".parse::<Role>().is_err());
    }

    #[test]
    fn landing_path_follows_role() {
        assert_eq!(Role::User.landing_path(), "/user");
        assert_eq!(Role::Admin.landing_path(), "/admin");
    }

    #[test]
    fn tally_excludes_users_in_both_sets() {
        let post = post_with_votes(&["a", "b"], &["b", "c", "d"]);
        let tally = post.tally();

        assert_eq!(tally.up, 1);
        assert_eq!(tally.down, 2);
        assert_eq!(tally.conflicted, 1);
        assert_eq!(post.vote_of("a"), Vote::Up);
        assert_eq!(post.vote_of("c"), Vote::Down);
        assert_eq!(post.vote_of("b"), Vote::None);
        assert_eq!(post.vote_of("zzz"), Vote::None);
    }

    #[test]
    fn login_request_requires_valid_email() {
        let bad = LoginRequest {
            email: "not-an-email".to_string(),
            password: "123456789".to_string(),
        };
        assert!(bad.validate().is_err());

        let ok = LoginRequest {
            email: "user1@gmail.com".to_string(),
            password: "123456789".to_string(),
        };
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn profile_update_skips_unset_fields() {
        let update = ProfileUpdate {
            phone: Some("555".to_string()),
            ..ProfileUpdate::default()
        };
        let json = serde_json::to_value(&update).expect("serializable");
        assert_eq!(json, serde_json::json!({ "phone": "555" }));
    }

    #[test]
    fn nutrition_request_rejects_zero_weight() {
        let req = NutritionRequest {
            pet_type: "dog".to_string(),
            age: 3,
            weight: 0.0,
        };
        assert!(req.validate().is_err());
    }
}
