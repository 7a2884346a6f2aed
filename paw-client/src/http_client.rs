use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::header::ACCEPT;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::debug;

use crate::cache::{CachedData, Resource};
use crate::error::{PawClientError, PawClientResult};
use crate::models::{
    AuthResponse, AuthUser, Category, Comment, LoginRequest, NewComment, NewPost,
    NutritionRequest, PaymentSession, Post, ProfileUpdate, RegisterRequest, Role, User, UserRef,
};
use crate::mutation::Mutation;
use crate::session::Session;

#[derive(Debug, Serialize)]
struct LoginRequestDto<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct RegisterRequestDto<'a> {
    name: &'a str,
    email: &'a str,
    password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    phone: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    address: Option<&'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreatePostMetaDto<'a> {
    author_id: &'a str,
    title: &'a str,
    content: &'a str,
    category: Category,
    is_premium: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CommentDataDto<'a> {
    post_id: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateCommentRequestDto<'a> {
    comment_data: CommentDataDto<'a>,
}

#[derive(Debug, Serialize)]
struct UpdateUserRequestDto<'a> {
    userdata: &'a ProfileUpdate,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NutritionRequestDto<'a> {
    pet_type: &'a str,
    age: u32,
    weight: f64,
}

#[derive(Debug, Deserialize)]
struct ErrorResponseDto {
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EnvelopeDto<T> {
    success: Option<bool>,
    message: Option<String>,
    data: T,
}

#[derive(Debug, Deserialize)]
struct AckDto {
    success: Option<bool>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AuthResponseDto {
    success: Option<bool>,
    message: Option<String>,
    token: Option<String>,
    data: Option<AuthUserDto>,
}

#[derive(Debug, Deserialize)]
struct AuthUserDto {
    #[serde(rename = "_id")]
    id: Option<String>,
    name: Option<String>,
    email: Option<String>,
    role: Role,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum UserRefDto {
    Id(String),
    Populated {
        #[serde(rename = "_id")]
        id: String,
        name: Option<String>,
        role: Option<String>,
    },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserDto {
    #[serde(rename = "_id")]
    id: String,
    name: String,
    email: String,
    phone: Option<String>,
    address: Option<String>,
    role: Role,
    #[serde(default)]
    followers: Vec<UserRefDto>,
    #[serde(default)]
    following: Vec<UserRefDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentDto {
    #[serde(rename = "_id")]
    id: String,
    post_id: String,
    author_id: UserRefDto,
    author_name: Option<String>,
    content: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PostDto {
    #[serde(rename = "_id")]
    id: String,
    author_id: UserRefDto,
    title: String,
    content: Option<String>,
    category: Category,
    #[serde(default)]
    is_premium: bool,
    #[serde(rename = "PremiumAmount")]
    premium_amount: Option<f64>,
    #[serde(default)]
    images: Vec<String>,
    #[serde(default)]
    upvote: Vec<String>,
    #[serde(default)]
    downvote: Vec<String>,
    #[serde(default, rename = "PaidByUserPostId")]
    paid_by_user_post_id: Vec<String>,
    #[serde(default)]
    comments: Vec<CommentDto>,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct PaymentDataDto {
    payment_url: String,
}

impl From<UserRefDto> for UserRef {
    fn from(value: UserRefDto) -> Self {
        match value {
            UserRefDto::Id(id) => Self {
                id,
                name: None,
                role: None,
            },
            UserRefDto::Populated { id, name, role } => Self { id, name, role },
        }
    }
}

impl From<UserDto> for User {
    fn from(value: UserDto) -> Self {
        Self {
            id: value.id,
            name: value.name,
            email: value.email,
            phone: value.phone,
            address: value.address,
            role: value.role,
            followers: value.followers.into_iter().map(UserRef::from).collect(),
            following: value.following.into_iter().map(UserRef::from).collect(),
        }
    }
}

impl From<CommentDto> for Comment {
    fn from(value: CommentDto) -> Self {
        let author = UserRef::from(value.author_id);
        Self {
            id: value.id,
            post_id: value.post_id,
            author_id: author.id,
            author_name: value.author_name.or(author.name),
            content: value.content,
            created_at: value.created_at,
        }
    }
}

impl From<PostDto> for Post {
    fn from(value: PostDto) -> Self {
        Self {
            id: value.id,
            author: value.author_id.into(),
            title: value.title,
            content: value.content,
            category: value.category,
            is_premium: value.is_premium,
            premium_amount: value.premium_amount,
            images: value.images,
            upvotes: value.upvote.into_iter().collect::<BTreeSet<_>>(),
            downvotes: value.downvote.into_iter().collect::<BTreeSet<_>>(),
            paid_by: value.paid_by_user_post_id.into_iter().collect::<BTreeSet<_>>(),
            comments: value.comments.into_iter().map(Comment::from).collect(),
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

impl From<AuthUserDto> for AuthUser {
    fn from(value: AuthUserDto) -> Self {
        Self {
            id: value.id,
            name: value.name,
            email: value.email,
            role: value.role,
        }
    }
}

/// Требование к авторизации запроса.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Auth {
    /// Без токена запрос не отправляется.
    Required,
    /// Токен прикладывается, если он есть.
    Optional,
    /// Токен не прикладывается.
    Anonymous,
}

pub(crate) fn join_url(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

fn check_success(
    success: Option<bool>,
    message: Option<String>,
    status: StatusCode,
    fallback: &str,
) -> PawClientResult<()> {
    if success == Some(false) {
        return Err(PawClientError::Api {
            status: status.as_u16(),
            message: message.unwrap_or_else(|| fallback.to_string()),
        });
    }
    Ok(())
}

#[derive(Debug, Clone)]
/// HTTP-клиент для REST API бэкенда.
pub(crate) struct HttpClient {
    base_url: Arc<str>,
    client: Client,
    session: Session,
}

impl HttpClient {
    /// Создаёт HTTP-клиент с базовым URL API и контекстом сессии.
    pub(crate) fn new(base_url: impl Into<String>, session: Session) -> PawClientResult<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(PawClientError::from_reqwest)?;

        Ok(Self {
            base_url: Arc::from(base_url.into()),
            client,
            session,
        })
    }

    pub(crate) fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn session(&self) -> &Session {
        &self.session
    }

    fn endpoint(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }

    fn request(&self, method: Method, path: &str, auth: Auth) -> PawClientResult<RequestBuilder> {
        // Токен читается заново на каждый запрос.
        let token = self.session.token();
        let mut request = self
            .client
            .request(method, self.endpoint(path))
            .header(ACCEPT, "application/json");

        match (auth, token) {
            (Auth::Required, None) => return Err(PawClientError::MissingToken),
            (Auth::Required | Auth::Optional, Some(token)) => {
                request = request.bearer_auth(token);
            }
            (Auth::Optional | Auth::Anonymous, _) => {}
        }
        Ok(request)
    }

    async fn decode_error(response: Response, fallback: &str) -> PawClientError {
        let status = response.status();

        let message = match response.json::<ErrorResponseDto>().await {
            Ok(ErrorResponseDto {
                message: Some(message),
            }) if !message.trim().is_empty() => message,
            _ => fallback.to_string(),
        };
        PawClientError::Api {
            status: status.as_u16(),
            message,
        }
    }

    async fn execute(request: RequestBuilder, fallback: &str) -> PawClientResult<Response> {
        let response = request
            .send()
            .await
            .map_err(PawClientError::from_reqwest)?;
        if !response.status().is_success() {
            return Err(Self::decode_error(response, fallback).await);
        }
        Ok(response)
    }

    async fn parse<T: DeserializeOwned>(response: Response) -> PawClientResult<T> {
        response
            .json::<T>()
            .await
            .map_err(PawClientError::from_reqwest)
    }

    /// Отправляет запрос и разворачивает конверт `{success, message, data}`.
    async fn send_enveloped<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        fallback: &str,
    ) -> PawClientResult<T> {
        let response = Self::execute(request, fallback).await?;
        let status = response.status();
        let envelope = Self::parse::<EnvelopeDto<T>>(response).await?;
        check_success(envelope.success, envelope.message, status, fallback)?;
        Ok(envelope.data)
    }

    /// Отправляет запрос, у ответа которого значим только признак успеха.
    async fn send_ack(&self, request: RequestBuilder, fallback: &str) -> PawClientResult<()> {
        let response = Self::execute(request, fallback).await?;
        let status = response.status();
        let ack = Self::parse::<AckDto>(response).await?;
        check_success(ack.success, ack.message, status, fallback)
    }

    async fn send_auth(&self, request: RequestBuilder, fallback: &str) -> PawClientResult<AuthResponse> {
        let response = Self::execute(request, fallback).await?;
        let status = response.status();
        let dto = Self::parse::<AuthResponseDto>(response).await?;
        check_success(dto.success, dto.message.clone(), status, fallback)?;

        let token = dto.token.ok_or_else(|| PawClientError::Api {
            status: status.as_u16(),
            message: dto.message.unwrap_or_else(|| fallback.to_string()),
        })?;
        let user = dto.data.ok_or_else(|| {
            PawClientError::Decode("auth response has no user data".to_string())
        })?;

        Ok(AuthResponse {
            token,
            user: user.into(),
        })
    }

    /// Выполняет вход и возвращает токен и профиль.
    pub(crate) async fn login(&self, req: &LoginRequest) -> PawClientResult<AuthResponse> {
        let payload = LoginRequestDto {
            email: &req.email,
            password: &req.password,
        };
        let request = self
            .request(Method::POST, "/auth/login", Auth::Anonymous)?
            .json(&payload);
        self.send_auth(request, "Login failed").await
    }

    /// Регистрирует пользователя и возвращает токен и профиль.
    pub(crate) async fn register(&self, req: &RegisterRequest) -> PawClientResult<AuthResponse> {
        let payload = RegisterRequestDto {
            name: &req.name,
            email: &req.email,
            password: &req.password,
            phone: req.phone.as_deref(),
            address: req.address.as_deref(),
        };
        let request = self
            .request(Method::POST, "/auth/signup", Auth::Anonymous)?
            .json(&payload);
        self.send_auth(request, "Registration failed").await
    }

    /// Загружает кэшируемый ресурс.
    pub(crate) async fn fetch_resource(&self, resource: Resource) -> PawClientResult<CachedData> {
        let fallback = resource.fetch_error();
        debug!(path = resource.path(), "fetching resource");

        match resource {
            Resource::Posts | Resource::MyPosts => {
                // Лента доступна анонимно, но с токеном сервер может учесть зрителя.
                let auth = if resource == Resource::Posts {
                    Auth::Optional
                } else {
                    Auth::Required
                };
                let request = self.request(Method::GET, resource.path(), auth)?;
                let posts: Vec<PostDto> = self.send_enveloped(request, fallback).await?;
                Ok(CachedData::Posts(Arc::new(
                    posts.into_iter().map(Post::from).collect(),
                )))
            }
            Resource::CurrentUser => {
                let request = self.request(Method::GET, resource.path(), Auth::Required)?;
                let user: UserDto = self.send_enveloped(request, fallback).await?;
                Ok(CachedData::User(Arc::new(user.into())))
            }
            Resource::AllUsers => {
                let request = self.request(Method::GET, resource.path(), Auth::Required)?;
                let users: Vec<UserDto> = self.send_enveloped(request, fallback).await?;
                Ok(CachedData::Users(Arc::new(
                    users.into_iter().map(User::from).collect(),
                )))
            }
        }
    }

    /// Создаёт пост: multipart с JSON-метаданными и необязательным файлом.
    pub(crate) async fn create_post(&self, author_id: &str, post: &NewPost) -> PawClientResult<Post> {
        let fallback = Mutation::CreatePost.failure_message();
        let meta = [CreatePostMetaDto {
            author_id,
            title: &post.title,
            content: &post.content,
            category: post.category,
            is_premium: post.is_premium,
        }];
        let meta =
            serde_json::to_string(&meta).map_err(|err| PawClientError::Decode(err.to_string()))?;

        let mut form = Form::new().text("formData", meta);
        if let Some(image) = &post.image {
            let part = Part::bytes(image.bytes.clone())
                .file_name(image.file_name.clone())
                .mime_str(&image.mime)
                .map_err(|err| PawClientError::Validation(format!("image mime type: {err}")))?;
            form = form.part("file", part);
        }

        let request = self
            .request(Method::POST, "/pet/posts", Auth::Required)?
            .multipart(form);
        let dto: PostDto = self.send_enveloped(request, fallback).await?;
        Ok(dto.into())
    }

    /// Удаляет пост.
    pub(crate) async fn delete_post(&self, post_id: &str) -> PawClientResult<()> {
        let request = self.request(
            Method::DELETE,
            &format!("/pet/posts/{post_id}"),
            Auth::Required,
        )?;
        self.send_ack(request, Mutation::DeletePost.failure_message())
            .await
    }

    /// Голосует за или против поста.
    pub(crate) async fn vote(&self, post_id: &str, mutation: Mutation) -> PawClientResult<()> {
        let action = match mutation {
            Mutation::Downvote => "downvote",
            _ => "upvote",
        };
        let request = self.request(
            Method::POST,
            &format!("/pet/posts/{action}/{post_id}"),
            Auth::Required,
        )?;
        self.send_ack(request, mutation.failure_message()).await
    }

    /// Подписывается на автора поста.
    pub(crate) async fn follow_author(&self, post_id: &str) -> PawClientResult<()> {
        let request = self.request(
            Method::POST,
            &format!("/pet/posts/following/{post_id}"),
            Auth::Required,
        )?;
        self.send_ack(request, Mutation::Follow.failure_message())
            .await
    }

    /// Добавляет комментарий.
    pub(crate) async fn create_comment(&self, comment: &NewComment) -> PawClientResult<Comment> {
        let payload = CreateCommentRequestDto {
            comment_data: CommentDataDto {
                post_id: &comment.post_id,
                content: &comment.content,
            },
        };
        let request = self
            .request(Method::POST, "/pet/posts/comments", Auth::Required)?
            .json(&payload);
        let dto: CommentDto = self
            .send_enveloped(request, Mutation::CreateComment.failure_message())
            .await?;
        Ok(dto.into())
    }

    /// Открывает сессию оплаты платного поста.
    pub(crate) async fn pay_for_post(&self, post_id: &str) -> PawClientResult<PaymentSession> {
        let request = self.request(
            Method::POST,
            &format!("/pet/posts/payment/{post_id}"),
            Auth::Required,
        )?;
        let dto: PaymentDataDto = self
            .send_enveloped(request, Mutation::Payment.failure_message())
            .await?;
        Ok(PaymentSession {
            payment_url: dto.payment_url,
        })
    }

    /// Обновляет профиль текущего пользователя.
    pub(crate) async fn update_profile(&self, update: &ProfileUpdate) -> PawClientResult<User> {
        let payload = UpdateUserRequestDto { userdata: update };
        let request = self
            .request(Method::PUT, "/users/me/update", Auth::Required)?
            .json(&payload);
        let dto: UserDto = self
            .send_enveloped(request, Mutation::UpdateProfile.failure_message())
            .await?;
        Ok(dto.into())
    }

    /// Удаляет пользователя.
    pub(crate) async fn delete_user(&self, user_id: &str) -> PawClientResult<()> {
        let request = self.request(
            Method::DELETE,
            &format!("/users/allUsers/{user_id}"),
            Auth::Required,
        )?;
        self.send_ack(request, Mutation::DeleteUser.failure_message())
            .await
    }

    /// Запрашивает PDF с планом питания и возвращает его байты.
    pub(crate) async fn generate_nutrition_pdf(
        &self,
        req: &NutritionRequest,
    ) -> PawClientResult<Vec<u8>> {
        let payload = NutritionRequestDto {
            pet_type: &req.pet_type,
            age: req.age,
            weight: req.weight,
        };
        let request = self
            .request(Method::POST, "/Nutrition/generate-pdf", Auth::Required)?
            .json(&payload);
        let response =
            Self::execute(request, Mutation::GenerateNutritionPdf.failure_message()).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(PawClientError::from_reqwest)?;
        Ok(bytes.to_vec())
    }
}
