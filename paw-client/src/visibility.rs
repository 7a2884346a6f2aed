//! Правила показа постов: платный доступ, обрезка длинного текста, сортировка
//! и окно ленты.
//!
//! Проверка доступа здесь только пользовательская: сервер обязан сам не
//! отдавать содержимое платного поста тем, кто за него не заплатил.

use std::cmp::Reverse;
use std::str::FromStr;

use tracing::warn;

use crate::models::{Post, Vote, VoteTally};

/// Длина превью до нажатия "читать дальше", в символах.
pub const PREVIEW_CHARS: usize = 300;

/// Шаг, с которым растёт видимая часть ленты.
pub const FEED_PAGE_STEP: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Уровень доступа зрителя к содержимому поста.
pub enum Access {
    /// Содержимое можно показывать.
    Full,
    /// Нужна оплата.
    Paywalled,
}

/// Определяет доступ `viewer` к посту.
///
/// Бесплатный пост доступен всем; платный только автору и тем, кто оплатил.
pub fn access_for(post: &Post, viewer: Option<&str>) -> Access {
    if !post.is_premium {
        return Access::Full;
    }
    match viewer {
        Some(viewer) if post.is_author(viewer) || post.has_paid(viewer) => Access::Full,
        _ => Access::Paywalled,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Что показывать вместо тела поста.
pub enum PostBody {
    /// Полный текст.
    Full(String),
    /// Начало текста; полный доступен по "читать дальше".
    Truncated {
        /// Обрезанный текст с многоточием.
        preview: String,
    },
    /// Заглушка с предложением оплатить доступ.
    Paywalled,
    /// Доступ есть, но сервер не прислал текст.
    Withheld,
}

#[derive(Debug, Clone)]
/// Пост, подготовленный к показу конкретному зрителю.
///
/// Для закрытого поста текст сюда не копируется.
pub struct PostView {
    /// Идентификатор поста.
    pub id: String,
    /// Заголовок.
    pub title: String,
    /// Имя или id автора.
    pub author: String,
    /// Тело поста.
    pub body: PostBody,
    /// Подсчёт голосов.
    pub tally: VoteTally,
    /// Голос зрителя.
    pub viewer_vote: Vote,
    /// Является ли зритель автором.
    pub is_author: bool,
    /// Количество комментариев.
    pub comment_count: usize,
}

/// Обрезает текст до `max_chars` символов. `None`, если обрезать не нужно.
pub fn truncate_content(content: &str, max_chars: usize) -> Option<String> {
    let mut chars = content.char_indices();
    let (cut, _) = chars.nth(max_chars)?;
    Some(format!("{}...", &content[..cut]))
}

/// Готовит пост к показу.
pub fn view_post(post: &Post, viewer: Option<&str>, expanded: bool) -> PostView {
    let body = match access_for(post, viewer) {
        Access::Paywalled => PostBody::Paywalled,
        Access::Full => match &post.content {
            None => {
                warn!(post_id = %post.id, "post content withheld by server");
                PostBody::Withheld
            }
            Some(content) => match truncate_content(content, PREVIEW_CHARS) {
                Some(preview) if !expanded => PostBody::Truncated { preview },
                _ => PostBody::Full(content.clone()),
            },
        },
    };

    let tally = post.tally();
    if tally.conflicted > 0 {
        warn!(
            post_id = %post.id,
            conflicted = tally.conflicted,
            "users found in both upvote and downvote sets"
        );
    }

    PostView {
        id: post.id.clone(),
        title: post.title.clone(),
        author: post
            .author
            .name
            .clone()
            .unwrap_or_else(|| post.author.id.clone()),
        body,
        tally,
        viewer_vote: viewer.map_or(Vote::None, |viewer| post.vote_of(viewer)),
        is_author: viewer.is_some_and(|viewer| post.is_author(viewer)),
        comment_count: post.comments.len(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
/// Порядок ленты.
pub enum FeedSort {
    /// Больше голосов "за" выше.
    #[default]
    MostUpvoted,
    /// Новые выше.
    MostRecent,
}

impl FromStr for FeedSort {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "most-upvoted" | "mostUpvoted" => Ok(Self::MostUpvoted),
            "most-recent" | "mostRecent" => Ok(Self::MostRecent),
            other => Err(format!("unknown sort order: {other}")),
        }
    }
}

/// Сортирует посты и возвращает первые `visible`.
pub fn feed_window(posts: &[Post], sort: FeedSort, visible: usize) -> Vec<&Post> {
    let mut sorted: Vec<&Post> = posts.iter().collect();
    match sort {
        FeedSort::MostUpvoted => sorted.sort_by_cached_key(|post| Reverse(post.tally().up)),
        FeedSort::MostRecent => sorted.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
    }
    sorted.truncate(visible);
    sorted
}
