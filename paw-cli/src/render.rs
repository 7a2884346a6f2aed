use std::fmt::Write;

use paw_client::visibility::{PostBody, PostView};
use paw_client::{AuthResponse, Comment, DashboardTotals, Post, User, Vote};

pub(crate) fn auth(title: &str, auth: &AuthResponse) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{title}");
    let _ = writeln!(out, "role: {}", auth.user.role);
    if let Some(name) = &auth.user.name {
        let _ = writeln!(out, "name: {name}");
    }
    if let Some(email) = &auth.user.email {
        let _ = writeln!(out, "email: {email}");
    }
    let _ = writeln!(out, "landing: {}", auth.landing_path());
    out
}

pub(crate) fn user(user: &User) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "id: {}", user.id);
    let _ = writeln!(out, "name: {}", user.name);
    let _ = writeln!(out, "email: {}", user.email);
    let _ = writeln!(out, "role: {}", user.role);
    let _ = writeln!(out, "phone: {}", user.phone.as_deref().unwrap_or("-"));
    let _ = writeln!(out, "address: {}", user.address.as_deref().unwrap_or("-"));
    let _ = writeln!(
        out,
        "followers: {}, following: {}",
        user.followers.len(),
        user.following.len()
    );
    out
}

pub(crate) fn users(users: &[User]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Пользователей: {}", users.len());
    for user in users {
        let _ = writeln!(
            out,
            "- [{}] {} <{}> ({})",
            user.id, user.name, user.email, user.role
        );
    }
    out
}

pub(crate) fn post_view(view: &PostView) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "[{}] {}", view.id, view.title);

    let marker = match view.viewer_vote {
        Vote::Up => " (ваш голос: за)",
        Vote::Down => " (ваш голос: против)",
        Vote::None => "",
    };
    let _ = writeln!(
        out,
        "  автор: {}{}",
        view.author,
        if view.is_author { " (вы)" } else { "" }
    );
    let _ = writeln!(
        out,
        "  голоса: +{} / -{}{marker}, комментариев: {}",
        view.tally.up, view.tally.down, view.comment_count
    );

    match &view.body {
        PostBody::Full(content) => {
            let _ = writeln!(out, "  {content}");
        }
        PostBody::Truncated { preview } => {
            let _ = writeln!(out, "  {preview}");
            let _ = writeln!(out, "  (полный текст: --expand)");
        }
        PostBody::Paywalled => {
            let _ = writeln!(
                out,
                "  Платный пост. Оплатите доступ: paw-cli pay --id {}",
                view.id
            );
        }
        PostBody::Withheld => {
            let _ = writeln!(out, "  (сервер не прислал текст поста)");
        }
    }
    out
}

pub(crate) fn comments(comments: &[Comment]) -> String {
    let mut out = String::new();
    for comment in comments {
        let author = comment
            .author_name
            .as_deref()
            .unwrap_or(comment.author_id.as_str());
        let _ = writeln!(
            out,
            "  > {author} ({}): {}",
            comment.created_at.format("%Y-%m-%d %H:%M"),
            comment.content
        );
    }
    out
}

pub(crate) fn post_summary(post: &Post) -> String {
    format!(
        "- [{}] {} ({:?}{})",
        post.id,
        post.title,
        post.category,
        if post.is_premium { ", платный" } else { "" }
    )
}

pub(crate) fn dashboard(totals: &DashboardTotals) -> String {
    format!(
        "Пользователей: {}\nПостов: {}\n",
        totals.users, totals.posts
    )
}
