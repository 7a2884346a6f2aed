use crate::cache::Resource;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Операции записи и ресурсы, которые они делают устаревшими.
pub enum Mutation {
    /// Создание поста.
    CreatePost,
    /// Удаление поста.
    DeletePost,
    /// Голос "за".
    Upvote,
    /// Голос "против".
    Downvote,
    /// Подписка на автора поста.
    Follow,
    /// Новый комментарий.
    CreateComment,
    /// Оплата платного поста.
    Payment,
    /// Обновление своего профиля.
    UpdateProfile,
    /// Удаление пользователя администратором.
    DeleteUser,
    /// Генерация PDF с планом питания.
    GenerateNutritionPdf,
}

impl Mutation {
    /// Все мутации, для проверки таблицы инвалидации.
    pub const ALL: [Mutation; 10] = [
        Self::CreatePost,
        Self::DeletePost,
        Self::Upvote,
        Self::Downvote,
        Self::Follow,
        Self::CreateComment,
        Self::Payment,
        Self::UpdateProfile,
        Self::DeleteUser,
        Self::GenerateNutritionPdf,
    ];

    /// Ресурсы, которые инвалидируются после успешной мутации.
    pub fn invalidates(&self) -> &'static [Resource] {
        match self {
            Self::CreatePost
            | Self::Upvote
            | Self::Downvote
            | Self::Follow
            | Self::CreateComment
            | Self::Payment => &[Resource::Posts],
            Self::DeletePost => &[Resource::Posts, Resource::MyPosts],
            Self::UpdateProfile => &[Resource::CurrentUser],
            Self::DeleteUser => &[Resource::AllUsers],
            Self::GenerateNutritionPdf => &[],
        }
    }

    pub(crate) fn failure_message(&self) -> &'static str {
        match self {
            Self::CreatePost => "Failed to create post",
            Self::DeletePost => "Failed to delete post",
            Self::Upvote => "Failed to upvote the post",
            Self::Downvote => "Failed to downvote the post",
            Self::Follow => "Failed to follow the user",
            Self::CreateComment => "Failed to create comment",
            Self::Payment => "Payment failed",
            Self::UpdateProfile => "Failed to update user",
            Self::DeleteUser => "Failed to delete user",
            Self::GenerateNutritionPdf => "Failed to generate pet nutrition PDF",
        }
    }
}
