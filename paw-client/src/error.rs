use thiserror::Error;
use validator::ValidationErrors;

#[derive(Debug, Clone, Error)]
/// Ошибки клиентской библиотеки `paw-client`.
///
/// Тип клонируемый: результат одного сетевого запроса раздаётся всем
/// ожидающим его читателям кэша.
pub enum PawClientError {
    /// Операция требует авторизации, а токен в сессии отсутствует.
    /// Сетевой запрос в этом случае не выполняется.
    #[error("authorization token is missing")]
    MissingToken,

    /// Сервер ответил не-2xx статусом (или `success: false`).
    /// `message` берётся из тела ответа либо из сообщения по умолчанию.
    #[error("{message}")]
    Api {
        /// HTTP-статус ответа.
        status: u16,
        /// Человекочитаемое сообщение.
        message: String,
    },

    /// Ошибка транспорта: нет соединения, таймаут и т.п.
    #[error("network error: {0}")]
    Network(String),

    /// Тело ответа не соответствует ожидаемой схеме.
    #[error("decode error: {0}")]
    Decode(String),

    /// Данные формы не прошли проверку до отправки.
    #[error("validation error: {0}")]
    Validation(String),

    /// Не удалось прочитать или записать сохранённую сессию.
    #[error("session storage error: {0}")]
    Storage(String),
}

/// Результат операций `paw-client`.
pub type PawClientResult<T> = Result<T, PawClientError>;

impl PawClientError {
    /// HTTP-статус, если ошибка пришла от сервера.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// `true`, если причина ошибки в отсутствующей или отвергнутой авторизации.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::MissingToken) || matches!(self.status(), Some(401 | 403))
    }

    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return Self::Decode(err.to_string());
        }
        Self::Network(err.to_string())
    }
}

impl From<ValidationErrors> for PawClientError {
    fn from(err: ValidationErrors) -> Self {
        Self::Validation(err.to_string())
    }
}
