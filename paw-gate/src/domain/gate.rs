use paw_client::Role;

pub(crate) const LOGIN_PATH: &str = "/login";
pub(crate) const REGISTER_PATH: &str = "/register";
pub(crate) const HOME_PATH: &str = "/";

/// Решение gate для одного запроса страницы.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum GateDecision {
    Continue,
    RedirectLogin,
    RedirectHome,
}

impl GateDecision {
    pub(crate) fn location(&self) -> Option<&'static str> {
        match self {
            Self::Continue => None,
            Self::RedirectLogin => Some(LOGIN_PATH),
            Self::RedirectHome => Some(HOME_PATH),
        }
    }
}

/// Состояние сессии после проверки токена.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SessionState<'a> {
    /// Токена нет, либо он не прошёл проверку.
    Unauthenticated,
    /// Токен валиден; роль взята из claims как есть.
    Authenticated { role: &'a str },
}

/// Таблица доступа: публичные страницы входа и префиксы, закреплённые за ролями.
#[derive(Debug, Clone)]
pub(crate) struct AccessPolicy {
    public_paths: Vec<&'static str>,
    role_prefixes: Vec<(Role, &'static str)>,
}

impl Default for AccessPolicy {
    fn default() -> Self {
        Self {
            public_paths: vec![LOGIN_PATH, REGISTER_PATH],
            role_prefixes: vec![
                (Role::User, Role::User.landing_path()),
                (Role::Admin, Role::Admin.landing_path()),
            ],
        }
    }
}

impl AccessPolicy {
    /// Проходит ли путь через gate. Остальные пути (например `/`) не проверяются.
    pub(crate) fn is_gated(&self, path: &str) -> bool {
        self.is_public(path)
            || self
                .role_prefixes
                .iter()
                .any(|(_, prefix)| matches_prefix(path, prefix))
    }

    fn is_public(&self, path: &str) -> bool {
        self.public_paths.iter().any(|public| *public == path)
    }

    fn prefix_for(&self, role: Role) -> Option<&'static str> {
        self.role_prefixes
            .iter()
            .find(|(candidate, _)| *candidate == role)
            .map(|(_, prefix)| *prefix)
    }

    pub(crate) fn decide(&self, path: &str, session: SessionState<'_>) -> GateDecision {
        let role = match session {
            SessionState::Unauthenticated if self.is_public(path) => {
                return GateDecision::Continue;
            }
            SessionState::Unauthenticated => return GateDecision::RedirectLogin,
            SessionState::Authenticated { role } => role,
        };

        // Неизвестная роль или роль без префикса: доступ запрещён.
        let allowed = role
            .parse::<Role>()
            .ok()
            .and_then(|role| self.prefix_for(role))
            .is_some_and(|prefix| matches_prefix(path, prefix));

        if allowed {
            GateDecision::Continue
        } else {
            GateDecision::RedirectHome
        }
    }
}

/// `/user` и `/user/...` совпадают с префиксом `/user`, а `/username` нет.
fn matches_prefix(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}
