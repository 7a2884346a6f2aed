use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use crate::infrastructure::settings::Settings;

pub(crate) const ACCESS_TOKEN_COOKIE: &str = "accessToken";
pub(crate) const REFRESH_TOKEN_COOKIE: &str = "refreshToken";

#[derive(Debug, Clone, Copy)]
pub(crate) struct CookieSettings {
    pub(crate) max_age_secs: i64,
    pub(crate) secure: bool,
}

impl From<&Settings> for CookieSettings {
    fn from(settings: &Settings) -> Self {
        Self {
            max_age_secs: settings.access_token_max_age_secs,
            secure: settings.cookie_secure,
        }
    }
}

pub(crate) fn session_cookie(settings: CookieSettings, token: String) -> Cookie<'static> {
    Cookie::build((ACCESS_TOKEN_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(settings.secure)
        .max_age(cookie::time::Duration::seconds(settings.max_age_secs))
        .build()
}

/// Токен из cookie запроса; пустое значение равносильно отсутствию cookie.
pub(crate) fn access_token(jar: &CookieJar) -> Option<&str> {
    jar.get(ACCESS_TOKEN_COOKIE)
        .map(|cookie| cookie.value().trim())
        .filter(|token| !token.is_empty())
}

pub(crate) fn clear_session(jar: CookieJar) -> CookieJar {
    [ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE]
        .into_iter()
        .fold(jar, |jar, name| jar.remove(Cookie::build(name).path("/")))
}
