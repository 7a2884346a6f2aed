use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub(crate) enum JwtError {
    #[error("token expired")]
    Expired,

    #[error("token decode/validation failed")]
    Invalid(#[source] jsonwebtoken::errors::Error),
}

/// Полезная нагрузка токена, выпущенного бэкендом.
///
/// Роль остаётся строкой: неизвестная роль не ломает разбор токена, а
/// отклоняется политикой доступа.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub(crate) struct SessionClaims {
    #[serde(rename = "_id")]
    pub(crate) id: String,
    pub(crate) role: String,
    #[serde(default)]
    pub(crate) name: Option<String>,
    #[serde(default)]
    pub(crate) email: Option<String>,
    #[serde(default)]
    pub(crate) phone: Option<String>,
    pub(crate) exp: i64,
}

pub(crate) struct JwtService {
    secret: String,
}

impl JwtService {
    const LEEWAY_SECONDS: u64 = 10;

    pub(crate) fn new(secret: &str) -> Self {
        JwtService {
            secret: secret.into(),
        }
    }

    /// Проверяет подпись HS256 и срок действия. Токен без `exp` отклоняется.
    pub(crate) fn verify_token(&self, token: &str) -> Result<SessionClaims, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = Self::LEEWAY_SECONDS;

        let token_data = decode::<SessionClaims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map_err(|e| {
            if matches!(e.kind(), ErrorKind::ExpiredSignature) {
                JwtError::Expired
            } else {
                JwtError::Invalid(e)
            }
        })?;

        Ok(token_data.claims)
    }

    #[cfg(test)]
    pub(crate) fn generate_token(&self, claims: &SessionClaims) -> String {
        use jsonwebtoken::{EncodingKey, Header, encode};

        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .expect("test token must encode")
    }
}
