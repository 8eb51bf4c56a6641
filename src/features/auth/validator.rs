use super::model::{AuthenticatedUser, Claims};
use crate::core::error::AppError;
use crate::features::users::models::UserRole;
use chrono::Utc;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use std::time::Duration;
use uuid::Uuid;

/// Signed access token handed to clients
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub access_token: String,
    /// Lifetime in seconds
    pub expires_in: i64,
}

/// Issues and validates HS256 access tokens
pub struct JwtValidator {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    token_ttl: Duration,
    leeway: u64,
}

impl JwtValidator {
    pub fn new(secret: &str, token_ttl: Duration, leeway: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            token_ttl,
            leeway: leeway.as_secs(),
        }
    }

    pub fn issue_token(&self, user_id: Uuid, role: UserRole) -> Result<IssuedToken, AppError> {
        let now = Utc::now().timestamp();
        let expires_in = i64::try_from(self.token_ttl.as_secs())
            .map_err(|_| AppError::Internal("Token TTL out of range".to_string()))?;

        let claims = Claims {
            sub: user_id,
            role,
            iat: now,
            exp: now + expires_in,
        };

        let access_token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| {
                tracing::error!("Failed to encode JWT: {}", e);
                AppError::Internal("Failed to issue token".to_string())
            })?;

        Ok(IssuedToken {
            access_token,
            expires_in,
        })
    }

    pub fn validate_token(&self, token: &str) -> Result<AuthenticatedUser, AppError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = self.leeway;
        validation.set_required_spec_claims(&["exp", "sub"]);

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims.into())
            .map_err(|e| {
                tracing::debug!("Token validation failed: {}", e);
                match e.kind() {
                    ErrorKind::ExpiredSignature => AppError::Auth("Token has expired".to_string()),
                    _ => AppError::Auth("Invalid token".to_string()),
                }
            })
    }
}
