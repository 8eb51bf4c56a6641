use crate::core::error::{AppError, Result};
use crate::features::auth::dtos::{AuthResponseDto, LoginRequestDto, RegisterRequestDto};
use crate::features::auth::{JwtValidator, PasswordHasher};
use crate::features::users::models::{NewUser, User};
use crate::features::users::UserRepository;
use std::sync::Arc;

/// Service for authentication operations (register, login)
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    hasher: PasswordHasher,
    tokens: Arc<JwtValidator>,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        hasher: PasswordHasher,
        tokens: Arc<JwtValidator>,
    ) -> Self {
        Self {
            users,
            hasher,
            tokens,
        }
    }

    /// Register a new user and sign them in
    pub async fn register(&self, dto: RegisterRequestDto) -> Result<AuthResponseDto> {
        let email = dto.email.trim().to_lowercase();

        if self.users.find_by_email(&email).await?.is_some() {
            return Err(AppError::Conflict(
                "Email is already registered".to_string(),
            ));
        }

        let password_hash = self.hasher.hash(dto.password).await?;

        let user = self
            .users
            .create(NewUser {
                full_name: dto.full_name.trim().to_string(),
                email,
                password_hash,
                role: dto.role,
            })
            .await?;

        tracing::info!("User registered: id={}, role={}", user.id, user.role);

        self.auth_response(user)
    }

    /// Login with email and password
    pub async fn login(&self, dto: LoginRequestDto) -> Result<AuthResponseDto> {
        let invalid = || AppError::Unauthorized("Invalid email or password".to_string());

        let user = self
            .users
            .find_by_email(dto.email.trim())
            .await?
            .ok_or_else(invalid)?;

        let matches = self
            .hasher
            .verify(dto.password, user.password_hash.clone())
            .await?;
        if !matches {
            tracing::debug!("Failed login for user {}", user.id);
            return Err(invalid());
        }

        tracing::info!("User logged in: id={}", user.id);

        self.auth_response(user)
    }

    fn auth_response(&self, user: User) -> Result<AuthResponseDto> {
        let token = self.tokens.issue_token(user.id, user.role)?;

        Ok(AuthResponseDto {
            access_token: token.access_token,
            token_type: "Bearer".to_string(),
            expires_in: token.expires_in,
            user: user.into(),
        })
    }
}
