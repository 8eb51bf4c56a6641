//! Password hashing using Argon2id

use argon2::{
    password_hash::{
        rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString,
    },
    Algorithm, Argon2, Params, Version,
};

use crate::core::error::AppError;

/// Argon2id hasher; the CPU-heavy work runs on the blocking pool
#[derive(Clone, Default)]
pub struct PasswordHasher {
    params: Params,
}

impl PasswordHasher {
    /// Uses the argon2 crate defaults (19 MiB, 2 iterations, 1 lane)
    pub fn new() -> Self {
        Self::default()
    }

    /// Cheap parameters for tests
    #[cfg(test)]
    pub fn fast() -> Self {
        Self {
            params: Params::new(Params::MIN_M_COST, Params::MIN_T_COST, Params::MIN_P_COST, None)
                .unwrap(),
        }
    }

    fn argon2(params: Params) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
    }

    /// Hash a password into a PHC string
    pub async fn hash(&self, password: String) -> Result<String, AppError> {
        let params = self.params.clone();
        tokio::task::spawn_blocking(move || {
            let salt = SaltString::generate(&mut OsRng);
            Self::argon2(params)
                .hash_password(password.as_bytes(), &salt)
                .map(|hash| hash.to_string())
        })
        .await
        .map_err(|e| {
            tracing::error!("Password hash task panicked: {}", e);
            AppError::Internal("Password hashing failed".to_string())
        })?
        .map_err(|e| {
            tracing::error!("Failed to hash password: {}", e);
            AppError::Internal("Password hashing failed".to_string())
        })
    }

    /// Check `password` against a stored PHC string
    pub async fn verify(&self, password: String, hash: String) -> Result<bool, AppError> {
        let params = self.params.clone();
        tokio::task::spawn_blocking(move || {
            let parsed = PasswordHash::new(&hash)?;
            match Self::argon2(params).verify_password(password.as_bytes(), &parsed) {
                Ok(()) => Ok(true),
                Err(argon2::password_hash::Error::Password) => Ok(false),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(|e| {
            tracing::error!("Password verify task panicked: {}", e);
            AppError::Internal("Password verification failed".to_string())
        })?
        .map_err(|e| {
            tracing::error!("Stored password hash is unusable: {}", e);
            AppError::Internal("Password verification failed".to_string())
        })
    }
}
