use argon2::Config;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::Error;
use crate::model::{
    api::id::ApiId,
    db::{NewUser, User},
};

pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Why a registration form was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    #[error("Please enter a valid email address")]
    InvalidEmail,
    #[error("Passwords do not match")]
    PasswordMismatch,
    #[error("Password must be at least 6 characters")]
    PasswordTooShort,
}

/// Accounts are keyed on the trimmed, lowercase email.
pub fn normalise_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// A registration form. The password is in plaintext and never stored.
#[derive(Clone, Deserialize, Serialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl TryFrom<RegisterRequest> for NewUser {
    type Error = Error;

    /// Check the form and hash the password.
    fn try_from(request: RegisterRequest) -> Result<Self, Self::Error> {
        let email = normalise_email(&request.email);
        if email.is_empty() || !email.contains('@') {
            return Err(RegistrationError::InvalidEmail.into());
        }
        if request.password != request.confirm_password {
            return Err(RegistrationError::PasswordMismatch.into());
        }
        if request.password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(RegistrationError::PasswordTooShort.into());
        }

        let mut salt = [0_u8; 16];
        rand::thread_rng().fill(&mut salt);
        let password_hash =
            argon2::hash_encoded(request.password.as_bytes(), &salt, &Config::default())?;
        Ok(Self {
            email,
            password_hash,
        })
    }
}

/// Sign-in credentials.
#[derive(Clone, Deserialize, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// The signed-in account, as returned by the auth endpoints.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountView {
    pub id: ApiId,
    pub email: String,
}

impl From<User> for AccountView {
    fn from(user: User) -> Self {
        Self {
            id: user.id.into(),
            email: user.user.email,
        }
    }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl RegisterRequest {
        pub fn example() -> Self {
            Self {
                email: "pat@example.com".into(),
                password: "lunchtime".into(),
                confirm_password: "lunchtime".into(),
            }
        }

        pub fn example2() -> Self {
            Self {
                email: "sam@example.com".into(),
                password: "pollster99".into(),
                confirm_password: "pollster99".into(),
            }
        }
    }

    impl LoginRequest {
        pub fn example() -> Self {
            let register = RegisterRequest::example();
            Self {
                email: register.email,
                password: register.password,
            }
        }
    }
}
