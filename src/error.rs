use argon2::Error as Argon2Error;
use jsonwebtoken::errors::{Error as JwtError, ErrorKind as JwtErrorKind};
use log::{error, warn};
use mongodb::error::Error as DbError;
use rocket::{
    http::{Status, StatusClass},
    response::{self, Responder},
    serde::json::Json,
    Request,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{
    api::{auth::RegistrationError, poll::PollSpecError},
    common::{ballot::BallotError, filter::FilterError},
};

pub type Result<T> = std::result::Result<T, Error>;

/// Shown whenever the underlying problem should not be exposed.
pub const GENERIC_MESSAGE: &str = "Something went wrong. Please try again.";

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Db(#[from] DbError),
    #[error(transparent)]
    Jwt(#[from] JwtError),
    #[error(transparent)]
    Argon2(#[from] Argon2Error),
    /// The backend rejected a write because of a uniqueness constraint.
    #[error("Uniqueness violation: {0}")]
    UniqueViolation(String),
    #[error(transparent)]
    InvalidPoll(#[from] PollSpecError),
    #[error(transparent)]
    InvalidBallot(#[from] BallotError),
    #[error(transparent)]
    InvalidRegistration(#[from] RegistrationError),
    #[error(transparent)]
    InvalidFilter(#[from] FilterError),
    #[error("You have already voted on this poll.")]
    AlreadyVoted,
    #[error("Incorrect password or the poll could not be unlocked.")]
    AccessDenied,
    #[error("{1}")]
    Status(Status, String),
}

impl Error {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::Status(Status::NotFound, format!("Not found: {}", what.into()))
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Status(Status::Unauthorized, message.into())
    }

    /// The HTTP status this error should be reported with.
    pub fn status(&self) -> Status {
        match self {
            Self::Db(_) | Self::Argon2(_) | Self::UniqueViolation(_) => {
                Status::InternalServerError
            }
            Self::Jwt(err) => match err.kind() {
                JwtErrorKind::ExpiredSignature | JwtErrorKind::ImmatureSignature => {
                    Status::Unauthorized
                }
                _ => Status::BadRequest,
            },
            Self::InvalidBallot(BallotError::Locked) | Self::AccessDenied => Status::Forbidden,
            Self::InvalidPoll(_)
            | Self::InvalidBallot(_)
            | Self::InvalidRegistration(_)
            | Self::InvalidFilter(_) => Status::BadRequest,
            Self::AlreadyVoted => Status::Conflict,
            Self::Status(status, _) => *status,
        }
    }

    /// The message shown to the user. Server-side failures are never described.
    pub fn public_message(&self) -> String {
        if self.status().class() == StatusClass::ServerError {
            GENERIC_MESSAGE.to_string()
        } else {
            self.to_string()
        }
    }
}

/// JSON body of every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'o> {
        let status = self.status();
        match status.class() {
            StatusClass::ServerError => error!("{} {}: {self:?}", req.method(), req.uri()),
            _ => warn!("{} {}: {self}", req.method(), req.uri()),
        }
        (status, Json(ErrorBody::new(self.public_message()))).respond_to(req)
    }
}
