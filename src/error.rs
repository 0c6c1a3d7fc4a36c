use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::fmt::Display;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

/// Failures of the invitation, grant and connection operations.
#[derive(Debug, Error)]
pub enum CollabError {
    #[error("{0}")]
    InvalidRequest(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("a pending invitation already exists")]
    DuplicatePending,
    #[error("invitation has already been processed")]
    AlreadyResolved,
    #[error("{0}")]
    Forbidden(&'static str),
    #[error("user is already a collaborator on this board")]
    AlreadyCollaborator,
    #[error("connection already exists")]
    AlreadyExists,
    #[error("user is not blocked")]
    NotBlocked,
    #[error("corrupt record: {0}")]
    CorruptRecord(String),
    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),
}

pub type CollabResult<T> = Result<T, CollabError>;

/// A stored or path-supplied enum name that matches no variant.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown {kind} `{value}`")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl UnknownVariant {
    pub fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

impl From<UnknownVariant> for CollabError {
    fn from(value: UnknownVariant) -> Self {
        CollabError::CorruptRecord(value.to_string())
    }
}

impl CollabError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            CollabError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CollabError::NotFound(_) => StatusCode::NOT_FOUND,
            CollabError::Forbidden(_) => StatusCode::FORBIDDEN,
            CollabError::DuplicatePending
            | CollabError::AlreadyResolved
            | CollabError::AlreadyCollaborator
            | CollabError::AlreadyExists
            | CollabError::NotBlocked => StatusCode::CONFLICT,
            CollabError::Database(diesel::result::Error::NotFound) => StatusCode::NOT_FOUND,
            CollabError::CorruptRecord(_) | CollabError::Database(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "resource not found")
    }

    pub fn internal<E: Display>(error: E) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, error.to_string())
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status;
        if status.is_server_error() {
            tracing::error!(%status, error = %self.message, "request failed");
        }
        let body = Json(ErrorResponse {
            error: self.message,
        });
        (status, body).into_response()
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl From<CollabError> for AppError {
    fn from(value: CollabError) -> Self {
        match value {
            CollabError::Database(diesel::result::Error::NotFound) => AppError::not_found(),
            other => AppError::new(other.status_code(), other.to_string()),
        }
    }
}

impl From<diesel::result::Error> for AppError {
    fn from(value: diesel::result::Error) -> Self {
        match value {
            diesel::result::Error::NotFound => AppError::not_found(),
            _ => AppError::internal(value),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(value: anyhow::Error) -> Self {
        AppError::internal(value)
    }
}
