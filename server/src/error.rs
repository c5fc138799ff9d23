use crate::api::ErrorResponse;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use diesel::result::DatabaseErrorKind;
use thiserror::Error;
use uuid::Uuid;

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    AlreadyExists(String),

    #[error("You can't follow yourself")]
    SelfFollow,

    /// A serializable transaction lost to a concurrent write.
    #[error("Concurrent modification, retry the request")]
    ConflictDuringReplace,

    #[error("{0}")]
    Forbidden(String),

    #[error("Database error: {0}")]
    Storage(diesel::result::Error),

    #[error("Database connection failed: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),

    #[error("{0}")]
    Internal(String),
}

impl ServiceError {
    pub fn not_found(entity: &'static str, id: Uuid) -> Self {
        ServiceError::NotFound(format!("{entity} {id} not found"))
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ServiceError::Validation(message.into())
    }

    /// Stable machine-readable name reported alongside the message.
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::NotFound(_) => "not_found",
            ServiceError::Validation(_) => "validation",
            ServiceError::AlreadyExists(_) => "already_exists",
            ServiceError::SelfFollow => "self_follow",
            ServiceError::ConflictDuringReplace => "conflict",
            ServiceError::Forbidden(_) => "forbidden",
            ServiceError::Storage(_) => "storage",
            ServiceError::Pool(_) => "pool",
            ServiceError::Internal(_) => "internal",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Validation(_)
            | ServiceError::AlreadyExists(_)
            | ServiceError::SelfFollow => StatusCode::BAD_REQUEST,
            ServiceError::ConflictDuringReplace => StatusCode::CONFLICT,
            ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
            ServiceError::Storage(_) | ServiceError::Pool(_) | ServiceError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<diesel::result::Error> for ServiceError {
    fn from(err: diesel::result::Error) -> Self {
        match err {
            diesel::result::Error::DatabaseError(DatabaseErrorKind::SerializationFailure, _) => {
                ServiceError::ConflictDuringReplace
            }
            other => ServiceError::Storage(other),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Storage details stay in the logs
        let error = if status.is_server_error() {
            tracing::error!(kind = self.kind(), "{}", self);
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        (
            status,
            Json(ErrorResponse {
                error,
                kind: self.kind().to_string(),
            }),
        )
            .into_response()
    }
}
