//! # Service errors
//!
//! Every failure leaving a [`Service`](crate::service::Service) is a
//! [`ServiceError`]. It carries a fixed public message for the caller and,
//! separately, a developer hint with the underlying error text. The hint is
//! logged through `tracing` when the error is turned into a response and is
//! never serialized.
//!
//! ```rust,ignore
//! let product = repository
//!     .find_by_id(id)
//!     .await
//!     .map_err(|err| ServiceError::from_storage("retrieve", "Product", err))?
//!     .ok_or_else(|| ServiceError::not_found("Product"))?;
//! ```

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::{DbErr, SqlErr};
use serde::Serialize;
use std::{error::Error, fmt};

use crate::filter::FilterError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// 404 Not Found
    NotFound,
    /// 422 Unprocessable Entity
    ValidationFailed,
    /// 500 Internal Server Error
    Internal,
}

impl ErrorKind {
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::ValidationFailed => "validation_failed",
            Self::Internal => "internal_error",
        }
    }
}

#[derive(Debug)]
pub struct ServiceError {
    kind: ErrorKind,
    message: String,
    developer_hint: Option<String>,
    source: Option<Box<dyn Error + Send + Sync>>,
}

impl ServiceError {
    /// `"{resource} not found"`
    pub fn not_found(resource: impl fmt::Display) -> Self {
        Self {
            kind: ErrorKind::NotFound,
            message: format!("{resource} not found"),
            developer_hint: None,
            source: None,
        }
    }

    pub fn validation_failed(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::ValidationFailed,
            message: message.into(),
            developer_hint: None,
            source: None,
        }
    }

    pub fn internal(message: impl Into<String>, developer_hint: Option<String>) -> Self {
        Self {
            kind: ErrorKind::Internal,
            message: message.into(),
            developer_hint,
            source: None,
        }
    }

    #[must_use]
    pub fn with_source(mut self, source: impl Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Translate a storage error raised while performing `action` on `resource`.
    ///
    /// - `RecordNotFound` and `RecordNotUpdated` become `NotFound`.
    /// - Unique and foreign key violations become `ValidationFailed`.
    /// - Anything else becomes `Internal` with the public message
    ///   `"Failed to {action} {resource}"` and the error text as the hint.
    pub fn from_storage(action: &str, resource: &str, err: DbErr) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(detail)) => {
                return Self {
                    developer_hint: Some(detail),
                    ..Self::validation_failed(format!("{resource} already exists"))
                }
                .with_source(err);
            }
            Some(SqlErr::ForeignKeyConstraintViolation(detail)) => {
                return Self {
                    developer_hint: Some(detail),
                    ..Self::validation_failed(format!("{resource} references a missing record"))
                }
                .with_source(err);
            }
            _ => {}
        }

        match err {
            DbErr::RecordNotFound(_) | DbErr::RecordNotUpdated => Self {
                developer_hint: Some(err.to_string()),
                ..Self::not_found(resource)
            }
            .with_source(err),
            other => Self::internal(
                format!("Failed to {action} {resource}"),
                Some(other.to_string()),
            )
            .with_source(other),
        }
    }

    /// A filter value that could not be parsed is the caller's mistake.
    #[must_use]
    pub fn from_filter(err: FilterError) -> Self {
        Self::validation_failed(err.to_string()).with_source(err)
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self.kind {
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::ValidationFailed => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    #[must_use]
    pub fn user_message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn developer_hint(&self) -> Option<&str> {
        self.developer_hint.as_deref()
    }

    fn log(&self) {
        match (self.kind, &self.developer_hint) {
            (ErrorKind::Internal, Some(hint)) => {
                tracing::error!(message = %self.message, hint = %hint, "internal failure");
            }
            (ErrorKind::Internal, None) => {
                tracing::error!(message = %self.message, "internal failure");
            }
            (kind, hint) => {
                tracing::debug!(
                    code = kind.code(),
                    message = %self.message,
                    hint = hint.as_deref().unwrap_or_default(),
                    "service error"
                );
            }
        }
    }
}

/// Body sent to the caller.
#[derive(Serialize)]
struct ErrorResponse<'a> {
    message: &'a str,
    error_code: &'static str,
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        self.log();
        let body = ErrorResponse {
            message: &self.message,
            error_code: self.kind.code(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source
            .as_deref()
            .map(|source| source as &(dyn Error + 'static))
    }
}
