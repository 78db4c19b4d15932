//! Error taxonomy for the console.
//!
//! Every failure falls into one of four classes: validation errors caught
//! before any network call, authorization errors raised when a session lacks
//! the admin group, transport/API errors propagated from the remote
//! collaborators, and per-file upload errors (which are recorded on the file
//! and never surface as an `Err` of the batch).

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Error codes for JSON responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    ValidationError,
    Unauthorized,
    Forbidden,
    NotFound,
    Conflict,
    ExternalServiceError,
    InternalError,
}

impl ErrorCode {
    /// Get the default HTTP status code for this error code
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::ValidationError => StatusCode::BAD_REQUEST,
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::Forbidden => StatusCode::FORBIDDEN,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::Conflict => StatusCode::CONFLICT,
            ErrorCode::ExternalServiceError => StatusCode::BAD_GATEWAY,
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ValidationError => "validation_error",
            ErrorCode::Unauthorized => "unauthorized",
            ErrorCode::Forbidden => "forbidden",
            ErrorCode::NotFound => "not_found",
            ErrorCode::Conflict => "conflict",
            ErrorCode::ExternalServiceError => "external_service_error",
            ErrorCode::InternalError => "internal_error",
        }
    }
}

/// The inner error object in a JSON response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<BTreeMap<String, Vec<String>>>,
}

/// The full error response envelope
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

/// Field-level validation failures, keyed by form field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationErrors {
    fields: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut builder = ValidationErrorBuilder::new();
        builder.add(field, message);
        Self {
            fields: builder.errors,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// First message recorded for a field, used for inline form errors.
    pub fn first(&self, field: &str) -> Option<&str> {
        self.fields
            .get(field)
            .and_then(|messages| messages.first())
            .map(String::as_str)
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.fields.get(field).map(Vec::as_slice)
    }

    pub fn has(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.fields.iter()
    }

    pub fn into_map(self) -> BTreeMap<String, Vec<String>> {
        self.fields
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.fields.len() == 1 {
            let message = self
                .fields
                .values()
                .next()
                .and_then(|v| v.first())
                .map(String::as_str)
                .unwrap_or("Validation failed");
            write!(f, "{}", message)
        } else {
            write!(f, "Validation failed for {} fields", self.fields.len())
        }
    }
}

/// Builder for collecting multiple validation errors
#[derive(Debug, Default)]
pub struct ValidationErrorBuilder {
    errors: BTreeMap<String, Vec<String>>,
}

impl ValidationErrorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a validation error for a field
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) -> &mut Self {
        self.errors
            .entry(field.into())
            .or_default()
            .push(message.into());
        self
    }

    /// Record the error of a `validate_*` check, if any
    pub fn check(&mut self, field: &str, result: Result<(), String>) -> &mut Self {
        if let Err(message) = result {
            self.add(field, message);
        }
        self
    }

    pub fn merge_prefixed(&mut self, prefix: &str, other: ValidationErrors) -> &mut Self {
        for (field, messages) in other.fields {
            self.errors
                .entry(format!("{}{}", prefix, field))
                .or_default()
                .extend(messages);
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn build(self) -> Option<ValidationErrors> {
        if self.errors.is_empty() {
            None
        } else {
            Some(ValidationErrors {
                fields: self.errors,
            })
        }
    }

    /// Return Ok(()) if no errors, or Err(ValidationErrors) if there are errors
    pub fn finish(self) -> Result<(), ValidationErrors> {
        match self.build() {
            Some(errors) => Err(errors),
            None => Ok(()),
        }
    }
}

/// Failures of the identity layer.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("No active session")]
    NotSignedIn,
    #[error("Session expired")]
    SessionExpired,
    #[error("Unauthorized: Admin access required")]
    AdminRequired,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Sign-in requires the {0} challenge, which this console does not support")]
    ChallengeRequired(String),
    #[error("Identity provider error: {kind}: {message}")]
    Provider { kind: String, message: String },
    #[error("Identity provider request failed")]
    Transport(#[source] reqwest::Error),
    #[error("Session token is malformed")]
    MalformedToken(#[source] jsonwebtoken::errors::Error),
    #[error("Session token was issued by {0}, not by the configured user pool")]
    WrongIssuer(String),
}

impl AuthError {
    pub fn code(&self) -> ErrorCode {
        match self {
            AuthError::NotSignedIn
            | AuthError::SessionExpired
            | AuthError::InvalidCredentials
            | AuthError::MalformedToken(_)
            | AuthError::WrongIssuer(_) => ErrorCode::Unauthorized,
            AuthError::AdminRequired => ErrorCode::Forbidden,
            AuthError::ChallengeRequired(_) => ErrorCode::Forbidden,
            AuthError::Provider { .. } | AuthError::Transport(_) => {
                ErrorCode::ExternalServiceError
            }
        }
    }

    /// Whether the session behind this error is gone for good.
    pub fn is_session_lost(&self) -> bool {
        matches!(
            self,
            AuthError::NotSignedIn
                | AuthError::SessionExpired
                | AuthError::MalformedToken(_)
                | AuthError::WrongIssuer(_)
        )
    }
}

/// Failures of the resource services.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(ValidationErrors),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("Request to {path} failed")]
    Transport {
        path: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("API returned {status} for {path}")]
    Api {
        path: String,
        status: StatusCode,
        body: String,
    },
    #[error("Failed to encode request for {path}")]
    Encode {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ServiceError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ServiceError::Validation(_) => ErrorCode::ValidationError,
            ServiceError::Auth(err) => err.code(),
            ServiceError::Transport { .. } => ErrorCode::ExternalServiceError,
            ServiceError::Api { status, .. } => match *status {
                StatusCode::NOT_FOUND => ErrorCode::NotFound,
                StatusCode::CONFLICT => ErrorCode::Conflict,
                StatusCode::UNAUTHORIZED => ErrorCode::Unauthorized,
                StatusCode::FORBIDDEN => ErrorCode::Forbidden,
                s if s.is_client_error() => ErrorCode::ValidationError,
                _ => ErrorCode::ExternalServiceError,
            },
            ServiceError::Encode { .. } => ErrorCode::InternalError,
        }
    }

    pub fn validation_errors(&self) -> Option<&ValidationErrors> {
        match self {
            ServiceError::Validation(errors) => Some(errors),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ServiceError::Auth(AuthError::AdminRequired))
    }

    /// Whether the failure means the caller must sign in again.
    pub fn is_session_lost(&self) -> bool {
        match self {
            ServiceError::Auth(err) => err.is_session_lost(),
            ServiceError::Api { status, .. } => *status == StatusCode::UNAUTHORIZED,
            _ => false,
        }
    }
}

impl From<ValidationErrors> for ServiceError {
    fn from(errors: ValidationErrors) -> Self {
        ServiceError::Validation(errors)
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let code = self.code();
        // Upstream details stay in the log
        let message = match &self {
            ServiceError::Transport { .. } | ServiceError::Api { .. } => {
                tracing::warn!(error = %self, "Remote API failure");
                "The gallery API request failed".to_string()
            }
            other => other.to_string(),
        };
        let details = match self {
            ServiceError::Validation(errors) => Some(errors.into_map()),
            _ => None,
        };

        let response = ErrorResponse {
            error: ErrorBody {
                code: code.as_str().to_string(),
                message,
                details,
            },
        };

        (code.status_code(), Json(response)).into_response()
    }
}
