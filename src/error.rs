use std::collections::BTreeMap;

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

/// A single rule violation on one field.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("This field is required.")]
    Required,

    #[error("This field may not be null.")]
    Null,

    #[error("This field may not be blank.")]
    Blank,

    #[error("Ensure this field has no more than {0} characters.")]
    TooLong(usize),

    #[error("Enter a valid email address.")]
    InvalidEmail,

    #[error("Phone number must be entered in the format: '+444444444'. Up to 15 digits allowed.")]
    InvalidPhoneFormat,

    #[error("Phone number should only contain digits")]
    PhoneNotDigits,

    #[error("Invalid pk \"{0}\" - object does not exist.")]
    UnknownCategory(i64),

    #[error("A valid integer is required.")]
    InvalidInteger,

    #[error("Enter a valid date/time.")]
    InvalidDateTime,
}

/// Per-field error report. Serializes as `{ "field": ["message", ...] }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<&'static str, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &'static str, error: ValidationError) {
        self.0.entry(field).or_default().push(error.to_string());
    }

    /// Record every failed check for `field`.
    pub fn check<I>(&mut self, field: &'static str, results: I)
    where
        I: IntoIterator<Item = Result<(), ValidationError>>,
    {
        for result in results {
            if let Err(e) = result {
                self.add(field, e);
            }
        }
    }

    pub fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `Ok(value)` when no field failed, otherwise the whole report.
    pub fn into_result<T>(self, value: T) -> Result<T, FieldErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }

    pub fn single(field: &'static str, error: ValidationError) -> Self {
        let mut errors = Self::new();
        errors.add(field, error);
        errors
    }
}

/// Application-level error type for HTTP handlers.
///
/// Implements [`IntoResponse`] so every failure leaves the server as a JSON
/// body of the form `{ "error": ..., "code": ... }`.
#[derive(Debug, Error)]
pub enum AppError {
    /// One or more fields failed validation; nothing was written.
    #[error("Validation failed")]
    Validation(FieldErrors),

    #[error("{resource} with id {id} not found")]
    NotFound { resource: &'static str, id: i64 },

    /// Malformed request body, path or query string.
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type AppResult<T> = Result<T, AppError>;

impl From<FieldErrors> for AppError {
    fn from(errors: FieldErrors) -> Self {
        AppError::Validation(errors)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = match &self {
            AppError::Validation(fields) => json!({
                "error": self.to_string(),
                "code": "VALIDATION_ERROR",
                "fields": fields,
            }),
            AppError::NotFound { .. } => json!({
                "error": self.to_string(),
                "code": "NOT_FOUND",
            }),
            AppError::BadRequest(msg) => json!({
                "error": msg,
                "code": "BAD_REQUEST",
            }),
            AppError::Database(err) => {
                tracing::error!(error = %err, "Database error");
                json!({
                    "error": "An internal error occurred",
                    "code": "INTERNAL_ERROR",
                })
            }
        };

        (self.status_code(), Json(body)).into_response()
    }
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
