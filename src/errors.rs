use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;

/// Application-specific error types.
///
/// Upstream* variants map 1:1 from officer-registry HTTP statuses and
/// transport failures; none of them are retried by the core.
#[derive(Debug)]
pub enum AppError {
    /// Database-related errors. Propagate unclassified to the boundary (5xx).
    DatabaseError(sqlx::Error),
    /// Bad request (blank query, invalid search mode). Rejected before any I/O.
    BadRequest(String),
    /// Missing or placeholder configuration (e.g. officer-registry API key
    /// not set). Distinguishable from transient upstream failures.
    Configuration(String),
    /// Officer registry rejected our credentials (HTTP 401).
    UpstreamAuth(String),
    /// Officer registry rate limit hit (HTTP 429).
    UpstreamRateLimited(String),
    /// Officer registry rejected the request (HTTP 400), with upstream detail.
    UpstreamBadRequest(String),
    /// Any other non-200 from the officer registry.
    UpstreamUnavailable(String),
    /// Officer-registry call exceeded its per-call timeout.
    UpstreamTimeout(String),
    /// Transport-level failure talking to the officer registry.
    UpstreamNetwork(String),
    /// Internal server error.
    InternalError(String),
    /// Error with context chain for better debugging.
    WithContext {
        /// The underlying source of the error.
        source: Box<AppError>,
        /// Additional context message.
        context: String,
    },
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::DatabaseError(e) => write!(f, "Database error: {}", e),
            AppError::BadRequest(msg)
            | AppError::Configuration(msg)
            | AppError::UpstreamAuth(msg)
            | AppError::UpstreamRateLimited(msg)
            | AppError::UpstreamBadRequest(msg)
            | AppError::UpstreamUnavailable(msg)
            | AppError::UpstreamTimeout(msg)
            | AppError::UpstreamNetwork(msg) => write!(f, "{}", msg),
            AppError::InternalError(msg) => write!(f, "Internal error: {}", msg),
            AppError::WithContext { source, context } => {
                write!(f, "{}: {}", context, source)
            }
        }
    }
}

impl AppError {
    /// User-facing message for structured `success: false` response bodies.
    /// Database and internal details are not leaked to callers.
    pub fn user_message(&self) -> String {
        match self {
            AppError::DatabaseError(_) => "Database error. Please try again later.".to_string(),
            AppError::InternalError(_) => "Internal server error".to_string(),
            AppError::WithContext { source, .. } => source.user_message(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    /// Maps each error variant to an HTTP status code and JSON body, logging
    /// by severity.
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::DatabaseError(e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error".to_string(),
                )
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Configuration(msg) => {
                tracing::error!("Configuration error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, msg.clone())
            }
            AppError::UpstreamAuth(msg) => {
                tracing::error!("Officer registry auth failure: {}", msg);
                (StatusCode::BAD_GATEWAY, msg.clone())
            }
            AppError::UpstreamRateLimited(msg) => {
                tracing::warn!("Officer registry rate limited: {}", msg);
                (StatusCode::TOO_MANY_REQUESTS, msg.clone())
            }
            AppError::UpstreamBadRequest(msg) => {
                tracing::warn!("Officer registry rejected request: {}", msg);
                (StatusCode::BAD_GATEWAY, msg.clone())
            }
            AppError::UpstreamUnavailable(msg) => {
                tracing::error!("Officer registry unavailable: {}", msg);
                (StatusCode::BAD_GATEWAY, msg.clone())
            }
            AppError::UpstreamTimeout(msg) => {
                tracing::warn!("Officer registry timeout: {}", msg);
                (StatusCode::GATEWAY_TIMEOUT, msg.clone())
            }
            AppError::UpstreamNetwork(msg) => {
                tracing::error!("Officer registry network error: {}", msg);
                (StatusCode::BAD_GATEWAY, msg.clone())
            }
            AppError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            AppError::WithContext { source, context } => {
                tracing::error!("Error with context: {} -> {}", context, source);
                return source.clone().into_response();
            }
        };

        let body = Json(json!({
            "success": false,
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

// Make AppError cloneable for the WithContext variant.
impl Clone for AppError {
    /// Note: `sqlx::Error` is not cloneable, so `DatabaseError` is simplified
    /// to `RowNotFound` during cloning.
    fn clone(&self) -> Self {
        match self {
            AppError::DatabaseError(_e) => AppError::DatabaseError(sqlx::Error::RowNotFound),
            AppError::BadRequest(msg) => AppError::BadRequest(msg.clone()),
            AppError::Configuration(msg) => AppError::Configuration(msg.clone()),
            AppError::UpstreamAuth(msg) => AppError::UpstreamAuth(msg.clone()),
            AppError::UpstreamRateLimited(msg) => AppError::UpstreamRateLimited(msg.clone()),
            AppError::UpstreamBadRequest(msg) => AppError::UpstreamBadRequest(msg.clone()),
            AppError::UpstreamUnavailable(msg) => AppError::UpstreamUnavailable(msg.clone()),
            AppError::UpstreamTimeout(msg) => AppError::UpstreamTimeout(msg.clone()),
            AppError::UpstreamNetwork(msg) => AppError::UpstreamNetwork(msg.clone()),
            AppError::InternalError(msg) => AppError::InternalError(msg.clone()),
            AppError::WithContext { source, context } => AppError::WithContext {
                source: source.clone(),
                context: context.clone(),
            },
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::DatabaseError(err)
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AppError::UpstreamTimeout("Request timed out. Please try again.".to_string())
        } else {
            AppError::UpstreamNetwork(format!("Network error: {}", err))
        }
    }
}

/// Extension trait for adding context to errors.
/// Similar to `anyhow::Context` but for our `AppError` type.
pub trait ResultExt<T> {
    /// Add context to an error.
    fn context(self, context: impl Into<String>) -> Result<T, AppError>;

    /// Add context lazily (only evaluated on error).
    #[allow(dead_code)]
    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T, AppError> {
    fn context(self, context: impl Into<String>) -> Result<T, AppError> {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e),
            context: context.into(),
        })
    }

    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e),
            context: f(),
        })
    }
}

impl<T> ResultExt<T> for Result<T, sqlx::Error> {
    fn context(self, context: impl Into<String>) -> Result<T, AppError> {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(AppError::DatabaseError(e)),
            context: context.into(),
        })
    }

    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(AppError::DatabaseError(e)),
            context: f(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_wraps_sqlx_errors() {
        let result: Result<(), sqlx::Error> = Err(sqlx::Error::PoolTimedOut);
        let err = result.context("Company number query failed").unwrap_err();
        match &err {
            AppError::WithContext { source, context } => {
                assert_eq!(context, "Company number query failed");
                assert!(matches!(**source, AppError::DatabaseError(_)));
            }
            other => panic!("expected WithContext, got {:?}", other),
        }
        assert!(err.to_string().starts_with("Company number query failed: "));
    }

    #[test]
    fn context_user_message_delegates_without_leaking_internals() {
        let result: Result<(), sqlx::Error> = Err(sqlx::Error::PoolTimedOut);
        let err = result.context("Payment lookup failed").unwrap_err();
        assert_eq!(err.user_message(), "Database error. Please try again later.");
    }

    #[test]
    fn with_context_is_lazy_on_ok() {
        let result: Result<u32, AppError> = Ok(7);
        let value = result
            .with_context(|| unreachable!("closure must not run on Ok"))
            .unwrap();
        assert_eq!(value, 7);
    }
}
