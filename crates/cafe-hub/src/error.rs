use crate::config::ConfigError;
use crate::telemetry::TelemetryError;
use crate::workflows::lifecycle::executor::TransitionError;
use crate::workflows::lifecycle::intake::IntakeError;
use crate::workflows::lifecycle::repository::{ConflictKind, RepositoryError};
use crate::workflows::lifecycle::validation::ValidationErrors;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

const STORE_UNAVAILABLE: &str = "store temporarily unavailable";

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    /// Request carried no usable actor headers.
    Unauthenticated,
    /// Actor may not read or act on the addressed record.
    Forbidden,
    /// Malformed request input outside intake: body, status or bucket labels.
    Validation(ValidationErrors),
    Lifecycle(TransitionError),
    Intake(IntakeError),
    Repository(RepositoryError),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::Validation(_) | AppError::Intake(IntakeError::Validation(_)) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Lifecycle(err) => match err {
                TransitionError::NotFound { .. } => StatusCode::NOT_FOUND,
                TransitionError::Unauthorized { .. } => StatusCode::FORBIDDEN,
                TransitionError::InvalidTransition { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                TransitionError::Conflict { .. } => StatusCode::CONFLICT,
                TransitionError::Transient(_) => StatusCode::SERVICE_UNAVAILABLE,
                TransitionError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::Intake(IntakeError::Repository(err)) | AppError::Repository(err) => {
                match err {
                    RepositoryError::NotFound => StatusCode::NOT_FOUND,
                    RepositoryError::Conflict(_) => StatusCode::CONFLICT,
                    RepositoryError::Timeout | RepositoryError::Unavailable(_) => {
                        StatusCode::SERVICE_UNAVAILABLE
                    }
                }
            }
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message shown to API callers. Store details stay in the logs.
    fn public_message(&self) -> String {
        match self {
            AppError::Unauthenticated => "missing or invalid actor headers".to_string(),
            AppError::Forbidden => "not permitted".to_string(),
            AppError::Validation(_) | AppError::Intake(IntakeError::Validation(_)) => {
                "validation failed".to_string()
            }
            AppError::Lifecycle(TransitionError::Transient(_)) => STORE_UNAVAILABLE.to_string(),
            AppError::Lifecycle(err) => err.to_string(),
            AppError::Intake(IntakeError::Repository(err)) | AppError::Repository(err) => {
                match err {
                    RepositoryError::NotFound => "record not found".to_string(),
                    RepositoryError::Conflict(ConflictKind::DuplicateGuestEmail) => {
                        "an application with this e-mail address already exists".to_string()
                    }
                    RepositoryError::Conflict(reason) => reason.to_string(),
                    RepositoryError::Timeout | RepositoryError::Unavailable(_) => {
                        STORE_UNAVAILABLE.to_string()
                    }
                }
            }
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_) => "unexpected failure".to_string(),
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Unauthenticated => write!(f, "missing or invalid actor headers"),
            AppError::Forbidden => write!(f, "not permitted"),
            AppError::Validation(err) => write!(f, "validation error: {}", err),
            AppError::Lifecycle(err) => write!(f, "lifecycle error: {}", err),
            AppError::Intake(err) => write!(f, "intake error: {}", err),
            AppError::Repository(err) => write!(f, "repository error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Unauthenticated | AppError::Forbidden => None,
            AppError::Validation(err) => Some(err),
            AppError::Lifecycle(err) => Some(err),
            AppError::Intake(err) => Some(err),
            AppError::Repository(err) => Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let message = match status {
            StatusCode::INTERNAL_SERVER_ERROR => {
                tracing::error!(error = %self, "request failed");
                "unexpected failure".to_string()
            }
            StatusCode::SERVICE_UNAVAILABLE => {
                tracing::error!(error = %self, "store unavailable");
                self.public_message()
            }
            _ => self.public_message(),
        };

        let mut payload = json!({ "success": false, "error": message });
        if let AppError::Validation(errors) | AppError::Intake(IntakeError::Validation(errors)) =
            &self
        {
            payload["details"] = json!(errors.errors);
        }
        (status, Json(payload)).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<ValidationErrors> for AppError {
    fn from(value: ValidationErrors) -> Self {
        Self::Validation(value)
    }
}

impl From<TransitionError> for AppError {
    fn from(value: TransitionError) -> Self {
        Self::Lifecycle(value)
    }
}

impl From<RepositoryError> for AppError {
    fn from(value: RepositoryError) -> Self {
        Self::Repository(value)
    }
}

impl From<IntakeError> for AppError {
    fn from(value: IntakeError) -> Self {
        Self::Intake(value)
    }
}
