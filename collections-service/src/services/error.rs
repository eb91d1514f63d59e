//! Mapping of domain and collaborator errors onto HTTP-facing [`AppError`]s.

use service_core::error::AppError;

use super::extraction::ExtractionError;
use super::identity::IdentityError;
use crate::domain::access::AccessDenied;
use crate::domain::import::ImportError;
use crate::domain::reconciliation::ReconciliationError;
use crate::domain::recording::RecordingError;
use crate::domain::statement::StatementError;

impl From<RecordingError> for AppError {
    fn from(err: RecordingError) -> Self {
        AppError::BadRequest(anyhow::Error::new(err))
    }
}

impl From<ImportError> for AppError {
    fn from(err: ImportError) -> Self {
        AppError::BadRequest(anyhow::Error::new(err))
    }
}

impl From<StatementError> for AppError {
    fn from(err: StatementError) -> Self {
        AppError::BadRequest(anyhow::Error::new(err))
    }
}

impl From<ReconciliationError> for AppError {
    fn from(err: ReconciliationError) -> Self {
        match err {
            ReconciliationError::NotMatched(_) | ReconciliationError::StatusMismatch { .. } => {
                AppError::Conflict(anyhow::Error::new(err))
            }
            _ => AppError::BadRequest(anyhow::Error::new(err)),
        }
    }
}

impl From<AccessDenied> for AppError {
    fn from(err: AccessDenied) -> Self {
        AppError::Forbidden(anyhow::Error::new(err))
    }
}

impl From<IdentityError> for AppError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::InvalidCredentials => AppError::Unauthorized(anyhow::Error::new(err)),
            IdentityError::EmailExists => AppError::Conflict(anyhow::Error::new(err)),
            IdentityError::NotConfigured => AppError::ServiceUnavailable(err.to_string()),
            IdentityError::Rejected(_) | IdentityError::NetworkError(_) => {
                AppError::BadGateway(err.to_string())
            }
        }
    }
}

impl From<ExtractionError> for AppError {
    fn from(err: ExtractionError) -> Self {
        match err {
            ExtractionError::InvalidImage(_) => AppError::BadRequest(anyhow::Error::new(err)),
            _ => AppError::BadGateway(err.to_string()),
        }
    }
}
