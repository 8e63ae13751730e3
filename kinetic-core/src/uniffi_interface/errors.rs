use crate::config::ConfigError;
use crate::db::StoreError;
use crate::db::operations::LogWorkoutError;
use crate::messaging::MessagingError;
use crate::session::SessionError;
use crate::validation::ValidationErrors;
use thiserror::Error as ThisError;

#[derive(Debug, ThisError, uniffi::Error)]
#[uniffi(flat_error)]
#[non_exhaustive]
pub enum KineticError {
    #[error("session error: {0}")]
    Session(String),
    #[error("storage error: {0}")]
    Store(String),
    #[error("{0}")]
    Validation(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("messaging error: {0}")]
    Messaging(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("error: {0}")]
    Common(String),
}

impl From<SessionError> for KineticError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::Persistence(store) => store.into(),
            SessionError::Invalid(errors) => errors.into(),
            other => KineticError::Session(other.to_string()),
        }
    }
}

impl From<StoreError> for KineticError {
    fn from(e: StoreError) -> Self {
        KineticError::Store(e.to_string())
    }
}

impl From<ValidationErrors> for KineticError {
    fn from(e: ValidationErrors) -> Self {
        KineticError::Validation(e.to_string())
    }
}

impl From<LogWorkoutError> for KineticError {
    fn from(e: LogWorkoutError) -> Self {
        match e {
            LogWorkoutError::Invalid(errors) => errors.into(),
            LogWorkoutError::Store(store) => store.into(),
        }
    }
}

impl From<ConfigError> for KineticError {
    fn from(e: ConfigError) -> Self {
        KineticError::Config(e.to_string())
    }
}

impl From<MessagingError> for KineticError {
    fn from(e: MessagingError) -> Self {
        match e {
            MessagingError::Store(store) => store.into(),
            other => KineticError::Messaging(other.to_string()),
        }
    }
}

impl From<anyhow::Error> for KineticError {
    fn from(e: anyhow::Error) -> Self {
        KineticError::Common(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn persistence_failures_surface_as_store_errors() {
        let err: KineticError =
            SessionError::Persistence(StoreError::Backend("disk full".into())).into();
        assert!(matches!(err, KineticError::Store(ref m) if m.contains("disk full")));

        let err: KineticError = SessionError::IncompleteSet.into();
        assert!(matches!(err, KineticError::Session(_)));

        let mut errors = ValidationErrors::default();
        errors.push("weight", "must be a non-negative number");
        let err: KineticError = SessionError::Invalid(errors).into();
        assert!(matches!(err, KineticError::Validation(ref m) if m.contains("weight")));
    }
}
