use thiserror::Error;
use validator::ValidationErrors;

use crate::{dao::storage::StorageError, state::state_machine::Rejection};

/// Errors that can occur while preparing a game.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Storage backend failed.
    #[error("storage unavailable")]
    Storage(#[source] StorageError),
    /// The selection cannot produce a playable game (no phrases, too few teams).
    #[error("invalid game configuration: {0}")]
    InvalidConfig(String),
    /// Invalid input provided by the setup screen.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        ServiceError::Storage(err)
    }
}

impl From<ValidationErrors> for ServiceError {
    fn from(err: ValidationErrors) -> Self {
        ServiceError::InvalidInput(format!("validation failed: {}", err))
    }
}

impl ServiceError {
    /// Message suitable for an alert on the setup screen.
    pub fn notice(&self) -> String {
        match self {
            ServiceError::Storage(_) => {
                "The phrase library could not be read. Please try again.".into()
            }
            ServiceError::InvalidConfig(message)
            | ServiceError::InvalidInput(message)
            | ServiceError::NotFound(message) => message.clone(),
        }
    }
}

/// Errors returned by a [`SessionHandle`](crate::services::session::SessionHandle).
#[derive(Debug, Error)]
pub enum SessionError {
    /// The session task is gone (game left or finished and torn down).
    #[error("game session closed")]
    Closed,
    /// The state machine refused the event.
    #[error(transparent)]
    Rejected(#[from] Rejection),
}

impl SessionError {
    /// The refusal, when the session is still alive.
    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            SessionError::Rejected(rejection) => Some(rejection),
            SessionError::Closed => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::state_machine::{GameEvent, GamePhase};

    #[test]
    fn storage_errors_convert_into_service_errors() {
        let err: ServiceError = StorageError::InvalidContent("dangling phrase".into()).into();
        assert!(matches!(err, ServiceError::Storage(_)));
        assert!(err.notice().contains("phrase library"));
    }

    #[test]
    fn rejections_convert_into_session_errors() {
        let err: SessionError = Rejection::InvalidTransition {
            from: GamePhase::NotStarted,
            event: GameEvent::StartTurn,
        }
        .into();
        assert!(err.rejection().is_some());
        assert!(SessionError::Closed.rejection().is_none());
    }
}
