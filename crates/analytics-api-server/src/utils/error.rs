use axum::http::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid filter: {0}")]
    Validation(String),

    #[error("Insufficient role: {0}")]
    Role(String),

    #[error("Tenant not authorized: {0}")]
    Tenant(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl EngineError {
    pub fn status(&self) -> StatusCode {
        match self {
            EngineError::Validation(_) => StatusCode::BAD_REQUEST,
            EngineError::Role(_) | EngineError::Tenant(_) => StatusCode::FORBIDDEN,
            EngineError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The message shown to callers. Internal details never leak; they are
    /// logged with endpoint context at the dispatch site instead.
    pub fn public_message(&self) -> String {
        match self {
            EngineError::Validation(msg) => msg.clone(),
            EngineError::Role(msg) => msg.clone(),
            EngineError::Tenant(msg) => msg.clone(),
            EngineError::Internal(_) => "Internal error in the analytics engine".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_the_taxonomy() {
        assert_eq!(
            EngineError::Validation("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(EngineError::Role("x".into()).status(), StatusCode::FORBIDDEN);
        assert_eq!(
            EngineError::Tenant("x".into()).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            EngineError::Internal("x".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn internal_details_never_leak() {
        let err = EngineError::Internal("resolver panicked at line 42".into());
        assert!(!err.public_message().contains("line 42"));
    }
}
