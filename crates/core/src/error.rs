// Central Error Type for the engine

use thiserror::Error;

/// Engine-level error type.
///
/// Only batch-fatal conditions live here; per-target failures are
/// `OperationError` values inside results.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Worker pool setup failed: {0}")]
    PoolSetup(String),

    #[error("Domain error: {0}")]
    Domain(#[from] crate::domain::DomainError),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias using EngineError
pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Target;

    fn parse(raw: &str) -> Result<Target> {
        Ok(raw.parse::<Target>()?)
    }

    #[test]
    fn test_domain_error_propagates_with_question_mark() {
        let err = parse("host:99999").unwrap_err();
        assert!(matches!(err, EngineError::Domain(_)));
        assert!(err.to_string().contains("invalid port"));
    }
}
