//! Error types for the exchange-rate service.

/// Domain-level errors (business rule violations).
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("Invalid currency code: {0}")]
    InvalidCurrencyCode(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// Repository-level errors (data access failures).
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Entity not found")]
    NotFound,

    #[error("Conflict: {0}")]
    Conflict(String),
}

/// Errors raised by rate resolution, population and provider selection.
#[derive(Debug, thiserror::Error)]
pub enum RateError {
    #[error("Unknown currency: {0}")]
    UnknownCurrency(String),

    #[error("Invalid date range: {0}")]
    InvalidDateRange(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("No exchange-rate provider available")]
    NoProviderAvailable,

    #[error("Rate resolution stalled after {attempts} populate attempts")]
    StalledResolution { attempts: u32 },

    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl RateError {
    pub fn provider(msg: impl std::fmt::Display) -> Self {
        RateError::Provider(msg.to_string())
    }
}

/// Application-level errors (for HTTP responses).
///
/// Maps cleanly to HTTP status codes.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Domain(e) => AppError::BadRequest(e.to_string()),
            RepoError::NotFound => AppError::NotFound("Resource not found".into()),
            RepoError::Database(e) => AppError::Internal(e),
            RepoError::Conflict(e) => AppError::Conflict(e),
        }
    }
}

impl From<RateError> for AppError {
    fn from(err: RateError) -> Self {
        match err {
            RateError::UnknownCurrency(code) => {
                AppError::NotFound(format!("Currency code not found: {}", code))
            }
            RateError::InvalidDateRange(msg) => AppError::BadRequest(msg),
            RateError::Provider(msg) => AppError::Upstream(msg),
            e @ (RateError::NoProviderAvailable | RateError::StalledResolution { .. }) => {
                AppError::Unavailable(e.to_string())
            }
            RateError::Repo(e) => e.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_currency_maps_to_not_found() {
        let err: AppError = RateError::UnknownCurrency("XXX".into()).into();
        assert!(matches!(err, AppError::NotFound(msg) if msg.contains("XXX")));
    }

    #[test]
    fn test_exhausted_chain_maps_to_unavailable() {
        let err: AppError = RateError::NoProviderAvailable.into();
        assert!(matches!(err, AppError::Unavailable(_)));

        let err: AppError = RateError::StalledResolution { attempts: 3 }.into();
        assert!(matches!(err, AppError::Unavailable(msg) if msg.contains('3')));
    }

    #[test]
    fn test_repo_conflict_passes_through() {
        let err: AppError = RateError::Repo(RepoError::Conflict("USD".into())).into();
        assert!(matches!(err, AppError::Conflict(_)));
    }
}
