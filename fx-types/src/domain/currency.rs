//! Currency registry record.

use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

use crate::error::DomainError;

/// A currency known to the service.
///
/// Identity is the code; it is the join key for every stored exchange rate,
/// so it never changes once rates reference it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Currency {
    /// ISO 4217 code
    #[schema(example = "USD")]
    pub code: String,
    #[schema(example = "United States Dollar")]
    pub name: String,
    #[schema(example = "$")]
    pub symbol: String,
}

impl Currency {
    /// Creates a currency, normalising the code to upper case.
    pub fn new(
        code: impl AsRef<str>,
        name: impl Into<String>,
        symbol: impl Into<String>,
    ) -> Result<Self, DomainError> {
        let code = Self::normalize_code(code.as_ref())?;
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::ValidationError(
                "Currency name cannot be empty".into(),
            ));
        }
        Ok(Self {
            code,
            name,
            symbol: symbol.into(),
        })
    }

    /// Validates a currency code: exactly three ASCII letters.
    pub fn normalize_code(code: &str) -> Result<String, DomainError> {
        let code = code.trim();
        if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(DomainError::InvalidCurrencyCode(code.to_string()));
        }
        Ok(code.to_ascii_uppercase())
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_currency_code_is_uppercased() {
        let c = Currency::new("eur", "Euro", "€").unwrap();
        assert_eq!(c.code, "EUR");
        assert_eq!(c.to_string(), "EUR");
    }

    #[test]
    fn test_invalid_code_rejected() {
        for bad in ["", "US", "USDX", "U$D"] {
            assert!(matches!(
                Currency::new(bad, "Name", "?"),
                Err(DomainError::InvalidCurrencyCode(_))
            ));
        }
    }

    #[test]
    fn test_empty_name_rejected() {
        assert!(matches!(
            Currency::new("USD", "  ", "$"),
            Err(DomainError::ValidationError(_))
        ));
    }
}
