use thiserror::Error;

/// Validation and contract errors raised while constructing domain values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("symbol cannot be empty")]
    EmptySymbol,
    #[error("symbol length {len} exceeds max {max}")]
    SymbolTooLong { len: usize, max: usize },
    #[error("symbol contains invalid character '{ch}' at index {index}")]
    SymbolInvalidChar { ch: char, index: usize },

    #[error("date must be formatted as YYYY-MM-DD: '{value}'")]
    InvalidDate { value: String },

    #[error("field '{field}' must be finite")]
    NonFiniteValue { field: &'static str },
    #[error("field '{field}' must be non-negative")]
    NegativeValue { field: &'static str },

    #[error("bar dates must be strictly increasing: {previous} is followed by {next}")]
    UnorderedDates { previous: String, next: String },

    #[error("config field '{field}' must be greater than zero")]
    ZeroConfigValue { field: &'static str },
}

/// Top-level error type for search operations.
#[derive(Debug, Error)]
pub enum SimError {
    /// Empty series, non-positive normalization scale or an invalid domain value.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("segment length mismatch: {left} vs {right}")]
    DimensionMismatch { left: usize, right: usize },

    #[error("data unavailable for '{symbol}': {reason}")]
    DataUnavailable { symbol: String, reason: String },

    #[error("worker failed while searching '{symbol}': {message}")]
    WorkerFailure { symbol: String, message: String },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SimError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn data_unavailable(symbol: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::DataUnavailable {
            symbol: symbol.into(),
            reason: reason.into(),
        }
    }

    /// Errors that invalidate the whole run rather than a single query.
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::DataUnavailable { .. } | Self::Io(_) | Self::Serialization(_)
        )
    }
}

impl From<simseg_warehouse::WarehouseError> for SimError {
    fn from(error: simseg_warehouse::WarehouseError) -> Self {
        Self::DataUnavailable {
            symbol: String::from("<warehouse>"),
            reason: error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_fatal_errors() {
        assert!(SimError::data_unavailable("005930", "missing").is_fatal());
        assert!(!SimError::DimensionMismatch { left: 5, right: 4 }.is_fatal());
        assert!(!SimError::WorkerFailure {
            symbol: String::from("A"),
            message: String::from("boom"),
        }
        .is_fatal());
    }
}
