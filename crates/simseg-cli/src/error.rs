use simseg_core::SimError;
use simseg_warehouse::WarehouseError;
use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] simseg_core::ValidationError),

    #[error("command error: {0}")]
    Command(String),

    #[error(transparent)]
    Search(#[from] SimError),

    #[error(transparent)]
    Warehouse(#[from] WarehouseError),

    #[error("strict mode failed: {failed_queries} queries failed")]
    StrictModeViolation { failed_queries: usize },

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) | Self::Command(_) => 2,
            Self::Search(error) => match error {
                SimError::InvalidInput(_)
                | SimError::DimensionMismatch { .. }
                | SimError::Validation(_) => 2,
                SimError::DataUnavailable { .. } => 3,
                SimError::WorkerFailure { .. } | SimError::Serialization(_) => 4,
                SimError::Io(_) => 10,
            },
            Self::Warehouse(_) => 3,
            Self::StrictModeViolation { .. } => 5,
            Self::Serialization(_) => 4,
            Self::Io(_) => 10,
        }
    }
}
