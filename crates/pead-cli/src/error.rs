use pead_core::{EarningsError, PipelineError};
use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Earnings(#[from] EarningsError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

impl CliError {
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::InvalidArgument(_) => 2,
            Self::Earnings(error) => earnings_exit_code(error),
            Self::Pipeline(PipelineError::Earnings(error)) => earnings_exit_code(error),
            Self::Pipeline(PipelineError::Io(_)) => 10,
            Self::Pipeline(_) => 3,
            Self::Serialization(_) => 4,
        }
    }
}

fn earnings_exit_code(error: &EarningsError) -> u8 {
    match error {
        EarningsError::Open { .. } => 10,
        EarningsError::Csv(_) | EarningsError::MissingColumn { .. } => 2,
    }
}
