use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Budget exhausted: {0}")]
    BudgetExhausted(String),

    #[error("Backtest step failed: {0}")]
    BacktestStepFailure(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Repository error: {0}")]
    RepositoryError(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

