use thiserror::Error;

#[derive(Debug, Error)]
pub enum RiskEngineError {
    #[error("Invalid portfolio: {0}")]
    InvalidPortfolio(String),

    #[error("Unsupported VaR method: {0}")]
    UnsupportedMethod(String),

    #[error("Invalid scenario: {0}")]
    InvalidScenario(String),

    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Division by zero in {context}")]
    DivisionByZero { context: String },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for RiskEngineError {
    fn from(e: serde_json::Error) -> Self {
        RiskEngineError::SerializationError(e.to_string())
    }
}

impl From<std::io::Error> for RiskEngineError {
    fn from(e: std::io::Error) -> Self {
        RiskEngineError::Storage(e.to_string())
    }
}
