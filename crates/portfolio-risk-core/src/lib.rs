pub mod error;
pub mod portfolio;
pub mod types;

#[cfg(feature = "var")]
pub mod var;

#[cfg(feature = "var")]
pub mod backtesting;

#[cfg(feature = "stress")]
pub mod stress;

#[cfg(feature = "stress")]
mod parallel;

#[cfg(feature = "store")]
pub mod store;

#[cfg(feature = "store")]
pub mod engine;

pub use error::RiskEngineError;
pub use types::*;

/// Standard result type for all risk engine operations
pub type RiskEngineResult<T> = Result<T, RiskEngineError>;
