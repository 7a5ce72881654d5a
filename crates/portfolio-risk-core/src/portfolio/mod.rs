//! Portfolio and position value objects shared by the VaR estimators and the
//! stress engine.

pub mod correlation;
mod model;
pub mod returns;

pub use correlation::{CorrelationMatrix, DEFAULT_CORRELATION};
pub use model::{Portfolio, PortfolioInput, Position, PositionInput};
