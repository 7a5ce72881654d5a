use serde::{Deserialize, Serialize};

use crate::stress::StressConfig;
use crate::var::VarConfig;
use crate::RiskEngineResult;

/// Batches at least this long fan out across the rayon pool.
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 4;

/// Everything a [`RiskEngine`](super::RiskEngine) is configured with.
/// Every field has a default, so a partial document deserialises.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub var: VarConfig,
    pub stress: StressConfig,
    pub parallel_threshold: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            var: VarConfig::default(),
            stress: StressConfig::default(),
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> RiskEngineResult<()> {
        self.var.validate()?;
        self.stress.validate()
    }
}
