use portfolio_risk_core::engine::{EngineConfig, RiskEngine};
use std::fs;
use tracing::info;

/// Environment variable consulted when `--config` is absent.
pub const CONFIG_ENV: &str = "PRISK_CONFIG";

/// Parse an engine configuration from TOML. Missing tables and keys take
/// their defaults.
pub fn parse_config(contents: &str) -> Result<EngineConfig, Box<dyn std::error::Error>> {
    let config: EngineConfig =
        toml::from_str(contents).map_err(|e| format!("Invalid configuration: {e}"))?;
    Ok(config)
}

/// Build the engine from `--config`, then `$PRISK_CONFIG`, then defaults.
pub fn build_engine(path: Option<&str>) -> Result<RiskEngine, Box<dyn std::error::Error>> {
    let path = path
        .map(str::to_string)
        .or_else(|| std::env::var(CONFIG_ENV).ok());

    let config = match path {
        Some(p) => {
            let contents = fs::read_to_string(&p)
                .map_err(|e| format!("Failed to read config '{}': {}", p, e))?;
            info!(path = %p, "loaded engine configuration");
            parse_config(&contents)?
        }
        None => EngineConfig::default(),
    };
    Ok(RiskEngine::new(config)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml() {
        let cfg = parse_config(
            r#"
            parallel_threshold = 8

            [var]
            monte_carlo_simulations = 5000
            monte_carlo_seed = 7

            [var.hybrid_weights]
            historical = 0.5
            parametric = 0.25
            monte_carlo = 0.25

            [stress.factor_mapping]
            beta_scaling = true

            [stress.factor_mapping.symbol_overrides.XOM]
            equity = 0.6
            commodity = 0.8
            "#,
        )
        .unwrap();
        assert_eq!(cfg.parallel_threshold, 8);
        assert_eq!(cfg.var.monte_carlo_simulations, 5000);
        assert_eq!(cfg.var.monte_carlo_seed, Some(7));
        assert_eq!(cfg.var.lookback_days, 252);
        assert!(cfg.stress.factor_mapping.beta_scaling);
        assert_eq!(cfg.stress.factor_mapping.symbol_overrides["XOM"]["commodity"], 0.8);
        assert_eq!(cfg.stress.factor_mapping.default_factor, "equity");
        assert!(RiskEngine::new(cfg).is_ok());
    }

    #[test]
    fn test_empty_toml_is_default() {
        assert_eq!(parse_config("").unwrap(), EngineConfig::default());
    }

    #[test]
    fn test_invalid_weights_rejected_at_build() {
        let cfg = parse_config(
            "[var.hybrid_weights]\nhistorical = 0.9\nparametric = 0.3\nmonte_carlo = 0.3\n",
        ).unwrap();
        assert!(RiskEngine::new(cfg).is_err());
    }
}
