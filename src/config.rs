use std::path::Path;
use std::time::Duration;

use eyre::WrapErr;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::ticks::TickSize;

/// Tuning constants for a game session.
///
/// Every field has a default, so a JSON file only needs to name the values
/// it changes:
///
/// ```json
/// { "tick_size": "0.25", "initial_price": "4500.00", "seed": 42 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Minimum price increment
    pub tick_size: Decimal,
    /// Fair value at the start of the session
    pub initial_price: Decimal,
    /// Milliseconds between market ticks
    pub tick_interval_ms: u64,
    /// Synthetic makers quoting each tick
    pub num_makers: u32,
    /// Narrowest maker spread, in ticks
    pub maker_spread_min: Decimal,
    /// Widest maker spread, in ticks
    pub maker_spread_max: Decimal,
    /// Chance of a taker arriving on a tick (0.0 to 1.0)
    pub taker_probability: f64,
    /// Largest fair value move per tick, in ticks
    pub price_volatility: Decimal,
    /// Trades kept on the tape
    pub max_trades: usize,
    /// Fair value points kept for charting
    pub max_price_history: usize,
    /// Seed for reproducible sessions; entropy when unset
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_size: dec!(0.25),
            initial_price: dec!(100000.00),
            tick_interval_ms: 750,
            num_makers: 10,
            maker_spread_min: dec!(2),
            maker_spread_max: dec!(15),
            taker_probability: 0.4,
            price_volatility: dec!(1),
            max_trades: 50,
            max_price_history: 100,
            seed: None,
        }
    }
}

impl SimulationConfig {
    /// Load configuration from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> eyre::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read config file {}", path.display()))?;

        Self::from_json(&content).wrap_err_with(|| format!("Invalid config file {}", path.display()))
    }

    /// Parse and validate configuration from a JSON string
    pub fn from_json(json: &str) -> eyre::Result<Self> {
        let config: Self = serde_json::from_str(json).wrap_err("Failed to parse config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> eyre::Result<()> {
        TickSize::new(self.tick_size)?;

        if self.initial_price <= Decimal::ZERO {
            return Err(eyre::eyre!("Initial price must be positive"));
        }

        if self.tick_interval_ms == 0 {
            return Err(eyre::eyre!("Tick interval must be positive"));
        }

        if self.maker_spread_min < Decimal::ZERO {
            return Err(eyre::eyre!("Maker spread must not be negative"));
        }

        if self.maker_spread_max < self.maker_spread_min {
            return Err(eyre::eyre!(
                "Maker spread max {} is below min {}",
                self.maker_spread_max,
                self.maker_spread_min
            ));
        }

        if !(0.0..=1.0).contains(&self.taker_probability) {
            return Err(eyre::eyre!(
                "Taker probability {} must be between 0 and 1",
                self.taker_probability
            ));
        }

        if self.price_volatility < Decimal::ZERO {
            return Err(eyre::eyre!("Price volatility must not be negative"));
        }

        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = SimulationConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.tick_interval(), Duration::from_millis(750));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = SimulationConfig::from_json(
            r#"{ "tick_size": "0.25", "initial_price": "4500.00", "seed": 42, "num_makers": 3 }"#,
        )
        .expect("valid config");

        assert_eq!(config.initial_price, dec!(4500.00));
        assert_eq!(config.num_makers, 3);
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.max_trades, 50);
        assert_eq!(config.maker_spread_max, dec!(15));
    }

    #[test]
    fn test_rejects_invalid_values() {
        let cases = [
            r#"{ "tick_size": "0" }"#,
            r#"{ "initial_price": "-1" }"#,
            r#"{ "tick_interval_ms": 0 }"#,
            r#"{ "maker_spread_min": "5", "maker_spread_max": "2" }"#,
            r#"{ "maker_spread_min": "-1" }"#,
            r#"{ "taker_probability": 1.5 }"#,
            r#"{ "price_volatility": "-0.5" }"#,
            r#"{ "num_makers": "many" }"#,
        ];

        for json in cases {
            assert!(SimulationConfig::from_json(json).is_err(), "accepted {json}");
        }
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(SimulationConfig::from_file("/nonexistent/quotebook.json").is_err());
    }
}
