//! Configuration for the auction house.
//!
//! This module defines the fee schedule and the operational parameters the
//! engine applies to every lot. Fees are snapshotted into each lot at creation.

use auction_types::{Address, FeeSchedule, ONE_HUNDRED_PERCENT};
use serde::{Deserialize, Serialize};

/// Top-level configuration for the auction house.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AuctionHouseConfig {
    /// Fee parameters
    pub fees: FeeConfig,

    /// Number of bids decrypted right after the private key is submitted
    pub initial_decrypt_batch: usize,

    /// Seconds after conclusion during which only settlement is possible;
    /// afterwards an unsettled lot can be aborted
    pub dedicated_settle_period: u64,

    /// Minimum lot duration in seconds
    pub min_auction_duration: u64,
}

/// Fee configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FeeConfig {
    /// Protocol fee recipient
    pub protocol: Address,
    /// Protocol fee on winning bid amounts
    pub protocol_fee: u32,
    /// Upper bound for the referrer fee a seller may set
    pub max_referrer_fee: u32,
    /// Upper bound for curator fees
    pub max_curator_fee: u32,
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            protocol: [0u8; 32],
            protocol_fee: 1_000,      // 1%
            max_referrer_fee: 1_000,  // 1%
            max_curator_fee: 5_000,   // 5%
        }
    }
}

impl Default for AuctionHouseConfig {
    fn default() -> Self {
        Self {
            fees: FeeConfig::default(),
            initial_decrypt_batch: 0,
            dedicated_settle_period: 6 * 3600, // 6 hours
            min_auction_duration: 3600,        // 1 hour
        }
    }
}

impl AuctionHouseConfig {
    /// Parse a JSON configuration. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Snapshot the fee schedule for a lot using `referrer_fee`.
    pub fn fee_schedule(&self, referrer_fee: u32) -> FeeSchedule {
        FeeSchedule {
            protocol: self.fees.protocol,
            protocol_fee: self.fees.protocol_fee,
            referrer_fee,
            max_referrer_fee: self.fees.max_referrer_fee,
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fees = &self.fees;
        if fees.protocol_fee.saturating_add(fees.max_referrer_fee) >= ONE_HUNDRED_PERCENT {
            return Err(ConfigError::InvalidFees(
                "Protocol and referrer fees must total less than 100%".into(),
            ));
        }
        if fees.max_curator_fee >= ONE_HUNDRED_PERCENT {
            return Err(ConfigError::InvalidFees(
                "Curator fee must be less than 100%".into(),
            ));
        }
        if self.min_auction_duration == 0 {
            return Err(ConfigError::InvalidTiming(
                "Minimum duration cannot be zero".into(),
            ));
        }
        if self.dedicated_settle_period == 0 {
            return Err(ConfigError::InvalidTiming(
                "Dedicated settle period cannot be zero".into(),
            ));
        }
        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid fee configuration: {0}")]
    InvalidFees(String),

    #[error("Invalid timing configuration: {0}")]
    InvalidTiming(String),

    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AuctionHouseConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_fees_must_leave_proceeds() {
        let mut config = AuctionHouseConfig::default();
        config.fees.protocol_fee = 60_000;
        config.fees.max_referrer_fee = 40_000;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidFees(_))
        ));
    }

    #[test]
    fn test_invalid_timing() {
        let mut config = AuctionHouseConfig::default();
        config.min_auction_duration = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidTiming(_))
        ));
    }

    #[test]
    fn test_from_json_fills_defaults() {
        let config = AuctionHouseConfig::from_json(
            r#"{"initial_decrypt_batch": 25, "fees": {"protocol": [7,7,7,7,7,7,7,7,7,7,7,7,7,7,7,7,7,7,7,7,7,7,7,7,7,7,7,7,7,7,7,7], "protocol_fee": 500, "max_referrer_fee": 250, "max_curator_fee": 0}}"#,
        )
        .unwrap();
        assert_eq!(config.initial_decrypt_batch, 25);
        assert_eq!(config.fees.protocol, [7u8; 32]);
        assert_eq!(config.dedicated_settle_period, 6 * 3600);

        let schedule = config.fee_schedule(100);
        assert_eq!(schedule.protocol_fee, 500);
        assert_eq!(schedule.referrer_fee, 100);
        assert_eq!(schedule.max_referrer_fee, 250);
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(matches!(
            AuctionHouseConfig::from_json("not json"),
            Err(ConfigError::Parse(_))
        ));
    }
}
