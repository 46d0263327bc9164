//! Validator price votes and the aggregated price records they produce.

use serde::{Deserialize, Serialize};

use super::decimal::Decimal;
use super::error::OracleError;

/// Maximum length, in bytes, of an asset symbol.
pub const MAX_ASSET_LEN: usize = 128;

/// Validate an asset symbol: 1..=128 bytes, no further format check.
pub fn validate_asset(asset: &str) -> Result<(), OracleError> {
    if asset.is_empty() || asset.len() > MAX_ASSET_LEN {
        return Err(OracleError::InvalidAsset(asset.to_string()));
    }
    Ok(())
}

/// A single validator's staged price vote for the current period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatorPrice {
    pub validator_addr: String,
    pub asset: String,
    pub price: Decimal,
    pub block_height: u64,
    pub voting_power: Decimal,
}

/// The canonical price for an asset after a successful aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Price {
    pub asset: String,
    pub price: Decimal,
    pub block_height: u64,
    pub block_time: i64,
    pub num_validators: u32,
}

impl Price {
    /// Check the storage invariant: `price > 0 ∧ num_validators ≥ 1 ∧
    /// block_height ≥ 0 ∧ block_time ≥ 0`.
    pub fn check_invariant(&self) -> Result<(), OracleError> {
        if !self.price.is_positive() {
            return Err(OracleError::InvalidPrice(self.price.to_string()));
        }
        if self.num_validators == 0 {
            return Err(OracleError::MedianCalculationFailed(self.asset.clone()));
        }
        if self.block_time < 0 {
            return Err(OracleError::StateCorruption(format!(
                "negative block_time for {}",
                self.asset
            )));
        }
        Ok(())
    }
}

/// An immutable historical `(asset, block_height, price, block_time)`
/// tuple, appended on every successful aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSnapshot {
    pub asset: String,
    pub price: Decimal,
    pub block_height: u64,
    pub block_time: i64,
}

impl From<&Price> for PriceSnapshot {
    fn from(price: &Price) -> Self {
        PriceSnapshot {
            asset: price.asset.clone(),
            price: price.price,
            block_height: price.block_height,
            block_time: price.block_time,
        }
    }
}
