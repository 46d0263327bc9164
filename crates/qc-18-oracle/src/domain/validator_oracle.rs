//! Per-validator liveness, delegation, slashing, and pause records.

use serde::{Deserialize, Serialize};

/// Per-validator liveness bookkeeping, one record per validator that has
/// ever submitted a price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatorOracle {
    pub validator_addr: String,
    pub miss_counter: u64,
    /// Submissions that passed diversity and outlier filtering.
    pub accurate_submissions: u64,
    pub total_submissions: u64,
    pub is_active: bool,
    pub geographic_region: Option<String>,
    pub ip_address: Option<String>,
    pub asn: Option<String>,
}

impl ValidatorOracle {
    pub fn new(validator_addr: impl Into<String>) -> Self {
        ValidatorOracle {
            validator_addr: validator_addr.into(),
            miss_counter: 0,
            accurate_submissions: 0,
            total_submissions: 0,
            is_active: true,
            geographic_region: None,
            ip_address: None,
            asn: None,
        }
    }

    /// `miss_counter + accurate_submissions ≤ total_submissions`.
    pub fn invariant_holds(&self) -> bool {
        self.miss_counter
            .saturating_add(self.accurate_submissions)
            <= self.total_submissions
    }
}

/// `validator_addr -> feeder_addr`. Absence means the validator's own
/// operator account is its feeder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeederDelegation {
    pub validator_addr: String,
    pub feeder_addr: String,
}

/// Cumulative slashing history for one validator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlashingInfo {
    pub validator_addr: String,
    pub miss_count: u64,
    pub slashed_amount: crate::domain::decimal::Decimal,
    pub slashed_height: u64,
    pub jailed_until: u64,
    /// Guards idempotence: a validator is slashed at most once per block.
    pub last_slashed_height: u64,
}

/// Singleton manual pause state for submissions, toggled by
/// `emergency_admin`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct EmergencyPauseState {
    pub paused: bool,
    pub paused_by: Option<String>,
    pub reason: Option<String>,
    pub height: u64,
}

/// Singleton circuit-breaker state, distinct from [`EmergencyPauseState`]:
/// the breaker trips on an operational condition (a repeated aggregation
/// failure, a data-quality alarm) rather than a deliberate pause, and is
/// opened/closed by the same `emergency_admin` principal. While open, all
/// submissions are rejected with `circuit_breaker_active`, which starves
/// every asset's next aggregation of new votes without the aggregator
/// itself needing to know the breaker exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CircuitBreakerState {
    pub open: bool,
    pub opened_by: Option<String>,
    pub reason: Option<String>,
    pub opened_height: u64,
}
