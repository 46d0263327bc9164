//! Driven ports: capabilities the module consumes from its host.
//!
//! Every trait here stands in for a real collaborator that is explicitly
//! out of scope for this CORE (the staking module, the slashing module,
//! the bank module, the host's event manager). Production adapters live
//! outside this crate; [`crate::adapters`] only ships in-memory stand-ins
//! used by the module's own test suite.

use crate::domain::{Decimal, OracleError, ValidatorOracle};

/// A bonded validator as seen by the staking module.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatorInfo {
    pub validator_addr: String,
    pub consensus_addr: String,
    pub voting_power: Decimal,
    pub bonded: bool,
}

/// Read-only view onto the staking module's bond state.
pub trait StakingView {
    fn get_validator(&self, validator_addr: &str) -> Option<ValidatorInfo>;

    /// Bonded validators, delivered in descending voting-power order.
    fn iterate_bonded_by_power(&self) -> Vec<ValidatorInfo>;

    /// Scales bonded tokens to voting power.
    fn power_reduction(&self) -> Decimal;

    fn total_bonded_power(&self) -> Decimal {
        self.iterate_bonded_by_power()
            .into_iter()
            .fold(Decimal::zero(), |acc, v| {
                acc.checked_add(&v.voting_power).unwrap_or(acc)
            })
    }
}

/// The slashing module's single entry point.
pub trait SlashingView {
    fn slash(
        &mut self,
        cons_addr: &str,
        factor: Decimal,
        infraction_height: u64,
        power: Decimal,
    ) -> Result<(), OracleError>;
}

/// The bank module's coin-transfer capability.
///
/// Present for interface completeness per the module's external-interface
/// contract; the aggregation CORE never calls it directly.
pub trait BankView {
    fn send_from_module(&mut self, to_addr: &str, amount: u64) -> Result<(), OracleError>;
}

/// Pluggable geolocation / diversity predicate.
///
/// Only a predicate interface is specified as CORE; any concrete IP/ASN/
/// region policy is a host-side adapter decision.
pub trait DiversityPolicy {
    fn is_allowed(&self, validator: &ValidatorOracle) -> bool;
}

/// Permits every validator; the default when no diversity policy is wired.
pub struct PermissiveDiversityPolicy;

impl DiversityPolicy for PermissiveDiversityPolicy {
    fn is_allowed(&self, _validator: &ValidatorOracle) -> bool {
        true
    }
}

/// A single subscriber in the module's hook chain.
///
/// Modeled as a trait object per the redesign away from an
/// interface-based chain with per-handler nil tolerance: the chain is a
/// `Vec<Box<dyn OracleHook>>` with no `None` entries (callers simply don't
/// push a hook they don't need), and a handler's error is surfaced to the
/// caller without rolling back the state change that triggered it.
pub trait OracleHook: Send + Sync {
    fn on_price_submitted(&self, _validator_addr: &str, _asset: &str, _price: &Decimal) -> Result<(), String> {
        Ok(())
    }

    fn on_price_aggregated(&self, _asset: &str, _price: &Decimal, _block_height: u64) -> Result<(), String> {
        Ok(())
    }

    fn on_circuit_breaker(&self, _reason: &str) -> Result<(), String> {
        Ok(())
    }
}
