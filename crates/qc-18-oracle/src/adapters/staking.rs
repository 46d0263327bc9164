//! In-memory stand-in for the staking module, used by this crate's own
//! tests. Mirrors [`InMemoryEventBus`](crate::adapters::hooks::InMemoryHooks)
//! in spirit: a minimal adapter good enough to exercise the ports, not a
//! production implementation of the staking module.

use std::collections::BTreeMap;

use crate::domain::Decimal;
use crate::ports::outbound::{StakingView, ValidatorInfo};

#[derive(Default)]
pub struct InMemoryStakingView {
    validators: BTreeMap<String, ValidatorInfo>,
    power_reduction: Decimal,
}

impl InMemoryStakingView {
    pub fn new() -> Self {
        InMemoryStakingView {
            validators: BTreeMap::new(),
            power_reduction: Decimal::one(),
        }
    }

    pub fn bond(&mut self, validator_addr: &str, voting_power: Decimal) {
        self.validators.insert(
            validator_addr.to_string(),
            ValidatorInfo {
                validator_addr: validator_addr.to_string(),
                consensus_addr: validator_addr.to_string(),
                voting_power,
                bonded: true,
            },
        );
    }

    pub fn unbond(&mut self, validator_addr: &str) {
        if let Some(v) = self.validators.get_mut(validator_addr) {
            v.bonded = false;
        }
    }
}

impl StakingView for InMemoryStakingView {
    fn get_validator(&self, validator_addr: &str) -> Option<ValidatorInfo> {
        self.validators.get(validator_addr).cloned()
    }

    fn iterate_bonded_by_power(&self) -> Vec<ValidatorInfo> {
        let mut bonded: Vec<ValidatorInfo> = self
            .validators
            .values()
            .filter(|v| v.bonded)
            .cloned()
            .collect();
        bonded.sort_by(|a, b| b.voting_power.cmp(&a.voting_power));
        bonded
    }

    fn power_reduction(&self) -> Decimal {
        self.power_reduction
    }
}
