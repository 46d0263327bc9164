//! In-memory stand-in for the slashing module's `slash` entry point.

use crate::domain::{Decimal, OracleError};
use crate::ports::outbound::SlashingView;

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedSlash {
    pub cons_addr: String,
    pub factor: Decimal,
    pub infraction_height: u64,
    pub power: Decimal,
}

#[derive(Default)]
pub struct InMemorySlashingView {
    calls: Vec<RecordedSlash>,
    /// Addresses for which the adapter simulates a failed external call,
    /// exercising the "failure is fatal for that validator only" rule.
    failing: std::collections::HashSet<String>,
}

impl InMemorySlashingView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_for(&mut self, cons_addr: &str) {
        self.failing.insert(cons_addr.to_string());
    }

    pub fn calls(&self) -> &[RecordedSlash] {
        &self.calls
    }
}

impl SlashingView for InMemorySlashingView {
    fn slash(
        &mut self,
        cons_addr: &str,
        factor: Decimal,
        infraction_height: u64,
        power: Decimal,
    ) -> Result<(), OracleError> {
        if self.failing.contains(cons_addr) {
            return Err(OracleError::StateCorruption(format!(
                "simulated slash failure for {cons_addr}"
            )));
        }
        self.calls.push(RecordedSlash {
            cons_addr: cons_addr.to_string(),
            factor,
            infraction_height,
            power,
        });
        Ok(())
    }
}
