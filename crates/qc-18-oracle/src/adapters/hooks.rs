//! In-memory hook chain, mirroring `InMemoryEventBus` from the sibling
//! consensus subsystem: a `Vec` of subscribers invoked in registration
//! order, recording what they saw for assertions in tests.

use crate::domain::Decimal;
use crate::ports::outbound::OracleHook;

/// Collects every notification delivered to it, without ever failing.
#[derive(Default)]
pub struct RecordingHook {
    submissions: std::sync::Mutex<Vec<(String, String, Decimal)>>,
    aggregations: std::sync::Mutex<Vec<(String, Decimal, u64)>>,
    circuit_breaker_reasons: std::sync::Mutex<Vec<String>>,
}

impl RecordingHook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submissions(&self) -> Vec<(String, String, Decimal)> {
        self.submissions.lock().expect("lock poisoned").clone()
    }

    pub fn aggregations(&self) -> Vec<(String, Decimal, u64)> {
        self.aggregations.lock().expect("lock poisoned").clone()
    }

    pub fn circuit_breaker_reasons(&self) -> Vec<String> {
        self.circuit_breaker_reasons
            .lock()
            .expect("lock poisoned")
            .clone()
    }
}

impl OracleHook for RecordingHook {
    fn on_price_submitted(&self, validator_addr: &str, asset: &str, price: &Decimal) -> Result<(), String> {
        self.submissions
            .lock()
            .expect("lock poisoned")
            .push((validator_addr.to_string(), asset.to_string(), *price));
        Ok(())
    }

    fn on_price_aggregated(&self, asset: &str, price: &Decimal, block_height: u64) -> Result<(), String> {
        self.aggregations
            .lock()
            .expect("lock poisoned")
            .push((asset.to_string(), *price, block_height));
        Ok(())
    }

    fn on_circuit_breaker(&self, reason: &str) -> Result<(), String> {
        self.circuit_breaker_reasons
            .lock()
            .expect("lock poisoned")
            .push(reason.to_string());
        Ok(())
    }
}

/// A hook that always fails, for exercising "handler error is surfaced but
/// does not roll back the aggregation".
pub struct FailingHook;

impl OracleHook for FailingHook {
    fn on_price_submitted(&self, _validator_addr: &str, _asset: &str, _price: &Decimal) -> Result<(), String> {
        Err("hook deliberately failed".to_string())
    }
}
