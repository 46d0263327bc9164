//! Per-(channel, sender, direction) replay-safe sequence state.

use serde::{Deserialize, Serialize};

/// Last accepted nonce for one (channel, sender) in one direction
/// (incoming or outbound-generated), plus its rotation epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct NonceState {
    pub epoch: u64,
    pub nonce: u64,
    pub last_update_unix_seconds: i64,
}

/// Nonce value last accepted in a rotation epoch before the generator
/// must roll over to avoid 64-bit overflow: `0.9 * 2^64`, computed with
/// integer division so the module never touches floating point.
pub const NONCE_ROTATION_THRESHOLD: u64 = u64::MAX / 10 * 9;

/// Largest representable nonce value.
pub const MAX_NONCE: u64 = u64::MAX;

/// Past-dated packets older than this many seconds are rejected.
pub const MAX_TIMESTAMP_AGE_SECONDS: i64 = 86_400;

/// Future-dated packets beyond this many seconds are rejected.
pub const MAX_FUTURE_DRIFT_SECONDS: i64 = 300;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotation_threshold_is_below_max() {
        assert!(NONCE_ROTATION_THRESHOLD < MAX_NONCE);
        // 0.9 * 2^64, truncated to integer division — within 0.1% of MAX_NONCE / 10 * 9.
        let diff = MAX_NONCE - NONCE_ROTATION_THRESHOLD;
        assert!(diff < MAX_NONCE / 1000);
    }
}
