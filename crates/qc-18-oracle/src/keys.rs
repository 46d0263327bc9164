//! Persisted key layout under the module's namespace byte `0x03`.
//!
//! Wire-stable across upgrades: the migration engine in
//! [`crate::service::migration`] depends on these exact prefixes.

pub const NAMESPACE: u8 = 0x03;

const PARAMS: u8 = 0x01;
const PRICE: u8 = 0x02;
const VALIDATOR_ORACLE: u8 = 0x03;
const FEEDER_DELEGATION: u8 = 0x04;
const MISS_COUNTER: u8 = 0x05;
const SLASHING_INFO: u8 = 0x0A;
const SNAPSHOT: u8 = 0x0B;
const STAGED_VOTE: u8 = 0x0C;
const NONCE_INCOMING: u8 = 0x0D;
const PAUSE_STATE: u8 = 0x0E;
const NONCE_OUTBOUND: u8 = 0x0F;
const CIRCUIT_BREAKER_STATE: u8 = 0x11;

fn prefix(tag: u8) -> Vec<u8> {
    vec![NAMESPACE, tag]
}

pub fn key_params() -> Vec<u8> {
    prefix(PARAMS)
}

pub fn key_price(asset: &str) -> Vec<u8> {
    let mut k = prefix(PRICE);
    k.extend_from_slice(asset.as_bytes());
    k
}

pub fn prefix_price() -> Vec<u8> {
    prefix(PRICE)
}

pub fn key_validator_oracle(validator_addr: &str) -> Vec<u8> {
    let mut k = prefix(VALIDATOR_ORACLE);
    k.extend_from_slice(validator_addr.as_bytes());
    k
}

pub fn prefix_validator_oracle() -> Vec<u8> {
    prefix(VALIDATOR_ORACLE)
}

pub fn key_feeder_delegation(validator_addr: &str) -> Vec<u8> {
    let mut k = prefix(FEEDER_DELEGATION);
    k.extend_from_slice(validator_addr.as_bytes());
    k
}

pub fn key_miss_counter(validator_addr: &str) -> Vec<u8> {
    let mut k = prefix(MISS_COUNTER);
    k.extend_from_slice(validator_addr.as_bytes());
    k
}

pub fn key_slashing_info(validator_addr: &str) -> Vec<u8> {
    let mut k = prefix(SLASHING_INFO);
    k.extend_from_slice(validator_addr.as_bytes());
    k
}

/// `0x03 0x0B || asset_bytes || be_u64(height)`
pub fn key_snapshot(asset: &str, block_height: u64) -> Vec<u8> {
    let mut k = prefix(SNAPSHOT);
    k.extend_from_slice(asset.as_bytes());
    k.extend_from_slice(&block_height.to_be_bytes());
    k
}

pub fn prefix_snapshot() -> Vec<u8> {
    prefix(SNAPSHOT)
}

/// Snapshot keys for one asset: `0x03 0x0B || asset_bytes || ...`, so a
/// single asset's history can be range-scanned without touching another
/// asset whose symbol happens to share a byte prefix.
pub fn prefix_snapshot_for_asset(asset: &str) -> Vec<u8> {
    let mut k = prefix(SNAPSHOT);
    k.extend_from_slice(asset.as_bytes());
    k.push(0x00); // delimiter before the be_u64 height so no asset is a prefix of another
    k
}

/// Staged votes are keyed asset-first so one period's votes for a single
/// asset can be gathered with a single prefix scan.
pub fn key_staged_vote(asset: &str, validator_addr: &str) -> Vec<u8> {
    let mut k = prefix(STAGED_VOTE);
    k.extend_from_slice(asset.as_bytes());
    k.push(b'/');
    k.extend_from_slice(validator_addr.as_bytes());
    k
}

pub fn prefix_staged_vote_for_asset(asset: &str) -> Vec<u8> {
    let mut k = prefix(STAGED_VOTE);
    k.extend_from_slice(asset.as_bytes());
    k.push(b'/');
    k
}

pub fn prefix_staged_vote() -> Vec<u8> {
    prefix(STAGED_VOTE)
}

/// `0x03 0x0D || channel || '/' || sender`
pub fn key_nonce_incoming(channel: &str, sender: &str) -> Vec<u8> {
    let mut k = prefix(NONCE_INCOMING);
    k.extend_from_slice(channel.as_bytes());
    k.push(b'/');
    k.extend_from_slice(sender.as_bytes());
    k
}

pub fn key_nonce_outbound(channel: &str, sender: &str) -> Vec<u8> {
    let mut k = prefix(NONCE_OUTBOUND);
    k.extend_from_slice(channel.as_bytes());
    k.push(b'/');
    k.extend_from_slice(sender.as_bytes());
    k
}

pub fn prefix_nonce_incoming() -> Vec<u8> {
    prefix(NONCE_INCOMING)
}

pub fn prefix_nonce_outbound() -> Vec<u8> {
    prefix(NONCE_OUTBOUND)
}

pub fn key_pause_state() -> Vec<u8> {
    prefix(PAUSE_STATE)
}

pub fn key_circuit_breaker_state() -> Vec<u8> {
    prefix(CIRCUIT_BREAKER_STATE)
}
