//! Replay-safe packet nonce tracking: one monotonic sequence per
//! (channel, sender, direction), with epoch rotation before 64-bit
//! overflow and age-based pruning.

use std::collections::HashSet;

use crate::domain::nonce::{
    NonceState, MAX_FUTURE_DRIFT_SECONDS, MAX_TIMESTAMP_AGE_SECONDS, NONCE_ROTATION_THRESHOLD,
};
use crate::domain::OracleError;
use crate::keys;
use crate::ports::{KvStore, StoreTx};

use super::codec::{decode_json, encode_json};

/// Stateless entry point for nonce validation, generation, and pruning.
/// Holds no state of its own; every operation reads and writes through the
/// store handed to it, the same way the rest of this crate's engines do.
pub struct NonceManager;

impl NonceManager {
    pub fn validate_incoming(
        store: &mut dyn KvStore,
        channel: &str,
        sender: &str,
        packet_nonce: u64,
        packet_unix_seconds: i64,
        now_unix_seconds: i64,
    ) -> Result<(), OracleError> {
        if packet_nonce == 0 {
            return Err(OracleError::InvalidNonce("nonce must be non-zero".to_string()));
        }
        if channel.is_empty() {
            return Err(OracleError::InvalidNonce("channel must not be empty".to_string()));
        }
        if packet_unix_seconds <= 0 {
            return Err(OracleError::InvalidNonce("timestamp must be positive".to_string()));
        }
        let drift = now_unix_seconds - packet_unix_seconds;
        if drift > MAX_TIMESTAMP_AGE_SECONDS {
            return Err(OracleError::InvalidNonce("packet timestamp is too far in the past".to_string()));
        }
        if -drift > MAX_FUTURE_DRIFT_SECONDS {
            return Err(OracleError::InvalidNonce("packet timestamp is too far in the future".to_string()));
        }

        let key = keys::key_nonce_incoming(channel, sender);
        let mut tx = StoreTx::begin(store);
        let stored: NonceState = match tx.get(&key) {
            Some(bytes) => decode_json(&bytes)?,
            None => NonceState::default(),
        };
        if packet_nonce <= stored.nonce {
            return Err(OracleError::ReplayAttack {
                channel: channel.to_string(),
                sender: sender.to_string(),
                nonce: packet_nonce,
            });
        }

        let next = NonceState {
            epoch: stored.epoch,
            nonce: packet_nonce,
            last_update_unix_seconds: now_unix_seconds,
        };
        tx.set(key, encode_json(&next)?);
        tx.commit();
        Ok(())
    }

    pub fn next_outbound(
        store: &mut dyn KvStore,
        channel: &str,
        sender: &str,
        now_unix_seconds: i64,
    ) -> Result<u64, OracleError> {
        let channel = if channel.is_empty() { "unknown" } else { channel };
        let sender = if sender.is_empty() { "oracle" } else { sender };

        let key = keys::key_nonce_outbound(channel, sender);
        let mut tx = StoreTx::begin(store);
        let stored: NonceState = match tx.get(&key) {
            Some(bytes) => decode_json(&bytes)?,
            None => NonceState::default(),
        };

        let (epoch, nonce) = if stored.nonce >= NONCE_ROTATION_THRESHOLD {
            (stored.epoch + 1, 1)
        } else {
            (stored.epoch, stored.nonce + 1)
        };

        let next = NonceState { epoch, nonce, last_update_unix_seconds: now_unix_seconds };
        tx.set(key, encode_json(&next)?);
        tx.commit();
        Ok(nonce)
    }

    /// Deletes entries whose `last_update + ttl_seconds < now`, in store
    /// key order, stopping once `max_entries` (channel, sender) pairs have
    /// been processed. When either direction of a pair is stale, both of
    /// that pair's keys are removed together as one unit.
    pub fn prune(
        store: &mut dyn KvStore,
        ttl_seconds: u64,
        max_entries: usize,
        now_unix_seconds: i64,
    ) -> Result<usize, OracleError> {
        let incoming = store.prefix_iterate(&keys::prefix_nonce_incoming());
        let outbound = store.prefix_iterate(&keys::prefix_nonce_outbound());

        let mut pairs: Vec<(String, String)> = Vec::new();
        let mut seen: HashSet<(String, String)> = HashSet::new();
        for (key, _) in incoming.iter().chain(outbound.iter()) {
            if let Some(pair) = parse_channel_sender(key) {
                if seen.insert(pair.clone()) {
                    pairs.push(pair);
                }
            }
        }

        let mut tx = StoreTx::begin(store);
        let mut deleted = 0usize;
        let mut processed = 0usize;

        for (channel, sender) in pairs {
            if processed >= max_entries {
                break;
            }
            let incoming_key = keys::key_nonce_incoming(&channel, &sender);
            let outbound_key = keys::key_nonce_outbound(&channel, &sender);

            let incoming_stale = is_stale(&tx, &incoming_key, ttl_seconds, now_unix_seconds)?;
            let outbound_stale = is_stale(&tx, &outbound_key, ttl_seconds, now_unix_seconds)?;

            if incoming_stale || outbound_stale {
                if tx.has(&incoming_key) {
                    tx.delete(incoming_key.clone());
                    deleted += 1;
                }
                if tx.has(&outbound_key) {
                    tx.delete(outbound_key.clone());
                    deleted += 1;
                }
                processed += 1;
            }
        }
        tx.commit();
        Ok(deleted)
    }
}

fn is_stale(tx: &StoreTx<'_>, key: &[u8], ttl_seconds: u64, now_unix_seconds: i64) -> Result<bool, OracleError> {
    match tx.get(key) {
        Some(bytes) => {
            let state: NonceState = decode_json(&bytes)?;
            Ok(state.last_update_unix_seconds + ttl_seconds as i64 < now_unix_seconds)
        }
        None => Ok(false),
    }
}

/// Extracts `(channel, sender)` from a `0x03 0x0D/0x0F || channel || '/' ||
/// sender` key. Channels and senders are assumed not to contain `'/'`.
fn parse_channel_sender(key: &[u8]) -> Option<(String, String)> {
    let rest = key.get(2..)?;
    let slash = rest.iter().position(|b| *b == b'/')?;
    let channel = std::str::from_utf8(&rest[..slash]).ok()?.to_string();
    let sender = std::str::from_utf8(&rest[slash + 1..]).ok()?.to_string();
    Some((channel, sender))
}
