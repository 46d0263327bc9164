//! Forward-only v1 → v2 state repair, run once at the upgrade height
//! before any other component observes state. Every pass uses a two-pass
//! collect-then-mutate strategy so a read-modify-write never invalidates
//! the iterator it is driven by.

use serde::Deserialize;

use crate::domain::{event, Decimal, Event, OracleError, Params, Price, PriceSnapshot};
use crate::keys;
use crate::ports::inbound::Env;

use super::codec::{decode_json, encode_json};
use super::OracleModule;

pub(super) fn migrate_v1_to_v2(module: &mut OracleModule<'_>, env: &Env) -> Result<Event, OracleError> {
    migrate_params(module)?;
    let prices_repaired = migrate_prices(module, env)?;
    let (oracles_valid, miss_counters_seeded) = migrate_validator_oracles(module)?;
    let snapshots_pruned = migrate_snapshots(module, env)?;

    Ok(Event::new(event::EVT_MIGRATION_COMPLETE)
        .attr("prices_repaired", prices_repaired)
        .attr("oracles_valid", oracles_valid)
        .attr("miss_counters_seeded", miss_counters_seeded)
        .attr("snapshots_pruned", snapshots_pruned))
}

fn migrate_params(module: &mut OracleModule<'_>) -> Result<(), OracleError> {
    let key = keys::key_params();
    let repaired = match module.store.get(&key) {
        None => Params::default(),
        Some(bytes) => {
            let mut params: Params = decode_json(&bytes)?;
            let defaults = Params::default();
            if params.vote_threshold.is_nil() {
                params.vote_threshold = defaults.vote_threshold;
            }
            if params.slash_fraction.is_nil() {
                params.slash_fraction = defaults.slash_fraction;
            }
            if params.twap_lookback_window == 0 {
                params.twap_lookback_window = defaults.twap_lookback_window;
            }
            if params.min_valid_per_window == 0 {
                params.min_valid_per_window = defaults.min_valid_per_window;
            }
            params
        }
    };

    let mut tx = module.tx();
    tx.set(key, encode_json(&repaired)?);
    tx.commit();
    Ok(())
}

/// Permissive v1 wire shape: a negative `block_height`/`block_time` or a
/// missing `price` decodes fine here even though [`Price`]'s own fields
/// can't represent them, which is exactly the malformed state this pass
/// exists to repair.
#[derive(Deserialize)]
#[cfg_attr(test, derive(serde::Serialize))]
struct PriceV1 {
    asset: String,
    #[serde(default)]
    price: Option<Decimal>,
    #[serde(default)]
    block_height: i64,
    #[serde(default)]
    block_time: i64,
    #[serde(default)]
    num_validators: u32,
}

fn migrate_prices(module: &mut OracleModule<'_>, env: &Env) -> Result<u64, OracleError> {
    let entries = module.store.prefix_iterate(&keys::prefix_price());
    let mut to_delete = Vec::new();
    let mut to_write = Vec::new();
    let mut repaired = 0u64;

    for (key, bytes) in entries {
        let v1: PriceV1 = match decode_json(&bytes) {
            Ok(v) => v,
            Err(_) => {
                to_delete.push(key);
                continue;
            }
        };
        let price = match v1.price {
            Some(p) if p.is_positive() => p,
            _ => {
                to_delete.push(key);
                continue;
            }
        };

        let fixed = Price {
            asset: v1.asset,
            price,
            block_height: if v1.block_height < 0 { env.block_height } else { v1.block_height as u64 },
            block_time: if v1.block_time < 0 { env.block_time } else { v1.block_time },
            num_validators: if v1.num_validators == 0 { 1 } else { v1.num_validators },
        };
        let fixed_bytes = encode_json(&fixed)?;
        if fixed_bytes != bytes {
            repaired += 1;
            to_write.push((key, fixed_bytes));
        }
    }

    let mut tx = module.tx();
    for key in to_delete {
        tx.delete(key);
    }
    for (key, bytes) in to_write {
        tx.set(key, bytes);
    }
    tx.commit();
    Ok(repaired)
}

/// `ValidatorOracle.validator_addr` is accepted as bech32-like without a
/// full checksum decode: lowercase human-readable part, a single `1`
/// separator, and a data part drawn from the bech32 charset.
fn looks_like_bech32(addr: &str) -> bool {
    const CHARSET: &str = "qpzry9x8gf2tvdw0s3jn54khce6mua7l";
    match addr.rfind('1') {
        Some(pos) if pos > 0 && pos + 1 < addr.len() => {
            let (hrp, data) = addr.split_at(pos);
            let data = &data[1..];
            hrp.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
                && data.chars().all(|c| CHARSET.contains(c))
        }
        _ => false,
    }
}

fn migrate_validator_oracles(module: &mut OracleModule<'_>) -> Result<(u64, u64), OracleError> {
    let entries = module.store.prefix_iterate(&keys::prefix_validator_oracle());
    let mut valid_addrs = Vec::new();
    for (_, bytes) in &entries {
        if let Ok(oracle) = decode_json::<crate::domain::ValidatorOracle>(bytes) {
            if looks_like_bech32(&oracle.validator_addr) {
                valid_addrs.push(oracle);
            }
        }
    }

    let mut seeded = 0u64;
    let mut tx = module.tx();
    for oracle in &valid_addrs {
        let key = keys::key_miss_counter(&oracle.validator_addr);
        if !tx.has(&key) {
            tx.set(key, oracle.miss_counter.to_be_bytes().to_vec());
            seeded += 1;
        }
    }
    tx.commit();
    Ok((valid_addrs.len() as u64, seeded))
}

fn migrate_snapshots(module: &mut OracleModule<'_>, env: &Env) -> Result<u64, OracleError> {
    let params = module.load_params()?;
    let cutoff = env.block_height.saturating_sub(2 * params.twap_lookback_window);

    let entries = module.store.prefix_iterate(&keys::prefix_snapshot());
    let mut to_delete = Vec::new();
    for (key, bytes) in entries {
        let drop = match decode_json::<PriceSnapshot>(&bytes) {
            Err(_) => true,
            Ok(snapshot) => !snapshot.price.is_positive() || snapshot.block_height < cutoff,
        };
        if drop {
            to_delete.push(key);
        }
    }

    let pruned = to_delete.len() as u64;
    let mut tx = module.tx();
    for key in to_delete {
        tx.delete(key);
    }
    tx.commit();
    Ok(pruned)
}
