//! Snapshot retention and the gap-weighted time-weighted average price.

use crate::domain::{Decimal, OracleError, PriceSnapshot};
use crate::keys;

use super::codec::decode_json;
use super::OracleModule;

/// Deletes every snapshot for `asset` older than `current_height - 2 *
/// twap_lookback_window`. The boundary is inclusive: a snapshot at exactly
/// the cutoff height is kept.
pub(super) fn prune_snapshots(
    module: &mut OracleModule<'_>,
    asset: &str,
    current_height: u64,
    lookback_window: u64,
) -> Result<(), OracleError> {
    let cutoff = current_height.saturating_sub(2 * lookback_window);
    let stale: Vec<Vec<u8>> = module
        .store
        .prefix_iterate(&keys::prefix_snapshot_for_asset(asset))
        .into_iter()
        .filter_map(|(key, bytes)| {
            let snapshot: PriceSnapshot = decode_json(&bytes).ok()?;
            (snapshot.block_height < cutoff).then_some(key)
        })
        .collect();

    if stale.is_empty() {
        return Ok(());
    }
    let mut tx = module.tx();
    for key in stale {
        tx.delete(key);
    }
    tx.commit();
    Ok(())
}

/// Time-weighted average over `[current_height - lookback, current_height]`,
/// weighting each snapshot by the gap to the next one (or, for the last
/// snapshot, the gap to `current_height`).
pub(super) fn twap(
    module: &OracleModule<'_>,
    asset: &str,
    lookback: u64,
    current_height: u64,
) -> Result<Decimal, OracleError> {
    let window_start = current_height.saturating_sub(lookback);

    let mut snapshots: Vec<PriceSnapshot> = module
        .store
        .prefix_iterate(&keys::prefix_snapshot_for_asset(asset))
        .into_iter()
        .map(|(_, bytes)| decode_json(&bytes))
        .collect::<Result<_, _>>()?;
    snapshots.retain(|s| s.block_height >= window_start && s.block_height <= current_height);
    snapshots.sort_by_key(|s| s.block_height);

    if snapshots.is_empty() {
        return Err(OracleError::OracleDataUnavailable(asset.to_string()));
    }

    let mut weighted_sum = Decimal::zero();
    let mut total_weight: u64 = 0;
    for (i, snapshot) in snapshots.iter().enumerate() {
        let weight = if i + 1 < snapshots.len() {
            snapshots[i + 1].block_height.saturating_sub(snapshot.block_height)
        } else {
            current_height.saturating_sub(snapshot.block_height)
        };
        if weight == 0 {
            continue;
        }
        let contribution = snapshot.price.checked_mul(&Decimal::from_i64(weight as i64))?;
        weighted_sum = weighted_sum.checked_add(&contribution)?;
        total_weight += weight;
    }

    if total_weight == 0 {
        return Ok(snapshots.last().expect("checked non-empty above").price);
    }
    weighted_sum.checked_quo(&Decimal::from_i64(total_weight as i64))
}
