//! End-of-period aggregation: gather staged votes, filter diversity and
//! outliers, check consensus, commit the stake-weighted median.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::domain::{
    event, Decimal, Event, OracleError, Params, Price, PriceSnapshot, ValidatorOracle, ValidatorPrice,
};
use crate::keys;
use crate::ports::inbound::Env;

use super::codec::{decode_json, encode_json};
use super::OracleModule;

/// Aggregation is end-of-block work: an internal decode failure or
/// arithmetic overflow must never propagate out as a hard error that would
/// abort the block. Every fallible step below is caught here, logged at
/// `error!`, turned into a best-effort event, and skipped rather than
/// bubbled with `?`.
pub(super) fn run_end_block(module: &mut OracleModule<'_>, env: &Env) -> Result<Vec<Event>, OracleError> {
    let params = module.load_params()?;
    if env.block_height % params.vote_period != 0 {
        return Ok(Vec::new());
    }

    let by_asset = load_staged_votes_by_asset(module);
    if by_asset.is_empty() {
        return Ok(Vec::new());
    }

    let mut events = Vec::new();
    let mut submitted: HashSet<String> = HashSet::new();
    let mut passed: HashSet<String> = HashSet::new();

    for (asset, votes) in by_asset {
        for v in &votes {
            submitted.insert(v.validator_addr.clone());
        }
        match aggregate_one_asset(module, env, &params, &asset, votes) {
            Ok((asset_events, survivors)) => {
                events.extend(asset_events);
                for addr in survivors {
                    passed.insert(addr);
                }
            }
            Err(reason) => {
                tracing::error!(asset, %reason, "aggregation failed for asset, skipping its commit this period");
                events.push(
                    Event::new(event::EVT_ORACLE_VOTE)
                        .attr("asset", &asset)
                        .attr("status", "aggregation_error")
                        .attr("reason", reason.to_string()),
                );
            }
        }
    }

    if let Err(reason) = apply_miss_accounting(module, &submitted, &passed) {
        tracing::error!(%reason, "miss accounting failed this period");
    }
    Ok(events)
}

/// Decode failures here are logged and the offending entry skipped, the
/// same way `twap::prune_snapshots` skips an undecodable snapshot: this
/// runs at the end of a block and must never abort it.
fn load_staged_votes_by_asset(module: &OracleModule<'_>) -> BTreeMap<String, Vec<ValidatorPrice>> {
    let mut by_asset: BTreeMap<String, Vec<ValidatorPrice>> = BTreeMap::new();
    for (_, bytes) in module.store.prefix_iterate(&keys::prefix_staged_vote()) {
        match decode_json::<ValidatorPrice>(&bytes) {
            Ok(vote) => by_asset.entry(vote.asset.clone()).or_default().push(vote),
            Err(reason) => tracing::error!(%reason, "failed to decode a staged vote, skipping it"),
        }
    }
    by_asset
}

/// Returns the events produced for this asset, and the addresses of every
/// validator whose vote survived diversity and outlier filtering — this is
/// tracked independently of whether the period's commit actually happened,
/// per the rule that filter-survival alone earns `total_submissions` credit.
fn aggregate_one_asset(
    module: &mut OracleModule<'_>,
    env: &Env,
    params: &Params,
    asset: &str,
    votes: Vec<ValidatorPrice>,
) -> Result<(Vec<Event>, Vec<String>), OracleError> {
    let mut events = Vec::new();

    let (diversified, diversity_events) = diversity_filter(module, params, votes);
    events.extend(diversity_events);
    let survivors = outlier_filter(&diversified);
    let survivor_addrs: Vec<String> = survivors.iter().map(|v| v.validator_addr.clone()).collect();

    clear_staged_votes(module, asset)?;

    if survivors.is_empty() {
        tracing::warn!(asset, "aggregation: no survivors after outlier filtering");
        events.push(Event::new(event::EVT_ORACLE_VOTE).attr("asset", asset).attr("status", "median_failed"));
        return Ok((events, survivor_addrs));
    }

    let total_bonded = module.staking.total_bonded_power();
    let surviving_power: Decimal = survivors
        .iter()
        .try_fold(Decimal::zero(), |acc, v| acc.checked_add(&v.voting_power))?;

    if total_bonded.is_nil() {
        tracing::warn!(asset, "aggregation: no bonded voting power");
        events.push(Event::new(event::EVT_ORACLE_VOTE).attr("asset", asset).attr("status", "insufficient"));
        return Ok((events, survivor_addrs));
    }
    let ratio = surviving_power.checked_quo(&total_bonded)?;
    if ratio < params.min_voting_power_for_consensus || ratio < params.vote_threshold {
        tracing::warn!(asset, %ratio, "aggregation: insufficient participation");
        events.push(
            Event::new(event::EVT_ORACLE_VOTE)
                .attr("asset", asset)
                .attr("status", "insufficient")
                .attr("ratio", ratio.to_string()),
        );
        return Ok((events, survivor_addrs));
    }

    let median = weighted_median(&survivors)?;
    let price = Price {
        asset: asset.to_string(),
        price: median,
        block_height: env.block_height,
        block_time: env.block_time,
        num_validators: survivors.len() as u32,
    };
    price.check_invariant()?;
    let snapshot = PriceSnapshot::from(&price);

    let mut tx = module.tx();
    tx.set(keys::key_price(asset), encode_json(&price)?);
    tx.set(keys::key_snapshot(asset, env.block_height), encode_json(&snapshot)?);
    tx.commit();

    super::twap::prune_snapshots(module, asset, env.block_height, params.twap_lookback_window)?;

    events.push(
        Event::new(event::EVT_PRICE_AGGREGATED)
            .attr("asset", asset)
            .attr("price", median.to_string())
            .attr("block_height", env.block_height)
            .attr("num_validators", price.num_validators),
    );

    for hook in module.hooks {
        if let Err(reason) = hook.on_price_aggregated(asset, &median, env.block_height) {
            tracing::warn!(asset, %reason, "price-aggregated hook failed");
        }
    }

    Ok((events, survivor_addrs))
}

/// Drops votes past the per-IP / per-ASN diversity caps, keeping the
/// first-seen entries (stable by validator address order) up to each cap.
///
/// Every drop is a reject-with-a-tag security condition (spec §7), not a
/// silent skip: each one is logged and surfaced as an `oracle_vote` event
/// carrying the `OracleError` code and message that would have named it,
/// so a cap violation or policy rejection stays observable even though it
/// never halts aggregation.
fn diversity_filter(
    module: &OracleModule<'_>,
    params: &Params,
    mut votes: Vec<ValidatorPrice>,
) -> (Vec<ValidatorPrice>, Vec<Event>) {
    votes.sort_by(|a, b| a.validator_addr.cmp(&b.validator_addr));

    let mut ip_counts: HashMap<String, u64> = HashMap::new();
    let mut asn_counts: HashMap<String, u64> = HashMap::new();
    let mut kept = Vec::with_capacity(votes.len());
    let mut events = Vec::new();

    for vote in votes {
        let oracle: Option<ValidatorOracle> = match module.store.get(&keys::key_validator_oracle(&vote.validator_addr)) {
            Some(bytes) => match decode_json(&bytes) {
                Ok(oracle) => Some(oracle),
                Err(reason) => {
                    tracing::error!(validator = %vote.validator_addr, %reason, "failed to decode validator oracle record, treating as unregistered");
                    None
                }
            },
            None => None,
        };
        let ip = oracle.as_ref().and_then(|o| o.ip_address.clone());
        let asn = oracle.as_ref().and_then(|o| o.asn.clone());

        let ip_ok = ip
            .as_ref()
            .map(|ip| *ip_counts.get(ip).unwrap_or(&0) < params.max_validators_per_ip)
            .unwrap_or(true);
        let asn_ok = asn
            .as_ref()
            .map(|asn| *asn_counts.get(asn).unwrap_or(&0) < params.max_validators_per_asn)
            .unwrap_or(true);

        let fallback_oracle = ValidatorOracle::new(vote.validator_addr.clone());
        if !module.diversity.is_allowed(oracle.as_ref().unwrap_or(&fallback_oracle)) {
            let reason = OracleError::SybilAttackDetected(vote.asset.clone());
            reject_vote(&mut events, &vote, &reason);
            continue;
        }
        if !ip_ok {
            let reason = OracleError::TooManyValidatorsFromSameIp(vote.asset.clone());
            reject_vote(&mut events, &vote, &reason);
            continue;
        }
        if !asn_ok {
            let reason = OracleError::InsufficientGeographicDiversity(vote.asset.clone());
            reject_vote(&mut events, &vote, &reason);
            continue;
        }
        if let Some(ip) = ip {
            *ip_counts.entry(ip).or_insert(0) += 1;
        }
        if let Some(asn) = asn {
            *asn_counts.entry(asn).or_insert(0) += 1;
        }
        kept.push(vote);
    }
    (kept, events)
}

fn reject_vote(events: &mut Vec<Event>, vote: &ValidatorPrice, reason: &OracleError) {
    tracing::warn!(
        validator = %vote.validator_addr,
        asset = %vote.asset,
        code = reason.code(),
        %reason,
        "diversity filter rejected vote"
    );
    events.push(
        Event::new(event::EVT_ORACLE_VOTE)
            .attr("asset", &vote.asset)
            .attr("status", "diversity_rejected")
            .attr("validator", &vote.validator_addr)
            .attr("code", reason.code())
            .attr("reason", reason.to_string()),
    );
}

/// Sorts by price, computes the unweighted median and MAD, and drops any
/// vote whose deviation from the median exceeds `3 * MAD`.
fn outlier_filter(votes: &[ValidatorPrice]) -> Vec<ValidatorPrice> {
    if votes.is_empty() {
        return Vec::new();
    }
    let mut by_price = votes.to_vec();
    by_price.sort_by(|a, b| a.price.cmp(&b.price));
    let prices: Vec<Decimal> = by_price.iter().map(|v| v.price).collect();

    let median = match median_of(&prices) {
        Ok(m) => m,
        Err(_) => return Vec::new(),
    };
    let mut deviations: Vec<Decimal> = prices.iter().map(|p| p.checked_sub(&median).map(|d| d.abs()).unwrap_or(Decimal::zero())).collect();
    deviations.sort();
    let mad = median_of(&deviations).unwrap_or(Decimal::zero());
    let threshold = mad.checked_mul(&Decimal::from_i64(3)).unwrap_or(Decimal::zero());

    by_price
        .into_iter()
        .filter(|v| {
            let deviation = v.price.checked_sub(&median).map(|d| d.abs()).unwrap_or(Decimal::zero());
            mad.is_nil() || deviation <= threshold
        })
        .collect()
}

/// Median of an already price-sorted (or otherwise consistently ordered)
/// slice of decimals: for an even length, the average of the two middle
/// values rounded half away from zero.
fn median_of(sorted: &[Decimal]) -> Result<Decimal, OracleError> {
    let n = sorted.len();
    if n == 0 {
        return Err(OracleError::MedianCalculationFailed("empty set".to_string()));
    }
    if n % 2 == 1 {
        Ok(sorted[n / 2])
    } else {
        let a = sorted[n / 2 - 1];
        let b = sorted[n / 2];
        a.checked_add(&b)?.checked_quo(&Decimal::from_i64(2))
    }
}

/// Stake-weighted median: sort ascending, scan cumulative voting power, and
/// return the first price at which cumulative power reaches half of the
/// surviving total. Ties resolve to the lower price, which falls out of
/// scanning in ascending order and stopping at the first crossing.
fn weighted_median(survivors: &[ValidatorPrice]) -> Result<Decimal, OracleError> {
    let mut sorted = survivors.to_vec();
    sorted.sort_by(|a, b| a.price.cmp(&b.price));

    let total = sorted
        .iter()
        .try_fold(Decimal::zero(), |acc, v| acc.checked_add(&v.voting_power))?;
    let half = total.checked_quo(&Decimal::from_i64(2))?;

    let mut cumulative = Decimal::zero();
    for v in &sorted {
        cumulative = cumulative.checked_add(&v.voting_power)?;
        if cumulative >= half {
            return Ok(v.price);
        }
    }
    sorted
        .last()
        .map(|v| v.price)
        .ok_or_else(|| OracleError::MedianCalculationFailed("no survivors".to_string()))
}

fn clear_staged_votes(module: &mut OracleModule<'_>, asset: &str) -> Result<(), OracleError> {
    let keys_to_clear: Vec<Vec<u8>> = module
        .store
        .prefix_iterate(&keys::prefix_staged_vote_for_asset(asset))
        .into_iter()
        .map(|(k, _)| k)
        .collect();
    let mut tx = module.tx();
    for key in keys_to_clear {
        tx.delete(key);
    }
    tx.commit();
    Ok(())
}

/// Every bonded validator that failed to submit this period increments
/// only its `miss_counter`; every submitter that survived diversity and
/// outlier filtering increments only `total_submissions` (and
/// `accurate_submissions`). A non-submitter never touches
/// `total_submissions` — it only ever counts filter-surviving submissions.
fn apply_miss_accounting(
    module: &mut OracleModule<'_>,
    submitted: &HashSet<String>,
    passed: &HashSet<String>,
) -> Result<(), OracleError> {
    let bonded = module.staking.iterate_bonded_by_power();
    let mut tx = module.tx();
    for validator in &bonded {
        let key = keys::key_validator_oracle(&validator.validator_addr);
        let mut oracle: ValidatorOracle = match tx.get(&key) {
            Some(bytes) => match decode_json(&bytes) {
                Ok(oracle) => oracle,
                Err(reason) => {
                    tracing::error!(validator = %validator.validator_addr, %reason, "failed to decode validator oracle record, skipping its miss accounting this period");
                    continue;
                }
            },
            None => ValidatorOracle::new(validator.validator_addr.clone()),
        };
        if passed.contains(&validator.validator_addr) {
            oracle.accurate_submissions += 1;
            oracle.total_submissions += 1;
        } else if !submitted.contains(&validator.validator_addr) {
            oracle.miss_counter += 1;
        }
        match encode_json(&oracle) {
            Ok(bytes) => tx.set(key, bytes),
            Err(reason) => tracing::error!(validator = %validator.validator_addr, %reason, "failed to encode validator oracle record, dropping its miss accounting this period"),
        }
    }
    tx.commit();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{InMemorySlashingView, InMemoryStakingView};
    use crate::ports::{InMemoryKvStore, OracleApi, PermissiveDiversityPolicy};

    fn env(height: u64) -> Env {
        Env { block_height: height, block_time: height as i64 }
    }

    fn three_equal_validators() -> InMemoryStakingView {
        let mut s = InMemoryStakingView::new();
        s.bond("val1", Decimal::from_i64(100));
        s.bond("val2", Decimal::from_i64(100));
        s.bond("val3", Decimal::from_i64(100));
        s
    }

    #[test]
    fn happy_aggregation_commits_the_weighted_median() {
        let mut store = InMemoryKvStore::new();
        let staking = three_equal_validators();
        let mut slashing = InMemorySlashingView::new();
        let diversity = PermissiveDiversityPolicy;
        let hooks: Vec<Box<dyn crate::ports::OracleHook>> = Vec::new();
        let mut module = OracleModule::new(&mut store, &staking, &mut slashing, &diversity, &hooks, "gov");

        let mut params = Params::default();
        params.vote_period = 30;
        params.vote_threshold = Decimal::parse("0.1").unwrap();
        params.min_voting_power_for_consensus = Decimal::parse("0.1").unwrap();
        module.update_params("gov", params).unwrap();

        for (validator, price) in [("val1", 49_900), ("val2", 50_000), ("val3", 50_100)] {
            module.submit_price(&env(1), validator, validator, "BTC", Decimal::from_i64(price)).unwrap();
        }

        let events = module.end_block_aggregate(&env(30)).unwrap();
        assert!(events.iter().any(|e| e.name == event::EVT_PRICE_AGGREGATED));

        let price: Price = decode_json(&module.store.get(&keys::key_price("BTC")).unwrap()).unwrap();
        assert_eq!(price.price, Decimal::from_i64(50_000));
        assert_eq!(price.num_validators, 3);
        assert!(module.store.has(&keys::key_snapshot("BTC", 30)));
    }

    #[test]
    fn outlier_is_dropped_before_the_median_is_taken() {
        let mut store = InMemoryKvStore::new();
        let mut staking = InMemoryStakingView::new();
        staking.bond("val1", Decimal::from_i64(100));
        staking.bond("val2", Decimal::from_i64(100));
        staking.bond("val3", Decimal::from_i64(100));
        staking.bond("val4", Decimal::from_i64(100));
        let mut slashing = InMemorySlashingView::new();
        let diversity = PermissiveDiversityPolicy;
        let hooks: Vec<Box<dyn crate::ports::OracleHook>> = Vec::new();
        let mut module = OracleModule::new(&mut store, &staking, &mut slashing, &diversity, &hooks, "gov");

        let mut params = Params::default();
        params.vote_period = 30;
        params.vote_threshold = Decimal::parse("0.1").unwrap();
        params.min_voting_power_for_consensus = Decimal::parse("0.1").unwrap();
        module.update_params("gov", params).unwrap();

        for (validator, price) in [("val1", 50_000), ("val2", 50_100), ("val3", 49_900), ("val4", 1_000_000)] {
            module.submit_price(&env(1), validator, validator, "BTC", Decimal::from_i64(price)).unwrap();
        }

        module.end_block_aggregate(&env(30)).unwrap();
        let price: Price = decode_json(&module.store.get(&keys::key_price("BTC")).unwrap()).unwrap();
        assert_eq!(price.price, Decimal::from_i64(50_000));
        assert_eq!(price.num_validators, 3);
    }

    #[test]
    fn insufficient_participation_skips_the_commit() {
        let mut store = InMemoryKvStore::new();
        let mut staking = InMemoryStakingView::new();
        staking.bond("val1", Decimal::from_i64(100));
        staking.bond("val2", Decimal::from_i64(100));
        staking.bond("val3", Decimal::from_i64(100));
        staking.bond("val4", Decimal::from_i64(100));
        let mut slashing = InMemorySlashingView::new();
        let diversity = PermissiveDiversityPolicy;
        let hooks: Vec<Box<dyn crate::ports::OracleHook>> = Vec::new();
        let mut module = OracleModule::new(&mut store, &staking, &mut slashing, &diversity, &hooks, "gov");

        let mut params = Params::default();
        params.vote_period = 30;
        params.vote_threshold = Decimal::parse("0.67").unwrap();
        module.update_params("gov", params).unwrap();

        module.submit_price(&env(1), "val1", "val1", "BTC", Decimal::from_i64(50_000)).unwrap();

        let events = module.end_block_aggregate(&env(30)).unwrap();
        assert!(events.iter().any(|e| e.attributes.iter().any(|(k, v)| k == "status" && v == "insufficient")));
        assert!(!module.store.has(&keys::key_price("BTC")));
    }

    #[test]
    fn non_submitters_bump_only_the_miss_counter_not_total_submissions() {
        let mut store = InMemoryKvStore::new();
        let staking = three_equal_validators();
        let mut slashing = InMemorySlashingView::new();
        let diversity = PermissiveDiversityPolicy;
        let hooks: Vec<Box<dyn crate::ports::OracleHook>> = Vec::new();
        let mut module = OracleModule::new(&mut store, &staking, &mut slashing, &diversity, &hooks, "gov");

        let mut params = Params::default();
        params.vote_period = 30;
        params.vote_threshold = Decimal::parse("0.1").unwrap();
        params.min_voting_power_for_consensus = Decimal::parse("0.1").unwrap();
        module.update_params("gov", params).unwrap();

        module.submit_price(&env(1), "val1", "val1", "BTC", Decimal::from_i64(50_000)).unwrap();
        module.end_block_aggregate(&env(30)).unwrap();

        let val2: ValidatorOracle = decode_json(&module.store.get(&keys::key_validator_oracle("val2")).unwrap()).unwrap();
        assert_eq!(val2.miss_counter, 1);
        assert_eq!(val2.total_submissions, 0);

        let val1: ValidatorOracle = decode_json(&module.store.get(&keys::key_validator_oracle("val1")).unwrap()).unwrap();
        assert_eq!(val1.miss_counter, 0);
        assert_eq!(val1.total_submissions, 1);
    }

    #[test]
    fn votes_past_the_per_ip_cap_are_rejected_with_a_tagged_event() {
        let mut store = InMemoryKvStore::new();
        let staking = three_equal_validators();
        let mut slashing = InMemorySlashingView::new();
        let diversity = PermissiveDiversityPolicy;
        let hooks: Vec<Box<dyn crate::ports::OracleHook>> = Vec::new();
        let mut module = OracleModule::new(&mut store, &staking, &mut slashing, &diversity, &hooks, "gov");

        let mut params = Params::default();
        params.vote_period = 30;
        params.vote_threshold = Decimal::parse("0.1").unwrap();
        params.min_voting_power_for_consensus = Decimal::parse("0.1").unwrap();
        params.max_validators_per_ip = 1;
        module.update_params("gov", params).unwrap();

        for validator in ["val1", "val2"] {
            let mut oracle = ValidatorOracle::new(validator);
            oracle.ip_address = Some("203.0.113.9".to_string());
            let mut tx = module.tx();
            tx.set(keys::key_validator_oracle(validator), encode_json(&oracle).unwrap());
            tx.commit();
        }

        for (validator, price) in [("val1", 50_000), ("val2", 50_100), ("val3", 49_900)] {
            module.submit_price(&env(1), validator, validator, "BTC", Decimal::from_i64(price)).unwrap();
        }

        let events = module.end_block_aggregate(&env(30)).unwrap();
        let rejected: Vec<_> = events
            .iter()
            .filter(|e| e.attributes.iter().any(|(k, v)| k == "status" && v == "diversity_rejected"))
            .collect();
        assert_eq!(rejected.len(), 1);
        assert!(rejected[0]
            .attributes
            .iter()
            .any(|(k, v)| k == "code" && v == &OracleError::TooManyValidatorsFromSameIp("BTC".to_string()).code().to_string()));
    }
}
