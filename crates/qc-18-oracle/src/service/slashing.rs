//! End-of-window liveness evaluation: slash and jail validators whose miss
//! counter crossed the window's tolerance, reset everyone else.

use crate::domain::{event, Decimal, Event, OracleError, Params, SlashingInfo, ValidatorOracle};
use crate::keys;
use crate::ports::inbound::Env;
use crate::ports::outbound::SlashingView;

use super::codec::{decode_json, encode_json};
use super::OracleModule;

/// Slashing is end-of-block work: a decode failure on one validator's
/// record, or a failed external slash call, is isolated to that validator
/// and never propagates out as a hard error that would abort the block.
pub(super) fn run_end_block(module: &mut OracleModule<'_>, env: &Env) -> Result<Vec<Event>, OracleError> {
    let params = module.load_params()?;
    if env.block_height % params.slash_window != 0 {
        return Ok(Vec::new());
    }

    let miss_threshold = params.slash_window.saturating_sub(params.min_valid_per_window);

    let oracles: Vec<ValidatorOracle> = module
        .store
        .prefix_iterate(&keys::prefix_validator_oracle())
        .into_iter()
        .filter_map(|(_, bytes)| match decode_json(&bytes) {
            Ok(oracle) => Some(oracle),
            Err(reason) => {
                tracing::error!(%reason, "failed to decode a validator oracle record, skipping it this window");
                None
            }
        })
        .collect();

    let mut events = Vec::new();
    for mut oracle in oracles {
        if oracle.miss_counter >= miss_threshold {
            match slash_and_jail(module, env, &params, &mut oracle) {
                Ok(slash_events) => events.extend(slash_events),
                Err(reason) => {
                    tracing::error!(validator_addr = %oracle.validator_addr, %reason, "slash/jail evaluation failed, leaving the validator's record unchanged this window");
                    continue;
                }
            }
        } else {
            oracle.miss_counter = 0;
        }
        match encode_json(&oracle) {
            Ok(bytes) => {
                let mut tx = module.tx();
                tx.set(keys::key_validator_oracle(&oracle.validator_addr), bytes);
                tx.commit();
            }
            Err(reason) => tracing::error!(validator_addr = %oracle.validator_addr, %reason, "failed to encode validator oracle record after slashing evaluation"),
        }
    }

    Ok(events)
}

fn slash_and_jail(
    module: &mut OracleModule<'_>,
    env: &Env,
    params: &Params,
    oracle: &mut ValidatorOracle,
) -> Result<Vec<Event>, OracleError> {
    let mut events = Vec::new();
    let validator_addr = oracle.validator_addr.clone();

    let existing_info: Option<SlashingInfo> = match module.store.get(&keys::key_slashing_info(&validator_addr)) {
        Some(bytes) => Some(decode_json(&bytes)?),
        None => None,
    };
    if let Some(info) = &existing_info {
        if info.last_slashed_height == env.block_height {
            // already processed this exact height; idempotence guard
            return Ok(events);
        }
    }

    let validator = match module.staking.get_validator(&validator_addr) {
        Some(v) if v.bonded => v,
        _ => {
            tracing::warn!(validator_addr, "slashing: validator not bonded, skipping slash");
            oracle.miss_counter = 0;
            events.push(
                Event::new(event::EVT_ORACLE_SLASH)
                    .attr("validator", &validator_addr)
                    .attr("status", "skipped_not_bonded"),
            );
            return Ok(events);
        }
    };

    match module.slashing.slash(&validator.consensus_addr, params.slash_fraction, env.block_height, validator.voting_power) {
        Ok(()) => {
            let slashed_amount = validator.voting_power.checked_mul(&params.slash_fraction).unwrap_or(Decimal::zero());
            let jailed_until = env.block_height.saturating_add(params.slash_window);
            let info = SlashingInfo {
                validator_addr: validator_addr.clone(),
                miss_count: oracle.miss_counter,
                slashed_amount,
                slashed_height: env.block_height,
                jailed_until,
                last_slashed_height: env.block_height,
            };
            let mut tx = module.tx();
            tx.set(keys::key_slashing_info(&validator_addr), encode_json(&info)?);
            tx.commit();

            oracle.miss_counter = 0;
            oracle.is_active = false;

            events.push(
                Event::new(event::EVT_ORACLE_SLASH)
                    .attr("validator", &validator_addr)
                    .attr("amount", slashed_amount.to_string())
                    .attr("height", env.block_height),
            );
            events.push(
                Event::new(event::EVT_ORACLE_JAIL)
                    .attr("validator", &validator_addr)
                    .attr("jailed_until", jailed_until),
            );
        }
        Err(err) => {
            tracing::error!(validator_addr, %err, "slashing call failed; continuing with next validator");
            oracle.miss_counter = 0;
            events.push(
                Event::new(event::EVT_ORACLE_SLASH)
                    .attr("validator", &validator_addr)
                    .attr("status", "failed")
                    .attr("error", err.to_string()),
            );
        }
    }

    Ok(events)
}
