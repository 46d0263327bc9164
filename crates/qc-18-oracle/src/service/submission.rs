//! Price submission, feeder delegation, and the emergency pause switch.

use crate::domain::{
    event, validate_asset, Decimal, Event, FeederDelegation, OracleError, Params, ValidatorOracle,
    ValidatorPrice,
};
use crate::keys;
use crate::ports::inbound::Env;

use super::codec::{decode_json, encode_json};
use super::OracleModule;

pub(super) fn submit_price(
    module: &mut OracleModule<'_>,
    env: &Env,
    validator_addr: &str,
    feeder_addr: &str,
    asset: &str,
    price: Decimal,
) -> Result<Event, OracleError> {
    validate_asset(asset)?;
    if !price.is_positive() {
        return Err(OracleError::InvalidPrice(price.to_string()));
    }

    if module.load_pause_state()?.paused {
        return Err(OracleError::OraclePaused);
    }
    if module.load_circuit_breaker_state()?.open {
        return Err(OracleError::CircuitBreakerActive);
    }

    let validator = module
        .staking
        .get_validator(validator_addr)
        .ok_or_else(|| OracleError::ValidatorNotBonded(validator_addr.to_string()))?;
    if !validator.bonded {
        return Err(OracleError::ValidatorNotBonded(validator_addr.to_string()));
    }

    let expected_feeder = module
        .load_feeder_delegation(validator_addr)?
        .map(|d| d.feeder_addr)
        .unwrap_or_else(|| validator_addr.to_string());
    if feeder_addr != expected_feeder {
        return Err(OracleError::FeederNotAuthorized {
            feeder: feeder_addr.to_string(),
            validator: validator_addr.to_string(),
        });
    }

    let staged_key = keys::key_staged_vote(asset, validator_addr);
    let vo_key = keys::key_validator_oracle(validator_addr);

    let mut tx = module.tx();
    if tx.has(&staged_key) {
        return Err(OracleError::DuplicateSubmission {
            validator: validator_addr.to_string(),
            asset: asset.to_string(),
        });
    }

    let vote = ValidatorPrice {
        validator_addr: validator_addr.to_string(),
        asset: asset.to_string(),
        price,
        block_height: env.block_height,
        voting_power: validator.voting_power,
    };
    tx.set(staged_key, encode_json(&vote)?);

    if tx.get(&vo_key).is_none() {
        tx.set(vo_key, encode_json(&ValidatorOracle::new(validator_addr))?);
    }
    tx.commit();

    for hook in module.hooks {
        if let Err(reason) = hook.on_price_submitted(validator_addr, asset, &price) {
            tracing::warn!(validator_addr, asset, %reason, "price-submitted hook failed");
        }
    }

    Ok(Event::new(event::EVT_PRICE_SUBMITTED)
        .attr("validator", validator_addr)
        .attr("asset", asset)
        .attr("price", price.to_string()))
}

pub(super) fn delegate_feeder(
    module: &mut OracleModule<'_>,
    _env: &Env,
    validator_addr: &str,
    delegate_addr: &str,
) -> Result<(), OracleError> {
    if module.staking.get_validator(validator_addr).is_none() {
        return Err(OracleError::ValidatorNotFound(validator_addr.to_string()));
    }

    let key = keys::key_feeder_delegation(validator_addr);
    let mut tx = module.tx();
    if delegate_addr == validator_addr {
        // Delegating to one's own account form is a revocation: the
        // submission handler already falls back to `validator_addr` when
        // no delegation record is present.
        tx.delete(key);
    } else {
        let delegation = FeederDelegation {
            validator_addr: validator_addr.to_string(),
            feeder_addr: delegate_addr.to_string(),
        };
        tx.set(key, encode_json(&delegation)?);
    }
    tx.commit();
    Ok(())
}

pub(super) fn pause(
    module: &mut OracleModule<'_>,
    env: &Env,
    admin: &str,
    reason: String,
) -> Result<Event, OracleError> {
    let params = module.load_params()?;
    authorize_admin(&params, admin, OracleError::UnauthorizedPause(admin.to_string()))?;

    let state = crate::domain::EmergencyPauseState {
        paused: true,
        paused_by: Some(admin.to_string()),
        reason: Some(reason.clone()),
        height: env.block_height,
    };
    let mut tx = module.tx();
    tx.set(keys::key_pause_state(), encode_json(&state)?);
    tx.commit();

    Ok(Event::new(event::EVT_EMERGENCY_PAUSE)
        .attr("admin", admin)
        .attr("reason", reason)
        .attr("height", env.block_height))
}

pub(super) fn resume(module: &mut OracleModule<'_>, env: &Env, admin: &str) -> Result<Event, OracleError> {
    let params = module.load_params()?;
    authorize_admin(&params, admin, OracleError::UnauthorizedResume(admin.to_string()))?;

    let current = module.load_pause_state()?;
    if !current.paused {
        return Err(OracleError::OracleNotPaused);
    }

    let mut tx = module.tx();
    tx.set(keys::key_pause_state(), encode_json(&crate::domain::EmergencyPauseState::default())?);
    tx.commit();

    Ok(Event::new(event::EVT_EMERGENCY_RESUME)
        .attr("admin", admin)
        .attr("height", env.block_height))
}

/// Trips the circuit breaker, blocking further submissions until
/// [`close_circuit_breaker`] is called. Idempotence is enforced the same
/// way the error taxonomy names it: re-tripping an already-open breaker
/// is `circuit_breaker_already_open`, not a silent no-op.
pub(super) fn open_circuit_breaker(
    module: &mut OracleModule<'_>,
    env: &Env,
    admin: &str,
    reason: String,
) -> Result<Event, OracleError> {
    let params = module.load_params()?;
    authorize_admin(&params, admin, OracleError::UnauthorizedPause(admin.to_string()))?;

    if module.load_circuit_breaker_state()?.open {
        return Err(OracleError::CircuitBreakerAlreadyOpen);
    }

    let state = crate::domain::CircuitBreakerState {
        open: true,
        opened_by: Some(admin.to_string()),
        reason: Some(reason.clone()),
        opened_height: env.block_height,
    };
    let mut tx = module.tx();
    tx.set(keys::key_circuit_breaker_state(), encode_json(&state)?);
    tx.commit();

    for hook in module.hooks {
        if let Err(hook_err) = hook.on_circuit_breaker(&reason) {
            tracing::warn!(%hook_err, "circuit-breaker hook failed");
        }
    }

    Ok(Event::new(event::EVT_CIRCUIT_BREAKER_OPEN)
        .attr("admin", admin)
        .attr("reason", reason)
        .attr("height", env.block_height))
}

pub(super) fn close_circuit_breaker(
    module: &mut OracleModule<'_>,
    env: &Env,
    admin: &str,
) -> Result<Event, OracleError> {
    let params = module.load_params()?;
    authorize_admin(&params, admin, OracleError::UnauthorizedResume(admin.to_string()))?;

    if !module.load_circuit_breaker_state()?.open {
        return Err(OracleError::CircuitBreakerAlreadyClosed);
    }

    let mut tx = module.tx();
    tx.set(
        keys::key_circuit_breaker_state(),
        encode_json(&crate::domain::CircuitBreakerState::default())?,
    );
    tx.commit();

    Ok(Event::new(event::EVT_CIRCUIT_BREAKER_CLOSE)
        .attr("admin", admin)
        .attr("height", env.block_height))
}

pub(super) fn update_params(
    module: &mut OracleModule<'_>,
    authority: &str,
    new_params: Params,
) -> Result<Event, OracleError> {
    if authority != module.authority {
        return Err(OracleError::UnauthorizedParamsUpdate(authority.to_string()));
    }
    new_params.validate()?;

    let mut tx = module.tx();
    tx.set(keys::key_params(), encode_json(&new_params)?);
    tx.commit();

    Ok(Event::new(event::EVT_PARAMS_UPDATED).attr("authority", authority))
}

fn authorize_admin(params: &Params, admin: &str, err: OracleError) -> Result<(), OracleError> {
    match &params.emergency_admin {
        Some(expected) if expected == admin => Ok(()),
        _ => Err(err),
    }
}
