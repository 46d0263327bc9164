//! Driving port: the module's primary API, as called by transaction
//! handlers and the host's begin/end-block lifecycle hooks.

use crate::domain::{Acknowledgement, Decimal, Event, OracleError, Params};

/// Block-scoped execution context, threaded explicitly through every core
/// operation instead of read from an ambient global — the redesign away
/// from an ambient context object carrying block time/height/store/event
/// manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Env {
    pub block_height: u64,
    pub block_time: i64,
}

/// Primary oracle API.
pub trait OracleApi {
    /// Stage a validator's price vote for the current period.
    fn submit_price(
        &mut self,
        env: &Env,
        validator_addr: &str,
        feeder_addr: &str,
        asset: &str,
        price: Decimal,
    ) -> Result<Event, OracleError>;

    /// Authorize (or revoke) an account to submit on a validator's behalf.
    fn delegate_feeder(
        &mut self,
        env: &Env,
        validator_addr: &str,
        delegate_addr: &str,
    ) -> Result<(), OracleError>;

    /// Run end-of-period aggregation for every asset with staged votes.
    /// A no-op (returns an empty event list) outside a vote-period boundary.
    fn end_block_aggregate(&mut self, env: &Env) -> Result<Vec<Event>, OracleError>;

    /// Run end-of-window slashing evaluation. A no-op outside a
    /// slash-window boundary.
    fn end_block_slash(&mut self, env: &Env) -> Result<Vec<Event>, OracleError>;

    /// Time-weighted average price over `[current_height - lookback,
    /// current_height]`.
    fn twap(&self, asset: &str, lookback: u64, current_height: u64) -> Result<Decimal, OracleError>;

    /// Forward-only v1 → v2 state migration. Idempotent.
    fn migrate_v1_to_v2(&mut self, env: &Env) -> Result<Event, OracleError>;

    fn pause(&mut self, env: &Env, admin: &str, reason: String) -> Result<Event, OracleError>;

    fn resume(&mut self, env: &Env, admin: &str) -> Result<Event, OracleError>;

    fn update_params(&mut self, authority: &str, new_params: Params) -> Result<Event, OracleError>;

    /// Trip the circuit breaker: rejects further submissions with
    /// `circuit_breaker_active` until [`OracleApi::close_circuit_breaker`]
    /// is called. Rejects with `circuit_breaker_already_open` if already
    /// tripped.
    fn open_circuit_breaker(&mut self, env: &Env, admin: &str, reason: String) -> Result<Event, OracleError>;

    /// Resets the circuit breaker. Rejects with
    /// `circuit_breaker_already_closed` if it is not currently open.
    fn close_circuit_breaker(&mut self, env: &Env, admin: &str) -> Result<Event, OracleError>;

    /// Accept a raw inbound packet on `(port_id, channel_id)` from `sender`.
    /// Checks channel authorization, parses and validates the packet, and
    /// runs it through replay-safe nonce tracking before acknowledging it.
    /// Returns the acknowledgement to send back plus the events emitted
    /// along the way.
    fn receive_packet(
        &mut self,
        port_id: &str,
        channel_id: &str,
        sender: &str,
        payload: &[u8],
        now_unix_seconds: i64,
    ) -> Result<(Acknowledgement, Vec<Event>), OracleError>;
}
