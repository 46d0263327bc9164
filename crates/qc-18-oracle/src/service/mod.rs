//! The oracle module's service layer: wires the domain engines to the
//! ports, the way `ConsensusService` wires `qc-08-consensus`'s domain to
//! its ports.

mod aggregation;
pub(crate) mod codec;
mod migration;
mod nonce_manager;
mod packet;
mod slashing;
mod submission;
mod twap;

pub use nonce_manager::NonceManager;

use crate::domain::{
    Acknowledgement, CircuitBreakerState, Decimal, EmergencyPauseState, Event, FeederDelegation,
    OracleError, Packet, Params,
};
use crate::ports::inbound::{Env, OracleApi};
use crate::ports::outbound::{DiversityPolicy, OracleHook, SlashingView, StakingView};
use crate::ports::{KvStore, StoreTx};

/// The module itself: a thin coordinator over the store and its
/// capability ports. Holds no state of its own beyond the `authority`
/// address — everything else lives in the key-value store.
pub struct OracleModule<'a> {
    pub(crate) store: &'a mut dyn KvStore,
    pub(crate) staking: &'a dyn StakingView,
    pub(crate) slashing: &'a mut dyn SlashingView,
    pub(crate) diversity: &'a dyn DiversityPolicy,
    pub(crate) hooks: &'a [Box<dyn OracleHook>],
    /// The governance module account: the sole principal accepted by
    /// `UpdateParams`.
    pub(crate) authority: String,
}

impl<'a> OracleModule<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: &'a mut dyn KvStore,
        staking: &'a dyn StakingView,
        slashing: &'a mut dyn SlashingView,
        diversity: &'a dyn DiversityPolicy,
        hooks: &'a [Box<dyn OracleHook>],
        authority: impl Into<String>,
    ) -> Self {
        OracleModule {
            store,
            staking,
            slashing,
            diversity,
            hooks,
            authority: authority.into(),
        }
    }

    fn tx(&mut self) -> StoreTx<'_> {
        StoreTx::begin(self.store)
    }

    fn load_params(&self) -> Result<Params, OracleError> {
        match self.store.get(&crate::keys::key_params()) {
            Some(bytes) => codec::decode_json(&bytes),
            None => Ok(Params::default()),
        }
    }

    fn load_pause_state(&self) -> Result<EmergencyPauseState, OracleError> {
        match self.store.get(&crate::keys::key_pause_state()) {
            Some(bytes) => codec::decode_json(&bytes),
            None => Ok(EmergencyPauseState::default()),
        }
    }

    fn load_feeder_delegation(&self, validator_addr: &str) -> Result<Option<FeederDelegation>, OracleError> {
        match self.store.get(&crate::keys::key_feeder_delegation(validator_addr)) {
            Some(bytes) => Ok(Some(codec::decode_json(&bytes)?)),
            None => Ok(None),
        }
    }

    fn load_circuit_breaker_state(&self) -> Result<CircuitBreakerState, OracleError> {
        match self.store.get(&crate::keys::key_circuit_breaker_state()) {
            Some(bytes) => codec::decode_json(&bytes),
            None => Ok(CircuitBreakerState::default()),
        }
    }

    /// Serializes `packet`, assigning it the next outbound nonce for
    /// `(channel_id, sender)`.
    pub fn send_packet(
        &mut self,
        channel_id: &str,
        sender: &str,
        packet: Packet,
        now_unix_seconds: i64,
    ) -> Result<Vec<u8>, OracleError> {
        packet::send_packet(self, channel_id, sender, packet, now_unix_seconds)
    }
}

impl<'a> OracleApi for OracleModule<'a> {
    fn submit_price(
        &mut self,
        env: &Env,
        validator_addr: &str,
        feeder_addr: &str,
        asset: &str,
        price: Decimal,
    ) -> Result<Event, OracleError> {
        submission::submit_price(self, env, validator_addr, feeder_addr, asset, price)
    }

    fn delegate_feeder(
        &mut self,
        env: &Env,
        validator_addr: &str,
        delegate_addr: &str,
    ) -> Result<(), OracleError> {
        submission::delegate_feeder(self, env, validator_addr, delegate_addr)
    }

    fn end_block_aggregate(&mut self, env: &Env) -> Result<Vec<Event>, OracleError> {
        aggregation::run_end_block(self, env)
    }

    fn end_block_slash(&mut self, env: &Env) -> Result<Vec<Event>, OracleError> {
        slashing::run_end_block(self, env)
    }

    fn twap(&self, asset: &str, lookback: u64, current_height: u64) -> Result<Decimal, OracleError> {
        twap::twap(self, asset, lookback, current_height)
    }

    fn migrate_v1_to_v2(&mut self, env: &Env) -> Result<Event, OracleError> {
        migration::migrate_v1_to_v2(self, env)
    }

    fn pause(&mut self, env: &Env, admin: &str, reason: String) -> Result<Event, OracleError> {
        submission::pause(self, env, admin, reason)
    }

    fn resume(&mut self, env: &Env, admin: &str) -> Result<Event, OracleError> {
        submission::resume(self, env, admin)
    }

    fn update_params(&mut self, authority: &str, new_params: Params) -> Result<Event, OracleError> {
        submission::update_params(self, authority, new_params)
    }

    fn open_circuit_breaker(&mut self, env: &Env, admin: &str, reason: String) -> Result<Event, OracleError> {
        submission::open_circuit_breaker(self, env, admin, reason)
    }

    fn close_circuit_breaker(&mut self, env: &Env, admin: &str) -> Result<Event, OracleError> {
        submission::close_circuit_breaker(self, env, admin)
    }

    fn receive_packet(
        &mut self,
        port_id: &str,
        channel_id: &str,
        sender: &str,
        payload: &[u8],
        now_unix_seconds: i64,
    ) -> Result<(Acknowledgement, Vec<Event>), OracleError> {
        packet::receive_packet(self, port_id, channel_id, sender, payload, now_unix_seconds)
    }
}
