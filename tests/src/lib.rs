//! Shared fixtures for the oracle module's cross-module integration
//! scenarios (spec §8 test suite), built from the crate's own in-memory
//! adapters rather than a second, parallel set of test doubles.

pub mod integration;

use qc_18_oracle::adapters::{InMemorySlashingView, InMemoryStakingView};
use qc_18_oracle::ports::{InMemoryKvStore, OracleHook, PermissiveDiversityPolicy};
use qc_18_oracle::{Decimal, Env, OracleModule, Params};

/// One end-to-end harness: an in-memory store, staking view, slashing
/// view, and a permissive diversity policy, wired the way a host
/// integration would wire the real capability adapters.
pub struct Harness {
    pub store: InMemoryKvStore,
    pub staking: InMemoryStakingView,
    pub slashing: InMemorySlashingView,
    pub diversity: PermissiveDiversityPolicy,
    pub hooks: Vec<Box<dyn OracleHook>>,
    pub authority: String,
}

impl Harness {
    pub fn new() -> Self {
        Harness {
            store: InMemoryKvStore::new(),
            staking: InMemoryStakingView::new(),
            slashing: InMemorySlashingView::new(),
            diversity: PermissiveDiversityPolicy,
            hooks: Vec::new(),
            authority: "gov".to_string(),
        }
    }

    pub fn module(&mut self) -> OracleModule<'_> {
        OracleModule::new(
            &mut self.store,
            &self.staking,
            &mut self.slashing,
            &self.diversity,
            &self.hooks,
            self.authority.clone(),
        )
    }

    pub fn bond(&mut self, validator_addr: &str, voting_power: i64) {
        self.staking.bond(validator_addr, Decimal::from_i64(voting_power));
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

pub fn env(block_height: u64) -> Env {
    Env {
        block_height,
        block_time: block_height as i64,
    }
}

/// `Params::default()` with the vote/slash windows dialed down to values
/// a test can reach without iterating thousands of blocks, following the
/// same shape the production defaults use.
pub fn small_params(vote_period: u64, vote_threshold: &str) -> Params {
    let mut params = Params::default();
    params.vote_period = vote_period;
    params.vote_threshold = Decimal::parse(vote_threshold).expect("valid literal");
    params.min_voting_power_for_consensus = Decimal::parse(vote_threshold).expect("valid literal");
    params
}
