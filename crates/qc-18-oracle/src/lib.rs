//! # QC-18 Oracle - Validator Price Aggregation & Liveness Subsystem
//!
//! Deterministic state-transition logic for a decentralized price-oracle
//! module bonded to a proof-of-stake validator set. This crate is the
//! CORE: the four tightly-coupled subsystems where the engineering depth
//! resides. Everything else the full module needs — transaction routing,
//! signature verification, the real staking/bank modules, the peer-chain
//! transport, event-emission plumbing — is an external collaborator
//! modeled here only as a trait in [`ports`].
//!
//! ## Subsystems
//!
//! | Subsystem | Responsibility | Entry point |
//! |---|---|---|
//! | Aggregation | Per-period vote gathering, outlier rejection, weighted median | [`service::OracleModule::end_block_aggregate`] |
//! | Slashing / liveness | Sliding-window miss counters, jailing, stake penalties | [`service::OracleModule::end_block_slash`] |
//! | Nonce manager | Replay-safe per-(channel, sender) sequence numbers | [`service::NonceManager`] |
//! | Migration | Forward-only v1 → v2 schema repair | [`service::OracleModule::migrate_v1_to_v2`] |
//!
//! ## Execution model
//!
//! Synchronous, single-threaded per block: no `async`, no background
//! tasks, no direct network I/O. Every fallible operation returns
//! [`domain::OracleError`]; end-of-block code paths never propagate an
//! error that would halt the chain — they log and emit an event instead.
//! See `DESIGN.md` for the ledger of which teacher module each piece is
//! grounded on.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use qc_18_oracle::{OracleModule, OracleApi, Env};
//!
//! let mut module = OracleModule::new(&mut store, &staking, &mut slashing, &diversity, &hooks, "gov");
//! module.submit_price(&env, "val1", "val1", "BTC", price)?;
//! let events = module.end_block_aggregate(&env)?;
//! ```

pub mod adapters;
pub mod domain;
pub mod keys;
pub mod ports;
pub mod service;

pub use domain::{
    ChannelId, CircuitBreakerState, Decimal, EmergencyPauseState, Event, FeederDelegation,
    OracleError, OracleResult, Params, Price, PriceSnapshot, SlashingInfo, ValidatorOracle,
    ValidatorPrice,
};
pub use ports::{Env, KvStore, OracleApi};
pub use service::{NonceManager, OracleModule};
