//! Ports: the seams between the deterministic CORE and everything the
//! spec declares an external collaborator.

pub mod inbound;
pub mod kv_store;
pub mod outbound;

pub use inbound::{Env, OracleApi};
pub use kv_store::{InMemoryKvStore, KvStore, StoreTx};
pub use outbound::{
    BankView, DiversityPolicy, OracleHook, PermissiveDiversityPolicy, SlashingView, StakingView,
    ValidatorInfo,
};
