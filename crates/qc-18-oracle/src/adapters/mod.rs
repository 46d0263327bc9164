//! In-memory adapters implementing this crate's [`crate::ports`] traits.
//!
//! These exist for this module's own tests, the same way `qc-08-consensus`
//! ships `InMemoryEventBus` — production adapters over a real validator
//! set, bank module, and chain event manager live outside this crate.

pub mod hooks;
pub mod slashing;
pub mod staking;

pub use hooks::{FailingHook, RecordingHook};
pub use slashing::InMemorySlashingView;
pub use staking::InMemoryStakingView;
