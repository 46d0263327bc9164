//! Domain layer: entities, arithmetic primitives, and the error taxonomy.
//!
//! Nothing in this module touches the key-value store or any external
//! capability; everything here is a pure data type or a pure function over
//! those data types.

pub mod decimal;
pub mod error;
pub mod event;
pub mod nonce;
pub mod packet;
pub mod params;
pub mod price;
pub mod validator_oracle;

pub use decimal::Decimal;
pub use error::{OracleError, OracleResult};
pub use event::Event;
pub use nonce::NonceState;
pub use packet::{parse_packet, Acknowledgement, Packet, PACKET_VERSION};
pub use params::{ChannelId, Params};
pub use price::{validate_asset, Price, PriceSnapshot, ValidatorPrice, MAX_ASSET_LEN};
pub use validator_oracle::{
    CircuitBreakerState, EmergencyPauseState, FeederDelegation, SlashingInfo, ValidatorOracle,
};
