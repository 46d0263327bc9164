//! The inter-chain packet wire format: a tagged union over four variants,
//! each self-describing via its `type` discriminator.
//!
//! Modeled as a single Rust enum rather than the dynamic type assertions
//! the source repo uses to inspect an arbitrary payload at parse time —
//! `parse_packet` returns the sum type directly, and each variant carries
//! and validates its own fields.

use serde::{Deserialize, Serialize};

use super::decimal::Decimal;
use super::error::OracleError;
use super::price::validate_asset;

/// Wire-format version carried by every packet this module emits.
pub const PACKET_VERSION: &str = "paw-oracle-1";

/// One request to begin receiving `PriceUpdate` packets for a set of assets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscribePricesPayload {
    pub assets: Vec<String>,
}

/// A one-shot request for the current price of a single asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryPricePayload {
    pub asset: String,
}

/// A pushed price update for one asset, carrying the submitter's own
/// confidence in the reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceUpdatePayload {
    pub asset: String,
    pub price: Decimal,
    pub block_height: u64,
    pub confidence: Decimal,
}

/// A liveness ping carrying no payload beyond the common envelope fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OracleHeartbeatPayload {}

/// Tagged union over the four packet variants. `type` is the wire
/// discriminator; every variant repeats the common `version`, `nonce`,
/// and `timestamp` envelope fields alongside its own payload, since an
/// internally-tagged enum cannot otherwise share fields across variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Packet {
    SubscribePrices {
        version: String,
        nonce: u64,
        timestamp: i64,
        #[serde(flatten)]
        payload: SubscribePricesPayload,
    },
    QueryPrice {
        version: String,
        nonce: u64,
        timestamp: i64,
        #[serde(flatten)]
        payload: QueryPricePayload,
    },
    PriceUpdate {
        version: String,
        nonce: u64,
        timestamp: i64,
        #[serde(flatten)]
        payload: PriceUpdatePayload,
    },
    OracleHeartbeat {
        version: String,
        nonce: u64,
        timestamp: i64,
        #[serde(flatten)]
        payload: OracleHeartbeatPayload,
    },
}

impl Packet {
    pub fn nonce(&self) -> u64 {
        match self {
            Packet::SubscribePrices { nonce, .. }
            | Packet::QueryPrice { nonce, .. }
            | Packet::PriceUpdate { nonce, .. }
            | Packet::OracleHeartbeat { nonce, .. } => *nonce,
        }
    }

    pub fn timestamp(&self) -> i64 {
        match self {
            Packet::SubscribePrices { timestamp, .. }
            | Packet::QueryPrice { timestamp, .. }
            | Packet::PriceUpdate { timestamp, .. }
            | Packet::OracleHeartbeat { timestamp, .. } => *timestamp,
        }
    }

    pub fn version(&self) -> &str {
        match self {
            Packet::SubscribePrices { version, .. }
            | Packet::QueryPrice { version, .. }
            | Packet::PriceUpdate { version, .. }
            | Packet::OracleHeartbeat { version, .. } => version,
        }
    }

    /// The `type` discriminator, for logging and event attributes.
    pub fn type_tag(&self) -> &'static str {
        match self {
            Packet::SubscribePrices { .. } => "subscribe_prices",
            Packet::QueryPrice { .. } => "query_price",
            Packet::PriceUpdate { .. } => "price_update",
            Packet::OracleHeartbeat { .. } => "oracle_heartbeat",
        }
    }

    /// Structural checks independent of any store lookup: the nonce /
    /// timestamp envelope (same contract as the nonce manager's incoming
    /// validation) plus each variant's field-level invariants.
    pub fn validate_basic(&self) -> Result<(), OracleError> {
        if self.nonce() == 0 {
            return Err(OracleError::InvalidPacket("nonce must be non-zero".to_string()));
        }
        if self.timestamp() <= 0 {
            return Err(OracleError::InvalidPacket("timestamp must be positive".to_string()));
        }
        if self.version() != PACKET_VERSION {
            return Err(OracleError::InvalidPacket(format!(
                "unsupported packet version {:?}",
                self.version()
            )));
        }
        match self {
            Packet::SubscribePrices { payload, .. } => {
                if payload.assets.is_empty() {
                    return Err(OracleError::InvalidPacket("subscribe_prices requires at least one asset".to_string()));
                }
                for asset in &payload.assets {
                    validate_asset(asset).map_err(|_| OracleError::InvalidPacket(format!("invalid asset {asset:?}")))?;
                }
            }
            Packet::QueryPrice { payload, .. } => {
                validate_asset(&payload.asset).map_err(|_| OracleError::InvalidPacket(format!("invalid asset {:?}", payload.asset)))?;
            }
            Packet::PriceUpdate { payload, .. } => {
                validate_asset(&payload.asset).map_err(|_| OracleError::InvalidPacket(format!("invalid asset {:?}", payload.asset)))?;
                if !payload.price.is_positive() {
                    return Err(OracleError::InvalidPacket("price must be positive".to_string()));
                }
                if payload.confidence.is_negative() || payload.confidence > Decimal::one() {
                    return Err(OracleError::InvalidPacket("confidence must lie in [0, 1]".to_string()));
                }
            }
            Packet::OracleHeartbeat { .. } => {}
        }
        Ok(())
    }
}

/// Parse a wire payload, dispatching on its `type` discriminator. An
/// unrecognized tag or structurally invalid JSON both fail as
/// `invalid_packet` — the caller never needs to distinguish "unknown
/// variant" from "malformed bytes".
pub fn parse_packet(bytes: &[u8]) -> Result<Packet, OracleError> {
    serde_json::from_slice(bytes).map_err(|e| OracleError::InvalidPacket(e.to_string()))
}

/// Acknowledgement echoed back to the sender of an inbound packet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Acknowledgement {
    pub nonce: u64,
    pub success: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn heartbeat(nonce: u64, timestamp: i64) -> Packet {
        Packet::OracleHeartbeat {
            version: PACKET_VERSION.to_string(),
            nonce,
            timestamp,
            payload: OracleHeartbeatPayload {},
        }
    }

    #[test]
    fn encode_decode_round_trips_for_every_variant() {
        let packets = vec![
            heartbeat(1, 1_000),
            Packet::SubscribePrices {
                version: PACKET_VERSION.to_string(),
                nonce: 2,
                timestamp: 1_000,
                payload: SubscribePricesPayload { assets: vec!["BTC".to_string()] },
            },
            Packet::QueryPrice {
                version: PACKET_VERSION.to_string(),
                nonce: 3,
                timestamp: 1_000,
                payload: QueryPricePayload { asset: "BTC".to_string() },
            },
            Packet::PriceUpdate {
                version: PACKET_VERSION.to_string(),
                nonce: 4,
                timestamp: 1_000,
                payload: PriceUpdatePayload {
                    asset: "BTC".to_string(),
                    price: Decimal::from_i64(50_000),
                    block_height: 30,
                    confidence: Decimal::one(),
                },
            },
        ];
        for packet in packets {
            let bytes = serde_json::to_vec(&packet).unwrap();
            let decoded = parse_packet(&bytes).unwrap();
            assert_eq!(decoded, packet);
            decoded.validate_basic().unwrap();
        }
    }

    #[test]
    fn unknown_tag_fails_as_invalid_packet() {
        let err = parse_packet(br#"{"type":"not_a_real_packet","nonce":1,"timestamp":1}"#).unwrap_err();
        assert!(matches!(err, OracleError::InvalidPacket(_)));
    }

    #[test]
    fn zero_nonce_and_non_positive_timestamp_fail_validation() {
        assert!(heartbeat(0, 1_000).validate_basic().is_err());
        assert!(heartbeat(1, 0).validate_basic().is_err());
        assert!(heartbeat(1, -1).validate_basic().is_err());
    }

    #[test]
    fn price_update_rejects_non_positive_price_and_out_of_range_confidence() {
        let mut p = PriceUpdatePayload {
            asset: "BTC".to_string(),
            price: Decimal::zero(),
            block_height: 1,
            confidence: Decimal::one(),
        };
        let bad_price = Packet::PriceUpdate { version: PACKET_VERSION.to_string(), nonce: 1, timestamp: 1, payload: p.clone() };
        assert!(bad_price.validate_basic().is_err());

        p.price = Decimal::from_i64(1);
        p.confidence = Decimal::parse("1.5").unwrap();
        let bad_confidence = Packet::PriceUpdate { version: PACKET_VERSION.to_string(), nonce: 1, timestamp: 1, payload: p };
        assert!(bad_confidence.validate_basic().is_err());
    }

    #[test]
    fn subscribe_prices_requires_at_least_one_asset() {
        let packet = Packet::SubscribePrices {
            version: PACKET_VERSION.to_string(),
            nonce: 1,
            timestamp: 1,
            payload: SubscribePricesPayload { assets: vec![] },
        };
        assert!(packet.validate_basic().is_err());
    }

    #[test]
    fn unsupported_version_is_rejected() {
        let mut packet = heartbeat(1, 1_000);
        if let Packet::OracleHeartbeat { version, .. } = &mut packet {
            *version = "paw-oracle-0".to_string();
        }
        assert!(packet.validate_basic().is_err());
    }
}
