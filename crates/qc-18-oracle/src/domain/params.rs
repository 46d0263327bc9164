//! Module-wide tunables, singleton, range-checked on every write.

use serde::{Deserialize, Serialize};

use super::decimal::Decimal;
use super::error::OracleError;

/// A (port_id, channel_id) pair allow-listed for inbound packets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelId {
    pub port_id: String,
    pub channel_id: String,
}

/// Module-wide configuration, one instance per chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Params {
    /// Length of an aggregation window, in blocks.
    pub vote_period: u64,
    /// Minimum fraction of bonded voting power that must submit for a
    /// price to commit.
    pub vote_threshold: Decimal,
    /// Fraction of stake burned per slashing event.
    pub slash_fraction: Decimal,
    /// Window over which miss counts are evaluated, in blocks.
    pub slash_window: u64,
    /// Minimum valid submissions per validator per slash window.
    pub min_valid_per_window: u64,
    /// Horizon for snapshot retention and TWAP, in blocks.
    pub twap_lookback_window: u64,
    /// Lower bound on surviving voting power after outlier filtering.
    pub min_voting_power_for_consensus: Decimal,
    /// Diversity cap: max validators sharing one IP address.
    pub max_validators_per_ip: u64,
    /// Diversity cap: max validators sharing one ASN.
    pub max_validators_per_asn: u64,
    /// Allow-list of channels permitted to deliver inbound packets.
    pub authorized_channels: Vec<ChannelId>,
    /// Age, in seconds, after which a stored nonce tuple may be pruned.
    pub nonce_ttl_seconds: u64,
    /// Principal permitted to pause submissions.
    pub emergency_admin: Option<String>,
}

impl Default for Params {
    fn default() -> Self {
        Params {
            vote_period: 30,
            vote_threshold: Decimal::parse("0.5").expect("valid literal"),
            slash_fraction: Decimal::parse("0.0005").expect("valid literal"),
            slash_window: 100_800,
            min_valid_per_window: 100_683, // slash_window - ~allowed misses
            twap_lookback_window: 3_600,
            min_voting_power_for_consensus: Decimal::parse("0.33").expect("valid literal"),
            max_validators_per_ip: 3,
            max_validators_per_asn: 5,
            authorized_channels: Vec::new(),
            nonce_ttl_seconds: 7 * 24 * 60 * 60,
            emergency_admin: None,
        }
    }
}

impl Params {
    /// Range-check every field. Called on genesis init and before every
    /// `UpdateParams` write is persisted.
    pub fn validate(&self) -> Result<(), OracleError> {
        if self.vote_period == 0 {
            return Err(OracleError::InvalidVotePeriod);
        }
        if !(self.vote_threshold.is_positive()
            && self.vote_threshold.partial_cmp(&Decimal::one()) != Some(std::cmp::Ordering::Greater))
        {
            return Err(OracleError::InvalidThreshold);
        }
        if self.slash_fraction.is_negative() || self.slash_fraction > Decimal::one() {
            return Err(OracleError::InvalidSlashFraction);
        }
        if self.slash_window == 0 {
            return Err(OracleError::InvalidVotePeriod);
        }
        if self.min_valid_per_window == 0 || self.min_valid_per_window > self.slash_window {
            return Err(OracleError::InvalidVotePeriod);
        }
        if self.twap_lookback_window == 0 {
            return Err(OracleError::InvalidVotePeriod);
        }
        if self.min_voting_power_for_consensus.is_negative()
            || self.min_voting_power_for_consensus > Decimal::one()
        {
            return Err(OracleError::InvalidThreshold);
        }
        if self.max_validators_per_ip == 0 || self.max_validators_per_asn == 0 {
            return Err(OracleError::InvalidVotePeriod);
        }
        // §9 open question, resolved: an ASN cap tighter than the IP cap is
        // permitted by the type system but semantically backwards (an ASN
        // can host many IPs), so parameter updates require the wider cap.
        if self.max_validators_per_asn < self.max_validators_per_ip {
            return Err(OracleError::InvalidVotePeriod);
        }
        if self.nonce_ttl_seconds == 0 {
            return Err(OracleError::InvalidVotePeriod);
        }
        if let Some(admin) = &self.emergency_admin {
            if admin.is_empty() {
                return Err(OracleError::InvalidEmergencyAdmin);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_params_validate() {
        Params::default().validate().expect("defaults must be valid");
    }

    #[test]
    fn zero_vote_period_is_rejected() {
        let mut p = Params::default();
        p.vote_period = 0;
        assert!(p.validate().is_err());
    }

    #[test]
    fn asn_cap_below_ip_cap_is_rejected() {
        let mut p = Params::default();
        p.max_validators_per_ip = 5;
        p.max_validators_per_asn = 3;
        assert!(p.validate().is_err());
    }

    #[test]
    fn threshold_out_of_range_is_rejected() {
        let mut p = Params::default();
        p.vote_threshold = Decimal::zero();
        assert!(p.validate().is_err());
        p.vote_threshold = Decimal::parse("1.5").unwrap();
        assert!(p.validate().is_err());
    }
}
