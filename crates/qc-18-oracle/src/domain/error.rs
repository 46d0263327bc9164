//! Closed error taxonomy for the oracle module.
//!
//! Every externally observable failure is one variant of [`OracleError`].
//! Variant tags and their numeric [`OracleError::code`] are stable across
//! releases: transaction results carry the code, so a variant is never
//! renumbered once shipped, only appended to.

use thiserror::Error;

/// All failure modes the oracle module can return to the host.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OracleError {
    // ---- Input errors: reject the transaction, no state change ----
    #[error("invalid asset symbol: {0:?}")]
    InvalidAsset(String),
    #[error("invalid price: must be positive, got {0}")]
    InvalidPrice(String),
    #[error("invalid vote_period: must be a positive number of blocks")]
    InvalidVotePeriod,
    #[error("invalid vote_threshold: must lie in (0, 1]")]
    InvalidThreshold,
    #[error("invalid slash_fraction: must lie in [0, 1]")]
    InvalidSlashFraction,
    #[error("invalid emergency_admin address")]
    InvalidEmergencyAdmin,

    // ---- Authorization errors: reject, no state change ----
    #[error("validator {0} is not bonded")]
    ValidatorNotBonded(String),
    #[error("feeder {feeder} is not authorized for validator {validator}")]
    FeederNotAuthorized { feeder: String, validator: String },
    #[error("validator {0} not found")]
    ValidatorNotFound(String),
    #[error("{0} is not authorized to pause the oracle")]
    UnauthorizedPause(String),
    #[error("{0} is not authorized to resume the oracle")]
    UnauthorizedResume(String),
    #[error("channel {port_id}/{channel_id} is not authorized")]
    UnauthorizedChannel { port_id: String, channel_id: String },
    #[error("{0} is not the governance authority")]
    UnauthorizedParamsUpdate(String),

    // ---- Lifecycle errors: reject ----
    #[error("duplicate submission for validator {validator} asset {asset} this period")]
    DuplicateSubmission { validator: String, asset: String },
    #[error("oracle submissions are paused")]
    OraclePaused,
    #[error("circuit breaker is active")]
    CircuitBreakerActive,
    #[error("circuit breaker is already open")]
    CircuitBreakerAlreadyOpen,
    #[error("circuit breaker is already closed")]
    CircuitBreakerAlreadyClosed,
    #[error("oracle is not currently paused")]
    OracleNotPaused,

    // ---- Aggregation errors: no commit, emit event, continue ----
    #[error("insufficient votes for asset {0}")]
    InsufficientVotes(String),
    #[error("outlier detected for asset {0}")]
    OutlierDetected(String),
    #[error("median calculation failed for asset {0}")]
    MedianCalculationFailed(String),
    #[error("insufficient oracle consensus for asset {0}")]
    InsufficientOracleConsensus(String),
    #[error("insufficient data sources for asset {0}")]
    InsufficientDataSources(String),

    // ---- Security errors: reject the offending input ----
    #[error("sybil attack detected among validators for asset {0}")]
    SybilAttackDetected(String),
    #[error("flash loan attack pattern detected for asset {0}")]
    FlashLoanDetected(String),
    #[error("data poisoning detected for asset {0}")]
    DataPoisoning(String),
    #[error("validator {validator} IP region does not match its registration")]
    IpRegionMismatch { validator: String },
    #[error("private IP address not allowed for validator {0}")]
    PrivateIpNotAllowed(String),
    #[error("too many validators from the same IP for asset {0}")]
    TooManyValidatorsFromSameIp(String),
    #[error("insufficient geographic diversity for asset {0}")]
    InsufficientGeographicDiversity(String),

    // ---- Nonce / packet errors: reject packet, never halt the chain ----
    #[error("invalid nonce: {0}")]
    InvalidNonce(String),
    #[error("invalid packet: {0}")]
    InvalidPacket(String),
    #[error("replay attack: nonce {nonce} already seen on channel {channel}/{sender}")]
    ReplayAttack {
        channel: String,
        sender: String,
        nonce: u64,
    },

    // ---- State errors: logged as critical, never halt except migration ----
    #[error("state corruption: {0}")]
    StateCorruption(String),
    #[error("oracle data unavailable for asset {0}")]
    OracleDataUnavailable(String),
}

impl OracleError {
    /// Stable numeric code, externally observable via transaction results.
    ///
    /// Grouped by category in blocks of 100 so a new variant can be
    /// appended to any category without renumbering its neighbors.
    pub fn code(&self) -> u32 {
        use OracleError::*;
        match self {
            InvalidAsset(_) => 1000,
            InvalidPrice(_) => 1001,
            InvalidVotePeriod => 1002,
            InvalidThreshold => 1003,
            InvalidSlashFraction => 1004,
            InvalidEmergencyAdmin => 1005,

            ValidatorNotBonded(_) => 1100,
            FeederNotAuthorized { .. } => 1101,
            ValidatorNotFound(_) => 1102,
            UnauthorizedPause(_) => 1103,
            UnauthorizedResume(_) => 1104,
            UnauthorizedChannel { .. } => 1105,
            UnauthorizedParamsUpdate(_) => 1106,

            DuplicateSubmission { .. } => 1200,
            OraclePaused => 1201,
            CircuitBreakerActive => 1202,
            CircuitBreakerAlreadyOpen => 1203,
            CircuitBreakerAlreadyClosed => 1204,
            OracleNotPaused => 1205,

            InsufficientVotes(_) => 1300,
            OutlierDetected(_) => 1301,
            MedianCalculationFailed(_) => 1302,
            InsufficientOracleConsensus(_) => 1303,
            InsufficientDataSources(_) => 1304,

            SybilAttackDetected(_) => 1400,
            FlashLoanDetected(_) => 1401,
            DataPoisoning(_) => 1402,
            IpRegionMismatch { .. } => 1403,
            PrivateIpNotAllowed(_) => 1404,
            TooManyValidatorsFromSameIp(_) => 1405,
            InsufficientGeographicDiversity(_) => 1406,

            InvalidNonce(_) => 1500,
            InvalidPacket(_) => 1501,
            ReplayAttack { .. } => 1502,

            StateCorruption(_) => 1600,
            OracleDataUnavailable(_) => 1601,
        }
    }

    /// Human-readable remediation, indexed by error kind.
    ///
    /// Errors in this module never wrap one another (there is no nested
    /// cause chain to unwrap), so the lookup is a direct match on `self`.
    pub fn recovery_hint(&self) -> &'static str {
        use OracleError::*;
        match self {
            InvalidAsset(_) => "use a non-empty asset symbol of at most 128 bytes",
            InvalidPrice(_) => "submit a strictly positive price",
            InvalidVotePeriod => "set vote_period to a positive number of blocks",
            InvalidThreshold => "set vote_threshold to a value in (0, 1]",
            InvalidSlashFraction => "set slash_fraction to a value in [0, 1]",
            InvalidEmergencyAdmin => "provide a valid bech32 address or omit the field",

            ValidatorNotBonded(_) => "bond stake before submitting prices",
            FeederNotAuthorized { .. } => "sign with the delegated feeder or the validator account",
            ValidatorNotFound(_) => "register the validator before referencing it",
            UnauthorizedPause(_) => "only the configured emergency_admin may pause",
            UnauthorizedResume(_) => "only the configured emergency_admin may resume",
            UnauthorizedChannel { .. } => "add the (port, channel) pair to authorized_channels",
            UnauthorizedParamsUpdate(_) => "only the governance module account may update params",

            DuplicateSubmission { .. } => "wait for the next vote period before resubmitting",
            OraclePaused => "wait for an emergency_admin to resume the oracle",
            CircuitBreakerActive => "wait for the circuit breaker to close",
            CircuitBreakerAlreadyOpen => "the breaker is already open; no action needed",
            CircuitBreakerAlreadyClosed => "the breaker is already closed; no action needed",
            OracleNotPaused => "there is nothing to resume",

            InsufficientVotes(_) => "wait for more validators to submit before the period ends",
            OutlierDetected(_) => "resubmit a price consistent with the validator set's median",
            MedianCalculationFailed(_) => "ensure at least one validator survives outlier filtering",
            InsufficientOracleConsensus(_) => "raise participation above min_voting_power_for_consensus",
            InsufficientDataSources(_) => "register additional independent price feeders",

            SybilAttackDetected(_) => "diversify validator network identity before resubmitting",
            FlashLoanDetected(_) => "submit a price unaffected by the same-block liquidity swing",
            DataPoisoning(_) => "investigate the flagged validator's feed",
            IpRegionMismatch { .. } => "update the validator's registered geographic_region",
            PrivateIpNotAllowed(_) => "register a routable public IP address",
            TooManyValidatorsFromSameIp(_) => "spread validators across more distinct IPs",
            InsufficientGeographicDiversity(_) => "register validators across more distinct regions",

            InvalidNonce(_) => "resend with a strictly increasing nonce and a fresh timestamp",
            InvalidPacket(_) => "check the packet's type discriminator and required fields",
            ReplayAttack { .. } => "the packet was already processed; no retry needed",

            StateCorruption(_) => "this is a critical invariant violation; page an operator",
            OracleDataUnavailable(_) => "wait for the next successful aggregation",
        }
    }
}

/// Convenience alias used throughout the module.
pub type OracleResult<T> = Result<T, OracleError>;
