use thiserror::Error;

/// Configuration-related errors with structured variants.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),
}

/// Synchronous request validation failures. Rejected before any side effect.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("leverage {0} outside allowed range [{1}, {2}]")]
    LeverageOutOfRange(u32, u32, u32),

    #[error("open price must be positive, got {0}")]
    NonPositiveOpenPrice(rust_decimal::Decimal),

    #[error("stake must be positive, got {0}")]
    NonPositiveStake(rust_decimal::Decimal),

    #[error("lot size must be positive, got {0}")]
    NonPositiveLotSize(rust_decimal::Decimal),

    #[error("duration must be at least one unit")]
    ZeroDuration,

    #[error("capital fraction must be in (0, 1], got {0}")]
    CapitalFractionOutOfRange(rust_decimal::Decimal),

    #[error("required margin {required} exceeds allotted capital {allotted}")]
    InsufficientCapital {
        required: rust_decimal::Decimal,
        allotted: rust_decimal::Decimal,
    },

    #[error("modification reason must not be empty")]
    EmptyReason,

    #[error("no changes detected")]
    NoChanges,
}

/// Failures at the backing-store boundary. Retryable by the caller.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("position not found: {0}")]
    NotFound(String),

    #[error("request rejected by store: {0}")]
    Rejected(String),

    #[error("position already terminal: {0}")]
    Conflict(String),

    #[error("operator scope does not cover this position")]
    ScopeDenied,
}

/// Quote-transport failures. Absorbed inside the provider chain; these never
/// cross the feed boundary.
#[derive(Error, Debug)]
pub enum FeedError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("malformed quote payload: {0}")]
    Payload(String),

    #[error("no data for symbol {0}")]
    NoData(String),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Feed(#[from] FeedError),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
