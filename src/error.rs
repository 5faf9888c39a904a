use thiserror::Error;

/// Error kinds surfaced by the engine and the snapshot provider.
///
/// Validation failures and same-location comparisons are folded into
/// `Outcome` values at the app surface; missing data inside a comparison
/// is policy (skipped rows), never an error.
#[derive(Debug, Error)]
pub enum MarketError {
    #[error("InvalidQuality: quality must be an integer between 1 and 5")]
    InvalidQuality,

    #[error("InvalidThreshold: minimum diff must be a non-negative number")]
    InvalidThreshold,

    #[error("SameLocationError: cannot compare {0} with itself")]
    SameLocation(String),

    #[error("LocationUnavailable: no market data for {0}")]
    LocationUnavailable(String),

    #[error("SnapshotEmpty: snapshot for {0} contains no records")]
    SnapshotEmpty(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("export failed: {0}")]
    Io(#[from] std::io::Error),
}
