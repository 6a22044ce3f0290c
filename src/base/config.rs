//! Pipeline configuration.
//!
//! The three timeout budgets and the streaming threshold are threaded
//! explicitly through the executor, the stream coordinator, and the drain
//! loop rather than baked in at each site.

use std::time::Duration;

/// Budgets and thresholds for one client's request pipeline.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// How long the executor waits for the transport to open a response
    /// (default: 120 s).
    pub request_timeout: Duration,
    /// Quiet window after which a live stream coordinator cuts itself off
    /// (default: 60 s).
    pub stream_inactivity_timeout: Duration,
    /// Quiet window after which a consumer drain loop gives up
    /// (default: 60 s).
    pub drain_timeout: Duration,
    /// Declared content lengths above this are streamed instead of
    /// buffered; unknown lengths always stream (default: 5,000,000).
    pub streaming_threshold: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(120),
            stream_inactivity_timeout: Duration::from_secs(60),
            drain_timeout: Duration::from_secs(60),
            streaming_threshold: 5_000_000,
        }
    }
}
