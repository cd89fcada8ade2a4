//! Tuning parameters for the download engine and announcer.
//!
//! Defaults follow the values proven out by mainline clients; all of them
//! can be overridden by the embedding client.

use std::time::Duration;

/// Configuration for the download orchestrator.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum concurrent piece downloads.
    pub parallel_piece_downloads: usize,
    /// Number of piece-writer workers.
    pub parallel_piece_writes: usize,
    /// Period of the regular unchoke pass.
    pub unchoke_interval: Duration,
    /// Period of the optimistic unchoke rotation.
    pub optimistic_unchoke_interval: Duration,
    /// Peers unchoked by download rate on each regular pass.
    pub regular_unchoke_slots: usize,
    /// Newly connected peers are unchoked while the swarm is at or below
    /// this size.
    pub initial_unchoke_connected_threshold: usize,
    /// Outstanding block requests per piece download.
    pub request_pipeline_depth: usize,
    /// A piece download that sees no traffic for this long fails.
    pub block_request_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            parallel_piece_downloads: 4,
            parallel_piece_writes: 4,
            unchoke_interval: Duration::from_secs(10),
            optimistic_unchoke_interval: Duration::from_secs(30),
            regular_unchoke_slots: 3,
            initial_unchoke_connected_threshold: 4,
            request_pipeline_depth: 4,
            block_request_timeout: Duration::from_secs(30),
        }
    }
}

/// Configuration for tracker announces.
#[derive(Debug, Clone)]
pub struct AnnounceConfig {
    /// First retry delay after a failed announce.
    pub initial_interval: Duration,
    /// Growth factor applied to the retry delay.
    pub multiplier: f64,
    /// Jitter applied to each retry delay, as a fraction of the delay.
    pub randomization: f64,
    /// Ceiling on the retry delay. Retries never stop.
    pub max_interval: Duration,
    /// Deadline for the stopped announce sent on shutdown.
    pub stop_event_timeout: Duration,
}

impl Default for AnnounceConfig {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_secs(5),
            multiplier: 2.0,
            randomization: 0.5,
            max_interval: Duration::from_secs(30 * 60),
            stop_event_timeout: Duration::from_secs(60),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.parallel_piece_downloads, 4);
        assert_eq!(config.parallel_piece_writes, 4);
        assert_eq!(config.unchoke_interval, Duration::from_secs(10));
        assert_eq!(config.optimistic_unchoke_interval, Duration::from_secs(30));
        assert_eq!(config.regular_unchoke_slots, 3);
    }

    #[test]
    fn default_announce_config() {
        let config = AnnounceConfig::default();
        assert_eq!(config.initial_interval, Duration::from_secs(5));
        assert_eq!(config.max_interval, Duration::from_secs(1800));
        assert_eq!(config.stop_event_timeout, Duration::from_secs(60));
    }
}
