use std::time::Duration;

use swap_proto::ProtocolVersion;

/// Engine-wide tunables.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// How long a counterparty has to deliver a Complete after we accept.
    pub completion_ttl: Duration,
    /// How often the expiry watchdog sweeps for overdue trades.
    pub watchdog_poll_interval: Duration,
    /// Wire schema used for outbound messages.
    pub protocol_version: ProtocolVersion,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            completion_ttl: Duration::from_secs(600),
            watchdog_poll_interval: Duration::from_secs(5),
            protocol_version: ProtocolVersion::V1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.completion_ttl, Duration::from_secs(600));
        assert_eq!(cfg.watchdog_poll_interval, Duration::from_secs(5));
        assert_eq!(cfg.protocol_version, ProtocolVersion::V1);
    }
}
