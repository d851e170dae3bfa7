use std::time::Duration;

/// Room server settings, injected at room creation
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    /// Address the UDP socket binds to
    pub bind_addr: String,
    /// Maximum number of concurrently joined sessions
    pub max_clients: usize,
    /// How often a changed state snapshot is replicated to clients
    pub patch_interval: Duration,
    /// Silence after which a session is dropped
    pub client_timeout: Duration,
}

impl ServerConfig {
    pub const DEFAULT_BIND_ADDR: &'static str = "127.0.0.1:2567";
    pub const DEFAULT_MAX_CLIENTS: usize = 16;
    pub const DEFAULT_PATCH_RATE: u32 = 20;
    pub const DEFAULT_CLIENT_TIMEOUT_SECS: u64 = 10;

    pub fn new(max_clients: usize, patch_rate: u32, client_timeout_secs: u64) -> Self {
        Self {
            bind_addr: Self::DEFAULT_BIND_ADDR.to_string(),
            max_clients,
            patch_interval: Self::patch_interval_for(patch_rate),
            client_timeout: Duration::from_secs(client_timeout_secs),
        }
    }

    pub fn with_bind_addr(mut self, bind_addr: impl Into<String>) -> Self {
        self.bind_addr = bind_addr.into();
        self
    }

    // A zero rate is treated as one tick per second
    fn patch_interval_for(patch_rate: u32) -> Duration {
        Duration::from_secs_f64(1.0 / patch_rate.max(1) as f64)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new(
            Self::DEFAULT_MAX_CLIENTS,
            Self::DEFAULT_PATCH_RATE,
            Self::DEFAULT_CLIENT_TIMEOUT_SECS,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr, "127.0.0.1:2567");
        assert_eq!(config.max_clients, 16);
        assert_eq!(config.patch_interval, Duration::from_millis(50));
        assert_eq!(config.client_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_patch_interval_from_rate() {
        let config = ServerConfig::new(4, 10, 1);
        assert_eq!(config.patch_interval, Duration::from_millis(100));

        let config = ServerConfig::new(4, 0, 1);
        assert_eq!(config.patch_interval, Duration::from_secs(1));
    }

    #[test]
    fn test_bind_addr_override() {
        let config = ServerConfig::new(4, 10, 1).with_bind_addr("0.0.0.0:9000");
        assert_eq!(config.bind_addr, "0.0.0.0:9000");
        assert_eq!(config.max_clients, 4);
    }
}
