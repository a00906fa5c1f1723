/// Hub server configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port the HTTP/WebSocket server binds to.
    pub port: u16,
    /// Seconds a call may sit in `Ringing` before the sweeper ends it.
    pub ring_timeout_secs: u64,
}

impl Config {
    /// Load configuration from environment variables. Every setting has a
    /// default, so a bare environment works out of the box.
    pub fn from_env() -> Self {
        Self {
            port: std::env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5000),
            ring_timeout_secs: std::env::var("RING_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(45),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 5000,
            ring_timeout_secs: 45,
        }
    }
}
