//! Runtime configuration resolved from the environment.

use std::net::SocketAddr;

/// Engine and server settings.
///
/// Defaults resolve from the environment (a `.env` file is honored):
///
/// - `LOOMFLOW_BIND_ADDR`: server bind address (default `127.0.0.1:7860`)
/// - `LOOMFLOW_LOG_BUILDS`: master switch for build-cache writes
///   (default `true`; per-request `log_builds` can only narrow it)
#[derive(Clone, Debug)]
pub struct RuntimeConfig {
    pub bind_addr: SocketAddr,
    pub log_builds: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        dotenvy::dotenv().ok();
        let bind_addr = std::env::var("LOOMFLOW_BIND_ADDR")
            .ok()
            .and_then(|raw| raw.parse().ok())
            .unwrap_or_else(|| "127.0.0.1:7860".parse().expect("default addr parses"));
        let log_builds = std::env::var("LOOMFLOW_LOG_BUILDS")
            .map(|raw| raw != "false" && raw != "0")
            .unwrap_or(true);
        Self {
            bind_addr,
            log_builds,
        }
    }
}

impl RuntimeConfig {
    #[must_use]
    pub fn with_bind_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    #[must_use]
    pub fn with_log_builds(mut self, log_builds: bool) -> Self {
        self.log_builds = log_builds;
        self
    }
}
