use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpStream;
use tracing::debug;

use crate::config::SyncConfig;

/// Answers "is the remote worth trying right now?".
///
/// A `false` sends the sync straight to the bundled snapshot. A `true` is a
/// hint only: the fetch itself may still fail and fall back.
#[async_trait]
pub trait ConnectivityProbe: Send + Sync {
    async fn is_reachable(&self) -> bool;
}

/// Opens (and immediately drops) a TCP connection to the snapshot host.
#[derive(Debug, Clone)]
pub struct TcpProbe {
    host: String,
    port: u16,
    timeout: Duration,
}

impl TcpProbe {
    pub fn new(host: impl Into<String>, port: u16, timeout: Duration) -> Self {
        Self {
            host: host.into(),
            port,
            timeout,
        }
    }

    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(&config.probe_host, config.probe_port, config.probe_timeout())
    }
}

#[async_trait]
impl ConnectivityProbe for TcpProbe {
    async fn is_reachable(&self) -> bool {
        let addr = (self.host.as_str(), self.port);
        match tokio::time::timeout(self.timeout, TcpStream::connect(addr)).await {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                debug!(host = %self.host, port = self.port, error = %e, "probe connect failed");
                false
            }
            Err(_) => {
                debug!(host = %self.host, port = self.port, "probe timed out");
                false
            }
        }
    }
}

/// A probe with a fixed answer. Used for `--offline` and in tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedProbe(pub bool);

impl FixedProbe {
    pub fn online() -> Self {
        Self(true)
    }

    pub fn offline() -> Self {
        Self(false)
    }
}

#[async_trait]
impl ConnectivityProbe for FixedProbe {
    async fn is_reachable(&self) -> bool {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use tokio::net::TcpListener;

    use super::*;

    #[tokio::test]
    async fn test_tcp_probe_reaches_local_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let probe = TcpProbe::new("127.0.0.1", port, Duration::from_secs(1));
        assert!(probe.is_reachable().await);
    }

    #[tokio::test]
    async fn test_tcp_probe_closed_port() {
        // Bind then drop to get a port nothing listens on.
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };

        let probe = TcpProbe::new("127.0.0.1", port, Duration::from_secs(1));
        assert!(!probe.is_reachable().await);
    }

    #[tokio::test]
    async fn test_fixed_probe() {
        assert!(FixedProbe::online().is_reachable().await);
        assert!(!FixedProbe::offline().is_reachable().await);
    }

    #[test]
    fn test_from_config() {
        let cfg = SyncConfig::default();
        let probe = TcpProbe::from_config(&cfg);
        assert_eq!(probe.port, 443);
        assert_eq!(probe.timeout, Duration::from_millis(3000));
    }
}
