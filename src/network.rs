//! Network bring-up: wait until the API host resolves before taking prompts.

use crate::{Error, Result};
use std::net::SocketAddr;
use std::time::Duration;
use tokio_retry::{strategy::FixedInterval, Retry};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub interval: Duration,
    pub attempts: usize,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(500),
            attempts: 60,
        }
    }
}

/// Resolves `host:port`, retrying at a fixed interval. Returns the first
/// resolved address, or `Error::Network` once the attempts are exhausted.
pub async fn wait_for_network(host: &str, port: u16, policy: RetryPolicy) -> Result<SocketAddr> {
    info!("Waiting for network: resolving {}:{}", host, port);

    // FixedInterval yields the delays between attempts, so one fewer than
    // the attempt count.
    let strategy = FixedInterval::new(policy.interval).take(policy.attempts.saturating_sub(1));

    let addr = Retry::spawn(strategy, || async move {
        let mut addrs = tokio::net::lookup_host((host, port)).await.map_err(|e| {
            warn!("Network not ready: {}", e);
            Error::Network(format!("could not resolve {}: {}", host, e))
        })?;
        addrs
            .next()
            .ok_or_else(|| Error::Network(format!("no addresses for {}", host)))
    })
    .await?;

    info!("Network ready: {} resolved to {}", host, addr.ip());
    Ok(addr)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_resolves_ip_literal() {
        let addr = wait_for_network("127.0.0.1", 8080, RetryPolicy::default())
            .await
            .unwrap();
        assert_eq!(addr, "127.0.0.1:8080".parse().unwrap());
    }

    #[tokio::test]
    async fn test_gives_up_after_attempts() {
        let policy = RetryPolicy {
            interval: Duration::from_millis(1),
            attempts: 2,
        };

        let err = wait_for_network("host.invalid", 443, policy).await.unwrap_err();
        assert!(matches!(err, Error::Network(_)));
    }
}
