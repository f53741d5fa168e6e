// ABOUTME: Reachability probing for configured proxies.
// ABOUTME: Defines the Probe trait and an HTTP implementation backed by reqwest.

use async_trait::async_trait;
use std::time::Duration;

/// Answers whether a target URL is reachable through a candidate proxy.
#[async_trait]
pub trait Probe: Send + Sync {
    async fn probe(&self, proxy_url: &str, target_url: &str) -> bool;
}

/// One GET through the proxy with a short timeout. Any response counts as
/// reachable; transport-level failure counts as unreachable.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    timeout: Duration,
}

impl Default for HttpProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpProbe {
    pub fn new() -> Self {
        Self {
            timeout: Duration::from_secs(10),
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl Probe for HttpProbe {
    async fn probe(&self, proxy_url: &str, target_url: &str) -> bool {
        let Ok(proxy) = reqwest::Proxy::all(proxy_url) else {
            tracing::debug!("invalid proxy url: {}", proxy_url);
            return false;
        };
        let Ok(client) = reqwest::Client::builder()
            .proxy(proxy)
            .timeout(self.timeout)
            .build()
        else {
            return false;
        };

        match client.get(target_url).send().await {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!("probe through {} failed: {}", proxy_url, e);
                false
            }
        }
    }
}
