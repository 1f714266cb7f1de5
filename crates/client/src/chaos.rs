//! Chaos injection wrapper for [`KvTransport`].
//!
//! [`ChaosTransport`] wraps any `T: KvTransport` and injects configurable
//! failures: per-endpoint faults (down, hung, rejecting), random errors and
//! latency. It also counts attempts per endpoint so tests can assert which
//! members a call touched.

use crate::transport::KvTransport;
use etcdkit_common::{Endpoint, KeyValueRecord, TransportError};
use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::Duration;

/// Configuration for random chaos injection.
#[derive(Debug, Clone)]
pub struct ChaosConfig {
    /// Probability of returning an error \[0.0, 1.0\].
    pub failure_rate: f64,
    /// Fixed latency injected before forwarding.
    pub latency: Duration,
    /// Random additional latency in \[0, jitter\].
    pub jitter: Duration,
}

impl Default for ChaosConfig {
    fn default() -> Self {
        Self {
            failure_rate: 0.0,
            latency: Duration::ZERO,
            jitter: Duration::ZERO,
        }
    }
}

/// A fault pinned to one endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    /// Connection refused.
    Down,
    /// Accepts the request and never answers.
    Hang,
    /// Answers with a server-side rejection.
    Reject(String),
}

/// A [`KvTransport`] wrapper that injects chaos.
pub struct ChaosTransport<T: KvTransport> {
    inner: Arc<T>,
    config: Arc<RwLock<ChaosConfig>>,
    faults: Arc<RwLock<HashMap<Endpoint, Fault>>>,
    attempts: Arc<RwLock<HashMap<Endpoint, usize>>>,
    timeouts: Arc<RwLock<HashMap<Endpoint, usize>>>,
}

impl<T: KvTransport> std::fmt::Debug for ChaosTransport<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChaosTransport").finish_non_exhaustive()
    }
}

impl<T: KvTransport> ChaosTransport<T> {
    pub fn new(inner: T, config: ChaosConfig) -> Self {
        Self {
            inner: Arc::new(inner),
            config: Arc::new(RwLock::new(config)),
            faults: Arc::new(RwLock::new(HashMap::new())),
            attempts: Arc::new(RwLock::new(HashMap::new())),
            timeouts: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn inner(&self) -> &Arc<T> {
        &self.inner
    }

    /// Pin a fault to an endpoint until cleared.
    pub async fn set_fault(&self, endpoint: &Endpoint, fault: Fault) {
        self.faults.write().await.insert(endpoint.clone(), fault);
    }

    pub async fn clear_fault(&self, endpoint: &Endpoint) {
        self.faults.write().await.remove(endpoint);
    }

    /// Mark an endpoint as refusing connections (until recovered).
    pub async fn fail_endpoint(&self, endpoint: &Endpoint) {
        self.set_fault(endpoint, Fault::Down).await;
    }

    pub async fn recover_endpoint(&self, endpoint: &Endpoint) {
        self.clear_fault(endpoint).await;
    }

    /// Make an endpoint accept requests and never answer (until recovered).
    pub async fn hang_endpoint(&self, endpoint: &Endpoint) {
        self.set_fault(endpoint, Fault::Hang).await;
    }

    /// Dynamically update the random failure rate.
    pub async fn set_failure_rate(&self, rate: f64) {
        self.config.write().await.failure_rate = rate;
    }

    /// Number of requests that reached this wrapper for `endpoint`.
    pub async fn attempts(&self, endpoint: &Endpoint) -> usize {
        self.attempts.read().await.get(endpoint).copied().unwrap_or(0)
    }

    /// Number of attempts on `endpoint` the caller abandoned on timeout.
    pub async fn timeouts(&self, endpoint: &Endpoint) -> usize {
        self.timeouts.read().await.get(endpoint).copied().unwrap_or(0)
    }

    /// Apply chaos checks: returns Err if the request should fail.
    async fn maybe_fail(&self, endpoint: &Endpoint) -> Result<(), TransportError> {
        *self
            .attempts
            .write()
            .await
            .entry(endpoint.clone())
            .or_insert(0) += 1;

        let fault = self.faults.read().await.get(endpoint).cloned();
        match fault {
            Some(Fault::Down) => {
                return Err(TransportError::Connect(
                    "chaos: endpoint marked as failed".into(),
                ))
            }
            Some(Fault::Hang) => std::future::pending::<()>().await,
            Some(Fault::Reject(message)) => return Err(TransportError::Rejected(message)),
            None => {}
        }

        // Read config
        let (delay, failure_rate) = {
            let config = self.config.read().await;
            let jitter_ms = if config.jitter.is_zero() {
                0
            } else {
                rand::thread_rng().gen_range(0..=config.jitter.as_millis() as u64)
            };
            let delay = config.latency + Duration::from_millis(jitter_ms);
            (delay, config.failure_rate)
        };

        // Inject latency
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        // Random failure
        if failure_rate > 0.0 && rand::thread_rng().gen_bool(failure_rate.min(1.0)) {
            return Err(TransportError::Unavailable("chaos: random failure".into()));
        }

        Ok(())
    }
}

#[async_trait::async_trait]
impl<T: KvTransport> KvTransport for ChaosTransport<T> {
    async fn put(
        &self,
        endpoint: &Endpoint,
        key: &[u8],
        value: &[u8],
    ) -> Result<(), TransportError> {
        self.maybe_fail(endpoint).await?;
        self.inner.put(endpoint, key, value).await
    }

    async fn get(
        &self,
        endpoint: &Endpoint,
        key: &[u8],
    ) -> Result<Option<KeyValueRecord>, TransportError> {
        self.maybe_fail(endpoint).await?;
        self.inner.get(endpoint, key).await
    }

    async fn on_timeout(&self, endpoint: &Endpoint) {
        *self
            .timeouts
            .write()
            .await
            .entry(endpoint.clone())
            .or_insert(0) += 1;
        self.inner.on_timeout(endpoint).await;
    }

    async fn close(&self) {
        self.inner.close().await;
    }
}

// ────────────────────────── Tests ──────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    struct OkTransport;

    #[async_trait::async_trait]
    impl KvTransport for OkTransport {
        async fn put(
            &self,
            _endpoint: &Endpoint,
            _key: &[u8],
            _value: &[u8],
        ) -> Result<(), TransportError> {
            Ok(())
        }

        async fn get(
            &self,
            _endpoint: &Endpoint,
            _key: &[u8],
        ) -> Result<Option<KeyValueRecord>, TransportError> {
            Ok(None)
        }
    }

    fn endpoint(name: &str) -> Endpoint {
        Endpoint::http(name, 2379).unwrap()
    }

    #[tokio::test]
    async fn test_chaos_passthrough() {
        let chaos = ChaosTransport::new(OkTransport, ChaosConfig::default());
        let ep = endpoint("node1");
        assert!(chaos.put(&ep, b"key", b"val").await.is_ok());
        assert!(chaos.get(&ep, b"key").await.is_ok());
        assert_eq!(chaos.attempts(&ep).await, 2);
    }

    #[tokio::test]
    async fn test_chaos_fail_endpoint() {
        let chaos = ChaosTransport::new(OkTransport, ChaosConfig::default());
        let ep = endpoint("node1");

        chaos.fail_endpoint(&ep).await;
        assert!(matches!(
            chaos.put(&ep, b"key", b"val").await,
            Err(TransportError::Connect(_))
        ));
        assert!(chaos.get(&ep, b"key").await.is_err());

        // Other endpoints still work
        let ep2 = endpoint("node2");
        assert!(chaos.put(&ep2, b"key", b"val").await.is_ok());
    }

    #[tokio::test]
    async fn test_chaos_recover_endpoint() {
        let chaos = ChaosTransport::new(OkTransport, ChaosConfig::default());
        let ep = endpoint("node1");

        chaos.fail_endpoint(&ep).await;
        assert!(chaos.put(&ep, b"key", b"val").await.is_err());

        chaos.recover_endpoint(&ep).await;
        assert!(chaos.put(&ep, b"key", b"val").await.is_ok());
    }

    #[tokio::test]
    async fn test_chaos_hang_never_answers() {
        let chaos = ChaosTransport::new(OkTransport, ChaosConfig::default());
        let ep = endpoint("node1");
        chaos.set_fault(&ep, Fault::Hang).await;

        let waited =
            tokio::time::timeout(Duration::from_millis(20), chaos.get(&ep, b"key")).await;
        assert!(waited.is_err());
        assert_eq!(chaos.attempts(&ep).await, 1);
    }

    #[tokio::test]
    async fn test_chaos_reject() {
        let chaos = ChaosTransport::new(OkTransport, ChaosConfig::default());
        let ep = endpoint("node1");
        chaos
            .set_fault(&ep, Fault::Reject("etcdserver: permission denied".into()))
            .await;
        let err = chaos.put(&ep, b"key", b"val").await.unwrap_err();
        assert!(!err.is_failover());
    }

    #[tokio::test]
    async fn test_chaos_random_failure() {
        let config = ChaosConfig {
            failure_rate: 1.0,
            ..Default::default()
        };
        let chaos = ChaosTransport::new(OkTransport, config);
        let ep = endpoint("node1");

        for _ in 0..10 {
            assert!(chaos.put(&ep, b"key", b"val").await.is_err());
        }

        // Set back to 0
        chaos.set_failure_rate(0.0).await;
        assert!(chaos.put(&ep, b"key", b"val").await.is_ok());
    }
}
