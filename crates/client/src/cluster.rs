//! Cluster client: dispatches each call to one endpoint at a time, failing
//! over in ring order starting from the last endpoint that answered.
//!
//! Every attempt is bounded by the configured timeout, so the worst-case
//! latency of a call is `timeout * endpoints.len()`. Endpoints are tried
//! sequentially, never in parallel, so a write is only ever in flight on one
//! member at a time.

use crate::context::CallContext;
use crate::transport::KvTransport;
use etcdkit_common::{
    CancelReason, ClientError, Endpoint, EndpointFailure, KeyValueRecord, TransportError,
};
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Put,
    Get,
}

impl Op {
    fn as_str(self) -> &'static str {
        match self {
            Op::Put => "put",
            Op::Get => "get",
        }
    }
}

/// KV client over an ordered, non-empty set of cluster endpoints.
///
/// Safe to share between tasks (`Arc<ClusterClient<_>>`). The only mutable
/// state is the affinity index, a hint updated with relaxed atomics.
pub struct ClusterClient<T: KvTransport> {
    endpoints: Vec<Endpoint>,
    timeout: Duration,
    /// Index of the endpoint that most recently answered.
    affinity: AtomicUsize,
    transport: Arc<T>,
}

impl<T: KvTransport> std::fmt::Debug for ClusterClient<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClusterClient")
            .field("endpoints", &self.endpoints)
            .field("timeout", &self.timeout)
            .field("affinity", &self.affinity())
            .finish_non_exhaustive()
    }
}

impl<T: KvTransport> ClusterClient<T> {
    /// Build a client. Endpoint order is priority order.
    pub fn new(
        endpoints: Vec<Endpoint>,
        timeout: Duration,
        transport: Arc<T>,
    ) -> Result<Self, ClientError> {
        if endpoints.is_empty() {
            return Err(ClientError::Configuration(
                "at least one endpoint is required".into(),
            ));
        }
        if timeout.is_zero() {
            return Err(ClientError::Configuration("timeout must be > 0".into()));
        }
        Ok(Self {
            endpoints,
            timeout,
            affinity: AtomicUsize::new(0),
            transport,
        })
    }

    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }

    /// Per-attempt timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Index of the endpoint the next call will try first.
    pub fn affinity(&self) -> usize {
        self.affinity.load(Ordering::Relaxed)
    }

    pub fn preferred_endpoint(&self) -> &Endpoint {
        &self.endpoints[self.affinity()]
    }

    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    /// Write `value` under `key`.
    pub async fn put(&self, key: &[u8], value: &[u8]) -> Result<(), ClientError> {
        self.put_with(&CallContext::background(), key, value).await
    }

    /// Read `key`. `Ok(None)` when the store holds no such key.
    pub async fn get(&self, key: &[u8]) -> Result<Option<KeyValueRecord>, ClientError> {
        self.get_with(&CallContext::background(), key).await
    }

    /// [`put`](Self::put) under an external cancellation/deadline signal.
    pub async fn put_with(
        &self,
        ctx: &CallContext,
        key: &[u8],
        value: &[u8],
    ) -> Result<(), ClientError> {
        let key: Arc<[u8]> = Arc::from(key);
        let value: Arc<[u8]> = Arc::from(value);

        let result = self
            .dispatch(Op::Put, ctx, |transport, endpoint| {
                let key = Arc::clone(&key);
                let value = Arc::clone(&value);
                async move { transport.put(&endpoint, &key, &value).await }
            })
            .await;

        record_call(Op::Put, result.as_ref().map(|_| "ok"));
        result
    }

    /// [`get`](Self::get) under an external cancellation/deadline signal.
    pub async fn get_with(
        &self,
        ctx: &CallContext,
        key: &[u8],
    ) -> Result<Option<KeyValueRecord>, ClientError> {
        let key: Arc<[u8]> = Arc::from(key);

        let result = self
            .dispatch(Op::Get, ctx, |transport, endpoint| {
                let key = Arc::clone(&key);
                async move { transport.get(&endpoint, &key).await }
            })
            .await;

        record_call(
            Op::Get,
            result.as_ref().map(|found| match found {
                Some(_) => "ok",
                None => "not_found",
            }),
        );
        result
    }

    /// Drop every connection the transport holds. Later calls reconnect.
    pub async fn close(&self) {
        self.transport.close().await;
    }

    async fn dispatch<R, F, Fut>(
        &self,
        op: Op,
        ctx: &CallContext,
        attempt: F,
    ) -> Result<R, ClientError>
    where
        F: Fn(Arc<T>, Endpoint) -> Fut,
        Fut: Future<Output = Result<R, TransportError>>,
    {
        let _timer = etcdkit_metrics::start_call_timer(op.as_str());
        let m = etcdkit_metrics::metrics();

        if let Some(reason) = ctx.check() {
            return Err(ClientError::Cancelled(reason));
        }

        let n = self.endpoints.len();
        let start = self.affinity();
        let mut failures = Vec::new();

        for offset in 0..n {
            let index = (start + offset) % n;
            let endpoint = &self.endpoints[index];
            if offset > 0 {
                m.failovers.inc();
            }
            tracing::debug!(
                op = op.as_str(),
                %endpoint,
                attempt = offset + 1,
                "dispatching"
            );

            let in_flight = tokio::time::timeout(
                self.timeout,
                attempt(Arc::clone(&self.transport), endpoint.clone()),
            );

            // The attempt future is dropped (aborted) if cancellation wins.
            let outcome = tokio::select! {
                biased;
                reason = ctx.cancelled() => {
                    record_attempt(op, "cancelled");
                    tracing::debug!(op = op.as_str(), %endpoint, %reason, "call cancelled");
                    return Err(ClientError::Cancelled(reason));
                }
                outcome = in_flight => outcome,
            };

            let cause = match outcome {
                Ok(Ok(reply)) => {
                    record_attempt(op, "ok");
                    self.affinity.store(index, Ordering::Relaxed);
                    return Ok(reply);
                }
                Ok(Err(TransportError::Rejected(message))) => {
                    record_attempt(op, "rejected");
                    return Err(ClientError::Rejected {
                        endpoint: endpoint.clone(),
                        message,
                    });
                }
                Ok(Err(cause)) => {
                    record_attempt(op, "transport_error");
                    cause
                }
                Err(_elapsed) => {
                    record_attempt(op, "timeout");
                    self.transport.on_timeout(endpoint).await;
                    TransportError::Timeout(self.timeout)
                }
            };

            tracing::warn!(
                op = op.as_str(),
                %endpoint,
                error = %cause,
                remaining = n - offset - 1,
                "endpoint failed, failing over"
            );
            failures.push(EndpointFailure {
                endpoint: endpoint.clone(),
                cause,
            });
        }

        Err(ClientError::AllEndpointsUnreachable { failures })
    }
}

fn record_attempt(op: Op, outcome: &str) {
    etcdkit_metrics::metrics()
        .attempts
        .with_label_values(&[op.as_str(), outcome])
        .inc();
}

fn record_call(op: Op, result: Result<&str, &ClientError>) {
    let outcome = match result {
        Ok(outcome) => outcome,
        Err(ClientError::Configuration(_)) => "configuration",
        Err(ClientError::AllEndpointsUnreachable { .. }) => "unreachable",
        Err(ClientError::Cancelled(CancelReason::Signal)) => "cancelled",
        Err(ClientError::Cancelled(CancelReason::DeadlineExceeded)) => "deadline",
        Err(ClientError::Rejected { .. }) => "rejected",
    };
    etcdkit_metrics::metrics()
        .calls
        .with_label_values(&[op.as_str(), outcome])
        .inc();
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
