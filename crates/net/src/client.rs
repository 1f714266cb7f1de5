//! gRPC client implementing `KvTransport`.
//!
//! `GrpcTransport` speaks the etcd v3 KV API over tonic and translates
//! between the wire messages and the `KeyValueRecord` / `TransportError`
//! domain types.

use crate::convert;
use etcdkit_client::KvTransport;
use etcdkit_common::{Endpoint, KeyValueRecord, Scheme, TransportError};
use etcdkit_proto::{KvClient, PutRequest, RangeRequest};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::Duration;
use tonic::transport::Channel;

/// A gRPC-based KV transport.
///
/// Maintains a pool of tonic channels, one per endpoint, creating new
/// connections on demand. A channel is evicted after any failover-class
/// error so the next attempt redials.
#[derive(Debug)]
pub struct GrpcTransport {
    connect_timeout: Duration,
    channels: Arc<RwLock<HashMap<Endpoint, Channel>>>,
}

impl GrpcTransport {
    pub fn new(connect_timeout: Duration) -> Self {
        Self {
            connect_timeout,
            channels: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    async fn get_channel(&self, endpoint: &Endpoint) -> Result<Channel, TransportError> {
        if endpoint.scheme() == Scheme::Https {
            return Err(TransportError::Unsupported(format!(
                "{}: TLS endpoints are not supported",
                endpoint
            )));
        }

        // Check cache first
        {
            let cache = self.channels.read().await;
            if let Some(channel) = cache.get(endpoint) {
                return Ok(channel.clone());
            }
        }

        // Create new connection
        let channel = Channel::from_shared(endpoint.uri())
            .map_err(|e| TransportError::Connect(format!("invalid endpoint: {}", e)))?
            .connect_timeout(self.connect_timeout)
            .connect()
            .await
            .map_err(|e| TransportError::Connect(error_chain(&e)))?;
        tracing::debug!(%endpoint, "connected");

        // Cache it
        {
            let mut cache = self.channels.write().await;
            cache.insert(endpoint.clone(), channel.clone());
        }

        Ok(channel)
    }

    /// Remove a cached channel (e.g., on connection failure).
    pub async fn invalidate(&self, endpoint: &Endpoint) {
        let mut cache = self.channels.write().await;
        cache.remove(endpoint);
    }

    /// Number of endpoints with an open channel.
    pub async fn cached_channels(&self) -> usize {
        self.channels.read().await.len()
    }

    async fn fail(&self, endpoint: &Endpoint, status: tonic::Status) -> TransportError {
        let err = convert::status_to_error(&status);
        if err.is_failover() {
            self.invalidate(endpoint).await;
        }
        err
    }
}

#[async_trait::async_trait]
impl KvTransport for GrpcTransport {
    async fn put(
        &self,
        endpoint: &Endpoint,
        key: &[u8],
        value: &[u8],
    ) -> Result<(), TransportError> {
        let _timer = etcdkit_metrics::start_rpc_timer("put");

        let channel = self.get_channel(endpoint).await?;
        let mut client = KvClient::new(channel);

        let request = PutRequest {
            key: key.to_vec(),
            value: value.to_vec(),
            ..Default::default()
        };
        match client.put(request).await {
            Ok(_) => Ok(()),
            Err(status) => Err(self.fail(endpoint, status).await),
        }
    }

    async fn get(
        &self,
        endpoint: &Endpoint,
        key: &[u8],
    ) -> Result<Option<KeyValueRecord>, TransportError> {
        let _timer = etcdkit_metrics::start_rpc_timer("range");

        let channel = self.get_channel(endpoint).await?;
        let mut client = KvClient::new(channel);

        match client.range(RangeRequest::single(key)).await {
            Ok(resp) => Ok(resp
                .into_inner()
                .kvs
                .into_iter()
                .next()
                .map(convert::record_from_proto)),
            Err(status) => Err(self.fail(endpoint, status).await),
        }
    }

    async fn on_timeout(&self, endpoint: &Endpoint) {
        tracing::debug!(%endpoint, "attempt timed out, dropping channel");
        self.invalidate(endpoint).await;
    }

    async fn close(&self) {
        let mut cache = self.channels.write().await;
        let n = cache.len();
        cache.clear();
        tracing::debug!("closed {} channel(s)", n);
    }
}

/// `tonic::transport::Error` only says "transport error"; the cause is in
/// its source chain.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut msg = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        msg.push_str(": ");
        msg.push_str(&cause.to_string());
        source = cause.source();
    }
    msg
}
