//! Abstraction over the wire protocol spoken to one endpoint.
//!
//! Concrete gRPC implementation lives in `etcdkit_net::client`.

use etcdkit_common::{Endpoint, KeyValueRecord, TransportError};

/// Transport for single-endpoint KV RPCs.
///
/// Implementations report every failure as a [`TransportError`]; the
/// [`ClusterClient`](crate::ClusterClient) decides whether to fail over.
/// Timeouts are enforced by the caller, so implementations may block; the
/// caller reports each expired attempt through [`KvTransport::on_timeout`].
#[async_trait::async_trait]
pub trait KvTransport: Send + Sync + 'static {
    /// Write `value` under `key` on `endpoint`. Returns once the server acked.
    async fn put(&self, endpoint: &Endpoint, key: &[u8], value: &[u8])
        -> Result<(), TransportError>;

    /// Read `key` from `endpoint`. `Ok(None)` when the key does not exist.
    async fn get(
        &self,
        endpoint: &Endpoint,
        key: &[u8],
    ) -> Result<Option<KeyValueRecord>, TransportError>;

    /// An attempt against `endpoint` was abandoned after the per-attempt
    /// timeout. Connection state for that endpoint should be discarded.
    async fn on_timeout(&self, _endpoint: &Endpoint) {}

    /// Release any connections held for any endpoint.
    async fn close(&self) {}
}
