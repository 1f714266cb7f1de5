//! gRPC networking layer for etcdkit.
//!
//! Provides:
//! - `GrpcTransport`: implements `KvTransport` over tonic against the etcd v3 KV API
//! - `build_client`: assembles a `ClusterClient<GrpcTransport>` from a `ClientConfig`

pub mod client;
pub mod convert;

pub use client::GrpcTransport;

use etcdkit_client::ClusterClient;
use etcdkit_common::ClientError;
use etcdkit_config::ClientConfig;
use std::sync::Arc;

/// Build a cluster client over gRPC. Connections are dialled lazily on the
/// first call to each endpoint.
pub fn build_client(config: &ClientConfig) -> Result<ClusterClient<GrpcTransport>, ClientError> {
    let transport = Arc::new(GrpcTransport::new(config.connect_timeout()));
    ClusterClient::new(config.endpoints.clone(), config.timeout(), transport)
}
