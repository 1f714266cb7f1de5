//! Cluster-aware key-value client.
//!
//! Provides: the `KvTransport` seam, `ClusterClient` (ordered failover from
//! the last endpoint that answered, per-attempt timeouts, cancellation), and
//! transports for testing (`MemTransport`, `ChaosTransport`).

pub mod chaos;
pub mod cluster;
pub mod context;
pub mod memory;
pub mod transport;

pub use cluster::ClusterClient;
pub use context::{CallContext, CancelHandle};
pub use transport::KvTransport;

pub use etcdkit_common::{
    CancelReason, ClientError, Endpoint, EndpointFailure, KeyValueRecord, TransportError,
};
