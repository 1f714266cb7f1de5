//! etcd v3 KV wire types and gRPC plumbing.
//!
//! Messages are declared with `prost` derives using the field numbers of
//! etcd's `etcdserverpb` and `mvccpb` packages, so no protoc step is needed.
//! Only the subset of the KV service used by etcdkit is modelled.

pub mod client;
pub mod kv;
pub mod server;

pub use client::KvClient;
pub use kv::{KeyValue, PutRequest, PutResponse, RangeRequest, RangeResponse, ResponseHeader};
pub use server::{Kv, KvServer};

/// Fully qualified gRPC service name of the etcd KV service.
pub const KV_SERVICE: &str = "etcdserverpb.KV";

/// Method path for `KV.Put`.
pub const PUT_PATH: &str = "/etcdserverpb.KV/Put";

/// Method path for `KV.Range`.
pub const RANGE_PATH: &str = "/etcdserverpb.KV/Range";
