//! Conversions between etcd wire types and etcdkit domain types.

use etcdkit_common::{KeyValueRecord, TransportError};
use etcdkit_proto::KeyValue;
use tonic::Code;

pub fn record_from_proto(kv: KeyValue) -> KeyValueRecord {
    KeyValueRecord {
        key: kv.key,
        value: kv.value,
        create_revision: kv.create_revision,
        mod_revision: kv.mod_revision,
        version: kv.version,
    }
}

/// Classify a gRPC status.
///
/// Codes that mean "this member could not serve the request" become
/// failover-class errors; anything else the server decided on is a
/// rejection that another member would repeat.
pub fn status_to_error(status: &tonic::Status) -> TransportError {
    match status.code() {
        Code::Unavailable | Code::DeadlineExceeded | Code::Unknown | Code::Cancelled => {
            TransportError::Unavailable(format!("{:?}: {}", status.code(), status.message()))
        }
        code => TransportError::Rejected(format!("{:?}: {}", code, status.message())),
    }
}
