//! KV messages (`etcdserverpb.PutRequest`, `etcdserverpb.RangeRequest`, ...).

/// `etcdserverpb.ResponseHeader`.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ResponseHeader {
    #[prost(uint64, tag = "1")]
    pub cluster_id: u64,
    #[prost(uint64, tag = "2")]
    pub member_id: u64,
    #[prost(int64, tag = "3")]
    pub revision: i64,
    #[prost(uint64, tag = "4")]
    pub raft_term: u64,
}

/// `mvccpb.KeyValue`.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct KeyValue {
    #[prost(bytes = "vec", tag = "1")]
    pub key: Vec<u8>,
    #[prost(int64, tag = "2")]
    pub create_revision: i64,
    #[prost(int64, tag = "3")]
    pub mod_revision: i64,
    #[prost(int64, tag = "4")]
    pub version: i64,
    #[prost(bytes = "vec", tag = "5")]
    pub value: Vec<u8>,
    #[prost(int64, tag = "6")]
    pub lease: i64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PutRequest {
    #[prost(bytes = "vec", tag = "1")]
    pub key: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub value: Vec<u8>,
    #[prost(int64, tag = "3")]
    pub lease: i64,
    #[prost(bool, tag = "4")]
    pub prev_kv: bool,
    #[prost(bool, tag = "5")]
    pub ignore_value: bool,
    #[prost(bool, tag = "6")]
    pub ignore_lease: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PutResponse {
    #[prost(message, optional, tag = "1")]
    pub header: Option<ResponseHeader>,
    #[prost(message, optional, tag = "2")]
    pub prev_kv: Option<KeyValue>,
}

/// `etcdserverpb.RangeRequest`. Sort enums are carried as raw `int32`.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RangeRequest {
    #[prost(bytes = "vec", tag = "1")]
    pub key: Vec<u8>,
    /// Empty means "exactly `key`".
    #[prost(bytes = "vec", tag = "2")]
    pub range_end: Vec<u8>,
    #[prost(int64, tag = "3")]
    pub limit: i64,
    #[prost(int64, tag = "4")]
    pub revision: i64,
    #[prost(int32, tag = "5")]
    pub sort_order: i32,
    #[prost(int32, tag = "6")]
    pub sort_target: i32,
    #[prost(bool, tag = "7")]
    pub serializable: bool,
    #[prost(bool, tag = "8")]
    pub keys_only: bool,
    #[prost(bool, tag = "9")]
    pub count_only: bool,
}

impl RangeRequest {
    /// Request for exactly one key, linearizable read.
    pub fn single(key: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            limit: 1,
            ..Default::default()
        }
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RangeResponse {
    #[prost(message, optional, tag = "1")]
    pub header: Option<ResponseHeader>,
    #[prost(message, repeated, tag = "2")]
    pub kvs: Vec<KeyValue>,
    #[prost(bool, tag = "3")]
    pub more: bool,
    #[prost(int64, tag = "4")]
    pub count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost::Message;

    #[test]
    fn test_put_request_field_numbers() {
        let req = PutRequest {
            key: b"k".to_vec(),
            value: b"v".to_vec(),
            ..Default::default()
        };
        // field 1 (len-delimited) = "k", field 2 (len-delimited) = "v"
        assert_eq!(req.encode_to_vec(), vec![0x0a, 1, b'k', 0x12, 1, b'v']);
    }

    #[test]
    fn test_single_range_request() {
        let req = RangeRequest::single("cluster_key");
        assert!(req.range_end.is_empty());
        assert_eq!(req.limit, 1);
        assert!(!req.serializable);

        let bytes = req.encode_to_vec();
        // limit is field 3 varint: tag byte 0x18
        assert_eq!(&bytes[bytes.len() - 2..], &[0x18, 1]);
    }

    #[test]
    fn test_range_response_decodes_kvs() {
        let resp = RangeResponse {
            header: Some(ResponseHeader {
                revision: 7,
                ..Default::default()
            }),
            kvs: vec![KeyValue {
                key: b"test_key".to_vec(),
                value: b"Hello from single node!".to_vec(),
                create_revision: 5,
                mod_revision: 7,
                version: 2,
                lease: 0,
            }],
            more: false,
            count: 1,
        };
        let decoded = RangeResponse::decode(resp.encode_to_vec().as_slice()).unwrap();
        assert_eq!(decoded.kvs.len(), 1);
        assert_eq!(decoded.kvs[0].value, b"Hello from single node!");
        assert_eq!(decoded.kvs[0].mod_revision, 7);
        assert_eq!(decoded.header.unwrap().revision, 7);
    }

    #[test]
    fn test_unknown_fields_are_skipped() {
        // RangeRequest with min_mod_revision (field 10) set, which we do not model.
        let mut bytes = RangeRequest::single("k").encode_to_vec();
        bytes.extend_from_slice(&[0x50, 0x05]);
        let decoded = RangeRequest::decode(bytes.as_slice()).unwrap();
        assert_eq!(decoded.key, b"k");
    }
}
