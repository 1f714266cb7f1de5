//! Unary gRPC client for the etcd KV service.

use crate::kv::{PutRequest, PutResponse, RangeRequest, RangeResponse};
use crate::{PUT_PATH, RANGE_PATH};
use tonic::codegen::http::uri::PathAndQuery;
use tonic::transport::Channel;

/// Thin client over one tonic `Channel`, equivalent to what `tonic-build`
/// would generate for the `Put` and `Range` methods.
#[derive(Debug, Clone)]
pub struct KvClient {
    inner: tonic::client::Grpc<Channel>,
}

impl KvClient {
    pub fn new(channel: Channel) -> Self {
        Self {
            inner: tonic::client::Grpc::new(channel),
        }
    }

    pub async fn put(
        &mut self,
        request: PutRequest,
    ) -> Result<tonic::Response<PutResponse>, tonic::Status> {
        self.unary(request, PUT_PATH).await
    }

    pub async fn range(
        &mut self,
        request: RangeRequest,
    ) -> Result<tonic::Response<RangeResponse>, tonic::Status> {
        self.unary(request, RANGE_PATH).await
    }

    async fn unary<Req, Resp>(
        &mut self,
        request: Req,
        path: &'static str,
    ) -> Result<tonic::Response<Resp>, tonic::Status>
    where
        Req: prost::Message + Send + Sync + 'static,
        Resp: prost::Message + Default + Send + Sync + 'static,
    {
        self.inner.ready().await.map_err(|e| {
            tonic::Status::unavailable(format!("service was not ready: {}", e))
        })?;
        let codec = tonic::codec::ProstCodec::<Req, Resp>::default();
        self.inner
            .unary(
                tonic::Request::new(request),
                PathAndQuery::from_static(path),
                codec,
            )
            .await
    }
}
