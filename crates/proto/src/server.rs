//! Server-side adapter for the etcd KV service.
//!
//! [`KvServer`] routes `Put` and `Range` calls to any [`Kv`] implementation
//! and can be mounted on a `tonic::transport::Server`. Used to stand up
//! etcd-compatible endpoints in integration tests.

use crate::kv::{PutRequest, PutResponse, RangeRequest, RangeResponse};
use crate::{KV_SERVICE, PUT_PATH, RANGE_PATH};
use std::convert::Infallible;
use std::sync::Arc;
use std::task::{Context, Poll};
use tonic::body::BoxBody;
use tonic::codec::ProstCodec;
use tonic::codegen::{http, Body, BoxFuture, StdError};
use tonic::{Request, Response, Status};

/// Handler for the KV methods served by [`KvServer`].
#[tonic::async_trait]
pub trait Kv: Send + Sync + 'static {
    async fn put(&self, request: Request<PutRequest>) -> Result<Response<PutResponse>, Status>;

    async fn range(&self, request: Request<RangeRequest>)
        -> Result<Response<RangeResponse>, Status>;
}

#[derive(Debug)]
pub struct KvServer<T> {
    inner: Arc<T>,
}

impl<T> KvServer<T> {
    pub fn new(inner: T) -> Self {
        Self::from_arc(Arc::new(inner))
    }

    pub fn from_arc(inner: Arc<T>) -> Self {
        Self { inner }
    }
}

impl<T> Clone for KvServer<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> tonic::server::NamedService for KvServer<T> {
    const NAME: &'static str = KV_SERVICE;
}

struct PutSvc<T>(Arc<T>);

impl<T: Kv> tonic::server::UnaryService<PutRequest> for PutSvc<T> {
    type Response = PutResponse;
    type Future = BoxFuture<Response<PutResponse>, Status>;

    fn call(&mut self, request: Request<PutRequest>) -> Self::Future {
        let inner = Arc::clone(&self.0);
        Box::pin(async move { inner.put(request).await })
    }
}

struct RangeSvc<T>(Arc<T>);

impl<T: Kv> tonic::server::UnaryService<RangeRequest> for RangeSvc<T> {
    type Response = RangeResponse;
    type Future = BoxFuture<Response<RangeResponse>, Status>;

    fn call(&mut self, request: Request<RangeRequest>) -> Self::Future {
        let inner = Arc::clone(&self.0);
        Box::pin(async move { inner.range(request).await })
    }
}

impl<T, B> tonic::codegen::Service<http::Request<B>> for KvServer<T>
where
    T: Kv,
    B: Body + Send + 'static,
    B::Error: Into<StdError> + Send + 'static,
{
    type Response = http::Response<BoxBody>;
    type Error = Infallible;
    type Future = BoxFuture<Self::Response, Self::Error>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: http::Request<B>) -> Self::Future {
        let inner = Arc::clone(&self.inner);
        match req.uri().path() {
            PUT_PATH => Box::pin(async move {
                let mut grpc = tonic::server::Grpc::new(ProstCodec::<PutResponse, PutRequest>::default());
                Ok(grpc.unary(PutSvc(inner), req).await)
            }),
            RANGE_PATH => Box::pin(async move {
                let mut grpc =
                    tonic::server::Grpc::new(ProstCodec::<RangeResponse, RangeRequest>::default());
                Ok(grpc.unary(RangeSvc(inner), req).await)
            }),
            other => {
                let status = Status::unimplemented(format!("unknown method: {}", other));
                Box::pin(async move { Ok(status.into_http()) })
            }
        }
    }
}
