//! HTTP transport module for the Dify client.
//!
//! Provides the HTTP layer for API requests: single JSON POSTs for blocking
//! calls and raw byte streams for streaming calls. SSE framing is not done
//! here — the response pipeline owns the line buffer and accumulator, so the
//! transport must hand chunk boundaries through untouched.

mod http_transport;

pub use http_transport::{HttpTransport, ReqwestTransport, TransportConfig};

use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;

use crate::errors::DifyResult;

/// Byte stream type for streaming response bodies.
pub type ByteStream = Pin<Box<dyn Stream<Item = DifyResult<Bytes>> + Send>>;

#[async_trait::async_trait]
impl<T: HttpTransport + ?Sized> HttpTransport for &T {
    async fn post(&self, path: &str, body: Vec<u8>) -> DifyResult<Bytes> {
        (**self).post(path, body).await
    }

    async fn post_stream(&self, path: &str, body: Vec<u8>) -> DifyResult<ByteStream> {
        (**self).post_stream(path, body).await
    }
}

#[async_trait::async_trait]
impl<T: HttpTransport + ?Sized> HttpTransport for std::sync::Arc<T> {
    async fn post(&self, path: &str, body: Vec<u8>) -> DifyResult<Bytes> {
        (**self).post(path, body).await
    }

    async fn post_stream(&self, path: &str, body: Vec<u8>) -> DifyResult<ByteStream> {
        (**self).post_stream(path, body).await
    }
}
