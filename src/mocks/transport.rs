//! Mock transport for testing.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream;
use futures::StreamExt;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::errors::{DifyError, DifyResult};
use crate::transport::{ByteStream, HttpTransport};

/// A recorded request for verification.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// Request path.
    pub path: String,
    /// Request body.
    pub body: Vec<u8>,
}

/// A scripted reply for one request.
#[derive(Debug)]
pub enum MockReply {
    /// Full body for a blocking request (also usable as a one-chunk stream).
    Body(Bytes),
    /// Byte chunks for a streaming request, delivered one per poll.
    Chunks(Vec<Bytes>),
    /// Byte chunks followed by a stream that never yields again, for
    /// cancellation tests.
    ChunksThenPending(Vec<Bytes>),
    /// Transport-level failure.
    Error(DifyError),
}

/// Mock transport with scripted replies and request recording.
#[derive(Default)]
pub struct MockTransport {
    replies: Mutex<VecDeque<MockReply>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl MockTransport {
    /// Creates a new mock transport with no scripted replies.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueues a reply for the next request.
    pub fn enqueue(&self, reply: MockReply) {
        self.replies.lock().unwrap().push_back(reply);
    }

    /// Returns the number of requests received.
    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Returns a recorded request by index.
    ///
    /// # Panics
    ///
    /// Panics if no request with that index was recorded.
    pub fn request(&self, index: usize) -> RecordedRequest {
        self.requests.lock().unwrap()[index].clone()
    }

    fn record(&self, path: &str, body: &[u8]) {
        self.requests.lock().unwrap().push(RecordedRequest {
            path: path.to_string(),
            body: body.to_vec(),
        });
    }

    fn next_reply(&self) -> DifyResult<MockReply> {
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| DifyError::Stream {
                message: "mock transport: no scripted reply".to_string(),
            })
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn post(&self, path: &str, body: Vec<u8>) -> DifyResult<Bytes> {
        self.record(path, &body);
        match self.next_reply()? {
            MockReply::Body(bytes) => Ok(bytes),
            MockReply::Chunks(chunks) | MockReply::ChunksThenPending(chunks) => {
                Ok(Bytes::from(chunks.concat()))
            }
            MockReply::Error(error) => Err(error),
        }
    }

    async fn post_stream(&self, path: &str, body: Vec<u8>) -> DifyResult<ByteStream> {
        self.record(path, &body);
        match self.next_reply()? {
            MockReply::Body(bytes) => Ok(Box::pin(stream::iter(vec![Ok(bytes)]))),
            MockReply::Chunks(chunks) => {
                Ok(Box::pin(stream::iter(chunks.into_iter().map(Ok))))
            }
            MockReply::ChunksThenPending(chunks) => Ok(Box::pin(
                stream::iter(chunks.into_iter().map(Ok)).chain(stream::pending()),
            )),
            MockReply::Error(error) => Err(error),
        }
    }
}
