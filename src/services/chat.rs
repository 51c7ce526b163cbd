//! Chat message service: the streaming response pipeline.
//!
//! Drives one `chat-messages` request and reports everything through the
//! caller's [`ChatHandler`]. Three ordering guarantees hold for every call:
//! `on_message` fires in exact wire order; `on_geo_json_detected`, when it
//! fires, comes after the last `on_message` and before `on_completed`; and
//! exactly one of `on_completed`/`on_error` fires, never both.

use std::future::Future;

use async_trait::async_trait;
use futures::StreamExt;

use crate::config::DifyConfig;
use crate::errors::{DifyError, DifyResult};
use crate::geo::{extract_geo_payload, GeoPayload};
use crate::streaming::{SseLineDecoder, StreamEvent};
use crate::transport::HttpTransport;
use crate::types::chat::{BlockingChatResponse, ChatOptions, ChatRequest, ResponseMode};

/// Endpoint path for chat messages.
pub const CHAT_MESSAGES_PATH: &str = "/v1/chat-messages";

/// Receiver for the outcomes of one chat request.
///
/// All methods default to no-ops so callers implement only what they need.
/// Handlers should be cheap: they run inline with stream processing.
pub trait ChatHandler {
    /// An incremental answer fragment, in wire order.
    fn on_message(&mut self, _delta: &str) {}

    /// A geographic payload was found in the accumulated answer. Fires at
    /// most once per request, after the last `on_message`.
    fn on_geo_json_detected(&mut self, _payload: GeoPayload) {}

    /// The request completed. Fires at most once, and never after
    /// `on_error`.
    fn on_completed(&mut self) {}

    /// The request failed. Fires at most once, and never after
    /// `on_completed`. Fragments delivered before the failure are not
    /// retracted.
    fn on_error(&mut self, _error: DifyError) {}
}

/// Chat service trait.
#[async_trait]
pub trait ChatService: Send + Sync {
    /// Sends a chat message, reporting all outcomes through `handler`.
    ///
    /// Never returns an error: failures, including a missing API key, are
    /// delivered through `ChatHandler::on_error` exactly once.
    async fn send_message(
        &self,
        query: &str,
        options: ChatOptions,
        handler: &mut (dyn ChatHandler + Send),
    );
}

/// Default implementation of the chat service.
pub struct DefaultChatService<T> {
    transport: T,
    config: DifyConfig,
}

impl<T> DefaultChatService<T> {
    /// Creates a new chat service over a transport.
    pub fn new(transport: T, config: DifyConfig) -> Self {
        Self { transport, config }
    }
}

#[async_trait]
impl<T> ChatService for DefaultChatService<T>
where
    T: HttpTransport + Send + Sync,
{
    async fn send_message(
        &self,
        query: &str,
        options: ChatOptions,
        handler: &mut (dyn ChatHandler + Send),
    ) {
        if !self.config.has_api_key() {
            handler.on_error(DifyError::configuration("Dify API key is not configured"));
            return;
        }

        if let Err(error) = self.drive(query, &options, handler).await {
            // A failure triggered by the caller's token is a cancellation,
            // whatever the underlying request died of.
            let error = if error.is_cancellation() || options.is_cancelled() {
                DifyError::Cancelled
            } else {
                error
            };
            tracing::debug!(%error, "chat request failed");
            handler.on_error(error);
        }
    }
}

impl<T> DefaultChatService<T>
where
    T: HttpTransport + Send + Sync,
{
    async fn drive(
        &self,
        query: &str,
        options: &ChatOptions,
        handler: &mut (dyn ChatHandler + Send),
    ) -> DifyResult<()> {
        let request = ChatRequest {
            inputs: options.inputs.clone(),
            query: query.to_string(),
            response_mode: if options.stream {
                ResponseMode::Streaming
            } else {
                ResponseMode::Blocking
            },
            user: options.user.clone(),
        };
        let body = serde_json::to_vec(&request)?;

        if options.stream {
            self.drive_streaming(body, options, handler).await
        } else {
            self.drive_blocking(body, options, handler).await
        }
    }

    async fn drive_streaming(
        &self,
        body: Vec<u8>,
        options: &ChatOptions,
        handler: &mut (dyn ChatHandler + Send),
    ) -> DifyResult<()> {
        let mut stream =
            cancellable(options, self.transport.post_stream(CHAT_MESSAGES_PATH, body)).await??;

        // Per-request state: no sharing between concurrent calls.
        let mut decoder = SseLineDecoder::new();
        let mut full_text = String::new();

        loop {
            let chunk = match cancellable(options, stream.next()).await? {
                Some(chunk) => chunk?,
                None => break,
            };

            for event in decoder.feed(&chunk) {
                match event {
                    StreamEvent::TextDelta(delta) => {
                        full_text.push_str(&delta);
                        handler.on_message(&delta);
                    }
                    StreamEvent::Done => {
                        // Sentinel seen: finish now and read no further.
                        finish(&full_text, handler);
                        return Ok(());
                    }
                    StreamEvent::Malformed(raw) => {
                        tracing::debug!(fragment = %raw, "discarding malformed stream fragment");
                    }
                }
            }
        }

        // Connection closed without [DONE]; flush any unterminated tail and
        // run the same completion sequence once as a safety net.
        match decoder.finish() {
            Some(StreamEvent::TextDelta(delta)) => {
                full_text.push_str(&delta);
                handler.on_message(&delta);
            }
            Some(StreamEvent::Malformed(raw)) => {
                tracing::debug!(fragment = %raw, "discarding malformed stream fragment");
            }
            Some(StreamEvent::Done) | None => {}
        }
        finish(&full_text, handler);
        Ok(())
    }

    async fn drive_blocking(
        &self,
        body: Vec<u8>,
        options: &ChatOptions,
        handler: &mut (dyn ChatHandler + Send),
    ) -> DifyResult<()> {
        let bytes =
            cancellable(options, self.transport.post(CHAT_MESSAGES_PATH, body)).await??;
        let response: BlockingChatResponse = serde_json::from_slice(&bytes)?;

        match response.answer {
            Some(answer) if !answer.is_empty() => {
                handler.on_message(&answer);
                finish(&answer, handler);
            }
            _ => handler.on_completed(),
        }
        Ok(())
    }
}

/// End-of-answer sequence: one extraction pass over the accumulated text,
/// detection callback on a hit, then completion.
fn finish(full_text: &str, handler: &mut (dyn ChatHandler + Send)) {
    if let Some(payload) = extract_geo_payload(full_text) {
        tracing::debug!(geo_type = %payload.geo_type(), "geographic payload detected in answer");
        handler.on_geo_json_detected(payload);
    }
    handler.on_completed();
}

/// Races a future against the caller's cancellation token, if any.
async fn cancellable<F: Future>(options: &ChatOptions, future: F) -> DifyResult<F::Output> {
    match &options.cancel {
        Some(token) => {
            tokio::select! {
                biased;
                _ = token.cancelled() => Err(DifyError::Cancelled),
                output = future => Ok(output),
            }
        }
        None => Ok(future.await),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::GeoType;
    use crate::mocks::{MockReply, MockTransport};
    use bytes::Bytes;
    use pretty_assertions::assert_eq;
    use std::sync::{Arc, Mutex};
    use tokio_util::sync::CancellationToken;

    /// Observable handler events, recorded in callback order.
    #[derive(Debug, Clone, PartialEq)]
    enum Recorded {
        Message(String),
        Geo(GeoType),
        Completed,
        Error(String),
    }

    #[derive(Default)]
    struct RecordingHandler {
        log: Arc<Mutex<Vec<Recorded>>>,
    }

    impl RecordingHandler {
        fn new() -> Self {
            Self::default()
        }

        fn log_handle(&self) -> Arc<Mutex<Vec<Recorded>>> {
            self.log.clone()
        }

        fn events(&self) -> Vec<Recorded> {
            self.log.lock().unwrap().clone()
        }
    }

    impl ChatHandler for RecordingHandler {
        fn on_message(&mut self, delta: &str) {
            self.log
                .lock()
                .unwrap()
                .push(Recorded::Message(delta.to_string()));
        }

        fn on_geo_json_detected(&mut self, payload: GeoPayload) {
            self.log
                .lock()
                .unwrap()
                .push(Recorded::Geo(payload.geo_type()));
        }

        fn on_completed(&mut self) {
            self.log.lock().unwrap().push(Recorded::Completed);
        }

        fn on_error(&mut self, error: DifyError) {
            self.log
                .lock()
                .unwrap()
                .push(Recorded::Error(error.to_string()));
        }
    }

    fn config_with_key() -> DifyConfig {
        DifyConfig::builder().api_key("app-test-key").build().unwrap()
    }

    fn config_without_key() -> DifyConfig {
        DifyConfig::builder().build().unwrap()
    }

    #[tokio::test]
    async fn test_streaming_order_and_completion() {
        let transport = MockTransport::new();
        transport.enqueue(MockReply::Chunks(vec![
            Bytes::from("data: {\"answer\":\"A\"}\n\n"),
            Bytes::from("data: {\"answer\":\"B\"}\n\ndata: [DONE]\n\n"),
        ]));
        let service = DefaultChatService::new(&transport, config_with_key());
        let mut handler = RecordingHandler::new();

        service
            .send_message("hello", ChatOptions::new(), &mut handler)
            .await;

        assert_eq!(
            handler.events(),
            vec![
                Recorded::Message("A".to_string()),
                Recorded::Message("B".to_string()),
                Recorded::Completed,
            ]
        );
    }

    #[tokio::test]
    async fn test_events_after_done_in_same_chunk_ignored() {
        let transport = MockTransport::new();
        transport.enqueue(MockReply::Chunks(vec![Bytes::from(
            "data: {\"answer\":\"A\"}\ndata: [DONE]\ndata: {\"answer\":\"ghost\"}\n",
        )]));
        let service = DefaultChatService::new(&transport, config_with_key());
        let mut handler = RecordingHandler::new();

        service
            .send_message("hello", ChatOptions::new(), &mut handler)
            .await;

        assert_eq!(
            handler.events(),
            vec![Recorded::Message("A".to_string()), Recorded::Completed]
        );
    }

    #[tokio::test]
    async fn test_payload_split_across_chunks_detected_once() {
        // The payload is only visible once the accumulator is concatenated.
        let transport = MockTransport::new();
        transport.enqueue(MockReply::Chunks(vec![
            Bytes::from("data: {\"answer\":\"here: {\\\"geom\\\": {\\\"type\\\":\\\"Point\\\",\"}\n"),
            Bytes::from("data: {\"answer\":\"\\\"coordinates\\\":[116.4,39.9]}, \\\"name\\\":\\\"x\\\"}\"}\n"),
            Bytes::from("data: [DONE]\n"),
        ]));
        let service = DefaultChatService::new(&transport, config_with_key());
        let mut handler = RecordingHandler::new();

        service
            .send_message("where", ChatOptions::new(), &mut handler)
            .await;

        let events = handler.events();
        assert_eq!(events.len(), 4);
        assert_eq!(events[2], Recorded::Geo(GeoType::Point));
        assert_eq!(events[3], Recorded::Completed);
    }

    #[tokio::test]
    async fn test_connection_close_without_done_still_completes() {
        let transport = MockTransport::new();
        transport.enqueue(MockReply::Chunks(vec![Bytes::from(
            "data: {\"answer\":\"partial\"}\n",
        )]));
        let service = DefaultChatService::new(&transport, config_with_key());
        let mut handler = RecordingHandler::new();

        service
            .send_message("hello", ChatOptions::new(), &mut handler)
            .await;

        assert_eq!(
            handler.events(),
            vec![
                Recorded::Message("partial".to_string()),
                Recorded::Completed
            ]
        );
    }

    #[tokio::test]
    async fn test_malformed_fragments_discarded_silently() {
        let transport = MockTransport::new();
        transport.enqueue(MockReply::Chunks(vec![Bytes::from(
            "data: {broken\ndata: {\"answer\":\"ok\"}\ndata: [DONE]\n",
        )]));
        let service = DefaultChatService::new(&transport, config_with_key());
        let mut handler = RecordingHandler::new();

        service
            .send_message("hello", ChatOptions::new(), &mut handler)
            .await;

        assert_eq!(
            handler.events(),
            vec![Recorded::Message("ok".to_string()), Recorded::Completed]
        );
    }

    #[tokio::test]
    async fn test_missing_api_key_reports_error_without_network() {
        let transport = MockTransport::new();
        let service = DefaultChatService::new(&transport, config_without_key());
        let mut handler = RecordingHandler::new();

        service
            .send_message("hello", ChatOptions::new(), &mut handler)
            .await;

        let events = handler.events();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], Recorded::Error(ref m) if m.contains("API key")));
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn test_pre_cancelled_token_reports_cancellation() {
        let transport = MockTransport::new();
        transport.enqueue(MockReply::Chunks(vec![Bytes::from("data: [DONE]\n")]));
        let service = DefaultChatService::new(&transport, config_with_key());
        let mut handler = RecordingHandler::new();

        let token = CancellationToken::new();
        token.cancel();
        let options = ChatOptions::new().cancel_token(token);

        service.send_message("hello", options, &mut handler).await;

        assert_eq!(
            handler.events(),
            vec![Recorded::Error(DifyError::Cancelled.to_string())]
        );
    }

    #[tokio::test]
    async fn test_cancel_mid_stream_reports_cancellation_once() {
        let transport = MockTransport::new();
        transport.enqueue(MockReply::ChunksThenPending(vec![Bytes::from(
            "data: {\"answer\":\"A\"}\n",
        )]));
        let service = DefaultChatService::new(&transport, config_with_key());
        let mut handler = RecordingHandler::new();
        let log = handler.log_handle();

        let token = CancellationToken::new();
        let options = ChatOptions::new().cancel_token(token.clone());

        let cancel = tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            token.cancel();
        });

        service.send_message("hello", options, &mut handler).await;
        cancel.await.unwrap();

        let events = log.lock().unwrap().clone();
        assert_eq!(
            events,
            vec![
                Recorded::Message("A".to_string()),
                Recorded::Error(DifyError::Cancelled.to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_transport_error_reported_once() {
        let transport = MockTransport::new();
        transport.enqueue(MockReply::Error(DifyError::Api {
            status: 500,
            message: "boom".to_string(),
            body: None,
        }));
        let service = DefaultChatService::new(&transport, config_with_key());
        let mut handler = RecordingHandler::new();

        service
            .send_message("hello", ChatOptions::new(), &mut handler)
            .await;

        let events = handler.events();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], Recorded::Error(ref m) if m.contains("500")));
    }

    #[tokio::test]
    async fn test_blocking_path_message_then_completion() {
        let transport = MockTransport::new();
        transport.enqueue(MockReply::Body(Bytes::from(
            r#"{"answer":"{\"geom\": {\"type\":\"Point\",\"coordinates\":[1,2]}, \"name\":\"x\"}"}"#,
        )));
        let service = DefaultChatService::new(&transport, config_with_key());
        let mut handler = RecordingHandler::new();

        service
            .send_message("hello", ChatOptions::new().stream(false), &mut handler)
            .await;

        let events = handler.events();
        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], Recorded::Message(_)));
        assert_eq!(events[1], Recorded::Geo(GeoType::Point));
        assert_eq!(events[2], Recorded::Completed);
    }

    #[tokio::test]
    async fn test_blocking_path_without_answer_completes_quietly() {
        let transport = MockTransport::new();
        transport.enqueue(MockReply::Body(Bytes::from(r#"{"answer":""}"#)));
        let service = DefaultChatService::new(&transport, config_with_key());
        let mut handler = RecordingHandler::new();

        service
            .send_message("hello", ChatOptions::new().stream(false), &mut handler)
            .await;

        assert_eq!(handler.events(), vec![Recorded::Completed]);
    }

    #[tokio::test]
    async fn test_request_body_carries_mode_and_user() {
        let transport = MockTransport::new();
        transport.enqueue(MockReply::Chunks(vec![Bytes::from("data: [DONE]\n")]));
        let service = DefaultChatService::new(&transport, config_with_key());
        let mut handler = RecordingHandler::new();

        service
            .send_message(
                "hello",
                ChatOptions::new().user("session-7").input("city", "Beijing"),
                &mut handler,
            )
            .await;

        let recorded = transport.request(0);
        assert_eq!(recorded.path, CHAT_MESSAGES_PATH);
        let body: serde_json::Value = serde_json::from_slice(&recorded.body).unwrap();
        assert_eq!(body["response_mode"], "streaming");
        assert_eq!(body["user"], "session-7");
        assert_eq!(body["query"], "hello");
        assert_eq!(body["inputs"]["city"], "Beijing");
    }
}
