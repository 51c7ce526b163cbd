//! Shared test support: a handler that records callbacks in order.

use dify_client::{ChatHandler, DifyError, GeoPayload, GeoType};
use std::sync::{Arc, Mutex};

/// One observed callback.
#[derive(Debug, Clone, PartialEq)]
#[allow(dead_code)]
pub enum Recorded {
    Message(String),
    Geo(GeoType),
    Completed,
    Error(String),
}

/// Records every callback in invocation order.
#[derive(Default)]
pub struct RecordingHandler {
    log: Arc<Mutex<Vec<Recorded>>>,
}

#[allow(dead_code)]
impl RecordingHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Recorded> {
        self.log.lock().unwrap().clone()
    }

    pub fn completed_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, Recorded::Completed))
            .count()
    }

    pub fn error_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, Recorded::Error(_)))
            .count()
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
