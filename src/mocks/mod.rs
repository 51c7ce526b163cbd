//! Mock implementations for testing.
//!
//! The mock transport scripts exact byte-chunk boundaries, which real HTTP
//! test servers cannot guarantee; the pipeline tests rely on that to prove
//! behavior across chunk splits.

mod transport;

pub use transport::{MockReply, MockTransport, RecordedRequest};
