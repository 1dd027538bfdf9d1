//! # Messaging Module
//!
//! Request-log and job-notification publishing. The pgmq queue lives in the
//! service database, so no separate broker process is required.

pub mod errors;
pub mod log_sink;
pub mod pgmq_client;

pub use errors::{MessagingError, MessagingResult};
pub use log_sink::{
    start_log_publisher, JobMessage, LogPublisher, LogSink, MemoryLogSink, PgmqLogSink,
    RequestLogEntry, SinkMessage, TracingLogSink,
};
pub use pgmq_client::PgmqClient;
