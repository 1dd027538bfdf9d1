//! # Request Log Sink
//!
//! Request-log entries and job notifications leave the request path through a
//! bounded channel. A background task drains the channel into a [`LogSink`],
//! so a slow or unavailable broker never adds latency to HTTP responses. When
//! the channel is full the message is dropped with a warning.

use super::errors::{MessagingError, MessagingResult};
use super::pgmq_client::PgmqClient;
use crate::config::{LogSinkConfig, LogSinkKind};
use crate::constants::events;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::fmt::Debug;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// One handled HTTP request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestLogEntry {
    pub method: String,
    pub url: String,
    pub status_code: u16,
    pub process_time_ms: f64,
    pub client_ip: Option<String>,
}

/// Notification that a task is waiting for a worker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobMessage {
    pub kind: String,
    pub task_id: Uuid,
    pub user_id: Uuid,
}

impl JobMessage {
    pub fn task_queued(task_id: Uuid, user_id: Uuid) -> Self {
        Self {
            kind: events::TASK_QUEUED.to_string(),
            task_id,
            user_id,
        }
    }
}

/// Anything published to the sink; serialized without a wrapper tag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SinkMessage {
    Job(JobMessage),
    RequestLog(RequestLogEntry),
}

impl SinkMessage {
    pub fn kind(&self) -> &str {
        match self {
            SinkMessage::Job(job) => &job.kind,
            SinkMessage::RequestLog(_) => events::REQUEST_LOG,
        }
    }
}

/// Destination for published messages
#[async_trait]
pub trait LogSink: Send + Sync + Debug {
    fn name(&self) -> &'static str;

    async fn publish(&self, message: &SinkMessage) -> MessagingResult<()>;
}

/// Sends every message to a pgmq queue
#[derive(Debug, Clone)]
pub struct PgmqLogSink {
    client: PgmqClient,
    queue_name: String,
}

impl PgmqLogSink {
    /// Create the queue if needed and share the given pool
    pub async fn connect(pool: PgPool, queue_name: &str) -> MessagingResult<Self> {
        let client = PgmqClient::new_with_pool(pool).await;
        client.create_queue(queue_name).await?;
        Ok(Self {
            client,
            queue_name: queue_name.to_string(),
        })
    }

    pub fn client(&self) -> &PgmqClient {
        &self.client
    }

    pub fn queue_name(&self) -> &str {
        &self.queue_name
    }
}

#[async_trait]
impl LogSink for PgmqLogSink {
    fn name(&self) -> &'static str {
        "pgmq"
    }

    async fn publish(&self, message: &SinkMessage) -> MessagingResult<()> {
        self.client.send_json(&self.queue_name, message).await?;
        Ok(())
    }
}

/// Emits each message as a structured tracing event
#[derive(Debug, Clone, Default)]
pub struct TracingLogSink;

#[async_trait]
impl LogSink for TracingLogSink {
    fn name(&self) -> &'static str {
        "tracing"
    }

    async fn publish(&self, message: &SinkMessage) -> MessagingResult<()> {
        let payload = serde_json::to_string(message)?;
        info!(target: "request_log", kind = %message.kind(), payload = %payload, "LOG_SINK");
        Ok(())
    }
}

/// Keeps messages in memory; used by tests and local inspection
#[derive(Debug, Clone, Default)]
pub struct MemoryLogSink {
    messages: Arc<Mutex<Vec<SinkMessage>>>,
}

impl MemoryLogSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<SinkMessage> {
        self.messages.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.messages.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl LogSink for MemoryLogSink {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn publish(&self, message: &SinkMessage) -> MessagingResult<()> {
        self.messages.lock().push(message.clone());
        Ok(())
    }
}

/// Cheap, cloneable handle used by request handlers to publish
#[derive(Debug, Clone)]
pub struct LogPublisher {
    sender: Option<mpsc::Sender<SinkMessage>>,
}

impl LogPublisher {
    /// Start the drain task for `sink` and return the publishing handle.
    ///
    /// The task ends once every publisher clone has been dropped.
    ///
    /// ```rust
    /// use benchmark_api::messaging::{LogPublisher, MemoryLogSink};
    /// use std::sync::Arc;
    /// use uuid::Uuid;
    ///
    /// # tokio_test::block_on(async {
    /// let sink = MemoryLogSink::new();
    /// let (publisher, drain) = LogPublisher::spawn(Arc::new(sink.clone()), 16);
    /// publisher.task_queued(Uuid::new_v4(), Uuid::new_v4());
    /// drop(publisher);
    /// drain.await.unwrap();
    /// assert_eq!(sink.len(), 1);
    /// # });
    /// ```
    pub fn spawn(sink: Arc<dyn LogSink>, buffer_size: usize) -> (Self, JoinHandle<()>) {
        let (sender, mut receiver) = mpsc::channel::<SinkMessage>(buffer_size.max(1));

        let handle = tokio::spawn(async move {
            debug!(sink = sink.name(), "Log sink drain started");
            while let Some(message) = receiver.recv().await {
                if let Err(e) = sink.publish(&message).await {
                    warn!(sink = sink.name(), kind = %message.kind(), error = %e, "Failed to publish log message");
                }
            }
            debug!(sink = sink.name(), "Log sink drain stopped");
        });

        (
            Self {
                sender: Some(sender),
            },
            handle,
        )
    }

    /// A publisher that discards everything
    pub fn disabled() -> Self {
        Self { sender: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.sender.is_some()
    }

    /// Enqueue without waiting; returns false when dropped
    pub fn publish(&self, message: SinkMessage) -> bool {
        let Some(sender) = &self.sender else {
            return false;
        };

        match sender.try_send(message) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(message)) => {
                warn!(kind = %message.kind(), "Log channel full, dropping message");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!("{}", MessagingError::ChannelClosed);
                false
            }
        }
    }

    pub fn request_log(&self, entry: RequestLogEntry) -> bool {
        self.publish(SinkMessage::RequestLog(entry))
    }

    pub fn task_queued(&self, task_id: Uuid, user_id: Uuid) -> bool {
        self.publish(SinkMessage::Job(JobMessage::task_queued(task_id, user_id)))
    }
}

/// Build the configured sink and start draining into it.
///
/// Returns the join handle of the drain task when one was started.
pub async fn start_log_publisher(
    config: &LogSinkConfig,
    pool: &PgPool,
) -> MessagingResult<(LogPublisher, Option<JoinHandle<()>>)> {
    let sink: Arc<dyn LogSink> = match config.sink {
        LogSinkKind::Disabled => {
            info!("Request log sink disabled");
            return Ok((LogPublisher::disabled(), None));
        }
        LogSinkKind::Tracing => Arc::new(TracingLogSink),
        LogSinkKind::Pgmq => Arc::new(PgmqLogSink::connect(pool.clone(), &config.queue_name).await?),
    };

    info!(sink = sink.name(), queue = %config.queue_name, buffer = config.buffer_size, "Request log sink started");
    let (publisher, handle) = LogPublisher::spawn(sink, config.buffer_size);
    Ok((publisher, Some(handle)))
}
