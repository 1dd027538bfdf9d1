//! # PostgreSQL Message Queue Client
//!
//! Thin wrapper over `pgmq` for the request-log queue.

use super::errors::{MessagingError, MessagingResult};
use pgmq::{types::Message, PGMQueue};
use serde::Serialize;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct PgmqClient {
    pgmq: PGMQueue,
}

impl PgmqClient {
    /// Connect with a dedicated pool
    pub async fn new(database_url: &str) -> MessagingResult<Self> {
        let pgmq = PGMQueue::new(database_url.to_string())
            .await
            .map_err(|e| MessagingError::database_connection(e.to_string()))?;

        info!("Connected to pgmq");
        Ok(Self { pgmq })
    }

    /// Share the service pool
    pub async fn new_with_pool(pool: sqlx::PgPool) -> Self {
        let pgmq = PGMQueue::new_with_pool(pool).await;
        debug!("pgmq client created with shared pool");
        Self { pgmq }
    }

    /// Create queue if it doesn't exist
    pub async fn create_queue(&self, queue_name: &str) -> MessagingResult<()> {
        self.pgmq
            .create(queue_name)
            .await
            .map_err(|e| MessagingError::queue_operation(queue_name, "create", e.to_string()))?;

        info!(queue = %queue_name, "Queue ready");
        Ok(())
    }

    /// Send any serializable payload as a JSON message
    pub async fn send_json<T: Serialize>(&self, queue_name: &str, message: &T) -> MessagingResult<i64> {
        let serialized = serde_json::to_value(message)?;
        let message_id = self
            .pgmq
            .send(queue_name, &serialized)
            .await
            .map_err(|e| MessagingError::queue_operation(queue_name, "send", e.to_string()))?;

        debug!(queue = %queue_name, message_id, "Message sent");
        Ok(message_id)
    }

    /// Read up to `limit` messages, hiding them for `vt` seconds
    pub async fn read_messages(
        &self,
        queue_name: &str,
        vt: Option<i32>,
        limit: i32,
    ) -> MessagingResult<Vec<Message<serde_json::Value>>> {
        let messages = self
            .pgmq
            .read_batch(queue_name, vt, limit)
            .await
            .map_err(|e| MessagingError::queue_operation(queue_name, "read", e.to_string()))?
            .unwrap_or_default();

        debug!(queue = %queue_name, count = messages.len(), "Messages read");
        Ok(messages)
    }

    pub async fn delete_message(&self, queue_name: &str, message_id: i64) -> MessagingResult<()> {
        self.pgmq
            .delete(queue_name, message_id)
            .await
            .map_err(|e| MessagingError::queue_operation(queue_name, "delete", e.to_string()))?;
        Ok(())
    }

    /// Delete every message in the queue
    pub async fn purge_queue(&self, queue_name: &str) -> MessagingResult<u64> {
        let purged = self
            .pgmq
            .purge(queue_name)
            .await
            .map_err(|e| MessagingError::queue_operation(queue_name, "purge", e.to_string()))?;

        warn!(queue = %queue_name, purged, "Queue purged");
        Ok(purged)
    }
}
