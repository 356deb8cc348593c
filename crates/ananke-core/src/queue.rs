//! Queue acknowledgment seam.
//!
//! The queue service itself is an external collaborator: the runtime only
//! needs to turn a queue name into a URL and delete a message by receipt
//! handle. Implement [`QueueClient`] over the SDK of your choice.

use std::fmt;
use std::sync::Arc;

use crate::error::AnankeError;
use crate::event::QueueRecord;
use crate::BoxFuture;

/// Minimal queue operations used by [`MessageHelper`].
pub trait QueueClient: Send + Sync + 'static {
    /// Looks up the URL of the named queue.
    fn queue_url<'a>(&'a self, queue_name: &'a str) -> BoxFuture<'a, Result<String, AnankeError>>;

    /// Deletes a message from the queue at `queue_url`.
    fn delete_message<'a>(
        &'a self,
        queue_url: &'a str,
        receipt_handle: &'a str,
    ) -> BoxFuture<'a, Result<(), AnankeError>>;
}

/// Per-message helper bound to the message's originating queue.
#[derive(Clone)]
pub struct MessageHelper {
    client: Arc<dyn QueueClient>,
    record: Arc<QueueRecord>,
}

impl MessageHelper {
    /// Binds a helper to one record.
    #[must_use]
    pub fn new(client: Arc<dyn QueueClient>, record: Arc<QueueRecord>) -> Self {
        Self { client, record }
    }

    /// Returns the record this helper is bound to.
    #[must_use]
    pub fn record(&self) -> &QueueRecord {
        &self.record
    }

    /// Returns the originating queue's name.
    #[must_use]
    pub fn queue_name(&self) -> &str {
        self.record.queue_name()
    }

    /// Resolves the originating queue's URL.
    pub async fn queue_url(&self) -> Result<String, AnankeError> {
        self.client.queue_url(self.record.queue_name()).await
    }

    /// Deletes the message from its queue.
    pub async fn delete(&self) -> Result<(), AnankeError> {
        let url = self.queue_url().await?;
        tracing::debug!(
            queue = %self.record.queue_name(),
            message_id = %self.record.message_id,
            "deleting queue message"
        );
        self.client
            .delete_message(&url, &self.record.receipt_handle)
            .await
    }
}

impl fmt::Debug for MessageHelper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageHelper")
            .field("queue", &self.record.queue_name())
            .field("message_id", &self.record.message_id)
            .finish_non_exhaustive()
    }
}
