//! In-memory queue client.

use std::collections::HashSet;

use ananke_core::{AnankeError, BoxFuture, QueueClient};
use parking_lot::Mutex;

/// A [`QueueClient`] that records every call instead of reaching a queue.
///
/// Queue URLs are derived from the queue name as
/// `https://queue.local/<name>`. Queues can be marked missing to exercise
/// lookup failures.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use ananke_core::{MessageHelper, QueueRecord};
/// use ananke_test::MemoryQueueClient;
///
/// # tokio_test::block_on(async {
/// let client = Arc::new(MemoryQueueClient::new());
/// let record = QueueRecord {
///     event_source_arn: "arn:aws:sqs:us-east-1:1:orders".into(),
///     receipt_handle: "rh-1".into(),
///     ..Default::default()
/// };
///
/// MessageHelper::new(client.clone(), Arc::new(record)).delete().await.unwrap();
/// assert_eq!(client.deleted(), [("https://queue.local/orders".to_string(), "rh-1".to_string())]);
/// # });
/// ```
#[derive(Debug, Default)]
pub struct MemoryQueueClient {
    url_lookups: Mutex<Vec<String>>,
    deleted: Mutex<Vec<(String, String)>>,
    missing: Mutex<HashSet<String>>,
}

impl MemoryQueueClient {
    /// Creates an empty client.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes URL lookups for `queue_name` fail with a 404.
    #[must_use]
    pub fn with_missing_queue(self, queue_name: impl Into<String>) -> Self {
        self.missing.lock().insert(queue_name.into());
        self
    }

    /// Returns the URL this client reports for a queue.
    #[must_use]
    pub fn queue_url_for(&self, queue_name: &str) -> String {
        format!("https://queue.local/{queue_name}")
    }

    /// Returns the queue names looked up so far, in call order.
    #[must_use]
    pub fn url_lookups(&self) -> Vec<String> {
        self.url_lookups.lock().clone()
    }

    /// Returns `(queue_url, receipt_handle)` for every deletion, in call order.
    #[must_use]
    pub fn deleted(&self) -> Vec<(String, String)> {
        self.deleted.lock().clone()
    }
}

impl QueueClient for MemoryQueueClient {
    fn queue_url<'a>(&'a self, queue_name: &'a str) -> BoxFuture<'a, Result<String, AnankeError>> {
        Box::pin(async move {
            self.url_lookups.lock().push(queue_name.to_string());
            if self.missing.lock().contains(queue_name) {
                return Err(AnankeError::not_found(format!("Queue {queue_name} does not exist")));
            }
            Ok(self.queue_url_for(queue_name))
        })
    }

    fn delete_message<'a>(
        &'a self,
        queue_url: &'a str,
        receipt_handle: &'a str,
    ) -> BoxFuture<'a, Result<(), AnankeError>> {
        Box::pin(async move {
            self.deleted
                .lock()
                .push((queue_url.to_string(), receipt_handle.to_string()));
            Ok(())
        })
    }
}
