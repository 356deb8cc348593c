//! The queue variant: fan-out over a batch of messages.
//!
//! Every message is parsed, validated and handed to the runner on its own;
//! messages run concurrently and a failing message never stops the others.
//! Redelivery is left to the queue itself.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use ananke_core::{
    AnankeError, BoxFuture, Context, ContextResolver, HandlerOptions, MessageHelper, QueueClient,
    QueueEvent, QueueRecord, RequestId,
};
use ananke_validation::{CompileError, ParamsValidator};
use futures_util::future::join_all;
use serde::Serialize;
use serde_json::Value;
use tracing::Instrument;

use crate::handler::{to_json, Handler, HandlerCore};
use crate::runtime::Runtime;

type QueueRunner = Arc<dyn Fn(QueueMessage, Context) -> BoxFuture<'static, Result<Value, AnankeError>> + Send + Sync>;

/// One message as seen by application code.
#[derive(Clone)]
pub struct QueueMessage {
    /// The validated message body.
    pub params: Value,
    /// Acknowledgment helper bound to the originating queue.
    pub helper: MessageHelper,
    /// The raw record.
    pub record: Arc<QueueRecord>,
    /// The raw batch event.
    pub event: Arc<QueueEvent>,
}

impl QueueMessage {
    /// Deletes this message from its queue.
    ///
    /// # Errors
    ///
    /// Returns the queue client's error if the URL lookup or the deletion fails.
    pub async fn delete(&self) -> Result<(), AnankeError> {
        self.helper.delete().await
    }
}

impl std::fmt::Debug for QueueMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueMessage")
            .field("message_id", &self.record.message_id)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// The result of one message of a batch.
#[derive(Debug)]
pub struct MessageResult {
    /// Transport message id.
    pub message_id: String,
    /// What the runner returned, or why the message failed.
    pub result: Result<Value, AnankeError>,
}

/// Per-message results of a batch, in input order.
#[derive(Debug, Default)]
pub struct QueueReport {
    /// One entry per record of the event.
    pub results: Vec<MessageResult>,
}

impl QueueReport {
    /// Returns the results of successful messages.
    pub fn succeeded(&self) -> impl Iterator<Item = &MessageResult> {
        self.results.iter().filter(|r| r.result.is_ok())
    }

    /// Returns the results of failed messages.
    pub fn failed(&self) -> impl Iterator<Item = &MessageResult> {
        self.results.iter().filter(|r| r.result.is_err())
    }

    /// Returns `true` if every message succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.results.iter().all(|r| r.result.is_ok())
    }

    /// Returns the number of messages in the batch.
    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Returns `true` for an empty batch.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

/// Handles a batch of queue messages.
///
/// # Example
///
/// ```
/// use ananke_core::{AnankeError, Context, HandlerOptions, QueueEvent, QueueRecord};
/// use ananke_runtime::{Handler, Queue, QueueMessage, Runtime};
///
/// # tokio_test::block_on(async {
/// let queue = Queue::new(
///     Runtime::builder().build(),
///     "orders",
///     HandlerOptions::new().validate("orderId", "number().required()"),
///     |message: QueueMessage, _ctx: Context| async move {
///         Ok::<_, AnankeError>(message.params["orderId"].clone())
///     },
/// )
/// .unwrap();
///
/// let report = queue
///     .exec(QueueEvent {
///         records: vec![QueueRecord {
///             message_id: "m-1".to_string(),
///             body: r#"{"orderId":"7"}"#.to_string(),
///             ..Default::default()
///         }],
///     })
///     .await
///     .unwrap();
///
/// assert!(report.is_success());
/// assert_eq!(report.results[0].result.as_ref().unwrap(), 7);
/// # });
/// ```
pub struct Queue {
    core: HandlerCore,
    validator: ParamsValidator,
    runner: QueueRunner,
}

impl Queue {
    /// Creates a queue handler.
    ///
    /// Only `validation` of the options applies; queue messages carry no
    /// principal and run no middleware.
    ///
    /// # Errors
    ///
    /// Returns a [`CompileError`] if a validation rule is malformed.
    pub fn new<F, Fut, T, E>(
        runtime: Runtime,
        name: impl Into<String>,
        options: HandlerOptions,
        runner: F,
    ) -> Result<Self, CompileError>
    where
        F: Fn(QueueMessage, Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Serialize + Send + 'static,
        E: Into<AnankeError> + 'static,
    {
        let validator = ParamsValidator::new(&options.validation)?;
        let runner: QueueRunner = Arc::new(move |message, ctx| {
            let fut = runner(message, ctx);
            Box::pin(async move { to_json(fut.await.map_err(Into::into)?) })
        });
        Ok(Self {
            core: HandlerCore::new(runtime, name, options),
            validator,
            runner,
        })
    }

    /// Uses `resolver` instead of the runtime's shared context.
    #[must_use]
    pub fn with_context(mut self, resolver: Arc<ContextResolver>) -> Self {
        self.core.set_context(resolver);
        self
    }

    fn client(&self) -> &Arc<dyn QueueClient> {
        self.core.runtime().queue_client()
    }

    async fn handle(&self, record: Arc<QueueRecord>, event: Arc<QueueEvent>, ctx: &Context) -> MessageResult {
        let started = Instant::now();
        let request_id = if record.message_id.is_empty() {
            RequestId::new().to_string()
        } else {
            record.message_id.clone()
        };
        let span = ctx.logger().child(&request_id);

        let result = async {
            tracing::debug!(queue = %record.queue_name(), "Starting queue message");
            let result = self.invoke(Arc::clone(&record), event, ctx).await;
            match &result {
                Ok(_) => tracing::debug!("Finished message successfully"),
                Err(error) => self.core.log_failure(error),
            }
            result
        }
        .instrument(span)
        .await;

        let status = result.as_ref().map_or_else(|e| e.status_code().as_u16(), |_| 200);
        self.core.record(started, status);

        MessageResult {
            message_id: record.message_id.clone(),
            result,
        }
    }

    async fn invoke(
        &self,
        record: Arc<QueueRecord>,
        event: Arc<QueueEvent>,
        ctx: &Context,
    ) -> Result<Value, AnankeError> {
        let body = match record.body.trim() {
            "" => Value::Object(serde_json::Map::new()),
            body => serde_json::from_str(body)
                .map_err(|e| AnankeError::bad_request(format!("Message body is not valid JSON: {e}")))?,
        };
        let params = self.validator.check(&body)?;

        let message = QueueMessage {
            params,
            helper: MessageHelper::new(Arc::clone(self.client()), Arc::clone(&record)),
            record,
            event,
        };
        (self.runner)(message, ctx.clone()).await
    }
}

impl Handler for Queue {
    type Event = QueueEvent;
    type Output = Result<QueueReport, AnankeError>;

    async fn exec(&self, event: QueueEvent) -> Result<QueueReport, AnankeError> {
        let ctx = self.core.context().await.map_err(|error| {
            AnankeError::internal_with_source(format!("Context could not be resolved: {error}"), error)
        })?;

        let event = Arc::new(event);
        let results = join_all(
            event
                .records
                .iter()
                .map(|record| self.handle(Arc::new(record.clone()), Arc::clone(&event), &ctx)),
        )
        .await;

        Ok(QueueReport { results })
    }
}
