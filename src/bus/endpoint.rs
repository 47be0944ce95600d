//! Receive and send endpoint configuration.

use std::fmt;
use std::sync::Arc;

use super::consumer::ConsumerPipe;
use crate::naming::MessageType;
use crate::retry::RetryPolicy;

/// Prefetch used by endpoints that are not tuned explicitly.
pub const DEFAULT_PREFETCH_COUNT: u16 = 16;

/// Configuration of one receive endpoint (one queue) under construction.
///
/// Convention endpoints start with prefetch 1 and [`RetryPolicy::standard`];
/// a customization callback sees this handle afterwards and may override
/// either.
pub struct ReceiveEndpointConfigurator {
    queue: String,
    prefetch_count: u16,
    concurrency_limit: Option<usize>,
    retry: Option<RetryPolicy>,
    consumers: Vec<Arc<dyn ConsumerPipe>>,
}

impl ReceiveEndpointConfigurator {
    pub(crate) fn new(queue: impl Into<String>) -> Self {
        Self {
            queue: queue.into(),
            prefetch_count: DEFAULT_PREFETCH_COUNT,
            concurrency_limit: None,
            retry: None,
            consumers: Vec::new(),
        }
    }

    pub fn queue_name(&self) -> &str {
        &self.queue
    }

    /// Maximum number of unacknowledged messages held from this queue.
    pub fn set_prefetch_count(&mut self, prefetch_count: u16) -> &mut Self {
        self.prefetch_count = prefetch_count.max(1);
        self
    }

    pub fn prefetch_count(&self) -> u16 {
        self.prefetch_count
    }

    /// Cap on messages handled concurrently, below the prefetch count.
    pub fn set_concurrency_limit(&mut self, limit: usize) -> &mut Self {
        self.concurrency_limit = Some(limit.max(1));
        self
    }

    pub fn concurrency_limit(&self) -> Option<usize> {
        self.concurrency_limit
    }

    /// Replace the retry policy for messages failing on this endpoint.
    pub fn use_message_retry(&mut self, policy: RetryPolicy) -> &mut Self {
        self.retry = Some(policy);
        self
    }

    pub fn retry_policy(&self) -> Option<&RetryPolicy> {
        self.retry.as_ref()
    }

    pub fn consumer_count(&self) -> usize {
        self.consumers.len()
    }

    /// Message types consumed on this endpoint, in binding order.
    pub fn message_types(&self) -> Vec<MessageType> {
        self.consumers.iter().map(|c| c.message_type()).collect()
    }

    /// Type names of the bound consumers, in binding order.
    pub fn consumer_names(&self) -> Vec<&'static str> {
        self.consumers.iter().map(|c| c.consumer_name()).collect()
    }

    pub(crate) fn bind(&mut self, pipe: Arc<dyn ConsumerPipe>) {
        self.consumers.push(pipe);
    }

    pub(crate) fn build(&self) -> ReceiveEndpoint {
        ReceiveEndpoint {
            queue: self.queue.clone(),
            in_flight_limit: self.in_flight_limit(),
            retry: self.retry.clone().unwrap_or_else(RetryPolicy::none),
            consumers: self.consumers.clone(),
        }
    }

    fn in_flight_limit(&self) -> usize {
        let prefetch = usize::from(self.prefetch_count);
        self.concurrency_limit
            .map_or(prefetch, |limit| limit.min(prefetch))
    }
}

impl fmt::Debug for ReceiveEndpointConfigurator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReceiveEndpointConfigurator")
            .field("queue", &self.queue)
            .field("prefetch_count", &self.prefetch_count)
            .field("concurrency_limit", &self.concurrency_limit)
            .field("retry", &self.retry)
            .field("consumers", &self.consumer_names())
            .finish()
    }
}

/// A receive endpoint frozen for running.
pub(crate) struct ReceiveEndpoint {
    pub(crate) queue: String,
    pub(crate) in_flight_limit: usize,
    pub(crate) retry: RetryPolicy,
    pub(crate) consumers: Vec<Arc<dyn ConsumerPipe>>,
}

impl ReceiveEndpoint {
    pub(crate) fn consumers_for(&self, message_type: &str) -> Vec<Arc<dyn ConsumerPipe>> {
        self.consumers
            .iter()
            .filter(|c| c.message_type().urn() == message_type)
            .cloned()
            .collect()
    }

    pub(crate) fn error_queue(&self) -> String {
        format!("{}_error", self.queue)
    }

    pub(crate) fn skipped_queue(&self) -> String {
        format!("{}_skipped", self.queue)
    }
}

/// Transport hints for a fire-and-forget route, encoded as URL parameters
/// appended to the destination queue name.
///
/// ```
/// use bus_conventions::bus::SendEndpointConfigurator;
///
/// let mut send = SendEndpointConfigurator::default();
/// send.durable(false).exchange_type("fanout");
/// assert_eq!(send.url_params(), "?durable=false&type=fanout");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendEndpointConfigurator {
    durable: Option<bool>,
    auto_delete: Option<bool>,
    exchange_type: Option<String>,
    bind_queue: Option<bool>,
    queue: Option<String>,
}

impl SendEndpointConfigurator {
    pub fn durable(&mut self, durable: bool) -> &mut Self {
        self.durable = Some(durable);
        self
    }

    pub fn auto_delete(&mut self, auto_delete: bool) -> &mut Self {
        self.auto_delete = Some(auto_delete);
        self
    }

    pub fn exchange_type(&mut self, exchange_type: impl Into<String>) -> &mut Self {
        self.exchange_type = Some(exchange_type.into());
        self
    }

    /// Bind a queue to the destination exchange on first send.
    pub fn bind_queue(&mut self, bind: bool) -> &mut Self {
        self.bind_queue = Some(bind);
        self
    }

    /// Name of the queue bound when `bind_queue` is set.
    pub fn queue(&mut self, queue: impl Into<String>) -> &mut Self {
        self.queue = Some(queue.into());
        self
    }

    /// `?key=value&...` for every hint that was set, or an empty string.
    pub fn url_params(&self) -> String {
        let mut params = Vec::new();
        if let Some(durable) = self.durable {
            params.push(format!("durable={}", durable));
        }
        if let Some(auto_delete) = self.auto_delete {
            params.push(format!("autodelete={}", auto_delete));
        }
        if let Some(exchange_type) = &self.exchange_type {
            params.push(format!("type={}", exchange_type));
        }
        if let Some(bind) = self.bind_queue {
            params.push(format!("bind={}", bind));
        }
        if let Some(queue) = &self.queue {
            params.push(format!("queue={}", queue));
        }

        if params.is_empty() {
            String::new()
        } else {
            format!("?{}", params.join("&"))
        }
    }
}
