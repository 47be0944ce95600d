//! In-memory transport for testing and single-process scenarios.
//!
//! This module provides a thread-safe transport that keeps every queue in
//! process memory, useful for:
//! - Unit and integration testing without a broker
//! - Single-process applications
//! - Development and prototyping

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use super::envelope::Envelope;
use super::routing::EndpointAddress;
use super::transport::{Host, Transport};
use crate::error::TransportError;
use crate::settings::ConnectionSettings;

/// In-memory transport.
///
/// Features:
/// - Cheap to clone; clones share the same queues, so a test can keep a
///   handle while the bus owns another
/// - Queues are FIFO; `receive` pops from the front
/// - Sending to an undeclared queue declares it
/// - Failure injection for connect, declare and send
///
/// ## Example
///
/// ```
/// use bus_conventions::bus::{Envelope, InMemoryTransport};
///
/// let transport = InMemoryTransport::new();
/// transport.enqueue("shop_orders", Envelope::new("urn:message:Shop:OrderCreated", b"{}".to_vec()));
///
/// assert_eq!(transport.len("shop_orders"), 1);
/// ```
#[derive(Clone, Default)]
pub struct InMemoryTransport {
    state: Arc<Mutex<State>>,
}

#[derive(Default)]
struct State {
    queues: HashMap<String, VecDeque<Envelope>>,
    acked: Vec<String>,
    sent: Vec<EndpointAddress>,
    connections: Vec<String>,
    refuse_connections: Option<String>,
    refuse_declare: HashSet<String>,
    reject_sends: Option<String>,
}

impl InMemoryTransport {
    /// Create a new in-memory transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `connect` fail with `reason`.
    pub fn refuse_connections(self, reason: impl Into<String>) -> Self {
        self.lock().refuse_connections = Some(reason.into());
        self
    }

    /// Make declaring `queue` fail.
    pub fn refuse_declare(self, queue: impl Into<String>) -> Self {
        self.lock().refuse_declare.insert(queue.into());
        self
    }

    /// Make every `send` fail with `reason`.
    pub fn reject_sends(self, reason: impl Into<String>) -> Self {
        self.lock().reject_sends = Some(reason.into());
        self
    }

    /// Put an envelope straight onto a queue, declaring it if needed.
    pub fn enqueue(&self, queue: &str, envelope: Envelope) {
        self.lock()
            .queues
            .entry(queue.to_string())
            .or_default()
            .push_back(envelope);
    }

    /// Declared queue names, sorted.
    pub fn queue_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.lock().queues.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn is_declared(&self, queue: &str) -> bool {
        self.lock().queues.contains_key(queue)
    }

    /// Envelopes waiting on `queue`, front first.
    pub fn messages(&self, queue: &str) -> Vec<Envelope> {
        self.lock()
            .queues
            .get(queue)
            .map(|q| q.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of envelopes waiting on `queue`.
    pub fn len(&self, queue: &str) -> usize {
        self.lock().queues.get(queue).map_or(0, VecDeque::len)
    }

    pub fn is_empty(&self, queue: &str) -> bool {
        self.len(queue) == 0
    }

    /// Acknowledged message ids, in acknowledgement order.
    pub fn acknowledged(&self) -> Vec<String> {
        self.lock().acked.clone()
    }

    /// Addresses passed to `send`, in order.
    pub fn sent_addresses(&self) -> Vec<EndpointAddress> {
        self.lock().sent.clone()
    }

    /// Connection names `connect` was called with.
    pub fn connections(&self) -> Vec<String> {
        self.lock().connections.clone()
    }

    /// Clear all queues and bookkeeping (useful for test cleanup).
    pub fn clear(&self) {
        let mut state = self.lock();
        state.queues.clear();
        state.acked.clear();
        state.sent.clear();
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl Transport for InMemoryTransport {
    fn connect(
        &self,
        settings: &ConnectionSettings,
        connection_name: &str,
    ) -> Result<Host, TransportError> {
        let mut state = self.lock();
        if let Some(reason) = &state.refuse_connections {
            return Err(TransportError::ConnectionFailed(format!(
                "{}: {}",
                settings.url, reason
            )));
        }
        state.connections.push(connection_name.to_string());

        let address = if settings.url.ends_with('/') {
            settings.url.clone()
        } else {
            format!("{}/", settings.url)
        };
        Ok(Host::new(address, connection_name))
    }

    fn declare_queue(&self, queue: &str) -> Result<(), TransportError> {
        let mut state = self.lock();
        if state.refuse_declare.contains(queue) {
            return Err(TransportError::DeclareFailed {
                queue: queue.to_string(),
                reason: "refused".to_string(),
            });
        }
        state.queues.entry(queue.to_string()).or_default();
        Ok(())
    }

    async fn send(&self, address: &EndpointAddress, envelope: Envelope) -> Result<(), TransportError> {
        let queue = address.queue_name();
        if queue.is_empty() {
            return Err(TransportError::UnknownDestination(address.to_string()));
        }

        let mut state = self.lock();
        if let Some(reason) = &state.reject_sends {
            return Err(TransportError::Rejected(reason.clone()));
        }
        state.sent.push(address.clone());
        state
            .queues
            .entry(queue.to_string())
            .or_default()
            .push_back(envelope);
        Ok(())
    }

    async fn receive(&self, queue: &str) -> Result<Option<Envelope>, TransportError> {
        Ok(self
            .lock()
            .queues
            .get_mut(queue)
            .and_then(VecDeque::pop_front))
    }

    async fn ack(&self, _queue: &str, message_id: &str) -> Result<(), TransportError> {
        self.lock().acked.push(message_id.to_string());
        Ok(())
    }

    async fn move_to_queue(&self, queue: &str, envelope: Envelope) -> Result<(), TransportError> {
        self.enqueue(queue, envelope);
        Ok(())
    }
}
