//! Transport seam between the convention layer and a concrete broker client.

use async_trait::async_trait;

use super::envelope::Envelope;
use super::routing::EndpointAddress;
use crate::error::TransportError;
use crate::settings::ConnectionSettings;

/// A negotiated host connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Host {
    address: String,
    connection_name: String,
}

impl Host {
    pub fn new(address: impl Into<String>, connection_name: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            connection_name: connection_name.into(),
        }
    }

    /// Base address every endpoint address on this host is built from.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Client-provided name the connection was opened with (the application
    /// name).
    pub fn connection_name(&self) -> &str {
        &self.connection_name
    }

    /// Address of `path` (a queue name, optionally with query parameters) on
    /// this host.
    pub fn endpoint_address(&self, path: &str) -> EndpointAddress {
        EndpointAddress::join(&self.address, path)
    }
}

/// Broker operations the bus relies on.
///
/// Implementations own connection negotiation, framing and delivery. The bus
/// drives them: it declares one queue per receive endpoint, polls each queue
/// from its own task, and acknowledges or moves messages once handled.
///
/// Implementations might include:
/// - `InMemoryTransport` - for testing and single-process scenarios
/// - a RabbitMQ client (lapin, amqprs)
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Open the host connection. Called once per bus, never retried.
    fn connect(
        &self,
        settings: &ConnectionSettings,
        connection_name: &str,
    ) -> Result<Host, TransportError>;

    /// Ensure a queue exists.
    fn declare_queue(&self, queue: &str) -> Result<(), TransportError>;

    /// Deliver an envelope to a send endpoint.
    async fn send(&self, address: &EndpointAddress, envelope: Envelope) -> Result<(), TransportError>;

    /// Take the next envelope from `queue`, if any, without waiting.
    ///
    /// A received envelope stays unacknowledged until [`Transport::ack`].
    async fn receive(&self, queue: &str) -> Result<Option<Envelope>, TransportError>;

    /// Acknowledge a received envelope.
    async fn ack(&self, queue: &str, message_id: &str) -> Result<(), TransportError>;

    /// Put an envelope onto `queue` directly (error, skipped or requeue).
    async fn move_to_queue(&self, queue: &str, envelope: Envelope) -> Result<(), TransportError>;
}
