//! Domain event publishing over the bus.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::bus::Bus;
use crate::error::BusError;
use crate::naming::Message;

/// Marker for messages raised by the domain.
pub trait DomainEvent: Message {}

/// Publishes domain events without the caller knowing their destination.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish `event`, giving up with [`BusError::Cancelled`] once
    /// `cancellation` fires.
    ///
    /// Cancellation is best-effort: an event the transport has already
    /// accepted is not recalled.
    async fn publish<E: DomainEvent>(
        &self,
        event: E,
        cancellation: &CancellationToken,
    ) -> Result<(), BusError>;
}

/// [`EventPublisher`] sending through a bus's fire-and-forget routes.
#[derive(Clone)]
pub struct BusEventPublisher {
    bus: Arc<Bus>,
}

impl BusEventPublisher {
    pub fn new(bus: Arc<Bus>) -> Self {
        Self { bus }
    }

    pub fn bus(&self) -> &Bus {
        &self.bus
    }
}

#[async_trait]
impl EventPublisher for BusEventPublisher {
    async fn publish<E: DomainEvent>(
        &self,
        event: E,
        cancellation: &CancellationToken,
    ) -> Result<(), BusError> {
        if cancellation.is_cancelled() {
            return Err(BusError::Cancelled);
        }
        tokio::select! {
            biased;
            _ = cancellation.cancelled() => Err(BusError::Cancelled),
            result = self.bus.send(&event) => result,
        }
    }
}
