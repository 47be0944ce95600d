//! Domain event publishing through fire-and-forget routes.

mod support;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bus_conventions::bus::{
    build_bus, EndpointAddress, Envelope, Host, InMemoryTransport, ServiceProvider, Transport,
};
use bus_conventions::{
    BusError, BusEventPublisher, CancellationToken, ConnectionSettings, EventPublisher,
    TransportError,
};

use support::{bus_for, settings};
use support::messages::PaymentReceived;

const PAYMENTS: &str = "Billing_billing_events_payment_received";

fn publisher(transport: &InMemoryTransport) -> BusEventPublisher {
    let bus = bus_for(transport, "Shop", ServiceProvider::new(), |cfg| {
        cfg.add_fire_and_forget::<PaymentReceived>("Billing")?;
        Ok(())
    })
    .unwrap();
    BusEventPublisher::new(Arc::new(bus))
}

#[tokio::test]
async fn publish_sends_along_the_route() {
    let transport = InMemoryTransport::new();
    let publisher = publisher(&transport);

    publisher
        .publish(PaymentReceived::new("inv-1", 500), &CancellationToken::new())
        .await
        .unwrap();

    let queued = transport.messages(PAYMENTS);
    assert_eq!(queued.len(), 1);
    assert_eq!(
        queued[0].decode::<PaymentReceived>().unwrap(),
        PaymentReceived::new("inv-1", 500)
    );
}

#[tokio::test]
async fn cancelled_publish_sends_nothing() {
    let transport = InMemoryTransport::new();
    let publisher = publisher(&transport);
    let cancellation = CancellationToken::new();
    cancellation.cancel();

    let result = publisher
        .publish(PaymentReceived::new("inv-1", 500), &cancellation)
        .await;

    assert!(matches!(result, Err(BusError::Cancelled)));
    assert!(transport.is_empty(PAYMENTS));
}

#[tokio::test]
async fn transport_rejection_surfaces() {
    let transport = InMemoryTransport::new().reject_sends("queue full");
    let publisher = publisher(&transport);

    let result = publisher
        .publish(PaymentReceived::new("inv-1", 500), &CancellationToken::new())
        .await;

    assert!(matches!(result, Err(BusError::TransportFailure(_))));
}

#[tokio::test]
async fn event_without_route_is_reported() {
    let transport = InMemoryTransport::new();
    let bus = bus_for(&transport, "Shop", ServiceProvider::new(), |_| Ok(())).unwrap();
    let publisher = BusEventPublisher::new(Arc::new(bus));

    let result = publisher
        .publish(PaymentReceived::new("inv-1", 500), &CancellationToken::new())
        .await;

    assert!(matches!(result, Err(BusError::RouteNotFound(_))));
    assert!(publisher.bus().routes().is_empty());
}

/// Holds every send for `delay` before handing it to the in-memory broker.
struct SlowSends {
    inner: InMemoryTransport,
    delay: Duration,
}

#[async_trait]
impl Transport for SlowSends {
    fn connect(
        &self,
        settings: &ConnectionSettings,
        connection_name: &str,
    ) -> Result<Host, TransportError> {
        self.inner.connect(settings, connection_name)
    }

    fn declare_queue(&self, queue: &str) -> Result<(), TransportError> {
        self.inner.declare_queue(queue)
    }

    async fn send(&self, address: &EndpointAddress, envelope: Envelope) -> Result<(), TransportError> {
        tokio::time::sleep(self.delay).await;
        self.inner.send(address, envelope).await
    }

    async fn receive(&self, queue: &str) -> Result<Option<Envelope>, TransportError> {
        self.inner.receive(queue).await
    }

    async fn ack(&self, queue: &str, message_id: &str) -> Result<(), TransportError> {
        self.inner.ack(queue, message_id).await
    }

    async fn move_to_queue(&self, queue: &str, envelope: Envelope) -> Result<(), TransportError> {
        self.inner.move_to_queue(queue, envelope).await
    }
}

fn slow_publisher(transport: &InMemoryTransport) -> BusEventPublisher {
    let slow = SlowSends {
        inner: transport.clone(),
        delay: Duration::from_secs(60),
    };
    let bus = build_bus(slow, &settings(), "Shop", ServiceProvider::new(), |cfg| {
        cfg.add_fire_and_forget::<PaymentReceived>("Billing")?;
        Ok(())
    })
    .unwrap();
    BusEventPublisher::new(Arc::new(bus))
}

#[tokio::test(start_paused = true)]
async fn cancellation_during_send_abandons_it() {
    let transport = InMemoryTransport::new();
    let publisher = slow_publisher(&transport);
    let cancellation = CancellationToken::new();

    let trigger = cancellation.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        trigger.cancel();
    });

    let result = publisher
        .publish(PaymentReceived::new("inv-1", 500), &cancellation)
        .await;
    assert!(matches!(result, Err(BusError::Cancelled)));

    // The abandoned send never reaches the broker
    tokio::time::sleep(Duration::from_secs(120)).await;
    assert!(transport.is_empty(PAYMENTS));
}

#[tokio::test(start_paused = true)]
async fn slow_send_completes_without_cancellation() {
    let transport = InMemoryTransport::new();
    let publisher = slow_publisher(&transport);

    publisher
        .publish(PaymentReceived::new("inv-1", 500), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(transport.len(PAYMENTS), 1);
}
