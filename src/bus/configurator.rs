//! Bus configuration handles passed to the setup callback.

use std::any::type_name;
use std::sync::Arc;

use tracing::{debug, info};

use super::consumer::{Consumer, TypedConsumerPipe};
use super::endpoint::{ReceiveEndpointConfigurator, SendEndpointConfigurator};
use super::routing::{EndpointAddress, RouteTable};
use super::services::ServiceProvider;
use super::transport::{Host, Transport};
use crate::error::BusError;
use crate::naming::{queue_name, Message, MessageType};
use crate::retry::RetryPolicy;

/// Transport-level bus configuration: receive endpoints and routes.
///
/// Endpoints are created by the consumer conventions; routes can also be
/// mapped here directly to an explicit address.
pub struct BusConfigurator {
    transport: Arc<dyn Transport>,
    host: Host,
    endpoints: Vec<ReceiveEndpointConfigurator>,
    routes: RouteTable,
}

impl BusConfigurator {
    pub(crate) fn new(transport: Arc<dyn Transport>, host: Host) -> Self {
        Self {
            transport,
            host,
            endpoints: Vec::new(),
            routes: RouteTable::new(),
        }
    }

    pub fn host(&self) -> &Host {
        &self.host
    }

    /// Register a receive endpoint on `queue`.
    ///
    /// `configure` runs before anything reaches the transport; the queue is
    /// declared afterwards and a declaration failure leaves no endpoint
    /// behind. Each queue can be registered once.
    pub(crate) fn receive_endpoint<F>(&mut self, queue: &str, configure: F) -> Result<(), BusError>
    where
        F: FnOnce(&mut ReceiveEndpointConfigurator),
    {
        if queue.is_empty() {
            return Err(BusError::invalid("receive endpoint queue name must not be empty"));
        }
        if self.endpoint(queue).is_some() {
            return Err(BusError::invalid(format!(
                "receive endpoint {} is already configured",
                queue
            )));
        }

        let mut endpoint = ReceiveEndpointConfigurator::new(queue);
        configure(&mut endpoint);

        self.transport.declare_queue(queue)?;
        debug!(queue, consumers = endpoint.consumer_count(), "receive endpoint declared");
        self.endpoints.push(endpoint);
        Ok(())
    }

    pub fn endpoints(&self) -> &[ReceiveEndpointConfigurator] {
        &self.endpoints
    }

    pub fn endpoint(&self, queue: &str) -> Option<&ReceiveEndpointConfigurator> {
        self.endpoints.iter().find(|e| e.queue_name() == queue)
    }

    /// Route messages of `message_type` to `address` when sent without a
    /// destination. Returns the address it replaced.
    pub fn map_route(
        &mut self,
        message_type: MessageType,
        address: EndpointAddress,
    ) -> Option<EndpointAddress> {
        self.routes.map(message_type, address)
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub(crate) fn into_parts(
        self,
    ) -> (
        Arc<dyn Transport>,
        Host,
        Vec<ReceiveEndpointConfigurator>,
        RouteTable,
    ) {
        (self.transport, self.host, self.endpoints, self.routes)
    }
}

/// The context handed to the bus setup callback.
///
/// Carries the application name, the connected host, the service provider
/// consumers are resolved from, and the underlying [`BusConfigurator`].
/// Queue names for consumers and routes are derived from message types via
/// [`queue_name`].
///
/// ```ignore
/// let bus = build_bus(transport, &settings, "Billing", services, |cfg| {
///     cfg.add_consumer::<PaymentConsumer, PaymentReceived>()?
///         .add_fire_and_forget::<InvoiceRequested>("Invoicing")?;
///     Ok(())
/// })?;
/// ```
pub struct ConventionConfigurator {
    application_name: String,
    host: Host,
    services: Arc<ServiceProvider>,
    bus: BusConfigurator,
}

impl ConventionConfigurator {
    pub(crate) fn new(
        application_name: impl Into<String>,
        services: Arc<ServiceProvider>,
        bus: BusConfigurator,
    ) -> Self {
        Self {
            application_name: application_name.into(),
            host: bus.host().clone(),
            services,
            bus,
        }
    }

    pub fn application_name(&self) -> &str {
        &self.application_name
    }

    pub fn host(&self) -> &Host {
        &self.host
    }

    pub fn services(&self) -> &ServiceProvider {
        &self.services
    }

    pub fn bus(&self) -> &BusConfigurator {
        &self.bus
    }

    /// Transport-level configuration outside the conventions, such as routing
    /// a type to an explicit address with [`BusConfigurator::map_route`].
    pub fn bus_mut(&mut self) -> &mut BusConfigurator {
        &mut self.bus
    }

    /// Bind consumer `C` for messages `M` on this application's queue for
    /// `M`, with prefetch 1 and the standard retry policy.
    pub fn add_consumer<C, M>(&mut self) -> Result<&mut Self, BusError>
    where
        C: Consumer<M>,
        M: Message,
    {
        self.add_consumer_with::<C, M, _>(|_| {})
    }

    /// Like [`add_consumer`](Self::add_consumer), then let `customize` tune
    /// the endpoint before the consumer is bound. Anything `customize` sets
    /// overrides the conventions.
    pub fn add_consumer_with<C, M, F>(&mut self, customize: F) -> Result<&mut Self, BusError>
    where
        C: Consumer<M>,
        M: Message,
        F: FnOnce(&mut ReceiveEndpointConfigurator),
    {
        let queue = queue_name(&self.application_name, &M::TYPE)?;
        if !self.services.contains::<C>() {
            return Err(BusError::invalid(format!(
                "consumer {} is not registered with the service provider",
                type_name::<C>()
            )));
        }

        let services = Arc::clone(&self.services);
        self.bus.receive_endpoint(&queue, |endpoint| {
            endpoint.set_prefetch_count(1);
            endpoint.use_message_retry(RetryPolicy::standard());
            customize(endpoint);
            endpoint.bind(Arc::new(TypedConsumerPipe::<C, M>::new(services)));
        })?;

        info!(
            queue = %queue,
            message_type = %M::TYPE,
            consumer = type_name::<C>(),
            "consumer registered"
        );
        Ok(self)
    }

    /// Route `M` to `target_application`'s queue for `M` whenever it is sent
    /// without an explicit destination.
    pub fn add_fire_and_forget<M: Message>(
        &mut self,
        target_application: &str,
    ) -> Result<&mut Self, BusError> {
        self.add_fire_and_forget_with::<M, _>(target_application, |_| {})
    }

    /// Like [`add_fire_and_forget`](Self::add_fire_and_forget), appending the
    /// URL parameters collected by `customize` to the destination.
    pub fn add_fire_and_forget_with<M, F>(
        &mut self,
        target_application: &str,
        customize: F,
    ) -> Result<&mut Self, BusError>
    where
        M: Message,
        F: FnOnce(&mut SendEndpointConfigurator),
    {
        let mut path = queue_name(target_application, &M::TYPE)?;

        let mut send = SendEndpointConfigurator::default();
        customize(&mut send);
        path.push_str(&send.url_params());

        let address = self.host.endpoint_address(&path);
        info!(message_type = %M::TYPE, address = %address, "route registered");
        if let Some(replaced) = self.bus.map_route(M::TYPE, address) {
            debug!(message_type = %M::TYPE, replaced = %replaced, "route replaced");
        }
        Ok(self)
    }

    pub(crate) fn into_parts(self) -> (String, BusConfigurator) {
        (self.application_name, self.bus)
    }
}
