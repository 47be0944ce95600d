//! Service Bus - conventions over a broker transport
//!
//! This module wires typed consumers and fire-and-forget routes onto a
//! single host connection, naming every queue after the message type it
//! carries.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 build_bus (per application)                  │
//! │  - connects the host, runs the setup callback once          │
//! └─────────────────────────────────────────────────────────────┘
//!                            │
//!                            ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  ConventionConfigurator                      │
//! │  add_consumer::<C, M>()       → {app}_{ns}_{type} endpoint   │
//! │  add_fire_and_forget::<M>(t)  → route M to {t}_{ns}_{type}   │
//! └─────────────────────────────────────────────────────────────┘
//!                            │
//!                            ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                           Bus                                │
//! │  start() / stop() / send(), one task per receive endpoint   │
//! └─────────────────────────────────────────────────────────────┘
//!                            │
//!                            ▼
//! ┌──────────────────┐    ┌─────────────────────────────────────┐
//! │InMemoryTransport │    │ broker client implementing Transport │
//! │   (included)     │    │            (external)               │
//! └──────────────────┘    └─────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let services = ServiceProvider::new().with_singleton(PaymentConsumer::new());
//!
//! let bus = build_bus(transport, &settings, "Billing", services, |cfg| {
//!     cfg.add_consumer::<PaymentConsumer, PaymentReceived>()?
//!         .add_fire_and_forget::<InvoiceRequested>("Invoicing")?;
//!     Ok(())
//! })?;
//!
//! bus.start().await?;
//! bus.send(&InvoiceRequested { .. }).await?;
//! let stats = bus.stop().await?;
//! ```

mod builder;
#[allow(clippy::module_inception)]
mod bus;
mod configurator;
mod consumer;
mod endpoint;
mod envelope;
#[cfg(feature = "in-memory")]
mod in_memory;
mod routing;
mod services;
mod transport;

pub use builder::build_bus;
pub use bus::{Bus, EndpointStats, DEFAULT_POLL_INTERVAL};
pub use configurator::{BusConfigurator, ConventionConfigurator};
pub use consumer::{ConsumeContext, Consumer};
pub use endpoint::{ReceiveEndpointConfigurator, SendEndpointConfigurator, DEFAULT_PREFETCH_COUNT};
pub use envelope::{Envelope, FAULT_REASON_HEADER, FAULT_RETRIES_HEADER};
#[cfg(feature = "in-memory")]
pub use in_memory::InMemoryTransport;
pub use routing::{EndpointAddress, RouteTable};
pub use services::ServiceProvider;
pub use transport::{Host, Transport};
