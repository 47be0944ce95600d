//! Conventions for wiring applications onto a message bus.
//!
//! - [`naming`] derives queue names from message types
//! - [`RetryPolicy`] is the retry schedule every consumer starts with
//! - [`bus::build_bus`] connects one host and registers typed consumers and
//!   fire-and-forget routes through a [`bus::ConventionConfigurator`]
//! - [`EventPublisher`] publishes domain events along those routes

pub mod bus;
mod error;
mod events;
pub mod naming;
mod retry;
mod settings;

pub use error::{BusError, ConsumeError, TransportError};
pub use events::{BusEventPublisher, DomainEvent, EventPublisher};
pub use naming::{queue_name, Message, MessageType};
pub use retry::RetryPolicy;
pub use settings::ConnectionSettings;

// Re-export the cancellation token used by `EventPublisher::publish`
pub use tokio_util::sync::CancellationToken;
