//! Shared test domain: billing messages and instrumented consumers.

#![allow(dead_code)]

pub mod consumers;
pub mod messages;

use bus_conventions::bus::{build_bus, Bus, ConventionConfigurator, InMemoryTransport, ServiceProvider};
use bus_conventions::{BusError, ConnectionSettings};
use std::sync::Once;
use tracing_subscriber::EnvFilter;

pub const BROKER_URL: &str = "rabbitmq://broker/";

pub fn settings() -> ConnectionSettings {
    ConnectionSettings::new(BROKER_URL, "guest", "guest")
}

static TRACING: Once = Once::new();

/// Route bus logs to the test writer, filtered by `RUST_LOG`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Build a bus for `application` on a clone of `transport`.
pub fn bus_for<F>(
    transport: &InMemoryTransport,
    application: &str,
    services: ServiceProvider,
    setup: F,
) -> Result<Bus, BusError>
where
    F: FnOnce(&mut ConventionConfigurator) -> Result<(), BusError>,
{
    init_tracing();
    build_bus(transport.clone(), &settings(), application, services, setup)
}
