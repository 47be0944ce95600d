//! Bus construction.

use std::sync::Arc;

use tracing::{error, info};

use super::bus::Bus;
use super::configurator::{BusConfigurator, ConventionConfigurator};
use super::services::ServiceProvider;
use super::transport::Transport;
use crate::error::BusError;
use crate::settings::ConnectionSettings;

/// Connect to the broker and assemble a bus for `application_name`.
///
/// `setup` runs once, synchronously, with the configurator context; this is
/// where consumers and routes are registered. Any error from connecting or
/// from `setup` fails the whole construction, and nothing is returned that
/// could be started.
///
/// ```
/// use bus_conventions::bus::{build_bus, InMemoryTransport, ServiceProvider};
/// use bus_conventions::ConnectionSettings;
///
/// let bus = build_bus(
///     InMemoryTransport::new(),
///     &ConnectionSettings::default(),
///     "Billing",
///     ServiceProvider::new(),
///     |_cfg| Ok(()),
/// )
/// .unwrap();
///
/// assert_eq!(bus.application_name(), "Billing");
/// assert!(!bus.is_running());
/// ```
pub fn build_bus<T, F>(
    transport: T,
    settings: &ConnectionSettings,
    application_name: &str,
    services: ServiceProvider,
    setup: F,
) -> Result<Bus, BusError>
where
    T: Transport,
    F: FnOnce(&mut ConventionConfigurator) -> Result<(), BusError>,
{
    if application_name.is_empty() {
        return Err(BusError::invalid("application name must not be empty"));
    }
    settings.validate()?;

    let transport: Arc<dyn Transport> = Arc::new(transport);
    let host = transport.connect(settings, application_name)?;
    info!(application = application_name, host = host.address(), "host connected");

    let mut configurator = ConventionConfigurator::new(
        application_name,
        Arc::new(services),
        BusConfigurator::new(Arc::clone(&transport), host),
    );

    if let Err(err) = setup(&mut configurator) {
        error!(application = application_name, error = %err, "bus setup failed");
        return Err(err);
    }

    let (application_name, bus) = configurator.into_parts();
    let (transport, host, endpoints, routes) = bus.into_parts();
    Ok(Bus::new(application_name, transport, host, &endpoints, routes))
}
