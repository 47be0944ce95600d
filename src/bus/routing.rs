//! Endpoint addresses and the fire-and-forget route table.

use std::collections::HashMap;
use std::fmt;

use crate::naming::MessageType;

/// Fully qualified address of a send endpoint, e.g.
/// `rabbitmq://broker/Billing_billing_events_payment_received?durable=false`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EndpointAddress(String);

impl EndpointAddress {
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    /// Join `path` onto `base`, inserting a `/` unless `base` already ends
    /// with one.
    pub fn join(base: &str, path: &str) -> Self {
        if base.is_empty() || base.ends_with('/') {
            Self(format!("{}{}", base, path))
        } else {
            Self(format!("{}/{}", base, path))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The last path segment without query parameters.
    pub fn queue_name(&self) -> &str {
        let path = self.0.split('?').next().unwrap_or_default();
        path.rsplit('/').next().unwrap_or_default()
    }

    /// Query parameters appended to the address, in order.
    pub fn params(&self) -> Vec<(&str, &str)> {
        match self.0.split_once('?') {
            Some((_, query)) => query
                .split('&')
                .filter(|pair| !pair.is_empty())
                .map(|pair| pair.split_once('=').unwrap_or((pair, "")))
                .collect(),
            None => Vec::new(),
        }
    }
}

impl fmt::Display for EndpointAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Maps message types to the address they are sent to when no explicit
/// destination is given.
///
/// Populated while the bus is configured and frozen afterwards. Mapping the
/// same type twice replaces the earlier address.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: HashMap<MessageType, EndpointAddress>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `message_type` to `address`, returning the address it replaced.
    pub fn map(
        &mut self,
        message_type: MessageType,
        address: EndpointAddress,
    ) -> Option<EndpointAddress> {
        self.routes.insert(message_type, address)
    }

    pub fn lookup(&self, message_type: &MessageType) -> Option<&EndpointAddress> {
        self.routes.get(message_type)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&MessageType, &EndpointAddress)> {
        self.routes.iter()
    }
}
