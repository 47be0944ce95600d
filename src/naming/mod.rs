//! Queue naming convention.
//!
//! Every queue name is derived from the owning application and the message
//! type it carries:
//!
//! ```text
//! {application}_{namespace_snake}_{type_snake}
//! ```
//!
//! Producers and consumers running in different processes compute the same
//! string independently, so the algorithm here is a wire contract: changing
//! it orphans every queue already declared on the broker.
//!
//! ```
//! use bus_conventions::naming::{queue_name, MessageType};
//!
//! let ty = MessageType::contract("Billing.Events", "IPaymentReceived");
//! assert_eq!(
//!     queue_name("Billing", &ty).unwrap(),
//!     "Billing_billing_events_payment_received"
//! );
//! ```

mod underscore;

use std::fmt;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::BusError;

pub use underscore::underscore;

/// Static identity of a message type: namespace path, type name and whether
/// it is declared as a contract (interface-style) type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageType {
    namespace: &'static str,
    name: &'static str,
    is_interface: bool,
}

impl MessageType {
    /// A concrete message type. The name is used verbatim.
    pub const fn new(namespace: &'static str, name: &'static str) -> Self {
        Self {
            namespace,
            name,
            is_interface: false,
        }
    }

    /// A contract message type. A leading `I` is dropped from names that look
    /// like `ISomething`.
    pub const fn contract(namespace: &'static str, name: &'static str) -> Self {
        Self {
            namespace,
            name,
            is_interface: true,
        }
    }

    pub fn namespace(&self) -> &'static str {
        self.namespace
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_interface(&self) -> bool {
        self.is_interface
    }

    /// True when the type is a contract whose name matches `^I[A-Z]`.
    pub fn is_interface_style(&self) -> bool {
        if !self.is_interface {
            return false;
        }
        let mut chars = self.name.chars();
        chars.next() == Some('I') && chars.next().is_some_and(|c| c.is_ascii_uppercase())
    }

    /// The type name with the interface prefix removed where applicable.
    pub fn display_name(&self) -> &'static str {
        if self.is_interface_style() {
            &self.name[1..]
        } else {
            self.name
        }
    }

    /// Message type header value carried on every envelope.
    pub fn urn(&self) -> String {
        format!("urn:message:{}:{}", self.namespace, self.name)
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}.{}", self.namespace, self.name)
        }
    }
}

/// A message that can travel over the bus.
///
/// ```
/// use bus_conventions::{Message, MessageType};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize)]
/// struct OrderCreated {
///     id: String,
/// }
///
/// impl Message for OrderCreated {
///     const TYPE: MessageType = MessageType::new("Shop.Orders", "OrderCreated");
/// }
/// ```
pub trait Message: Serialize + DeserializeOwned + Send + Sync + 'static {
    const TYPE: MessageType;
}

/// Implement [`Message`] for a type, using its identifier as the type name.
///
/// ```ignore
/// bus_conventions::message_type!(OrderCreated, "Shop.Orders");
/// bus_conventions::message_type!(IPaymentReceived, "Billing.Events", contract);
/// ```
#[macro_export]
macro_rules! message_type {
    ($ty:ident, $namespace:expr, contract) => {
        impl $crate::Message for $ty {
            const TYPE: $crate::MessageType =
                $crate::MessageType::contract($namespace, stringify!($ty));
        }
    };
    ($ty:ident, $namespace:expr) => {
        impl $crate::Message for $ty {
            const TYPE: $crate::MessageType = $crate::MessageType::new($namespace, stringify!($ty));
        }
    };
}

/// `{namespace_snake}_{display_snake}`. The namespace separators are removed
/// before conversion, so `Billing.Events` becomes `billing_events`.
pub fn type_slug(message_type: &MessageType) -> String {
    let namespace = underscore(&message_type.namespace().replace('.', ""));
    let name = underscore(message_type.display_name());
    format!("{}_{}", namespace, name)
}

/// Resolve the queue name for `message_type` owned by `application_name`.
///
/// An empty namespace is not rejected; it yields an empty segment
/// (`App__name`), matching queues already deployed with that shape.
///
/// Names are unique per distinct `(namespace, display name)` pair only. A
/// contract `Ns.IFoo` and a concrete `Ns.Foo` share one queue, so a
/// namespace must not declare both.
pub fn queue_name(application_name: &str, message_type: &MessageType) -> Result<String, BusError> {
    if application_name.is_empty() {
        return Err(BusError::invalid("application name must not be empty"));
    }
    Ok(format!(
        "{}_{}",
        application_name,
        underscore(&type_slug(message_type))
    ))
}

/// [`queue_name`] for a statically known message type.
pub fn queue_name_for<M: Message>(application_name: &str) -> Result<String, BusError> {
    queue_name(application_name, &M::TYPE)
}
