use serde::{Deserialize, Serialize};

use bus_conventions::{DomainEvent, Message, MessageType};

/// Contract-style event; its queue segment drops the leading `I`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentReceived {
    pub invoice_id: String,
    pub amount_cents: u64,
}

impl Message for PaymentReceived {
    const TYPE: MessageType = MessageType::contract("Billing.Events", "IPaymentReceived");
}

impl DomainEvent for PaymentReceived {}

impl PaymentReceived {
    pub fn new(invoice_id: &str, amount_cents: u64) -> Self {
        Self {
            invoice_id: invoice_id.to_string(),
            amount_cents,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceRequested {
    pub order_id: String,
}

bus_conventions::message_type!(InvoiceRequested, "Billing.Commands");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateMetadataCommand {
    pub file_id: u64,
}

impl Message for UpdateMetadataCommand {
    const TYPE: MessageType = MessageType::new("Imouto.Lilin.Messages", "UpdateMetadataCommand");
}
