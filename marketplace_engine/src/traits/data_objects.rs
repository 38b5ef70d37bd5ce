use crate::db_types::{Order, Transaction, WebhookEvent};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedWebhookEvent {
    pub event: WebhookEvent,
    /// False if this delivery had been logged before
    pub is_new: bool,
}

impl RecordedWebhookEvent {
    /// A redelivery of an event that was already handled successfully.
    pub fn is_duplicate(&self) -> bool {
        !self.is_new && self.event.processed
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettlementResult {
    Settled { order: Order, transaction: Transaction },
    AlreadySettled(Order),
}
