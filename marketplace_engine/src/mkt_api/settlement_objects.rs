use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::db_types::Money;

/// A provider callback, translated into what it means for the marketplace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SettlementEvent {
    /// Funds were captured. `order_id` comes from the metadata or reference the marketplace attached to the payment;
    /// if it is missing the order is found by `payment_intent_id`.
    PaymentSucceeded {
        order_id: Option<i64>,
        payment_intent_id: String,
        charge_id: Option<String>,
        amount: Money,
        marketplace_fee: Option<Money>,
    },
    PaymentFailed {
        order_id: Option<i64>,
        payment_intent_id: String,
    },
    AccountUpdated {
        account_id: String,
        charges_enabled: bool,
        payouts_enabled: bool,
        metadata: Value,
    },
    Refunded {
        charge_id: String,
    },
    Ignored {
        reason: String,
    },
}

impl SettlementEvent {
    pub fn ignored<S: Into<String>>(reason: S) -> Self {
        Self::Ignored { reason: reason.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookOutcome {
    /// The event changed marketplace state.
    Processed,
    /// The event, or the payment it reports, had already been handled.
    Duplicate,
    /// Nothing to do for this event.
    Ignored,
}
