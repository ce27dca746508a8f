use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::cart::{CartLine, CartSnapshot};
use crate::domain::conversation::UserId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PurchaseRequestId(pub String);

impl PurchaseRequestId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseRequestStatus {
    Submitted,
    Approved,
    Rejected,
}

impl PurchaseRequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Submitted => "submitted",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "submitted" => Some(Self::Submitted),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PurchaseRequestSnapshot {
    pub id: PurchaseRequestId,
    pub user_id: UserId,
    pub lines: Vec<CartLine>,
    pub estimated_total: Decimal,
    pub notes: Option<String>,
    pub status: PurchaseRequestStatus,
    pub submitted_at: DateTime<Utc>,
}

impl PurchaseRequestSnapshot {
    /// Freezes the cart content at checkout time.
    pub fn from_cart(cart: CartSnapshot, notes: Option<String>) -> Self {
        Self {
            id: PurchaseRequestId::generate(),
            user_id: cart.user_id,
            estimated_total: cart.estimated_total,
            lines: cart.lines,
            notes: notes.filter(|value| !value.trim().is_empty()),
            status: PurchaseRequestStatus::Submitted,
            submitted_at: Utc::now(),
        }
    }
}
