use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::catalog::ItemId;
use crate::domain::conversation::UserId;
use crate::errors::DomainError;

pub const MIN_CART_QUANTITY: u32 = 1;
pub const MAX_CART_QUANTITY: u32 = 999;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    pub item_id: ItemId,
    pub item_name: String,
    pub quantity: u32,
    pub unit_estimate: Decimal,
}

impl CartLine {
    pub fn line_total(&self) -> Decimal {
        self.unit_estimate * Decimal::from(self.quantity)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CartSnapshot {
    pub user_id: UserId,
    pub lines: Vec<CartLine>,
    pub estimated_total: Decimal,
}

impl CartSnapshot {
    pub fn from_lines(user_id: UserId, lines: Vec<CartLine>) -> Self {
        let estimated_total = lines.iter().map(CartLine::line_total).sum();
        Self { user_id, lines, estimated_total }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

pub fn validate_quantity(quantity: u32) -> Result<(), DomainError> {
    if !(MIN_CART_QUANTITY..=MAX_CART_QUANTITY).contains(&quantity) {
        return Err(DomainError::InvalidField {
            field: "quantity",
            reason: format!("must be between {MIN_CART_QUANTITY} and {MAX_CART_QUANTITY}"),
        });
    }
    Ok(())
}
