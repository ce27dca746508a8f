use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::conversation::UserId;
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemId(pub String);

impl ItemId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: ItemId,
    pub name: String,
    pub category: String,
    pub description: String,
    pub estimated_price: Decimal,
    pub created_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

/// Field-level validation shared by the registration endpoint and the
/// RegisterItem tool path.
#[derive(Clone, Debug, PartialEq)]
pub struct NewCatalogItem {
    pub name: String,
    pub category: String,
    pub description: String,
    pub estimated_price: Decimal,
    pub created_by: Option<UserId>,
}

impl NewCatalogItem {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.name.trim().is_empty() {
            return Err(DomainError::InvalidField {
                field: "name",
                reason: "must not be empty".to_string(),
            });
        }
        if self.name.chars().count() > 200 {
            return Err(DomainError::InvalidField {
                field: "name",
                reason: "must be at most 200 characters".to_string(),
            });
        }
        if self.category.trim().is_empty() {
            return Err(DomainError::InvalidField {
                field: "category",
                reason: "must not be empty".to_string(),
            });
        }
        if self.estimated_price < Decimal::ZERO {
            return Err(DomainError::InvalidField {
                field: "estimated_price",
                reason: "must not be negative".to_string(),
            });
        }
        Ok(())
    }

    pub fn into_item(self) -> CatalogItem {
        CatalogItem {
            id: ItemId::generate(),
            name: self.name.trim().to_string(),
            category: self.category.trim().to_string(),
            description: self.description.trim().to_string(),
            estimated_price: self.estimated_price,
            created_by: self.created_by,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::NewCatalogItem;

    fn draft() -> NewCatalogItem {
        NewCatalogItem {
            name: "Ballpoint pen".to_string(),
            category: "stationery".to_string(),
            description: "Blue ink, box of 10".to_string(),
            estimated_price: Decimal::new(450, 2),
            created_by: None,
        }
    }

    #[test]
    fn valid_draft_passes_and_is_trimmed_into_an_item() {
        let mut input = draft();
        input.name = "  Ballpoint pen ".to_string();
        input.validate().expect("valid draft");

        let item = input.into_item();
        assert_eq!(item.name, "Ballpoint pen");
        assert!(!item.id.0.is_empty());
    }

    #[test]
    fn empty_name_is_rejected() {
        let mut input = draft();
        input.name = "   ".to_string();
        assert!(input.validate().is_err());
    }

    #[test]
    fn negative_price_is_rejected() {
        let mut input = draft();
        input.estimated_price = Decimal::new(-100, 2);
        assert!(input.validate().is_err());
    }
}
