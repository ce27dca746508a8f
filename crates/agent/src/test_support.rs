//! Doubles shared by this crate's tests: a counting gateway and a
//! scripted completion client.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use rust_decimal::Decimal;

use procura_core::domain::cart::{CartLine, CartSnapshot};
use procura_core::domain::catalog::{CatalogItem, ItemId, NewCatalogItem};
use procura_core::domain::conversation::UserId;
use procura_core::domain::purchase::PurchaseRequestSnapshot;
use procura_core::errors::ToolError;

use crate::llm::{CompletionClient, CompletionError};
use crate::tools::ToolGateway;

/// Counts every gateway invocation; optionally fails each call with a
/// primed error.
#[derive(Default)]
pub(crate) struct CountingGateway {
    pub calls: AtomicUsize,
    pub fail_with: Option<fn() -> ToolError>,
}

impl CountingGateway {
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn outcome<T>(&self, value: T) -> Result<T, ToolError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.fail_with {
            Some(make_err) => Err(make_err()),
            None => Ok(value),
        }
    }
}

#[async_trait]
impl ToolGateway for CountingGateway {
    async fn search_catalog(
        &self,
        _keyword: Option<&str>,
        _limit: u32,
    ) -> Result<Vec<CatalogItem>, ToolError> {
        self.outcome(vec![sample_item()])
    }

    async fn register_item(&self, item: NewCatalogItem) -> Result<CatalogItem, ToolError> {
        self.outcome(item.into_item())
    }

    async fn add_to_cart(
        &self,
        user_id: &UserId,
        _item_id: &ItemId,
        quantity: u32,
    ) -> Result<CartSnapshot, ToolError> {
        self.outcome(sample_cart(user_id.clone(), quantity))
    }

    async fn view_cart(&self, user_id: &UserId) -> Result<CartSnapshot, ToolError> {
        self.outcome(sample_cart(user_id.clone(), 1))
    }

    async fn checkout(
        &self,
        user_id: &UserId,
        notes: Option<&str>,
    ) -> Result<PurchaseRequestSnapshot, ToolError> {
        self.outcome(PurchaseRequestSnapshot::from_cart(
            sample_cart(user_id.clone(), 1),
            notes.map(str::to_string),
        ))
    }
}

pub(crate) fn sample_item() -> CatalogItem {
    NewCatalogItem {
        name: "Laptop stand".to_string(),
        category: "office".to_string(),
        description: String::new(),
        estimated_price: Decimal::new(3500, 2),
        created_by: None,
    }
    .into_item()
}

pub(crate) fn sample_cart(user_id: UserId, quantity: u32) -> CartSnapshot {
    CartSnapshot::from_lines(
        user_id,
        vec![CartLine {
            item_id: ItemId("i-1".to_string()),
            item_name: "Laptop stand".to_string(),
            quantity,
            unit_estimate: Decimal::new(3500, 2),
        }],
    )
}

/// Plays back a queue of canned completions; fails once the queue runs
/// dry unless a fallback is set.
pub(crate) struct ScriptedClient {
    outputs: Mutex<VecDeque<Result<String, String>>>,
    pub fallback: Option<String>,
}

impl ScriptedClient {
    pub fn new(outputs: impl IntoIterator<Item = &'static str>) -> Self {
        Self {
            outputs: Mutex::new(
                outputs.into_iter().map(|raw| Ok(raw.to_string())).collect(),
            ),
            fallback: None,
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            outputs: Mutex::new(VecDeque::from([Err(reason.to_string())])),
            fallback: Some(reason.to_string()),
        }
    }
}

#[async_trait]
impl CompletionClient for ScriptedClient {
    async fn complete(&self, _system: &str, _prompt: &str) -> Result<String, CompletionError> {
        let next = self.outputs.lock().unwrap().pop_front();
        match next {
            Some(Ok(text)) => Ok(text),
            Some(Err(reason)) => Err(CompletionError::Provider(reason)),
            None => match &self.fallback {
                Some(reason) => Err(CompletionError::Provider(reason.clone())),
                None => Ok("Anything else I can help with?".to_string()),
            },
        }
    }
}
