//! Stock update flow that drives the out-of-stock alert.
//!
//! Decrements are applied one item at a time. Store failures abort the
//! batch; the alert is best effort and its failure only annotates the
//! outcome.

use crate::alert::{StockoutAlert, StockoutEvent};
use crate::error::InventoryError;
use crate::mailer::Mailer;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// Current stock of one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockLevel {
    pub sku: String,
    pub product_name: String,
    pub quantity: u32,
}

/// Requested reduction for one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockDecrement {
    pub sku: String,
    pub amount: u32,
}

impl StockDecrement {
    pub fn new(sku: impl Into<String>, amount: u32) -> Self {
        Self {
            sku: sku.into(),
            amount,
        }
    }
}

/// Result of a batch update.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StockUpdateOutcome {
    /// Levels after the update, in request order.
    pub updated: Vec<StockLevel>,
    pub alert_sent: bool,
    /// Set when stock was saved but the alert could not be sent.
    pub notice: Option<String>,
}

/// Persistence seam for stock levels.
#[async_trait]
pub trait StockStore: Send + Sync {
    async fn load(&self, sku: &str) -> Result<StockLevel, InventoryError>;

    async fn save_quantity(&self, sku: &str, quantity: u32) -> Result<(), InventoryError>;
}

/// Apply `decrements` and send at most one alert for every item that ran out.
///
/// `actor` is the address of whoever made the change; it is shown in the
/// alert and is the last-resort recipient.
///
/// # Errors
///
/// The first `InventoryError` from the store. Items after it are untouched
/// and no alert is sent.
pub async fn apply_stock_decrements(
    store: &dyn StockStore,
    mailer: &Mailer,
    decrements: &[StockDecrement],
    actor: Option<&str>,
    recipient_override: Option<&str>,
) -> Result<StockUpdateOutcome, InventoryError> {
    let mut outcome = StockUpdateOutcome::default();
    let mut stockouts = Vec::new();

    for decrement in decrements {
        let mut level = store.load(&decrement.sku).await?;
        let before = level.quantity;
        level.quantity = before.saturating_sub(decrement.amount);
        store.save_quantity(&level.sku, level.quantity).await?;

        tracing::debug!(
            sku = %level.sku,
            before,
            after = level.quantity,
            "Stock decremented"
        );

        if before > 0 && level.quantity == 0 {
            stockouts.push(StockoutEvent::new(&level.sku, &level.product_name));
        }
        outcome.updated.push(level);
    }

    let alert = StockoutAlert {
        items: stockouts,
        updated_by: actor.map(String::from),
        recipient_override: recipient_override.map(String::from),
    };

    match mailer.send_out_of_stock_alert(alert).await {
        Ok(sent) => outcome.alert_sent = sent,
        Err(e) => {
            tracing::warn!(error = %e, "Stock updated but out-of-stock alert failed");
            outcome.notice = Some(format!(
                "stock updated, but the out-of-stock alert could not be sent: {}",
                e
            ));
        }
    }

    Ok(outcome)
}

/// In-memory [`StockStore`], handy for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryStockStore {
    levels: Mutex<HashMap<String, StockLevel>>,
}

impl MemoryStockStore {
    pub fn new(levels: impl IntoIterator<Item = StockLevel>) -> Self {
        let levels = levels
            .into_iter()
            .map(|level| (level.sku.clone(), level))
            .collect();
        Self {
            levels: Mutex::new(levels),
        }
    }

    /// Current quantity for `sku`, if known.
    pub fn quantity(&self, sku: &str) -> Option<u32> {
        self.lock().ok()?.get(sku).map(|level| level.quantity)
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, StockLevel>>, InventoryError> {
        self.levels
            .lock()
            .map_err(|_| InventoryError::Store("stock table lock poisoned".to_string()))
    }
}

#[async_trait]
impl StockStore for MemoryStockStore {
    async fn load(&self, sku: &str) -> Result<StockLevel, InventoryError> {
        self.lock()?
            .get(sku)
            .cloned()
            .ok_or_else(|| InventoryError::NotFound(sku.to_string()))
    }

    async fn save_quantity(&self, sku: &str, quantity: u32) -> Result<(), InventoryError> {
        let mut levels = self.lock()?;
        let level = levels
            .get_mut(sku)
            .ok_or_else(|| InventoryError::NotFound(sku.to_string()))?;
        level.quantity = quantity;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MailSettings, SenderFallbacks, WebhookSettings};
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn level(sku: &str, name: &str, quantity: u32) -> StockLevel {
        StockLevel {
            sku: sku.to_string(),
            product_name: name.to_string(),
            quantity,
        }
    }

    fn mailer(url: Option<String>) -> Mailer {
        Mailer::new(MailSettings {
            senders: SenderFallbacks {
                email_from: Some("shop@example.com".to_string()),
                ..Default::default()
            },
            webhook: url.map(|url| WebhookSettings { url, key: None }),
            ..Default::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn quantity_never_goes_below_zero() {
        let store = MemoryStockStore::new([level("A1", "Widget", 2)]);
        let outcome = apply_stock_decrements(
            &store,
            &mailer(None),
            &[StockDecrement::new("A1", 5)],
            None,
            None,
        )
        .await
        .unwrap();

        assert_eq!(store.quantity("A1"), Some(0));
        assert_eq!(outcome.updated[0].quantity, 0);
    }

    #[tokio::test]
    async fn no_stockout_means_no_alert() {
        let store = MemoryStockStore::new([level("A1", "Widget", 10)]);
        let outcome = apply_stock_decrements(
            &store,
            &mailer(None),
            &[StockDecrement::new("A1", 3)],
            Some("clerk@example.com"),
            None,
        )
        .await
        .unwrap();

        assert_eq!(store.quantity("A1"), Some(7));
        assert!(!outcome.alert_sent);
        assert_eq!(outcome.notice, None);
    }

    #[tokio::test]
    async fn already_empty_item_is_not_a_new_stockout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let store = MemoryStockStore::new([level("A1", "Widget", 0)]);
        let outcome = apply_stock_decrements(
            &store,
            &mailer(Some(server.uri())),
            &[StockDecrement::new("A1", 1)],
            Some("clerk@example.com"),
            None,
        )
        .await
        .unwrap();
        assert!(!outcome.alert_sent);
    }

    #[tokio::test]
    async fn unknown_item_aborts_the_batch() {
        let store = MemoryStockStore::new([level("A1", "Widget", 5), level("B2", "Gadget", 5)]);
        let err = apply_stock_decrements(
            &store,
            &mailer(None),
            &[
                StockDecrement::new("A1", 1),
                StockDecrement::new("ZZ", 1),
                StockDecrement::new("B2", 1),
            ],
            None,
            None,
        )
        .await
        .unwrap_err();

        assert_eq!(err, InventoryError::NotFound("ZZ".to_string()));
        assert_eq!(store.quantity("A1"), Some(4));
        assert_eq!(store.quantity("B2"), Some(5));
    }

    #[tokio::test]
    async fn alert_failure_is_reported_as_notice() {
        let store = MemoryStockStore::new([level("A1", "Widget", 1)]);
        // No transport configured, so the alert cannot go out.
        let outcome = apply_stock_decrements(
            &store,
            &mailer(None),
            &[StockDecrement::new("A1", 1)],
            Some("clerk@example.com"),
            None,
        )
        .await
        .unwrap();

        assert_eq!(store.quantity("A1"), Some(0));
        assert!(!outcome.alert_sent);
        let notice = outcome.notice.unwrap();
        assert!(notice.starts_with("stock updated, but the out-of-stock alert could not be sent"));
    }
}
