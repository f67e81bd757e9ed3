//! Order workflow: checkout validation, atomic persistence, status lifecycle.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;

use crate::domain::aggregates::{CheckoutRequest, NewOrder, Order, OrderError, OrderStatus};
use crate::domain::events::{DomainEvent, OrderShipped};
use crate::domain::value_objects::{OrderNumberGenerator, OrderRef};
use crate::services::notifier::{self, Notifier};
use crate::store::{CatalogStore, OrderStore};
use crate::{Result, StorefrontError};

#[derive(Clone, Debug, Serialize)]
pub struct PlacedOrder {
    pub order_id: i64,
    pub order_number: String,
}

/// Optional carrier details sent along with a move to `Shipped`.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ShippingDetails {
    pub tracking_number: Option<String>,
    pub carrier: Option<String>,
    pub estimated_delivery: Option<String>,
}

#[derive(Clone)]
pub struct OrderWorkflow {
    orders: OrderStore,
    catalog: CatalogStore,
    numbers: Arc<OrderNumberGenerator>,
    notifier: Arc<dyn Notifier>,
}

impl OrderWorkflow {
    pub fn new(
        orders: OrderStore,
        catalog: CatalogStore,
        numbers: Arc<OrderNumberGenerator>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self { orders, catalog, numbers, notifier }
    }

    /// Validates the checkout, writes the order with all of its items in one
    /// transaction and queues the confirmation notification.
    pub async fn place_order(&self, request: CheckoutRequest) -> Result<PlacedOrder> {
        let mut order = NewOrder::try_from(request)?;
        self.reconcile_with_catalog(&mut order).await?;

        let number = self.numbers.next();
        let order_id = self.orders.create(&number, &order).await?;
        tracing::info!(order_id, order_number = %number, items = order.items.len(), total = %order.total, "Order placed");

        notifier::dispatch(self.notifier.clone(), DomainEvent::OrderPlaced(order.placed_event(&number)));

        Ok(PlacedOrder { order_id, order_number: number.into_inner() })
    }

    /// Items pointing at a known product must carry its current price and
    /// take its name when they have none. Items pointing at an unknown
    /// product lose the reference.
    async fn reconcile_with_catalog(&self, order: &mut NewOrder) -> Result<()> {
        let ids: Vec<i64> = order.items.iter().filter_map(|item| item.product_id).collect();
        let products = self.catalog.find_many(&ids).await?;

        for (index, item) in order.items.iter_mut().enumerate() {
            match item.product_id.and_then(|id| products.get(&id)) {
                Some(product) => {
                    if !product.price.matches(&item.price) {
                        return Err(StorefrontError::validation(format!(
                            "Item {index}: price {} does not match current price {} of {}",
                            item.price, product.price, product.name
                        )));
                    }
                    if item.name.is_none() {
                        item.name = Some(product.name.clone());
                    }
                }
                None => {
                    if let Some(id) = item.product_id.take() {
                        tracing::debug!(product_id = id, "Order item references unknown product");
                    }
                    if item.name.is_none() {
                        return Err(OrderError::InvalidItem { index, reason: "product not found".to_string() }.into());
                    }
                }
            }
        }
        Ok(())
    }

    /// Looks an order up by surrogate id (all digits) or order number.
    pub async fn get_order(&self, identifier: &str) -> Result<Order> {
        self.orders
            .find(&OrderRef::parse(identifier))
            .await?
            .ok_or_else(|| StorefrontError::not_found("Order not found"))
    }

    pub async fn list_orders(&self, user_id: Option<i64>, email: Option<&str>) -> Result<Vec<Order>> {
        self.orders.list(user_id, email).await
    }

    /// Administrative status change: any listed status may replace any other.
    pub async fn update_order_status(&self, order_id: i64, status: &str, shipping: ShippingDetails) -> Result<Order> {
        let status = OrderStatus::from_str(status.trim())?;
        if !self.orders.set_status(order_id, status).await? {
            return Err(StorefrontError::not_found("Order not found"));
        }
        tracing::info!(order_id, %status, "Order status updated");

        let order = self.get_order(&order_id.to_string()).await?;
        if status == OrderStatus::Shipped {
            let event = DomainEvent::OrderShipped(OrderShipped {
                email: order.email.clone(),
                order_number: order.order_number.clone(),
                tracking_number: shipping.tracking_number,
                carrier: shipping.carrier,
                estimated_delivery: shipping.estimated_delivery,
            });
            notifier::dispatch(self.notifier.clone(), event);
        }
        Ok(order)
    }

    /// Customer cancellation, allowed only while Processing or Shipped.
    pub async fn cancel_order(&self, order_id: i64) -> Result<Order> {
        let order = self.get_order(&order_id.to_string()).await?;
        let from = order.status;
        if !from.can_transition_to(OrderStatus::Cancelled) {
            return Err(OrderError::IllegalTransition { from, to: OrderStatus::Cancelled }.into());
        }
        if !self.orders.compare_and_set_status(order_id, from, OrderStatus::Cancelled).await? {
            return Err(StorefrontError::conflict("Order status changed, try again"));
        }
        tracing::info!(order_id, %from, "Order cancelled");
        self.get_order(&order_id.to_string()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::CheckoutItem;
    use crate::domain::value_objects::Money;
    use crate::services::notifier::LogNotifier;
    use crate::store::{connect_in_memory, seed_catalog};

    async fn workflow() -> OrderWorkflow {
        let pool = connect_in_memory().await.unwrap();
        seed_catalog(&pool).await.unwrap();
        OrderWorkflow::new(
            OrderStore::new(pool.clone()),
            CatalogStore::new(pool),
            Arc::new(OrderNumberGenerator::new()),
            Arc::new(LogNotifier::new("http://localhost:8000")),
        )
    }

    fn checkout(items: Vec<CheckoutItem>, shipping_cents: i64) -> CheckoutRequest {
        let line_totals = items
            .iter()
            .map(|i| i.price.checked_mul(u32::try_from(i.quantity).unwrap_or(0)).unwrap());
        let subtotal = Money::checked_sum(line_totals).unwrap();
        CheckoutRequest {
            email: Some("ada@example.com".into()),
            first_name: Some("Ada".into()),
            last_name: Some("Lovelace".into()),
            address: Some("12 St James's Square".into()),
            city: Some("London".into()),
            state: Some("LDN".into()),
            zip_code: Some("SW1Y".into()),
            phone: Some("555-0101".into()),
            payment_method: Some("card".into()),
            items,
            subtotal: Some(subtotal),
            shipping: Some(Money::from_cents(shipping_cents)),
            total: Some(subtotal.checked_add(Money::from_cents(shipping_cents)).unwrap()),
            ..Default::default()
        }
    }

    fn catalog_item(product_id: i64, cents: i64, quantity: i64) -> CheckoutItem {
        CheckoutItem {
            product_id: Some(product_id),
            name: None,
            price: Money::from_cents(cents),
            quantity,
            size: Some("2-4Y".into()),
            color: None,
        }
    }

    #[tokio::test]
    async fn test_catalog_item_takes_product_name() {
        let workflow = workflow().await;
        let placed = workflow.place_order(checkout(vec![catalog_item(1, 2499, 2)], 599)).await.unwrap();

        let order = workflow.get_order(&placed.order_number).await.unwrap();
        assert_eq!(order.items[0].product_name, "Organic Cotton T-Shirt");
        assert_eq!(order.items[0].product_id, Some(1));
        assert_eq!(order.total, Money::from_cents(5597));
    }

    #[tokio::test]
    async fn test_stale_price_rejected() {
        let workflow = workflow().await;
        let err = workflow.place_order(checkout(vec![catalog_item(1, 100, 1)], 0)).await.unwrap_err();
        assert!(matches!(err, StorefrontError::Validation(msg) if msg.contains("does not match current price")));
        assert!(workflow.list_orders(None, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_product_reference_dropped() {
        let workflow = workflow().await;
        let mut item = catalog_item(999, 1500, 1);
        item.name = Some("Discontinued Cap".into());
        let placed = workflow.place_order(checkout(vec![item], 0)).await.unwrap();

        let order = workflow.get_order(&placed.order_id.to_string()).await.unwrap();
        assert_eq!(order.items[0].product_id, None);
        assert_eq!(order.items[0].product_name, "Discontinued Cap");

        let err = workflow.place_order(checkout(vec![catalog_item(999, 1500, 1)], 0)).await.unwrap_err();
        assert!(matches!(err, StorefrontError::Validation(_)));
    }

    #[tokio::test]
    async fn test_cancel_only_before_delivery() {
        let workflow = workflow().await;
        let placed = workflow.place_order(checkout(vec![catalog_item(2, 1999, 1)], 0)).await.unwrap();

        workflow.update_order_status(placed.order_id, "Shipped", ShippingDetails::default()).await.unwrap();
        let cancelled = workflow.cancel_order(placed.order_id).await.unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);

        let err = workflow.cancel_order(placed.order_id).await.unwrap_err();
        assert!(matches!(err, StorefrontError::Conflict(_)));
        assert!(matches!(workflow.cancel_order(424242).await, Err(StorefrontError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_status_update_errors() {
        let workflow = workflow().await;
        let placed = workflow.place_order(checkout(vec![catalog_item(2, 1999, 1)], 0)).await.unwrap();

        let err = workflow.update_order_status(placed.order_id, "Lost", ShippingDetails::default()).await.unwrap_err();
        assert!(matches!(err, StorefrontError::Validation(_)));
        let err = workflow.update_order_status(9999, "Delivered", ShippingDetails::default()).await.unwrap_err();
        assert!(matches!(err, StorefrontError::NotFound(_)));

        // permissive path allows moving backwards
        workflow.update_order_status(placed.order_id, "Delivered", ShippingDetails::default()).await.unwrap();
        let order = workflow.update_order_status(placed.order_id, "Processing", ShippingDetails::default()).await.unwrap();
        assert_eq!(order.status, OrderStatus::Processing);
    }
}
