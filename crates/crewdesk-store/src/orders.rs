//! Order documents.

use chrono::{DateTime, Utc};
use crewdesk_core::{DocumentId, Order, OrderStatus, Participants, WithId};
use serde_json::{json, Value};

use crate::collection::{Collection, Entity, Page};
use crate::constraint::{filter, order_by, Constraint, Direction, FilterOp};
use crate::cursor::Cursor;
use crate::db::DocumentDb;
use crate::error::StoreError;
use crate::subscription::Subscription;

impl Entity for Order {
    const COLLECTION: &'static str = "orders";
}

/// Stored form of the order date fields: Unix milliseconds.
fn timestamp(at: DateTime<Utc>) -> Value {
    json!(at.timestamp_millis())
}

/// Access to the `orders` collection.
#[derive(Debug, Clone)]
pub struct OrderService {
    orders: Collection<Order>,
}

impl OrderService {
    pub fn new(db: &DocumentDb) -> Self {
        Self {
            orders: db.collection_for::<Order>(),
        }
    }

    pub fn collection(&self) -> &Collection<Order> {
        &self.orders
    }

    /// Store a new order with its financials recomputed.
    pub async fn create(&self, order: &Order) -> Result<DocumentId, StoreError> {
        let mut order = order.clone();
        order.recompute_financials();
        self.orders.create(&order).await
    }

    pub async fn get_one(&self, id: &DocumentId) -> Result<Option<WithId<Order>>, StoreError> {
        self.orders.get_one(id).await
    }

    pub async fn delete(&self, id: &DocumentId) -> Result<(), StoreError> {
        self.orders.delete(id).await
    }

    pub async fn find_by_status(&self, status: OrderStatus) -> Result<Vec<WithId<Order>>, StoreError> {
        self.orders.get_all_by_field("status", status.as_str()).await
    }

    pub async fn set_status(
        &self,
        id: &DocumentId,
        status: OrderStatus,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.orders
            .update(id, &json!({ "status": status, "updatedAt": timestamp(at) }))
            .await
    }

    /// Replace the booked employees and refresh the denormalised totals.
    pub async fn set_participants(
        &self,
        id: &DocumentId,
        participants: Participants,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut order = self
            .orders
            .get_one(id)
            .await?
            .ok_or_else(|| StoreError::NotFound {
                collection: Order::COLLECTION.to_string(),
                id: id.to_string(),
            })?
            .into_data();
        order.participants = participants;
        order.recompute_financials();
        self.orders
            .update(
                id,
                &json!({
                    "participants": order.participants,
                    "financials": order.financials,
                    "updatedAt": timestamp(at),
                }),
            )
            .await
    }

    fn upcoming_constraints(from: DateTime<Utc>) -> Vec<Constraint> {
        vec![
            filter("date", FilterOp::Ge, timestamp(from)),
            order_by("date", Direction::Asc),
        ]
    }

    /// Orders dated at or after `from`, soonest first.
    pub async fn upcoming(&self, from: DateTime<Utc>) -> Result<Vec<WithId<Order>>, StoreError> {
        self.orders.query(&Self::upcoming_constraints(from)).await
    }

    pub fn subscribe_upcoming(
        &self,
        from: DateTime<Utc>,
    ) -> Result<Subscription<Vec<WithId<Order>>>, StoreError> {
        self.orders.subscribe_all(&Self::upcoming_constraints(from))
    }

    /// Order history, newest first.
    pub async fn history_page(
        &self,
        page_size: usize,
        cursor: Option<&Cursor>,
    ) -> Result<Page<Order>, StoreError> {
        self.orders
            .query_with_pagination(&[order_by("date", Direction::Desc)], page_size, cursor)
            .await
    }
}
