use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{
    CartItemId, FeedbackId, NotificationId, OrderId, OrderStatus, ProductId, ShopId, UserId,
};

/// One batch of a paged resource.
///
/// `is_last_page` is authoritative for end-of-data; a short page is not
/// necessarily the final one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub is_last_page: bool,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, is_last_page: bool) -> Self {
        Self {
            items,
            is_last_page,
        }
    }

    pub fn last(items: Vec<T>) -> Self {
        Self::new(items, true)
    }

    pub fn more(items: Vec<T>) -> Self {
        Self::new(items, false)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageQuery {
    pub page: u32,
    pub page_size: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackEntry {
    pub feedback_id: FeedbackId,
    pub shop_id: ShopId,
    pub author_id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,
    pub rating: u8,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub cart_item_id: CartItemId,
    pub product_id: ProductId,
    pub shop_id: ShopId,
    pub name: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: OrderId,
    pub shop_id: ShopId,
    pub status: OrderStatus,
    pub total_cents: i64,
    pub item_count: u32,
    pub placed_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pickup_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub notification_id: NotificationId,
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub read: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<OrderId>,
    pub created_at: DateTime<Utc>,
}
