use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use stockroom_core::{ProductId, WishlistItemId};

/// A saved product in a customer's wishlist.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistEntry {
    pub id: WishlistItemId,
    pub product_id: ProductId,
    pub product_name: String,
    pub product_price: Decimal,
    pub product_image: Option<String>,
    pub created_at: DateTime<Utc>,
}
