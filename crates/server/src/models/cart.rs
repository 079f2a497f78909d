//! Cart line as shown to the customer.

use rust_decimal::Decimal;
use serde::Serialize;

use stockroom_core::{CartItemId, ProductId};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub id: CartItemId,
    pub product_id: ProductId,
    pub product_name: String,
    pub product_price: Decimal,
    pub product_image: Option<String>,
    pub quantity: i32,
    /// `product_price * quantity` at the product's current price.
    pub subtotal: Decimal,
}
