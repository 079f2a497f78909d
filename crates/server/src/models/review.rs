use chrono::{DateTime, Utc};
use serde::Serialize;

use stockroom_core::{ProductId, ReviewId, UserId};

/// A customer's rating of a purchased product.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: ReviewId,
    pub user_id: UserId,
    pub user_name: String,
    pub product_id: ProductId,
    pub rating: i16,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
