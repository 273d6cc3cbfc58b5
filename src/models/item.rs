use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// Default and maximum page sizes for item listings.
pub const DEFAULT_PAGE_SIZE: i64 = 50;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Input structure for creating an item.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct ItemInput {
    /// The title of the item, 1 to 255 characters.
    #[validate(length(min = 1, max = 255))]
    pub title: String,

    /// Optional free-form description, at most 5000 characters.
    #[validate(length(max = 5000))]
    pub description: Option<String>,

    /// The folder the item is filed under.
    pub folder_id: i64,
}

/// Input structure for updating an item. Absent fields are left unchanged.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct ItemUpdate {
    #[validate(length(min = 1, max = 255))]
    pub title: Option<String>,

    #[validate(length(max = 5000))]
    pub description: Option<String>,

    /// Moves the item to another folder of the same user.
    pub folder_id: Option<i64>,
}

/// An item as stored in the database and returned by the API.
#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct Item {
    pub id: i64,
    /// Stable public identifier (UUID v4).
    pub external_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub folder_id: i64,
    pub created_at: DateTime<Utc>,
}

/// Keyset pagination parameters for item listings, newest first.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ItemQuery {
    /// Page size; defaults to 50 and is capped at 100.
    pub limit: Option<i64>,
    /// Only return items created strictly before this instant.
    pub before: Option<DateTime<Utc>>,
    /// Together with `before`, the `id` of the last item already seen. Items
    /// created at exactly `before` with a smaller id are then returned too.
    pub before_id: Option<i64>,
}

impl ItemQuery {
    /// Id half of the `(created_at, id)` cursor. Without `before_id` no item
    /// created at `before` itself qualifies.
    pub fn cursor_id(&self) -> i64 {
        self.before_id.unwrap_or(i64::MIN)
    }

    pub fn page_size(&self) -> i64 {
        self.limit
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }
}
