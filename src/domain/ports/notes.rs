//! Port trait for per-item detail notes.
//!
//! Notes are append-only human-readable text keyed by item id. The core
//! writes new sections but never rewrites prior ones.

use async_trait::async_trait;

use crate::domain::errors::HuntResult;
use crate::domain::models::work_item::ItemId;

#[async_trait]
pub trait DetailNotes: Send + Sync {
    /// Full notes for an item, or None if nothing was written yet.
    async fn load(&self, item_id: &ItemId) -> HuntResult<Option<String>>;

    /// Append a titled section. The title becomes a `## ...` heading.
    async fn append(&self, item_id: &ItemId, title: &str, body: &str) -> HuntResult<()>;

    /// Remove an item's notes entirely (used by `clear` only).
    async fn remove(&self, item_id: &ItemId) -> HuntResult<()>;
}
