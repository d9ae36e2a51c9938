use async_trait::async_trait;

use crate::api::{BlogFilter, BlogId, BlogSummary, Comment};

/// The read side of the server, as seen by the pagination state
#[async_trait]
pub trait Backend {
    async fn count_blogs(&self, filter: &BlogFilter) -> anyhow::Result<u64>;
    async fn fetch_blogs(&self, filter: &BlogFilter, page: u64)
        -> anyhow::Result<Vec<BlogSummary>>;
    async fn fetch_comments(&self, blog: &BlogId, skip: u64) -> anyhow::Result<Vec<Comment>>;
}
