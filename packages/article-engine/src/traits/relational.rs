//! Relational gateway for the CMS internal-linking metadata table.
//!
//! The pipeline's only direct database surface: select-check, duplicate
//! cleanup, and upsert of one metadata row per post.

use async_trait::async_trait;

use crate::error::Result;

/// Gateway to the CMS relational database.
#[async_trait]
pub trait RelationalGateway: Send + Sync {
    /// Run a SELECT; rows come back as positional JSON values.
    async fn query(
        &self,
        sql: &str,
        params: &[serde_json::Value],
    ) -> Result<Vec<Vec<serde_json::Value>>>;

    /// Run a statement; returns affected row count.
    async fn execute(&self, sql: &str, params: &[serde_json::Value]) -> Result<u64>;
}
