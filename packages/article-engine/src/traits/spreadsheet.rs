//! Spreadsheet gateway: the keyword queue and its status columns.

use async_trait::async_trait;
use std::collections::HashMap;

use crate::error::Result;

/// One spreadsheet row, keyed by header name.
pub type SheetRow = HashMap<String, String>;

/// Column names the pipeline reads and writes.
pub mod columns {
    pub const KEYWORD: &str = "keyword";
    pub const USED: &str = "used";
    pub const SUITABLE: &str = "suitable";
    pub const UNIQUE: &str = "unique";
    pub const TITLE: &str = "title";
    pub const POST_ID: &str = "post_id";
    pub const POST_URL: &str = "post_url";

    pub const YES: &str = "yes";
    pub const NO: &str = "no";
}

/// Gateway to the keyword spreadsheet.
#[async_trait]
pub trait SpreadsheetGateway: Send + Sync {
    /// Read all rows of a sheet.
    async fn read_rows(&self, sheet: &str) -> Result<Vec<SheetRow>>;

    /// Update the row whose `key_column` equals `key_value`.
    async fn update_row(
        &self,
        sheet: &str,
        key_column: &str,
        key_value: &str,
        updates: &[(String, String)],
    ) -> Result<()>;
}

/// Build an update set, with owned strings for the gateway call.
pub fn updates(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}
