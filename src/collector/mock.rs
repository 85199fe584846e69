//! In-memory source for tests and offline demos.

use crate::catalog::CellFormat;
use crate::engine::Cell;

use super::{CollectError, SourceConnection};

/// Canned `SourceConnection`. Rows are returned as-is; an injected error is
/// reported once per fetch until cleared.
pub struct MockSource {
    name: String,
    rows: Vec<Vec<Cell>>,
    error: Option<String>,
    fetch_count: usize,
    last_query: Option<String>,
}

impl MockSource {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            rows: Vec::new(),
            error: None,
            fetch_count: 0,
            last_query: None,
        }
    }

    pub fn set_rows(&mut self, rows: Vec<Vec<Cell>>) {
        self.rows = rows;
    }

    pub fn set_error(&mut self, msg: &str) {
        self.error = Some(msg.to_string());
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    pub fn fetch_count(&self) -> usize {
        self.fetch_count
    }

    pub fn last_query(&self) -> Option<&str> {
        self.last_query.as_deref()
    }
}

impl SourceConnection for MockSource {
    fn source_name(&self) -> &str {
        &self.name
    }

    fn fetch_rows(
        &mut self,
        query: &str,
        _formats: &[CellFormat],
    ) -> Result<Vec<Vec<Cell>>, CollectError> {
        self.fetch_count += 1;
        self.last_query = Some(query.to_string());
        if let Some(msg) = &self.error {
            return Err(CollectError::Query(msg.clone()));
        }
        Ok(self.rows.clone())
    }
}
