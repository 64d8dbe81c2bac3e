use std::collections::HashMap;
use std::sync::Arc;

use super::row::{CustomDbRow, index_columns};
use crate::types::ParamValue;

/// Materialized rows returned by a query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    /// The rows returned by the query
    pub results: Vec<CustomDbRow>,
    /// The number of rows affected (for DML statements)
    pub rows_affected: usize,
    column_names: Arc<Vec<String>>,
    column_index: Arc<HashMap<String, usize>>,
}

impl ResultSet {
    /// Empty result with the given columns.
    #[must_use]
    pub fn with_columns(column_names: Vec<String>) -> Self {
        let column_index = Arc::new(index_columns(&column_names));
        Self {
            results: Vec::new(),
            rows_affected: 0,
            column_names: Arc::new(column_names),
            column_index,
        }
    }

    #[must_use]
    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    /// Append a row; values are matched to columns by position.
    pub fn add_row_values(&mut self, row_values: Vec<ParamValue>) {
        self.results.push(CustomDbRow {
            column_names: Arc::clone(&self.column_names),
            rows: row_values,
            column_index: Arc::clone(&self.column_index),
        });
        self.rows_affected += 1;
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}
