use std::collections::HashMap;
use std::sync::Arc;

use crate::types::ParamValue;

/// A row from a query result.
///
/// Column names and the name-to-index map are shared by every row of the
/// owning [`ResultSet`](super::ResultSet).
#[derive(Debug, Clone, PartialEq)]
pub struct CustomDbRow {
    /// The column names for this row (shared across all rows in a result set)
    pub column_names: Arc<Vec<String>>,
    /// The values for this row
    pub rows: Vec<ParamValue>,
    #[doc(hidden)]
    pub(crate) column_index: Arc<HashMap<String, usize>>,
}

impl CustomDbRow {
    /// Create a standalone row, building its own column index.
    #[must_use]
    pub fn new(column_names: Arc<Vec<String>>, rows: Vec<ParamValue>) -> Self {
        let column_index = Arc::new(index_columns(&column_names));
        Self {
            column_names,
            rows,
            column_index,
        }
    }

    #[must_use]
    pub fn get_column_index(&self, column_name: &str) -> Option<usize> {
        self.column_index.get(column_name).copied()
    }

    /// Get a value from the row by column name
    #[must_use]
    pub fn get(&self, column_name: &str) -> Option<&ParamValue> {
        self.get_column_index(column_name)
            .and_then(|idx| self.rows.get(idx))
    }

    /// Get a value from the row by column index
    #[must_use]
    pub fn get_by_index(&self, index: usize) -> Option<&ParamValue> {
        self.rows.get(index)
    }
}

pub(super) fn index_columns(column_names: &[String]) -> HashMap<String, usize> {
    let mut index = HashMap::with_capacity(column_names.len());
    for (i, name) in column_names.iter().enumerate() {
        // first occurrence wins for duplicate column labels
        index.entry(name.clone()).or_insert(i);
    }
    index
}
