//! Normalized grid request.
//!
//! Both wire protocol versions are parsed into the same [`RequestModel`]
//! before they reach the query engine. Field names follow the current
//! protocol; every member is optional on the wire and falls back to the
//! client's defaults.

use serde::{Deserialize, Serialize};

/// Page length meaning "return every record".
pub const ALL_RECORDS: i64 = -1;

/// Default page length used by grid clients.
pub const DEFAULT_PAGE_LENGTH: i64 = 10;

/// A normalized data request from a grid client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestModel {
    /// Draw counter echoed back in the response.
    pub draw: i64,
    /// Offset of the first row on the page.
    pub start: u64,
    /// Page length, or [`ALL_RECORDS`].
    pub length: i64,
    /// Global free-text search.
    pub search: SearchSpec,
    /// Requested ordering, most significant first.
    pub order: Vec<OrderRequest>,
    /// Display columns in client order.
    pub columns: Vec<ColumnSpec>,
}

/// A search value as sent by the client.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSpec {
    /// Search text.
    pub value: String,
    /// Whether the client asked for regex matching (not honoured; matching is substring).
    pub regex: bool,
}

/// One order entry referencing a column by index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRequest {
    /// Index into [`RequestModel::columns`].
    pub column: usize,
    /// Sort direction.
    #[serde(default)]
    pub dir: SortDirection,
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Ascending order.
    #[default]
    Asc,
    /// Descending order.
    Desc,
}

/// A display column as sent by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnSpec {
    /// Data source of the column: a dotted field path or an array index.
    pub data: String,
    /// Optional column name.
    pub name: String,
    /// Whether the column takes part in searching.
    pub searchable: bool,
    /// Whether the column may be ordered on.
    pub orderable: bool,
    /// Column-specific search.
    pub search: SearchSpec,
}

impl Default for ColumnSpec {
    fn default() -> Self {
        Self {
            data: String::new(),
            name: String::new(),
            searchable: true,
            orderable: true,
            search: SearchSpec::default(),
        }
    }
}

impl ColumnSpec {
    /// Create a searchable, orderable column for a data path.
    pub fn new(data: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            ..Self::default()
        }
    }

    /// Set whether the column is searchable.
    pub fn searchable(mut self, searchable: bool) -> Self {
        self.searchable = searchable;
        self
    }

    /// Set whether the column is orderable.
    pub fn orderable(mut self, orderable: bool) -> Self {
        self.orderable = orderable;
        self
    }

    /// Set the column-specific search value.
    pub fn with_search(mut self, value: impl Into<String>) -> Self {
        self.search.value = value.into();
        self
    }
}

impl Default for RequestModel {
    fn default() -> Self {
        Self {
            draw: 0,
            start: 0,
            length: DEFAULT_PAGE_LENGTH,
            search: SearchSpec::default(),
            order: Vec::new(),
            columns: Vec::new(),
        }
    }
}

impl RequestModel {
    /// Create an empty request with default paging.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the draw counter.
    pub fn with_draw(mut self, draw: i64) -> Self {
        self.draw = draw;
        self
    }

    /// Set the page window.
    pub fn with_page(mut self, start: u64, length: i64) -> Self {
        self.start = start;
        self.length = length;
        self
    }

    /// Set the global search value.
    pub fn with_search(mut self, value: impl Into<String>) -> Self {
        self.search.value = value.into();
        self
    }

    /// Append a column.
    pub fn with_column(mut self, column: ColumnSpec) -> Self {
        self.columns.push(column);
        self
    }

    /// Append an order entry.
    pub fn with_order(mut self, column: usize, dir: SortDirection) -> Self {
        self.order.push(OrderRequest { column, dir });
        self
    }

    /// Whether the page length asks for every record.
    pub fn is_all_records(&self) -> bool {
        self.length == ALL_RECORDS
    }

    /// The columns as immutable, index-tagged requests.
    pub fn column_requests(&self) -> Vec<ColumnRequest> {
        self.columns
            .iter()
            .enumerate()
            .map(|(index, c)| ColumnRequest {
                index,
                path: c.data.clone(),
                searchable: c.searchable,
                orderable: c.orderable,
                search_value: c.search.value.clone(),
            })
            .collect()
    }
}

/// One requested display column, tagged with its position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRequest {
    /// Position in the client's column list.
    pub index: usize,
    /// Dotted field path (may be empty or an array index).
    pub path: String,
    /// Whether the column takes part in searching.
    pub searchable: bool,
    /// Whether the column may be ordered on.
    pub orderable: bool,
    /// Column-specific search value.
    pub search_value: String,
}

impl ColumnRequest {
    /// The path if it names a model field.
    ///
    /// Empty, blank and numeric paths (`"3"`, `"1.5"`) belong to
    /// client-only columns and never bind to the model.
    pub fn bindable_path(&self) -> Option<&str> {
        let path = self.path.trim();
        if path.is_empty() || is_numeric_literal(path) {
            None
        } else {
            Some(path)
        }
    }
}

fn is_numeric_literal(path: &str) -> bool {
    path.chars().any(|c| c.is_ascii_digit()) && path.parse::<f64>().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_with_defaults() {
        let json = r#"{
            "draw": 3,
            "columns": [{"data": "name"}, {"data": "customer.email", "searchable": false}],
            "order": [{"column": 1, "dir": "desc"}]
        }"#;
        let request: RequestModel = serde_json::from_str(json).unwrap();

        assert_eq!(request.draw, 3);
        assert_eq!(request.start, 0);
        assert_eq!(request.length, DEFAULT_PAGE_LENGTH);
        assert_eq!(request.columns.len(), 2);
        assert!(request.columns[0].searchable);
        assert!(request.columns[0].orderable);
        assert!(!request.columns[1].searchable);
        assert_eq!(request.order[0].dir, SortDirection::Desc);
    }

    #[test]
    fn test_all_records_sentinel() {
        let request = RequestModel::new().with_page(20, ALL_RECORDS);
        assert!(request.is_all_records());
        assert!(!RequestModel::new().is_all_records());
    }

    #[test]
    fn test_column_requests_are_indexed() {
        let request = RequestModel::new()
            .with_column(ColumnSpec::new("name"))
            .with_column(ColumnSpec::new("email").with_search("x").orderable(false));

        let columns = request.column_requests();
        assert_eq!(columns[1].index, 1);
        assert_eq!(columns[1].path, "email");
        assert_eq!(columns[1].search_value, "x");
        assert!(!columns[1].orderable);
    }

    #[test]
    fn test_bindable_path() {
        let column = |path: &str| ColumnRequest {
            index: 0,
            path: path.into(),
            searchable: true,
            orderable: true,
            search_value: String::new(),
        };

        assert_eq!(column("customer.email").bindable_path(), Some("customer.email"));
        assert_eq!(column("").bindable_path(), None);
        assert_eq!(column("   ").bindable_path(), None);
        assert_eq!(column("3").bindable_path(), None);
        assert_eq!(column("1.5").bindable_path(), None);
        assert_eq!(column("-2").bindable_path(), None);
        assert_eq!(column("nan").bindable_path(), Some("nan"));
    }
}
