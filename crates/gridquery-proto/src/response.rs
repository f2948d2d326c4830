//! Grid response and its versioned envelope.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// A hydrated row as produced by a query engine.
pub type RawRow = serde_json::Map<String, serde_json::Value>;

/// A reshaped row, ready for the client.
pub type DisplayRow = serde_json::Map<String, serde_json::Value>;

/// Synthetic field carrying the root identifier of a row.
pub const ROW_ID_FIELD: &str = "DT_RowId";

/// Synthetic field carrying a constant CSS class for every row.
pub const ROW_CLASS_FIELD: &str = "DT_RowClass";

/// Wire protocol version of the grid client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProtocolVersion {
    /// Hungarian-notation parameters (`sEcho`, `iDisplayStart`, ...).
    Legacy,
    /// Structured parameters (`draw`, `start`, `columns[i][data]`, ...).
    #[default]
    Current,
}

/// Member names of the response envelope for one protocol version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvelopeKeys {
    pub data: &'static str,
    pub draw: &'static str,
    pub total_records: &'static str,
    pub display_records: &'static str,
}

impl ProtocolVersion {
    /// Envelope member names for this version.
    pub fn envelope_keys(self) -> EnvelopeKeys {
        match self {
            ProtocolVersion::Current => EnvelopeKeys {
                data: "data",
                draw: "draw",
                total_records: "recordsTotal",
                display_records: "recordsFiltered",
            },
            ProtocolVersion::Legacy => EnvelopeKeys {
                data: "aaData",
                draw: "sEcho",
                total_records: "iTotalRecords",
                display_records: "iTotalDisplayRecords",
            },
        }
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolVersion::Legacy => write!(f, "legacy"),
            ProtocolVersion::Current => write!(f, "current"),
        }
    }
}

impl FromStr for ProtocolVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "legacy" | "1.9" => Ok(ProtocolVersion::Legacy),
            "current" | "1.10" => Ok(ProtocolVersion::Current),
            other => Err(Error::UnknownVersion(other.to_string())),
        }
    }
}

/// One page of grid data with its counters.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GridResponse {
    /// Draw counter echoed from the request.
    pub draw: i64,
    /// Number of root entities before filtering.
    pub total_records: u64,
    /// Number of root entities after filtering.
    pub display_records: u64,
    /// Rows of the current page.
    pub data: Vec<DisplayRow>,
}

impl GridResponse {
    /// Render the response with the member names of `version`.
    pub fn to_envelope(&self, version: ProtocolVersion) -> serde_json::Value {
        let keys = version.envelope_keys();
        let mut envelope = serde_json::Map::new();
        envelope.insert(keys.draw.to_string(), serde_json::json!(self.draw));
        envelope.insert(
            keys.total_records.to_string(),
            serde_json::json!(self.total_records),
        );
        envelope.insert(
            keys.display_records.to_string(),
            serde_json::json!(self.display_records),
        );
        envelope.insert(
            keys.data.to_string(),
            serde_json::Value::Array(
                self.data
                    .iter()
                    .cloned()
                    .map(serde_json::Value::Object)
                    .collect(),
            ),
        );
        serde_json::Value::Object(envelope)
    }
}
