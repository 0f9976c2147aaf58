// crates/db/src/source.rs
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::query::Query;
use crate::DbResult;

/// Rows and optional exact count returned for one query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResponse {
    pub rows: Vec<Value>,
    pub count: Option<u64>,
}

impl QueryResponse {
    pub fn decode<T: DeserializeOwned>(&self) -> DbResult<Vec<T>> {
        self.rows
            .iter()
            .map(|row| T::deserialize(row).map_err(Into::into))
            .collect()
    }

    /// The exact count, or 0 when the backend did not report one.
    pub fn total(&self) -> usize {
        self.count.unwrap_or(0) as usize
    }
}

/// Anything that can answer a PostgREST-shaped query.
#[async_trait]
pub trait DataSource: Send + Sync {
    async fn execute(&self, query: &Query) -> DbResult<QueryResponse>;
}

/// Single-column projections used by the scans.
#[derive(Debug, Deserialize)]
pub(crate) struct SessionRow {
    #[serde(default)]
    pub session_id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SessionTimestampRow {
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PhoneRow {
    #[serde(default)]
    pub phone_number: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crysta_view_core::Lead;
    use serde_json::json;

    #[test]
    fn test_decode_rows() {
        let resp = QueryResponse {
            rows: vec![json!({"id": 1, "phone_number": "9876543210"}), json!({"id": 2})],
            count: Some(2),
        };
        let leads: Vec<Lead> = resp.decode().unwrap();
        assert_eq!(leads.len(), 2);
        assert_eq!(leads[0].phone_number, "9876543210");
        assert_eq!(resp.total(), 2);
    }

    #[test]
    fn test_decode_rejects_wrong_shape() {
        let resp = QueryResponse {
            rows: vec![json!("not an object")],
            count: None,
        };
        assert!(resp.decode::<Lead>().is_err());
        assert_eq!(resp.total(), 0);
    }
}
