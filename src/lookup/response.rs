//! Response envelope types
//!
//! The envelope is stable across signing: when a response signing key is
//! configured the whole envelope is embedded in a JWT claim, otherwise it
//! is the response body itself.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One group's payload inside the envelope
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum GroupData {
    /// Flat result list (no pagination requested)
    Rows(Vec<Value>),
    /// Paginated result window
    Page {
        total: i64,
        page: u32,
        page_size: u32,
        has_next: bool,
        results: Vec<Value>,
    },
    /// Per-group failure that did not fail the request
    Error { error: String },
}

/// Response envelope for one lookup request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResponseEnvelope {
    pub source_id: String,
    pub status: String,
    pub source_status: String,
    pub latency_ms: u64,
    pub data: BTreeMap<String, GroupData>,
}

impl ResponseEnvelope {
    pub fn new(source_id: String, latency_ms: u64, data: BTreeMap<String, GroupData>) -> Self {
        Self {
            source_id,
            status: "ok".to_string(),
            source_status: "live".to_string(),
            latency_ms,
            data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_serializes_flat_and_paged_groups() {
        let mut data = BTreeMap::new();
        data.insert(
            "car_info".to_string(),
            GroupData::Rows(vec![json!({"car_id": 1})]),
        );
        data.insert(
            "owner_info".to_string(),
            GroupData::Page {
                total: 12,
                page: 2,
                page_size: 5,
                has_next: true,
                results: vec![json!({"full_name": "Ada Smith"})],
            },
        );
        data.insert(
            "photo_info".to_string(),
            GroupData::Error {
                error: "schema unavailable: photos".to_string(),
            },
        );

        let envelope = ResponseEnvelope::new("CARSRC".to_string(), 7, data);
        let body = serde_json::to_value(&envelope).unwrap();

        assert_eq!(body["source_id"], "CARSRC");
        assert_eq!(body["status"], "ok");
        assert_eq!(body["source_status"], "live");
        assert_eq!(body["latency_ms"], 7);
        assert_eq!(body["data"]["car_info"], json!([{"car_id": 1}]));
        assert_eq!(body["data"]["owner_info"]["has_next"], json!(true));
        assert_eq!(body["data"]["owner_info"]["total"], json!(12));
        assert_eq!(
            body["data"]["photo_info"],
            json!({"error": "schema unavailable: photos"})
        );
    }

    #[test]
    fn test_envelope_roundtrips_through_json() {
        let mut data = BTreeMap::new();
        data.insert("g".to_string(), GroupData::Rows(vec![json!({"a": 1})]));
        let envelope = ResponseEnvelope::new("SRC".to_string(), 3, data);

        let text = serde_json::to_string(&envelope).unwrap();
        let back: ResponseEnvelope = serde_json::from_str(&text).unwrap();
        assert_eq!(back, envelope);
    }
}
