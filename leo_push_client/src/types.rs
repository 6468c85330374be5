//! Request and response types for the `/v1/records` endpoint.

use leo_combiner::{Batch, Correlation};
use serde::{Deserialize, Serialize};

/// Request payload for the /v1/records endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PushRecordsRequest {
    pub records: Vec<PushRecord>,
}

/// One combined record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PushRecord {
    /// Newline-delimited JSON events.
    pub data: String,
    pub correlation: Correlation,
    /// Number of events in `data`.
    pub cnt: usize,
}

/// Response payload for errors.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub message: String,
}

impl From<&Batch> for PushRecordsRequest {
    fn from(batch: &Batch) -> Self {
        let records = batch
            .records()
            .iter()
            .map(|record| PushRecord {
                data: String::from_utf8_lossy(&record.data).into_owned(),
                correlation: record.correlation.clone(),
                cnt: record.cnt,
            })
            .collect();

        Self { records }
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use leo_combiner::CombinedRecord;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_request_from_batch() {
        let mut batch = Batch::default();
        batch.push(CombinedRecord {
            data: Bytes::from_static(b"{\"a\":1}\n{\"a\":2}\n"),
            correlation: Correlation {
                source: "svc".to_string(),
                start: "c1".to_string(),
                end: Some("c9".to_string()),
            },
            cnt: 2,
        });

        let request = PushRecordsRequest::from(&batch);
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "records": [{
                    "data": "{\"a\":1}\n{\"a\":2}\n",
                    "correlation": { "source": "svc", "start": "c1", "end": "c9" },
                    "cnt": 2,
                }]
            })
        );
    }
}
