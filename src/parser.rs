use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::Deserialize;
use serde_json::Value;

/// One quota bucket as reported by the status endpoint. Produced fresh on
/// every fetch; continuity across polls exists only through the bucket id.
#[derive(Debug, Clone, PartialEq)]
pub struct BucketStatus {
    pub bucket_id: String,
    pub reset_at: DateTime<Utc>,
    pub utilization: f64,
}

// Raw shape a top-level entry must decode into to qualify as a bucket.
#[derive(Debug, Deserialize)]
struct RawBucket {
    resets_at: String,
    #[serde(default)]
    utilization: f64,
}

/// Extract every monitorable bucket from the status payload, in the
/// payload's entry order. Entries that are not objects, do not carry
/// `resets_at`, or carry a timestamp without an explicit UTC offset are
/// skipped without affecting their siblings. An empty result is a normal
/// outcome, not an error.
pub fn parse_buckets(payload: &Value) -> Vec<BucketStatus> {
    let Some(entries) = payload.as_object() else {
        warn!("status payload is not a JSON object");
        return Vec::new();
    };

    let mut buckets = Vec::new();
    for (key, value) in entries {
        if !value.is_object() {
            continue;
        }
        let raw: RawBucket = match serde_json::from_value(value.clone()) {
            Ok(r) => r,
            Err(e) => {
                debug!("skipping {key}: not a bucket entry ({e})");
                continue;
            }
        };
        match DateTime::parse_from_rfc3339(&raw.resets_at) {
            Ok(t) => {
                debug!("parsed {key}: resets at {t}");
                buckets.push(BucketStatus {
                    bucket_id: key.clone(),
                    reset_at: t.with_timezone(&Utc),
                    utilization: raw.utilization,
                });
            }
            Err(e) => warn!("failed to parse timestamp for {key}: {e}"),
        }
    }
    buckets
}
