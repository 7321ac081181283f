//! Object-store notification model.
//!
//! The pipeline is triggered by the object-created notification that S3 (and
//! S3-compatible stores) emit. Only the bucket name and object key are used.
//! Keys arrive form-encoded: `+` stands for a space and other reserved bytes
//! are percent-escaped.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TriggerError {
    #[error("Malformed notification: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Notification contains no records")]
    NoRecords,

    #[error("Invalid object key encoding {key:?}: {message}")]
    InvalidKey { key: String, message: String },
}

/// An object-created notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageEvent {
    #[serde(rename = "Records", default)]
    pub records: Vec<EventRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    pub s3: S3Entity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3Entity {
    pub bucket: BucketEntity,
    pub object: ObjectEntity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketEntity {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectEntity {
    pub key: String,
}

/// A decoded bucket + key pair identifying one source object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRef {
    pub bucket: String,
    pub key: String,
}

impl StorageEvent {
    pub fn from_json(data: &str) -> Result<Self, TriggerError> {
        Ok(serde_json::from_str(data)?)
    }

    /// Decoded object references for every record, in delivery order.
    pub fn objects(&self) -> Result<Vec<ObjectRef>, TriggerError> {
        if self.records.is_empty() {
            return Err(TriggerError::NoRecords);
        }

        self.records
            .iter()
            .map(|record| {
                Ok(ObjectRef {
                    bucket: record.s3.bucket.name.clone(),
                    key: decode_object_key(&record.s3.object.key)?,
                })
            })
            .collect()
    }
}

/// Decode a notification object key using query-unescape rules.
pub fn decode_object_key(raw: &str) -> Result<String, TriggerError> {
    let plus_decoded = raw.replace('+', " ");
    validate_escapes(raw)?;
    urlencoding::decode(&plus_decoded)
        .map(|decoded| decoded.into_owned())
        .map_err(|e| TriggerError::InvalidKey {
            key: raw.to_string(),
            message: e.to_string(),
        })
}

// urlencoding passes malformed escapes through untouched; reject them instead.
fn validate_escapes(raw: &str) -> Result<(), TriggerError> {
    let bytes = raw.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let valid = bytes.len() > i + 2
                && bytes[i + 1].is_ascii_hexdigit()
                && bytes[i + 2].is_ascii_hexdigit();
            if !valid {
                return Err(TriggerError::InvalidKey {
                    key: raw.to_string(),
                    message: format!("invalid escape at byte {}", i),
                });
            }
            i += 3;
        } else {
            i += 1;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const EVENT: &str = r#"{
        "Records": [
            {
                "eventName": "ObjectCreated:Put",
                "s3": {
                    "bucket": { "name": "download-demo" },
                    "object": { "key": "test-s3-mp4/my+clip%281%29.mp4", "size": 1024 }
                }
            }
        ]
    }"#;

    #[test]
    fn decodes_bucket_and_key() {
        let event = StorageEvent::from_json(EVENT).unwrap();
        let objects = event.objects().unwrap();
        assert_eq!(
            objects,
            vec![ObjectRef {
                bucket: "download-demo".to_string(),
                key: "test-s3-mp4/my clip(1).mp4".to_string(),
            }]
        );
    }

    #[test]
    fn empty_records_is_an_error() {
        let event = StorageEvent::from_json(r#"{"Records": []}"#).unwrap();
        assert!(matches!(event.objects(), Err(TriggerError::NoRecords)));

        let event = StorageEvent::from_json("{}").unwrap();
        assert!(matches!(event.objects(), Err(TriggerError::NoRecords)));
    }

    #[test]
    fn malformed_json_is_rejected() {
        assert!(matches!(
            StorageEvent::from_json("{\"Records\": [{}]}"),
            Err(TriggerError::Malformed(_))
        ));
    }

    #[test]
    fn decode_object_key_handles_plus_and_escapes() {
        assert_eq!(decode_object_key("a+b").unwrap(), "a b");
        assert_eq!(decode_object_key("a%2Bb").unwrap(), "a+b");
        assert_eq!(decode_object_key("video.mp4").unwrap(), "video.mp4");
        assert_eq!(decode_object_key("%E2%9C%93.mp4").unwrap(), "\u{2713}.mp4");
    }

    #[test]
    fn decode_object_key_rejects_bad_escapes() {
        assert!(decode_object_key("bad%zzkey").is_err());
        assert!(decode_object_key("trailing%2").is_err());
        assert!(decode_object_key("%FF").is_err());
    }
}
