//! Session record and its document codec.

use crate::error::{SessionError, SessionResult};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Utc};
use serde_json::Value;
use stanchion_document::Document;

/// Document field holding the session id.
pub const FIELD_SID: &str = "sid";
/// Document field holding the base64-encoded payload.
pub const FIELD_DATA: &str = "data";
/// Document field holding the lock flag (0 free, 1 held).
pub const FIELD_LOCK: &str = "lock";
/// Document field holding the liveness flag (0 soft-deleted, 1 live).
pub const FIELD_ACTIVE: &str = "active";
/// Document field holding the expiry as unix seconds.
pub const FIELD_EXPIRY: &str = "expiry";

/// Name of the unique session-id index.
pub const INDEX_SID: &str = "sid_unique";
/// Name of the secondary (sid, lock) index serving the lock query.
pub const INDEX_SID_LOCK: &str = "sid_lock";
/// Name of the expiry range index.
pub const INDEX_EXPIRY: &str = "expiry";

/// One session's stored state.
///
/// `extra` carries every document field outside the five known ones, so a
/// write merged over a previously fetched record preserves fields this crate
/// knows nothing about.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRecord {
    /// Session id.
    pub sid: String,
    /// Opaque payload bytes, owned entirely by the caller.
    pub data: Vec<u8>,
    /// Lock flag: 0 free, 1 held by a reader pending a write.
    pub lock: i64,
    /// Liveness flag: 0 soft-deleted, 1 live.
    pub active: i64,
    /// Expiry as unix seconds; readable while `expiry >= now`.
    pub expiry: i64,
    /// Fields preserved verbatim across merge-on-write.
    pub extra: Document,
}

impl SessionRecord {
    /// Create an empty live record for an id.
    pub fn new(sid: impl Into<String>) -> Self {
        Self {
            sid: sid.into(),
            data: Vec::new(),
            lock: 0,
            active: 1,
            expiry: 0,
            extra: Document::new(),
        }
    }

    /// Expiry as a wall-clock timestamp.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.expiry, 0)
    }

    /// Decode a stored document.
    ///
    /// Missing numeric fields default to 0 and missing data to an empty
    /// payload, since a record created by a bare lock acquisition has
    /// neither.
    /// Present-but-wrong-typed fields are decode errors.
    pub fn from_document(mut document: Document) -> SessionResult<Self> {
        let sid = match document.remove(FIELD_SID) {
            Some(Value::String(sid)) => sid,
            Some(other) => {
                return Err(SessionError::Deserialization(format!(
                    "session id must be a string, got {other}"
                )));
            }
            None => {
                return Err(SessionError::Deserialization(
                    "document has no session id".to_string(),
                ));
            }
        };

        let data = match document.remove(FIELD_DATA) {
            Some(Value::String(encoded)) => BASE64.decode(encoded.as_bytes()).map_err(|e| {
                SessionError::Deserialization(format!("payload for '{sid}' is not base64: {e}"))
            })?,
            Some(Value::Null) | None => Vec::new(),
            Some(other) => {
                return Err(SessionError::Deserialization(format!(
                    "payload for '{sid}' must be a string, got {other}"
                )));
            }
        };

        let lock = take_integer(&mut document, FIELD_LOCK, &sid)?;
        let active = take_integer(&mut document, FIELD_ACTIVE, &sid)?;
        let expiry = take_integer(&mut document, FIELD_EXPIRY, &sid)?;

        Ok(Self {
            sid,
            data,
            lock,
            active,
            expiry,
            extra: document,
        })
    }

    /// Encode into the stored document shape. Known fields overwrite any
    /// same-named extras.
    pub fn into_document(self) -> Document {
        let mut document = self.extra;
        document.insert(FIELD_SID.to_string(), Value::from(self.sid));
        document.insert(
            FIELD_DATA.to_string(),
            Value::from(BASE64.encode(&self.data)),
        );
        document.insert(FIELD_LOCK.to_string(), Value::from(self.lock));
        document.insert(FIELD_ACTIVE.to_string(), Value::from(self.active));
        document.insert(FIELD_EXPIRY.to_string(), Value::from(self.expiry));
        document
    }
}

fn take_integer(document: &mut Document, field: &str, sid: &str) -> SessionResult<i64> {
    match document.remove(field) {
        Some(value) => value.as_i64().ok_or_else(|| {
            SessionError::Deserialization(format!(
                "field '{field}' for '{sid}' must be an integer, got {value}"
            ))
        }),
        None => Ok(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_round_trip_preserves_payload_bytes() {
        let mut record = SessionRecord::new("abc");
        record.data = vec![0x00, 0xFF, 0x7F, 0x80, b'x'];
        record.expiry = 1_700_000_000;

        let decoded = SessionRecord::from_document(record.clone().into_document()).unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn test_round_trip_preserves_extra_fields() {
        let mut record = SessionRecord::new("abc");
        record
            .extra
            .insert("tenant".to_string(), json!("acme"));

        let document = record.clone().into_document();
        assert_eq!(document["tenant"], json!("acme"));

        let decoded = SessionRecord::from_document(document).unwrap();
        assert_eq!(decoded.extra["tenant"], json!("acme"));
    }

    #[test]
    fn test_known_fields_overwrite_extras() {
        let mut record = SessionRecord::new("abc");
        record.lock = 1;
        record.extra.insert(FIELD_LOCK.to_string(), json!(0));

        let document = record.into_document();
        assert_eq!(document[FIELD_LOCK], json!(1));
    }

    #[test]
    fn test_bare_lock_document_decodes_with_defaults() {
        let document = json!({"sid": "abc", "lock": 1})
            .as_object()
            .cloned()
            .unwrap();

        let record = SessionRecord::from_document(document).unwrap();
        assert_eq!(record.lock, 1);
        assert_eq!(record.active, 0);
        assert_eq!(record.expiry, 0);
        assert!(record.data.is_empty());
    }

    #[test]
    fn test_missing_sid_rejected() {
        let document = json!({"lock": 1}).as_object().cloned().unwrap();
        assert!(matches!(
            SessionRecord::from_document(document),
            Err(SessionError::Deserialization(_))
        ));
    }

    #[test]
    fn test_wrong_typed_fields_rejected() {
        let document = json!({"sid": "abc", "lock": "held"})
            .as_object()
            .cloned()
            .unwrap();
        assert!(SessionRecord::from_document(document).is_err());

        let document = json!({"sid": "abc", "data": "not//valid//base64!!"})
            .as_object()
            .cloned()
            .unwrap();
        assert!(SessionRecord::from_document(document).is_err());
    }

    #[test]
    fn test_expires_at() {
        let mut record = SessionRecord::new("abc");
        record.expiry = 0;
        assert_eq!(record.expires_at().unwrap().timestamp(), 0);
    }
}
