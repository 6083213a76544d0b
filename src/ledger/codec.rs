//! Values crossing the ledger boundary.
//!
//! The ledger stores bytes. Text goes in as UTF-8, bytes as-is, and
//! structured values as canonical JSON objects. On the way out, keys are read
//! back as UTF-8 text and values as JSON.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::canonical;
use crate::ledger::client::RawEntry;
use crate::ledger::error::{LedgerError, LedgerResult};

/// Something that can be written to the ledger as a key or value.
#[derive(Debug, Clone, PartialEq)]
pub enum LedgerValue {
    Text(String),
    Bytes(Vec<u8>),
    /// must hold a JSON object
    Json(Value),
}

impl LedgerValue {
    /// Wrap any serializable value as JSON.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> LedgerResult<Self> {
        serde_json::to_value(value)
            .map(LedgerValue::Json)
            .map_err(|e| LedgerError::Encoding(e.to_string()))
    }
}

impl From<&str> for LedgerValue {
    fn from(value: &str) -> Self {
        LedgerValue::Text(value.to_string())
    }
}

impl From<String> for LedgerValue {
    fn from(value: String) -> Self {
        LedgerValue::Text(value)
    }
}

impl From<&String> for LedgerValue {
    fn from(value: &String) -> Self {
        LedgerValue::Text(value.clone())
    }
}

impl From<&[u8]> for LedgerValue {
    fn from(value: &[u8]) -> Self {
        LedgerValue::Bytes(value.to_vec())
    }
}

impl From<Vec<u8>> for LedgerValue {
    fn from(value: Vec<u8>) -> Self {
        LedgerValue::Bytes(value)
    }
}

impl From<Value> for LedgerValue {
    fn from(value: Value) -> Self {
        LedgerValue::Json(value)
    }
}

impl From<Map<String, Value>> for LedgerValue {
    fn from(value: Map<String, Value>) -> Self {
        LedgerValue::Json(Value::Object(value))
    }
}

/// Turn a value into the bytes stored in the ledger.
///
/// JSON values other than objects are rejected.
pub fn encode(value: &LedgerValue) -> LedgerResult<Vec<u8>> {
    match value {
        LedgerValue::Text(s) => Ok(s.as_bytes().to_vec()),
        LedgerValue::Bytes(b) => Ok(b.clone()),
        LedgerValue::Json(v @ Value::Object(_)) => {
            canonical::to_canonical_vec(v).map_err(|e| LedgerError::Encoding(e.to_string()))
        }
        LedgerValue::Json(other) => Err(LedgerError::Encoding(format!(
            "cannot encode a JSON {} as a ledger value; expected text, bytes or an object",
            json_kind(other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// A verified read, decoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifiedEntry {
    pub key: String,
    pub value: Value,
    pub tx: u64,
    pub revision: u64,
    pub verified: bool,
}

impl VerifiedEntry {
    /// deserialize the value into a typed record
    pub fn record<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        T::deserialize(&self.value)
    }
}

/// A verified write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetReceipt {
    pub tx: u64,
    pub revision: u64,
    pub verified: bool,
}

/// Decode a raw entry: key as UTF-8 text, value as JSON.
pub fn decode_record(raw: &RawEntry, verified: bool) -> LedgerResult<VerifiedEntry> {
    let key = String::from_utf8(raw.key.clone()).map_err(|e| LedgerError::Decode {
        key: hex::encode(&raw.key),
        reason: e.to_string(),
    })?;
    let value = serde_json::from_slice(&raw.value).map_err(|e| LedgerError::Decode {
        key: key.clone(),
        reason: e.to_string(),
    })?;

    Ok(VerifiedEntry {
        key,
        value,
        tx: raw.tx,
        revision: raw.revision,
        verified,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::proof::{Proof, ZERO_ROOT};
    use serde_json::json;

    fn raw(key: &[u8], value: &[u8]) -> RawEntry {
        RawEntry {
            key: key.to_vec(),
            value: value.to_vec(),
            tx: 3,
            revision: 1,
            proof: Proof {
                start: 0,
                start_root: ZERO_ROOT,
                leaves: Vec::new(),
                head_root: ZERO_ROOT,
            },
        }
    }

    #[test]
    fn test_encode_variants() {
        assert_eq!(encode(&"abc".into()).unwrap(), b"abc");
        assert_eq!(encode(&b"\x00\xff".as_slice().into()).unwrap(), vec![0u8, 255]);
        assert_eq!(
            encode(&json!({"Name": "a", "Size": "1.00 B"}).into()).unwrap(),
            br#"{"Name": "a", "Size": "1.00 B"}"#.to_vec()
        );
    }

    #[test]
    fn test_encode_rejects_non_objects() {
        for value in [json!(1), json!("text"), json!([1, 2]), Value::Null] {
            assert!(matches!(encode(&LedgerValue::Json(value)), Err(LedgerError::Encoding(_))));
        }
    }

    #[test]
    fn test_decode_record() {
        let entry = decode_record(&raw(b"abc", br#"{"Hash": "abc"}"#), true).unwrap();
        assert_eq!(entry.key, "abc");
        assert_eq!(entry.value, json!({"Hash": "abc"}));
        assert_eq!(entry.tx, 3);
        assert!(entry.verified);
    }

    #[test]
    fn test_decode_rejects_non_json() {
        let err = decode_record(&raw(b"abc", b"plain text"), true).unwrap_err();
        assert!(matches!(err, LedgerError::Decode { ref key, .. } if key == "abc"));

        let err = decode_record(&raw(&[0xff, 0xfe], b"{}"), true).unwrap_err();
        assert!(matches!(err, LedgerError::Decode { ref key, .. } if key == "fffe"));
    }
}
