//! # Content
//!
//! Order-preserving codec for nested key/value configuration payloads.
//!
//! Payloads travel as JSON object text. Decoding keeps key insertion order,
//! so `decode(encode(m)) == m` holds for every map, including key order.
//!
//! Two encodings are produced:
//! - [`encode`]: canonical compact text, used for persisted snapshots
//! - [`encode_display`]: tab-indented multi-line text for diff-friendly output
//!
//! Both decode back to the same [`OrderedMap`].
//!
//! ## Example
//!
//! ```
//! let map = content::decode(r#"{"b": 1, "a": {"nested": true}}"#)?;
//! assert_eq!(content::encode(&map), r#"{"b":1,"a":{"nested":true}}"#);
//!
//! let pretty = content::encode_display(&map, "")?;
//! assert_eq!(content::decode(&pretty)?, map);
//! # Ok::<(), content::Error>(())
//! ```

mod error;

pub use error::{Error, Result};

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{Serializer, Value};

/// Insertion-ordered JSON object
pub type OrderedMap = serde_json::Map<String, Value>;

/// Canonical text of the empty payload
pub const EMPTY: &str = "{}";

/// Decode payload text into an ordered map
///
/// Blank text decodes to the empty map. Any top-level value other than an
/// object is rejected.
pub fn decode(text: &str) -> Result<OrderedMap> {
    if text.trim().is_empty() {
        return Ok(OrderedMap::new());
    }

    match serde_json::from_str::<Value>(text)? {
        Value::Object(map) => Ok(map),
        other => Err(Error::NotAnObject(kind_name(&other))),
    }
}

/// Decode an optional payload, treating an absent one as empty
pub fn decode_or_empty(text: Option<&str>) -> Result<OrderedMap> {
    text.map_or_else(|| Ok(OrderedMap::new()), decode)
}

/// Encode an ordered map as canonical compact text
pub fn encode(map: &OrderedMap) -> String {
    if map.is_empty() {
        return EMPTY.to_string();
    }
    // Display for Value cannot fail for string-keyed maps
    Value::Object(map.clone()).to_string()
}

/// Encode an ordered map as tab-indented multi-line text
///
/// Every line after the first is prefixed with `prefix`, so the output can be
/// embedded at a fixed indentation level.
pub fn encode_display(map: &OrderedMap, prefix: &str) -> Result<String> {
    let mut buf = Vec::new();
    let mut ser = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"\t"));
    map.serialize(&mut ser).map_err(Error::Encode)?;

    let text = String::from_utf8_lossy(&buf);
    if prefix.is_empty() {
        return Ok(text.into_owned());
    }

    let separator = format!("\n{prefix}");
    Ok(text.lines().collect::<Vec<_>>().join(&separator))
}

/// Re-encode payload text in canonical form
pub fn canonicalize(text: &str) -> Result<String> {
    decode(text).map(|map| encode(&map))
}

/// Compare two payload texts by decoded value
///
/// Falls back to plain text equality when either side does not decode.
pub fn equivalent(a: &str, b: &str) -> bool {
    match (decode(a), decode(b)) {
        (Ok(left), Ok(right)) => left == right,
        _ => a == b,
    }
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
