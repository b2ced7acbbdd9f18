//! # Config Codecs
//!
//! Reversible serialization of a [`PropertyStore`] to and from bytes.
//! The resource layer depends only on the [`ConfigCodec`] trait, so new
//! formats slot in without touching [`crate::resource::ConfigResource`].
//!
//! ## Round-Trip Law
//!
//! For any store built through the typed property API,
//! `decode(encode(s))` is value-equal to `s`. [`JsonCodec`] keeps this
//! by writing flags and integers as native JSON types and re-typing
//! strings through the property registry on decode.
//!
//! ## Wire Shape (JSON)
//!
//! A flat object of property name to scalar value:
//!
//! ```json
//! {
//!   "basejail": true,
//!   "basejail_type": "nullfs",
//!   "name": "web01",
//!   "priority": 42,
//!   "tag": "frontend"
//! }
//! ```
//!
//! Unrecognized keys are preserved verbatim. Non-scalar values (arrays,
//! objects, floats, null) are malformed input.

use crate::error::{Error, Result};
use crate::props::{self, PropertyStore, PropertyType, PropertyValue};

/// Reversible serialization of a property store.
///
/// Implementations must uphold the round-trip law documented at the
/// module level and fail with [`Error::Codec`] on malformed input.
pub trait ConfigCodec: Send + Sync {
    /// Short format name, used for logging.
    fn name(&self) -> &str;

    /// Decodes bytes into a property store.
    fn decode(&self, bytes: &[u8]) -> Result<PropertyStore>;

    /// Encodes a property store into bytes.
    fn encode(&self, store: &PropertyStore) -> Result<Vec<u8>>;
}

// =============================================================================
// JSON Codec
// =============================================================================

/// JSON implementation of [`ConfigCodec`].
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl JsonCodec {
    /// Creates the codec.
    pub fn new() -> Self {
        Self
    }
}

/// Re-types a decoded JSON string through the property registry.
///
/// Decode is lenient where [`PropertyStore::set`] is strict: a stored
/// value that no longer fits its declared type (written by an older or
/// newer version) is preserved as opaque text instead of rejected.
fn revive_text(key: &str, raw: &str) -> PropertyValue {
    match props::lookup(key).map(|def| def.ty) {
        Some(PropertyType::Text) => PropertyValue::Str(raw.to_string()),
        Some(PropertyType::Choice(allowed)) if allowed.contains(&raw) => {
            PropertyValue::Choice(raw.to_string())
        }
        _ => match props::parse_value(key, raw) {
            Ok(value) => value,
            Err(_) => PropertyValue::Opaque(raw.to_string()),
        },
    }
}

impl ConfigCodec for JsonCodec {
    fn name(&self) -> &str {
        "json"
    }

    fn decode(&self, bytes: &[u8]) -> Result<PropertyStore> {
        let value: serde_json::Value = serde_json::from_slice(bytes)
            .map_err(|e| Error::Codec(format!("invalid JSON: {}", e)))?;

        let serde_json::Value::Object(map) = value else {
            return Err(Error::Codec("expected a JSON object".to_string()));
        };

        let mut store = PropertyStore::new();
        for (key, value) in map {
            let typed = match value {
                serde_json::Value::Bool(b) => PropertyValue::Bool(b),
                serde_json::Value::Number(n) => {
                    let Some(i) = n.as_i64() else {
                        return Err(Error::Codec(format!(
                            "property '{}' has a non-integer number",
                            key
                        )));
                    };
                    PropertyValue::Int(i)
                }
                serde_json::Value::String(s) => revive_text(&key, &s),
                other => {
                    return Err(Error::Codec(format!(
                        "property '{}' has unsupported value type: {}",
                        key, other
                    )));
                }
            };
            store.put(&key, typed);
        }

        Ok(store)
    }

    fn encode(&self, store: &PropertyStore) -> Result<Vec<u8>> {
        let mut map = serde_json::Map::new();
        for (key, value) in store.iter() {
            let json = match value {
                PropertyValue::Bool(b) => serde_json::Value::Bool(*b),
                PropertyValue::Int(n) => serde_json::Value::Number((*n).into()),
                PropertyValue::Str(s) | PropertyValue::Choice(s) | PropertyValue::Opaque(s) => {
                    serde_json::Value::String(s.clone())
                }
            };
            map.insert(key.to_string(), json);
        }

        serde_json::to_vec_pretty(&serde_json::Value::Object(map))
            .map_err(|e| Error::Codec(format!("failed to serialize: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_typed_store() {
        let mut store = PropertyStore::new();
        store.set("name", "web01").unwrap();
        store.set("basejail", "yes").unwrap();
        store.set("basejail_type", "nullfs").unwrap();
        store.set("priority", "42").unwrap();
        store.set("tag", "frontend").unwrap();

        let codec = JsonCodec::new();
        let bytes = codec.encode(&store).unwrap();
        let decoded = codec.decode(&bytes).unwrap();

        assert_eq!(decoded, store);
    }

    #[test]
    fn test_decode_rejects_non_object() {
        let codec = JsonCodec::new();
        assert!(matches!(codec.decode(b"[1, 2]"), Err(Error::Codec(_))));
        assert!(matches!(codec.decode(b"not json"), Err(Error::Codec(_))));
    }

    #[test]
    fn test_decode_rejects_nested_values() {
        let codec = JsonCodec::new();
        let result = codec.decode(br#"{"ip4_addr": {"em0": "10.0.0.1"}}"#);
        assert!(matches!(result, Err(Error::Codec(_))));
    }

    #[test]
    fn test_decode_preserves_stale_choice_as_opaque() {
        // A basejail_type written by some other tool, outside the
        // allowed set, survives the round trip verbatim.
        let codec = JsonCodec::new();
        let store = codec.decode(br#"{"basejail_type": "unionfs"}"#).unwrap();
        assert_eq!(
            store.stored("basejail_type"),
            Some(&PropertyValue::Opaque("unionfs".to_string()))
        );
        let bytes = codec.encode(&store).unwrap();
        assert_eq!(codec.decode(&bytes).unwrap(), store);
    }
}
