//! Tests for the JSON config codec.
//!
//! Validates the round-trip law, native JSON typing for flags and
//! integers, verbatim preservation of unrecognized keys, and rejection
//! of malformed documents.

use warden::{ConfigCodec, JsonCodec, PropertyStore, PropertyValue};

fn codec() -> JsonCodec {
    JsonCodec::new()
}

// =============================================================================
// Round-Trip Tests
// =============================================================================

#[test]
fn test_round_trip_is_value_equal() {
    let mut store = PropertyStore::new();
    store.set("name", "web01").unwrap();
    store.set("release", "13.2-RELEASE").unwrap();
    store.set("basejail", "yes").unwrap();
    store.set("basejail_type", "nullfs").unwrap();
    store.set("priority", "42").unwrap();
    store.set("securelevel", "-1").unwrap();
    store.set("custom_key", "custom value").unwrap();

    let decoded = codec().decode(&codec().encode(&store).unwrap()).unwrap();
    assert_eq!(decoded, store);
}

#[test]
fn test_round_trip_empty_store() {
    let store = PropertyStore::new();
    let decoded = codec().decode(&codec().encode(&store).unwrap()).unwrap();
    assert_eq!(decoded, store);
}

#[test]
fn test_encoding_is_stable() {
    let mut store = PropertyStore::new();
    store.set("name", "web01").unwrap();
    store.set("boot", "yes").unwrap();
    store.set("zzz", "last").unwrap();

    let first = codec().encode(&store).unwrap();
    let second = codec().encode(&store).unwrap();
    assert_eq!(first, second, "encoding the same store must be stable");
}

// =============================================================================
// Wire Shape Tests
// =============================================================================

#[test]
fn test_flags_and_integers_use_native_json_types() {
    let mut store = PropertyStore::new();
    store.set("basejail", "yes").unwrap();
    store.set("priority", "42").unwrap();

    let bytes = codec().encode(&store).unwrap();
    let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

    assert_eq!(value["basejail"], serde_json::Value::Bool(true));
    assert_eq!(value["priority"], serde_json::json!(42));
}

#[test]
fn test_decode_types_strings_through_registry() {
    let store = codec()
        .decode(br#"{"name": "web01", "basejail_type": "zfs", "mystery": "x"}"#)
        .unwrap();

    assert_eq!(
        store.stored("name"),
        Some(&PropertyValue::Str("web01".to_string()))
    );
    assert_eq!(
        store.stored("basejail_type"),
        Some(&PropertyValue::Choice("zfs".to_string()))
    );
    assert_eq!(
        store.stored("mystery"),
        Some(&PropertyValue::Opaque("x".to_string()))
    );
}

#[test]
fn test_unrecognized_keys_survive_round_trip() {
    let original = br#"{"written_by_newer_version": "keep me"}"#;
    let store = codec().decode(original).unwrap();
    let bytes = codec().encode(&store).unwrap();
    let again = codec().decode(&bytes).unwrap();
    assert_eq!(again, store);
    assert_eq!(
        again.stored("written_by_newer_version"),
        Some(&PropertyValue::Opaque("keep me".to_string()))
    );
}

// =============================================================================
// Malformed Input Tests
// =============================================================================

#[test]
fn test_malformed_json_fails() {
    assert!(codec().decode(b"{ not json").is_err());
}

#[test]
fn test_top_level_must_be_an_object() {
    assert!(codec().decode(b"42").is_err());
    assert!(codec().decode(b"[]").is_err());
    assert!(codec().decode(b"\"text\"").is_err());
}

#[test]
fn test_float_values_are_rejected() {
    assert!(codec().decode(br#"{"priority": 1.5}"#).is_err());
}

#[test]
fn test_null_and_nested_values_are_rejected() {
    assert!(codec().decode(br#"{"name": null}"#).is_err());
    assert!(codec().decode(br#"{"ip4_addr": ["10.0.0.1"]}"#).is_err());
}
