//! # Typed Jail Properties
//!
//! A jail's declarative configuration is an ordered mapping of property
//! names to typed values. Each known property has a declared type in a
//! static registry; raw text assigned to a known key is parsed against
//! that type, while unknown keys are preserved verbatim as opaque text
//! so configs written by newer versions survive a round trip.
//!
//! ## Value Model
//!
//! | Variant  | Registry type | Example              |
//! |----------|---------------|----------------------|
//! | `Str`    | `Text`        | `name = "web01"`     |
//! | `Bool`   | `Flag`        | `basejail = yes`     |
//! | `Int`    | `Numeric`     | `priority = 42`      |
//! | `Choice` | `Choice(..)`  | `basejail_type = nullfs` |
//! | `Opaque` | (none)        | anything unregistered |
//!
//! ## Override Tokens
//!
//! Creation-time overrides arrive as `key=value` tokens. They are parsed
//! as a unit: every token must parse before any is applied, so a bad
//! token never leaves the store half-mutated.

use crate::error::{Error, Result};
use std::collections::BTreeMap;
use tracing::debug;

// =============================================================================
// Property Registry
// =============================================================================

/// Declared type of a registered property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyType {
    /// Free-form text.
    Text,
    /// Boolean flag, accepts yes/no, on/off, true/false, 1/0.
    Flag,
    /// Signed integer.
    Numeric,
    /// One of a fixed set of allowed values.
    Choice(&'static [&'static str]),
}

/// A registered property: key, type, and documented default.
#[derive(Debug, Clone, Copy)]
pub struct PropertyDef {
    /// Property key.
    pub key: &'static str,
    /// Declared type consulted during parsing.
    pub ty: PropertyType,
    /// Default raw value reported when the property is unset.
    pub default: Option<&'static str>,
}

/// Allowed basejail mount strategies.
pub const BASEJAIL_TYPES: &[&str] = &["nullfs", "zfs"];

/// The jail properties this control plane understands.
///
/// Anything not listed here is carried as opaque text.
const PROPERTY_DEFS: &[PropertyDef] = &[
    PropertyDef {
        key: "name",
        ty: PropertyType::Text,
        default: None,
    },
    PropertyDef {
        key: "release",
        ty: PropertyType::Text,
        default: None,
    },
    PropertyDef {
        key: "basejail",
        ty: PropertyType::Flag,
        default: Some("no"),
    },
    PropertyDef {
        key: "basejail_type",
        ty: PropertyType::Choice(BASEJAIL_TYPES),
        default: Some("nullfs"),
    },
    PropertyDef {
        key: "template",
        ty: PropertyType::Flag,
        default: Some("no"),
    },
    PropertyDef {
        key: "empty",
        ty: PropertyType::Flag,
        default: Some("no"),
    },
    PropertyDef {
        key: "boot",
        ty: PropertyType::Flag,
        default: Some("no"),
    },
    PropertyDef {
        key: "priority",
        ty: PropertyType::Numeric,
        default: Some("99"),
    },
    PropertyDef {
        key: "securelevel",
        ty: PropertyType::Numeric,
        default: Some("2"),
    },
    PropertyDef {
        key: "vnet",
        ty: PropertyType::Flag,
        default: Some("no"),
    },
    PropertyDef {
        key: "interfaces",
        ty: PropertyType::Text,
        default: None,
    },
    PropertyDef {
        key: "ip4_addr",
        ty: PropertyType::Text,
        default: None,
    },
    PropertyDef {
        key: "defaultrouter",
        ty: PropertyType::Text,
        default: None,
    },
    PropertyDef {
        key: "host_hostname",
        ty: PropertyType::Text,
        default: None,
    },
    PropertyDef {
        key: "allow_raw_sockets",
        ty: PropertyType::Flag,
        default: Some("no"),
    },
    PropertyDef {
        key: "mount_devfs",
        ty: PropertyType::Flag,
        default: Some("yes"),
    },
    PropertyDef {
        key: "pkglist",
        ty: PropertyType::Text,
        default: None,
    },
];

/// Looks up a property definition by key.
pub fn lookup(key: &str) -> Option<&'static PropertyDef> {
    PROPERTY_DEFS.iter().find(|def| def.key == key)
}

// =============================================================================
// Property Values
// =============================================================================

/// A typed property value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    /// Free-form text for a registered `Text` property.
    Str(String),
    /// Boolean flag.
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// Validated member of a `Choice` property's allowed set.
    Choice(String),
    /// Verbatim text for an unregistered property.
    Opaque(String),
}

impl PropertyValue {
    /// Returns the boolean value, if this is a flag.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the integer value, if numeric.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the textual value for text-like variants.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) | Self::Choice(s) | Self::Opaque(s) => Some(s),
            _ => None,
        }
    }
}

impl std::fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Str(s) | Self::Choice(s) | Self::Opaque(s) => write!(f, "{}", s),
            Self::Bool(true) => write!(f, "yes"),
            Self::Bool(false) => write!(f, "no"),
            Self::Int(n) => write!(f, "{}", n),
        }
    }
}

/// Parses flag text. Accepts the spellings jail configs have
/// historically used.
fn parse_flag(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "yes" | "on" | "true" | "1" => Some(true),
        "no" | "off" | "false" | "0" => Some(false),
        _ => None,
    }
}

/// Parses raw text against the declared type of `key`.
///
/// Unknown keys parse to [`PropertyValue::Opaque`]. Known keys fail with
/// [`Error::InvalidPropertyValue`] when the text does not fit the type.
pub fn parse_value(key: &str, raw: &str) -> Result<PropertyValue> {
    let Some(def) = lookup(key) else {
        return Ok(PropertyValue::Opaque(raw.to_string()));
    };

    match def.ty {
        PropertyType::Text => Ok(PropertyValue::Str(raw.to_string())),
        PropertyType::Flag => {
            parse_flag(raw).map(PropertyValue::Bool).ok_or_else(|| {
                Error::InvalidPropertyValue {
                    key: key.to_string(),
                    value: raw.to_string(),
                    reason: "expected yes/no".to_string(),
                }
            })
        }
        PropertyType::Numeric => {
            raw.parse::<i64>()
                .map(PropertyValue::Int)
                .map_err(|_| Error::InvalidPropertyValue {
                    key: key.to_string(),
                    value: raw.to_string(),
                    reason: "expected an integer".to_string(),
                })
        }
        PropertyType::Choice(allowed) => {
            if allowed.contains(&raw) {
                Ok(PropertyValue::Choice(raw.to_string()))
            } else {
                Err(Error::InvalidPropertyValue {
                    key: key.to_string(),
                    value: raw.to_string(),
                    reason: format!("expected one of: {}", allowed.join(", ")),
                })
            }
        }
    }
}

// =============================================================================
// Property Store
// =============================================================================

/// Ordered mapping of property names to typed values.
///
/// Property names are unique within a store. Mutation goes through
/// [`PropertyStore::set`] (raw text, type-checked) or
/// [`PropertyStore::put`] (already-typed values). Reads through
/// [`PropertyStore::get`] fall back to the registry's documented default
/// and never fail for unknown-but-unset keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyStore {
    entries: BTreeMap<String, PropertyValue>,
}

impl PropertyStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored properties.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns true if `key` is explicitly stored.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Iterates stored properties in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropertyValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Parses `raw` against the declared type of `key` and stores it.
    ///
    /// Unknown keys are accepted as opaque text.
    pub fn set(&mut self, key: &str, raw: &str) -> Result<()> {
        let value = parse_value(key, raw)?;
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    /// Stores an already-typed value, replacing any prior value.
    pub fn put(&mut self, key: &str, value: PropertyValue) {
        self.entries.insert(key.to_string(), value);
    }

    /// Returns the stored value for `key`, cloned.
    pub fn stored(&self, key: &str) -> Option<&PropertyValue> {
        self.entries.get(key)
    }

    /// Returns the stored value, or the registry's documented default.
    ///
    /// `None` means the key is neither stored nor registered with a
    /// default; that is not an error.
    pub fn get(&self, key: &str) -> Option<PropertyValue> {
        if let Some(value) = self.entries.get(key) {
            return Some(value.clone());
        }
        let def = lookup(key)?;
        let raw = def.default?;
        // Registry defaults are static and well-formed for their type.
        parse_value(key, raw).ok()
    }

    /// Returns the effective boolean value of a flag property.
    pub fn flag(&self, key: &str) -> bool {
        self.get(key).and_then(|v| v.as_bool()).unwrap_or(false)
    }

    /// Applies `key=value` override tokens as a unit.
    ///
    /// Each token is split on the first `=`. A token without `=` fails
    /// with [`Error::MalformedPropertyToken`]; a value that does not fit
    /// its declared type fails with [`Error::InvalidPropertyValue`]. All
    /// tokens are parsed before any is applied, so a failure leaves the
    /// store untouched.
    pub fn apply_overrides<I, S>(&mut self, tokens: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut parsed: Vec<(String, PropertyValue)> = Vec::new();

        for token in tokens {
            let token = token.as_ref();
            let Some((key, raw)) = token.split_once('=') else {
                return Err(Error::MalformedPropertyToken(token.to_string()));
            };
            if key.is_empty() {
                return Err(Error::MalformedPropertyToken(token.to_string()));
            }
            parsed.push((key.to_string(), parse_value(key, raw)?));
        }

        for (key, value) in parsed {
            debug!(key = %key, value = %value, "applying property override");
            self.entries.insert(key, value);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_key_is_opaque() {
        let mut store = PropertyStore::new();
        store.set("tag", "web01").unwrap();
        assert_eq!(
            store.stored("tag"),
            Some(&PropertyValue::Opaque("web01".to_string()))
        );
    }

    #[test]
    fn test_choice_outside_allowed_set_fails() {
        let mut store = PropertyStore::new();
        let err = store.set("basejail_type", "tmpfs").unwrap_err();
        assert!(matches!(err, Error::InvalidPropertyValue { .. }));
    }

    #[test]
    fn test_get_falls_back_to_registry_default() {
        let store = PropertyStore::new();
        assert_eq!(store.get("basejail"), Some(PropertyValue::Bool(false)));
        assert_eq!(
            store.get("basejail_type"),
            Some(PropertyValue::Choice("nullfs".to_string()))
        );
        assert_eq!(store.get("no_such_key"), None);
    }

    #[test]
    fn test_overrides_apply_as_a_unit() {
        let mut store = PropertyStore::new();
        let err = store
            .apply_overrides(["boot=yes", "priority=not-a-number"])
            .unwrap_err();
        assert!(matches!(err, Error::InvalidPropertyValue { .. }));
        // First token must not have been applied.
        assert!(!store.contains("boot"));
    }

    #[test]
    fn test_flag_spellings() {
        let mut store = PropertyStore::new();
        for raw in ["yes", "on", "true", "1"] {
            store.set("vnet", raw).unwrap();
            assert_eq!(store.stored("vnet"), Some(&PropertyValue::Bool(true)));
        }
        for raw in ["no", "off", "false", "0"] {
            store.set("vnet", raw).unwrap();
            assert_eq!(store.stored("vnet"), Some(&PropertyValue::Bool(false)));
        }
    }
}
