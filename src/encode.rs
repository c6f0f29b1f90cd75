//! Message encoder: renders the wire string and the structured JSON
//! document from one session's state.
//!
//! Both renditions share the same traversal and the same per-field
//! payload formatting, so the `Field_<n>` values of the structured
//! document are exactly the substrings the wire message carries for
//! those fields. Fields with no schema entry are silently skipped; the
//! schema is authoritative over presence.

use crate::bitmap::render_hex;
use crate::generate::DEFAULT_MTI;
use crate::schema::{FieldId, FieldSchema, SchemaRegistry, WireFormat};
use crate::session::MessageSession;
use serde_json::{Map, Value};

/// Longest value an `llvar` prefix can describe.
pub const LLVAR_MAX: usize = 99;
/// Longest value an `lllvar` prefix can describe.
pub const LLLVAR_MAX: usize = 999;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum EncodeError {
    /// The value is longer than its decimal length prefix can represent.
    /// Truncation is caller policy at apply time, never done here.
    #[error("Field {field}: length {len} exceeds the {limit}-character bound of its length prefix")]
    LengthPrefixOverflow {
        field: u8,
        len: usize,
        limit: usize,
    },
}

/// Format one field's wire payload: optional length prefix plus the
/// value verbatim.
pub fn field_payload(schema: &FieldSchema, value: &str) -> Result<String, EncodeError> {
    let len = value.chars().count();
    let field = match schema.id {
        FieldId::De(n) => n,
        FieldId::Mti => 0,
    };
    match schema.format {
        WireFormat::Fixed => Ok(value.to_string()),
        WireFormat::Llvar => {
            if len > LLVAR_MAX {
                return Err(EncodeError::LengthPrefixOverflow {
                    field,
                    len,
                    limit: LLVAR_MAX,
                });
            }
            Ok(format!("{len:02}{value}"))
        }
        WireFormat::Lllvar => {
            if len > LLLVAR_MAX {
                return Err(EncodeError::LengthPrefixOverflow {
                    field,
                    len,
                    limit: LLLVAR_MAX,
                });
            }
            Ok(format!("{len:03}{value}"))
        }
    }
}

/// Render the flat wire message: MTI, bitmap hex sections when active,
/// then each populated data element in ascending order.
pub fn encode(registry: &SchemaRegistry, session: &MessageSession) -> Result<String, EncodeError> {
    let mut out = String::new();
    out.push_str(session.get(FieldId::Mti).unwrap_or(DEFAULT_MTI));

    let bitmaps = session.bitmaps();
    if bitmaps.has_active_primary(|n| session.get(FieldId::De(n)).is_some()) {
        out.push_str(&render_hex(&bitmaps.primary));
    }
    if bitmaps.has_active_secondary(|n| session.get(FieldId::De(n)).is_some()) {
        out.push_str(&render_hex(&bitmaps.secondary));
    }

    for (n, value) in session.data_elements() {
        let Some(schema) = registry.lookup(FieldId::De(n)) else {
            continue;
        };
        out.push_str(&field_payload(schema, value)?);
    }
    Ok(out)
}

/// Render the structured document: `MTI`, optional `PrimaryBitmap` /
/// `SecondaryBitmap`, then `Field_<n>` entries carrying the same
/// prefix-plus-value strings as the wire message. Key order follows the
/// wire traversal.
pub fn encode_structured(
    registry: &SchemaRegistry,
    session: &MessageSession,
) -> Result<Map<String, Value>, EncodeError> {
    let mut out = Map::new();
    out.insert(
        "MTI".to_string(),
        Value::String(session.get(FieldId::Mti).unwrap_or(DEFAULT_MTI).to_string()),
    );

    let bitmaps = session.bitmaps();
    if bitmaps.has_active_primary(|n| session.get(FieldId::De(n)).is_some()) {
        out.insert(
            "PrimaryBitmap".to_string(),
            Value::String(render_hex(&bitmaps.primary)),
        );
    }
    if bitmaps.has_active_secondary(|n| session.get(FieldId::De(n)).is_some()) {
        out.insert(
            "SecondaryBitmap".to_string(),
            Value::String(render_hex(&bitmaps.secondary)),
        );
    }

    for (n, value) in session.data_elements() {
        let Some(schema) = registry.lookup(FieldId::De(n)) else {
            continue;
        };
        out.insert(
            format!("Field_{n}"),
            Value::String(field_payload(schema, value)?),
        );
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaRegistry;

    const SCHEMA: &str = r#"{
        "MTI": {"type": "numeric", "format": "fixed", "length": 4, "active": true,
                "name": "Message Type Indicator"},
        "2": {"type": "numeric", "format": "llvar", "max_length": 19, "active": true,
              "name": "Primary Account Number"},
        "3": {"type": "numeric", "format": "fixed", "length": 6, "active": true,
              "name": "Processing Code"},
        "48": {"type": "alphanumeric", "format": "lllvar", "max_length": 255, "active": false,
               "name": "Additional Data"}
    }"#;

    fn registry() -> SchemaRegistry {
        SchemaRegistry::load_str(SCHEMA).expect("load")
    }

    #[test]
    fn llvar_prefix_is_two_digits() {
        let registry = registry();
        let pan = registry.lookup(FieldId::De(2)).expect("de2");
        assert_eq!(field_payload(pan, "41111").expect("payload"), "0541111");
    }

    #[test]
    fn lllvar_prefix_is_three_digits() {
        let registry = registry();
        let extra = registry.lookup(FieldId::De(48)).expect("de48");
        assert_eq!(field_payload(extra, "ABC").expect("payload"), "003ABC");
    }

    #[test]
    fn oversized_llvar_value_is_an_encode_error() {
        let registry = registry();
        let pan = registry.lookup(FieldId::De(2)).expect("de2");
        let long = "9".repeat(100);
        assert_eq!(
            field_payload(pan, &long),
            Err(EncodeError::LengthPrefixOverflow {
                field: 2,
                len: 100,
                limit: LLVAR_MAX,
            })
        );
    }

    #[test]
    fn fields_without_schema_are_skipped() {
        let registry = registry();
        let mut session = MessageSession::new();
        session.set(FieldId::Mti, "0100", true);
        session.set(FieldId::De(3), "000000", true);
        // No schema entry for 63; its bit may be set, but no payload appears.
        session.set(FieldId::De(63), "mystery", true);
        let wire = encode(&registry, &session).expect("encode");
        assert!(!wire.contains("mystery"));
        assert!(wire.ends_with("000000"));
    }
}
