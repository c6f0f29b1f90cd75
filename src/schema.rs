//! Field schema registry: typed per-field metadata loaded from a JSON schema document.
//!
//! The schema document maps a field identifier (`"MTI"` or a data element
//! number `"1"`..`"128"`) to an object carrying the field's semantic type,
//! wire format (`fixed`/`llvar`/`lllvar`), length bounds, display name,
//! sample data, and an optional catalog of named invalid values used for
//! negative testing (`invalid_<category>_value` / `_description` pairs).
//!
//! The whole document is parsed into [`FieldSchema`] values once at load
//! time; malformed entries fail the load rather than surfacing later as
//! per-access coercion errors. The registry is read-only after load and is
//! shared across message-build sessions.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

/// Identity of a message slot: the MTI or a data element number (1..=128).
///
/// Bitmaps have no identity here on purpose: they are derived from field
/// presence and can never be assigned directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FieldId {
    /// Message Type Indicator, stored ahead of all data elements.
    Mti,
    /// Data element 1..=128.
    De(u8),
}

impl FieldId {
    /// Parse a schema document key. `"MTI"` or a number in 1..=128.
    pub fn parse(key: &str) -> Option<FieldId> {
        if key.eq_ignore_ascii_case("MTI") {
            return Some(FieldId::Mti);
        }
        match key.parse::<u8>() {
            Ok(n) if (1..=128).contains(&n) => Some(FieldId::De(n)),
            _ => None,
        }
    }

    /// True for data elements 1..=64 (signaled by the primary bitmap).
    pub fn is_primary(&self) -> bool {
        matches!(self, FieldId::De(n) if *n <= 64)
    }

    /// True for data elements 65..=128 (signaled by the secondary bitmap).
    pub fn is_secondary(&self) -> bool {
        matches!(self, FieldId::De(n) if *n >= 65)
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldId::Mti => write!(f, "MTI"),
            FieldId::De(n) => write!(f, "{n}"),
        }
    }
}

/// Semantic data type of a field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Numeric,
    Alphanumeric,
    Binary,
    Date,
    Time,
    Datetime,
}

impl FieldType {
    fn parse(s: &str) -> Option<FieldType> {
        match s.to_ascii_lowercase().as_str() {
            "numeric" => Some(FieldType::Numeric),
            "alphanumeric" => Some(FieldType::Alphanumeric),
            "binary" => Some(FieldType::Binary),
            "date" => Some(FieldType::Date),
            "time" => Some(FieldType::Time),
            "datetime" => Some(FieldType::Datetime),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Numeric => "numeric",
            FieldType::Alphanumeric => "alphanumeric",
            FieldType::Binary => "binary",
            FieldType::Date => "date",
            FieldType::Time => "time",
            FieldType::Datetime => "datetime",
        }
    }

    /// Case-insensitive comparison against a caller-declared type name.
    pub fn matches_name(&self, name: &str) -> bool {
        name.eq_ignore_ascii_case(self.as_str())
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// On-wire layout of a field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireFormat {
    /// Exact length, no prefix.
    Fixed,
    /// 2-digit zero-padded decimal length prefix.
    Llvar,
    /// 3-digit zero-padded decimal length prefix.
    Lllvar,
}

impl WireFormat {
    fn parse(s: &str) -> Option<WireFormat> {
        match s.to_ascii_lowercase().as_str() {
            "fixed" => Some(WireFormat::Fixed),
            "llvar" => Some(WireFormat::Llvar),
            "lllvar" => Some(WireFormat::Lllvar),
            _ => None,
        }
    }
}

/// A named class of schema-rule breach with a literal value exhibiting it.
///
/// Order of the variants is the fixed sweep order of the mutation driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ViolationCategory {
    InvalidType,
    SpecialChars,
    LengthShort,
    LengthLong,
    Empty,
    ExceedsMaxLength,
    MalformedDatetime,
    MalformedTime,
    MalformedDate,
    BinaryChars,
}

impl ViolationCategory {
    /// All categories in sweep order.
    pub const ALL: [ViolationCategory; 10] = [
        ViolationCategory::InvalidType,
        ViolationCategory::SpecialChars,
        ViolationCategory::LengthShort,
        ViolationCategory::LengthLong,
        ViolationCategory::Empty,
        ViolationCategory::ExceedsMaxLength,
        ViolationCategory::MalformedDatetime,
        ViolationCategory::MalformedTime,
        ViolationCategory::MalformedDate,
        ViolationCategory::BinaryChars,
    ];

    /// Schema document key stem; the document carries `<stem>_value` and
    /// optionally `<stem>_description`.
    pub fn key(&self) -> &'static str {
        match self {
            ViolationCategory::InvalidType => "invalid_type",
            ViolationCategory::SpecialChars => "invalid_special_chars",
            ViolationCategory::LengthShort => "invalid_length_short",
            ViolationCategory::LengthLong => "invalid_length_long",
            ViolationCategory::Empty => "invalid_empty",
            ViolationCategory::ExceedsMaxLength => "invalid_length_exceed_max",
            ViolationCategory::MalformedDatetime => "invalid_datetime",
            ViolationCategory::MalformedTime => "invalid_time",
            ViolationCategory::MalformedDate => "invalid_date",
            ViolationCategory::BinaryChars => "invalid_binary_chars",
        }
    }
}

impl fmt::Display for ViolationCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// One entry of a field's invalid-value catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidCase {
    pub value: String,
    pub description: String,
}

/// Typed metadata for one field (or the MTI).
#[derive(Debug, Clone)]
pub struct FieldSchema {
    pub id: FieldId,
    /// Human-facing label used by test tables to address the field.
    pub name: String,
    pub field_type: FieldType,
    pub format: WireFormat,
    /// Exact length for `fixed`; also accepted as the bound when
    /// `max_length` is absent.
    pub length: Option<u32>,
    /// Upper bound for variable formats.
    pub max_length: Option<u32>,
    /// Whether the default generator populates this field when unset.
    pub active: bool,
    pub sample_data: Option<String>,
    invalid_cases: BTreeMap<ViolationCategory, InvalidCase>,
}

impl FieldSchema {
    /// Maximum allowed value length: `max_length`, falling back to `length`.
    pub fn max_len(&self) -> usize {
        self.max_length.or(self.length).unwrap_or(0) as usize
    }

    /// Catalog entry for a violation category, if the schema carries one.
    pub fn invalid_case(&self, category: ViolationCategory) -> Option<&InvalidCase> {
        self.invalid_cases.get(&category)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Schema key {0:?} is not MTI or a data element number in 1..=128")]
    BadFieldKey(String),
    #[error("Field {field}: unknown type {value:?}")]
    UnknownType { field: String, value: String },
    #[error("Field {field}: unknown format {value:?}")]
    UnknownFormat { field: String, value: String },
    #[error("Field {field}: fixed format requires an exact length")]
    MissingFixedLength { field: String },
    #[error("Field {field}: length bound must be a positive upper bound")]
    BadLengthBound { field: String },
    #[error("Field {field}: {key}_value must be a string")]
    BadCatalogValue { field: String, key: &'static str },
}

/// Raw per-field entry as it appears in the schema document. Catalog keys
/// are flattened alongside the structural ones, so they land in `extra`.
#[derive(Deserialize)]
struct RawField {
    #[serde(rename = "type")]
    field_type: String,
    format: String,
    length: Option<u32>,
    max_length: Option<u32>,
    active: bool,
    name: String,
    #[serde(rename = "SampleData")]
    sample_data: Option<String>,
    #[serde(flatten)]
    extra: BTreeMap<String, serde_json::Value>,
}

/// Read-only catalog of field metadata for one schema, shared across sessions.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    fields: BTreeMap<FieldId, FieldSchema>,
}

impl SchemaRegistry {
    /// Parse a schema document from a JSON string. Fails fast on the first
    /// malformed entry.
    pub fn load_str(json: &str) -> Result<Self, SchemaError> {
        let doc: BTreeMap<String, serde_json::Value> = serde_json::from_str(json)?;
        let mut fields = BTreeMap::new();
        for (key, node) in doc {
            // Bitmap entries are derived, never schema-driven slots.
            if key.eq_ignore_ascii_case("PrimaryBitmap")
                || key.eq_ignore_ascii_case("SecondaryBitmap")
            {
                continue;
            }
            let id = FieldId::parse(&key).ok_or_else(|| SchemaError::BadFieldKey(key.clone()))?;
            let raw: RawField = serde_json::from_value(node)?;
            let schema = convert_field(id, &key, raw)?;
            fields.insert(id, schema);
        }
        Ok(SchemaRegistry { fields })
    }

    /// Load a schema document from a file path.
    pub fn load_path(path: &Path) -> Result<Self, SchemaError> {
        let text = std::fs::read_to_string(path)?;
        Self::load_str(&text)
    }

    pub fn lookup(&self, id: FieldId) -> Option<&FieldSchema> {
        self.fields.get(&id)
    }

    /// Resolve a display name back to its field identity.
    ///
    /// Absent and ambiguous names both come back as `None`; callers treat
    /// either as "no matching field" rather than an error.
    pub fn find_by_display_name(&self, name: &str) -> Option<FieldId> {
        let mut found = None;
        for schema in self.fields.values() {
            if schema.name == name {
                if found.is_some() {
                    return None;
                }
                found = Some(schema.id);
            }
        }
        found
    }

    /// All field schemas in ascending order, MTI first.
    pub fn iter(&self) -> impl Iterator<Item = &FieldSchema> {
        self.fields.values()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

fn convert_field(id: FieldId, key: &str, raw: RawField) -> Result<FieldSchema, SchemaError> {
    let field_type =
        FieldType::parse(&raw.field_type).ok_or_else(|| SchemaError::UnknownType {
            field: key.to_string(),
            value: raw.field_type.clone(),
        })?;
    let format = WireFormat::parse(&raw.format).ok_or_else(|| SchemaError::UnknownFormat {
        field: key.to_string(),
        value: raw.format.clone(),
    })?;
    if format == WireFormat::Fixed && raw.length.is_none() {
        return Err(SchemaError::MissingFixedLength {
            field: key.to_string(),
        });
    }
    match raw.max_length.or(raw.length) {
        Some(bound) if bound > 0 => {}
        _ => {
            return Err(SchemaError::BadLengthBound {
                field: key.to_string(),
            })
        }
    }

    let mut invalid_cases = BTreeMap::new();
    for category in ViolationCategory::ALL {
        let stem = category.key();
        let Some(value) = raw.extra.get(&format!("{stem}_value")) else {
            continue;
        };
        let value = value.as_str().ok_or(SchemaError::BadCatalogValue {
            field: key.to_string(),
            key: stem,
        })?;
        let description = raw
            .extra
            .get(&format!("{stem}_description"))
            .and_then(|d| d.as_str())
            .unwrap_or(stem)
            .to_string();
        invalid_cases.insert(
            category,
            InvalidCase {
                value: value.to_string(),
                description,
            },
        );
    }

    Ok(FieldSchema {
        id,
        name: raw.name,
        field_type,
        format,
        length: raw.length,
        max_length: raw.max_length,
        active: raw.active,
        sample_data: raw.sample_data,
        invalid_cases,
    })
}
