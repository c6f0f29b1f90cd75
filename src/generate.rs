//! Default-value generator: fills active, unset fields with type-aware
//! synthetic data.
//!
//! Generation is idempotent over the *set* of populated fields: calling
//! it twice without intervening explicit updates repopulates the same
//! slots (values may differ, generation is randomized). Manually set
//! fields are never touched.

use crate::schema::{FieldId, FieldSchema, FieldType, SchemaRegistry, WireFormat};
use crate::session::MessageSession;
use rand::Rng;

/// MTI literal used when no MTI was assigned.
pub const DEFAULT_MTI: &str = "0100";

/// Fill defaults using the thread-local RNG.
pub fn fill_defaults(registry: &SchemaRegistry, session: &mut MessageSession) {
    fill_defaults_with(registry, session, &mut rand::thread_rng());
}

/// Fill every active, non-manual schema field with generated data. The
/// MTI defaults to [`DEFAULT_MTI`] only when unset and not manually
/// marked. Non-manual fields are regenerated on every call.
pub fn fill_defaults_with(
    registry: &SchemaRegistry,
    session: &mut MessageSession,
    rng: &mut impl Rng,
) {
    if session.get(FieldId::Mti).is_none() && !session.is_manual(FieldId::Mti) {
        session.set(FieldId::Mti, DEFAULT_MTI, false);
    }
    for schema in registry.iter() {
        if schema.id == FieldId::Mti {
            continue;
        }
        if schema.active && !session.is_manual(schema.id) {
            session.set(schema.id, random_value(schema, rng), false);
        }
    }
}

/// Synthesize one value matching the field's type and length bounds.
pub fn random_value(schema: &FieldSchema, rng: &mut impl Rng) -> String {
    let len = target_len(schema, rng);
    match schema.field_type {
        FieldType::Numeric => random_chars(rng, b"0123456789", len),
        FieldType::Alphanumeric => {
            random_chars(rng, b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789", len)
        }
        FieldType::Binary => random_chars(rng, b"0123456789ABCDEF", len),
        FieldType::Date => fit_len(&random_date(rng), len),
        FieldType::Time => fit_len(&random_time(rng), len),
        FieldType::Datetime => {
            fit_len(&format!("{}{}", random_date(rng), random_time(rng)), len)
        }
    }
}

fn target_len(schema: &FieldSchema, rng: &mut impl Rng) -> usize {
    match schema.format {
        WireFormat::Fixed => schema.length.unwrap_or(0) as usize,
        // Variable formats get a length anywhere within the bound.
        WireFormat::Llvar | WireFormat::Lllvar => {
            let max = schema.max_len().max(1);
            rng.gen_range(1..=max)
        }
    }
}

fn random_chars(rng: &mut impl Rng, alphabet: &[u8], len: usize) -> String {
    (0..len)
        .map(|_| alphabet[rng.gen_range(0..alphabet.len())] as char)
        .collect()
}

/// MMDD with a day that exists in every month.
fn random_date(rng: &mut impl Rng) -> String {
    format!("{:02}{:02}", rng.gen_range(1..=12), rng.gen_range(1..=28))
}

/// hhmmss.
fn random_time(rng: &mut impl Rng) -> String {
    format!(
        "{:02}{:02}{:02}",
        rng.gen_range(0..24),
        rng.gen_range(0..60),
        rng.gen_range(0..60)
    )
}

/// Truncate or right-pad with zeroes to hit an exact length.
fn fit_len(s: &str, len: usize) -> String {
    let mut out: String = s.chars().take(len).collect();
    while out.chars().count() < len {
        out.push('0');
    }
    out
}
