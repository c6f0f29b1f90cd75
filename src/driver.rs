//! Mutation/validation driver.
//!
//! Two layers: applying a single field update with the warn-don't-stop
//! policy (truncate overlong values, warn on declared-type mismatch),
//! and the negative sweep that walks a field's invalid-value catalog,
//! submitting each boundary-violating message to the external validator
//! and restoring the prior value afterward. Sweep deviations are
//! recorded as failed cases, never raised; only schema, encoding, and
//! validator-transport problems abort a sweep, and restoration is still
//! attempted before those propagate.

use crate::encode::{encode, EncodeError};
use crate::generate::fill_defaults;
use crate::schema::{FieldId, FieldSchema, FieldType, SchemaRegistry, ViolationCategory};
use crate::session::MessageSession;
use crate::validator::{MessageValidator, ValidatorError, Verdict};
use tracing::{debug, warn};

/// Non-fatal condition recorded while applying a field update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyWarning {
    /// Value exceeded the field's bound and was cut to `max_len`.
    Truncated { max_len: usize },
    /// Caller-declared type disagrees with the schema; value applied anyway.
    TypeMismatch { expected: FieldType, declared: String },
}

/// Result of resolving and applying one field update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied {
        field: FieldId,
        warnings: Vec<ApplyWarning>,
    },
    /// The display name resolved to no (or more than one) field; nothing
    /// was changed. Callers may be probing unknown-field robustness, so
    /// this is not an error.
    NoMatchingField { name: String },
    /// `apply_sample` found the field but the schema carries no sample.
    NoSampleData { field: FieldId },
}

/// Resolve `field_ref` (a display name) and store `value` for it,
/// marking the field manual. Overlong values are truncated to the
/// schema bound; a declared-type mismatch is warned about but does not
/// block the update.
pub fn apply_update(
    registry: &SchemaRegistry,
    session: &mut MessageSession,
    field_ref: &str,
    value: &str,
    declared_type: &str,
) -> ApplyOutcome {
    let Some(schema) = registry
        .find_by_display_name(field_ref)
        .and_then(|id| registry.lookup(id))
    else {
        warn!(field_ref, "no matching field for update");
        return ApplyOutcome::NoMatchingField {
            name: field_ref.to_string(),
        };
    };
    let warnings = apply_value(session, schema, value, declared_type);
    ApplyOutcome::Applied {
        field: schema.id,
        warnings,
    }
}

/// Like [`apply_update`], but takes the value from the schema's own
/// `SampleData` entry.
pub fn apply_sample(
    registry: &SchemaRegistry,
    session: &mut MessageSession,
    field_ref: &str,
    declared_type: &str,
) -> ApplyOutcome {
    let Some(schema) = registry
        .find_by_display_name(field_ref)
        .and_then(|id| registry.lookup(id))
    else {
        warn!(field_ref, "no matching field for sample update");
        return ApplyOutcome::NoMatchingField {
            name: field_ref.to_string(),
        };
    };
    let Some(sample) = schema.sample_data.clone() else {
        warn!(field = %schema.id, "schema carries no sample data");
        return ApplyOutcome::NoSampleData { field: schema.id };
    };
    let warnings = apply_value(session, schema, &sample, declared_type);
    ApplyOutcome::Applied {
        field: schema.id,
        warnings,
    }
}

/// Shared apply policy: truncate to bound, warn on type mismatch, store
/// as manual.
fn apply_value(
    session: &mut MessageSession,
    schema: &FieldSchema,
    value: &str,
    declared_type: &str,
) -> Vec<ApplyWarning> {
    let mut warnings = Vec::new();
    let max_len = schema.max_len();
    let value = if value.chars().count() > max_len {
        warn!(
            field = %schema.id,
            max_len,
            "value exceeds max length, truncating"
        );
        warnings.push(ApplyWarning::Truncated { max_len });
        value.chars().take(max_len).collect::<String>()
    } else {
        value.to_string()
    };
    if !schema.field_type.matches_name(declared_type) {
        warn!(
            field = %schema.id,
            expected = %schema.field_type,
            declared = declared_type,
            "declared type disagrees with schema"
        );
        warnings.push(ApplyWarning::TypeMismatch {
            expected: schema.field_type,
            declared: declared_type.to_string(),
        });
    }
    session.set(schema.id, value, true);
    warnings
}

/// Outcome of one violation-category trial.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaseOutcome {
    /// Invalid value rejected, restored value re-accepted.
    Passed,
    /// The validator accepted the boundary-violating message.
    InvalidAccepted,
    /// The restored baseline was rejected.
    RestoreRejected { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseResult {
    pub category: ViolationCategory,
    pub description: String,
    pub outcome: CaseOutcome,
}

impl CaseResult {
    pub fn passed(&self) -> bool {
        self.outcome == CaseOutcome::Passed
    }
}

/// Per-field sweep report: one entry per catalog category tried.
#[derive(Debug, Clone)]
pub struct SweepReport {
    pub field: FieldId,
    pub field_name: String,
    pub cases: Vec<CaseResult>,
}

impl SweepReport {
    pub fn all_passed(&self) -> bool {
        self.cases.iter().all(CaseResult::passed)
    }
}

/// Aggregate counts across a whole-schema run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepSummary {
    pub total: usize,
    pub passed: usize,
}

impl SweepSummary {
    pub fn all_passed(&self) -> bool {
        self.total == self.passed
    }
}

/// A whole-schema sweep: per-field reports plus the aggregate summary.
#[derive(Debug, Clone)]
pub struct SweepRun {
    pub reports: Vec<SweepReport>,
    pub summary: SweepSummary,
}

#[derive(Debug, thiserror::Error)]
pub enum SweepError {
    #[error("Encode: {0}")]
    Encode(#[from] EncodeError),
    #[error("Validator: {0}")]
    Validator(#[from] ValidatorError),
    #[error("No field named {0:?}")]
    FieldNotFound(String),
    #[error("Baseline message was rejected before any mutation: {0}")]
    BaselineRejected(String),
}

/// Run the negative sweep for one field, addressed by display name.
///
/// For each violation category the schema carries, in the fixed category
/// order: snapshot the current value, apply the catalog's invalid value,
/// regenerate defaults, encode, submit, and require rejection; then
/// restore the snapshot and require the rebuilt message to be accepted
/// again. Every category starts from the restored baseline.
pub fn run_negative_sweep<V: MessageValidator>(
    registry: &SchemaRegistry,
    session: &mut MessageSession,
    validator: &V,
    field_ref: &str,
) -> Result<SweepReport, SweepError> {
    let schema = registry
        .find_by_display_name(field_ref)
        .and_then(|id| registry.lookup(id))
        .ok_or_else(|| SweepError::FieldNotFound(field_ref.to_string()))?;
    sweep_field(registry, session, validator, schema)
}

fn sweep_field<V: MessageValidator>(
    registry: &SchemaRegistry,
    session: &mut MessageSession,
    validator: &V,
    schema: &FieldSchema,
) -> Result<SweepReport, SweepError> {
    let mut cases = Vec::new();
    for category in ViolationCategory::ALL {
        let Some(case) = schema.invalid_case(category) else {
            continue;
        };
        let snapshot = session.get(schema.id).map(str::to_string);
        debug!(field = %schema.id, %category, "trying invalid value");

        apply_value(session, schema, &case.value, schema.field_type.as_str());
        fill_defaults(registry, session);
        let invalid_wire = match encode(registry, session) {
            Ok(wire) => wire,
            Err(e) => {
                restore(registry, session, schema, snapshot.as_deref());
                return Err(e.into());
            }
        };
        let invalid_verdict = match validator.validate(&invalid_wire) {
            Ok(v) => v,
            Err(e) => {
                restore(registry, session, schema, snapshot.as_deref());
                return Err(e.into());
            }
        };

        restore(registry, session, schema, snapshot.as_deref());
        let restored_wire = encode(registry, session)?;
        let restored_verdict = validator.validate(&restored_wire)?;

        let outcome = if invalid_verdict.is_accepted() {
            CaseOutcome::InvalidAccepted
        } else if let Verdict::Rejected { reason } = restored_verdict {
            CaseOutcome::RestoreRejected { reason }
        } else {
            CaseOutcome::Passed
        };
        if outcome != CaseOutcome::Passed {
            warn!(field = %schema.id, %category, ?outcome, "sweep case failed");
        }
        cases.push(CaseResult {
            category,
            description: case.description.clone(),
            outcome,
        });
    }
    Ok(SweepReport {
        field: schema.id,
        field_name: schema.name.clone(),
        cases,
    })
}

/// Put the snapshotted value back (or drop the slot entirely when there
/// was none) and rebuild the rest of the message.
fn restore(
    registry: &SchemaRegistry,
    session: &mut MessageSession,
    schema: &FieldSchema,
    snapshot: Option<&str>,
) {
    match snapshot {
        Some(value) => {
            apply_value(session, schema, value, schema.field_type.as_str());
        }
        None => session.remove(schema.id),
    }
    fill_defaults(registry, session);
}

/// Verify the baseline message is accepted, then sweep every schema
/// field in schema order. A rejected baseline aborts the run; individual
/// case failures are collected and the run continues.
pub fn sweep_all_fields<V: MessageValidator>(
    registry: &SchemaRegistry,
    session: &mut MessageSession,
    validator: &V,
) -> Result<SweepRun, SweepError> {
    fill_defaults(registry, session);
    let baseline = encode(registry, session)?;
    if let Verdict::Rejected { reason } = validator.validate(&baseline)? {
        return Err(SweepError::BaselineRejected(reason));
    }

    let mut reports = Vec::new();
    let mut summary = SweepSummary::default();
    for schema in registry.iter() {
        let report = sweep_field(registry, session, validator, schema)?;
        summary.total += report.cases.len();
        summary.passed += report.cases.iter().filter(|c| c.passed()).count();
        reports.push(report);
    }
    Ok(SweepRun { reports, summary })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaRegistry;

    const SCHEMA: &str = r#"{
        "MTI": {"type": "numeric", "format": "fixed", "length": 4, "active": true,
                "name": "Message Type Indicator", "SampleData": "0100"},
        "2": {"type": "numeric", "format": "llvar", "max_length": 19, "active": true,
              "name": "Primary Account Number", "SampleData": "4111111111111111"}
    }"#;

    fn registry() -> SchemaRegistry {
        SchemaRegistry::load_str(SCHEMA).expect("load")
    }

    #[test]
    fn unresolved_name_is_a_no_op() {
        let registry = registry();
        let mut session = MessageSession::new();
        let outcome = apply_update(&registry, &mut session, "Ghost Field", "1", "numeric");
        assert_eq!(
            outcome,
            ApplyOutcome::NoMatchingField {
                name: "Ghost Field".to_string()
            }
        );
        assert_eq!(session.populated().count(), 0);
    }

    #[test]
    fn overlong_value_is_truncated_with_warning() {
        let registry = registry();
        let mut session = MessageSession::new();
        let long = "9".repeat(25);
        let outcome = apply_update(
            &registry,
            &mut session,
            "Primary Account Number",
            &long,
            "numeric",
        );
        let ApplyOutcome::Applied { field, warnings } = outcome else {
            panic!("expected Applied");
        };
        assert_eq!(field, FieldId::De(2));
        assert_eq!(warnings, vec![ApplyWarning::Truncated { max_len: 19 }]);
        assert_eq!(session.get(FieldId::De(2)), Some("9".repeat(19).as_str()));
    }

    #[test]
    fn type_mismatch_warns_but_applies() {
        let registry = registry();
        let mut session = MessageSession::new();
        let outcome = apply_update(
            &registry,
            &mut session,
            "Primary Account Number",
            "4111",
            "alphanumeric",
        );
        let ApplyOutcome::Applied { warnings, .. } = outcome else {
            panic!("expected Applied");
        };
        assert_eq!(
            warnings,
            vec![ApplyWarning::TypeMismatch {
                expected: FieldType::Numeric,
                declared: "alphanumeric".to_string()
            }]
        );
        assert_eq!(session.get(FieldId::De(2)), Some("4111"));
    }

    #[test]
    fn sample_update_without_sample_data_is_a_no_op() {
        let json = r#"{
            "3": {"type": "numeric", "format": "fixed", "length": 6, "active": true,
                  "name": "Processing Code"}
        }"#;
        let registry = SchemaRegistry::load_str(json).expect("load");
        let mut session = MessageSession::new();
        let outcome = apply_sample(&registry, &mut session, "Processing Code", "numeric");
        assert_eq!(
            outcome,
            ApplyOutcome::NoSampleData {
                field: FieldId::De(3)
            }
        );
        assert_eq!(session.get(FieldId::De(3)), None);
    }

    #[test]
    fn sample_update_uses_schema_sample_data() {
        let registry = registry();
        let mut session = MessageSession::new();
        let outcome = apply_sample(&registry, &mut session, "Primary Account Number", "numeric");
        assert!(matches!(outcome, ApplyOutcome::Applied { .. }));
        assert_eq!(session.get(FieldId::De(2)), Some("4111111111111111"));
        assert!(session.is_manual(FieldId::De(2)));
    }
}
