//! # isoforge — ISO 8583 message builder and negative-testing engine
//!
//! Assembles ISO 8583-style transaction messages from a JSON field
//! schema: MTI, derived primary/secondary presence bitmaps, and data
//! elements encoded fixed-length or with 2/3-digit length prefixes
//! (LLVAR/LLLVAR). On top of the codec sits a mutation driver that
//! systematically swaps in schema-cataloged invalid values, round-trips
//! each variant through an external validating parser, and restores the
//! prior state afterward.
//!
//! ## Pieces
//!
//! - [`schema`]: typed field metadata ([`SchemaRegistry`]), parsed once
//!   from the schema document, including the invalid-value catalog.
//! - [`bitmap`]: 64-bit presence vectors and their hex packing.
//! - [`session`]: per-message value store ([`MessageSession`]) with
//!   manual-set tracking; sessions are independent, there is no shared
//!   mutable state.
//! - [`generate`]: type-aware default values for active, unset fields.
//! - [`encode`]: the wire string and the structured JSON document, kept
//!   in lockstep.
//! - [`validator`]: typed boundary to the remote parser
//!   (`Accepted`/`Rejected{reason}`), with an HTTP implementation.
//! - [`driver`]: field updates with truncation/mismatch warning policy,
//!   and the per-category negative sweep.
//!
//! ## Example
//!
//! ```no_run
//! use isoforge::{encode, fill_defaults, MessageSession, SchemaRegistry};
//!
//! let registry = SchemaRegistry::load_path("iso_config.json".as_ref())?;
//! let mut session = MessageSession::new();
//! fill_defaults(&registry, &mut session);
//! let wire = encode(&registry, &session)?;
//! println!("{wire}");
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod bitmap;
pub mod driver;
pub mod encode;
pub mod generate;
pub mod schema;
pub mod session;
pub mod validator;

pub use bitmap::{presence_from_hex, render_hex, Bitmaps};
pub use driver::{
    apply_sample, apply_update, run_negative_sweep, sweep_all_fields, ApplyOutcome, ApplyWarning,
    CaseOutcome, CaseResult, SweepError, SweepReport, SweepRun, SweepSummary,
};
pub use encode::{encode, encode_structured, EncodeError};
pub use generate::{fill_defaults, fill_defaults_with, DEFAULT_MTI};
pub use schema::{
    FieldId, FieldSchema, FieldType, SchemaError, SchemaRegistry, ViolationCategory, WireFormat,
};
pub use session::MessageSession;
pub use validator::{HttpValidator, MessageValidator, ValidatorError, Verdict};
