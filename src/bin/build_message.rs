use anyhow::Context;
use isoforge::{
    apply_update, encode, encode_structured, fill_defaults, ApplyOutcome, HttpValidator,
    MessageSession, MessageValidator, SchemaRegistry, Verdict,
};
use std::path::PathBuf;

/// Build an ISO 8583 message from a schema file and optional
/// `Name=Value` assignments, print the wire message and the structured
/// JSON document, and optionally submit it to a validating parser.
///
/// Usage: `build_message <schema.json> [--validate URL] [NAME=VALUE ...]`
fn main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    let Some(schema_path) = args.next() else {
        eprintln!("Usage: build_message <schema.json> [--validate URL] [NAME=VALUE ...]");
        std::process::exit(2);
    };

    let mut validate_url: Option<String> = None;
    let mut assignments: Vec<(String, String)> = Vec::new();
    while let Some(arg) = args.next() {
        if arg == "--validate" {
            validate_url = args.next();
            continue;
        }
        match arg.split_once('=') {
            Some((name, value)) => assignments.push((name.to_string(), value.to_string())),
            None => {
                eprintln!("Ignoring argument without '=': {arg}");
            }
        }
    }

    let registry = SchemaRegistry::load_path(&PathBuf::from(&schema_path))
        .with_context(|| format!("loading schema {schema_path}"))?;
    let mut session = MessageSession::new();

    for (name, value) in &assignments {
        let declared = registry
            .find_by_display_name(name)
            .and_then(|id| registry.lookup(id))
            .map(|s| s.field_type.as_str())
            .unwrap_or("numeric");
        if let ApplyOutcome::NoMatchingField { name } =
            apply_update(&registry, &mut session, name, value, declared)
        {
            eprintln!("Warning: no field found for {name:?}");
        }
    }

    fill_defaults(&registry, &mut session);
    let wire = encode(&registry, &session)?;
    let structured = encode_structured(&registry, &session)?;

    println!("Generated ISO8583 Message:");
    println!("{wire}");
    println!();
    println!("Generated JSON Output:");
    println!("{}", serde_json::to_string_pretty(&structured)?);

    if let Some(url) = validate_url {
        let validator = HttpValidator::new(url);
        match validator.validate(&wire)? {
            Verdict::Accepted => println!("\nParser accepted the message"),
            Verdict::Rejected { reason } => {
                println!("\nParser rejected the message: {reason}");
                std::process::exit(1);
            }
        }
    }
    Ok(())
}
