//! Developer tasks (schema generation, fixture conformance).
//!
//! Keeping this separate avoids bloating the end-user CLI.

use anyhow::{Context, bail};
use infraguard_types::SCHEMA_REPORT_V1;
use infraguard_types::ids::SCHEMA_CONFIG_V1;
use schemars::schema_for;
use std::fs;
use std::path::{Path, PathBuf};

/// Get the project root (parent of xtask directory).
fn project_root() -> PathBuf {
    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    match manifest_dir.parent() {
        Some(parent) if manifest_dir.ends_with("xtask") => parent.to_path_buf(),
        _ => manifest_dir,
    }
}

fn schemas_dir() -> PathBuf {
    project_root().join("schemas")
}

fn fixtures_dir() -> PathBuf {
    project_root().join("tests").join("fixtures")
}

/// Schema definition with its target filename.
struct SchemaSpec {
    id: &'static str,
    generate: fn() -> schemars::Schema,
}

impl SchemaSpec {
    fn filename(&self) -> String {
        format!("{}.json", self.id)
    }
}

fn generate_report_schema() -> schemars::Schema {
    schema_for!(infraguard_types::EvaluationReport)
}

fn generate_config_schema() -> schemars::Schema {
    schema_for!(infraguard_settings::InfraguardConfigV1)
}

fn schema_specs() -> Vec<SchemaSpec> {
    vec![
        SchemaSpec {
            id: SCHEMA_REPORT_V1,
            generate: generate_report_schema,
        },
        SchemaSpec {
            id: SCHEMA_CONFIG_V1,
            generate: generate_config_schema,
        },
    ]
}

/// Serialize a schema to pretty-printed JSON with trailing newline.
fn serialize_schema(schema: &schemars::Schema) -> anyhow::Result<String> {
    let mut json = serde_json::to_string_pretty(schema).context("Failed to serialize schema")?;
    json.push('\n');
    Ok(json)
}

fn emit_schemas() -> anyhow::Result<()> {
    let dir = schemas_dir();
    fs::create_dir_all(&dir).context("Failed to create schemas directory")?;

    for spec in schema_specs() {
        let json = serialize_schema(&(spec.generate)())?;
        let path = dir.join(spec.filename());
        fs::write(&path, &json)
            .with_context(|| format!("Failed to write schema to {}", path.display()))?;
        println!("Wrote {}", path.display());
    }

    println!("\nSchemas emitted successfully.");
    Ok(())
}

/// Validate that schemas in the repo match what would be generated.
fn validate_schemas() -> anyhow::Result<()> {
    let dir = schemas_dir();
    let mut missing = Vec::new();
    let mut mismatched = Vec::new();

    for spec in schema_specs() {
        let path = dir.join(spec.filename());
        if !path.exists() {
            missing.push(spec.filename());
            continue;
        }

        let expected = serialize_schema(&(spec.generate)())?;
        let actual = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        if expected != actual {
            mismatched.push(spec.filename());
        }
    }

    if missing.is_empty() && mismatched.is_empty() {
        println!("All schemas are up to date.");
        return Ok(());
    }
    if !missing.is_empty() {
        eprintln!("Missing schemas:");
        for name in &missing {
            eprintln!("  - {}", name);
        }
    }
    if !mismatched.is_empty() {
        eprintln!("Schemas out of date:");
        for name in &mismatched {
            eprintln!("  - {}", name);
        }
    }
    eprintln!("\nRun `cargo xtask emit-schemas` to regenerate.");
    bail!("Schema validation failed")
}

fn compile(schema: &schemars::Schema) -> anyhow::Result<jsonschema::Validator> {
    let value = serde_json::to_value(schema).context("Failed to convert schema")?;
    jsonschema::validator_for(&value).map_err(|e| anyhow::anyhow!("Failed to compile schema: {e}"))
}

fn check_instance(
    validator: &jsonschema::Validator,
    path: &Path,
    instance: &serde_json::Value,
    errors: &mut Vec<String>,
) {
    for err in validator.iter_errors(instance) {
        errors.push(format!("{}: {}", path.display(), err));
    }
}

/// Validate fixture reports and configs against the generated schemas.
fn conform() -> anyhow::Result<()> {
    let report_schema = compile(&generate_report_schema())?;
    let config_schema = compile(&generate_config_schema())?;

    let mut entries: Vec<PathBuf> = fs::read_dir(fixtures_dir())
        .context("Failed to read tests/fixtures")?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.is_dir())
        .collect();
    entries.sort();

    let mut errors = Vec::new();
    let mut checked = 0usize;
    for dir in entries {
        let report = dir.join("expected.report.json");
        if report.exists() {
            let text = fs::read_to_string(&report)
                .with_context(|| format!("Failed to read {}", report.display()))?;
            let value: serde_json::Value = serde_json::from_str(&text)
                .with_context(|| format!("Failed to parse {}", report.display()))?;
            check_instance(&report_schema, &report, &value, &mut errors);
            checked += 1;
        }

        let config = dir.join("infraguard.toml");
        if config.exists() {
            let text = fs::read_to_string(&config)
                .with_context(|| format!("Failed to read {}", config.display()))?;
            let parsed: toml::Value = toml::from_str(&text)
                .with_context(|| format!("Failed to parse {}", config.display()))?;
            let value = serde_json::to_value(parsed).context("Failed to convert config")?;
            check_instance(&config_schema, &config, &value, &mut errors);
            checked += 1;
        }
    }

    if errors.is_empty() {
        println!("{checked} fixture files conform.");
        return Ok(());
    }
    for e in &errors {
        eprintln!("  - {e}");
    }
    bail!("Conformance failed with {} errors", errors.len())
}

fn print_help() {
    eprintln!("xtask commands:");
    eprintln!("  help              Show this message");
    eprintln!("  emit-schemas      Generate JSON schemas from Rust types to schemas/");
    eprintln!("  validate-schemas  Check if schemas/ matches generated output (for CI)");
    eprintln!("  print-schema-ids  Print known schema IDs");
    eprintln!("  conform           Validate fixture reports and configs against the schemas");
}

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let cmd = args.get(1).map(|s| s.as_str()).unwrap_or("help");

    match cmd {
        "help" | "--help" | "-h" => {
            print_help();
            Ok(())
        }
        "emit-schemas" => emit_schemas(),
        "validate-schemas" => validate_schemas(),
        "conform" => conform(),
        "print-schema-ids" => {
            for spec in schema_specs() {
                println!("{}", spec.id);
            }
            Ok(())
        }
        other => bail!("unknown xtask command: {other}\n\nRun `cargo xtask help` for usage."),
    }
    .context("xtask failed")
}
