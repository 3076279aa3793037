//! CLI entry point for infraguard.
//!
//! This module is intentionally thin: it handles argument parsing, I/O, logging setup, and exit
//! codes. All business logic lives in the `infraguard-app` crate.

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Parser, Subcommand};
use infraguard_app::{
    CheckInput, EXIT_LOAD_ERROR, LintInput, RulesInput, format_lint, parse_report_json,
    render_annotations, render_markdown, run_check, run_lint, serialize_report, to_renderable,
    verdict_exit_code,
};
use infraguard_domain::CancellationToken;
use infraguard_settings::{Overrides, RuleFormat};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "infraguard",
    version,
    about = "Policy evaluation for infrastructure change snapshots"
)]
struct Cli {
    /// Path to infraguard config TOML (a missing file means defaults).
    #[arg(long, global = true, default_value = "infraguard.toml")]
    config: Utf8PathBuf,

    /// Increase log verbosity (-v info, -vv debug). `RUST_LOG` wins when set.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Evaluate rules against a change document and write the report.
    Check {
        /// Change document (JSON) to evaluate.
        #[arg(long)]
        resources: Utf8PathBuf,

        /// Rule file (TOML, or JSON by extension).
        #[arg(long)]
        rules: Option<Utf8PathBuf>,

        /// Built-in rule pack to load; repeatable. Replaces the configured packs.
        #[arg(long = "pack")]
        packs: Vec<String>,

        /// Override the document dialect (native|plan|admission|build).
        #[arg(long)]
        dialect: Option<String>,

        /// Override the evaluation deadline in milliseconds.
        #[arg(long)]
        deadline_ms: Option<u64>,

        /// Override the number of evaluation threads.
        #[arg(long)]
        threads: Option<usize>,

        /// Where to write the JSON report (stdout if not specified).
        #[arg(long)]
        report_out: Option<Utf8PathBuf>,

        /// Write a Markdown report alongside the JSON.
        #[arg(long)]
        write_markdown: bool,

        /// Where to write the Markdown report (if enabled).
        #[arg(long, default_value = "artifacts/infraguard/comment.md")]
        markdown_out: Utf8PathBuf,
    },

    /// Report concerns whose rules disagree on severity across domains.
    Lint {
        /// Rule file (TOML, or JSON by extension).
        #[arg(long)]
        rules: Option<Utf8PathBuf>,

        /// Built-in rule pack to load; repeatable. Replaces the configured packs.
        #[arg(long = "pack")]
        packs: Vec<String>,
    },

    /// Render markdown from an existing JSON report.
    Md {
        /// Path to the JSON report file.
        #[arg(long, default_value = "artifacts/infraguard/report.json")]
        report: Utf8PathBuf,

        /// Where to write the Markdown output (if not specified, prints to stdout).
        #[arg(long, short)]
        output: Option<Utf8PathBuf>,
    },

    /// Render GitHub Actions annotations from an existing JSON report.
    Annotations {
        /// Path to the JSON report file.
        #[arg(long, default_value = "artifacts/infraguard/report.json")]
        report: Utf8PathBuf,

        /// Maximum number of annotations to emit.
        #[arg(long, default_value = "10")]
        max: usize,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.cmd {
        Commands::Check {
            ref resources,
            ref rules,
            ref packs,
            ref dialect,
            deadline_ms,
            threads,
            ref report_out,
            write_markdown,
            ref markdown_out,
        } => {
            let overrides = Overrides {
                dialect: dialect.clone(),
                packs: packs.clone(),
                deadline_ms,
                threads,
            };
            let code = exit_on_load_error(cmd_check(
                &cli.config,
                resources,
                rules.as_deref(),
                overrides,
                report_out.as_deref(),
                write_markdown.then_some(markdown_out.as_path()),
            ));
            exit_with(code)
        }
        Commands::Lint {
            ref rules,
            ref packs,
        } => {
            let overrides = Overrides {
                packs: packs.clone(),
                ..Overrides::default()
            };
            let code = exit_on_load_error(cmd_lint(&cli.config, rules.as_deref(), overrides));
            exit_with(code)
        }
        Commands::Md { report, output } => exit_with(exit_on_load_error(cmd_md(report, output))),
        Commands::Annotations { report, max } => {
            exit_with(exit_on_load_error(cmd_annotations(report, max)))
        }
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn exit_on_load_error(result: anyhow::Result<i32>) -> i32 {
    match result {
        Ok(code) => code,
        Err(err) => {
            eprintln!("infraguard error: {err:#}");
            EXIT_LOAD_ERROR
        }
    }
}

fn exit_with(code: i32) -> anyhow::Result<()> {
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}

fn cmd_check(
    config: &Utf8Path,
    resources: &Utf8Path,
    rules: Option<&Utf8Path>,
    overrides: Overrides,
    report_out: Option<&Utf8Path>,
    markdown_out: Option<&Utf8Path>,
) -> anyhow::Result<i32> {
    let cfg_text = read_config(config)?;
    let resources_text = std::fs::read_to_string(resources)
        .with_context(|| format!("read resources: {}", resources))?;
    let rules_text = rules.map(read_rules).transpose()?;

    let input = CheckInput {
        config_text: &cfg_text,
        rules: rules_input(rules, rules_text.as_deref()),
        resources_text: &resources_text,
        overrides,
        cancel: CancellationToken::new(),
    };

    let output = run_check(input)?;
    debug!(
        resources = output.stats.resources,
        rules = output.stats.rules,
        units = output.stats.units_evaluated,
        skipped = output.stats.units_skipped,
        "run stats"
    );
    if let Some(reason) = output.stats.interrupted {
        eprintln!("infraguard: {reason}; report is incomplete");
    }

    let data = serialize_report(&output.report)?;
    match report_out {
        Some(path) => write_file(path, &data).context("write report json")?,
        None => print!("{}", String::from_utf8_lossy(&data)),
    }

    if let Some(path) = markdown_out {
        let md = render_markdown(&to_renderable(&output.report));
        write_file(path, md.as_bytes()).context("write markdown")?;
    }

    Ok(verdict_exit_code(output.report.verdict))
}

fn cmd_lint(
    config: &Utf8Path,
    rules: Option<&Utf8Path>,
    overrides: Overrides,
) -> anyhow::Result<i32> {
    let cfg_text = read_config(config)?;
    let rules_text = rules.map(read_rules).transpose()?;

    let output = run_lint(LintInput {
        config_text: &cfg_text,
        rules: rules_input(rules, rules_text.as_deref()),
        overrides,
    })?;

    print!("{}", format_lint(&output));
    Ok(output.exit_code())
}

fn cmd_md(report_path: Utf8PathBuf, output: Option<Utf8PathBuf>) -> anyhow::Result<i32> {
    let report_text = std::fs::read_to_string(&report_path)
        .with_context(|| format!("read report: {}", report_path))?;
    let report = parse_report_json(&report_text)?;
    let md = render_markdown(&to_renderable(&report));

    if let Some(out_path) = output {
        write_file(&out_path, md.as_bytes()).context("write markdown output")?;
    } else {
        print!("{}", md);
    }

    Ok(0)
}

fn cmd_annotations(report_path: Utf8PathBuf, max: usize) -> anyhow::Result<i32> {
    let report_text = std::fs::read_to_string(&report_path)
        .with_context(|| format!("read report: {}", report_path))?;
    let report = parse_report_json(&report_text)?;

    for annotation in render_annotations(&to_renderable(&report), max) {
        println!("{}", annotation);
    }

    Ok(0)
}

/// Missing config file is allowed (defaults apply); any other read error is not.
fn read_config(path: &Utf8Path) -> anyhow::Result<String> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(text),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path, "no config file; using defaults");
            Ok(String::new())
        }
        Err(err) => Err(err).with_context(|| format!("read config: {}", path)),
    }
}

fn read_rules(path: &Utf8Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("read rules: {}", path))
}

fn rules_input<'a>(path: Option<&Utf8Path>, text: Option<&'a str>) -> Option<RulesInput<'a>> {
    let (path, text) = path.zip(text)?;
    Some(RulesInput {
        text,
        format: RuleFormat::from_extension(path.extension()),
    })
}

fn write_file(path: &Utf8Path, data: &[u8]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_str().is_empty()
    {
        std::fs::create_dir_all(parent).with_context(|| format!("create directory: {}", parent))?;
    }
    std::fs::write(path, data).with_context(|| format!("write file: {}", path))?;
    Ok(())
}
