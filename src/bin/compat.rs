//! Schema Compatibility CLI
//!
//! Compares two schema versions and reports breaking, additive and neutral
//! changes together with the suggested semantic-version bump.
//!
//! Usage:
//!   schema-compat compare old.schema.json new.schema.json --current-version 1.4.2
//!   schema-compat hash order.schema.json
//!   schema-compat config show

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use schema_compat::classify::rationale;
use schema_compat::config::OutputFormat;
use schema_compat::version::parse_version;
use schema_compat::{CompatConfig, CompatibilityEngine, CompatibilityReport, VersionBump};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "schema-compat")]
#[command(about = "Check schema compatibility and recommend a version bump")]
struct Cli {
    /// Config file to load (optional)
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare two schema versions
    Compare {
        /// Previous schema version
        old: PathBuf,
        /// New schema version
        new: PathBuf,
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
        /// Report pure type widening as additive instead of breaking
        #[arg(long)]
        lenient: bool,
        /// Maximum schema nesting depth
        #[arg(long)]
        max_depth: Option<usize>,
        /// Current version; prints the next version after the suggested bump
        #[arg(long)]
        current_version: Option<String>,
        /// Proposed next version; fails if it bumps less than required
        #[arg(long, requires = "current_version")]
        proposed_version: Option<String>,
        /// Exit with status 2 when breaking changes are found
        #[arg(long)]
        fail_on_breaking: bool,
        /// Print each change with its rationale
        #[arg(short, long)]
        verbose: bool,
    },

    /// Print the content hash of a normalized schema
    Hash {
        /// Schema file
        file: PathBuf,
    },

    /// View and manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show current configuration
    Show {
        /// Output as TOML
        #[arg(long)]
        toml: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Initialize a new config file
    Init {
        /// Output path
        #[arg(short, long, default_value = "schema-compat.toml")]
        output: String,
    },
    /// Validate configuration
    Validate,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

fn run(cli: Cli) -> Result<i32> {
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Compare {
            old,
            new,
            format,
            lenient,
            max_depth,
            current_version,
            proposed_version,
            fail_on_breaking,
            verbose,
        } => {
            let mut config = CompatConfig::load_from(config_path)?;
            if lenient {
                config.engine.strict_mode = false;
            }
            if let Some(depth) = max_depth {
                config.engine.max_nesting_depth = depth;
            }
            config.validate()?;

            let engine = CompatibilityEngine::from_config(&config);
            let report = engine.compare(&read(&old)?, &read(&new)?)?;

            match format.as_str() {
                "json" => println!("{}", report.to_json(config.output.format == OutputFormat::Pretty)?),
                _ => print_text_report(&report, verbose),
            }

            let mut code = 0;
            if let Some(current) = current_version {
                let current = parse_version(&current)
                    .with_context(|| format!("invalid current version '{}'", current))?;
                let next = report.suggested_bump().apply(&current).with_context(|| {
                    format!("cannot apply a {} bump to {}", report.suggested_bump(), current)
                })?;
                eprintln!("\n📦 Next version: {} -> {}", current, next);

                if let Some(proposed) = proposed_version {
                    let proposed = parse_version(&proposed)
                        .with_context(|| format!("invalid proposed version '{}'", proposed))?;
                    let declared = VersionBump::observed(&current, &proposed);
                    if declared < report.suggested_bump() {
                        eprintln!(
                            "❌ Proposed version {} is a {} bump; changes require {}",
                            proposed,
                            declared,
                            report.suggested_bump()
                        );
                        code = 2;
                    }
                }
            }

            if report.migration_required() {
                eprintln!("\n❌ BREAKING CHANGES DETECTED - migration required");
                if fail_on_breaking || config.engine.fail_on_breaking {
                    code = 2;
                }
            } else if report.is_unchanged() {
                eprintln!("\n✅ No structural changes");
            } else {
                eprintln!("\n⚠️  Non-breaking changes detected");
            }
            Ok(code)
        }

        Commands::Hash { file } => {
            let config = CompatConfig::load_from(config_path)?;
            let engine = CompatibilityEngine::from_config(&config);
            let document = engine.parse(&read(&file)?)?;
            println!("{}  {}", document.hash(), file.display());
            Ok(0)
        }

        Commands::Config { command } => run_config(command, config_path),
    }
}

fn run_config(command: ConfigCommands, config_path: Option<&str>) -> Result<i32> {
    match command {
        ConfigCommands::Show { toml, json } => {
            let cfg = CompatConfig::load_from(config_path)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&cfg)?);
            } else if toml {
                println!("{}", ::toml::to_string_pretty(&cfg)?);
            } else {
                println!("📋 Schema Compatibility Configuration\n");
                println!("Engine:");
                println!("  Max nesting depth: {}", cfg.engine.max_nesting_depth);
                println!("  Strict mode: {}", cfg.engine.strict_mode);
                println!("  Fail on breaking: {}", cfg.engine.fail_on_breaking);
                println!("\nCache:");
                println!("  Capacity: {}", cfg.cache.capacity);
                println!("\nScheduler:");
                println!("  Debounce: {}ms", cfg.scheduler.debounce_ms);
                println!("\nOutput:");
                println!("  Format: {:?}", cfg.output.format);
            }
            Ok(0)
        }

        ConfigCommands::Init { output } => {
            CompatConfig::default().save(&output)?;
            println!("✅ Created config file: {}", output);
            Ok(0)
        }

        ConfigCommands::Validate => match CompatConfig::load_from(config_path) {
            Ok(cfg) => {
                println!("✅ Configuration is valid");
                println!("   Strict mode: {}", cfg.engine.strict_mode);
                println!("   Max depth: {}", cfg.engine.max_nesting_depth);
                Ok(0)
            }
            Err(e) => {
                eprintln!("❌ Configuration error: {}", e);
                Ok(1)
            }
        },
    }
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

/// Print human-readable report
fn print_text_report(report: &CompatibilityReport, verbose: bool) {
    println!("═══════════════════════════════════════════════════════════════════");
    println!("                  SCHEMA COMPATIBILITY REPORT                      ");
    println!("═══════════════════════════════════════════════════════════════════\n");

    let sections = [
        ("🔴 BREAKING CHANGES", report.breaking()),
        ("🟢 ADDITIVE CHANGES", report.additive()),
        ("📝 NEUTRAL CHANGES", report.neutral()),
    ];

    for (title, records) in sections {
        if records.is_empty() {
            continue;
        }
        println!("{} ({}):", title, records.len());
        for record in records {
            println!("   - {}", record.describe());
            if verbose {
                println!("       {}", rationale(record.change_kind));
            }
        }
        println!();
    }

    println!("📊 SUMMARY:");
    println!("   {}", report.summary());
    println!("   Suggested bump:     {}", report.suggested_bump());
    println!("   Confidence:         {:.2}", report.confidence());
    println!("   Migration required: {}", report.migration_required());
}
