//! Drugload CLI - build NDC and SIDER hub documents from resolved records
//!
//! # Main Commands
//!
//! ```bash
//! drugload upload ndc ndc_resolved.jsonl -o ndc_docs.jsonl
//! drugload upload sider sider_resolved.jsonl --audit truncated_docs.tsv
//! ```
//!
//! # Debug Commands
//!
//! ```bash
//! drugload parse input.tsv             # Dump parsed records as JSON
//! drugload validate sider docs.jsonl   # Check documents against the schema
//! drugload mapping ndc                 # Print the index mapping
//! drugload sources                     # List sources and licenses
//! ```

use clap::{Parser, Subcommand};
use drugload::audit::DEFAULT_AUDIT_FILE;
use drugload::logging::{init_logging, LogConfig, LogFormat};
use drugload::{
    parse_records, read_records, run_upload, upload_to_file, validate_document, SourceKind,
    UploadOptions,
};
use serde_json::{json, Value};
use std::fs;
use std::io::{self, BufWriter, IsTerminal};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "drugload")]
#[command(about = "Build NDC and SIDER hub documents from resolved records", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Log output format
    #[arg(long, value_enum, default_value = "pretty", global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an uploader: resolved records → JSON-lines documents
    Upload {
        /// Data source
        #[arg(value_enum)]
        source: SourceKind,

        /// Resolved records (JSON array, JSON lines or delimited text)
        input: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write the run report as JSON
        #[arg(long)]
        report: Option<PathBuf>,

        /// Write truncated SIDER documents to this TSV file
        #[arg(long, num_args = 0..=1, default_missing_value = DEFAULT_AUDIT_FILE)]
        audit: Option<PathBuf>,

        /// Maximum side-effect entries per SIDER document
        #[arg(long)]
        max_entries: Option<usize>,

        /// Skip schema validation
        #[arg(long)]
        no_validate: bool,
    },

    /// Parse an input file and output its records as JSON
    Parse {
        /// Input file
        input: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate documents against the schema of a source
    Validate {
        /// Data source
        #[arg(value_enum)]
        source: SourceKind,

        /// Documents (JSON array or JSON lines)
        input: PathBuf,
    },

    /// Print the index mapping of a source
    Mapping {
        /// Data source
        #[arg(value_enum)]
        source: SourceKind,
    },

    /// List known sources and their metadata
    Sources,
}

fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_logging(
        &LogConfig::from_verbosity(cli.verbose)
            .with_format(cli.log_format)
            .with_ansi(io::stderr().is_terminal()),
    );

    let result = match cli.command {
        Commands::Upload {
            source,
            input,
            output,
            report,
            audit,
            max_entries,
            no_validate,
        } => cmd_upload(
            source,
            &input,
            output.as_deref(),
            report.as_deref(),
            audit,
            max_entries,
            no_validate,
        ),

        Commands::Parse { input, output } => cmd_parse(&input, output.as_deref()),

        Commands::Validate { source, input } => cmd_validate(source, &input),

        Commands::Mapping { source } => cmd_mapping(source),

        Commands::Sources => cmd_sources(),
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn cmd_upload(
    source: SourceKind,
    input: &Path,
    output: Option<&Path>,
    report_path: Option<&Path>,
    audit: Option<PathBuf>,
    max_entries: Option<usize>,
    no_validate: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Uploading {}: {}", source, input.display());

    // Environment first, flags win
    let mut options = UploadOptions::from_env()?;
    if let Some(max) = max_entries {
        if max == 0 {
            return Err("--max-entries must be at least 1".into());
        }
        options.max_sider_entries = max;
    }
    if audit.is_some() {
        options.audit_path = audit;
    }
    if no_validate {
        options.validate = false;
    }

    // Files are replaced only by a complete run
    let report = match output {
        Some(p) => upload_to_file(source, input, p, &options)?,
        None => run_upload(source, input, BufWriter::new(io::stdout().lock()), &options)?,
    };

    eprintln!("   Run: {}", report.run_id);
    eprintln!("   Records: {}", report.input_records);
    eprintln!("   Documents: {}", report.output_documents);

    if options.validate {
        if report.invalid_documents > 0 {
            eprintln!("   ❌ Invalid: {}", report.invalid_documents);
            for (i, errors) in report.validation_errors.iter().take(5) {
                eprintln!("\n   Document {}:", i);
                for err in errors.iter().take(3) {
                    eprintln!("     - {}", err);
                }
            }
        } else {
            eprintln!("   ✅ All {} documents valid!", report.output_documents);
        }
    }

    if !report.truncated.is_empty() {
        eprintln!("   ✂️  Truncated: {} documents", report.truncated.len());
    }
    if let Some(path) = &options.audit_path {
        eprintln!("   💾 Audit saved to: {}", path.display());
    }
    if let Some(path) = output {
        eprintln!("💾 Output written to: {}", path.display());
    }

    if let Some(path) = report_path {
        fs::write(path, serde_json::to_string_pretty(&report)?)?;
        eprintln!("💾 Report written to: {}", path.display());
    }

    eprintln!("\n✨ Done in {} ms", report.duration_ms());
    Ok(())
}

fn cmd_parse(input: &Path, output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Parsing: {}", input.display());

    let bytes = fs::read(input)?;
    let records = parse_records(&bytes)?;
    eprintln!("✅ Parsed {} records", records.len());

    let json = serde_json::to_string_pretty(&records)?;
    write_output(&json, output)?;

    Ok(())
}

fn cmd_validate(source: SourceKind, input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("✔️  Validating {} documents: {}", source, input.display());

    let mut valid = 0;
    let mut invalid = 0;

    for (i, doc) in read_records(input)?.enumerate() {
        let doc: Value = doc?;
        match validate_document(source, &doc) {
            Ok(()) => valid += 1,
            Err(errors) => {
                invalid += 1;
                if invalid <= 5 {
                    eprintln!("\n❌ Document {} invalid:", i);
                    for err in errors.iter().take(3) {
                        eprintln!("   - {}", err);
                    }
                }
            }
        }
    }

    eprintln!("\n📊 Results: {} valid, {} invalid", valid, invalid);

    if invalid > 0 {
        std::process::exit(1);
    }

    Ok(())
}

fn cmd_mapping(source: SourceKind) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(source.mapping())?);
    Ok(())
}

fn cmd_sources() -> Result<(), Box<dyn std::error::Error>> {
    let sources: Vec<Value> = SourceKind::ALL
        .into_iter()
        .map(|kind| json!({ "name": kind.name(), "meta": kind.meta() }))
        .collect();
    println!("{}", serde_json::to_string_pretty(&sources)?);
    Ok(())
}

fn write_output(content: &str, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("💾 Output written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
