//! Terse Schema Validator CLI
//!
//! Validates JSON documents against terse schemas, decodes notation strings
//! and exports JSON Schema.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use terse_schema::{decode, read_document, Validator, ValidatorConfig};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "terse-validate")]
#[command(about = "Validate JSON documents against terse schemas")]
struct Cli {
    /// Config file (defaults to terse-schema.toml lookup)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a document against a schema
    Check {
        /// Schema file (JSON)
        #[arg(short, long)]
        schema: PathBuf,
        /// Document file (JSON)
        #[arg(short, long)]
        data: PathBuf,
        /// Definitions table for references (JSON)
        #[arg(long)]
        defs: Option<PathBuf>,
        /// Check the schema against the meta-schema first
        #[arg(long)]
        validate_model: bool,
        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Decode a notation string and print the descriptor
    Decode {
        notation: String,
    },

    /// Export a schema as JSON Schema
    JsonSchema {
        /// Schema file (JSON)
        #[arg(short, long)]
        schema: PathBuf,
        /// Definitions table to embed for references (JSON)
        #[arg(long)]
        defs: Option<PathBuf>,
        /// Output file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the effective configuration
    Config,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

fn read_json(path: &Path) -> anyhow::Result<serde_json::Value> {
    read_document(path).with_context(|| format!("failed to load {}", path.display()))
}

fn run(cli: Cli) -> anyhow::Result<bool> {
    let config = ValidatorConfig::load_from(cli.config.as_deref())?;

    match cli.command {
        Commands::Check {
            schema,
            data,
            defs,
            validate_model,
            json,
        } => {
            let validator = Validator::from_config(&config);
            let mut options = *validator.options();
            options.validate_model |= validate_model;

            let schema_value = read_json(&schema)?;
            let data_value = read_json(&data)?;
            let defs_value = defs.as_deref().map(read_json).transpose()?;

            let result =
                validator.validate_with(&data_value, &schema_value, defs_value.as_ref(), &options)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else if result.ok {
                println!("✅ {} matches {}", data.display(), schema.display());
            } else {
                println!("❌ {} does not match {}", data.display(), schema.display());
                println!("   └─ {} (at `{}`, {:?} step)", result.message, result.path, result.step);
            }
            Ok(result.ok)
        }

        Commands::Decode { notation } => {
            let descriptor = decode(&notation, "")?;
            println!("{}", serde_json::to_string_pretty(&descriptor)?);
            Ok(true)
        }

        Commands::JsonSchema {
            schema,
            defs,
            output,
        } => {
            let validator = Validator::from_config(&config);
            let defs_value = defs.as_deref().map(read_json).transpose()?;
            let emitted = validator.json_schema(&read_json(&schema)?, defs_value.as_ref())?;
            let rendered = serde_json::to_string_pretty(&emitted)?;

            if let Some(path) = output {
                std::fs::write(&path, &rendered)?;
                println!("✅ JSON Schema written to {:?}", path);
            } else {
                println!("{}", rendered);
            }
            Ok(true)
        }

        Commands::Config => {
            println!("{}", toml::to_string_pretty(&config)?);
            Ok(true)
        }
    }
}
