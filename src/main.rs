//! Configen CLI
//!
//! Entry point for the `configen` command-line tool.

use clap::{Parser, Subcommand, ValueEnum};
use configen::config::{fold_layers, parse_file, parse_overrides, Layer};
use configen::{ConfigLoader, ConfigOrigin, Value};
use std::path::PathBuf;
use std::process;
use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "configen")]
#[command(about = "Layered configuration merging and resolution", version)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge configuration files in order, later files winning
    Merge {
        /// Files to merge (.yaml, .yml, .toml or .json)
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Override applied after all files (key.path=value)
        #[arg(long = "set", value_name = "KEY=VALUE")]
        overrides: Vec<String>,

        /// Output format
        #[arg(long, value_enum, default_value = "json")]
        format: Format,
    },

    /// Load, merge and resolve a layered configuration
    Resolve {
        /// Default configuration file
        #[arg(long)]
        defaults: PathBuf,

        /// Extension file (overridden by path_extend_conf=<file>)
        #[arg(long)]
        extend: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value = "json")]
        format: Format,

        /// Print the effective config with sources and warnings
        #[arg(long)]
        provenance: bool,

        /// Do not fail when mandatory values remain unset
        #[arg(long)]
        allow_missing: bool,

        /// Overrides (key.path=value)
        overrides: Vec<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Json,
    Yaml,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Merge {
            files,
            overrides,
            format,
        } => run_merge(&files, &overrides, format),
        Commands::Resolve {
            defaults,
            extend,
            format,
            provenance,
            allow_missing,
            overrides,
        } => run_resolve(defaults, extend, format, provenance, allow_missing, &overrides),
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive(level.into()))
        .try_init();
}

fn run_merge(files: &[PathBuf], overrides: &[String], format: Format) {
    let mut layers = Vec::with_capacity(files.len() + 1);
    for (i, path) in files.iter().enumerate() {
        let origin = if i == 0 { ConfigOrigin::Default } else { ConfigOrigin::Extension };
        match parse_file(path, origin) {
            Ok(layer) => layers.push(layer),
            Err(e) => fail("Error loading config", e),
        }
    }

    match parse_overrides(overrides) {
        Ok(cli) => layers.push(Layer::inline(ConfigOrigin::Cli, cli)),
        Err(e) => fail("Error parsing overrides", e),
    }

    match fold_layers(&layers) {
        Ok(folded) => print_value(&folded.value, format),
        Err(e) => fail("Error merging config", e),
    }
}

fn run_resolve(
    defaults: PathBuf,
    extend: Option<PathBuf>,
    format: Format,
    provenance: bool,
    allow_missing: bool,
    overrides: &[String],
) {
    let mut loader = ConfigLoader::from_default_file(defaults);
    if let Some(path) = extend {
        loader = loader.with_extension_file(path);
    }

    let effective = match loader.load(overrides) {
        Ok(effective) => effective,
        Err(e) => fail("Error resolving config", e),
    };

    let missing = effective.missing_paths();
    if !missing.is_empty() && !allow_missing {
        let paths: Vec<String> = missing.iter().map(ToString::to_string).collect();
        eprintln!("Mandatory values are not set: {}", paths.join(", "));
        process::exit(1);
    }

    if !provenance {
        print_value(&effective.config, format);
        return;
    }

    let rendered = match format {
        Format::Json => effective.to_json().map_err(|e| e.to_string()),
        Format::Yaml => serde_yaml::to_string(&effective).map_err(|e| e.to_string()),
    };
    match rendered {
        Ok(text) => println!("{}", text.trim_end()),
        Err(e) => fail("Error serializing output", e),
    }
}

fn print_value(value: &Value, format: Format) {
    let rendered = match format {
        Format::Json => serde_json::to_string_pretty(value).map_err(|e| e.to_string()),
        Format::Yaml => serde_yaml::to_string(value).map_err(|e| e.to_string()),
    };
    match rendered {
        Ok(text) => println!("{}", text.trim_end()),
        Err(e) => fail("Error serializing output", e),
    }
}

fn fail(context: &str, error: impl std::fmt::Display) -> ! {
    eprintln!("{}: {}", context, error);
    process::exit(1);
}
