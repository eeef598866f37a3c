//! The compile command: load, compile, format and write.

use clap::Args;
use console::style;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

use oats_core::{CompileOptions, Formatter, Unformatted, Warning, compile_with};

use crate::common::{ensure_dir, format_elapsed_ms, run_command};
use crate::loader::{STDIN, load_document};
use crate::prettier::Prettier;

/// Arguments of the `oats` command.
#[derive(Args, Debug, Clone)]
pub struct GenerateArgs {
    #[arg(
        value_name = "INPUT",
        default_value = STDIN,
        help = "Path to an OpenAPI/Swagger document or raw schema (JSON or YAML); `-` reads stdin"
    )]
    /// Input path or `-`.
    pub input: String,
    #[arg(
        short = 'o',
        long = "output",
        value_name = "FILE",
        help = "Write the generated types to FILE instead of stdout"
    )]
    /// Output file; stdout when absent.
    pub output: Option<PathBuf>,
    #[arg(
        long = "prettier-config",
        value_name = "FILE",
        help = "Prettier configuration to format with; defaults to the nearest .prettierrc"
    )]
    /// Explicit Prettier configuration.
    pub prettier_config: Option<PathBuf>,
    #[arg(long = "raw-schema", help = "Treat the input as a bare map of named schemas")]
    /// Compile the input as a map of named schemas.
    pub raw_schema: bool,
    #[arg(
        long = "version",
        value_name = "N",
        value_parser = parse_version,
        help = "Schema dialect for --raw-schema (2 or 3)"
    )]
    /// Raw schema dialect.
    pub version: Option<u8>,
}

/// Accept any spelling of the number 2 or 3 (`2`, `2.0`, `3.0`).
fn parse_version(value: &str) -> Result<u8, String> {
    let number: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!("`{value}` is not a number"))?;
    let is = |target: f64| (number - target).abs() < f64::EPSILON;
    if is(2.0) {
        Ok(2)
    } else if is(3.0) {
        Ok(3)
    } else {
        Err(format!("unsupported version {value}, expected 2 or 3"))
    }
}

/// Compile and write the output, returning the process exit code.
pub fn run(args: GenerateArgs) -> i32 {
    run_command(|| run_inner(&args))
}

fn run_inner(args: &GenerateArgs) -> Result<(), String> {
    let start = Instant::now();
    if args.output.is_some() {
        println!(
            "✨ {} {}",
            style("oats").bold().magenta(),
            env!("CARGO_PKG_VERSION")
        );
    }

    if let Some(config) = &args.prettier_config
        && !config.is_file()
    {
        return Err(format!("Prettier config not found: {}", config.display()));
    }

    let document = load_document(&args.input)?;
    let options = CompileOptions {
        raw_schema: args.raw_schema,
        version: args.version,
        style_config: args.prettier_config.clone(),
    };

    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let prettier = Prettier::locate(&cwd);
    let formatter: &dyn Formatter = match &prettier {
        Some(prettier) => prettier,
        None => {
            info!("prettier not found on PATH, writing unformatted output");
            &Unformatted
        }
    };

    let compiled = compile_with(&document, &options, formatter)
        .map_err(|err| format!("Failed to compile {}: {err}", display_input(&args.input)))?;
    report_warnings(&compiled.warnings);

    match &args.output {
        Some(output) => {
            write_output(output, &compiled.text)?;
            println!(
                "🚀 {} -> {} [{}]",
                display_input(&args.input),
                style(output.display()).green(),
                format_elapsed_ms(start)
            );
        }
        None => {
            io::stdout()
                .write_all(compiled.text.as_bytes())
                .map_err(|err| format!("Failed to write to stdout: {err}"))?;
        }
    }
    Ok(())
}

fn write_output(output: &Path, text: &str) -> Result<(), String> {
    if let Some(parent) = output.parent()
        && !parent.as_os_str().is_empty()
    {
        ensure_dir(parent)?;
    }
    fs::write(output, text).map_err(|err| format!("Failed to write {}: {err}", output.display()))?;
    debug!(path = %output.display(), bytes = text.len(), "Wrote output.");
    Ok(())
}

fn report_warnings(warnings: &[Warning]) {
    for warning in warnings {
        eprintln!("{} {warning}", style("⚠").yellow());
    }
}

fn display_input(input: &str) -> &str {
    if input == STDIN { "stdin" } else { input }
}
