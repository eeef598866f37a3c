//! Command line front end for `oats-core`: loads a document, compiles it and writes the
//! TypeScript output, formatted with Prettier when it is installed.

use clap::Parser;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

pub mod common;
pub mod generate;
pub mod loader;
pub mod prettier;

/// Crates whose events a plain `OATS_LOG` level applies to.
const LOG_TARGETS: [&str; 2] = ["oats_core", "oats_cli"];

#[derive(Parser, Debug)]
#[command(
    name = "oats",
    about = "\x1b[33moats\x1b[0m turns OpenAPI and JSON Schema documents into TypeScript types ✨"
)]
struct Cli {
    #[command(flatten)]
    generate: generate::GenerateArgs,
}

/// Parse `args` (including the program name) and run the command, returning the exit code.
pub fn run_cli(args: Vec<String>) -> i32 {
    match Cli::try_parse_from(args) {
        Ok(cli) => generate::run(cli.generate),
        Err(e) => {
            let code = e.exit_code();
            let _ = e.print();
            code
        }
    }
}

/// Install the stderr log subscriber configured by `OATS_LOG`.
pub fn init_tracing() {
    // OATS_LOG controls log level: "trace", "debug", "info", "warn", "error"
    // or a full tracing filter spec like "oats_core=trace,oats_cli=info"
    let filter = match std::env::var("OATS_LOG") {
        Ok(level) if is_plain_level(&level) => log_filter(&level),
        Ok(spec) => spec,
        Err(_) => "oats_cli=info".to_string(),
    };

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_line_number(true)
        .with_file(true)
        .with_filter(EnvFilter::new(filter));

    if tracing_subscriber::registry()
        .with(fmt_layer)
        .try_init()
        .is_err()
    {
        eprintln!("Warning: tracing subscriber already initialized");
    }
}

fn log_filter(level: &str) -> String {
    LOG_TARGETS
        .iter()
        .map(|target| format!("{target}={level}"))
        .collect::<Vec<_>>()
        .join(",")
}

fn is_plain_level(s: &str) -> bool {
    matches!(
        s.to_ascii_lowercase().as_str(),
        "trace" | "debug" | "info" | "warn" | "error"
    )
}
