//! The `oats` binary.

fn main() {
    oats_cli::init_tracing();
    std::process::exit(oats_cli::run_cli(std::env::args().collect()));
}
