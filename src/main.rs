// src/main.rs — factor-optimizer entry point

use clap::Parser;

use factor_optimizer::cli::run::{describe_error, run};
use factor_optimizer::cli::Cli;
use factor_optimizer::infra::logger;

#[tokio::main]
async fn main() {
    // Initialize logging (respects RUST_LOG)
    logger::init_logging(logger::DEFAULT_LEVEL);

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("{}", describe_error(&e));
        std::process::exit(1);
    }
}
