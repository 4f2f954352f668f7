// src/cli/mod.rs — CLI definition (clap derive)

pub mod progress;
pub mod run;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "factor-optimizer",
    about = "Improve a WorldQuant Brain alpha factor with model suggestions",
    version
)]
pub struct Cli {
    /// Factor expression to optimize (prompted for when omitted)
    #[arg(allow_hyphen_values = true)]
    pub factor: Option<String>,

    /// Credentials file: line 1 `["user", "password"]`, then OPENROUTER_API_KEY=...
    #[arg(long)]
    pub credentials: Option<String>,

    /// Operator signature list used for validation and prompts
    #[arg(long)]
    pub operators: Option<String>,

    /// Directory the JSON report is written to
    #[arg(short, long)]
    pub output_dir: Option<String>,

    /// Config file path
    #[arg(long)]
    pub config: Option<String>,

    /// Primary suggestion model (OpenRouter model id)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Model used with the simplified prompt when the primary returns nothing
    #[arg(long)]
    pub fallback_model: Option<String>,

    /// Suppress progress output (only print the final summary)
    #[arg(short, long)]
    pub quiet: bool,
}
