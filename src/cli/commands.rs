//! CLI command definitions

use clap::Args;

/// Check a pipeline definition
#[derive(Debug, Args, Clone)]
pub struct ValidateCommand {
    /// Path to pipeline YAML file
    #[arg(short, long)]
    pub file: String,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Run a pipeline definition
#[derive(Debug, Args, Clone)]
pub struct RunCommand {
    /// Path to pipeline YAML file
    #[arg(short, long)]
    pub file: String,

    /// Initial context as a JSON object; its `data` key seeds the pipeline data
    #[arg(short, long)]
    pub input: Option<String>,

    /// Pretty-print the final data
    #[arg(long)]
    pub pretty: bool,
}
