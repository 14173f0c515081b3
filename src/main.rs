use anyhow::{Context, Result};
use stagewise::cli::commands::{RunCommand, ValidateCommand};
use stagewise::cli::output::*;
use stagewise::cli::{Cli, Command};
use stagewise::core::config::{HandlerRegistry, PipelineConfig};
use stagewise::core::PipelineContext;
use tracing::error;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::from_args();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set logging subscriber")?;

    match &cli.command {
        Command::Validate(cmd) => validate_pipeline(cmd)?,
        Command::Run(cmd) => run_pipeline(cmd).await?,
    }

    Ok(())
}

fn validate_pipeline(cmd: &ValidateCommand) -> Result<()> {
    println!("{} Validating pipeline...", INFO);

    match PipelineConfig::from_file(&cmd.file) {
        Ok(config) => {
            let (stages, groups) = count_elements(&config.stages);
            println!("{} Pipeline definition is valid!", CHECK);
            println!("  Name: {}", style(&config.name).bold());
            if let Some(description) = &config.description {
                println!("  Description: {}", style(description).dim());
            }
            println!("  Stages: {}", style(stages).cyan());
            println!("  Groups: {}", style(groups).cyan());
            println!("{}", format_stage_tree(&config));

            let builtins = HandlerRegistry::with_builtins();
            for (key, name) in config.handler_refs() {
                if !builtins.contains(&key, &name) {
                    println!(
                        "{} {} handler '{}' must be registered by the host application",
                        WARN,
                        key,
                        style(&name).yellow()
                    );
                }
            }

            if cmd.json {
                let json = serde_json::to_string_pretty(&config)?;
                println!("\n{}", json);
            }
            Ok(())
        }
        Err(e) => {
            println!("{} Validation failed:", CROSS);
            println!("  {}", style(e).red());
            std::process::exit(1);
        }
    }
}

async fn run_pipeline(cmd: &RunCommand) -> Result<()> {
    let config = PipelineConfig::from_file(&cmd.file)
        .context("Failed to load pipeline definition")?;
    let pipeline = config
        .to_pipeline(&HandlerRegistry::with_builtins())
        .context("Failed to resolve pipeline handlers")?;

    let ctx = match &cmd.input {
        Some(input) => {
            let value: serde_json::Value =
                serde_json::from_str(input).context("Input is not valid JSON")?;
            PipelineContext::from_value(value)?
        }
        None => PipelineContext::new(),
    };

    match pipeline.execute(ctx).await {
        Ok(data) => {
            let value = serde_json::Value::Object(data);
            let rendered = if cmd.pretty {
                serde_json::to_string_pretty(&value)?
            } else {
                serde_json::to_string(&value)?
            };
            println!("{}", rendered);
            Ok(())
        }
        Err(e) => {
            println!("{} {} {}", CROSS, style(&pipeline.name).bold(), style("failed").red());
            if let Some(validation) = e.as_validation() {
                for (field, reason) in &validation.reasons {
                    println!("  {}: {}", style(field).yellow(), reason);
                }
            }
            error!("{}", e);
            std::process::exit(1);
        }
    }
}
