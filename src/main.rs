use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;

use telemetry_pipeline::init_tracing;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();

    init_tracing(&args.log_level, args.log_json);

    match args.command {
        cli::Commands::Demo {
            logs,
            spans,
            metrics,
            show_metrics,
        } => {
            let counts = commands::demo::DemoCounts {
                logs,
                spans,
                metrics,
            };
            commands::demo::execute(args.config.as_deref(), counts, show_metrics).await?;
        }
        cli::Commands::Config { action } => match action {
            cli::ConfigCommands::Show => commands::config::show(args.config.as_deref())?,
            cli::ConfigCommands::Validate => commands::config::validate(args.config.as_deref())?,
        },
        cli::Commands::Version => {
            println!("telemetry-pipeline v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
