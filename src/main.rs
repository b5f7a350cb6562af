mod cli;
mod config;
mod county;
mod download;
mod location;
mod parquet;
mod report;
mod table;

use std::process::ExitCode;

use clap::Parser;
use cli::{command, Cli, Commands};
use config::PipelineConfig;
use tracing::error;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("usquake=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match &cli.command {
        Commands::Pipeline(args) => command::pipeline(&PipelineConfig::from_args(args)).await,
        Commands::Fetch(args) => {
            let config = PipelineConfig::from_args(args);
            command::fetch(&config)
                .await
                .map(|_| config.raw_file.to_string_lossy().to_string())
        }
        Commands::Transform(args) => {
            let config = PipelineConfig::from_args(args);
            command::transform(&config, None)
                .map(|_| config.transformed_file.to_string_lossy().to_string())
        }
        Commands::Counties(args) => {
            let config = PipelineConfig::from_args(args);
            command::counties(&config, None)
                .await
                .map(|_| config.county_file.to_string_lossy().to_string())
        }
        Commands::Finalize(args) => {
            let config = PipelineConfig::from_args(args);
            command::finalize(&config, None)
                .map(|_| config.final_file.to_string_lossy().to_string())
        }
        Commands::Report(args) => command::report(args).await,
    };

    match result {
        Ok(filename) => {
            println!("File saved to `{}`", filename);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("\n❌ {} failed with error: {:#}", cli.command.label(), e);
            error!(command = cli.command.label(), error = %e, "run aborted");
            ExitCode::FAILURE
        }
    }
}
