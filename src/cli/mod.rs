//! Command line interface.

pub mod command;

use std::time::Duration;

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use crate::config::{PipelineArgs, ReportArgs};

#[derive(Parser)]
#[command(version, about, long_about = None)]
/// Contains the commands
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run every step: fetch, transform, counties, finalize
    Pipeline(PipelineArgs),
    /// Step 1: download monthly events from the USGS feed
    Fetch(PipelineArgs),
    /// Step 2: parse places and keep United States events
    Transform(PipelineArgs),
    /// Step 3: assign each event to a county
    Counties(PipelineArgs),
    /// Step 4: add regions and write the final dataset
    Finalize(PipelineArgs),
    /// Summarise the final dataset and ask a language model for a report
    Report(ReportArgs),
}

impl Commands {
    /// Name used when reporting that the command failed.
    pub fn label(&self) -> &'static str {
        match self {
            Commands::Pipeline(_) => "Pipeline",
            Commands::Fetch(_) => "Fetch",
            Commands::Transform(_) => "Transform",
            Commands::Counties(_) => "County assignment",
            Commands::Finalize(_) => "Finalize",
            Commands::Report(_) => "Report",
        }
    }
}

/// Creates a spinner.
pub fn create_spinner(message: String) -> ProgressBar {
    let bar = ProgressBar::new_spinner().with_message(message);
    bar.enable_steady_tick(Duration::from_millis(100));

    bar
}

/// Creates a progress bar.
pub fn create_progress_bar(size: u64, message: String) -> ProgressBar {
    ProgressBar::new(size).with_message(message).with_style(
        ProgressStyle::with_template("[{eta_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("##-"),
    )
}

/// Prints a step banner.
pub fn print_banner(title: &str) {
    println!("{}", "=".repeat(60));
    println!("{}", title);
    println!("{}", "=".repeat(60));
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn should_label_failures_by_command() {
        let report = Cli::parse_from(["usquake", "report"]);
        assert_eq!(report.command.label(), "Report");

        let pipeline = Cli::parse_from(["usquake", "pipeline", "--start-year", "2024"]);
        assert_eq!(pipeline.command.label(), "Pipeline");

        let counties = Cli::parse_from(["usquake", "counties"]);
        assert_eq!(counties.command.label(), "County assignment");
    }
}
