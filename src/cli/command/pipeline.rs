//! Runs the four steps back to back, handing each table to the next step.

use anyhow::Result;

use crate::config::PipelineConfig;

use super::{counties, fetch, finalize, transform};

pub async fn pipeline(config: &PipelineConfig) -> Result<String> {
    println!("🌍 EARTHQUAKE DATA PROCESSING PIPELINE STARTED");
    println!("{}", "=".repeat(60));

    let raw = fetch(config).await?;
    let transformed = transform(config, Some(raw))?;
    let with_counties = counties(config, Some(transformed)).await?;
    let final_table = finalize(config, Some(with_counties))?;

    println!("\n{}", "=".repeat(60));
    println!("🎉 PIPELINE COMPLETED SUCCESSFULLY!");
    println!("{}", "=".repeat(60));
    println!("Total earthquakes processed: {}", final_table.len());

    Ok(config.final_file.to_string_lossy().to_string())
}
