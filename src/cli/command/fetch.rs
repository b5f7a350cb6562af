//! Step 1: download monthly event batches and combine them.

use anyhow::{bail, Result};
use chrono::NaiveDate;
use reqwest::Client;
use tracing::info;

use crate::{
    cli::{create_progress_bar, print_banner},
    config::PipelineConfig,
    download::{fetch_month, month_bounds},
    table::Table,
};

pub async fn fetch(config: &PipelineConfig) -> Result<Table> {
    print_banner("STEP 1: LOADING EARTHQUAKE DATA FROM USGS");

    let client = Client::builder().timeout(config.feed_timeout).build()?;
    let months = calendar_months(&config.years);

    let pb = create_progress_bar(months.len() as u64, "Downloading months...".to_string());
    let mut combined = Table::default();

    for (start, end) in months {
        pb.println(format!("Fetching data for {} to {}...", start, end));
        let month = fetch_month(
            &client,
            &config.feed_url,
            start,
            end,
            config.min_magnitude,
            config.feed_attempts,
            &pb,
        )
        .await?;

        if !month.is_empty() {
            combined.append(month);
        }
        pb.inc(1);
    }

    pb.finish_with_message("Months downloaded");

    let repeated = combined.dedup_by("id");
    if repeated > 0 {
        info!(repeated, "dropped events returned for two adjacent months");
    }

    if combined.is_empty() {
        bail!("No earthquake records were retrieved from {}", config.feed_url);
    }

    combined.write_csv(&config.raw_file)?;
    println!(
        "\n🎉 All data saved to '{}'. Total records: {}",
        config.raw_file.display(),
        combined.len()
    );

    Ok(combined)
}

fn calendar_months(years: &[i32]) -> Vec<(NaiveDate, NaiveDate)> {
    years
        .iter()
        .flat_map(|&year| (1..=12).filter_map(move |month| month_bounds(year, month)))
        .collect()
}

// -- Tests -------------------------------------------------------------------
