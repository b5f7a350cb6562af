//! HTTP access to the event feed and the county boundary archive.

use std::{
    error::Error as StdError,
    fs::{self, File},
    io::{self, Write},
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Error, Result};
use chrono::{Datelike, NaiveDate};
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Client;
use tracing::warn;
use zip::ZipArchive;

use crate::table::Table;

/// First day of the month and first day of the following month.
pub fn month_bounds(year: i32, month: u32) -> Option<(NaiveDate, NaiveDate)> {
    let start = NaiveDate::from_ymd_opt(year, month, 1)?;
    let end = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };

    Some((start, end))
}

/// Fetches one month of events as CSV.
///
/// A non-success status gives an empty table and a diagnostic; transport
/// errors are retried `attempts` times before giving up.
pub async fn fetch_month(
    client: &Client,
    url: &str,
    start: NaiveDate,
    end: NaiveDate,
    min_magnitude: f64,
    attempts: u32,
    progress_bar: &ProgressBar,
) -> Result<Table> {
    let params = [
        ("format", "csv".to_string()),
        ("starttime", start.format("%Y-%m-%d").to_string()),
        ("endtime", end.format("%Y-%m-%d").to_string()),
        ("minmagnitude", min_magnitude.to_string()),
        ("orderby", "time".to_string()),
    ];

    let mut attempt = 1;
    let response = loop {
        match client.get(url).query(&params).send().await {
            Ok(response) => break response,
            Err(e) if attempt < attempts => {
                warn!(%start, attempt, error = %e, "feed request failed, retrying");
                tokio::time::sleep(Duration::from_secs(2 * attempt as u64)).await;
                attempt += 1;
            }
            Err(e) => {
                return Err(Error::msg(format!(
                    "Failed to fetch {} after {} attempts: {}",
                    start.format("%Y-%m"),
                    attempts,
                    e
                )))
            }
        }
    };

    if !response.status().is_success() {
        progress_bar.println(format!(
            "❌ Failed to fetch data for {}-{:02}. Status code: {}",
            start.year(),
            start.month(),
            response.status().as_u16()
        ));
        return Ok(Table::default());
    }

    let body = response.bytes().await?;
    let table = Table::from_reader(body.as_ref())?;
    progress_bar.println(format!("✅ Retrieved {} records.", table.len()));

    Ok(table)
}

/// Downloads the archive at `url`. A TLS certificate failure is retried once
/// with certificate validation disabled.
pub async fn download_archive(
    url: &str,
    file_path: &Path,
    timeout: Duration,
    progress_bar: ProgressBar,
) -> Result<(), Error> {
    let client = Client::builder().timeout(timeout).build()?;

    let response = match client.get(url).send().await {
        Ok(response) => response,
        Err(e) if is_certificate_error(&e) => {
            warn!(error = %e, "certificate verification failed");
            progress_bar.println("SSL verification failed. Retrying without certificate validation…");
            let insecure = Client::builder()
                .timeout(timeout)
                .danger_accept_invalid_certs(true)
                .build()?;
            insecure
                .get(url)
                .send()
                .await
                .map_err(|e| Error::msg(format!("Failed to download file: {}", e)))?
        }
        Err(e) => return Err(Error::msg(format!("Failed to download file: {}", e))),
    };

    if !response.status().is_success() {
        return Err(Error::msg(format!("Failed to download file: {}", response.status())));
    }

    let total_size = response.content_length().unwrap_or(0);
    if total_size > 0 {
        progress_bar.set_length(total_size);
        progress_bar.set_style(
            ProgressStyle::with_template("{msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({percent}%) {eta}")
                .unwrap()
                .progress_chars("=> "),
        );
    }

    if let Some(parent) = file_path.parent() {
        fs::create_dir_all(parent)?;
    }

    // the archive only appears at `file_path` once it is complete
    let part_path = partial_path(file_path);
    if let Err(e) = stream_to_file(response, &part_path, &progress_bar).await {
        let _ = fs::remove_file(&part_path);
        return Err(e);
    }
    fs::rename(&part_path, file_path)
        .with_context(|| format!("Failed to move download to '{}'", file_path.display()))?;

    Ok(())
}

async fn stream_to_file(
    response: reqwest::Response,
    file_path: &Path,
    progress_bar: &ProgressBar,
) -> Result<()> {
    let mut file = File::create(file_path)
        .with_context(|| format!("Failed to create '{}'", file_path.display()))?;
    let mut downloaded = 0u64;
    let mut stream = response.bytes_stream();

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| Error::msg(format!("Error reading chunk: {}", e)))?;
        file.write_all(&chunk)?;
        downloaded += chunk.len() as u64;
        progress_bar.set_position(downloaded);
    }
    file.flush()?;

    Ok(())
}

/// `counties.zip` downloads into `counties.zip.part`.
fn partial_path(file_path: &Path) -> PathBuf {
    let mut name = file_path.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    file_path.with_file_name(name)
}

fn is_certificate_error(error: &reqwest::Error) -> bool {
    let mut source: Option<&dyn StdError> = Some(error);
    while let Some(e) = source {
        let message = e.to_string().to_ascii_lowercase();
        if message.contains("certificate") || message.contains("cert verify") {
            return true;
        }
        source = e.source();
    }

    false
}

/// Extracts a zip archive into `working_dir`, returning the number of files
/// written. Entries whose paths would escape `working_dir` are skipped.
pub fn extract_zip(zip_path: &Path, working_dir: &Path, progress_bar: &ProgressBar) -> Result<u64> {
    let file = File::open(zip_path)
        .with_context(|| format!("Failed to open archive '{}'", zip_path.display()))?;
    let mut archive = ZipArchive::new(file)?;

    progress_bar.set_length(archive.len() as u64);
    fs::create_dir_all(working_dir)?;

    let mut count = 0u64;
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let Some(relative) = entry.enclosed_name() else {
            warn!(name = entry.name(), "skipping archive entry with unsafe path");
            continue;
        };
        let target = working_dir.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut out = File::create(&target)?;
            io::copy(&mut entry, &mut out)?;
            count += 1;
        }
        progress_bar.inc(1);
    }

    Ok(count)
}

// -- Tests -------------------------------------------------------------------
