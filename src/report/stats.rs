//! Descriptive statistics over the final dataset.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, NaiveDate};
use rand::{rngs::StdRng, seq::index, SeedableRng};
use serde::Serialize;

use crate::table::Table;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    /// sample standard deviation; absent for fewer than two values
    pub std: Option<f64>,
}

impl Summary {
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }

        let count = values.len();
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mean = values.iter().sum::<f64>() / count as f64;
        let std = (count > 1).then(|| {
            let squares: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
            (squares / (count - 1) as f64).sqrt()
        });

        Some(Summary {
            count,
            min,
            max,
            mean,
            std,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeRange {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Geography {
    pub lat_range: (f64, f64),
    pub lon_range: (f64, f64),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryCount {
    pub value: String,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct KeyStats {
    pub total_records: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub magnitude: Option<Summary>,
    pub magnitude_above_5: usize,
    pub magnitude_above_6: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depth: Option<Summary>,
    pub shallow_events: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_range: Option<TimeRange>,
    pub yearly_counts: BTreeMap<i32, usize>,
    /// `time` values that are not RFC 3339 timestamps
    #[serde(skip)]
    pub unparsed_times: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geography: Option<Geography>,
    pub top_states: Vec<CategoryCount>,
    pub top_counties: Vec<CategoryCount>,
    pub magnitude_types: Vec<CategoryCount>,
    pub statuses: Vec<CategoryCount>,
}

pub fn analyze(table: &Table) -> KeyStats {
    let mut stats = KeyStats {
        total_records: table.len(),
        ..KeyStats::default()
    };

    if let Some(mags) = table.numeric_column("mag") {
        stats.magnitude_above_5 = mags.iter().filter(|&&m| m > 5.0).count();
        stats.magnitude_above_6 = mags.iter().filter(|&&m| m > 6.0).count();
        stats.magnitude = Summary::from_values(&mags);
    }

    if let Some(depths) = table.numeric_column("depth") {
        stats.shallow_events = depths.iter().filter(|&&d| d < 10.0).count();
        stats.depth = Summary::from_values(&depths);
    }

    if let Some(times) = table.column("time") {
        let dates: Vec<NaiveDate> = times
            .iter()
            .filter_map(|t| DateTime::parse_from_rfc3339(t.trim()).ok())
            .map(|t| t.date_naive())
            .collect();
        stats.unparsed_times = times.len() - dates.len();

        for date in &dates {
            *stats.yearly_counts.entry(date.year()).or_insert(0) += 1;
        }
        if let (Some(start), Some(end)) = (dates.iter().min(), dates.iter().max()) {
            stats.time_range = Some(TimeRange {
                start: start.format("%Y-%m-%d").to_string(),
                end: end.format("%Y-%m-%d").to_string(),
            });
        }
    }

    if let (Some(lats), Some(lons)) = (table.numeric_column("latitude"), table.numeric_column("longitude")) {
        if let (Some(lat), Some(lon)) = (Summary::from_values(&lats), Summary::from_values(&lons)) {
            stats.geography = Some(Geography {
                lat_range: (lat.min, lat.max),
                lon_range: (lon.min, lon.max),
            });
        }
    }

    stats.top_states = top_counts(table, "state", 10);
    stats.top_counties = top_counts(table, "county", 5);
    stats.magnitude_types = top_counts(table, "magType", usize::MAX);
    stats.statuses = top_counts(table, "status", usize::MAX);

    stats
}

fn top_counts(table: &Table, column: &str, limit: usize) -> Vec<CategoryCount> {
    table
        .value_counts(column)
        .into_iter()
        .take(limit)
        .map(|(value, count)| CategoryCount { value, count })
        .collect()
}

pub fn print_stats(stats: &KeyStats) {
    println!("\n=== DATASET ANALYSIS ===");
    println!("Total earthquakes: {}", stats.total_records);

    if let Some(mag) = &stats.magnitude {
        println!("\nMagnitude range: {:.2} to {:.2}", mag.min, mag.max);
        println!("Average magnitude: {:.2}", mag.mean);
        println!("Magnitude > 5.0: {} earthquakes", stats.magnitude_above_5);
        println!("Magnitude > 6.0: {} earthquakes", stats.magnitude_above_6);
    }

    if let Some(depth) = &stats.depth {
        println!("\nDepth range: {:.2} to {:.2} km", depth.min, depth.max);
        println!("Average depth: {:.2} km", depth.mean);
        println!("Shallow earthquakes (<10km): {}", stats.shallow_events);
    }

    match &stats.time_range {
        Some(range) => {
            println!("\nTime range: {} to {}", range.start, range.end);
            println!("Yearly earthquake counts:");
            for (year, count) in &stats.yearly_counts {
                println!("  {}: {}", year, count);
            }
        }
        None if stats.unparsed_times > 0 => {
            println!("\nTime column found but couldn't parse dates");
        }
        None => {}
    }

    if let Some(geo) = &stats.geography {
        println!("\nGeographic coverage:");
        println!("  Latitude: {:.2} to {:.2}", geo.lat_range.0, geo.lat_range.1);
        println!("  Longitude: {:.2} to {:.2}", geo.lon_range.0, geo.lon_range.1);
    }

    print_category("Top 10 states by earthquake count:", &stats.top_states);
    print_category("Top 5 counties by earthquake count:", &stats.top_counties);
    print_category("Magnitude types:", &stats.magnitude_types);
    print_category("Status distribution:", &stats.statuses);
}

fn print_category(title: &str, counts: &[CategoryCount]) {
    if counts.is_empty() {
        return;
    }
    println!("\n{}", title);
    for c in counts {
        println!("  {}: {}", c.value, c.count);
    }
}

/// Uniform sample of `size` rows without replacement, reproducible for a
/// given seed. Returns every row, in sampled order, when the table is smaller.
pub fn sample_rows(table: &Table, size: usize, seed: u64) -> Table {
    let mut rng = StdRng::seed_from_u64(seed);
    let amount = size.min(table.len());

    let mut sample = Table::new(table.headers.clone());
    sample.rows = index::sample(&mut rng, table.len(), amount)
        .into_iter()
        .map(|i| table.rows[i].clone())
        .collect();

    sample
}

// -- Tests -------------------------------------------------------------------
