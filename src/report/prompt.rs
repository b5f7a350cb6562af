//! Prompt text sent to the language model.

use anyhow::Result;
use serde_json::{Map, Number, Value};

use crate::table::Table;

use super::stats::KeyStats;

/// Records shown verbatim in the analysis prompt.
const PROMPT_RECORDS: usize = 6;

pub const WAREHOUSING_PROMPT: &str = "How can LLMs be used for Data Warehousing? Provide specific examples and benefits, \
especially in the context of large-scale earthquake monitoring and seismic data analysis.";

/// Rows as JSON objects keyed by header. Numeric text becomes a number and
/// empty fields become null.
pub fn records_as_json(table: &Table, limit: usize) -> Vec<Value> {
    table
        .rows
        .iter()
        .take(limit)
        .map(|row| {
            let record: Map<String, Value> = table
                .headers
                .iter()
                .zip(row)
                .map(|(header, value)| (header.clone(), json_value(value)))
                .collect();
            Value::Object(record)
        })
        .collect()
}

fn json_value(text: &str) -> Value {
    if text.is_empty() {
        return Value::Null;
    }
    text.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(text.to_string()))
}

pub fn analysis_prompt(table: &Table, sample: &Table, stats: &KeyStats) -> Result<String> {
    let total = table.len();
    let columns: Vec<&str> = table.headers.iter().take(10).map(String::as_str).collect();
    let sample_json = serde_json::to_string_pretty(&records_as_json(sample, PROMPT_RECORDS))?;
    let stats_json = serde_json::to_string_pretty(stats)?;
    let memory = table.approximate_size() as f64 / (1024.0 * 1024.0);

    Ok(format!(
        r#"
You are a senior data analyst creating a comprehensive Tableau dashboard for earthquake analysis.

DATASET OVERVIEW:
- Total records: {total} earthquakes (USA)
- Columns: {column_count} including: {columns}...
- Memory usage: {memory:.2} MB
- Sample size for analysis: {sample_size} records

SAMPLE DATA (first {shown} records):
{sample_json}

DATASET STATISTICS:
{stats_json}

PHASE 3: DATA VISUALIZATION
1. Determine the main story or insight from the dataset
2. Suggest visualizations (sheets/dashboards) using Tableau
3. Enable OLAP-style dynamic interaction: roll-up, drill-down, slice-and-dice
4. Structure recommendations for project presentation

ANALYSIS REQUIREMENTS:
Based on this earthquake dataset ({total} records), provide detailed recommendations for:

1. **PRIMARY INSIGHTS & STORIES**:
   - What are the key seismic patterns in the USA?
   - Geographic hotspots and their characteristics
   - Temporal trends and seasonal variations
   - Magnitude-depth relationships and implications

2. **TABLEAU DASHBOARD ARCHITECTURE**:
   - Main dashboard layout with 6-8 key visualizations
   - Interactive map with drill-down capabilities
   - Time series analysis with multiple granularities
   - Statistical distribution charts
   - Correlation analysis visualizations

3. **OLAP FUNCTIONALITY**:
   - Roll-up: County → State → Region → National level analysis
   - Drill-down: Year → Month → Day → Hour granularity
   - Slice-and-dice: Filter by magnitude ranges, depth levels, geographic regions
   - Pivot capabilities for multi-dimensional analysis

4. **SPECIFIC CHART RECOMMENDATIONS**:
   - Geographic: Heat maps, symbol maps, filled maps
   - Temporal: Time series, calendar heatmaps, trend analysis
   - Statistical: Histograms, box plots, scatter plots
   - Comparative: Small multiples, dashboard filters

5. **DYNAMIC INTERACTIVITY**:
   - Parameter controls for magnitude thresholds
   - Date range selectors
   - Geographic filters (state, county, region)
   - Linked dashboards for seamless exploration

6. **KEY PERFORMANCE INDICATORS (KPIs)**:
   - Seismic activity metrics
   - Risk assessment indicators
   - Trend analysis summary statistics

7. **PROJECT ESSAY STRUCTURE**:
   - Introduction to seismic monitoring importance
   - Methodology and data processing approach
   - Key findings and visualizations
   - Implications for earthquake preparedness
   - Technical implementation details
   - Conclusions and recommendations

Please provide specific, actionable recommendations that leverage the full scale of this {total}-record dataset for comprehensive earthquake analysis and monitoring.
"#,
        column_count = table.headers.len(),
        columns = columns.join(", "),
        sample_size = sample.len(),
        shown = PROMPT_RECORDS.min(sample.len()),
    ))
}

/// Cuts `prompt` to at most `max_chars` characters.
pub fn bound(prompt: &str, max_chars: usize) -> String {
    match prompt.char_indices().nth(max_chars) {
        Some((end, _)) => prompt[..end].to_string(),
        None => prompt.to_string(),
    }
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::report::stats::analyze;
    use serde_json::json;

    fn table() -> Table {
        Table::from_reader(
            "earthquake_id,mag,magType,offset_distance,state\nus1,2.5,md,3.0,Illinois\nak2,4.1,ml,,Alaska\n"
                .as_bytes(),
        )
        .unwrap()
    }

    #[test]
    fn should_type_json_values() {
        let records = records_as_json(&table(), 6);

        assert_eq!(records.len(), 2);
        assert_eq!(
            records[1],
            json!({
                "earthquake_id": "ak2",
                "mag": 4.1,
                "magType": "ml",
                "offset_distance": null,
                "state": "Alaska"
            })
        );
    }

    #[test]
    fn should_embed_sample_and_stats() {
        let t = table();
        let stats = analyze(&t);
        let prompt = analysis_prompt(&t, &t, &stats).unwrap();

        assert!(prompt.contains("Total records: 2 earthquakes"));
        assert!(prompt.contains("\"earthquake_id\": \"us1\""));
        assert!(prompt.contains("\"total_records\": 2"));
        assert!(prompt.contains("SAMPLE DATA (first 2 records)"));
    }

    #[test]
    fn should_bound_on_char_boundary() {
        assert_eq!(bound("County → State", 8), "County →");
        assert_eq!(bound("short", 100), "short");
        assert_eq!(bound("", 0), "");
    }
}
