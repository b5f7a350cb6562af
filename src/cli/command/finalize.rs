//! Step 4: add regions, normalise offsets and write the final dataset.

use anyhow::{Context, Result};

use crate::{
    cli::print_banner,
    config::PipelineConfig,
    location::{offset_km, region_for, NON_US},
    parquet,
    table::Table,
};

/// Columns every row of the final dataset must have.
const REQUIRED_COLUMNS: [&str; 10] = [
    "time",
    "latitude",
    "longitude",
    "depth",
    "mag",
    "magType",
    "earthquake_id",
    "status",
    "state",
    "county",
];

pub fn finalize(config: &PipelineConfig, input: Option<Table>) -> Result<Table> {
    print_banner("STEP 4: ADDING REGIONS AND FINALIZING");

    let table = match input {
        Some(table) => table,
        None => Table::read_csv(&config.county_file)?,
    };

    let table = finalize_table(table)?;
    table.write_csv(&config.final_file)?;

    println!("\nFinal dataset saved to {}", config.final_file.display());
    println!("Final shape: {:?}", table.shape());
    println!("Columns: {:?}", table.headers);

    if let Some(parquet_file) = &config.parquet_file {
        parquet::save_events(&table, parquet_file)?;
        println!("Parquet copy saved to {}", parquet_file.display());
    }

    print_counts("Region counts:", &table, "region", usize::MAX);
    print_counts("Top 10 states by earthquake count:", &table, "state", 10);
    print_counts("Top 10 counties by earthquake count:", &table, "county", 10);

    Ok(table)
}

pub fn finalize_table(mut table: Table) -> Result<Table> {
    println!("Data Shape Before Dropping: {:?}", table.shape());
    table.drop_incomplete(&REQUIRED_COLUMNS);
    println!("Data Shape After Dropping: {:?}", table.shape());

    let state = table.require_columns(&["state"])?[0];
    let regions: Vec<String> = table
        .rows
        .iter()
        .map(|row| region_for(Some(&row[state])).to_string())
        .collect();
    table.set_column("region", regions)?;

    table.drop_columns(&["continent", "country"]);

    let region = table.require_columns(&["region"])?[0];
    table.retain_rows(|row| row[region] != NON_US);

    normalise_offsets(&mut table)?;

    Ok(table)
}

/// Rewrites `offset_distance` from `"3km"` to `3.0`. Empty values stay empty;
/// anything else that is not a distance fails the run.
fn normalise_offsets(table: &mut Table) -> Result<()> {
    let Some(offset) = table.column_index("offset_distance") else {
        return Ok(());
    };
    let id = table.column_index("earthquake_id");

    for row in table.rows.iter_mut() {
        if row[offset].trim().is_empty() {
            row[offset].clear();
            continue;
        }

        let km = offset_km(&row[offset]).with_context(|| {
            let event = id.map(|i| row[i].as_str()).unwrap_or("?");
            format!("Invalid offset_distance for event {}", event)
        })?;
        row[offset] = format!("{:?}", km);
    }

    Ok(())
}

fn print_counts(title: &str, table: &Table, column: &str, limit: usize) {
    println!("\n{}", title);
    for (value, count) in table.value_counts(column).into_iter().take(limit) {
        println!("  {}: {}", value, count);
    }
}

// -- Tests -------------------------------------------------------------------
