//! Step 2: parse place strings and keep United States events.

use anyhow::Result;

use crate::{
    cli::print_banner,
    config::PipelineConfig,
    location::ResolvedLocation,
    table::Table,
};

/// Feed columns an event needs before it is worth locating.
pub const CORE_COLUMNS: [&str; 9] = [
    "time",
    "latitude",
    "longitude",
    "depth",
    "mag",
    "magType",
    "id",
    "status",
    "place",
];

const LOCATION_COLUMNS: [&str; 6] = [
    "offset_distance",
    "offset_direction",
    "nearest_locality",
    "state",
    "country",
    "continent",
];

pub fn transform(config: &PipelineConfig, input: Option<Table>) -> Result<Table> {
    print_banner("STEP 2: CLEANING AND TRANSFORMING DATA");

    let table = match input {
        Some(table) => table,
        None => Table::read_csv(&config.raw_file)?,
    };

    let table = transform_table(table)?;
    table.write_csv(&config.transformed_file)?;

    println!("\nFinal shape after US filtering: {:?}", table.shape());
    println!("Data saved to {}", config.transformed_file.display());

    Ok(table)
}

pub fn transform_table(mut table: Table) -> Result<Table> {
    println!("Before Cleaning: {:?}", table.shape());
    table.drop_incomplete(&CORE_COLUMNS);
    println!("After Cleaning: {:?}", table.shape());

    let place = table.require_columns(&["place"])?[0];
    let rows = std::mem::take(&mut table.rows);

    table.headers.extend(LOCATION_COLUMNS.iter().map(|c| c.to_string()));
    table.rows = rows
        .into_iter()
        .filter_map(|mut row| {
            let location = ResolvedLocation::from_place(&row[place]);
            if !location.is_united_states() {
                return None;
            }
            row.extend(location_fields(location));
            Some(row)
        })
        .collect();

    table.rename_columns(&[("id", "earthquake_id")]);
    table.drop_columns(&["place"]);

    Ok(table)
}

fn location_fields(location: ResolvedLocation) -> [String; 6] {
    let parsed = location.parsed;

    [
        parsed.distance.unwrap_or_default(),
        parsed.direction.unwrap_or_default(),
        parsed.nearest,
        location.state.unwrap_or_default(),
        location.country.to_string(),
        location.continent.to_string(),
    ]
}

// -- Tests -------------------------------------------------------------------
