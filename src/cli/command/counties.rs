//! Step 3: assign each event to the county that contains it.

use anyhow::{Context, Result};

use crate::{
    cli::{create_progress_bar, create_spinner, print_banner},
    config::PipelineConfig,
    county::{find_shapefile, CountyIndex},
    download::{download_archive, extract_zip},
    table::Table,
};

pub async fn counties(config: &PipelineConfig, input: Option<Table>) -> Result<Table> {
    print_banner("STEP 3: ADDING COUNTY DATA");

    let mut table = match input {
        Some(table) => table,
        None => Table::read_csv(&config.transformed_file)?,
    };

    table
        .require_columns(&["latitude", "longitude"])
        .context("CSV must have 'latitude' and 'longitude' columns")?;

    ensure_shapefile(config).await?;
    let shp_path = find_shapefile(&config.shape_dir)?;

    let spinner = create_spinner(format!("Loading county shapefile from {}…", shp_path.display()));
    let index = CountyIndex::load(&shp_path)?;
    spinner.finish_with_message(format!("Loaded {} county polygons", index.len()));

    let matched = assign_counties(&mut table, &index)?;
    println!("Matched {} of {} events to a county", matched, table.len());

    println!("Writing output CSV to {}…", config.county_file.display());
    table.write_csv(&config.county_file)?;
    println!("County data added successfully!");

    Ok(table)
}

/// Downloads and extracts the county archive unless a previous run left it
/// in the cache directory.
async fn ensure_shapefile(config: &PipelineConfig) -> Result<()> {
    if !config.shape_zip.exists() {
        let spinner = create_spinner("Downloading county shapefile archive...".to_string());
        download_archive(
            &config.shapefile_url,
            &config.shape_zip,
            config.shapefile_timeout,
            spinner.clone(),
        )
        .await?;
        spinner.finish_with_message(format!("Saved ZIP to {}", config.shape_zip.display()));
    }

    if !config.shape_dir.exists() {
        let spinner = create_spinner("Extracting shapefile archive…".to_string());
        if let Err(e) = extract_zip(&config.shape_zip, &config.shape_dir, &spinner) {
            // leave nothing behind that would look like a finished extraction
            let _ = std::fs::remove_dir_all(&config.shape_dir);
            return Err(e);
        }
        spinner.finish_with_message(format!("Extracted into folder: {}", config.shape_dir.display()));
    }

    Ok(())
}

/// Adds a `county` column. Events outside every county, or with coordinates
/// that do not parse, get an empty county. Returns the number matched.
pub fn assign_counties(table: &mut Table, index: &CountyIndex) -> Result<usize> {
    let columns = table
        .require_columns(&["latitude", "longitude"])
        .context("CSV must have 'latitude' and 'longitude' columns")?;
    let (lat_idx, lon_idx) = (columns[0], columns[1]);

    let pb = create_progress_bar(table.len() as u64, "Performing spatial join".to_string());
    let mut matched = 0;

    let names: Vec<String> = table
        .rows
        .iter()
        .map(|row| {
            pb.inc(1);
            let lat = row[lat_idx].trim().parse::<f64>().ok()?;
            let lon = row[lon_idx].trim().parse::<f64>().ok()?;
            index.resolve(lon, lat).map(|county| county.name.clone())
        })
        .map(|name| match name {
            Some(name) => {
                matched += 1;
                name
            }
            None => String::new(),
        })
        .collect();

    pb.finish_with_message("Spatial join complete");
    table.set_column("county", names)?;

    Ok(matched)
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::county::CountyPolygon;
    use geo::{polygon, MultiPolygon};

    fn index() -> CountyIndex {
        let sangamon = polygon![
            (x: -90.0, y: 39.5),
            (x: -89.2, y: 39.5),
            (x: -89.2, y: 40.2),
            (x: -90.0, y: 40.2),
            (x: -90.0, y: 39.5),
        ];
        let anchorage = polygon![
            (x: -150.5, y: 60.8),
            (x: -149.0, y: 60.8),
            (x: -149.0, y: 61.5),
            (x: -150.5, y: 61.5),
            (x: -150.5, y: 60.8),
        ];

        CountyIndex::new(vec![
            CountyPolygon::new("Sangamon", "17167", MultiPolygon::new(vec![sangamon])),
            CountyPolygon::new("Anchorage", "02020", MultiPolygon::new(vec![anchorage])),
        ])
    }

    #[test]
    fn should_add_county_column() {
        let mut table = Table::from_reader(
            "earthquake_id,latitude,longitude\nus1,39.80,-89.60\nak2,61.21,-149.90\nus3,36.0,-125.0\nus4,n/a,-89.6\n"
                .as_bytes(),
        )
        .unwrap();

        let matched = assign_counties(&mut table, &index()).unwrap();

        assert_eq!(matched, 2);
        assert_eq!(
            table.column("county").unwrap(),
            vec!["Sangamon", "Anchorage", "", ""]
        );
    }

    #[test]
    fn should_require_coordinates() {
        let mut table = Table::from_reader("earthquake_id,latitude\nus1,39.8\n".as_bytes()).unwrap();
        let err = assign_counties(&mut table, &index()).unwrap_err();

        assert!(format!("{:#}", err).contains("'latitude' and 'longitude'"));
    }
}
