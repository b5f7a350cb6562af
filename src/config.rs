//! Run configuration assembled from the command line.

use std::{path::PathBuf, time::Duration};

use clap::Args;

pub const FEED_URL: &str = "https://earthquake.usgs.gov/fdsnws/event/1/query.csv";
pub const SHAPEFILE_URL: &str =
    "https://www2.census.gov/geo/tiger/GENZ2022/shp/cb_2022_us_county_20m.zip";
pub const CHAT_ENDPOINT: &str = "https://api.groq.com/openai/v1/chat/completions";
pub const CHAT_MODEL: &str = "llama-3.3-70b-versatile";
pub const API_KEY_VAR: &str = "GROQ_API_KEY";

/// Options shared by the pipeline steps.
#[derive(Args, Debug, Clone)]
pub struct PipelineArgs {
    /// Directory the CSV artifacts are read from and written to
    #[arg(long, default_value = ".")]
    pub data_dir: PathBuf,

    /// Directory for the downloaded county archive [default: user cache dir]
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,

    /// First year to download
    #[arg(long, default_value_t = 2020)]
    pub start_year: i32,

    /// Last year to download (inclusive)
    #[arg(long, default_value_t = 2025)]
    pub end_year: i32,

    /// Minimum event magnitude requested from the feed
    #[arg(long, default_value_t = 0.0)]
    pub min_magnitude: f64,

    #[arg(long, default_value = FEED_URL)]
    pub feed_url: String,

    #[arg(long, default_value = SHAPEFILE_URL)]
    pub shapefile_url: String,

    /// Also write the final dataset as a parquet file
    #[arg(long)]
    pub parquet: bool,
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub years: Vec<i32>,
    pub min_magnitude: f64,
    pub feed_url: String,
    pub feed_timeout: Duration,
    pub feed_attempts: u32,
    pub raw_file: PathBuf,
    pub transformed_file: PathBuf,
    pub county_file: PathBuf,
    pub final_file: PathBuf,
    pub parquet_file: Option<PathBuf>,
    pub shapefile_url: String,
    pub shapefile_timeout: Duration,
    pub shape_zip: PathBuf,
    pub shape_dir: PathBuf,
}

impl PipelineConfig {
    pub fn from_args(args: &PipelineArgs) -> Self {
        let span = format!("{}-{}", args.start_year, args.end_year);
        let data = |name: String| args.data_dir.join(name);

        let cache_dir = args.cache_dir.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("usquake")
        });
        let archive_name = args
            .shapefile_url
            .rsplit('/')
            .next()
            .filter(|name| !name.is_empty())
            .unwrap_or("counties.zip");
        let archive_stem = archive_name.trim_end_matches(".zip");

        PipelineConfig {
            years: (args.start_year..=args.end_year).collect(),
            min_magnitude: args.min_magnitude,
            feed_url: args.feed_url.clone(),
            feed_timeout: Duration::from_secs(120),
            feed_attempts: 3,
            raw_file: data(format!("earthquakes[{span}].csv")),
            transformed_file: data(format!("Earthquake[{span}]-Transformed.csv")),
            county_file: data("Earthquake_with_Counties.csv".to_string()),
            final_file: data(format!("Earthquake[{span}]USA.csv")),
            parquet_file: args
                .parquet
                .then(|| data(format!("Earthquake[{span}]USA.parquet"))),
            shapefile_url: args.shapefile_url.clone(),
            shapefile_timeout: Duration::from_secs(30),
            shape_zip: cache_dir.join(archive_name),
            shape_dir: cache_dir.join(archive_stem),
        }
    }
}

/// Options for the report command.
#[derive(Args, Debug, Clone)]
pub struct ReportArgs {
    /// Final dataset to summarise
    #[arg(long, default_value = "Earthquake[2020-2025]USA.csv")]
    pub input: PathBuf,

    /// Number of rows sampled for the prompt
    #[arg(long, default_value_t = 80)]
    pub sample_size: usize,

    /// Seed for the row sample
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    #[arg(long, default_value = CHAT_MODEL)]
    pub model: String,

    #[arg(long, default_value = CHAT_ENDPOINT)]
    pub endpoint: String,

    /// Prompts longer than this are cut
    #[arg(long, default_value_t = 16_000)]
    pub max_prompt_chars: usize,

    /// Directory the sample CSV is written to
    #[arg(long, default_value = ".")]
    pub output_dir: PathBuf,
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        args: PipelineArgs,
    }

    #[test]
    fn should_name_artifacts_after_year_span() {
        let cli = TestCli::parse_from([
            "usquake",
            "--data-dir",
            "/data",
            "--cache-dir",
            "/cache",
            "--start-year",
            "2021",
            "--end-year",
            "2022",
        ]);
        let config = PipelineConfig::from_args(&cli.args);

        assert_eq!(config.years, vec![2021, 2022]);
        assert_eq!(
            config.raw_file,
            PathBuf::from("/data/earthquakes[2021-2022].csv")
        );
        assert_eq!(
            config.final_file,
            PathBuf::from("/data/Earthquake[2021-2022]USA.csv")
        );
        assert_eq!(config.parquet_file, None);
        assert_eq!(
            config.shape_zip,
            PathBuf::from("/cache/cb_2022_us_county_20m.zip")
        );
        assert_eq!(config.shape_dir, PathBuf::from("/cache/cb_2022_us_county_20m"));
    }

    #[test]
    fn should_default_to_2020_through_2025() {
        let cli = TestCli::parse_from(["usquake", "--parquet"]);
        let config = PipelineConfig::from_args(&cli.args);

        assert_eq!(config.years.len(), 6);
        assert_eq!(config.min_magnitude, 0.0);
        assert_eq!(
            config.transformed_file,
            PathBuf::from("./Earthquake[2020-2025]-Transformed.csv")
        );
        assert!(config.parquet_file.is_some());
    }
}
