//! Summarise the final dataset and ask a language model for a report.

use anyhow::{Context, Result};

use crate::{
    cli::print_banner,
    config::{ReportArgs, API_KEY_VAR},
    report::{
        analysis_prompt, analyze, bound, print_stats, sample_rows, ChatClient, WAREHOUSING_PROMPT,
    },
    table::Table,
};

pub async fn report(args: &ReportArgs) -> Result<String> {
    println!("Loading earthquake dataset from: {}", args.input.display());
    let table = Table::read_csv(&args.input)
        .with_context(|| format!("Please make sure '{}' is the final dataset", args.input.display()))?;

    println!(
        "Dataset loaded successfully with {} rows and {} columns",
        table.len(),
        table.headers.len()
    );
    println!("\nDataset columns:\n{:?}", table.headers);
    println!("\nDataset shape: {:?}", table.shape());
    println!(
        "Memory usage: {:.2} MB",
        table.approximate_size() as f64 / (1024.0 * 1024.0)
    );

    let stats = analyze(&table);
    print_stats(&stats);

    let client = ChatClient::from_env(&args.endpoint, &args.model, API_KEY_VAR)?;

    println!();
    print_banner("=== PROMPT 1: LLMs for Data Warehousing ===");
    match client.get_response(&bound(WAREHOUSING_PROMPT, args.max_prompt_chars)).await {
        Some(response) => println!("{}", response),
        None => println!("Failed to get response for prompt 1"),
    }

    println!();
    print_banner("=== PROMPT 2: Earthquake Data Analysis ===");
    println!(
        "\nPreparing sample of {} rows from {} total rows...",
        args.sample_size,
        table.len()
    );
    let sample = sample_rows(&table, args.sample_size, args.seed);
    let prompt = analysis_prompt(&table, &sample, &stats)?;
    match client.get_response(&bound(&prompt, args.max_prompt_chars)).await {
        Some(response) => println!("{}", response),
        None => println!("Failed to get response for prompt 2"),
    }

    let sample_file = args
        .output_dir
        .join(format!("earthquake_sample_{}_records.csv", sample.len()));
    sample.write_csv(&sample_file)?;

    println!("\n{}", "=".repeat(60));
    println!("Sample data saved to '{}' for Tableau analysis", sample_file.display());
    println!(
        "Ready for import into Tableau with {} representative records",
        sample.len()
    );
    println!("{}", "=".repeat(60));

    Ok(sample_file.to_string_lossy().to_string())
}
