mod imputer;
mod loader;
mod merger;
mod models;
mod reporter;

use anyhow::Result;
use clap::{Arg, Command};
use imputer::{CategoryImputer, ImputationSummary};
use loader::{write_table, SurveyLoader};
use log::{info, warn};
use merger::SurveyMerger;
use models::{Config, Table};
use reporter::{QualityReport, QualityReporter};
use std::path::Path;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let matches = Command::new("survey-merge")
        .version("0.1")
        .about("Merges yearly survey tables and reports data quality")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("survey-merge.toml"),
        )
        .subcommand(Command::new("merge").about("Combine the yearly files into one table"))
        .subcommand(Command::new("report").about("Report occurrence and completeness of the combined table"))
        .subcommand(Command::new("all").about("Merge, then report (default)"))
        .get_matches();

    let config_file = matches
        .get_one::<String>("config")
        .map(String::as_str)
        .unwrap_or("survey-merge.toml");

    // Load or create configuration
    let config = if Path::new(config_file).exists() {
        println!("📋 Loading configuration from: {}", config_file);
        Config::load_from_file(config_file)?
    } else {
        println!("📝 Creating default configuration file: {}", config_file);
        let default_config = Config::default();
        default_config.save_to_file(config_file)?;
        default_config
    };

    let data_dir = Path::new(&config.data_directory);
    let combined_path = data_dir.join(&config.output_file);

    match matches.subcommand_name().unwrap_or("all") {
        "merge" => run_merge(&config, data_dir, &combined_path)?,
        "report" => run_report(&config, &combined_path)?,
        _ => {
            run_merge(&config, data_dir, &combined_path)?;
            run_report(&config, &combined_path)?;
        }
    }

    Ok(())
}

fn run_merge(config: &Config, data_dir: &Path, combined_path: &Path) -> Result<()> {
    println!("📂 Reading yearly files from: {}", data_dir.display());

    let outcome = SurveyMerger::new(config).merge(data_dir)?;
    for (year, rows) in &outcome.rows_per_year {
        println!("   ✅ {}.csv: {} rows", year, rows);
    }
    if !outcome.dropped_columns.is_empty() {
        println!("   🗑️  Dropped columns: {}", outcome.dropped_columns.join(", "));
    }

    let mut combined = outcome.table;
    let summary = CategoryImputer::new(
        &config.entity_column,
        &config.category_column,
        &config.manual_categories,
    )
    .impute(&mut combined);
    print_imputation_summary(&config.category_column, &summary);

    write_table(&combined, combined_path)?;
    info!("Wrote {} rows to {}", combined.len(), combined_path.display());
    println!("\n✅ Saved combined file as {}", combined_path.display());
    Ok(())
}

fn run_report(config: &Config, combined_path: &Path) -> Result<()> {
    println!("📄 Reading combined file: {}", combined_path.display());

    let combined = SurveyLoader::new(&config.missing_markers).load_file(combined_path)?;
    if combined.is_empty() {
        warn!("{} has no data rows", combined_path.display());
    }
    let report =
        QualityReporter::new(&config.entity_column, config.expected_occurrences()).analyze(&combined);
    print_quality_report(&config.entity_column, &combined, &report);
    Ok(())
}

fn print_imputation_summary(category_column: &str, summary: &ImputationSummary) {
    println!("\n🧩 Filling missing '{}' values", category_column);
    println!("   Missing before filling: {}", summary.missing_before);
    println!("   Missing after filling:  {}", summary.missing_after_lookup);

    println!("\n🔍 Entities with no {} info in any year:", category_column);
    for entity in &summary.needing_manual {
        println!("   {}", entity);
    }

    println!("\n🏷️  Distinct {} values in the data:", category_column);
    for category in &summary.distinct_categories {
        println!("   {}", category);
    }

    println!(
        "\n   Missing {} values after manual assignments: {}",
        category_column, summary.missing_after_manual
    );
    if !summary.unresolved.is_empty() {
        println!("   ⚠️  Still unresolved: {}", summary.unresolved.join(", "));
    }
}

fn print_quality_report(entity_column: &str, table: &Table, report: &QualityReport) {
    println!("\n📊 Counts for each {}:", entity_column);
    for (entity, count) in &report.occurrences {
        println!("   {:<40} {}", entity, count);
    }

    println!(
        "\n⚠️  {} values that do NOT occur {} times:",
        entity_column, report.expected_occurrences
    );
    for (entity, count) in &report.unexpected_occurrences {
        println!("   {}: {}", entity, count);
    }
    println!(
        "   Total # of {} values that don't occur {} times: {}",
        entity_column,
        report.expected_occurrences,
        report.unexpected_total()
    );

    println!(
        "\n🕳️  Rows with at least 1 missing value: {} out of {}",
        report.incomplete_rows.len(),
        report.total_rows
    );
    if report.incomplete_rows.is_empty() {
        return;
    }

    println!("\nRows with missing values:");
    println!("   row  {}", table.headers.join(" | "));
    for &index in &report.incomplete_rows {
        let cells: Vec<&str> = table.rows[index]
            .iter()
            .map(|cell| cell.as_deref().unwrap_or("NaN"))
            .collect();
        println!("   {:<4} {}", index, cells.join(" | "));
    }
}
