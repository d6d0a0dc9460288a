//! DataVision CLI - inspect data files and serve the ingestion API
//!
//! # Main Commands
//!
//! ```bash
//! datavision serve                       # Start HTTP server (port 3000)
//! datavision parse sales.csv             # Dataset JSON (columns + rows)
//! datavision infer sales.xlsx            # Column name/type table
//! datavision save sales.csv --chart c.json
//! datavision datasets list               # Locally saved summaries
//! ```
//!
//! # Inspection Commands
//!
//! ```bash
//! datavision validate data.json          # Schema + data-quality issues
//! datavision recommend data.csv          # Suggested chart types
//! datavision stats data.csv "Revenue"    # Column statistics
//! datavision export data.xlsx --format csv
//! datavision samples [key]               # Built-in sample datasets
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use datavision::{
    column_stats, data_quality_issues, parse_file, recommend_charts, samples, to_csv, to_json,
    validate_schema, ChartConfig, Config, LocalStore, ParseOptions, ParseOutcome, RemoteStore,
    SaveDatasetRequest,
};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "datavision")]
#[command(about = "Ingest CSV, JSON and Excel files into typed, chart-ready datasets", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a file and output the dataset as JSON
    Parse {
        /// Input file (.csv, .json, .xlsx, .xls)
        input: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show the inferred type of every column
    Infer {
        /// Input file
        input: PathBuf,
    },

    /// Check column names and data quality (exit code 1 if the schema is invalid)
    Validate {
        /// Input file
        input: PathBuf,
    },

    /// Suggest chart types for a file
    Recommend {
        /// Input file
        input: PathBuf,
    },

    /// Statistics and distinct values of one column
    Stats {
        /// Input file
        input: PathBuf,

        /// Column name
        column: String,
    },

    /// Convert a file to CSV or JSON
    Export {
        /// Input file
        input: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = ExportFormat::Csv)]
        format: ExportFormat,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List sample datasets, or print one as JSON
    Samples {
        /// Sample key (sales, website, survey, stock, ecommerce)
        key: Option<String>,
    },

    /// Save a dataset summary (remote save function if configured, else local store)
    Save {
        /// Input file
        input: PathBuf,

        /// Chart configuration JSON file
        #[arg(short, long)]
        chart: Option<PathBuf>,

        /// URL of the original file, stored with the summary
        #[arg(long)]
        file_url: Option<String>,
    },

    /// Manage locally saved dataset summaries
    Datasets {
        #[command(subcommand)]
        action: DatasetAction,
    },

    /// Start HTTP server
    Serve {
        /// Port to listen on (default: DATAVISION_PORT or 3000)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[derive(Subcommand)]
enum DatasetAction {
    /// List saved summaries
    List,

    /// Show a saved summary
    Show {
        /// Dataset ID
        id: String,
    },

    /// Delete a saved summary
    Delete {
        /// Dataset ID
        id: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ExportFormat {
    Csv,
    Json,
}

type CmdResult = Result<(), Box<dyn std::error::Error>>;

#[tokio::main]
async fn main() {
    let config = Config::from_env();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Parse { input, output } => cmd_parse(&config, &input, output.as_deref()).await,
        Commands::Infer { input } => cmd_infer(&config, &input).await,
        Commands::Validate { input } => cmd_validate(&config, &input).await,
        Commands::Recommend { input } => cmd_recommend(&config, &input).await,
        Commands::Stats { input, column } => cmd_stats(&config, &input, &column).await,
        Commands::Export { input, format, output } => {
            cmd_export(&config, &input, format, output.as_deref()).await
        }
        Commands::Samples { key } => cmd_samples(key.as_deref()),
        Commands::Save { input, chart, file_url } => {
            cmd_save(&config, &input, chart.as_deref(), file_url).await
        }
        Commands::Datasets { action } => cmd_datasets(&config, action),
        Commands::Serve { port } => cmd_serve(config, port).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn load(config: &Config, input: &Path) -> Result<ParseOutcome, Box<dyn std::error::Error>> {
    eprintln!("Processing: {}", input.display());
    let outcome = parse_file(input, &ParseOptions::from(config)).await?;
    Ok(outcome)
}

async fn cmd_parse(config: &Config, input: &Path, output: Option<&Path>) -> CmdResult {
    let outcome = load(config, input).await?;
    let json = serde_json::to_string_pretty(&outcome.dataset)?;
    write_output(&json, output)
}

async fn cmd_infer(config: &Config, input: &Path) -> CmdResult {
    let outcome = load(config, input).await?;
    let dataset = &outcome.dataset;

    let width = dataset
        .columns
        .iter()
        .map(|c| c.name.chars().count())
        .max()
        .unwrap_or(0)
        .max("COLUMN".len());

    println!("{:<width$}  {:<8}  MISSING", "COLUMN", "TYPE", width = width);
    for column in &dataset.columns {
        println!(
            "{:<width$}  {:<8}  {}",
            column.name,
            column.column_type.as_str(),
            column.missing_count(),
            width = width
        );
    }
    eprintln!("{} rows", dataset.row_count());
    Ok(())
}

async fn cmd_validate(config: &Config, input: &Path) -> CmdResult {
    let outcome = load(config, input).await?;
    let schema_issues = validate_schema(&outcome.dataset.schema());
    let quality_issues = data_quality_issues(&outcome.dataset);

    for warning in &outcome.warnings {
        eprintln!("   warning: {}", warning);
    }
    for issue in &quality_issues {
        eprintln!("   quality: {}", issue);
    }

    if schema_issues.is_empty() {
        eprintln!("Schema valid ({} columns)", outcome.dataset.columns.len());
        Ok(())
    } else {
        for issue in &schema_issues {
            eprintln!("   schema: {}", issue);
        }
        Err(format!("{} schema issue(s)", schema_issues.len()).into())
    }
}

async fn cmd_recommend(config: &Config, input: &Path) -> CmdResult {
    let outcome = load(config, input).await?;
    let recommendations = recommend_charts(&outcome.dataset);

    if recommendations.is_empty() {
        eprintln!("No chart fits this dataset.");
    }
    for rec in &recommendations {
        println!("{:<10} {:>4.0}%  {}", rec.chart_type.as_str(), rec.confidence * 100.0, rec.reason);
    }
    Ok(())
}

async fn cmd_stats(config: &Config, input: &Path, column: &str) -> CmdResult {
    let outcome = load(config, input).await?;
    if outcome.dataset.column(column).is_none() {
        return Err(format!("Unknown column: {}", column).into());
    }

    let stats = column_stats(&outcome.dataset, column);
    let distinct = datavision::unique_values(&outcome.dataset, column);
    let json = serde_json::json!({
        "column": column,
        "stats": stats,
        "distinctCount": distinct.len(),
    });
    write_output(&serde_json::to_string_pretty(&json)?, None)
}

async fn cmd_export(config: &Config, input: &Path, format: ExportFormat, output: Option<&Path>) -> CmdResult {
    let outcome = load(config, input).await?;
    let content = match format {
        ExportFormat::Csv => to_csv(&outcome.dataset)?,
        ExportFormat::Json => to_json(&outcome.dataset)?,
    };
    write_output(content.trim_end_matches('\n'), output)
}

fn cmd_samples(key: Option<&str>) -> CmdResult {
    match key {
        Some(key) => {
            let dataset = samples::get(key).ok_or_else(|| format!("Unknown sample dataset: {}", key))?;
            write_output(&serde_json::to_string_pretty(&dataset)?, None)
        }
        None => {
            for info in samples::list() {
                println!(
                    "{:<10} {} ({} rows, {} columns)",
                    info.key, info.name, info.row_count, info.column_count
                );
            }
            Ok(())
        }
    }
}

async fn cmd_save(config: &Config, input: &Path, chart: Option<&Path>, file_url: Option<String>) -> CmdResult {
    let outcome = load(config, input).await?;

    let chart_config = match chart {
        Some(path) => Some(serde_json::from_str::<ChartConfig>(&fs::read_to_string(path)?)?),
        None => None,
    };
    datavision::ensure_valid_schema(&outcome.dataset.schema())?;

    let mut request = SaveDatasetRequest::from_dataset(&outcome.dataset, chart_config);
    request.file_url = file_url;

    let response = if config.save_url.is_some() {
        RemoteStore::from_config(config)?.save(&request).await?
    } else {
        eprintln!("No DATAVISION_SAVE_URL set, saving to {}", config.store_dir.display());
        LocalStore::with_dir(&config.store_dir).save(request)?
    };

    eprintln!(
        "Dataset saved with ID: {}",
        response.dataset_id.as_deref().unwrap_or("unknown")
    );
    Ok(())
}

fn cmd_datasets(config: &Config, action: DatasetAction) -> CmdResult {
    let mut store = LocalStore::with_dir(&config.store_dir);

    match action {
        DatasetAction::List => {
            let datasets = store.list();
            if datasets.is_empty() {
                eprintln!("No datasets saved yet.");
                eprintln!("   Use 'datavision save <file>' to add one.");
                return Ok(());
            }
            for stored in datasets {
                println!(
                    "{}  {}  {} ({} rows)",
                    stored.id,
                    stored.created_at.format("%Y-%m-%d %H:%M"),
                    stored.dataset.name,
                    stored.dataset.row_count
                );
            }
        }
        DatasetAction::Show { id } => {
            let stored = store.get(&id)?;
            write_output(&serde_json::to_string_pretty(stored)?, None)?;
        }
        DatasetAction::Delete { id } => {
            store.delete(&id)?;
            eprintln!("Dataset deleted: {}", id);
        }
    }
    Ok(())
}

async fn cmd_serve(mut config: Config, port: Option<u16>) -> CmdResult {
    if let Some(port) = port {
        config.port = port;
    }
    datavision::server::start_server(config).await
}

fn write_output(content: &str, path: Option<&Path>) -> CmdResult {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("Output written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
