//! Healthcare-advice evaluation CLI

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use advice_eval::{
    analysis::{run_analyzer, AnalyzerSpec},
    collect::{build_prompt, run_collect, ConsoleProgress, QueryRecord},
    config::{Config, SentimentBackend},
    process::{create_classifier, run_process},
    providers::create_provider_with_config,
    reporting::{new_run_id, print_console_report, summary_path, JsonSummary},
    stance::{run_stance, LABEL_COLUMN, TEXT_COLUMN},
    table::Table,
};

#[derive(Parser)]
#[command(name = "advice-eval")]
#[command(about = "Collect, score and compare LLM answers to healthcare-advice questions")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask every model to answer every patient query
    Collect {
        /// Query CSV with a patient_query column
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Where to write the table with response columns
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Comma-separated model identifiers (default: from config)
        #[arg(short, long)]
        models: Option<String>,
    },

    /// Add readability and sentiment columns for each response column
    Process {
        #[arg(short, long)]
        input: Option<PathBuf>,

        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Sentiment backend (default: from config)
        #[arg(long, value_enum)]
        sentiment: Option<SentimentBackend>,
    },

    /// Compare reading ease across models
    ReadingLevel {
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// SVG output path
        #[arg(short, long)]
        plot: Option<PathBuf>,
    },

    /// Compare sentiment scores across models
    Sentiment {
        #[arg(short, long)]
        input: Option<PathBuf>,

        #[arg(short, long)]
        plot: Option<PathBuf>,
    },

    /// Plot factuality scores per model
    Factuality {
        #[arg(short, long)]
        input: Option<PathBuf>,

        #[arg(short, long)]
        plot: Option<PathBuf>,
    },

    /// Train and evaluate the stance classifier
    Stance {
        #[arg(short, long)]
        input: Option<PathBuf>,

        #[arg(long, default_value = TEXT_COLUMN)]
        text_col: String,

        #[arg(long, default_value = LABEL_COLUMN)]
        label_col: String,

        /// Also write the evaluation as JSON
        #[arg(short, long)]
        report: Option<PathBuf>,
    },

    /// Write every built prompt to a text file for review
    DumpPrompts {
        #[arg(short, long)]
        input: Option<PathBuf>,

        #[arg(short, long, default_value = "results/prompts")]
        output: PathBuf,
    },

    /// Generate sample configuration
    InitConfig {
        /// Output path for configuration file
        #[arg(short, long, default_value = "config/pipeline.toml")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("advice_eval=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("advice_eval=info,warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .init();

    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Collect { input, output, models } => {
            collect(&config, input, output, models).await?;
        }

        Commands::Process { input, output, sentiment } => {
            let input = input.unwrap_or_else(|| PathBuf::from(&config.paths.responses));
            let output = output.unwrap_or_else(|| PathBuf::from(&config.paths.scores));
            let backend = sentiment.unwrap_or(config.sentiment.backend);

            let classifier = create_classifier(&config.sentiment, backend)?;
            let cols = run_process(classifier.as_ref(), &input, &output).await?;
            println!("Processed {} response column(s) -> {}", cols.len(), output.display());
        }

        Commands::ReadingLevel { input, plot } => {
            analyze(&config, AnalyzerSpec::reading_level(), input, plot)?;
        }

        Commands::Sentiment { input, plot } => {
            analyze(&config, AnalyzerSpec::sentiment(), input, plot)?;
        }

        Commands::Factuality { input, plot } => {
            analyze(&config, AnalyzerSpec::factuality(), input, plot)?;
        }

        Commands::Stance { input, text_col, label_col, report } => {
            let input = input.unwrap_or_else(|| PathBuf::from(&config.paths.stance_labeled));
            run_stance(&input, &text_col, &label_col, &config.stance, report.as_deref())?;
        }

        Commands::DumpPrompts { input, output } => {
            let input = input.unwrap_or_else(|| PathBuf::from(&config.paths.queries));
            dump_prompts(&input, &output)?;
        }

        Commands::InitConfig { output } => {
            init_config(output)?;
        }
    }

    Ok(())
}

async fn collect(
    config: &Config,
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    models_arg: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let input = input.unwrap_or_else(|| PathBuf::from(&config.paths.queries));
    let output = output.unwrap_or_else(|| PathBuf::from(&config.paths.responses));
    let models: Vec<String> = match models_arg {
        Some(list) => list
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        None => config.generation.models.clone(),
    };

    if models.is_empty() {
        eprintln!("Error: no models to query. Pass --models or set generation.models.");
        std::process::exit(1);
    }

    // Fails here, before any row is sent, when the API key is missing
    let provider = create_provider_with_config(config)?;

    println!("=== Response Collection ===");
    println!("Run ID: {}", new_run_id());
    println!("Models: {}", models.join(", "));
    println!();

    let summaries = run_collect(provider.as_ref(), config, &models, &input, &output, ConsoleProgress).await?;

    println!();
    for s in &summaries {
        println!("  {} -> '{}': {} rows, {} errors", s.model, s.column, s.rows, s.failures);
    }
    println!("\nResponses written to: {}", output.display());
    Ok(())
}

fn analyze(
    config: &Config,
    spec: AnalyzerSpec,
    input: Option<PathBuf>,
    plot: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let input = input.unwrap_or_else(|| PathBuf::from(&config.paths.scores));
    let plot = plot.unwrap_or_else(|| spec.default_plot_path(Path::new(&config.paths.plot_dir)));

    let report = run_analyzer(&spec, &input, &plot)?;
    print_console_report(&report);

    let summary_file = summary_path(&plot);
    JsonSummary::from_report(new_run_id(), &report).write_to_file(&summary_file)?;
    println!("Boxplot written to: {}", plot.display());
    println!("Summary written to: {}", summary_file.display());
    Ok(())
}

fn dump_prompts(input: &Path, output_dir: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let table = Table::read_csv(input)?;
    let records = QueryRecord::from_table(&table)?;

    if records.is_empty() {
        eprintln!("Error: No queries to dump");
        std::process::exit(1);
    }

    std::fs::create_dir_all(output_dir)?;

    println!("=== Dumping Prompts ===");
    println!("Queries: {}", records.len());
    println!("Output:  {}", output_dir.display());
    println!();

    for (i, record) in records.iter().enumerate() {
        let filename = format!("row-{}.txt", i + 1);
        std::fs::write(output_dir.join(&filename), build_prompt(record))?;
        println!("  [{}] -> {}", i + 1, filename);
    }

    println!("\nDone. {} files written to {}", records.len(), output_dir.display());
    Ok(())
}

fn init_config(output: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::default();

    // Ensure parent directory exists
    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    config.save_toml(&output)?;
    println!("Configuration written to: {}", output.display());
    Ok(())
}
