use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tally_core::SignConvention;
use tally_import::{import_csv, write_categorized, CsvImportProfile};
use tally_report::{AnalysisResult, CategoryPivot, MonthlyAggregator};
use tally_rules::{
    categorize_all, category_counts, ExactMatchMode, InvalidPatternWarning, MatchOptions, RuleSet,
    RuleSource,
};
use tracing_subscriber::EnvFilter;

mod config;

use config::{load_config, AppConfig};

#[derive(Parser, Debug)]
#[command(
    name = "tally",
    version,
    about = "Categorize statement transactions and summarize them by month"
)]
struct Cli {
    /// App config file (defaults to ./tally.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Categorize a CSV statement and print the monthly report as JSON
    Analyze {
        /// Statement CSV with date, description and amount columns
        #[arg(long, short)]
        transactions: PathBuf,

        /// Rule-set file, JSON or TOML (defaults to the built-in template)
        #[arg(long)]
        rules: Option<PathBuf>,

        /// signed | kind_flag
        #[arg(long)]
        sign_convention: Option<SignConvention>,

        /// substring | whole_word
        #[arg(long)]
        exact_mode: Option<ExactMatchMode>,

        /// Year for statements that print dates as MM/DD
        #[arg(long)]
        default_year: Option<i32>,

        /// chrono format tried before the built-in date formats
        #[arg(long)]
        date_format: Option<String>,

        /// Write the JSON report here instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Also write categorized transactions as CSV
        #[arg(long)]
        export_csv: Option<PathBuf>,

        /// Include category by month expense and income tables
        #[arg(long)]
        pivot: bool,
    },

    /// Write the starter rule set as JSON
    Template {
        /// Destination file (default: stdout)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Categorize a single description and print the category and tier
    Categorize {
        description: String,

        #[arg(long)]
        rules: Option<PathBuf>,

        #[arg(long)]
        exact_mode: Option<ExactMatchMode>,
    },
}

#[derive(Serialize)]
struct Report<'a> {
    #[serde(flatten)]
    analysis: &'a AnalysisResult,
    warnings: &'a [InvalidPatternWarning],
    #[serde(skip_serializing_if = "Option::is_none")]
    expense_pivot: Option<CategoryPivot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    income_pivot: Option<CategoryPivot>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Analyze {
            transactions,
            rules,
            sign_convention,
            exact_mode,
            default_year,
            date_format,
            output,
            export_csv,
            pivot,
        } => {
            let mut cfg = load_config(cli.config.as_deref())?;
            cfg.rules = rules.or(cfg.rules);
            cfg.sign_convention = sign_convention.unwrap_or(cfg.sign_convention);
            cfg.exact_mode = exact_mode.unwrap_or(cfg.exact_mode);
            cfg.default_year = default_year.or(cfg.default_year);
            cfg.date_format = date_format.or(cfg.date_format);

            analyze(
                &cfg,
                &transactions,
                output.as_deref(),
                export_csv.as_deref(),
                pivot,
            )?;
        }

        Command::Template { output } => {
            let json = RuleSource::template().to_json_pretty()?;
            write_output(output.as_deref(), json.as_bytes())?;
            if let Some(p) = output {
                tracing::info!("Wrote rule template to {}", p.display());
            }
        }

        Command::Categorize {
            description,
            rules,
            exact_mode,
        } => {
            let cfg = load_config(cli.config.as_deref())?;
            let options = MatchOptions {
                exact_mode: exact_mode.unwrap_or(cfg.exact_mode),
            };
            let rule_set = load_rules(rules.or(cfg.rules).as_deref(), options)?;
            let hit = rule_set.categorize(&description);
            println!("{}\t{}", hit.category, hit.tier);
        }
    }

    Ok(())
}

fn load_rules(path: Option<&Path>, options: MatchOptions) -> Result<RuleSet> {
    let rules = match path {
        Some(p) => {
            RuleSet::load(p).with_context(|| format!("loading rules from {}", p.display()))?
        }
        None => {
            tracing::info!("No rule set given, using the built-in template");
            RuleSet::from_source(RuleSource::template(), MatchOptions::default())?
        }
    };
    Ok(rules.with_options(options))
}

fn analyze(
    cfg: &AppConfig,
    transactions: &Path,
    output: Option<&Path>,
    export_csv: Option<&Path>,
    pivot: bool,
) -> Result<()> {
    let rules = load_rules(
        cfg.rules.as_deref(),
        MatchOptions {
            exact_mode: cfg.exact_mode,
        },
    )?;

    let profile = CsvImportProfile {
        default_year: cfg.default_year,
        date_format: cfg.date_format.clone(),
        ..Default::default()
    };
    let file = File::open(transactions)
        .with_context(|| format!("opening {}", transactions.display()))?;
    let txns = import_csv(BufReader::new(file), &profile)
        .with_context(|| format!("parsing {}", transactions.display()))?;

    let categorized = categorize_all(txns, &rules);
    for (category, count) in category_counts(&categorized) {
        tracing::info!(category = %category, count, "Category statistics");
    }

    if let Some(path) = export_csv {
        let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
        write_categorized(BufWriter::new(file), &categorized)
            .with_context(|| format!("writing {}", path.display()))?;
        tracing::info!("Exported categorized transactions to {}", path.display());
    }

    let result = MonthlyAggregator::new(cfg.sign_convention).aggregate(categorized);
    tracing::info!(
        months = result.month_reports.len(),
        unclassifiable = result.unclassifiable_count,
        warnings = rules.warnings().len(),
        "Analysis complete"
    );

    let report = Report {
        analysis: &result,
        warnings: rules.warnings(),
        expense_pivot: pivot.then(|| CategoryPivot::expenses(&result)),
        income_pivot: pivot.then(|| CategoryPivot::income(&result)),
    };
    let json = serde_json::to_string_pretty(&report).context("serialize report")?;
    write_output(output, json.as_bytes())
}

fn write_output(path: Option<&Path>, bytes: &[u8]) -> Result<()> {
    match path {
        Some(p) => fs::write(p, bytes).with_context(|| format!("write {}", p.display())),
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(bytes)?;
            stdout.write_all(b"\n")?;
            Ok(())
        }
    }
}
