use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow};
use clap::{Args, Parser, Subcommand, ValueEnum};
use pdf_table_repair::{
    ExtractOptions, ExtractWarning, ExtractionStrategy, HeaderKeywords, PageSelection,
    PipelineOrder, RepairOptions, Table, extract_tables_from_pdf, repair_table, write_csv,
    write_json, write_xlsx,
};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "pdf2table",
    version,
    about = "Extract item tables from text PDFs and repair repeated headers and wrapped rows"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Extract tables from a PDF, repair them and write the result.
    Extract(ExtractArgs),
    /// Repair an already extracted JSON table.
    Repair(RepairArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Csv,
    Json,
    Xlsx,
}

impl OutputFormat {
    fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
            Self::Xlsx => "xlsx",
        }
    }

    fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "csv" => Some(Self::Csv),
            "json" => Some(Self::Json),
            "xlsx" => Some(Self::Xlsx),
            _ => None,
        }
    }
}

#[derive(Debug, Args)]
struct ExtractArgs {
    /// Input PDF path.
    #[arg(short, long)]
    input: PathBuf,

    /// Output file path. Defaults to `<input stem>_extracted.xlsx` in the current directory.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Expected column names, comma separated (example: Item,Descrição,Quantidade,Valor).
    #[arg(short, long)]
    columns: String,

    /// Page selection like 1-3,5.
    #[arg(long)]
    pages: Option<String>,

    /// Line splitting strategies to try, in order (columnar, tokenized).
    #[arg(long = "strategy", value_delimiter = ',', value_parser = ExtractionStrategy::from_str)]
    strategies: Vec<ExtractionStrategy>,

    #[command(flatten)]
    repair: RepairFlags,

    #[command(flatten)]
    output_flags: OutputFlags,
}

#[derive(Debug, Args)]
struct RepairArgs {
    /// Input JSON table: {"columns": [...], "rows": [[...], ...]}.
    #[arg(short, long)]
    input: PathBuf,

    /// Output file path. Defaults to `<input stem>_extracted.xlsx` in the current directory.
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[command(flatten)]
    repair: RepairFlags,

    #[command(flatten)]
    output_flags: OutputFlags,
}

#[derive(Debug, Args)]
struct RepairFlags {
    /// Pass order: dedup-first or consolidate-first.
    #[arg(long, default_value = "dedup-first")]
    order: String,

    /// File with header keywords, one per line, replacing the built-in list.
    #[arg(long)]
    keywords: Option<PathBuf>,

    /// Extra header keyword. Repeatable.
    #[arg(long = "keyword")]
    extra_keywords: Vec<String>,
}

#[derive(Debug, Args)]
struct OutputFlags {
    /// Output format. Inferred from the output extension when omitted.
    #[arg(long, value_enum)]
    format: Option<OutputFormat>,

    /// Output delimiter character for CSV.
    #[arg(long, default_value = ",")]
    delimiter: char,

    /// Enable verbose logging and warning output.
    #[arg(short, long)]
    verbose: bool,
}

fn parse_columns(value: &str) -> Result<Vec<String>> {
    let columns = value
        .split(',')
        .map(|name| name.trim().to_string())
        .collect::<Vec<_>>();
    if columns.iter().any(String::is_empty) {
        anyhow::bail!("invalid --columns, names must be non-empty");
    }
    Ok(columns)
}

fn parse_repair_options(flags: &RepairFlags) -> Result<RepairOptions> {
    let order = PipelineOrder::from_str(&flags.order)
        .map_err(|error| anyhow!(error))
        .context("failed to parse --order")?;

    let keywords = match &flags.keywords {
        Some(path) => HeaderKeywords::load(path)
            .with_context(|| format!("failed to read keywords from '{}'", path.display()))?,
        None => HeaderKeywords::default(),
    };

    Ok(RepairOptions {
        keywords: keywords.with_extra(&flags.extra_keywords),
        order,
    })
}

fn delimiter_byte(flags: &OutputFlags) -> Result<u8> {
    if !flags.delimiter.is_ascii() {
        anyhow::bail!("delimiter must be a single ASCII character");
    }
    Ok(flags.delimiter as u8)
}

/// Picks the output path and format. An explicit `--format` wins, then the
/// output extension, then CSV. Without `-o` the file is written to the
/// current directory as `<stem>_extracted.<ext>`.
fn resolve_output(
    input: &Path,
    output: Option<&Path>,
    format: Option<OutputFormat>,
) -> (PathBuf, OutputFormat) {
    match output {
        Some(path) => {
            let format = format
                .or_else(|| OutputFormat::from_path(path))
                .unwrap_or(OutputFormat::Csv);
            (path.to_path_buf(), format)
        }
        None => {
            let format = format.unwrap_or(OutputFormat::Xlsx);
            let stem = input
                .file_stem()
                .map_or_else(|| "table".to_string(), |stem| stem.to_string_lossy().into_owned());
            let path = PathBuf::from(format!("{stem}_extracted.{}", format.extension()));
            (path, format)
        }
    }
}

fn write_output(
    input: &Path,
    output: Option<&Path>,
    table: &Table,
    flags: &OutputFlags,
) -> Result<()> {
    let (path, format) = resolve_output(input, output, flags.format);
    match format {
        OutputFormat::Csv => write_csv(&path, table, delimiter_byte(flags)?),
        OutputFormat::Json => write_json(&path, table),
        OutputFormat::Xlsx => write_xlsx(&path, table),
    }
    .with_context(|| format!("failed to write '{}'", path.display()))?;
    tracing::debug!(path = %path.display(), format = format.extension(), "table written");
    Ok(())
}

fn log_warnings(warnings: &[ExtractWarning], verbose: bool) {
    if warnings.is_empty() {
        return;
    }

    eprintln!("warning: {} issue(s) detected", warnings.len());
    if verbose {
        for warning in warnings {
            eprintln!(
                "  - {:?} page={:?} table_id={:?}: {}",
                warning.code, warning.page, warning.table_id, warning.message
            );
        }
    }
}

fn run_extract(args: &ExtractArgs) -> Result<usize> {
    let pages = args
        .pages
        .as_deref()
        .map(PageSelection::from_str)
        .transpose()
        .context("failed to parse --pages")?;

    let mut options = ExtractOptions {
        columns: parse_columns(&args.columns)?,
        pages,
        delimiter: delimiter_byte(&args.output_flags)?,
        repair: parse_repair_options(&args.repair)?,
        ..ExtractOptions::default()
    };
    if !args.strategies.is_empty() {
        options.strategies.clone_from(&args.strategies);
    }

    let (table, report) = extract_tables_from_pdf(&args.input, &options)
        .with_context(|| format!("failed to extract tables from '{}'", args.input.display()))?;
    write_output(
        &args.input,
        args.output.as_deref(),
        &table,
        &args.output_flags,
    )?;
    log_warnings(&report.warnings, args.output_flags.verbose);
    Ok(table.len())
}

fn run_repair(args: &RepairArgs) -> Result<usize> {
    let file = File::open(&args.input)
        .with_context(|| format!("failed to open '{}'", args.input.display()))?;
    let table: Table = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("failed to parse table from '{}'", args.input.display()))?;

    let options = parse_repair_options(&args.repair)?;
    let (table, _) = repair_table(table, &options);
    write_output(
        &args.input,
        args.output.as_deref(),
        &table,
        &args.output_flags,
    )?;
    Ok(table.len())
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose {
        "pdf_table_repair=debug"
    } else {
        "pdf_table_repair=warn"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let result = match &cli.command {
        Commands::Extract(args) => {
            init_tracing(args.output_flags.verbose);
            run_extract(args)
        }
        Commands::Repair(args) => {
            init_tracing(args.output_flags.verbose);
            run_repair(args)
        }
    };

    match result {
        Ok(0) => {
            eprintln!("no rows could be salvaged from the input");
            ExitCode::from(2)
        }
        Ok(_) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error: {error:#}");
            ExitCode::from(1)
        }
    }
}
