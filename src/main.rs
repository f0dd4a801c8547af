//! dataops - Transform tabular data from the command line

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};

use dataops::config::{Config, OutputFormat, DEFAULT_PREVIEW_LIMIT};
use dataops::logging;
use dataops::model::{Table, Value};
use dataops::ops::{NullMethod, PercentagePolicy, TargetType};
use dataops::output::{render_to_stdout, report_status};
use dataops::parser::{ParserFactory, ReadOptions};
use dataops::service::{Request, Response, Service};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliOutputFormat {
    Json,
    Terminal,
}

impl From<CliOutputFormat> for OutputFormat {
    fn from(f: CliOutputFormat) -> Self {
        match f {
            CliOutputFormat::Json => OutputFormat::Json,
            CliOutputFormat::Terminal => OutputFormat::Terminal,
        }
    }
}

/// Clean, inspect and derive columns in tabular data (CSV, Excel, JSON)
#[derive(Parser, Debug)]
#[command(name = "dataops")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Output format
    #[arg(short, long, value_enum, global = true)]
    format: Option<CliOutputFormat>,

    /// Emit compact JSON
    #[arg(long, global = true)]
    compact: bool,

    /// Largest table accepted (overrides DATAOPS_MAX_ROWS)
    #[arg(long, global = true)]
    max_rows: Option<usize>,

    /// Largest preview limit (overrides DATAOPS_MAX_PREVIEW_ROWS)
    #[arg(long, global = true)]
    max_preview_rows: Option<usize>,

    /// How bare numbers convert to percentages: scale-above-one or suffix-only
    #[arg(long, global = true)]
    percentage_policy: Option<PercentagePolicy>,

    /// Log progress to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct Input {
    /// Input file (CSV, TSV, Excel or JSON array of objects)
    file: PathBuf,

    /// For Excel files: which sheet to read
    #[arg(long)]
    sheet: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Delete rows with missing values, or fill them in
    RemoveNulls {
        #[command(flatten)]
        input: Input,

        /// Only consider this column
        #[arg(short, long)]
        column: Option<String>,

        /// delete, mean, median, mode or custom
        #[arg(short, long, default_value = "delete")]
        method: NullMethod,

        /// Fill value for the custom method (parsed as JSON when possible)
        #[arg(long)]
        value: Option<String>,
    },
    /// Show the first rows of a table
    Preview {
        #[command(flatten)]
        input: Input,

        /// Number of rows to show
        #[arg(short = 'n', long, default_value_t = DEFAULT_PREVIEW_LIMIT)]
        limit: usize,
    },
    /// Per-column descriptive statistics
    Summary {
        #[command(flatten)]
        input: Input,

        /// Only summarize this column
        #[arg(short, long)]
        column: Option<String>,
    },
    /// Convert a column to another type
    ConvertType {
        #[command(flatten)]
        input: Input,

        /// Column to convert
        #[arg(short, long)]
        column: String,

        /// numeric, string, date, percentage or boolean
        #[arg(short, long)]
        to: TargetType,
    },
    /// Add or replace a column computed from an expression
    Derive {
        #[command(flatten)]
        input: Input,

        /// Name of the new column
        #[arg(short, long)]
        name: String,

        /// Expression, e.g. "price * quantity"
        #[arg(short, long)]
        expression: String,
    },
    /// Count missing values per column
    CountNulls {
        #[command(flatten)]
        input: Input,

        /// Only count this column
        #[arg(short, long)]
        column: Option<String>,
    },
    /// Handle a JSON request envelope
    Request {
        /// Envelope file, or - for stdin
        #[arg(default_value = "-")]
        file: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = logging::init(cli.verbose) {
        eprintln!("Warning: {:#}", e);
    }

    match run(cli) {
        Ok(response) => match response {
            Response::Accepted { .. } => ExitCode::SUCCESS,
            Response::Rejected { .. } => ExitCode::from(1),
            Response::Failed { .. } => ExitCode::from(2),
        },
        Err(e) => {
            tracing::error!("command failed: {:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::from(2)
        }
    }
}

fn build_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::from_env()?.with_compact(cli.compact);
    if let Some(format) = cli.format {
        config = config.with_output_format(format.into());
    }
    if let Some(max_rows) = cli.max_rows {
        config = config.with_max_rows(max_rows);
    }
    if let Some(max_preview_rows) = cli.max_preview_rows {
        config = config.with_max_preview_rows(max_preview_rows);
    }
    if let Some(policy) = cli.percentage_policy {
        config = config.with_percentage_policy(policy);
    }
    Ok(config)
}

fn run(cli: Cli) -> Result<Response> {
    let config = build_config(&cli)?;
    let service = Service::new(config);

    let response = match cli.command {
        Command::Request { file } => {
            let body = read_envelope(&file)?;
            service.handle_json(&body)
        }
        command => service.handle(build_request(command)?),
    };

    render_to_stdout(&response, service.config())?;
    report_status(&response)?;
    Ok(response)
}

fn build_request(command: Command) -> Result<Request> {
    let request = match command {
        Command::RemoveNulls {
            input,
            column,
            method,
            value,
        } => Request::RemoveNulls {
            data: load(&input)?,
            column,
            method,
            custom_value: value.as_deref().map(parse_custom_value),
        },
        Command::Preview { input, limit } => Request::Preview {
            data: load(&input)?,
            limit,
        },
        Command::Summary { input, column } => Request::Summary {
            data: load(&input)?,
            column,
        },
        Command::ConvertType { input, column, to } => Request::ConvertType {
            data: load(&input)?,
            column,
            target_type: to,
        },
        Command::Derive {
            input,
            name,
            expression,
        } => Request::CreateDerivedColumn {
            data: load(&input)?,
            new_column_name: name,
            expression,
        },
        Command::CountNulls { input, column } => Request::CountNulls {
            data: load(&input)?,
            column,
        },
        Command::Request { .. } => anyhow::bail!("request envelopes are handled directly"),
    };
    Ok(request)
}

fn load(input: &Input) -> Result<Table> {
    let options = ReadOptions::default().with_sheet(input.sheet.clone());
    ParserFactory::new()
        .parse(&input.file, &options)
        .with_context(|| format!("Failed to parse file: {}", input.file.display()))
}

fn read_envelope(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut body = String::new();
        std::io::stdin()
            .read_to_string(&mut body)
            .context("Failed to read request from stdin")?;
        Ok(body)
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read request file: {}", path.display()))
    }
}

/// `42` fills with a number, `"42"` or `n/a` with text
fn parse_custom_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}
