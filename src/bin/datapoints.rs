use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use datapoints::app::App;
use datapoints::config::{ConfigLoader, ResolvedConfig};
use datapoints::domain::PricePaidVersion;
use datapoints::error::DatapointsError;
use datapoints::http::ReqwestSource;
use datapoints::output::{JsonOutput, OutputMode, TextOutput};

#[derive(Parser)]
#[command(name = "datapoints")]
#[command(about = "Download and cache INSPIRE index polygons and Price Paid Data")]
#[command(version, author)]
struct Cli {
    /// Print results as JSON.
    #[arg(long, global = true)]
    json: bool,

    /// Path to a JSON config file (defaults to ./datapoints.json when present).
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "List the local authorities offered for download")]
    Catalog,
    #[command(about = "INSPIRE index polygons")]
    Inspire(InspireArgs),
    #[command(about = "HM Land Registry Price Paid Data")]
    Ppd(PpdArgs),
    #[command(about = "Query downloaded parcels")]
    Parcel(ParcelArgs),
}

#[derive(Args)]
struct InspireArgs {
    #[command(subcommand)]
    command: InspireCommand,
}

#[derive(Subcommand)]
enum InspireCommand {
    #[command(about = "Download index polygons for the named authorities")]
    Fetch(InspireFetchArgs),
    #[command(about = "Print the cached file for one authority")]
    Get(NameArgs),
    #[command(about = "List cached index polygon files")]
    List,
}

#[derive(Args)]
struct InspireFetchArgs {
    names: Vec<String>,

    /// Download every authority in the catalog.
    #[arg(long, conflicts_with = "names")]
    all: bool,
}

#[derive(Args)]
struct NameArgs {
    name: String,
}

#[derive(Args)]
struct PpdArgs {
    #[command(subcommand)]
    command: PpdCommand,
}

#[derive(Subcommand)]
enum PpdCommand {
    #[command(about = "Download a Price Paid Data file")]
    Fetch(PpdFetchArgs),
    #[command(about = "List cached Price Paid Data files")]
    List,
    #[command(about = "Print sales from a Price Paid Data file")]
    Show(ShowArgs),
}

#[derive(Args)]
struct PpdFetchArgs {
    /// monthly-update, complete, or a year (defaults to monthly-update).
    #[arg(long)]
    version: Option<String>,

    /// Fetch the yearly file for the previous calendar year.
    #[arg(long, conflicts_with = "version")]
    last_year: bool,
}

#[derive(Args)]
struct ShowArgs {
    path: Utf8PathBuf,

    #[arg(long, default_value_t = 20)]
    limit: usize,
}

#[derive(Args)]
struct ParcelArgs {
    #[command(subcommand)]
    command: ParcelCommand,
}

#[derive(Subcommand)]
enum ParcelCommand {
    #[command(about = "Find the parcel containing a point")]
    Locate(LocateArgs),
}

#[derive(Args)]
struct LocateArgs {
    file: Utf8PathBuf,
    x: f64,
    y: f64,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<DatapointsError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &DatapointsError) -> u8 {
    match error {
        DatapointsError::NotFound(_)
        | DatapointsError::InvalidName(_)
        | DatapointsError::InvalidVersion(_) => 2,
        DatapointsError::DownloadFailed { .. }
        | DatapointsError::BulkIncomplete { .. }
        | DatapointsError::Transport(_)
        | DatapointsError::HttpStatus { .. }
        | DatapointsError::CatalogUnavailable(_)
        | DatapointsError::CatalogMismatch { .. } => 3,
        DatapointsError::Cancelled(_) => 130,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Text
    };
    let config = ConfigLoader::resolve(cli.config.as_deref())?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .into_diagnostic()?;
    runtime.block_on(run_command(cli.command, config, output_mode))
}

async fn run_command(
    command: Commands,
    config: ResolvedConfig,
    output_mode: OutputMode,
) -> miette::Result<()> {
    let http = ReqwestSource::new(&config.http)?;
    let app = App::new(http, &config);
    let cancel = CancellationToken::new();
    spawn_interrupt_handler(cancel.clone());

    match command {
        Commands::Catalog => {
            let result = app.catalog().await?;
            match output_mode {
                OutputMode::Json => JsonOutput::print(&result),
                OutputMode::Text => TextOutput::print_catalog(&result),
            }
            .into_diagnostic()
        }
        Commands::Inspire(args) => run_inspire(args.command, &app, &cancel, output_mode).await,
        Commands::Ppd(args) => run_ppd(args.command, &app, &cancel, output_mode).await,
        Commands::Parcel(args) => match args.command {
            ParcelCommand::Locate(args) => {
                let result = app.locate_parcel(&args.file, args.x, args.y)?;
                match output_mode {
                    OutputMode::Json => JsonOutput::print(&result),
                    OutputMode::Text => TextOutput::print_locate(&result),
                }
                .into_diagnostic()
            }
        },
    }
}

async fn run_inspire(
    command: InspireCommand,
    app: &App<ReqwestSource>,
    cancel: &CancellationToken,
    output_mode: OutputMode,
) -> miette::Result<()> {
    match command {
        InspireCommand::Fetch(args) => {
            if args.names.is_empty() && !args.all {
                return Err(miette::Report::msg(
                    "name at least one authority or pass --all",
                ));
            }
            let names = (!args.all).then_some(args.names);
            let report = app.fetch_inspire(names, cancel).await?;
            match output_mode {
                OutputMode::Json => JsonOutput::print(&report),
                OutputMode::Text => TextOutput::print_bulk(&report),
            }
            .into_diagnostic()?;
            if cancel.is_cancelled() {
                return Err(DatapointsError::Cancelled("bulk download".to_string()).into());
            }
            if !report.is_complete() {
                return Err(DatapointsError::BulkIncomplete {
                    failed: report.failures().count(),
                    total: report.items.len(),
                }
                .into());
            }
            Ok(())
        }
        InspireCommand::Get(args) => {
            let result = app.get_inspire(&args.name)?;
            match output_mode {
                OutputMode::Json => JsonOutput::print(&result),
                OutputMode::Text => TextOutput::print_path(&result),
            }
            .into_diagnostic()
        }
        InspireCommand::List => {
            let result = app.list_inspire()?;
            match output_mode {
                OutputMode::Json => JsonOutput::print(&result),
                OutputMode::Text => TextOutput::print_list(&result),
            }
            .into_diagnostic()
        }
    }
}

async fn run_ppd(
    command: PpdCommand,
    app: &App<ReqwestSource>,
    cancel: &CancellationToken,
    output_mode: OutputMode,
) -> miette::Result<()> {
    match command {
        PpdCommand::Fetch(args) => {
            let version = match args.version {
                Some(value) => value.parse::<PricePaidVersion>()?,
                None if args.last_year => PricePaidVersion::previous_year(),
                None => PricePaidVersion::default(),
            };
            let result = app.fetch_price_paid(version, cancel).await?;
            match output_mode {
                OutputMode::Json => JsonOutput::print(&result),
                OutputMode::Text => TextOutput::print_fetch(&result),
            }
            .into_diagnostic()
        }
        PpdCommand::List => {
            let result = app.list_price_paid()?;
            match output_mode {
                OutputMode::Json => JsonOutput::print(&result),
                OutputMode::Text => TextOutput::print_list(&result),
            }
            .into_diagnostic()
        }
        PpdCommand::Show(args) => {
            let result = app.show_price_paid(&args.path, Some(args.limit))?;
            match output_mode {
                OutputMode::Json => JsonOutput::print(&result),
                OutputMode::Text => TextOutput::print_show(&result),
            }
            .into_diagnostic()
        }
    }
}

fn spawn_interrupt_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, cancelling outstanding downloads");
            cancel.cancel();
        }
    });
}
