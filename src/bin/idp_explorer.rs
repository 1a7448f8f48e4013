use std::fs;
use std::io::{self, Read};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use idp_registry_explorer::app::{App, BrowseOptions, BrowseResult, CountResult, QueryResult};
use idp_registry_explorer::config::{ConfigLoader, ResolvedConfig};
use idp_registry_explorer::controller::Controller;
use idp_registry_explorer::domain::{Endpoint, Theme};
use idp_registry_explorer::error::ExplorerError;
use idp_registry_explorer::gateway::SparqlHttpClient;
use idp_registry_explorer::output::{JsonOutput, OutputMode};
use idp_registry_explorer::preferences::{Preferences, ThemeResult};
use idp_registry_explorer::tui::Tui;

#[derive(Parser)]
#[command(name = "idp-explorer")]
#[command(about = "Browse, search and query the intrinsically disordered protein registry")]
#[command(version, author)]
struct Cli {
    #[arg(long, global = true)]
    non_interactive: bool,

    #[arg(long, global = true)]
    config: Option<String>,

    #[arg(long, global = true)]
    endpoint: Option<Endpoint>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Show one page of registry proteins")]
    Browse(BrowseArgs),
    #[command(about = "Count registry proteins matching a search")]
    Count(CountArgs),
    #[command(about = "Run a query from a file (or - for stdin)")]
    Query(QueryArgs),
    #[command(about = "Show or set the stored UI theme")]
    Theme(ThemeArgs),
}

#[derive(Args)]
struct BrowseArgs {
    #[arg(long, default_value_t = 1)]
    page: usize,

    #[arg(long)]
    per_page: Option<usize>,

    #[arg(long, default_value = "")]
    search: String,
}

#[derive(Args)]
struct CountArgs {
    #[arg(long, default_value = "")]
    search: String,
}

#[derive(Args)]
struct QueryArgs {
    file: String,

    #[arg(long, help = "Print the equivalent curl command instead of running the query")]
    curl: bool,
}

#[derive(Args)]
struct ThemeArgs {
    theme: Option<Theme>,
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(report) => {
            eprintln!("{report:?}");
            if let Some(error) = report.downcast_ref::<ExplorerError>() {
                return ExitCode::from(map_exit_code(error));
            }
            ExitCode::from(1)
        }
    }
}

fn map_exit_code(error: &ExplorerError) -> u8 {
    match error {
        ExplorerError::InvalidEndpoint(_)
        | ExplorerError::InvalidItemsPerPage(_)
        | ExplorerError::ConfigRead(_)
        | ExplorerError::ConfigParse(_) => 2,
        ExplorerError::EndpointHttp(_) | ExplorerError::EndpointStatus { .. } => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.non_interactive {
        OutputMode::NonInteractive
    } else {
        OutputMode::Interactive
    };

    let resolved = ConfigLoader::resolve(cli.config.as_deref())?;
    let endpoint = cli.endpoint.unwrap_or(resolved.endpoint);

    match cli.command {
        Some(Commands::Browse(args)) => run_browse(args, &resolved, endpoint, output_mode),
        Some(Commands::Count(args)) => run_count(args, &resolved, endpoint, output_mode),
        Some(Commands::Query(args)) => run_query(args, &resolved, endpoint, output_mode),
        Some(Commands::Theme(args)) => run_theme(args, output_mode),
        None => {
            if matches!(output_mode, OutputMode::NonInteractive) {
                return Err(miette::Report::msg(
                    "command required (try `idp-explorer --help`)",
                ));
            }
            let app = build_app(&resolved)?;
            let controller = Controller::new(endpoint, resolved.items_per_page)?;
            let preferences = Preferences::new()?;
            let mut tui = Tui::new(app, controller, preferences);
            tui.run()?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn build_app(resolved: &ResolvedConfig) -> miette::Result<App<SparqlHttpClient>> {
    let client = SparqlHttpClient::new(resolved.endpoints.clone(), resolved.timeout)?;
    Ok(App::new(client, resolved.endpoints.clone()))
}

fn run_browse(
    args: BrowseArgs,
    resolved: &ResolvedConfig,
    endpoint: Endpoint,
    output_mode: OutputMode,
) -> miette::Result<ExitCode> {
    let app = build_app(resolved)?;
    let options = BrowseOptions {
        endpoint,
        page: args.page,
        items_per_page: args.per_page.unwrap_or(resolved.items_per_page),
        search: args.search,
    };
    let result = app.browse(options, &JsonOutput)?;
    match output_mode {
        OutputMode::NonInteractive => JsonOutput::print_browse(&result).into_diagnostic()?,
        OutputMode::Interactive => print_browse_summary(&result),
    }
    if result.error.is_some() {
        return Ok(ExitCode::from(3));
    }
    Ok(ExitCode::SUCCESS)
}

fn run_count(
    args: CountArgs,
    resolved: &ResolvedConfig,
    endpoint: Endpoint,
    output_mode: OutputMode,
) -> miette::Result<ExitCode> {
    let app = build_app(resolved)?;
    let result = app.count(&args.search, endpoint, &JsonOutput)?;
    match output_mode {
        OutputMode::NonInteractive => JsonOutput::print_count(&result).into_diagnostic()?,
        OutputMode::Interactive => print_count_summary(&result),
    }
    Ok(ExitCode::SUCCESS)
}

fn run_query(
    args: QueryArgs,
    resolved: &ResolvedConfig,
    endpoint: Endpoint,
    output_mode: OutputMode,
) -> miette::Result<ExitCode> {
    let text = read_query(&args.file)?;
    let app = build_app(resolved)?;
    if args.curl {
        println!("{}", app.curl(&text, endpoint));
        return Ok(ExitCode::SUCCESS);
    }
    let result = app.query(&text, endpoint, &JsonOutput)?;
    match output_mode {
        OutputMode::NonInteractive => JsonOutput::print_query(&result).into_diagnostic()?,
        OutputMode::Interactive => print_query_summary(&result),
    }
    Ok(ExitCode::SUCCESS)
}

fn run_theme(args: ThemeArgs, output_mode: OutputMode) -> miette::Result<ExitCode> {
    let preferences = Preferences::new()?;
    if let Some(theme) = args.theme {
        preferences.set_theme(theme)?;
    }
    let result = ThemeResult {
        theme: preferences.theme(),
        path: preferences.path().to_string(),
    };
    match output_mode {
        OutputMode::NonInteractive => JsonOutput::print_theme(&result).into_diagnostic()?,
        OutputMode::Interactive => println!("{} ({})", result.theme, result.path),
    }
    Ok(ExitCode::SUCCESS)
}

fn read_query(file: &str) -> miette::Result<String> {
    if file == "-" {
        let mut text = String::new();
        io::stdin().read_to_string(&mut text).into_diagnostic()?;
        return Ok(text);
    }
    fs::read_to_string(file)
        .map_err(|err| ExplorerError::Filesystem(format!("{file}: {err}")))
        .map_err(miette::Report::new)
}

fn print_browse_summary(result: &BrowseResult) {
    let cyan = "\x1b[36m";
    let yellow = "\x1b[33m";
    let red = "\x1b[31m";
    let reset = "\x1b[0m";

    let total = result
        .total
        .map(|total| total.to_string())
        .unwrap_or_else(|| "?".to_string());
    println!(
        "{cyan}IDP registry on {}: {total} proteins, page {} of {}{reset}",
        result.endpoint, result.page, result.total_pages
    );
    for protein in &result.proteins {
        let isoform = if protein.is_isoform() { " [isoform]" } else { "" };
        println!(
            "{cyan}{:<10}{reset} {} ({}, taxon {}){isoform}",
            protein.accession(),
            protein.name,
            protein.organism_name,
            protein.taxonomy_number()
        );
        for source in protein.sources() {
            let ranges = source
                .ranges()
                .iter()
                .map(|range| format!("{}-{}", range.start, range.end))
                .collect::<Vec<_>>()
                .join(", ");
            println!("    {} {} [{ranges}] {}", source.name, source.source_id, source.url());
        }
    }
    let pages = result
        .page_numbers
        .iter()
        .map(|number| {
            if *number == result.page {
                format!("[{number}]")
            } else {
                number.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" ");
    println!("pages: {pages}");
    if !result.skipped.is_empty() {
        println!("{yellow}skipped {} malformed rows{reset}", result.skipped.len());
    }
    if let Some(failure) = &result.error {
        println!(
            "{red}{} query failed: {} (status {}){reset}",
            failure.kind.as_str(),
            failure.message,
            failure.status
        );
    }
}

fn print_count_summary(result: &CountResult) {
    if result.search.is_empty() {
        println!("{} proteins on {}", result.total, result.endpoint);
    } else {
        println!(
            "{} proteins matching {:?} on {}",
            result.total, result.search, result.endpoint
        );
    }
}

fn print_query_summary(result: &QueryResult) {
    println!("{}", result.header.join("\t"));
    for row in &result.rows {
        println!("{}", row.join("\t"));
    }
    eprintln!(
        "{} rows in {} ms on {} ({} skipped)",
        result.rows.len(),
        result.elapsed_ms,
        result.endpoint,
        result.skipped.len()
    );
}
