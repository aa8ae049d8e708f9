use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use facetsync::filter::{standard_fields, ChangeSource, FieldOption, FieldSet, QueryParams};
use facetsync::fixture::FixtureBackend;
use facetsync::output;
use facetsync::search::{
    ControllerConfig, ListLoader, MemoryRouter, NavDirection, Router, SearchController,
};
use facetsync::typeahead::{SuggestionSource, TypeaheadAdapter};
use facetsync::utils::{self, AppConfig};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

/// How long the CLI waits for a fixture request before giving up
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);
const POLL_INTERVAL: Duration = Duration::from_millis(2);

#[derive(Parser)]
#[command(name = "facetsync")]
#[command(about = "Filter-state synchronization for faceted record search")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize a query string into canonical parameters and effective values
    Params {
        /// Query string or URL, e.g. "/search?query=acme&page=2"
        query: String,
    },
    /// Load a route and run its search against a fixture file
    Search {
        /// Query string or URL of the search page
        query: String,

        /// JSON fixture with records, credential types and facets
        #[arg(short, long)]
        fixture: PathBuf,

        /// Pages to move forward after the first result
        #[arg(long, default_value_t = 0)]
        next: u32,

        /// Pages to move back after moving forward
        #[arg(long, default_value_t = 0)]
        previous: u32,

        /// Print a JSON document instead of a listing
        #[arg(long)]
        json: bool,
    },
    /// Replay keystrokes through the typeahead pipeline
    Suggest {
        /// JSON fixture providing record names
        #[arg(short, long)]
        fixture: PathBuf,

        /// Simulated time between keystrokes
        #[arg(long, default_value_t = 0)]
        interval_ms: u64,

        /// Successive contents of the text input
        #[arg(required = true)]
        keystrokes: Vec<String>,
    },
    /// Show the effective configuration
    Config {
        /// Write the effective configuration back to the config file
        #[arg(long)]
        save: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load()?,
    };
    init_tracing(&config.log_level);
    let color = !cli.no_color;

    match cli.command {
        Commands::Params { query } => show_params(&query)?,
        Commands::Search {
            query,
            fixture,
            next,
            previous,
            json,
        } => run_search(&config, &query, &fixture, next, previous, json, color)?,
        Commands::Suggest {
            fixture,
            interval_ms,
            keystrokes,
        } => run_suggest(&config, &fixture, interval_ms, &keystrokes, color)?,
        Commands::Config { save } => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            if save {
                let path = match cli.config {
                    Some(path) => path,
                    None => utils::get_config_path()?,
                };
                config.save_to(&path)?;
                eprintln!("Saved config to {}", path.display());
            }
        }
    }

    Ok(())
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Accept either a full URL/path or a bare query string
fn route_url(query: &str) -> String {
    if query.starts_with('/') || query.contains("://") {
        query.to_string()
    } else {
        format!("/search?{}", query.trim_start_matches('?'))
    }
}

fn show_params(query: &str) -> Result<()> {
    let mut fields = FieldSet::new(standard_fields())?;
    fields.apply_params(&QueryParams::parse(query), ChangeSource::Route)?;

    let document = serde_json::json!({
        "params": fields.query_params().to_query_string(),
        "values": fields.values(),
    });
    println!("{}", serde_json::to_string_pretty(&document)?);
    Ok(())
}

fn run_search(
    config: &AppConfig,
    query: &str,
    fixture: &Path,
    next: u32,
    previous: u32,
    json: bool,
    color: bool,
) -> Result<()> {
    let backend = FixtureBackend::load_file(fixture)?;
    let mut controller = SearchController::new(
        ControllerConfig::from_app_config(config),
        standard_fields(),
        backend.clone(),
        backend.credential_types(),
        MemoryRouter::from_url(&route_url(query)),
    )?;

    if !controller.is_searching() {
        // The route alone did not trigger a search: submit what it filled in
        controller.submit()?;
    }
    wait_for_search(&mut controller)?;

    for _ in 0..next {
        controller.on_nav(NavDirection::Next)?;
        wait_for_search(&mut controller)?;
    }
    for _ in 0..previous {
        controller.on_nav(NavDirection::Previous)?;
        wait_for_search(&mut controller)?;
    }

    if let Some(err) = controller.last_error() {
        output::print_error(&mut output::stdout(color), err)?;
        bail!("search failed");
    }
    let result = controller
        .results()
        .context("Search finished without a result page")?;

    if json {
        let options: BTreeMap<&str, &[FieldOption]> = controller
            .filters()
            .specs()
            .filter(|spec| !spec.hidden)
            .map(|spec| (spec.name.as_str(), controller.filters().options(&spec.name)))
            .filter(|(_, options)| !options.is_empty())
            .collect();
        let document = serde_json::json!({
            "url": controller.router().url(),
            "values": controller.filters().values(),
            "page": result.page,
            "total": result.total,
            "range": result.range(controller.page_size()).map(|range| range.to_string()),
            "records": result.data,
            "options": options,
            "elapsed_ms": controller
                .search_duration()
                .map(|elapsed| elapsed.as_secs_f64() * 1000.0),
        });
        println!("{}", serde_json::to_string_pretty(&document)?);
    } else {
        let mut stdout = output::stdout(color);
        output::print_url(&mut stdout, &controller.router().url())?;
        output::print_results(&mut stdout, result, controller.page_size())?;
        output::print_options(&mut stdout, controller.filters())?;
    }
    Ok(())
}

/// Drive the controller's event loop until the outstanding search settles
fn wait_for_search<L, P, R>(controller: &mut SearchController<L, P, R>) -> Result<()>
where
    L: ListLoader,
    P: ListLoader,
    P::Item: Into<FieldOption>,
    R: Router,
{
    let deadline = Instant::now() + REQUEST_TIMEOUT;
    loop {
        controller.poll();
        if !controller.is_searching() {
            return Ok(());
        }
        if Instant::now() >= deadline {
            bail!("Timed out waiting for search results");
        }
        thread::sleep(POLL_INTERVAL);
    }
}

fn run_suggest(
    config: &AppConfig,
    fixture: &Path,
    interval_ms: u64,
    keystrokes: &[String],
    color: bool,
) -> Result<()> {
    let backend = FixtureBackend::load_file(fixture)?;
    let mut typeahead = TypeaheadAdapter::from_app_config(backend, config);
    let mut stdout = output::stdout(color);

    // Keystrokes run on a simulated clock; fixture answers are awaited in
    // real time at the simulated instant they were requested.
    let start = Instant::now();
    let interval = Duration::from_millis(interval_ms);
    let mut at = start;
    for (i, keystroke) in keystrokes.iter().enumerate() {
        at = start + interval * i as u32;
        drain_suggestions(&mut typeahead, at, &mut stdout)?;
        typeahead.push_input_at(keystroke, at);
    }
    let quiet = at + Duration::from_millis(config.typeahead_debounce_ms);
    drain_suggestions(&mut typeahead, quiet, &mut stdout)?;

    eprintln!("{} request(s) issued", typeahead.requests_issued());
    Ok(())
}

fn drain_suggestions<S: SuggestionSource, W: termcolor::WriteColor>(
    typeahead: &mut TypeaheadAdapter<S>,
    at: Instant,
    out: &mut W,
) -> Result<()> {
    let deadline = Instant::now() + REQUEST_TIMEOUT;
    loop {
        if let Some(suggestions) = typeahead.poll_at(at) {
            let term = typeahead.last_term().unwrap_or_default();
            output::print_suggestions(out, term, &suggestions)?;
        }
        if !typeahead.is_loading() {
            return Ok(());
        }
        if Instant::now() >= deadline {
            bail!("Timed out waiting for suggestions");
        }
        thread::sleep(POLL_INTERVAL);
    }
}
