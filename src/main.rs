use clap::{Args, Parser, Subcommand};
use clubview::backend::patch_from_pairs;
use clubview::config::BackendKind;
use clubview::{
    BulkOutcome, Collaborator, CollectionView, Config, FilterRule, JsonRecord, JsonlCollaborator, Metric, Record,
    RestCollaborator, SortSpec, StatsSpec, ViewState,
};
use colored::Colorize;
use eyre::{Result, bail, eyre};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "clubview")]
#[command(about = "Filter, sort, aggregate and bulk-edit club admin collections")]
#[command(version = env!("GIT_DESCRIBE"))]
struct Cli {
    /// JSONL collection file (jsonl backend)
    #[arg(short, long, default_value = "records.jsonl")]
    file: PathBuf,

    /// Config file (default: <config dir>/clubview/config.yaml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the filtered, sorted view one page at a time
    List(ListArgs),

    /// Aggregate stats over the whole collection
    Stats {
        /// Count records where field equals value (field=value)
        #[arg(long = "count-where", value_name = "FIELD=VALUE")]
        count_where: Vec<String>,

        /// Sum a numeric field
        #[arg(long, value_name = "FIELD")]
        sum: Vec<String>,
    },

    /// Patch one or more records
    Update {
        #[arg(required = true)]
        ids: Vec<String>,

        /// Field assignment; values are parsed as JSON, else kept as text
        #[arg(long = "set", value_name = "KEY=VALUE", required = true)]
        set: Vec<String>,
    },

    /// Delete one or more records
    Delete {
        #[arg(required = true)]
        ids: Vec<String>,
    },
}

#[derive(Args)]
struct ListArgs {
    /// Exact match (field=value); "all" disables the rule
    #[arg(long, value_name = "FIELD=VALUE")]
    eq: Vec<String>,

    /// Case-insensitive text search
    #[arg(long)]
    search: Option<String>,

    /// Fields searched by --search (comma separated)
    #[arg(long = "in", value_delimiter = ',')]
    search_in: Vec<String>,

    /// Inclusive lower bound (field=n)
    #[arg(long, value_name = "FIELD=N")]
    min: Vec<String>,

    /// Inclusive upper bound (field=n)
    #[arg(long, value_name = "FIELD=N")]
    max: Vec<String>,

    /// Date falls within the next N days (field=days)
    #[arg(long, value_name = "FIELD=DAYS")]
    within: Vec<String>,

    /// Sort key, e.g. joinDate:desc
    #[arg(long)]
    sort: Option<String>,

    #[arg(long, default_value_t = 1)]
    page: usize,

    /// Defaults to the configured page size
    #[arg(long)]
    per_page: Option<usize>,

    /// View state file, loaded before and saved after applying the flags
    #[arg(long)]
    state: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load_or_default(cli.config.as_deref())?;

    match config.backend.kind {
        BackendKind::Jsonl => {
            let backend = JsonlCollaborator::<JsonRecord>::with_file(&cli.file);
            run(CollectionView::new(backend), &config, cli.command)
        }
        BackendKind::Rest => {
            let base_url = config
                .backend
                .base_url
                .as_deref()
                .ok_or_else(|| eyre!("backend.base_url is required for the rest backend"))?;
            let collection = config
                .backend
                .collection
                .as_deref()
                .ok_or_else(|| eyre!("backend.collection is required for the rest backend"))?;
            let backend = RestCollaborator::<JsonRecord>::with_timeout(
                base_url,
                config.backend.auth(),
                config.backend.timeout(),
            )?
            .collection(collection);
            run(CollectionView::new(backend), &config, cli.command)
        }
    }
}

fn run<C: Collaborator<JsonRecord>>(
    view: CollectionView<JsonRecord, C>,
    config: &Config,
    command: Commands,
) -> Result<()> {
    let mut view = view.with_config(&config.view);
    view.refresh()?;

    match command {
        Commands::List(args) => list(&mut view, config, args),
        Commands::Stats { count_where, sum } => {
            let mut spec = StatsSpec::new();
            for pair in &count_where {
                let (field, value) = split_pair(pair)?;
                spec = spec.with(pair.clone(), Metric::count_where(field, value));
            }
            for field in &sum {
                spec = spec.with(format!("sum({})", field), Metric::sum(field.clone()));
            }
            let stats = view.with_stats(spec).stats();
            for (name, value) in stats.iter() {
                println!("{:<24} {}", name.bold(), value);
            }
            Ok(())
        }
        Commands::Update { ids, set } => {
            let patch = patch_from_pairs(&set)?;
            let outcome = view.bulk_update(&ids, &patch);
            report("updated", &outcome)
        }
        Commands::Delete { ids } => {
            let outcome = view.bulk_remove(&ids);
            report("deleted", &outcome)
        }
    }
}

fn list<C: Collaborator<JsonRecord>>(
    view: &mut CollectionView<JsonRecord, C>,
    config: &Config,
    args: ListArgs,
) -> Result<()> {
    if let Some(path) = &args.state {
        view.apply_view_state(ViewState::load(path)?);
    }

    for pair in &args.eq {
        let (field, value) = split_pair(pair)?;
        view.set_rule(field, FilterRule::exact(value));
    }

    if let Some(query) = &args.search {
        let fields = if args.search_in.is_empty() {
            config.view.search_fields.clone()
        } else {
            args.search_in.clone()
        };
        view.set_rule("search", FilterRule::text(query.clone(), fields));
    }

    let mut ranges: BTreeMap<&str, (Option<f64>, Option<f64>)> = BTreeMap::new();
    for pair in &args.min {
        let (field, n) = split_pair(pair)?;
        ranges.entry(field).or_default().0 = Some(parse_number(n)?);
    }
    for pair in &args.max {
        let (field, n) = split_pair(pair)?;
        ranges.entry(field).or_default().1 = Some(parse_number(n)?);
    }
    for (field, (min, max)) in ranges {
        view.set_rule(field, FilterRule::range(min, max));
    }

    for pair in &args.within {
        let (field, days) = split_pair(pair)?;
        let days: u32 = days.parse().map_err(|_| eyre!("invalid day count: {}", days))?;
        view.set_rule(field, FilterRule::within_days(days));
    }

    if let Some(sort) = &args.sort {
        let spec = SortSpec::parse(sort).ok_or_else(|| eyre!("invalid sort: {}", sort))?;
        view.set_sort(Some(spec));
    }

    if let Some(path) = &args.state {
        view.view_state().save(path)?;
    }

    let per_page = args.per_page.unwrap_or(config.view.page_size);
    let page = view.page(args.page, per_page);
    for record in &page.items {
        let data = serde_json::to_string(record.data())?;
        println!("{}  {}", record.id().cyan(), data.dimmed());
    }
    println!(
        "{}",
        format!(
            "page {}/{} ({} records)",
            page.page,
            page.total_pages.max(1),
            page.total
        )
        .bold()
    );
    Ok(())
}

fn report<T>(action: &str, outcome: &BulkOutcome<T>) -> Result<()> {
    for failure in &outcome.failed {
        println!("{} {}: {}", "failed".red(), failure.id, failure.reason);
    }
    println!(
        "{} {}, {} failed",
        outcome.succeeded_count().to_string().green(),
        action,
        outcome.failed_count()
    );
    if !outcome.is_complete() {
        bail!("{} of {} records failed", outcome.failed_count(), outcome.succeeded_count() + outcome.failed_count());
    }
    Ok(())
}

fn split_pair(pair: &str) -> Result<(&str, &str)> {
    match pair.split_once('=') {
        Some((field, value)) if !field.trim().is_empty() => Ok((field.trim(), value.trim())),
        _ => Err(eyre!("expected FIELD=VALUE, got {:?}", pair)),
    }
}

fn parse_number(raw: &str) -> Result<f64> {
    raw.parse().map_err(|_| eyre!("invalid number: {}", raw))
}
