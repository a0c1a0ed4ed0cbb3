use std::path::PathBuf;
use std::process;
use std::str::FromStr;

use arxdigest::card::{DEFAULT_HEADER, build_card};
use arxdigest::clock::{AnnouncementClock, Window};
use arxdigest::query::{
    DEFAULT_CLASSES, DEFAULT_ORDER, DEFAULT_QUERY, DEFAULT_SIZE, SearchParams, build_web_query,
};
use arxdigest::types::{Record, SelectionMode};
use arxdigest::utils::{DigestStats, RecordFilter, latest_day};
use arxdigest::{ExtractorConfig, WebScraper, parse_sample};
use chrono::NaiveDate;
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use log::LevelFilter;

#[derive(Parser)]
#[command(name = "arxdigest")]
#[command(about = "Posts the latest arXiv announcements to a chat webhook", long_about = None)]
struct Cli {
    #[arg(
        short = 'l',
        long = "log-level",
        value_enum,
        default_value = "info",
        global = true,
        help = "Set the logging level"
    )]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the listing, keep the current announcement window and post it to the webhook
    Run(RunArgs),
    /// Parse a saved listing page and print its records
    Parse {
        #[arg(help = "Path to a saved search results page")]
        file: PathBuf,

        #[arg(
            long,
            value_name = "YYYY-MM-DD",
            help = "Keep records announced on or after this date",
            value_parser = parse_date,
        )]
        start_date: Option<NaiveDate>,

        #[arg(
            long,
            value_name = "YYYY-MM-DD",
            help = "Keep records announced on or before this date",
            value_parser = parse_date,
        )]
        end_date: Option<NaiveDate>,

        #[arg(
            long,
            help = "Maximum number of records to print",
            value_parser = clap::value_parser!(u32).range(1..)
        )]
        limit: Option<u32>,

        #[arg(
            short = 'o',
            long = "output",
            value_enum,
            default_value = "text",
            help = "Output format"
        )]
        format: OutputFormat,
    },
    /// Resolve the announcement day and window for a clock reading
    Clock {
        #[arg(help = "Clock reading, e.g. 'Fri, 31 Oct 2025 20:00 EDT'")]
        timestamp: String,

        #[arg(
            long,
            env = "WINDOW_DAYS",
            default_value_t = 1,
            help = "Window length in days",
            value_parser = clap::value_parser!(u32).range(1..)
        )]
        window_days: u32,

        #[arg(
            short = 'o',
            long = "output",
            value_enum,
            default_value = "text",
            help = "Output format"
        )]
        format: OutputFormat,
    },
}

#[derive(Args)]
struct RunArgs {
    #[arg(long, env = "WEBHOOK_URL", help = "Incoming webhook of the chat bot")]
    webhook_url: Option<String>,

    #[arg(long, env = "ARXIV_QUERY", default_value = DEFAULT_QUERY, help = "Search terms")]
    query: String,

    #[arg(
        long,
        env = "ARXIV_CLASSES",
        default_value = DEFAULT_CLASSES,
        help = "Comma or space separated classifications"
    )]
    classes: String,

    #[arg(
        long,
        env = "REQUIRE_PHYSICS_GROUP",
        default_value_t = true,
        action = ArgAction::Set,
        value_parser = parse_flag,
        help = "Also OR in the physics group"
    )]
    require_physics_group: bool,

    #[arg(long, env = "RESULT_SIZE", default_value_t = DEFAULT_SIZE, help = "Results per page")]
    size: usize,

    #[arg(long, env = "ORDER", default_value = DEFAULT_ORDER, help = "Result ordering")]
    order: String,

    #[arg(
        long,
        env = "HIDE_ABSTRACTS",
        default_value_t = false,
        action = ArgAction::Set,
        value_parser = parse_flag,
        help = "Request the listing without abstracts"
    )]
    hide_abstracts: bool,

    #[arg(
        long,
        env = "TOP_SEND",
        default_value_t = 10,
        help = "Maximum number of records to send",
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    top_send: u32,

    #[arg(
        long,
        env = "WINDOW_DAYS",
        default_value_t = 1,
        help = "Announcement window length in days",
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    window_days: u32,

    #[arg(
        long,
        default_value = "window",
        value_parser = parse_mode,
        help = "Record selection: 'window' or 'latest'"
    )]
    mode: SelectionMode,

    #[arg(
        long,
        default_value_t = 1,
        help = "Number of result pages to fetch",
        value_parser = clap::value_parser!(u32).range(1..=10)
    )]
    pages: u32,

    #[arg(long, env = "ARXIV_BASE_URL", help = "Override the search site origin")]
    base_url: Option<String>,

    #[arg(long, env = "CLOCK_URL", help = "Override the clock page")]
    clock_url: Option<String>,

    #[arg(long, help = "Use this clock reading instead of fetching the clock page")]
    timestamp: Option<String>,

    #[arg(long, env = "SAMPLE_HTML", help = "Saved listing page to fall back to")]
    sample: Option<PathBuf>,

    #[arg(long, help = "Parse the sample page without fetching the listing")]
    offline: bool,

    #[arg(long, env = "CARD_TITLE", default_value = DEFAULT_HEADER, help = "Card header")]
    header: String,

    #[arg(long, help = "Print the card instead of posting it")]
    dry_run: bool,
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| e.to_string())
}

fn parse_mode(s: &str) -> Result<SelectionMode, String> {
    SelectionMode::from_str(s).map_err(|e| e.to_string())
}

fn parse_flag(s: &str) -> Result<bool, String> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(format!("Expected a boolean, got '{other}'")),
    }
}

fn serialize_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            log::error!("Error serializing to JSON: {}", e);
            process::exit(1);
        }
    }
}

fn print_records(records: &[Record]) {
    if records.is_empty() {
        println!("No entries to display.");
    } else {
        for (i, record) in records.iter().enumerate() {
            println!("{:>3}. {}", i + 1, record);
        }
        print!("{}", DigestStats::from_records(records));
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.log_level.clone().into())
        .init();

    match cli.command {
        Commands::Run(args) => run(args).await,

        Commands::Parse {
            file,
            start_date,
            end_date,
            limit,
            format,
        } => {
            let filter = RecordFilter {
                start_date,
                end_date,
                limit: limit.map(|l| l as usize),
            }
            .validate()
            .unwrap_or_else(|e| {
                log::error!("Invalid args: {e}");
                process::exit(1);
            });

            let config = ExtractorConfig::arxiv();
            let records = parse_sample(&file, &config).unwrap_or_else(|e| {
                log::error!("{}", e);
                process::exit(1);
            });
            log::info!("Parsed {} record(s) from {}", records.len(), file.display());

            let records = filter.apply(records);

            match format {
                OutputFormat::Json => serialize_json(&records),
                OutputFormat::Text => print_records(&records),
            }
        }

        Commands::Clock {
            timestamp,
            window_days,
            format,
        } => {
            let clock = AnnouncementClock::parse(&timestamp).unwrap_or_else(|e| {
                log::error!("{}", e);
                process::exit(1);
            });
            let window = Window::new(clock.target, window_days).unwrap_or_else(|e| {
                log::error!("{}", e);
                process::exit(1);
            });

            match format {
                OutputFormat::Json => serialize_json(&serde_json::json!({
                    "clock": clock,
                    "window": window,
                })),
                OutputFormat::Text => {
                    println!("Observed: {} {}", clock.observed, clock.zone);
                    println!("Target:   {} ({})", clock.target, clock.target.format("%A"));
                    println!("Window:   {}", window);
                }
            }
        }
    }
}

async fn run(args: RunArgs) {
    let webhook_url = match (&args.webhook_url, args.dry_run) {
        (Some(url), _) => Some(url.clone()),
        (None, true) => None,
        (None, false) => {
            log::error!("Missing WEBHOOK_URL (pass --webhook-url or use --dry-run)");
            process::exit(1);
        }
    };

    let mut scraper = WebScraper::new().unwrap_or_else(|e| {
        log::error!("Error creating scraper: {}", e);
        process::exit(1);
    });
    if let Some(base_url) = &args.base_url {
        scraper = scraper.with_base_url(base_url);
    }
    if let Some(clock_url) = &args.clock_url {
        scraper = scraper.with_clock_url(clock_url);
    }

    let window = match args.mode {
        SelectionMode::Latest => None,
        SelectionMode::Window => {
            let clock = match &args.timestamp {
                Some(ts) => AnnouncementClock::parse(ts).map_err(|e| e.to_string()),
                None => scraper.fetch_clock().await.map_err(|e| e.to_string()),
            }
            .unwrap_or_else(|e| {
                log::error!("Cannot determine the announcement day: {}", e);
                process::exit(1);
            });

            let window = Window::new(clock.target, args.window_days).unwrap_or_else(|e| {
                log::error!("{}", e);
                process::exit(1);
            });
            log::info!("Announcement window: {}", window);
            Some(window)
        }
    };

    let config = ExtractorConfig::arxiv().with_origin(scraper.base_url());
    let params = SearchParams {
        query: build_web_query(&args.query, &args.classes, args.require_physics_group),
        size: args.size,
        order: args.order.clone(),
        hide_abstracts: args.hide_abstracts,
        start: 0,
    };

    let records = if args.offline {
        let Some(sample) = &args.sample else {
            log::error!("--offline needs a sample page (--sample or SAMPLE_HTML)");
            process::exit(1);
        };
        parse_sample(sample, &config)
    } else {
        match scraper
            .fetch_records(&params, args.pages as usize, &config)
            .await
        {
            Ok(records) => Ok(records),
            Err(e) => match &args.sample {
                Some(sample) => {
                    log::warn!(
                        "Fetching the listing failed ({}); using sample {}",
                        e,
                        sample.display()
                    );
                    parse_sample(sample, &config)
                }
                None => {
                    log::error!("Error fetching listing: {}", e);
                    process::exit(1);
                }
            },
        }
    }
    .unwrap_or_else(|e| {
        log::error!("{}", e);
        process::exit(1);
    });

    let found = records.len();
    let top = args.top_send as usize;
    let selected = match &window {
        Some(window) => RecordFilter::from_window(window, Some(top)).apply(records),
        None => {
            let mut latest = latest_day(records);
            latest.truncate(top);
            latest
        }
    };

    let card = build_card(&selected, &args.header);

    match webhook_url {
        Some(url) if !args.dry_run => {
            let response = scraper.post_webhook(&url, &card).await.unwrap_or_else(|e| {
                log::error!("Error posting to webhook: {}", e);
                process::exit(1);
            });
            log::info!("Webhook response: {}", response);
        }
        _ => serialize_json(&card),
    }

    log::info!(
        "Found {} record(s) ({} mode); sent {}",
        found,
        args.mode,
        selected.len()
    );
}
