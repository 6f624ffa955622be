use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use tokio::signal;
use tokio::signal::unix::SignalKind;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use url::Url;

use cleaner_api::Client;
use cleaner_api::status::{CleanReply, CleanerMode, StatusSnapshot};
use hue::error::HueError;
use hue_cleaner::config::{self, AppConfig};
use hue_cleaner::error::{ApiError, ApiResult};
use hue_cleaner::hass::HassWatcher;
use hue_cleaner::hub::HubClient;
use hue_cleaner::server::appstate::AppState;
use hue_cleaner::server::build_service;
use hue_cleaner::server::http::HttpServer;
use hue_cleaner::trigger::run_periodic;

const DEVICE_APP: &str = "hue_cleaner";
const PAIR_ATTEMPTS: u32 = 30;
const PAIR_RETRY: Duration = Duration::from_secs(2);

/// Removes stale entertainment areas from Philips Hue hubs
#[derive(Parser, Debug)]
#[command(name = "hue-cleaner", version, about)]
struct Args {
    /// Configuration file
    #[arg(short, long, global = true, default_value = "config.yaml")]
    config: Utf8PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the cleaner daemon (default)
    Run,
    /// Obtain an application key from a hub (press the link button first)
    Pair {
        #[arg(long)]
        host: String,
    },
    /// Verify that a hub accepts an application key
    Check {
        #[arg(long)]
        host: String,
        #[arg(long, env = "HUE_APPLICATION_KEY")]
        key: String,
    },
    /// Show the status of a running daemon
    Status {
        #[arg(long, default_value = "http://127.0.0.1:8470")]
        url: Url,
    },
    /// Ask a running daemon to clean now
    Clean {
        /// Also delete areas that are currently streaming
        #[arg(long)]
        all: bool,
        /// Only clean this hub
        #[arg(long)]
        hub: Option<String>,
        #[arg(long, default_value = "http://127.0.0.1:8470")]
        url: Url,
    },
}

/*
 * Formatter function to output in syslog format. This makes sense when running
 * as a service (where output might go to a log file, or the system journal)
 */
#[allow(clippy::match_same_arms)]
fn syslog_format(
    buf: &mut pretty_env_logger::env_logger::fmt::Formatter,
    record: &log::Record,
) -> std::io::Result<()> {
    writeln!(
        buf,
        "<{}>{}: {}",
        match record.level() {
            log::Level::Error => 3,
            log::Level::Warn => 4,
            log::Level::Info => 6,
            log::Level::Debug => 7,
            log::Level::Trace => 7,
        },
        record.target(),
        record.args()
    )
}

fn init_logging() -> ApiResult<()> {
    /* Try to provide reasonable default filters, when RUST_LOG is not specified */
    const DEFAULT_LOG_FILTERS: &[&str] = &[
        "info",
        "hue_cleaner=debug",
        "tokio_tungstenite=info",
        "tungstenite=info",
        "hyper_util=info",
        "reqwest=info",
    ];

    let log_filters = std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LOG_FILTERS.join(","));

    /* Detect if we need syslog or human-readable formatting */
    if std::env::var("SYSTEMD_EXEC_PID").is_ok_and(|pid| pid == std::process::id().to_string()) {
        Ok(pretty_env_logger::env_logger::builder()
            .format(syslog_format)
            .parse_filters(&log_filters)
            .try_init()?)
    } else {
        Ok(pretty_env_logger::formatted_timed_builder()
            .parse_filters(&log_filters)
            .try_init()?)
    }
}

fn install_signal_handlers(token: &CancellationToken) -> ApiResult<()> {
    fn shutdown(msg: &str, token: &CancellationToken) {
        log::warn!("{msg}");
        let _ = std::io::stderr().flush();
        token.cancel();
    }

    let tok = token.clone();
    tokio::spawn(async move {
        if matches!(signal::ctrl_c().await, Ok(())) {
            shutdown("Ctrl-C pressed, exiting..", &tok);
        }
    });

    let tok = token.clone();
    let mut signal = signal::unix::signal(SignalKind::terminate())?;
    tokio::spawn(async move {
        if matches!(signal.recv().await, Some(())) {
            shutdown("SIGTERM received, exiting..", &tok);
        }
    });

    Ok(())
}

/// Event-driven mode needs Home Assistant, and at least one companion
/// sensor to listen to. Anything else falls back to polling.
async fn event_watcher(config: &AppConfig) -> Option<HassWatcher> {
    let server = config.hass.as_ref()?;

    let watcher = match HassWatcher::from_config(server) {
        Ok(watcher) => watcher,
        Err(err) => {
            log::warn!("Home Assistant configured, but unusable: {err}");
            return None;
        }
    };

    match watcher.discover_companions().await {
        Ok(ids) if ids.is_empty() => {
            log::info!(
                "No companion sensors matching {:?} found in Home Assistant",
                watcher.pattern()
            );
            None
        }
        Ok(ids) => {
            for id in &ids {
                log::info!("Found companion sensor {id}");
            }
            Some(watcher)
        }
        Err(err) => {
            log::warn!("Failed to list Home Assistant entities: {err}");
            None
        }
    }
}

async fn run_daemon(config: AppConfig) -> ApiResult<()> {
    if !config.has_hubs() {
        log::warn!("{}", "-".repeat(80));
        log::warn!("No hubs configured in config!");
        log::warn!("hue-cleaner will run, but has nothing to clean.");
        log::warn!("");
        log::warn!(" ** Please configure at least one hub to use hue-cleaner **");
        log::warn!("{}", "-".repeat(80));
    }

    let token = CancellationToken::new();
    install_signal_handlers(&token)?;

    let watcher = event_watcher(&config).await;
    let mode = if watcher.is_some() {
        CleanerMode::EventDriven
    } else {
        CleanerMode::Polling
    };
    log::info!("Running in {mode} mode");

    let listen = config.cleaner.listen;
    let appstate = AppState::from_config(config, mode)?;
    let coords: Vec<_> = appstate.coordinators().cloned().collect();

    let mut tasks: JoinSet<ApiResult<()>> = JoinSet::new();

    let server = HttpServer::new(listen, build_service(appstate.clone()))
        .bind()
        .await?;
    tasks.spawn(server.run(token.clone()));

    for coord in &coords {
        let coord = Arc::clone(coord);
        tasks.spawn(async move {
            coord.refresh().await;
            Ok(())
        });
    }

    if let Some(mut watcher) = watcher {
        let pattern = watcher.pattern().clone();
        watcher
            .dispatcher_mut()
            .subscribe_activations(&pattern, &coords);
        let tok = token.clone();
        tasks.spawn(async move {
            watcher.run(tok).await;
            Ok(())
        });
    } else {
        for coord in coords {
            let period = coord.scan_interval();
            let tok = token.clone();
            tasks.spawn(async move {
                run_periodic(coord, period, tok).await;
                Ok(())
            });
        }
    }

    while let Some(res) = tasks.join_next().await {
        match res {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                log::error!("Task failed: {err}");
                token.cancel();
            }
            Err(err) => {
                log::error!("Task panicked: {err}");
                token.cancel();
            }
        }
    }

    Ok(())
}

async fn pair(host: &str) -> ApiResult<()> {
    let client = HubClient::new(host)?;
    let platform = std::env::consts::OS;

    for attempt in 1..=PAIR_ATTEMPTS {
        match client.register(DEVICE_APP, platform).await {
            Ok(reply) => {
                log::info!("Paired with hub {}", client.host());
                println!("{}", reply.username);
                return Ok(());
            }
            Err(ApiError::HueError(HueError::LinkButtonNotPressed)) => {
                if attempt == 1 {
                    log::warn!("Press the link button on the hub at {host} to continue..");
                }
                tokio::time::sleep(PAIR_RETRY).await;
            }
            Err(err) => return Err(err),
        }
    }

    Err(ApiError::HueError(HueError::LinkButtonNotPressed))
}

async fn check(host: &str, key: &str) -> ApiResult<()> {
    let client = HubClient::new(host)?.with_api_key(key);
    let count = client.check_credential().await?;
    println!("Application key accepted by {host} ({count} entertainment areas)");
    Ok(())
}

fn print_snapshot(snap: &StatusSnapshot) {
    println!(
        "{:<16} {:<20} {:<7} {:<13} cleaned {:>5} (last run {}), last clean {}",
        snap.name,
        snap.host,
        snap.status.to_string(),
        snap.mode.to_string(),
        snap.cleaned_count,
        snap.areas_cleaned_this_run,
        snap.last_clean
            .map_or_else(|| "never".to_string(), |ts| ts.to_rfc3339()),
    );
    if let Some(err) = &snap.last_error {
        println!(
            "{:<16} {} consecutive failures: {err}",
            "", snap.consecutive_failures
        );
    }
}

fn print_reply(reply: &CleanReply) {
    match (&reply.cleaned, &reply.error) {
        (_, Some(err)) => println!("{}: failed: {err}", reply.name),
        (Some(n), None) => println!("{}: cleaned {n} entertainment areas", reply.name),
        (None, None) => println!("{}: no result", reply.name),
    }
}

async fn status(url: &Url) -> ApiResult<()> {
    let client = Client::new(url)?;
    for snap in client.status().await? {
        print_snapshot(&snap);
    }

    let issues = client.issues().await?;
    for issue in &issues.issues {
        println!("repair needed: {} on {}: {}", issue.kind, issue.host, issue.message);
    }
    Ok(())
}

async fn clean(url: &Url, hub: Option<&str>, all: bool) -> ApiResult<()> {
    let client = Client::new(url)?;
    let replies = match hub {
        Some(name) => vec![client.clean_hub(name, all).await?],
        None if all => client.clean_all().await?,
        None => client.clean_now().await?,
    };
    for reply in &replies {
        print_reply(reply);
    }
    Ok(())
}

async fn run() -> ApiResult<()> {
    let args = Args::parse();

    init_logging()?;

    match args.command.unwrap_or(Command::Run) {
        Command::Run => {
            let config = config::parse(&args.config)?;
            log::debug!("Configuration loaded successfully");
            run_daemon(config).await
        }
        Command::Pair { host } => pair(&host).await,
        Command::Check { host, key } => check(&host, &key).await,
        Command::Status { url } => status(&url).await,
        Command::Clean { all, hub, url } => clean(&url, hub.as_deref(), all).await,
    }
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        log::error!("hue-cleaner error: {}", err.chain_message());
        log::error!("Fatal error encountered, cannot continue.");
        std::process::exit(1);
    }
}
