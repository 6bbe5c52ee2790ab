use crate::engine::{HttpBackend, PathfinderApi};
use crate::model::{
    Algorithm, ClientConfig, ControllerPhase, SearchQuery, SessionEvent, DEFAULT_MAX_DEPTH,
};
use crate::orchestrator::{self, RestoreOutcome, SessionController, UiCommand};
use crate::storage::{FileSessionStore, SessionStore};
use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::info;

/// Output line routing for stdout/stderr writer.
enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// Spawn a blocking writer for stdout/stderr to avoid blocking async tasks.
fn spawn_output_writer() -> (
    mpsc::UnboundedSender<OutputLine>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutputLine>();
    let handle = tokio::task::spawn_blocking(move || {
        let stdout = std::io::stdout();
        let stderr = std::io::stderr();
        let mut out = std::io::LineWriter::new(stdout.lock());
        let mut err = std::io::LineWriter::new(stderr.lock());

        while let Some(line) = rx.blocking_recv() {
            match line {
                OutputLine::Stdout(msg) => {
                    let _ = writeln!(out, "{}", msg);
                }
                OutputLine::Stderr(msg) => {
                    let _ = writeln!(err, "{}", msg);
                }
            }
        }

        let _ = out.flush();
        let _ = err.flush();
    });
    (tx, handle)
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "wikipath",
    version,
    about = "Find the shortest click path between two Wikipedia pages"
)]
pub struct Cli {
    /// Base URL of the pathfinding service
    #[arg(long, default_value = "http://localhost:5000")]
    pub base_url: String,

    /// Start page title (submits immediately instead of resuming)
    #[arg(long, requires = "end")]
    pub start: Option<String>,

    /// End page title
    #[arg(long, requires = "start")]
    pub end: Option<String>,

    /// Depth limit forwarded to the service (also sizes the depth indicator)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=10))]
    pub max_depth: Option<u32>,

    /// Search algorithm to request
    #[arg(long, value_enum)]
    pub algorithm: Option<Algorithm>,

    /// Delay between status polls
    #[arg(long, default_value = "1s")]
    pub poll_interval: humantime::Duration,

    /// Per-request timeout
    #[arg(long, default_value = "30s")]
    pub request_timeout: humantime::Duration,

    /// Where the session record is kept
    #[arg(long)]
    pub session_file: Option<PathBuf>,

    /// Base URL for opening pages in the browser
    #[arg(long, default_value = "https://en.wikipedia.org/wiki/")]
    pub wiki_base_url: String,

    /// Print the result as JSON and exit (no TUI)
    #[arg(long, conflicts_with = "text")]
    pub json: bool,

    /// Print progress and the path as text and exit (no TUI)
    #[arg(long)]
    pub text: bool,

    /// Erase the saved session and exit
    #[arg(long)]
    pub clear: bool,

    /// List outgoing links of a page and exit
    #[arg(long, value_name = "TITLE")]
    pub explore: Option<String>,

    /// Number of links to list with --explore
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u32).range(1..=50))]
    pub max_links: u32,

    /// Check service health and exit
    #[arg(long)]
    pub health: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Text,
    Json,
}

pub async fn run(args: Cli) -> Result<()> {
    let cfg = build_config(&args);
    let mode = if args.json {
        OutputMode::Json
    } else {
        OutputMode::Text
    };

    if args.clear {
        return run_clear(&cfg);
    }
    if args.health {
        return run_health(&cfg, mode).await;
    }
    if let Some(title) = args.explore.as_deref() {
        return run_explore(&cfg, title, args.max_links, mode).await;
    }

    let initial = initial_query(&args)?;

    if !args.json && !args.text {
        #[cfg(feature = "tui")]
        {
            let api: Arc<dyn PathfinderApi> = Arc::new(HttpBackend::new(&cfg)?);
            let store = open_store(&cfg);
            return crate::tui::run(cfg, api, store, initial).await;
        }
        #[cfg(not(feature = "tui"))]
        {
            // Fallback when built without TUI support.
            return run_headless(cfg, initial, OutputMode::Text).await;
        }
    }

    run_headless(cfg, initial, mode).await
}

/// Build a `ClientConfig` from CLI arguments.
pub fn build_config(args: &Cli) -> ClientConfig {
    ClientConfig {
        base_url: args.base_url.clone(),
        wiki_base_url: args.wiki_base_url.clone(),
        poll_interval: Duration::from(args.poll_interval),
        request_timeout: Duration::from(args.request_timeout),
        max_depth: args.max_depth.unwrap_or(DEFAULT_MAX_DEPTH),
        search_max_depth: args.max_depth,
        algorithm: args.algorithm,
        session_path: args.session_file.clone(),
        ..ClientConfig::default()
    }
}

fn open_store(cfg: &ClientConfig) -> FileSessionStore {
    match cfg.session_path.as_ref() {
        Some(p) => FileSessionStore::new(p),
        None => FileSessionStore::open_default(),
    }
}

/// Validated `--start`/`--end`, if given.
fn initial_query(args: &Cli) -> Result<Option<(String, String)>> {
    match (args.start.as_deref(), args.end.as_deref()) {
        (Some(start), Some(end)) => {
            let q = SearchQuery::new(start, end)?;
            Ok(Some((q.start_title, q.end_title)))
        }
        _ => Ok(None),
    }
}

fn run_clear(cfg: &ClientConfig) -> Result<()> {
    let mut store = open_store(cfg);
    store.clear().context("failed to clear saved session")?;
    eprintln!("Cleared saved session ({})", store.path().display());
    Ok(())
}

async fn run_health(cfg: &ClientConfig, mode: OutputMode) -> Result<()> {
    let api = HttpBackend::new(cfg)?;
    let report = api.health().await.context("health check failed")?;
    match mode {
        OutputMode::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputMode::Text => {
            for line in crate::text_summary::build_health_summary(&report).lines {
                println!("{line}");
            }
        }
    }
    if !report.is_healthy() {
        bail!("service is {}", report.status);
    }
    Ok(())
}

async fn run_explore(cfg: &ClientConfig, title: &str, max_links: u32, mode: OutputMode) -> Result<()> {
    let title = title.trim();
    if title.is_empty() {
        bail!("--explore needs a page title");
    }
    let api = HttpBackend::new(cfg)?;
    let explore = api
        .explore(title, max_links)
        .await
        .with_context(|| format!("explore {title:?} failed"))?;
    match mode {
        OutputMode::Json => println!("{}", serde_json::to_string_pretty(&explore)?),
        OutputMode::Text => {
            for line in crate::text_summary::build_explore_summary(&explore).lines {
                println!("{line}");
            }
        }
    }
    Ok(())
}

/// Drive one session to its end without a terminal UI.
async fn run_headless(
    cfg: ClientConfig,
    initial: Option<(String, String)>,
    mode: OutputMode,
) -> Result<()> {
    let api: Arc<dyn PathfinderApi> = Arc::new(HttpBackend::new(&cfg)?);
    let store = open_store(&cfg);
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<SessionEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();
    let (mut controller, inbox) = SessionController::new(api, store, cfg, event_tx);

    match initial {
        Some((start, end)) => {
            let _ = cmd_tx.send(UiCommand::Submit { start, end });
        }
        None => match controller.restore() {
            RestoreOutcome::Fresh => bail!("nothing to resume; pass --start and --end"),
            RestoreOutcome::Resumed(task_id) => info!(%task_id, "resuming headless session"),
            RestoreOutcome::Rendered => {}
        },
    }

    // Ctrl-C stops polling but keeps the task persisted for the next launch.
    let interrupt_tx = cmd_tx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = interrupt_tx.send(UiCommand::Quit);
        }
    });

    let (out_tx, out_handle) = spawn_output_writer();
    let consumer_out = out_tx.clone();
    let consume = async move {
        let text = mode == OutputMode::Text;
        while let Some(ev) = event_rx.recv().await {
            match ev {
                SessionEvent::TaskAccepted { task_id, resumed } if text => {
                    let verb = if resumed { "Resumed" } else { "Accepted" };
                    let _ = consumer_out.send(OutputLine::Stderr(format!("{verb} search {task_id}")));
                }
                SessionEvent::Progress(p) if text => {
                    let _ = consumer_out.send(OutputLine::Stderr(crate::progress::summary_line(&p)));
                }
                SessionEvent::Info(msg) => {
                    let _ = consumer_out.send(OutputLine::Stderr(msg));
                }
                SessionEvent::Completed { .. } | SessionEvent::Failed { .. } => {
                    let _ = cmd_tx.send(UiCommand::Quit);
                }
                _ => {}
            }
        }
    };

    let (res, ()) = futures::future::join(
        orchestrator::run_controller(controller, inbox, cmd_rx, false),
        consume,
    )
    .await;

    let printed = match res {
        Ok(controller) => report_outcome(&controller, mode, &out_tx),
        Err(e) => Err(e),
    };

    drop(out_tx);
    let _ = out_handle.await;
    printed
}

/// Print the final state of a headless session.
fn report_outcome<S: SessionStore>(
    controller: &SessionController<S>,
    mode: OutputMode,
    out_tx: &mpsc::UnboundedSender<OutputLine>,
) -> Result<()> {
    match controller.phase() {
        ControllerPhase::Completed => {
            let (Some(query), Some(result)) = (controller.query(), controller.result()) else {
                bail!("session completed without a result");
            };
            match mode {
                OutputMode::Json => {
                    let _ = out_tx.send(OutputLine::Stdout(serde_json::to_string_pretty(result)?));
                }
                OutputMode::Text => {
                    for line in crate::text_summary::build_text_summary(query, result).lines {
                        let _ = out_tx.send(OutputLine::Stdout(line));
                    }
                }
            }
            Ok(())
        }
        ControllerPhase::Failed => match controller.last_error() {
            Some(err) => Err(anyhow!(err.clone())),
            None => Err(anyhow!("search failed")),
        },
        _ => match controller.handle() {
            Some(handle) => Err(anyhow!(
                "interrupted; search {} resumes on the next run without --start",
                handle.task_id
            )),
            None => Err(anyhow!("interrupted before the search was accepted")),
        },
    }
}
