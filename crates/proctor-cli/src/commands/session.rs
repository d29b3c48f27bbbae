//! The `proctor session` command.
//!
//! Runs a timed attempt against a document file. The file is polled and
//! autosaved while the clock runs; commands arrive one per line on stdin.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use proctor_core::report::AttemptRecord;
use proctor_core::session::{format_clock, SessionController, Transition, VIOLATION_LIMIT};
use proctor_core::traits::SessionObserver;
use proctor_session::{watch_document, DriverError, SessionDriver, SessionHandle};
use proctor_store::{load_config_from, FileStore};

use super::{load_registry, outcome_table, save_outputs};

const HELP: &str = "commands: status, away, submit, quit";

/// Prints session events to stderr.
struct ConsoleObserver;

impl SessionObserver for ConsoleObserver {
    fn on_started(&self, budget_seconds: u64) {
        eprintln!(
            "Session started: {} on the clock ({HELP})",
            format_clock(budget_seconds)
        );
    }

    fn on_tick(&self, remaining_seconds: u64) {
        if remaining_seconds > 0 && (remaining_seconds % 60 == 0 || remaining_seconds == 10) {
            eprintln!("  {} remaining", format_clock(remaining_seconds));
        }
    }

    fn on_violation_warning(&self, count: u32) {
        eprintln!(
            "  WARNING: left the test ({count}/{VIOLATION_LIMIT}); \
             the attempt is submitted automatically at {VIOLATION_LIMIT}"
        );
    }

    fn on_terminated(&self, record: &AttemptRecord) {
        eprintln!("Session ended: {}", record.reason);
    }
}

pub async fn execute(
    document: PathBuf,
    category: Option<String>,
    minutes: Option<u64>,
    rubrics: Option<PathBuf>,
    format: String,
    output: Option<PathBuf>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let registry = Arc::new(load_registry(
        rubrics.as_deref().or(config.rubric_dir.as_deref()),
    )?);
    let category = category.unwrap_or_else(|| config.default_category.clone());
    let rubric = registry.lookup(&category).ok();
    if rubric.is_none() {
        warn!("no rubric for category '{category}'; the attempt will be ungraded");
    }
    let minutes = minutes
        .or_else(|| rubric.as_ref().map(|r| r.category().duration_minutes))
        .unwrap_or(config.default_budget_minutes);

    let store = Arc::new(FileStore::new(config.store_path.clone()));
    let controller = SessionController::new(category, registry, store)
        .with_observer(Arc::new(ConsoleObserver));

    seed_document(&controller, &document).await?;

    let running = SessionDriver::spawn(controller, minutes)?;
    let handle = running.handle();
    let watcher = tokio::spawn(watch_document(document.clone(), handle.clone()));

    drive(&handle, &document).await;

    let record = running.finished().await?;
    if let Err(e) = watcher.await {
        debug!("document watcher ended abnormally: {e}");
    }

    let Some(record) = record else {
        eprintln!(
            "Session stopped; the autosave in {} is kept for next time.",
            config.store_path.display()
        );
        return Ok(());
    };

    println!("{}", outcome_table(&record, rubric.as_deref()));
    println!("{}", record.summary_line());

    let output = output.unwrap_or(config.output_dir);
    save_outputs(&record, rubric.as_deref(), &document, &output, &format)?;

    Ok(())
}

/// Put a restored autosave back into an empty or missing document file.
async fn seed_document(controller: &SessionController, document: &Path) -> Result<()> {
    let Some(saved) = controller.restore() else {
        return Ok(());
    };
    let existing = tokio::fs::read_to_string(document).await.unwrap_or_default();
    if existing.trim().is_empty() && !saved.document_text.is_empty() {
        tokio::fs::write(document, &saved.document_text).await?;
        eprintln!("Restored autosave into {}", document.display());
    }
    Ok(())
}

/// Feed stdin commands to the session until it stops.
async fn drive(handle: &SessionHandle, document: &Path) {
    let cancel = handle.cancellation_token();
    let mut lines = stdin_lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    warn!("failed to listen for ctrl-c: {e}");
                }
                handle.shutdown();
            }
            line = lines.recv(), if stdin_open => {
                let Some(line) = line else {
                    debug!("stdin closed; waiting for the countdown");
                    stdin_open = false;
                    continue;
                };
                if let Err(DriverError::Closed) = run_command(handle, document, line.trim()).await {
                    break;
                }
            }
        }
    }
}

async fn run_command(
    handle: &SessionHandle,
    document: &Path,
    command: &str,
) -> Result<(), DriverError> {
    match command {
        "" | "status" => {
            let status = handle.status().await?;
            eprintln!("  {status}");
        }
        "away" => match handle.violation().await {
            Ok(Transition::ViolationWarning { .. } | Transition::Terminated(_)) => {}
            Ok(other) => debug!(?other, "unexpected violation transition"),
            Err(DriverError::Closed) => return Err(DriverError::Closed),
            Err(e) => eprintln!("  {e}"),
        },
        "submit" => {
            let text = read_or_empty(document).await;
            match handle.submit(text).await {
                Ok(_) => {}
                Err(DriverError::Closed) => return Err(DriverError::Closed),
                Err(e) => eprintln!("  {e}"),
            }
        }
        "quit" => {
            // Save the latest edit so a later session resumes from it.
            let text = read_or_empty(document).await;
            handle.autosave(text, None).await?;
            handle.shutdown();
        }
        other => eprintln!("  unknown command '{other}' ({HELP})"),
    }
    Ok(())
}

async fn read_or_empty(document: &Path) -> String {
    match tokio::fs::read_to_string(document).await {
        Ok(text) => text,
        Err(e) => {
            warn!("failed to read {}: {e}; using an empty document", document.display());
            String::new()
        }
    }
}

/// Lines from stdin, read on a plain thread.
///
/// A blocking stdin read cannot be cancelled, and on a runtime blocking
/// thread it would hold up shutdown until the next newline.
fn stdin_lines() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(16);
    std::thread::spawn(move || {
        for line in std::io::stdin().lines() {
            let Ok(line) = line else { break };
            if tx.blocking_send(line).is_err() {
                break;
            }
        }
    });
    rx
}
