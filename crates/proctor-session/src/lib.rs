//! proctor-session — Async driver for timed, proctored attempts.
//!
//! Runs a [`SessionController`] on a tokio task: a one-second interval
//! drives the countdown, and a command channel carries autosaves,
//! integrity violations, submissions and status queries. The timer is
//! cancelled exactly once, when the attempt terminates or the driver is
//! shut down.

pub mod error;
pub mod watcher;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use proctor_core::error::SessionError;
use proctor_core::report::AttemptRecord;
use proctor_core::session::{SessionController, SessionStatus, Transition, TICK_INTERVAL};

pub use error::DriverError;
pub use watcher::watch_document;

/// Capacity of the command channel.
const COMMAND_BUFFER: usize = 64;

type Reply = oneshot::Sender<Result<Transition, SessionError>>;

/// A request sent to a running session.
#[derive(Debug)]
pub enum SessionCommand {
    /// Overwrite the autosave slot. `None` tags the save with the active category.
    Autosave {
        document: String,
        category: Option<String>,
        reply: Reply,
    },
    /// The learner left the page.
    Violation { reply: Reply },
    /// Hand in the document and end the attempt.
    Submit { document: String, reply: Reply },
    Status {
        reply: oneshot::Sender<SessionStatus>,
    },
}

/// Cloneable handle for talking to a running session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<SessionCommand>,
    cancel: CancellationToken,
}

impl SessionHandle {
    pub async fn autosave(
        &self,
        document: impl Into<String>,
        category: Option<String>,
    ) -> Result<Transition, DriverError> {
        let document = document.into();
        self.request(|reply| SessionCommand::Autosave {
            document,
            category,
            reply,
        })
        .await
    }

    pub async fn violation(&self) -> Result<Transition, DriverError> {
        self.request(|reply| SessionCommand::Violation { reply }).await
    }

    pub async fn submit(&self, document: impl Into<String>) -> Result<Transition, DriverError> {
        let document = document.into();
        self.request(|reply| SessionCommand::Submit { document, reply })
            .await
    }

    pub async fn status(&self) -> Result<SessionStatus, DriverError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(SessionCommand::Status { reply: tx })
            .await
            .map_err(|_| DriverError::Closed)?;
        rx.await.map_err(|_| DriverError::Closed)
    }

    /// Stop the driver without terminating the attempt.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Whether the driver has stopped, for any reason.
    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled() || self.commands.is_closed()
    }

    /// Token cancelled when the driver stops.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    async fn request(
        &self,
        command: impl FnOnce(Reply) -> SessionCommand,
    ) -> Result<Transition, DriverError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(command(tx))
            .await
            .map_err(|_| DriverError::Closed)?;
        let result = rx.await.map_err(|_| DriverError::Closed)?;
        Ok(result?)
    }
}

/// A session running on a background task.
#[derive(Debug)]
pub struct RunningSession {
    handle: SessionHandle,
    task: JoinHandle<Option<AttemptRecord>>,
}

impl RunningSession {
    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    /// Wait for the driver to stop.
    ///
    /// Resolves to the terminal record, or `None` if the driver was shut
    /// down while the attempt was still running.
    pub async fn finished(self) -> Result<Option<AttemptRecord>, DriverError> {
        self.task.await.map_err(|e| DriverError::Task(e.to_string()))
    }
}

/// Runs a session controller against the wall clock.
pub struct SessionDriver;

impl SessionDriver {
    /// Start the attempt with `budget_minutes` and spawn its driver task.
    ///
    /// The controller must be idle. Start-up errors (a bad budget, a
    /// controller that already ran) are returned before anything is spawned.
    pub fn spawn(
        mut controller: SessionController,
        budget_minutes: u64,
    ) -> Result<RunningSession, SessionError> {
        controller.start(budget_minutes)?;

        // The countdown starts now, not when the task is first polled.
        let mut interval = interval_at(Instant::now() + TICK_INTERVAL, TICK_INTERVAL);
        // A stalled runtime must not stretch the budget: missed seconds are
        // delivered back to back.
        interval.set_missed_tick_behavior(MissedTickBehavior::Burst);

        let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
        let cancel = CancellationToken::new();
        let handle = SessionHandle {
            commands: tx,
            cancel: cancel.clone(),
        };
        let task = tokio::spawn(run(controller, interval, rx, cancel));

        Ok(RunningSession { handle, task })
    }
}

async fn run(
    mut controller: SessionController,
    mut interval: Interval,
    mut commands: mpsc::Receiver<SessionCommand>,
    cancel: CancellationToken,
) -> Option<AttemptRecord> {
    let mut commands_open = true;

    let record = loop {
        tokio::select! {
            biased;

            () = cancel.cancelled() => {
                debug!("session driver cancelled");
                break None;
            }
            _ = interval.tick() => {
                match controller.tick() {
                    Ok(Transition::Terminated(record)) => break Some(*record),
                    Ok(_) => {}
                    Err(e) => {
                        warn!("tick rejected: {e}");
                        break controller.record().cloned();
                    }
                }
            }
            command = commands.recv(), if commands_open => {
                let Some(command) = command else {
                    debug!("all session handles dropped; countdown continues");
                    commands_open = false;
                    continue;
                };
                if let Some(record) = dispatch(&mut controller, command) {
                    break Some(record);
                }
            }
        }
    };

    cancel.cancel();
    record
}

/// Apply one command. Returns the terminal record if the attempt ended.
fn dispatch(controller: &mut SessionController, command: SessionCommand) -> Option<AttemptRecord> {
    let (result, reply) = match command {
        SessionCommand::Autosave {
            document,
            category,
            reply,
        } => {
            let tag = category.unwrap_or_else(|| controller.state().category().to_string());
            (controller.autosave(document, tag), reply)
        }
        SessionCommand::Violation { reply } => (controller.record_violation(), reply),
        SessionCommand::Submit { document, reply } => (controller.submit(document), reply),
        SessionCommand::Status { reply } => {
            let _ = reply.send(controller.state().status());
            return None;
        }
    };

    let terminal = match &result {
        Ok(Transition::Terminated(record)) => Some(record.as_ref().clone()),
        _ => None,
    };
    // The requester may have given up waiting; the transition stands.
    let _ = reply.send(result);
    terminal
}
