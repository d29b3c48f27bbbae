//! Timed session example: driving an attempt programmatically.
//!
//! Starts a one-minute attempt against the built-in `html` category,
//! autosaves a draft, records one integrity violation and submits.
//!
//! ```bash
//! cargo run -p proctor-cli --example timed_session
//! ```

use std::sync::Arc;

use proctor_core::rubric::RubricRegistry;
use proctor_core::session::{SessionController, Transition};
use proctor_session::SessionDriver;
use proctor_store::MemoryStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let registry = Arc::new(RubricRegistry::builtin()?);
    let store = Arc::new(MemoryStore::new());
    let controller = SessionController::new("html", registry, store.clone());

    let session = SessionDriver::spawn(controller, 1)?;
    let handle = session.handle();

    handle
        .autosave("<!DOCTYPE html><html lang=\"en\"><h1>Draft</h1>", None)
        .await?;
    println!("autosaves so far: {}", store.save_count());

    if let Transition::ViolationWarning { count } = handle.violation().await? {
        println!("violation warning #{count}");
    }

    let status = handle.status().await?;
    println!("{status}");

    handle
        .submit(
            "<!DOCTYPE html><html lang=\"en\"><head><title>Done</title></head>\
             <body><h1>Done</h1><ul><li>a</li><li>b</li><li>c</li></ul></body></html>",
        )
        .await?;

    if let Some(record) = session.finished().await? {
        println!("{}", record.summary_line());
        for outcome in record.grade.result().into_iter().flat_map(|r| r.failed_rules()) {
            println!("  missing: {}", outcome.key);
        }
    }

    Ok(())
}
