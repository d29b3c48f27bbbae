//! The `proctor restore` command.

use std::path::PathBuf;

use anyhow::Result;

use proctor_core::session::SESSION_KEY;
use proctor_core::traits::AttemptStore;
use proctor_store::{load_config_from, FileStore};

pub fn execute(
    category: Option<String>,
    discard: bool,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let category = category.unwrap_or_else(|| config.default_category.clone());
    let store = FileStore::new(config.store_path.clone());

    let saved = store
        .load(SESSION_KEY)?
        .filter(|saved| saved.matches(&category));

    let Some(saved) = saved else {
        eprintln!("No autosave for category '{category}'.");
        return Ok(());
    };

    if discard {
        store.clear(SESSION_KEY)?;
        eprintln!("Discarded autosave for category '{category}'.");
    } else {
        print!("{}", saved.document_text);
    }

    Ok(())
}
