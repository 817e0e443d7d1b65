//! `data` command handler

use crate::db::Database;
use crate::error::Result;
use crate::models::StateSelector;
use crate::repositories::InstanceRepository;
use std::io::Write;
use std::sync::Arc;

/// Print ids of instances in `state` whose JSON data matches `selector`
pub async fn handle_data(
    db: Arc<Database>,
    selector: &str,
    state: StateSelector,
    out: &mut impl Write,
) -> Result<()> {
    let repo = InstanceRepository::new(db);

    for id in repo.find_by_json(selector, state).await? {
        writeln!(out, "{}", id)?;
    }
    Ok(())
}
