//! `count` command handler

use crate::db::Database;
use crate::error::Result;
use crate::models::StateSelector;
use crate::repositories::InstanceRepository;
use std::io::Write;
use std::sync::Arc;

/// Print the number of instances in `state`
pub async fn handle_count(db: Arc<Database>, state: StateSelector, out: &mut impl Write) -> Result<()> {
    let repo = InstanceRepository::new(db);
    let count = repo.count(state).await?;

    writeln!(out, "{}", count)?;
    Ok(())
}
