//! `broken` command handler

use crate::db::Database;
use crate::error::{CptError, Result};
use crate::filter::BrokenFilter;
use crate::repositories::InstanceRepository;
use colored::Colorize;
use std::io::Write;
use std::sync::Arc;

/// Print the ids of instances with a matching error row, or their number
///
/// A failing count query is reported without failing the command; a
/// failing id search is an error.
pub async fn handle_broken(
    db: Arc<Database>,
    filter: &BrokenFilter,
    print_count: bool,
    out: &mut impl Write,
) -> Result<()> {
    let repo = InstanceRepository::new(db);

    if print_count {
        match repo.count_broken(filter).await {
            Ok(count) => writeln!(out, "{}", count)?,
            Err(CptError::Database(msg)) => eprintln!("{}", msg.red()),
            Err(e) => return Err(e),
        }
        return Ok(());
    }

    for id in repo.find_broken(filter).await? {
        writeln!(out, "{}", id)?;
    }
    Ok(())
}
