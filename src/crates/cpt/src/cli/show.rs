//! `show` command handler

use crate::db::Database;
use crate::error::{CptError, Result};
use crate::models::WorkflowInstance;
use crate::repositories::InstanceRepository;
use colored::Colorize;
use std::fmt::Display;
use std::io::Write;
use std::sync::Arc;

const SEPARATOR_WIDTH: usize = 110;

/// What to print for every id
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShowOptions {
    pub workflow_data: bool,
    pub audit_trail: bool,
    pub instance_details: bool,
    pub print_data_array: bool,
}

impl ShowOptions {
    /// Reject flag combinations before anything is queried
    pub fn validate(&self) -> Result<()> {
        if !(self.workflow_data || self.audit_trail || self.instance_details) {
            return Err(CptError::validation(
                "Use at least one of the following flags: [--workflow-data, --audit-trail, --instance-details]",
            ));
        }
        if self.print_data_array
            && (!self.workflow_data || self.audit_trail || self.instance_details)
        {
            return Err(CptError::validation(
                "Flag --print-data-array is only allowed together with --workflow-data flag",
            ));
        }
        Ok(())
    }
}

/// Print details, data and audit trail of every id
///
/// A failing query for one id is reported on stderr and the next id is shown.
pub async fn handle_show(
    db: Arc<Database>,
    options: ShowOptions,
    ids: &[String],
    out: &mut impl Write,
) -> Result<()> {
    options.validate()?;
    let repo = InstanceRepository::new(db);

    if options.print_data_array {
        writeln!(out, "[")?;
    }

    for (i, id) in ids.iter().enumerate() {
        if options.instance_details || options.workflow_data {
            match repo.find_by_id(id).await {
                Ok(Some(instance)) => {
                    if options.instance_details {
                        write_details(out, &instance)?;
                    }
                    if options.workflow_data {
                        if options.instance_details {
                            writeln!(out, "Instance data:")?;
                        }
                        writeln!(out, "{}", instance.data.as_deref().unwrap_or_default())?;
                    }
                }
                Ok(None) => {}
                Err(e) => eprintln!("{}", e.to_string().red()),
            }
        }

        if options.audit_trail {
            match repo.audit_trail(id).await {
                Ok(trail) => {
                    if !trail.is_empty() {
                        writeln!(out, "Audit Trail:")?;
                    }
                    for entry in trail.entries {
                        writeln!(out, "Occurrence: {}, message: {}", entry.occurrence, entry.message)?;
                    }
                }
                Err(e) => eprintln!("{}", e.to_string().red()),
            }
        }

        if i + 1 < ids.len() {
            if options.print_data_array {
                writeln!(out, ",")?;
            } else {
                writeln!(out, "{}", "-".repeat(SEPARATOR_WIDTH))?;
            }
        }
    }

    if options.print_data_array {
        writeln!(out, "]")?;
    }
    Ok(())
}

fn write_details(out: &mut impl Write, instance: &WorkflowInstance) -> Result<()> {
    let state = instance
        .workflow_state()
        .map_or("UNKNOWN", |state| state.as_str());

    writeln!(out, "Workflow Instance:")?;
    writeln!(
        out,
        "id:{}, state:{}, priority:{}, creation time:{}, last modification:{}",
        instance.id, state, instance.priority, instance.creation_time, instance.last_modified
    )?;
    write!(
        out,
        "pool id:{}, wait mode:{}, number of waits:{}, class name:{}",
        instance.pool_id,
        or_dash(instance.wait_mode),
        or_dash(instance.num_waits),
        instance.class_name
    )?;
    if let Some(timeout) = instance.timeout {
        write!(out, ", timeout:{}", timeout)?;
    }
    writeln!(out)?;
    Ok(())
}

fn or_dash<T: Display>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}
