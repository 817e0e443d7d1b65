use clap::{Parser, Subcommand};
use cpt::cli::{self, ShowOptions};
use cpt::{Age, BrokenFilter, CleanupTargets, CptError, Database, StateSelector};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

#[derive(Parser)]
#[command(name = "cpt")]
#[command(about = "cpt - inspect and maintain persisted Copper workflow instances", long_about = None)]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Additional config file, read after ~/.cpt/cpt.toml
    #[arg(long, global = true, env = "CPT_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the number of workflow instances in a state
    Count {
        /// Workflow instance state, or ALL
        #[arg(long, default_value = "ERROR")]
        state: String,
    },

    /// Print ids of broken workflow instances
    Broken {
        /// Filter on the exception message, e.g. NullPointerException
        #[arg(long)]
        exception_pattern: Option<String>,

        /// Error time interval start, e.g. "2020-04-25 11:40:40.78"
        #[arg(long)]
        error_time_start: Option<String>,

        /// Error time interval end, e.g. "2020-04-26 11:40:40.78"
        #[arg(long)]
        error_time_end: Option<String>,

        /// Fully qualified workflow class, e.g. org.foo.wf.MyWorkflow
        #[arg(long)]
        workflow_class: Option<String>,

        /// Print the number of matching instances instead of their ids
        #[arg(long)]
        print_count: bool,
    },

    /// Show details, data or audit trail of workflow instances
    Show {
        /// Show instance data (JSON data only)
        #[arg(long)]
        workflow_data: bool,

        /// Show decoded audit trail messages
        #[arg(long)]
        audit_trail: bool,

        /// Show instance details
        #[arg(long)]
        instance_details: bool,

        /// Print instance data as a JSON array, only with --workflow-data
        #[arg(long)]
        print_data_array: bool,

        /// Workflow instance ids, more are read from piped stdin
        ids: Vec<String>,
    },

    /// Delete workflow instances and their dependent rows
    Delete {
        /// Workflow instance ids, more are read from piped stdin
        ids: Vec<String>,
    },

    /// Re-enqueue finished or broken workflow instances
    Restart {
        /// Workflow instance ids, more are read from piped stdin
        ids: Vec<String>,
    },

    /// Print ids of instances whose JSON data matches a selector
    Data {
        /// Predicate over the `json` column, e.g. "json->>'customer' = 'acme'"
        #[arg(long)]
        json_selector: Option<String>,

        /// Workflow instance state, or ALL
        #[arg(long, default_value = "ERROR")]
        state: String,
    },

    /// Delete data older than a given age
    Cleanup {
        /// Age in days (35d), hours (24h) or a timestamp ("2020-04-25 11:40:40.78")
        #[arg(long)]
        age: Option<String>,

        /// Purge audit trail events
        #[arg(long)]
        audit_trail: bool,

        /// Purge workflow instances and their dependent rows
        #[arg(long)]
        workflow_instance: bool,
    },
}

/// A command whose input has been validated
enum Validated {
    Count(StateSelector),
    Broken(BrokenFilter, bool),
    Show(ShowOptions, Vec<String>),
    Delete(Vec<String>),
    Restart(Vec<String>),
    Data(String, StateSelector),
    Cleanup(Age, CleanupTargets),
}

fn validate(command: Commands) -> cpt::Result<Validated> {
    let validated = match command {
        Commands::Count { state } => Validated::Count(state.parse()?),
        Commands::Broken {
            exception_pattern,
            error_time_start,
            error_time_end,
            workflow_class,
            print_count,
        } => {
            let filter = BrokenFilter {
                exception_pattern,
                error_time_start,
                error_time_end,
                workflow_class,
            };
            filter.compose()?;
            Validated::Broken(filter, print_count)
        }
        Commands::Show {
            workflow_data,
            audit_trail,
            instance_details,
            print_data_array,
            ids,
        } => {
            let options = ShowOptions {
                workflow_data,
                audit_trail,
                instance_details,
                print_data_array,
            };
            options.validate()?;
            Validated::Show(options, cpt::pipeline::read_piped_ids(ids)?)
        }
        Commands::Delete { ids } => Validated::Delete(cpt::pipeline::read_piped_ids(ids)?),
        Commands::Restart { ids } => Validated::Restart(cpt::pipeline::read_piped_ids(ids)?),
        Commands::Data {
            json_selector,
            state,
        } => {
            let selector = json_selector.unwrap_or_default();
            cpt::filter::json_selector_clause(&selector)?;
            Validated::Data(selector, state.parse()?)
        }
        Commands::Cleanup {
            age,
            audit_trail,
            workflow_instance,
        } => {
            let age = age.ok_or_else(|| CptError::validation("Flag --age is mandatory"))?;
            let targets = CleanupTargets {
                workflow_instances: workflow_instance,
                audit_trail,
            };
            cli::maintenance::validate_targets(targets)?;
            Validated::Cleanup(Age::parse(&age)?, targets)
        }
    };
    Ok(validated)
}

async fn run(db: Arc<Database>, command: Validated) -> cpt::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match command {
        Validated::Count(state) => cli::handle_count(db, state, &mut out).await?,
        Validated::Broken(filter, print_count) => {
            cli::handle_broken(db, &filter, print_count, &mut out).await?
        }
        Validated::Show(options, ids) => cli::handle_show(db, options, &ids, &mut out).await?,
        Validated::Delete(ids) => {
            let batch = cli::handle_delete(db, &ids).await?;
            debug!(succeeded = batch.succeeded(), failed = batch.failed(), "delete done");
        }
        Validated::Restart(ids) => {
            let batch = cli::handle_restart(db, &ids).await?;
            debug!(succeeded = batch.succeeded(), failed = batch.failed(), "restart done");
        }
        Validated::Data(selector, state) => {
            cli::handle_data(db, &selector, state, &mut out).await?
        }
        Validated::Cleanup(age, targets) => {
            cli::handle_cleanup(db, &age, targets, &mut out).await?
        }
    }

    out.flush()?;
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = cpt::load_config(cli.config).await?;
    cpt::logging::init_tracing(&config.logging)?;

    // Reject bad input before a connection is opened
    let command = validate(cli.command)?;

    let db = Arc::new(Database::connect(&config.database).await?);
    let result = run(db.clone(), command).await;
    db.close().await;

    result?;
    Ok(())
}
