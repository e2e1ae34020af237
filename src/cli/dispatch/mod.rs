//! Maps validated CLI arguments to the action the binary runs.

use crate::cli::actions::{Action, server::Args};
use crate::cli::commands::{self, graph};
use anyhow::{Context, Result};

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches
        .get_one::<u16>(commands::ARG_PORT)
        .copied()
        .unwrap_or(8080);
    let dsn = matches
        .get_one::<String>(commands::ARG_DSN)
        .cloned()
        .context("missing required argument: --dsn")?;
    let db_max_connections = matches
        .get_one::<u32>(commands::ARG_DB_MAX_CONNECTIONS)
        .copied()
        .unwrap_or(5);
    let frontend_base_url = matches
        .get_one::<String>(commands::ARG_FRONTEND_BASE_URL)
        .cloned()
        .context("missing required argument: --frontend-base-url")?;

    let graph = graph::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        dsn,
        db_max_connections,
        frontend_base_url,
        graph,
    }))
}
