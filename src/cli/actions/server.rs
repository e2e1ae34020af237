use crate::{
    api::{self, ServerConfig, handlers::DocumentsState},
    graph::{GraphClient, GraphConfig},
};
use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub db_max_connections: u32,
    pub frontend_base_url: String,
    pub graph: Option<GraphConfig>,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the Graph client cannot be built or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    debug!(
        port = args.port,
        db_max_connections = args.db_max_connections,
        "Starting server"
    );

    let documents = match args.graph {
        Some(config) => {
            info!(
                drive_id = %config.drive_id,
                root_folder = %config.root_folder,
                "Document storage enabled"
            );
            let root_folder = config.root_folder.clone();
            DocumentsState::enabled(Arc::new(GraphClient::new(config)?), root_folder)
        }
        None => {
            info!("Document storage disabled: Graph credentials not configured");
            DocumentsState::disabled()
        }
    };

    let config = ServerConfig {
        port: args.port,
        dsn: args.dsn,
        db_max_connections: args.db_max_connections,
        frontend_base_url: args.frontend_base_url,
    };

    api::new(config, Arc::new(documents)).await
}
