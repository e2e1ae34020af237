use crate::graph::{DEFAULT_API_URL, DEFAULT_AUTHORITY_URL, DEFAULT_ROOT_FOLDER, GraphConfig};
use anyhow::{Result, anyhow};
use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;

pub const ARG_GRAPH_TENANT_ID: &str = "graph-tenant-id";
pub const ARG_GRAPH_CLIENT_ID: &str = "graph-client-id";
pub const ARG_GRAPH_CLIENT_SECRET: &str = "graph-client-secret";
pub const ARG_GRAPH_DRIVE_ID: &str = "graph-drive-id";
pub const ARG_GRAPH_ROOT_FOLDER: &str = "graph-root-folder";
pub const ARG_GRAPH_AUTHORITY_URL: &str = "graph-authority-url";
pub const ARG_GRAPH_API_URL: &str = "graph-api-url";

/// Arguments that must be given together to enable document storage.
const REQUIRED_TOGETHER: [&str; 4] = [
    ARG_GRAPH_TENANT_ID,
    ARG_GRAPH_CLIENT_ID,
    ARG_GRAPH_CLIENT_SECRET,
    ARG_GRAPH_DRIVE_ID,
];

pub struct Options;

impl Options {
    /// Parse Graph arguments. `None` means document storage is disabled.
    ///
    /// # Errors
    /// Returns an error if only some of the credential arguments are present.
    pub fn parse(matches: &ArgMatches) -> Result<Option<GraphConfig>> {
        let read = |id: &str| -> Option<String> {
            matches
                .get_one::<String>(id)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let present: Vec<&str> = REQUIRED_TOGETHER
            .iter()
            .copied()
            .filter(|id| read(id).is_some())
            .collect();
        if present.is_empty() {
            return Ok(None);
        }
        if let Some(missing) = REQUIRED_TOGETHER.iter().find(|id| !present.contains(*id)) {
            return Err(anyhow!(
                "missing required argument: --{missing} (Graph document storage is partially configured)"
            ));
        }

        let required = |id: &str| {
            read(id).ok_or_else(|| anyhow!("missing required argument: --{id}"))
        };

        Ok(Some(GraphConfig {
            tenant_id: required(ARG_GRAPH_TENANT_ID)?,
            client_id: required(ARG_GRAPH_CLIENT_ID)?,
            client_secret: SecretString::from(required(ARG_GRAPH_CLIENT_SECRET)?),
            drive_id: required(ARG_GRAPH_DRIVE_ID)?,
            root_folder: read(ARG_GRAPH_ROOT_FOLDER)
                .unwrap_or_else(|| DEFAULT_ROOT_FOLDER.to_string()),
            authority_url: read(ARG_GRAPH_AUTHORITY_URL)
                .unwrap_or_else(|| DEFAULT_AUTHORITY_URL.to_string()),
            api_url: read(ARG_GRAPH_API_URL).unwrap_or_else(|| DEFAULT_API_URL.to_string()),
        }))
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_GRAPH_TENANT_ID)
                .long(ARG_GRAPH_TENANT_ID)
                .help("Azure AD tenant id used for Microsoft Graph")
                .env("CLAIMSDESK_GRAPH_TENANT_ID"),
        )
        .arg(
            Arg::new(ARG_GRAPH_CLIENT_ID)
                .long(ARG_GRAPH_CLIENT_ID)
                .help("Application (client) id registered for Microsoft Graph")
                .env("CLAIMSDESK_GRAPH_CLIENT_ID"),
        )
        .arg(
            Arg::new(ARG_GRAPH_CLIENT_SECRET)
                .long(ARG_GRAPH_CLIENT_SECRET)
                .help("Client secret for the Graph application")
                .env("CLAIMSDESK_GRAPH_CLIENT_SECRET")
                .hide_env_values(true),
        )
        .arg(
            Arg::new(ARG_GRAPH_DRIVE_ID)
                .long(ARG_GRAPH_DRIVE_ID)
                .help("SharePoint/OneDrive drive id holding incident folders")
                .env("CLAIMSDESK_GRAPH_DRIVE_ID"),
        )
        .arg(
            Arg::new(ARG_GRAPH_ROOT_FOLDER)
                .long(ARG_GRAPH_ROOT_FOLDER)
                .help("Folder path below the drive root that holds the year folders")
                .env("CLAIMSDESK_GRAPH_ROOT_FOLDER")
                .default_value(DEFAULT_ROOT_FOLDER),
        )
        .arg(
            Arg::new(ARG_GRAPH_AUTHORITY_URL)
                .long(ARG_GRAPH_AUTHORITY_URL)
                .help("OAuth2 authority used for the client-credentials grant")
                .env("CLAIMSDESK_GRAPH_AUTHORITY_URL")
                .default_value(DEFAULT_AUTHORITY_URL),
        )
        .arg(
            Arg::new(ARG_GRAPH_API_URL)
                .long(ARG_GRAPH_API_URL)
                .help("Microsoft Graph API base URL")
                .env("CLAIMSDESK_GRAPH_API_URL")
                .default_value(DEFAULT_API_URL),
        )
}
