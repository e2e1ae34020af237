//! Incident folder provisioning.
//!
//! Layout: `<root folder>/<year>/<incident folder>`. The root and year folders
//! are looked up by path and created when absent; the incident folder is always
//! created, and the drive renames it when the name is already taken. Calling
//! this twice never fails because something already exists.

use super::{DocumentStore, DriveItem, FolderParent};
use anyhow::{Context, Result};
use tracing::{debug, info, instrument};

/// Ensures `<root_folder>/<year>` exists and creates `folder_name` inside it.
///
/// `root_folder` may be nested (`Claims/Incidents`); empty segments are ignored.
///
/// # Errors
/// Returns an error if any lookup or creation call to the store fails.
#[instrument(skip(store))]
pub async fn provision_incident_folder(
    store: &dyn DocumentStore,
    root_folder: &str,
    year: i32,
    folder_name: &str,
) -> Result<DriveItem> {
    let year = year.to_string();
    let mut path: Vec<&str> = root_folder
        .split('/')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .collect();
    path.push(&year);

    let year_folder = ensure_folder_path(store, &path).await?;

    let folder = store
        .create_folder(&FolderParent::Item(year_folder.id), folder_name)
        .await
        .with_context(|| format!("Failed to create incident folder {folder_name}"))?;

    info!(folder_id = %folder.id, folder_name = %folder.name, "incident folder provisioned");
    Ok(folder)
}

/// Walks `path` from the drive root, creating each missing folder.
async fn ensure_folder_path(store: &dyn DocumentStore, path: &[&str]) -> Result<DriveItem> {
    let mut parent = FolderParent::Root;
    let mut current = None;

    for depth in 1..=path.len() {
        let prefix = &path[..depth];
        let name = prefix[depth - 1];

        let item = if let Some(item) = store.find_folder(prefix).await? {
            item
        } else {
            debug!("creating missing folder {}", prefix.join("/"));
            store
                .create_folder(&parent, name)
                .await
                .with_context(|| format!("Failed to create folder {}", prefix.join("/")))?
        };

        parent = FolderParent::Item(item.id.clone());
        current = Some(item);
    }

    current.context("folder path is empty")
}
