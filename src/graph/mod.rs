//! Microsoft Graph document storage.
//!
//! Incident folders live in a SharePoint/OneDrive drive. The service
//! authenticates with the OAuth2 client-credentials grant and keeps the access
//! token in memory until shortly before it expires.
//!
//! Handlers only see the [`DocumentStore`] trait so provisioning can be tested
//! without a tenant.

pub mod folders;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{Instrument, debug, info_span, instrument};
use url::Url;

pub use folders::provision_incident_folder;

pub const DEFAULT_AUTHORITY_URL: &str = "https://login.microsoftonline.com";
pub const DEFAULT_API_URL: &str = "https://graph.microsoft.com/v1.0";
pub const DEFAULT_ROOT_FOLDER: &str = "Incidents";

const GRAPH_SCOPE: &str = "https://graph.microsoft.com/.default";
// Refresh this long before the token actually expires.
const TOKEN_EXPIRY_MARGIN_SECONDS: u64 = 60;
const REQUEST_TIMEOUT_SECONDS: u64 = 30;

#[derive(Clone)]
pub struct GraphConfig {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: SecretString,
    pub drive_id: String,
    pub root_folder: String,
    pub authority_url: String,
    pub api_url: String,
}

impl std::fmt::Debug for GraphConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphConfig")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .field("drive_id", &self.drive_id)
            .field("root_folder", &self.root_folder)
            .field("authority_url", &self.authority_url)
            .field("api_url", &self.api_url)
            .finish()
    }
}

/// A file or folder in the drive.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DriveItem {
    pub id: String,
    pub name: String,
    #[serde(rename = "webUrl", default)]
    pub web_url: Option<String>,
}

/// Where a new folder is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FolderParent {
    Root,
    Item(String),
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Looks a folder up by its path below the drive root.
    async fn find_folder(&self, path: &[&str]) -> Result<Option<DriveItem>>;

    /// Creates a folder; a name collision yields a renamed folder, not an error.
    async fn create_folder(&self, parent: &FolderParent, name: &str) -> Result<DriveItem>;
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: SecretString,
    expires_at: Instant,
}

impl CachedToken {
    fn is_fresh(&self) -> bool {
        Instant::now() + Duration::from_secs(TOKEN_EXPIRY_MARGIN_SECONDS) < self.expires_at
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Debug)]
pub struct GraphClient {
    config: GraphConfig,
    client: Client,
    token: RwLock<Option<CachedToken>>,
}

impl GraphClient {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: GraphConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECONDS))
            .build()?;

        Ok(Self {
            config,
            client,
            token: RwLock::new(None),
        })
    }

    #[must_use]
    pub fn root_folder(&self) -> &str {
        &self.config.root_folder
    }

    async fn access_token(&self) -> Result<SecretString> {
        if let Some(token) = self.token.read().await.as_ref() {
            if token.is_fresh() {
                return Ok(token.access_token.clone());
            }
        }

        let mut guard = self.token.write().await;
        // Another task may have refreshed while we waited for the lock.
        if let Some(token) = guard.as_ref() {
            if token.is_fresh() {
                return Ok(token.access_token.clone());
            }
        }

        let token = self.request_token().await?;
        let access_token = token.access_token.clone();
        *guard = Some(token);
        Ok(access_token)
    }

    #[instrument(skip(self), fields(tenant_id = %self.config.tenant_id))]
    async fn request_token(&self) -> Result<CachedToken> {
        let url = format!(
            "{}/{}/oauth2/v2.0/token",
            self.config.authority_url.trim_end_matches('/'),
            self.config.tenant_id
        );
        let form = [
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.expose_secret()),
            ("scope", GRAPH_SCOPE),
            ("grant_type", "client_credentials"),
        ];

        let span = info_span!("graph.token", http.method = "POST");
        let response = self
            .client
            .post(&url)
            .form(&form)
            .send()
            .instrument(span)
            .await
            .context("token request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("token request failed: {status} {body}"));
        }

        let token: TokenResponse = response.json().await.context("invalid token response")?;
        debug!("acquired graph token, expires in {}s", token.expires_in);

        Ok(CachedToken {
            access_token: SecretString::from(token.access_token),
            expires_at: Instant::now() + Duration::from_secs(token.expires_in),
        })
    }

    fn drive_url(&self, segments: &[&str]) -> Result<Url> {
        drive_url(&self.config.api_url, &self.config.drive_id, segments)
    }
}

/// Builds `{api}/drives/{drive}/{segments...}`, percent-encoding each segment.
fn drive_url(api_url: &str, drive_id: &str, segments: &[&str]) -> Result<Url> {
    let mut url = Url::parse(api_url).with_context(|| format!("Invalid Graph API URL: {api_url}"))?;
    url.path_segments_mut()
        .map_err(|()| anyhow!("Graph API URL cannot be a base: {api_url}"))?
        .pop_if_empty()
        .push("drives")
        .push(drive_id)
        .extend(segments);
    Ok(url)
}

#[async_trait]
impl DocumentStore for GraphClient {
    async fn find_folder(&self, path: &[&str]) -> Result<Option<DriveItem>> {
        let token = self.access_token().await?;
        // `root:/a/b` addresses an item by path; the colon stays unescaped.
        let mut segments = vec!["root:"];
        segments.extend_from_slice(path);
        let url = self.drive_url(&segments)?;

        let span = info_span!("graph.find_folder", http.method = "GET", path = %path.join("/"));
        let response = self
            .client
            .get(url)
            .bearer_auth(token.expose_secret())
            .send()
            .instrument(span)
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("folder lookup failed: {status} {body}"));
        }

        Ok(Some(response.json().await?))
    }

    async fn create_folder(&self, parent: &FolderParent, name: &str) -> Result<DriveItem> {
        let token = self.access_token().await?;
        let url = match parent {
            FolderParent::Root => self.drive_url(&["root", "children"])?,
            FolderParent::Item(id) => self.drive_url(&["items", id.as_str(), "children"])?,
        };
        let payload = json!({
            "name": name,
            "folder": {},
            "@microsoft.graph.conflictBehavior": "rename",
        });

        let span = info_span!("graph.create_folder", http.method = "POST", name = %name);
        let response = self
            .client
            .post(url)
            .bearer_auth(token.expose_secret())
            .json(&payload)
            .send()
            .instrument(span)
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("folder creation failed: {status} {body}"));
        }

        Ok(response.json().await?)
    }
}
