//! Request/response types for incident endpoints.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateIncidentRequest {
    pub club_code: String,
    pub handler_code: String,
    pub vessel_name: Option<String>,
    pub incident_date: Option<NaiveDate>,
    pub port: Option<String>,
    pub description: Option<String>,
    /// Creates a sub-incident sharing the parent's sequence number.
    pub parent_id: Option<Uuid>,
}

/// Fields left out are unchanged; an empty string clears a text field.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateIncidentRequest {
    pub vessel_name: Option<String>,
    pub port: Option<String>,
    pub description: Option<String>,
    pub incident_date: Option<NaiveDate>,
    pub status: Option<IncidentStatus>,
    pub handler_code: Option<String>,
}

impl UpdateIncidentRequest {
    pub(super) fn is_empty(&self) -> bool {
        self.vessel_name.is_none()
            && self.port.is_none()
            && self.description.is_none()
            && self.incident_date.is_none()
            && self.status.is_none()
            && self.handler_code.is_none()
    }
}

#[derive(Debug, Deserialize, Serialize, ToSchema, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum IncidentStatus {
    #[default]
    Open,
    Closed,
}

impl IncidentStatus {
    /// Canonical string used in payloads and in the `status` column.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "open" => Some(Self::Open),
            "closed" => Some(Self::Closed),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq, Eq)]
pub struct IncidentFolder {
    pub id: String,
    pub name: String,
    pub web_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct IncidentResponse {
    pub id: String,
    /// `SEQ/YY/CLUB/HANDLER[-SUB]`
    pub reference: String,
    pub sequence: i32,
    pub year: i32,
    pub sub_number: i32,
    pub parent_id: Option<String>,
    pub club_code: String,
    pub handler_code: String,
    pub vessel_name: Option<String>,
    pub port: Option<String>,
    pub description: Option<String>,
    /// `YYYY-MM-DD`
    pub incident_date: Option<String>,
    pub status: String,
    pub folder: Option<IncidentFolder>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchQuery {
    /// Case-insensitive text matched against reference, vessel, port and description.
    pub q: Option<String>,
    /// `open` or `closed`.
    pub status: Option<String>,
    /// Club code.
    pub club: Option<String>,
    /// Handler code.
    pub handler: Option<String>,
    /// Four-digit reference year.
    pub year: Option<i32>,
    /// Case-insensitive vessel name fragment.
    pub vessel: Option<String>,
    /// `created_desc` (default), `created_asc` or `reference`.
    pub sort: Option<String>,
    /// 1-based page number.
    pub page: Option<u32>,
    /// Page size, at most 100.
    pub per_page: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct IncidentPage {
    pub items: Vec<IncidentResponse>,
    pub total: i64,
    pub page: u32,
    pub per_page: u32,
}
