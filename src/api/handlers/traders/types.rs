use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct TraderNameRequest {
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TraderResponse {
    pub id: String,
    pub name: String,
    pub created_at: String,
    pub updated_at: String,
}
