//! Clubs and claim handlers.
//!
//! Both are small code/name lookup tables that incidents point at. Their codes
//! end up verbatim in case references, so they are restricted to uppercase
//! ASCII alphanumerics here and by a CHECK constraint in the schema.

pub mod claim_handlers;
pub mod clubs;
pub(crate) mod storage;

use super::ApiError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::sync::LazyLock;
use utoipa::ToSchema;

static CODE_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[A-Z0-9]{1,10}$").ok());

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateReferenceRequest {
    pub code: String,
    pub name: String,
}

/// A club or a claim handler.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReferenceEntity {
    pub id: String,
    pub code: String,
    pub name: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ReferenceKind {
    Club,
    Handler,
}

impl ReferenceKind {
    pub(crate) fn table(self) -> &'static str {
        match self {
            Self::Club => "clubs",
            Self::Handler => "handlers",
        }
    }

    pub(crate) fn label(self) -> &'static str {
        match self {
            Self::Club => "Club",
            Self::Handler => "Handler",
        }
    }
}

/// Validates the request and stores a new club or handler.
async fn create(
    pool: &PgPool,
    kind: ReferenceKind,
    payload: &CreateReferenceRequest,
) -> Result<ReferenceEntity, ApiError> {
    let Some(code) = normalize_code(&payload.code) else {
        return Err(ApiError::bad_request(
            "Code must be 1 to 10 letters or digits.",
        ));
    };
    let name = payload.name.trim();
    if name.is_empty() {
        return Err(ApiError::bad_request(format!(
            "{} name is required.",
            kind.label()
        )));
    }

    storage::insert(pool, kind, &code, name).await
}

/// Trims and uppercases `code`, returning `None` unless it is 1-10 ASCII
/// letters or digits.
pub(crate) fn normalize_code(code: &str) -> Option<String> {
    let code = code.trim().to_ascii_uppercase();
    CODE_PATTERN
        .as_ref()
        .is_some_and(|re| re.is_match(&code))
        .then_some(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_code_uppercases_and_trims() {
        assert_eq!(normalize_code(" gd "), Some("GD".to_string()));
        assert_eq!(normalize_code("ial"), Some("IAL".to_string()));
        assert_eq!(normalize_code("UK1"), Some("UK1".to_string()));
    }

    #[test]
    fn normalize_code_rejects_bad_codes() {
        assert_eq!(normalize_code(""), None);
        assert_eq!(normalize_code("   "), None);
        assert_eq!(normalize_code("G/D"), None);
        assert_eq!(normalize_code("G D"), None);
        assert_eq!(normalize_code("ABCDEFGHIJK"), None);
        assert_eq!(normalize_code("ÄB"), None);
    }

    #[test]
    fn code_pattern_compiles_once() {
        assert!(CODE_PATTERN.is_some());
        assert_eq!(normalize_code("gd"), normalize_code("GD"));
    }

    #[test]
    fn kinds_map_to_tables() {
        assert_eq!(ReferenceKind::Club.table(), "clubs");
        assert_eq!(ReferenceKind::Handler.table(), "handlers");
    }
}
