//! # Claimsdesk (Maritime Claims Back Office)
//!
//! `claimsdesk` is the API behind the claims desk: incidents, trading partners
//! and the reference entities an incident points at, stored in Postgres, with
//! one document folder per incident provisioned in SharePoint through
//! Microsoft Graph.
//!
//! ## Case References
//!
//! Every incident carries a human-readable reference `SEQ/YY/CLUB/HANDLER`,
//! with a `-SUB` suffix for follow-up incidents. Sequence numbers are allocated
//! per calendar year and zero-padded to four digits.
//!
//! ## Document Folders
//!
//! Incident folders live under `<root>/<year>/` and are named after the first
//! three reference segments plus the vessel, e.g. `066425GD - LONG BEACH`.
//! Name collisions are left to the storage service, which renames on conflict.
//!
//! ## Trader De-duplication
//!
//! New trader names are compared with every existing name after whitespace and
//! case normalization. Exact and near matches (small edit distance, scaled to
//! the name length) are rejected with `409 Conflict` so an operator can decide.

pub mod api;
pub mod cli;
pub mod graph;
pub mod naming;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
