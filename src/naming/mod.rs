//! Pure string helpers shared by the incident and trader endpoints.
//!
//! Nothing in here touches the database or the network; every function is a
//! plain computation over caller-supplied strings.

pub mod reference;
pub mod similarity;

pub use reference::{
    CaseReference, UNKNOWN_VESSEL, format_folder_name, incident_folder_name,
    sanitize_vessel_name,
};
pub use similarity::{SimilarMatch, SimilarityOutcome, check_similarity, normalize, threshold};
