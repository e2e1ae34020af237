//! Case references and the document folder names derived from them.
//!
//! A reference reads `SEQ/YY/CLUB/HANDLER` (`0664/25/GD/IAL`), or
//! `SEQ/YY/CLUB/HANDLER-SUB` for follow-up incidents. Folder names keep only the
//! first three segments: `066425GD - LONG BEACH`.

use std::fmt;

/// Width the sequence number is zero-padded to.
pub const SEQUENCE_WIDTH: usize = 4;

/// Vessel name used when the incident has none, or nothing survives sanitizing.
pub const UNKNOWN_VESSEL: &str = "Unknown Vessel";

/// Characters that cannot appear in a SharePoint/OneDrive item name.
const RESERVED_CHARS: [char; 9] = ['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseReference {
    sequence: u32,
    year_suffix: u8,
    club_code: String,
    handler_code: String,
    sub_number: u32,
}

impl CaseReference {
    /// Builds a reference for `year`; only the last two digits are rendered.
    #[must_use]
    pub fn new(
        sequence: u32,
        year: i32,
        club_code: impl Into<String>,
        handler_code: impl Into<String>,
    ) -> Self {
        Self {
            sequence,
            year_suffix: year_suffix(year),
            club_code: club_code.into(),
            handler_code: handler_code.into(),
            sub_number: 0,
        }
    }

    #[must_use]
    pub fn with_sub_number(mut self, sub_number: u32) -> Self {
        self.sub_number = sub_number;
        self
    }

    #[must_use]
    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    #[must_use]
    pub fn year_suffix(&self) -> u8 {
        self.year_suffix
    }

    #[must_use]
    pub fn sub_number(&self) -> u32 {
        self.sub_number
    }
}

impl fmt::Display for CaseReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:0width$}/{:02}/{}/{}",
            self.sequence,
            self.year_suffix,
            self.club_code,
            self.handler_code,
            width = SEQUENCE_WIDTH
        )?;
        if self.sub_number > 0 {
            write!(f, "-{}", self.sub_number)?;
        }
        Ok(())
    }
}

fn year_suffix(year: i32) -> u8 {
    // rem_euclid keeps the result in 0..100
    u8::try_from(year.rem_euclid(100)).unwrap_or_default()
}

fn strip_reserved(value: &str) -> String {
    value.chars().filter(|c| !RESERVED_CHARS.contains(c)).collect()
}

/// Removes reserved item-name characters and surrounding whitespace.
#[must_use]
pub fn sanitize_vessel_name(vessel_name: &str) -> String {
    strip_reserved(vessel_name).trim().to_string()
}

/// Derives the incident folder name from a reference and a vessel name.
///
/// Only the first three `/` segments of the reference are kept, so the handler
/// code and any sub-number never reach the folder name. A reference with fewer
/// than three segments falls back to the whole reference without slashes.
/// An empty vessel is kept empty here; see [`incident_folder_name`].
#[must_use]
pub fn format_folder_name(reference: &str, vessel_name: &str) -> String {
    let segments: Vec<&str> = reference.split('/').collect();
    let ref_part = if segments.len() >= 3 {
        segments[..3].concat()
    } else {
        reference.replace('/', "")
    };

    format!(
        "{} - {}",
        strip_reserved(&ref_part),
        sanitize_vessel_name(vessel_name)
    )
}

/// Folder name for an incident, substituting [`UNKNOWN_VESSEL`] when the vessel
/// is missing or sanitizes to nothing.
#[must_use]
pub fn incident_folder_name(reference: &str, vessel_name: Option<&str>) -> String {
    let vessel = vessel_name
        .filter(|name| !sanitize_vessel_name(name).is_empty())
        .unwrap_or(UNKNOWN_VESSEL);
    format_folder_name(reference, vessel)
}
