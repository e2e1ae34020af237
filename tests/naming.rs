//! Behaviour of the public naming helpers as the API relies on it.

use claimsdesk::naming::{
    CaseReference, SimilarityOutcome, UNKNOWN_VESSEL, check_similarity, format_folder_name,
    incident_folder_name, normalize, sanitize_vessel_name, threshold,
};

const RESERVED: [char; 9] = ['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

const VESSELS: [&str; 7] = [
    "LONG BEACH",
    "  MV \"Star\" <II> ",
    "A/B:C*D?E|F\\G",
    "///",
    "",
    "Ærø Express",
    "NORDIC   BEACH",
];

#[test]
fn documented_folder_name_example() {
    assert_eq!(
        format_folder_name("0664/25/GD/IAL", "LONG BEACH"),
        "066425GD - LONG BEACH"
    );
}

#[test]
fn folder_names_never_contain_reserved_characters() {
    for reference in ["0664/25/GD/IAL", "0664/25/GD/IAL-2", "0664-25", "a:b|c"] {
        for vessel in VESSELS {
            let name = format_folder_name(reference, vessel);
            assert!(
                !name.contains(RESERVED),
                "{name:?} from ({reference:?}, {vessel:?})"
            );
        }
    }
}

#[test]
fn sub_numbers_share_the_parent_folder_prefix() {
    let parent = CaseReference::new(12, 2024, "UK", "JS");
    let sub = parent.clone().with_sub_number(3);
    assert_eq!(sub.to_string(), "0012/24/UK/JS-3");

    let parent_folder = format_folder_name(&parent.to_string(), "X");
    let sub_folder = format_folder_name(&sub.to_string(), "X");
    assert_eq!(parent_folder, sub_folder);
}

#[test]
fn missing_vessel_uses_placeholder() {
    for vessel in [None, Some(""), Some("   "), Some("??//")] {
        assert_eq!(
            incident_folder_name("0001/25/GD/IAL", vessel),
            format!("000125GD - {UNKNOWN_VESSEL}")
        );
    }
}

#[test]
fn sanitizing_is_idempotent() {
    for vessel in VESSELS {
        let once = sanitize_vessel_name(vessel);
        assert_eq!(sanitize_vessel_name(&once), once);
    }
}

#[test]
fn normalizing_is_idempotent() {
    for name in VESSELS {
        let once = normalize(name);
        assert_eq!(normalize(&once), once);
        assert!(!once.contains("  "));
    }
}

#[test]
fn threshold_is_monotonic() {
    let mut previous = 0;
    for len in 0..40 {
        let current = threshold(len);
        assert!(current >= previous);
        assert!(current <= 2);
        previous = current;
    }
}

#[test]
fn similarity_never_reports_beyond_threshold() {
    let existing = [
        "CARGILL AGRICOLA",
        "LOUIS DREYFUS",
        "BUNGE ALIMENTOS",
        "COFCO",
        "ADM",
    ];
    for candidate in [
        "Cargill Agricolas",
        "LOUIS DREYFUSS",
        "BUNGE ALIMENTOS SA",
        "COFCA",
        "ADN",
    ] {
        if let SimilarityOutcome::Similar { matches } = check_similarity(candidate, existing) {
            let limit = threshold(normalize(candidate).chars().count());
            assert!(matches.iter().all(|m| m.distance > 0 && m.distance <= limit));
            assert!(matches.windows(2).all(|w| w[0].distance <= w[1].distance));
        }
    }
}

#[test]
fn exact_match_reports_name_as_stored() {
    let outcome = check_similarity("louis  dreyfus", ["Louis Dreyfus"]);
    assert_eq!(
        outcome,
        SimilarityOutcome::Exact {
            name: "Louis Dreyfus".to_string()
        }
    );
    assert!(outcome.is_duplicate());
}

#[test]
fn short_names_only_match_exactly() {
    assert_eq!(check_similarity("ADN", ["ADM"]), SimilarityOutcome::NoMatch);
    assert_eq!(check_similarity("AB", ["ABC"]), SimilarityOutcome::NoMatch);
}
