use super::handlers::{documents, health, incidents, reference, traders};
use utoipa::openapi::{Contact, InfoBuilder, License, OpenApiBuilder, Tag};
use utoipa_axum::{router::OpenApiRouter, routes};

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    let (_router, openapi) = api_router().split_for_parts();
    openapi
}

/// Build the router that also drives the `OpenAPI` document.
///
/// Every documented endpoint is registered here with `.routes(routes!(...))`.
/// Routes added in `api::new` (`/`, `OPTIONS /health`) stay undocumented.
pub(crate) fn api_router() -> OpenApiRouter {
    // Handlers sharing a path must be registered in the same `routes!` call.
    OpenApiRouter::with_openapi(cargo_openapi())
        .routes(routes!(health::health))
        .routes(routes!(
            reference::clubs::list_clubs,
            reference::clubs::create_club
        ))
        .routes(routes!(
            reference::claim_handlers::list_handlers,
            reference::claim_handlers::create_handler
        ))
        .routes(routes!(traders::list_traders, traders::create_trader))
        .routes(routes!(traders::check_trader))
        .routes(routes!(
            traders::get_trader,
            traders::update_trader,
            traders::delete_trader
        ))
        .routes(routes!(
            incidents::search::search_incidents,
            incidents::create_incident
        ))
        .routes(routes!(
            incidents::get_incident,
            incidents::update_incident,
            incidents::delete_incident
        ))
        .routes(routes!(incidents::folders::provision_folder))
        .routes(routes!(documents::folder_name))
}

fn cargo_openapi() -> utoipa::openapi::OpenApi {
    // Title, version and contact come from Cargo.toml rather than utoipa defaults.
    let mut info = InfoBuilder::new()
        .title(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .description(optional_str(env!("CARGO_PKG_DESCRIPTION")))
        .build();

    info.contact = cargo_contact();
    info.license = cargo_license();

    OpenApiBuilder::new().info(info).tags(Some(tags())).build()
}

fn tags() -> Vec<Tag> {
    [
        ("health", "Service and database health"),
        ("reference", "Clubs and claim handlers"),
        ("traders", "Trading partners with duplicate-name checks"),
        ("incidents", "Incidents, case references and search"),
        ("documents", "Incident document folders"),
    ]
    .into_iter()
    .map(|(name, description)| {
        let mut tag = Tag::new(name);
        tag.description = Some(description.to_string());
        tag
    })
    .collect()
}

fn cargo_contact() -> Option<Contact> {
    // Cargo authors are `:` separated in the env var; take the first one.
    let primary = env!("CARGO_PKG_AUTHORS").split(':').next().map(str::trim)?;
    let (name, email) = parse_author(primary);
    if name.is_none() && email.is_none() {
        return None;
    }

    let mut contact = Contact::new();
    contact.name = name.map(str::to_string);
    contact.email = email.map(str::to_string);
    Some(contact)
}

fn cargo_license() -> Option<License> {
    let identifier = optional_str(env!("CARGO_PKG_LICENSE"))?;
    let mut license = License::new(identifier);
    license.identifier = Some(identifier.to_string());
    Some(license)
}

fn optional_str(value: &str) -> Option<&str> {
    Some(value.trim()).filter(|v| !v.is_empty())
}

/// Splits `Name <email>` into its parts; either may be missing.
fn parse_author(author: &str) -> (Option<&str>, Option<&str>) {
    match author.split_once('<') {
        Some((name, rest)) => (
            optional_str(name),
            optional_str(rest.trim_end().trim_end_matches('>')),
        ),
        None => (optional_str(author), None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_info_from_cargo() {
        let doc = openapi();
        assert_eq!(doc.info.title, env!("CARGO_PKG_NAME"));
        assert_eq!(doc.info.version, env!("CARGO_PKG_VERSION"));
        assert_eq!(
            doc.info.description.as_deref(),
            Some(env!("CARGO_PKG_DESCRIPTION"))
        );

        let contact = doc.info.contact;
        assert!(contact.is_some());
        if let Some(contact) = contact {
            assert_eq!(contact.name.as_deref(), Some("Claimsdesk Team"));
            assert_eq!(contact.email.as_deref(), Some("dev@claimsdesk.dev"));
        }

        let license = doc.info.license.map(|l| l.name);
        assert_eq!(license.as_deref(), Some("BSD-3-Clause"));
    }

    #[test]
    fn openapi_documents_every_resource() {
        let doc = openapi();
        let tags = doc.tags.clone().unwrap_or_default();
        assert_eq!(tags.len(), 5);
        for name in ["health", "reference", "traders", "incidents", "documents"] {
            assert!(tags.iter().any(|tag| tag.name == name), "missing tag {name}");
        }

        for path in [
            "/health",
            "/v1/clubs",
            "/v1/handlers",
            "/v1/traders",
            "/v1/traders/check",
            "/v1/traders/{id}",
            "/v1/incidents",
            "/v1/incidents/{id}",
            "/v1/incidents/{id}/folder",
            "/v1/documents/folder-name",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing path {path}");
        }
    }

    #[test]
    fn handler_docs_become_operation_summaries() {
        let doc = openapi();
        let summary = |path: &str| {
            doc.paths
                .paths
                .get(path)
                .and_then(|item| item.post.as_ref().or(item.delete.as_ref()))
                .and_then(|operation| operation.summary.clone())
        };

        assert_eq!(
            summary("/v1/traders/check").as_deref(),
            Some("Reports whether `name` would be accepted, without creating anything.")
        );
        assert_eq!(
            summary("/v1/documents/folder-name").as_deref(),
            Some("Previews the folder name an incident with this reference and vessel would get.")
        );
    }

    #[test]
    fn parse_author_variants() {
        assert_eq!(
            parse_author("Jane Doe <jane@example.com>"),
            (Some("Jane Doe"), Some("jane@example.com"))
        );
        assert_eq!(parse_author("Jane Doe"), (Some("Jane Doe"), None));
        assert_eq!(
            parse_author("<ops@example.com>"),
            (None, Some("ops@example.com"))
        );
        assert_eq!(parse_author("  "), (None, None));
    }
}
