use std::path::Path;

use serde::Deserialize;
use sitegate_application::SiteAdminAssignment;
use sitegate_core::{AppError, AppResult, IdentitySelector};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct AssignmentEntry {
    #[serde(default)]
    uid: Option<String>,
    #[serde(default)]
    email: Option<String>,
    sites: Vec<String>,
}

/// Reads a JSON array of `{ "uid" | "email", "sites": [...] }` entries.
pub fn read_assignments(path: &Path) -> AppResult<Vec<SiteAdminAssignment>> {
    let raw = std::fs::read_to_string(path).map_err(|error| {
        AppError::Validation(format!(
            "failed to read assignment file '{}': {error}",
            path.display()
        ))
    })?;

    parse_assignments(&raw)
}

pub fn parse_assignments(raw: &str) -> AppResult<Vec<SiteAdminAssignment>> {
    let entries: Vec<AssignmentEntry> = serde_json::from_str(raw)
        .map_err(|error| AppError::Validation(format!("invalid assignment file: {error}")))?;

    if entries.is_empty() {
        return Err(AppError::Validation(
            "assignment file lists no entries".to_owned(),
        ));
    }

    entries
        .into_iter()
        .enumerate()
        .map(|(index, entry)| {
            let identity = IdentitySelector::from_parts(entry.uid, entry.email).map_err(
                |error| AppError::Validation(format!("assignment entry {index}: {error}")),
            )?;

            Ok(SiteAdminAssignment {
                identity,
                site_names: entry.sites,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use sitegate_core::IdentitySelector;

    use super::parse_assignments;

    #[test]
    fn entries_accept_uid_or_email() {
        let parsed = parse_assignments(
            r#"[
                { "email": "A@X.test", "sites": ["Site A", "Site B"] },
                { "uid": "uid-2", "sites": ["Site A"] }
            ]"#,
        );
        let Ok(assignments) = parsed else {
            panic!("assignment file should parse");
        };

        assert_eq!(assignments.len(), 2);
        assert_eq!(
            assignments[0].identity,
            IdentitySelector::Email("a@x.test".to_owned())
        );
        assert_eq!(assignments[0].site_names, vec!["Site A", "Site B"]);
        assert_eq!(assignments[1].identity, IdentitySelector::Uid("uid-2".to_owned()));
    }

    #[test]
    fn entry_with_both_or_neither_identity_is_rejected() {
        assert!(parse_assignments(r#"[{ "uid": "u", "email": "e@x.test", "sites": [] }]"#).is_err());
        assert!(parse_assignments(r#"[{ "sites": ["Site A"] }]"#).is_err());
    }

    #[test]
    fn unknown_keys_and_empty_files_are_rejected() {
        assert!(parse_assignments(r#"[{ "uid": "u", "sites": [], "role": "admin" }]"#).is_err());
        assert!(parse_assignments("[]").is_err());
        assert!(parse_assignments("{}").is_err());
    }
}
