use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::role::RoleName;

/// Document keys accepted at the top level of a permission document.
const DOCUMENT_KEYS: &[&str] = &["version", "permissions", "updatedAt"];

/// Lookup key of one permission rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PermissionKey {
    /// Resource name, e.g. `users`.
    pub resource: String,
    /// Action name, e.g. `delete`.
    pub action: String,
    /// Optional sub-resource, e.g. `schools` under `groups`.
    pub sub_resource: Option<String>,
}

impl PermissionKey {
    /// Creates a lookup key.
    #[must_use]
    pub fn new(resource: &str, action: &str, sub_resource: Option<&str>) -> Self {
        Self {
            resource: resource.to_owned(),
            action: action.to_owned(),
            sub_resource: sub_resource.map(str::to_owned),
        }
    }
}

/// Versioned table of minimum roles keyed by resource, action and sub-resource.
///
/// Immutable once built; a reload replaces the whole matrix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionMatrix {
    version: String,
    rules: BTreeMap<PermissionKey, RoleName>,
}

impl PermissionMatrix {
    /// Builds a matrix from already validated rules.
    #[must_use]
    pub fn from_rules(
        version: impl Into<String>,
        rules: impl IntoIterator<Item = (PermissionKey, RoleName)>,
    ) -> Self {
        Self {
            version: version.into(),
            rules: rules.into_iter().collect(),
        }
    }

    /// Validates a decoded permission document and compiles it into a matrix.
    ///
    /// Every violation is collected; nothing is defaulted.
    pub fn from_document(document: &Value) -> Result<Self, Vec<String>> {
        let mut errors = Vec::new();

        let Some(document) = document.as_object() else {
            return Err(vec!["permission document must be an object".to_owned()]);
        };

        for key in document.keys() {
            if !DOCUMENT_KEYS.contains(&key.as_str()) {
                errors.push(format!("unknown top-level key '{key}'"));
            }
        }

        let version = match document.get("version") {
            Some(Value::String(version)) if !version.trim().is_empty() => version.clone(),
            Some(Value::Number(version)) if version.is_i64() || version.is_u64() => {
                version.to_string()
            }
            Some(other) => {
                errors.push(format!(
                    "version must be a non-empty string or an integer, found {other}"
                ));
                String::new()
            }
            None => {
                errors.push("version is required".to_owned());
                String::new()
            }
        };

        let mut rules = BTreeMap::new();
        match document.get("permissions") {
            Some(Value::Object(resources)) => compile_resources(resources, &mut rules, &mut errors),
            Some(other) => errors.push(format!("permissions must be an object, found {other}")),
            None => errors.push("permissions is required".to_owned()),
        }

        if errors.is_empty() {
            Ok(Self { version, rules })
        } else {
            Err(errors)
        }
    }

    /// Returns the document version.
    #[must_use]
    pub fn version(&self) -> &str {
        self.version.as_str()
    }

    /// Returns the number of compiled rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns whether the matrix holds no rules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Returns the minimum role for a check.
    ///
    /// A sub-resource lookup falls back to the action-level rule.
    #[must_use]
    pub fn minimum_role(
        &self,
        resource: &str,
        action: &str,
        sub_resource: Option<&str>,
    ) -> Option<&RoleName> {
        if let Some(sub_resource) = sub_resource {
            let specific = self
                .rules
                .get(&PermissionKey::new(resource, action, Some(sub_resource)));
            if specific.is_some() {
                return specific;
            }
        }

        self.rules.get(&PermissionKey::new(resource, action, None))
    }
}

fn compile_resources(
    resources: &Map<String, Value>,
    rules: &mut BTreeMap<PermissionKey, RoleName>,
    errors: &mut Vec<String>,
) {
    for (resource, actions) in resources {
        if resource.trim().is_empty() {
            errors.push("permissions contains an empty resource name".to_owned());
            continue;
        }

        let Some(actions) = actions.as_object() else {
            errors.push(format!(
                "permissions.{resource} must be an object of actions, found {actions}"
            ));
            continue;
        };

        for (action, rule) in actions {
            if action.trim().is_empty() {
                errors.push(format!("permissions.{resource} contains an empty action name"));
                continue;
            }

            let path = format!("permissions.{resource}.{action}");
            match rule {
                Value::String(role) => {
                    if let Some(role) = parse_role(role, &path, errors) {
                        rules.insert(PermissionKey::new(resource, action, None), role);
                    }
                }
                Value::Object(sub_resources) => {
                    for (sub_resource, role) in sub_resources {
                        let sub_path = format!("{path}.{sub_resource}");
                        if sub_resource.trim().is_empty() {
                            errors.push(format!("{path} contains an empty sub-resource name"));
                            continue;
                        }
                        let Some(role) = role.as_str() else {
                            errors.push(format!("{sub_path} must be a role name, found {role}"));
                            continue;
                        };
                        if let Some(role) = parse_role(role, &sub_path, errors) {
                            rules.insert(
                                PermissionKey::new(resource, action, Some(sub_resource)),
                                role,
                            );
                        }
                    }
                }
                other => errors.push(format!(
                    "{path} must be a role name or a map of sub-resources, found {other}"
                )),
            }
        }
    }
}

fn parse_role(value: &str, path: &str, errors: &mut Vec<String>) -> Option<RoleName> {
    match RoleName::parse_defined(value) {
        Ok(role) => Some(role),
        Err(_) => {
            errors.push(format!("{path}: unknown role name '{value}'"));
            None
        }
    }
}
