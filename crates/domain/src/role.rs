use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sitegate_core::{AppError, AppResult};

/// Site identifier reserved for the global super-admin sentinel role.
pub const ANY_SITE_ID: &str = "any";

/// Role names ordered from least to most privileged.
///
/// `participant < research_assistant < site_admin < admin < super_admin`.
/// Role strings outside that ladder are carried as [`RoleName::Other`] so that
/// stored data round-trips unchanged; they rank below every defined role.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RoleName {
    /// Study participant.
    Participant,
    /// Research assistant with read-mostly access.
    ResearchAssistant,
    /// Administrator of one site.
    SiteAdmin,
    /// Administrator with elevated access at its sites.
    Admin,
    /// Global administrator.
    SuperAdmin,
    /// A role string this build does not recognize.
    Other(String),
}

impl RoleName {
    /// Returns every defined role, least privileged first.
    #[must_use]
    pub fn ladder() -> &'static [Self] {
        const LADDER: &[RoleName] = &[
            RoleName::Participant,
            RoleName::ResearchAssistant,
            RoleName::SiteAdmin,
            RoleName::Admin,
            RoleName::SuperAdmin,
        ];

        LADDER
    }

    /// Returns a stable storage value for this role.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Participant => "participant",
            Self::ResearchAssistant => "research_assistant",
            Self::SiteAdmin => "site_admin",
            Self::Admin => "admin",
            Self::SuperAdmin => "super_admin",
            Self::Other(value) => value.as_str(),
        }
    }

    /// Position in the role ladder; `None` for unrecognized roles.
    #[must_use]
    pub fn rank(&self) -> Option<u8> {
        match self {
            Self::Participant => Some(0),
            Self::ResearchAssistant => Some(1),
            Self::SiteAdmin => Some(2),
            Self::Admin => Some(3),
            Self::SuperAdmin => Some(4),
            Self::Other(_) => None,
        }
    }

    /// Returns whether the role is part of the defined ladder.
    #[must_use]
    pub fn is_defined(&self) -> bool {
        self.rank().is_some()
    }

    /// Returns whether holding this role implies admin-level access.
    #[must_use]
    pub fn implies_admin(&self) -> bool {
        has_minimum_role(self, &Self::SiteAdmin)
    }

    /// Parses a role strictly, rejecting values outside the ladder.
    pub fn parse_defined(value: &str) -> AppResult<Self> {
        let role = Self::from(value.to_owned());
        if role.is_defined() {
            Ok(role)
        } else {
            Err(AppError::Validation(format!("unknown role name '{value}'")))
        }
    }
}

impl From<String> for RoleName {
    fn from(value: String) -> Self {
        match value.as_str() {
            "participant" => Self::Participant,
            "research_assistant" => Self::ResearchAssistant,
            "site_admin" => Self::SiteAdmin,
            "admin" => Self::Admin,
            "super_admin" => Self::SuperAdmin,
            _ => Self::Other(value),
        }
    }
}

impl From<RoleName> for String {
    fn from(value: RoleName) -> Self {
        match value {
            RoleName::Other(value) => value,
            defined => defined.as_str().to_owned(),
        }
    }
}

impl FromStr for RoleName {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse_defined(value)
    }
}

impl Display for RoleName {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Returns whether `actual` satisfies `required` in the role ladder.
///
/// Unrecognized roles on either side never satisfy the check.
#[must_use]
pub fn has_minimum_role(actual: &RoleName, required: &RoleName) -> bool {
    match (actual.rank(), required.rank()) {
        (Some(actual), Some(required)) => actual >= required,
        _ => false,
    }
}

/// Picks the highest-ranked role from an iterator, ignoring unrecognized roles
/// unless nothing else is present.
#[must_use]
pub fn highest_role<'a>(roles: impl IntoIterator<Item = &'a RoleName>) -> Option<&'a RoleName> {
    roles.into_iter().fold(None, |best, role| match best {
        None => Some(role),
        Some(current) => match (current.rank(), role.rank()) {
            (None, Some(_)) => Some(role),
            (Some(current_rank), Some(rank)) if rank > current_rank => Some(role),
            _ => Some(current),
        },
    })
}

/// One role held by a user at one top-level site.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRole {
    /// Top-level site identifier, or [`ANY_SITE_ID`] for the global sentinel.
    pub site_id: String,
    /// Role held at the site.
    pub role: RoleName,
    /// Display-name cache for the site.
    #[serde(default)]
    pub site_name: String,
}

impl UserRole {
    /// Creates a validated role entry.
    pub fn new(
        site_id: impl Into<String>,
        role: RoleName,
        site_name: impl Into<String>,
    ) -> AppResult<Self> {
        let site_id = site_id.into();
        if site_id.trim().is_empty() {
            return Err(AppError::Validation(
                "user role site id must not be empty".to_owned(),
            ));
        }
        if role.as_str().trim().is_empty() {
            return Err(AppError::Validation(
                "user role name must not be empty".to_owned(),
            ));
        }

        Ok(Self {
            site_id,
            role,
            site_name: site_name.into(),
        })
    }

    /// The `{siteId: "any", role: "super_admin"}` global sentinel.
    #[must_use]
    pub fn super_admin_sentinel() -> Self {
        Self {
            site_id: ANY_SITE_ID.to_owned(),
            role: RoleName::SuperAdmin,
            site_name: ANY_SITE_ID.to_owned(),
        }
    }

    /// Returns whether this entry is the global super-admin sentinel.
    #[must_use]
    pub fn is_super_admin_sentinel(&self) -> bool {
        self.site_id == ANY_SITE_ID && self.role == RoleName::SuperAdmin
    }

    /// Returns whether both `site_id` and `role` carry a value.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        !self.site_id.trim().is_empty() && !self.role.as_str().trim().is_empty()
    }

    /// Returns whether this entry matches the `(site_id, role)` pair.
    #[must_use]
    pub fn same_assignment(&self, other: &Self) -> bool {
        self.site_id == other.site_id && self.role == other.role
    }
}

/// Adds `role` unless the same `(site_id, role)` pair is already present.
///
/// Returns whether the list changed.
pub fn union_role(roles: &mut Vec<UserRole>, role: UserRole) -> bool {
    if roles.iter().any(|existing| existing.same_assignment(&role)) {
        return false;
    }

    roles.push(role);
    true
}

/// Removes every entry with the same `(site_id, role)` pair as `role`.
///
/// Returns whether the list changed.
pub fn remove_role(roles: &mut Vec<UserRole>, role: &UserRole) -> bool {
    let before = roles.len();
    roles.retain(|existing| !existing.same_assignment(role));
    roles.len() != before
}

/// Drops repeated `(site_id, role)` pairs, keeping the first occurrence.
#[must_use]
pub fn dedupe_roles(roles: Vec<UserRole>) -> Vec<UserRole> {
    let mut deduped = Vec::with_capacity(roles.len());
    for role in roles {
        union_role(&mut deduped, role);
    }
    deduped
}
