use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::{AppError, AppResult};

/// Account identity as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    uid: String,
    email: Option<String>,
    display_name: Option<String>,
}

impl UserIdentity {
    /// Creates a user identity from identity-provider data.
    #[must_use]
    pub fn new(uid: impl Into<String>, email: Option<String>, display_name: Option<String>) -> Self {
        Self {
            uid: uid.into(),
            email,
            display_name,
        }
    }

    /// Returns the stable user identifier.
    #[must_use]
    pub fn uid(&self) -> &str {
        self.uid.as_str()
    }

    /// Returns the email, if the provider returned one.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    /// Returns the display name, if the provider returned one.
    #[must_use]
    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }
}

/// Operator-supplied reference to one account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentitySelector {
    /// Look the account up by uid.
    Uid(String),
    /// Look the account up by email address.
    Email(String),
}

impl IdentitySelector {
    /// Builds a selector from mutually exclusive uid/email inputs.
    pub fn from_parts(uid: Option<String>, email: Option<String>) -> AppResult<Self> {
        match (uid, email) {
            (Some(uid), None) if !uid.trim().is_empty() => Ok(Self::Uid(uid.trim().to_owned())),
            (None, Some(email)) if !email.trim().is_empty() => {
                Ok(Self::Email(email.trim().to_lowercase()))
            }
            (Some(_), Some(_)) => Err(AppError::Validation(
                "exactly one of uid or email must be provided, not both".to_owned(),
            )),
            _ => Err(AppError::Validation(
                "a non-empty uid or email is required".to_owned(),
            )),
        }
    }
}

impl Display for IdentitySelector {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Uid(uid) => write!(formatter, "uid '{uid}'"),
            Self::Email(email) => write!(formatter, "email '{email}'"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::IdentitySelector;

    #[test]
    fn selector_normalizes_email() {
        let selector = IdentitySelector::from_parts(None, Some(" A@X.test ".to_owned()));
        assert!(matches!(selector, Ok(IdentitySelector::Email(email)) if email == "a@x.test"));
    }

    #[test]
    fn selector_rejects_both_inputs() {
        let selector =
            IdentitySelector::from_parts(Some("uid-1".to_owned()), Some("a@x.test".to_owned()));
        assert!(selector.is_err());
    }

    #[test]
    fn selector_rejects_missing_inputs() {
        assert!(IdentitySelector::from_parts(None, None).is_err());
        assert!(IdentitySelector::from_parts(Some("  ".to_owned()), None).is_err());
    }
}
