use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sitegate_application::{
    ClaimsMirrorEntry, ClaimsMirrorRepository, IdentityProvider, PermissionDocumentSource,
    ProfileRepository, SiteDirectory, SiteRecord,
};
use sitegate_core::{AppError, AppResult, IdentitySelector, UserIdentity};
use sitegate_domain::{CustomClaims, UserRole};
use tokio::sync::RwLock;


/// In-memory profile record store.
#[derive(Debug, Default)]
pub struct InMemoryProfileRepository {
    profiles: RwLock<HashMap<String, Vec<UserRole>>>,
}

impl InMemoryProfileRepository {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates or replaces a profile record.
    pub async fn insert_profile(&self, uid: &str, roles: Vec<UserRole>) {
        self.profiles.write().await.insert(uid.to_owned(), roles);
    }
}

#[async_trait]
impl ProfileRepository for InMemoryProfileRepository {
    async fn find_profile_roles(&self, uid: &str) -> AppResult<Option<Vec<UserRole>>> {
        Ok(self.profiles.read().await.get(uid).cloned())
    }

    async fn save_profile_roles(&self, uid: &str, roles: &[UserRole]) -> AppResult<()> {
        let mut profiles = self.profiles.write().await;
        let Some(stored) = profiles.get_mut(uid) else {
            return Err(AppError::NotFound(format!(
                "profile record for uid '{uid}'"
            )));
        };

        *stored = roles.to_vec();
        Ok(())
    }
}

/// In-memory claims mirror store.
#[derive(Debug, Default)]
pub struct InMemoryClaimsMirrorRepository {
    entries: RwLock<HashMap<String, ClaimsMirrorEntry>>,
}

impl InMemoryClaimsMirrorRepository {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ClaimsMirrorRepository for InMemoryClaimsMirrorRepository {
    async fn find_claims_mirror(&self, uid: &str) -> AppResult<Option<ClaimsMirrorEntry>> {
        Ok(self.entries.read().await.get(uid).cloned())
    }

    async fn save_claims_mirror(
        &self,
        uid: &str,
        claims: &CustomClaims,
        last_updated: DateTime<Utc>,
    ) -> AppResult<()> {
        self.entries.write().await.insert(
            uid.to_owned(),
            ClaimsMirrorEntry {
                claims: claims.clone(),
                last_updated,
            },
        );
        Ok(())
    }
}

/// In-memory site directory.
#[derive(Debug, Default)]
pub struct InMemorySiteDirectory {
    sites: RwLock<Vec<SiteRecord>>,
}

impl InMemorySiteDirectory {
    /// Creates a directory holding `sites`.
    #[must_use]
    pub fn new(sites: Vec<SiteRecord>) -> Self {
        Self {
            sites: RwLock::new(sites),
        }
    }
}

#[async_trait]
impl SiteDirectory for InMemorySiteDirectory {
    async fn find_sites_by_name(&self, name: &str) -> AppResult<Vec<SiteRecord>> {
        Ok(self
            .sites
            .read()
            .await
            .iter()
            .filter(|site| site.name == name)
            .cloned()
            .collect())
    }
}

#[derive(Debug, Clone)]
struct StoredAccount {
    identity: UserIdentity,
    claims: Option<CustomClaims>,
}

/// In-memory identity provider holding accounts and their custom claims.
#[derive(Debug, Default)]
pub struct InMemoryIdentityProvider {
    accounts: RwLock<HashMap<String, StoredAccount>>,
}

impl InMemoryIdentityProvider {
    /// Creates a provider without accounts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an account. Emails are matched case-insensitively.
    pub async fn insert_account(&self, identity: UserIdentity, claims: Option<CustomClaims>) {
        self.accounts.write().await.insert(
            identity.uid().to_owned(),
            StoredAccount { identity, claims },
        );
    }
}

#[async_trait]
impl IdentityProvider for InMemoryIdentityProvider {
    async fn resolve_identity(&self, selector: &IdentitySelector) -> AppResult<UserIdentity> {
        let accounts = self.accounts.read().await;
        let found = match selector {
            IdentitySelector::Uid(uid) => accounts.get(uid),
            IdentitySelector::Email(email) => accounts.values().find(|account| {
                account
                    .identity
                    .email()
                    .is_some_and(|stored| stored.eq_ignore_ascii_case(email))
            }),
        };

        found
            .map(|account| account.identity.clone())
            .ok_or_else(|| AppError::IdentityResolution(format!("no account matches {selector}")))
    }

    async fn custom_claims(&self, uid: &str) -> AppResult<CustomClaims> {
        let accounts = self.accounts.read().await;
        let account = accounts
            .get(uid)
            .ok_or_else(|| AppError::IdentityResolution(format!("no account with uid '{uid}'")))?;

        Ok(account.claims.clone().unwrap_or_default())
    }

    async fn set_custom_claims(&self, uid: &str, claims: &CustomClaims) -> AppResult<()> {
        let mut accounts = self.accounts.write().await;
        let account = accounts
            .get_mut(uid)
            .ok_or_else(|| AppError::IdentityResolution(format!("no account with uid '{uid}'")))?;

        account.claims = Some(claims.clone());
        Ok(())
    }
}

/// Permission document source serving a fixed wire document.
#[derive(Debug)]
pub struct InMemoryPermissionDocumentSource {
    document: RwLock<Option<Value>>,
}

impl InMemoryPermissionDocumentSource {
    /// Creates a source serving `document`.
    #[must_use]
    pub fn new(document: Value) -> Self {
        Self {
            document: RwLock::new(Some(document)),
        }
    }

    /// Creates a source that has no document.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            document: RwLock::new(None),
        }
    }

    /// Replaces the served document.
    pub async fn replace(&self, document: Value) {
        *self.document.write().await = Some(document);
    }
}

#[async_trait]
impl PermissionDocumentSource for InMemoryPermissionDocumentSource {
    async fn fetch_permission_document(&self) -> AppResult<Value> {
        self.document
            .read()
            .await
            .clone()
            .ok_or_else(|| AppError::NotFound("permission document".to_owned()))
    }
}
