use std::collections::BTreeMap;

use sitegate_core::{AppError, AppResult, IdentitySelector};
use sitegate_domain::{RoleName, UserRole, union_role};
use tracing::debug;

use super::{
    AccountSnapshot, ClaimsChangeSet, ClaimsOperation, ClaimsSyncService, PlannedState, SyncMode,
    plan_change_set, sanitize_roles,
};
use crate::SiteRecord;

/// One account and the sites it should administer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteAdminAssignment {
    /// Account to update.
    pub identity: IdentitySelector,
    /// Display names of the sites.
    pub site_names: Vec<String>,
}

impl ClaimsSyncService {
    /// Grants `site_admin` at every named site to every listed account.
    ///
    /// All identities, sites and records are resolved and every change set is
    /// verified before the first write, so one bad entry aborts the batch.
    /// Entries naming the same account are merged.
    pub async fn assign_site_admins(
        &self,
        assignments: &[SiteAdminAssignment],
        mode: SyncMode,
    ) -> AppResult<Vec<ClaimsChangeSet>> {
        if assignments.is_empty() {
            return Err(AppError::Validation(
                "at least one site admin assignment is required".to_owned(),
            ));
        }

        let sites = self.resolve_sites(assignments).await?;

        let mut accounts: Vec<(AccountSnapshot, Vec<SiteRecord>)> = Vec::new();
        for assignment in assignments {
            let snapshot = self.load_snapshot(&assignment.identity).await?;
            let assigned: Vec<SiteRecord> = assignment
                .site_names
                .iter()
                .filter_map(|name| sites.get(name.trim()).cloned())
                .collect();

            match accounts
                .iter_mut()
                .find(|(existing, _)| existing.identity.uid() == snapshot.identity.uid())
            {
                Some((_, existing_sites)) => existing_sites.extend(assigned),
                None => accounts.push((snapshot, assigned)),
            }
        }

        let mut change_sets = Vec::with_capacity(accounts.len());
        for (snapshot, sites) in accounts {
            let planned = plan_site_admins(&snapshot, &sites);
            change_sets.push(plan_change_set(
                ClaimsOperation::AssignSiteAdmins,
                snapshot,
                planned,
            )?);
        }

        for change_set in &mut change_sets {
            self.commit(change_set, mode).await?;
        }

        Ok(change_sets)
    }

    async fn resolve_sites(
        &self,
        assignments: &[SiteAdminAssignment],
    ) -> AppResult<BTreeMap<String, SiteRecord>> {
        let mut sites = BTreeMap::new();

        for assignment in assignments {
            if assignment.site_names.is_empty() {
                return Err(AppError::Validation(format!(
                    "site admin assignment for {} names no sites",
                    assignment.identity
                )));
            }

            for name in &assignment.site_names {
                let name = name.trim();
                if name.is_empty() {
                    return Err(AppError::Validation(
                        "site name must not be empty".to_owned(),
                    ));
                }
                if sites.contains_key(name) {
                    continue;
                }

                let mut matches = self.site_directory.find_sites_by_name(name).await?;
                let site = match matches.len() {
                    0 => return Err(AppError::NotFound(format!("site named '{name}'"))),
                    1 => matches.remove(0),
                    count => {
                        return Err(AppError::Conflict(format!(
                            "site name '{name}' matches {count} sites"
                        )));
                    }
                };

                debug!(site_name = %name, site_id = %site.site_id, "resolved site");
                sites.insert(name.to_owned(), site);
            }
        }

        Ok(sites)
    }
}

fn plan_site_admins(snapshot: &AccountSnapshot, sites: &[SiteRecord]) -> PlannedState {
    let mut profile_roles = snapshot.profile_roles.clone();
    for site in sites {
        union_role(
            &mut profile_roles,
            UserRole {
                site_id: site.site_id.clone(),
                role: RoleName::SiteAdmin,
                site_name: site.name.clone(),
            },
        );
    }

    let mut claims = snapshot
        .claims
        .clone()
        .with_roles(sanitize_roles(snapshot.identity.uid(), &profile_roles));
    if !claims.admin && claims.roles.iter().any(|entry| entry.role.implies_admin()) {
        claims.admin = true;
    }

    PlannedState {
        claims,
        profile_roles,
    }
}
