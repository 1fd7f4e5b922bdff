use sitegate_domain::{AuthenticatedUser, RoleName, has_minimum_role};
use tracing::debug;

use super::PermissionService;

#[derive(Debug, Clone, Copy)]
enum Denial {
    Unauthenticated,
    NotLoaded,
    MissingSite,
    NoRole,
    NoRule,
    InsufficientRole,
}

impl Denial {
    fn as_str(self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::NotLoaded => "permissions_not_loaded",
            Self::MissingSite => "missing_site",
            Self::NoRole => "no_role",
            Self::NoRule => "no_matching_rule",
            Self::InsufficientRole => "insufficient_role",
        }
    }
}

impl PermissionService {
    /// Returns whether `user` may perform `action` on `resource` at `site_id`.
    ///
    /// Super admins pass once a matrix is loaded. Everyone else needs a role at
    /// the site at least as high as the rule's minimum; a missing rule denies.
    #[must_use]
    pub fn can_perform_site_action(
        &self,
        user: Option<&AuthenticatedUser>,
        site_id: &str,
        resource: &str,
        action: &str,
        sub_resource: Option<&str>,
    ) -> bool {
        let decision = self.decide_site_action(user, site_id, resource, action, sub_resource);
        settle(decision, user, Some(site_id), resource, action)
    }

    /// Returns whether `user` may perform an action regardless of site.
    ///
    /// Any role held anywhere that meets the rule's minimum passes.
    #[must_use]
    pub fn can_perform_global_action(
        &self,
        user: Option<&AuthenticatedUser>,
        resource: &str,
        action: &str,
        sub_resource: Option<&str>,
    ) -> bool {
        let decision = self.decide_global_action(user, resource, action, sub_resource);
        settle(decision, user, None, resource, action)
    }

    /// Returns whether `user` holds at least `required` at `site_id`, or at any
    /// site when `site_id` is `None`.
    #[must_use]
    pub fn has_role(
        &self,
        user: Option<&AuthenticatedUser>,
        site_id: Option<&str>,
        required: &RoleName,
    ) -> bool {
        let Some(user) = user else {
            return false;
        };
        if !self.is_loaded() {
            return false;
        }
        if user.is_super_admin() {
            return true;
        }

        let actual = match site_id {
            Some(site_id) => user.site_role(site_id),
            None => user.highest_role(),
        };
        actual.is_some_and(|actual| has_minimum_role(actual, required))
    }

    /// Returns the highest role `user` holds at `site_id`.
    #[must_use]
    pub fn get_user_site_role<'a>(
        user: &'a AuthenticatedUser,
        site_id: &str,
    ) -> Option<&'a RoleName> {
        user.site_role(site_id)
    }

    fn decide_site_action(
        &self,
        user: Option<&AuthenticatedUser>,
        site_id: &str,
        resource: &str,
        action: &str,
        sub_resource: Option<&str>,
    ) -> Result<(), Denial> {
        let user = user.ok_or(Denial::Unauthenticated)?;
        let matrix = self.matrix().ok_or(Denial::NotLoaded)?;
        if site_id.trim().is_empty() {
            return Err(Denial::MissingSite);
        }
        if user.is_super_admin() {
            return Ok(());
        }

        let actual = user.site_role(site_id).ok_or(Denial::NoRole)?;
        let required = matrix
            .minimum_role(resource, action, sub_resource)
            .ok_or(Denial::NoRule)?;

        if has_minimum_role(actual, required) {
            Ok(())
        } else {
            Err(Denial::InsufficientRole)
        }
    }

    fn decide_global_action(
        &self,
        user: Option<&AuthenticatedUser>,
        resource: &str,
        action: &str,
        sub_resource: Option<&str>,
    ) -> Result<(), Denial> {
        let user = user.ok_or(Denial::Unauthenticated)?;
        let matrix = self.matrix().ok_or(Denial::NotLoaded)?;
        if user.is_super_admin() {
            return Ok(());
        }

        let actual = user.highest_role().ok_or(Denial::NoRole)?;
        let required = matrix
            .minimum_role(resource, action, sub_resource)
            .ok_or(Denial::NoRule)?;

        if has_minimum_role(actual, required) {
            Ok(())
        } else {
            Err(Denial::InsufficientRole)
        }
    }
}

fn settle(
    decision: Result<(), Denial>,
    user: Option<&AuthenticatedUser>,
    site_id: Option<&str>,
    resource: &str,
    action: &str,
) -> bool {
    match decision {
        Ok(()) => true,
        Err(denial) => {
            debug!(
                uid = user.map(AuthenticatedUser::uid),
                site_id,
                resource,
                action,
                reason = denial.as_str(),
                "permission denied"
            );
            false
        }
    }
}
