use std::sync::Arc;

use serde::Serialize;
use sitegate_application::{
    AuthorizationFrontDoor, ClaimsSyncService, IdentityProvider, PermissionMatrixLoader,
    PermissionService, PermissionServiceConfig, SessionState, SiteAdminAssignment, SyncMode,
};
use sitegate_core::{AppError, AppResult, IdentitySelector};
use sitegate_domain::{AuthenticatedUser, PermissionMatrix};
use sitegate_infrastructure::{
    IdentityToolkitConfig, IdentityToolkitProvider, InMemoryTtlCache,
    PostgresClaimsMirrorRepository, PostgresPermissionDocumentSource, PostgresProfileRepository,
    PostgresSiteDirectory,
};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};

use crate::config::ClaimsAdminConfig;
use crate::input::read_assignments;
use crate::{AssignSiteAdminsArgs, CheckArgs, Cli, Command};

struct Runtime {
    pool: PgPool,
    identity_provider: Arc<dyn IdentityProvider>,
    config: ClaimsAdminConfig,
}

impl Runtime {
    async fn connect(project_id: Option<String>) -> AppResult<Self> {
        let project_id = project_id
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty())
            .ok_or_else(|| {
                AppError::Validation(
                    "--project-id (or IDENTITY_PROJECT_ID) is required".to_owned(),
                )
            })?;
        let config = ClaimsAdminConfig::load()?;

        let pool = PgPoolOptions::new()
            .max_connections(2)
            .connect(config.database_url.as_str())
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to connect to database: {error}"))
            })?;

        let identity_provider = Arc::new(IdentityToolkitProvider::new(IdentityToolkitConfig {
            base_url: config.identity_api_base_url.clone(),
            project_id: project_id.clone(),
            access_token: config.identity_access_token.clone(),
            timeout: config.identity_http_timeout,
        })?);

        info!(
            project_id = %project_id,
            identity_api_base_url = %config.identity_api_base_url,
            "sitegate-claims connected"
        );

        Ok(Self {
            pool,
            identity_provider,
            config,
        })
    }

    fn claims_sync_service(&self) -> ClaimsSyncService {
        ClaimsSyncService::new(
            Arc::clone(&self.identity_provider),
            Arc::new(PostgresProfileRepository::new(self.pool.clone())),
            Arc::new(PostgresClaimsMirrorRepository::new(self.pool.clone())),
            Arc::new(PostgresSiteDirectory::new(self.pool.clone())),
        )
    }

    fn permission_service(&self) -> PermissionService {
        PermissionService::new(
            PermissionMatrixLoader::new(Arc::new(PostgresPermissionDocumentSource::new(
                self.pool.clone(),
            ))),
            Arc::new(InMemoryTtlCache::<Arc<PermissionMatrix>>::new()),
            PermissionServiceConfig {
                cache_ttl: self.config.permissions_cache_ttl,
                ..PermissionServiceConfig::default()
            },
        )
    }
}

pub async fn run(cli: Cli) -> AppResult<()> {
    let runtime = Runtime::connect(cli.project_id).await?;

    match cli.command {
        Command::GrantSuperAdmin { identity, apply } => {
            let change_set = runtime
                .claims_sync_service()
                .grant_super_admin(&identity.selector()?, sync_mode(apply))
                .await?;
            print_json(&change_set)
        }
        Command::RevokeSuperAdmin { identity, apply } => {
            let change_set = runtime
                .claims_sync_service()
                .revoke_super_admin(&identity.selector()?, sync_mode(apply))
                .await?;
            print_json(&change_set)
        }
        Command::RebuildClaims { identity, apply } => {
            let change_set = runtime
                .claims_sync_service()
                .rebuild_custom_claims(&identity.selector()?, sync_mode(apply))
                .await?;
            print_json(&change_set)
        }
        Command::AssignSiteAdmins(args) => {
            let apply = args.apply;
            let assignments = site_admin_assignments(args)?;
            let change_sets = runtime
                .claims_sync_service()
                .assign_site_admins(&assignments, sync_mode(apply))
                .await?;
            print_json(&change_sets)
        }
        Command::Inspect { identity } => {
            let report = runtime
                .claims_sync_service()
                .inspect(&identity.selector()?)
                .await?;
            if report.has_drift() {
                warn!(uid = %report.uid, "claims drift detected");
            }
            print_json(&report)
        }
        Command::Check(args) => run_check(&runtime, args).await,
    }
}

async fn run_check(runtime: &Runtime, args: CheckArgs) -> AppResult<()> {
    let selector = args.identity.selector()?;
    let identity = runtime.identity_provider.resolve_identity(&selector).await?;
    let claims = runtime.identity_provider.custom_claims(identity.uid()).await?;
    let user = AuthenticatedUser::from_claims(identity.uid(), &claims);

    let front_door = AuthorizationFrontDoor::new(
        Arc::new(runtime.permission_service()),
        SessionState::signed_in(user, true),
    )
    .await;
    if !front_door.permissions_loaded() {
        warn!("permission matrix is unavailable; every check denies");
    }

    let allowed = front_door.can(
        Some(args.site.as_str()),
        args.resource.as_str(),
        args.action.as_str(),
        args.sub_resource.as_deref(),
    );
    println!("{}", if allowed { "allow" } else { "deny" });
    Ok(())
}

fn site_admin_assignments(args: AssignSiteAdminsArgs) -> AppResult<Vec<SiteAdminAssignment>> {
    if let Some(path) = args.input {
        return read_assignments(&path);
    }

    if args.sites.is_empty() {
        return Err(AppError::Validation(
            "pass at least one --site or an --input file".to_owned(),
        ));
    }

    Ok(vec![SiteAdminAssignment {
        identity: IdentitySelector::from_parts(args.uid, args.email)?,
        site_names: args.sites,
    }])
}

fn sync_mode(apply: bool) -> SyncMode {
    if apply {
        SyncMode::Apply
    } else {
        SyncMode::DryRun
    }
}

fn print_json<T: Serialize>(value: &T) -> AppResult<()> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|error| AppError::Internal(format!("failed to render output: {error}")))?;
    println!("{rendered}");
    Ok(())
}
