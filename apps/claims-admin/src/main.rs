//! Operator tool that reconciles role claims and evaluates site permissions.

#![forbid(unsafe_code)]

mod commands;
mod config;
mod input;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use sitegate_core::{AppResult, IdentitySelector};
use tracing::error;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "sitegate-claims",
    version,
    about = "Reconcile role claims with profile records and check site permissions"
)]
struct Cli {
    /// Identity provider project that owns the accounts.
    #[arg(long, global = true, env = "IDENTITY_PROJECT_ID")]
    project_id: Option<String>,

    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Give an account the global super-admin role.
    GrantSuperAdmin {
        #[command(flatten)]
        identity: IdentityArgs,
        /// Write the changes instead of printing them.
        #[arg(long)]
        apply: bool,
    },

    /// Take the global super-admin role away from an account.
    RevokeSuperAdmin {
        #[command(flatten)]
        identity: IdentityArgs,
        /// Write the changes instead of printing them.
        #[arg(long)]
        apply: bool,
    },

    /// Re-derive an account's claims from its profile record.
    RebuildClaims {
        #[command(flatten)]
        identity: IdentityArgs,
        /// Write the changes instead of printing them.
        #[arg(long)]
        apply: bool,
    },

    /// Make accounts site admins of the named sites.
    AssignSiteAdmins(AssignSiteAdminsArgs),

    /// Report drift between profile roles, claims and the claims mirror.
    Inspect {
        #[command(flatten)]
        identity: IdentityArgs,
    },

    /// Evaluate one permission for an account against the stored matrix.
    Check(CheckArgs),
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct IdentityArgs {
    /// Account uid.
    #[arg(long)]
    uid: Option<String>,
    /// Account email.
    #[arg(long)]
    email: Option<String>,
}

impl IdentityArgs {
    fn selector(self) -> AppResult<IdentitySelector> {
        IdentitySelector::from_parts(self.uid, self.email)
    }
}

#[derive(Args)]
struct AssignSiteAdminsArgs {
    /// Account uid.
    #[arg(long, conflicts_with_all = ["email", "input"])]
    uid: Option<String>,
    /// Account email.
    #[arg(long, conflicts_with = "input")]
    email: Option<String>,
    /// Site display name; repeat for several sites.
    #[arg(long = "site", value_name = "NAME", conflicts_with = "input")]
    sites: Vec<String>,
    /// JSON file with `[{ "uid" | "email", "sites": [...] }]` entries.
    #[arg(long, value_name = "FILE")]
    input: Option<PathBuf>,
    /// Write the changes instead of printing them.
    #[arg(long)]
    apply: bool,
}

#[derive(Args)]
struct CheckArgs {
    #[command(flatten)]
    identity: IdentityArgs,
    /// Site the action targets.
    #[arg(long)]
    site: String,
    /// Resource name, e.g. `users`.
    #[arg(long)]
    resource: String,
    /// Action name, e.g. `delete`.
    #[arg(long)]
    action: String,
    /// Optional sub-resource, e.g. `schools`.
    #[arg(long)]
    sub_resource: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match commands::run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            error!(error = %error, "sitegate-claims failed");
            eprintln!("error: {error}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}
