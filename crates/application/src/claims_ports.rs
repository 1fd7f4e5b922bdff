mod identity;
mod repositories;

pub use identity::IdentityProvider;
pub use repositories::{
    ClaimsMirrorEntry, ClaimsMirrorRepository, ProfileRepository, SiteDirectory, SiteRecord,
};
