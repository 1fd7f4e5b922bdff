use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use sitegate_domain::PermissionMatrix;
use tokio::sync::watch;

use crate::{PermissionMatrixLoader, TtlCache};

mod checks;
mod loading;


/// Default lifetime of a cached permission matrix.
pub const DEFAULT_PERMISSIONS_CACHE_TTL: Duration = Duration::from_millis(300_000);

/// Default cache key of the permission matrix.
pub const DEFAULT_PERMISSIONS_CACHE_KEY: &str = "permissions:matrix";

/// Tunables of [`PermissionService`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionServiceConfig {
    /// Cache key the compiled matrix is stored under.
    pub cache_key: String,
    /// Lifetime of the cached matrix.
    pub cache_ttl: Duration,
}

impl Default for PermissionServiceConfig {
    fn default() -> Self {
        Self {
            cache_key: DEFAULT_PERMISSIONS_CACHE_KEY.to_owned(),
            cache_ttl: DEFAULT_PERMISSIONS_CACHE_TTL,
        }
    }
}

/// Result of handing a document to [`PermissionService::load_permissions`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionLoadOutcome {
    /// Whether the document compiled and was installed.
    pub success: bool,
    /// Validation errors; empty on success.
    pub errors: Vec<String>,
}

/// Observable lifecycle of the permission matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionLoadState {
    /// Nothing loaded and no load running.
    NotLoaded,
    /// A load is running.
    Loading,
    /// A matrix is installed.
    Loaded,
}

#[derive(Default)]
struct MatrixSlot {
    generation: u64,
    matrix: Option<Arc<PermissionMatrix>>,
    in_flight: Option<watch::Receiver<Option<bool>>>,
}

/// Decides whether an authenticated user may perform an action at a site.
///
/// Every check denies until a matrix is loaded. Loads are single-flight and a
/// [`PermissionService::reset`] discards any load still running.
pub struct PermissionService {
    loader: PermissionMatrixLoader,
    cache: Arc<dyn TtlCache<Arc<PermissionMatrix>>>,
    config: PermissionServiceConfig,
    slot: RwLock<MatrixSlot>,
}

impl PermissionService {
    /// Creates an unloaded permission service.
    #[must_use]
    pub fn new(
        loader: PermissionMatrixLoader,
        cache: Arc<dyn TtlCache<Arc<PermissionMatrix>>>,
        config: PermissionServiceConfig,
    ) -> Self {
        Self {
            loader,
            cache,
            config,
            slot: RwLock::new(MatrixSlot::default()),
        }
    }

    /// Returns the current load state.
    #[must_use]
    pub fn load_state(&self) -> PermissionLoadState {
        let slot = self.read_slot();
        if slot.matrix.is_some() {
            PermissionLoadState::Loaded
        } else if slot
            .in_flight
            .as_ref()
            .is_some_and(|receiver| receiver.has_changed().is_ok())
        {
            PermissionLoadState::Loading
        } else {
            PermissionLoadState::NotLoaded
        }
    }

    /// Returns whether a matrix is installed.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.read_slot().matrix.is_some()
    }

    /// Returns the installed matrix.
    #[must_use]
    pub fn matrix(&self) -> Option<Arc<PermissionMatrix>> {
        self.read_slot().matrix.clone()
    }

    fn read_slot(&self) -> RwLockReadGuard<'_, MatrixSlot> {
        self.slot.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_slot(&self) -> RwLockWriteGuard<'_, MatrixSlot> {
        self.slot.write().unwrap_or_else(PoisonError::into_inner)
    }
}
