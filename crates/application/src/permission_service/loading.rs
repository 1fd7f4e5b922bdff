use std::sync::Arc;

use serde_json::Value;
use sitegate_core::{AppError, AppResult};
use sitegate_domain::PermissionMatrix;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::{PermissionLoadOutcome, PermissionService};

enum LoadTicket {
    Ready,
    Wait(watch::Receiver<Option<bool>>),
    Lead {
        generation: u64,
        done: watch::Sender<Option<bool>>,
    },
}

impl PermissionService {
    /// Validates a decoded document and installs it as the active matrix.
    ///
    /// A rejected document leaves the previous matrix in place.
    pub fn load_permissions(&self, document: &Value) -> PermissionLoadOutcome {
        match PermissionMatrix::from_document(document) {
            Ok(matrix) => {
                info!(
                    version = %matrix.version(),
                    rules = matrix.len(),
                    "permission matrix installed"
                );
                self.write_slot().matrix = Some(Arc::new(matrix));
                PermissionLoadOutcome {
                    success: true,
                    errors: Vec::new(),
                }
            }
            Err(errors) => {
                for error in &errors {
                    warn!(validation_error = %error, "permission document rejected");
                }
                PermissionLoadOutcome {
                    success: false,
                    errors,
                }
            }
        }
    }

    /// Loads the matrix once, sharing a running load with concurrent callers.
    ///
    /// Returns whether a matrix is installed when the load settles. Failures
    /// are logged and leave the service unloaded, so checks keep denying.
    pub async fn ensure_loaded(&self) -> bool {
        let (generation, done) = match self.take_ticket() {
            LoadTicket::Ready => return true,
            LoadTicket::Wait(receiver) => return wait_for_load(receiver).await,
            LoadTicket::Lead { generation, done } => (generation, done),
        };

        let fetched = self.fetch_matrix().await;

        let loaded = {
            let mut slot = self.write_slot();
            if slot.generation != generation {
                debug!("discarding permission load superseded by reset");
                false
            } else {
                slot.in_flight = None;
                match fetched {
                    Ok(matrix) => {
                        slot.matrix = Some(matrix);
                        true
                    }
                    Err(error) => {
                        warn!(error = %error, "permission matrix load failed");
                        false
                    }
                }
            }
        };

        let _ = done.send(Some(loaded));
        loaded
    }

    /// Drops the installed matrix and abandons any running load.
    pub fn reset(&self) {
        let mut slot = self.write_slot();
        slot.generation = slot.generation.wrapping_add(1);
        slot.matrix = None;
        slot.in_flight = None;
        debug!(generation = slot.generation, "permission service reset");
    }

    fn take_ticket(&self) -> LoadTicket {
        let mut slot = self.write_slot();
        if slot.matrix.is_some() {
            return LoadTicket::Ready;
        }

        if let Some(receiver) = slot.in_flight.as_ref() {
            // A leader dropped before settling leaves a closed channel behind.
            if receiver.has_changed().is_ok() {
                return LoadTicket::Wait(receiver.clone());
            }
        }

        let (done, receiver) = watch::channel(None);
        slot.in_flight = Some(receiver);
        LoadTicket::Lead {
            generation: slot.generation,
            done,
        }
    }

    async fn fetch_matrix(&self) -> AppResult<Arc<PermissionMatrix>> {
        let cache_key = self.config.cache_key.as_str();
        if let Some(matrix) = self.cache.get(cache_key).await? {
            debug!(cache_key, version = %matrix.version(), "permission matrix cache hit");
            return Ok(matrix);
        }

        let document = self.loader.load().await?;
        let matrix = PermissionMatrix::from_document(&document).map_err(|errors| {
            for error in &errors {
                warn!(validation_error = %error, "permission document rejected");
            }
            AppError::Validation(format!(
                "permission document is invalid: {}",
                errors.join("; ")
            ))
        })?;
        let matrix = Arc::new(matrix);

        if let Err(error) = self
            .cache
            .set(cache_key, Arc::clone(&matrix), self.config.cache_ttl)
            .await
        {
            warn!(error = %error, "failed to cache permission matrix");
        }

        info!(
            version = %matrix.version(),
            rules = matrix.len(),
            "permission matrix loaded"
        );
        Ok(matrix)
    }
}

async fn wait_for_load(mut receiver: watch::Receiver<Option<bool>>) -> bool {
    match receiver.wait_for(Option::is_some).await {
        Ok(settled) => {
            let loaded = *settled;
            loaded.unwrap_or(false)
        }
        Err(_) => false,
    }
}
