//! Singleton provisioning task with a bounded handshake.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use super::{NetworkLink, ProvisioningError, ProvisioningMode};
use crate::config::ProvisioningConfig;

/// Run one handshake on `link`, giving up after `timeout`.
pub async fn run_provisioning(
    link: &dyn NetworkLink,
    mode: ProvisioningMode,
    timeout: Duration,
) -> Result<(), ProvisioningError> {
    match tokio::time::timeout(timeout, link.provision(mode)).await {
        Ok(result) => result,
        Err(_) => Err(ProvisioningError::Timeout(timeout)),
    }
}

/// Owns the at-most-one provisioning task.
pub struct Provisioner {
    link: Arc<dyn NetworkLink>,
    config: ProvisioningConfig,
    runtime: Handle,
    /// `Some` while a task is in progress.
    slot: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl Provisioner {
    pub fn new(link: Arc<dyn NetworkLink>, config: ProvisioningConfig, runtime: Handle) -> Self {
        Self {
            link,
            config,
            runtime,
            slot: Arc::new(Mutex::new(None)),
        }
    }

    pub fn is_running(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Spawn the provisioning task unless one is already running.
    ///
    /// # Errors
    ///
    /// [`ProvisioningError::AlreadyRunning`] when the slot is taken; no new
    /// task is created.
    pub fn try_spawn(&self) -> Result<(), ProvisioningError> {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            log::warn!("provisioning: task already running, ignoring request");
            return Err(ProvisioningError::AlreadyRunning);
        }

        let link = Arc::clone(&self.link);
        let task_slot = Arc::clone(&self.slot);
        let mode = self.config.mode;
        let timeout = self.config.timeout();

        log::info!("provisioning: starting {mode:?} handshake ({timeout:?} timeout)");
        // The task cannot clear the slot before this guard is released, so
        // the handle below is always stored first.
        *slot = Some(self.runtime.spawn(async move {
            match run_provisioning(link.as_ref(), mode, timeout).await {
                Ok(()) => log::info!("provisioning: network configured"),
                Err(e) => log::error!("provisioning: {e}"),
            }
            *task_slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
        }));
        Ok(())
    }
}
