//! Shared application state.
//!
//! One [`AppState`] is built by the composition root and handed to every
//! handler. It owns every stateful component, so tests can build as many
//! independent instances as they like.

use std::sync::Arc;

use tracing::warn;

use cronvault_core::{Config, MutationQueue};
use cronvault_jobs::{BackupIdentityRegistry, DumpRunner, FileJobCoordinator, JobCoordinator};
use cronvault_schedule::{BackupPlan, CrontabProjector, CrontabSettings, PlanError, VaultAvailability};
use cronvault_vault::CredentialVault;

pub struct AppState {
    pub config: Config,
    pub vault: CredentialVault,
    pub registry: BackupIdentityRegistry,
    pub coordinator: Arc<dyn JobCoordinator>,
    pub runner: DumpRunner,
    pub projector: CrontabProjector,
    /// Serializes plan read-modify-write cycles and crontab regeneration.
    pub plan_queue: MutationQueue,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let coordinator: Arc<dyn JobCoordinator> =
            Arc::new(FileJobCoordinator::new(config.storage.run_dir()));
        Self::with_coordinator(config, coordinator)
    }

    pub fn with_coordinator(config: Config, coordinator: Arc<dyn JobCoordinator>) -> Self {
        Self {
            vault: CredentialVault::from_config(&config.vault),
            registry: BackupIdentityRegistry::new(config.storage.identity_file()),
            runner: DumpRunner::new(&config.jobs.dump_command, &config.storage.backup_dir)
                .with_log_dir(&config.jobs.log_dir),
            projector: CrontabProjector::new(CrontabSettings::from_config(&config)),
            plan_queue: MutationQueue::new(),
            coordinator,
            config,
        }
    }

    pub fn load_plan(&self) -> Result<BackupPlan, PlanError> {
        BackupPlan::load(&self.config.storage.plan_file())
    }

    pub async fn vault_availability(&self) -> VaultAvailability {
        if !self.vault.is_enabled() {
            return VaultAvailability::Disabled;
        }
        match self.vault.list().await {
            Ok(names) => VaultAvailability::Available(names),
            Err(_) => VaultAvailability::Failing,
        }
    }

    /// Rewrite the job table from the persisted plan and current vault contents.
    ///
    /// Called after every plan or password change. Failures are logged, never
    /// surfaced: the change that triggered the rewrite has already been saved.
    pub async fn regenerate_crontab(&self) {
        let _turn = self.plan_queue.enter().await;
        self.regenerate_crontab_locked().await;
    }

    /// Same as [`regenerate_crontab`](Self::regenerate_crontab), for callers
    /// already holding a plan queue turn.
    pub async fn regenerate_crontab_locked(&self) {
        let plan = match self.load_plan() {
            Ok(plan) => plan,
            Err(e) => {
                warn!(error = %e, "cannot regenerate job table: plan unreadable");
                return;
            }
        };
        let vault = self.vault_availability().await;
        if let Err(e) = self
            .projector
            .project(&plan, &vault, &self.config.storage.crontab_file())
        {
            warn!(error = %e, "failed to write job table");
        }
    }
}
