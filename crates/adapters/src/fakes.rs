// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scriptable fake collaborators for tests.
//!
//! Every fake records its calls as `"method:resource-id"` strings and can be
//! scripted per method to fail transiently or terminally. Defaults are the
//! happy path: generous cluster resources, workloads instantly stable,
//! secrets present, deletions confirmed.

use crate::cloud::{CloudClient, CloudError};
use crate::events::{EventError, EventProducer};
use crate::operators::{BackupOperator, DbMigrationOperator, OperatorError, RestoreOperator};
use crate::provisioner::{ClusterResources, Provisioner, ProvisionerError, ResourceState};
use async_trait::async_trait;
use gantry_core::{
    Cluster, ClusterInstallation, ClusterInstallationState, ClusterState, DataResidence,
    DatabaseKind, Installation, InstallationBackup, InstallationDbMigrationOperation,
    InstallationDbRestorationOperation, InstallationState,
};
use parking_lot::Mutex;
use std::collections::HashMap;

#[derive(Clone)]
struct Failure {
    terminal: bool,
    message: String,
}

/// Per-method failure scripting shared by the fakes.
#[derive(Default)]
struct FailureScript {
    failures: Mutex<HashMap<String, Failure>>,
}

impl FailureScript {
    fn set(&self, method: &str, terminal: bool, message: &str) {
        self.failures.lock().insert(
            method.to_string(),
            Failure { terminal, message: message.to_string() },
        );
    }

    fn clear(&self, method: &str) {
        self.failures.lock().remove(method);
    }

    fn get(&self, method: &str) -> Option<Failure> {
        self.failures.lock().get(method).cloned()
    }
}

/// Call recorder shared by the fakes.
#[derive(Default)]
struct CallLog {
    calls: Mutex<Vec<String>>,
}

impl CallLog {
    fn record(&self, method: &str, id: &str) {
        self.calls.lock().push(format!("{method}:{id}"));
    }

    fn all(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn count(&self, method: &str) -> usize {
        let prefix = format!("{method}:");
        self.calls.lock().iter().filter(|c| c.starts_with(&prefix)).count()
    }
}

/// Fake [`Provisioner`] with per-method failure scripting.
pub struct FakeProvisioner {
    log: CallLog,
    script: FailureScript,
    resource_state: Mutex<ResourceState>,
    cluster_resources: Mutex<ClusterResources>,
    deletion_complete: Mutex<bool>,
    matches_config: Mutex<bool>,
    lb_endpoint: Mutex<String>,
}

impl FakeProvisioner {
    pub fn new() -> Self {
        Self {
            log: CallLog::default(),
            script: FailureScript::default(),
            resource_state: Mutex::new(ResourceState { ready: true, stable: true }),
            cluster_resources: Mutex::new(ClusterResources {
                milli_total_cpu: 100_000,
                milli_used_cpu: 0,
                milli_total_memory: 1_000_000_000,
                milli_used_memory: 0,
                total_pod_count: 10_000,
                used_pod_count: 0,
            }),
            deletion_complete: Mutex::new(true),
            matches_config: Mutex::new(true),
            lb_endpoint: Mutex::new("lb.example.test".to_string()),
        }
    }

    /// Script `method` to fail until cleared. Terminal failures map to the
    /// resource's failed state, transient ones to a retry.
    pub fn fail_with(&self, method: &str, terminal: bool, message: &str) {
        self.script.set(method, terminal, message);
    }

    pub fn clear_failure(&self, method: &str) {
        self.script.clear(method);
    }

    pub fn set_resource_state(&self, ready: bool, stable: bool) {
        *self.resource_state.lock() = ResourceState { ready, stable };
    }

    pub fn set_cluster_resources(&self, resources: ClusterResources) {
        *self.cluster_resources.lock() = resources;
    }

    pub fn set_deletion_complete(&self, complete: bool) {
        *self.deletion_complete.lock() = complete;
    }

    pub fn set_matches_config(&self, matches: bool) {
        *self.matches_config.lock() = matches;
    }

    pub fn calls(&self) -> Vec<String> {
        self.log.all()
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.log.count(method)
    }

    fn check(&self, method: &str, id: &str) -> Result<(), ProvisionerError> {
        self.log.record(method, id);
        match self.script.get(method) {
            Some(Failure { terminal: true, message }) => Err(ProvisionerError::Terminal(message)),
            Some(Failure { terminal: false, message }) => {
                Err(ProvisionerError::Transient(message))
            }
            None => Ok(()),
        }
    }
}

impl Default for FakeProvisioner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Provisioner for FakeProvisioner {
    async fn create_cluster_installation(
        &self,
        _cluster: &Cluster,
        _installation: &Installation,
        cluster_installation: &ClusterInstallation,
    ) -> Result<(), ProvisionerError> {
        self.check("create_cluster_installation", cluster_installation.id.as_str())
    }

    async fn ensure_cluster_installation(
        &self,
        _cluster: &Cluster,
        _installation: &Installation,
        cluster_installation: &ClusterInstallation,
    ) -> Result<(), ProvisionerError> {
        self.check("ensure_cluster_installation", cluster_installation.id.as_str())
    }

    async fn delete_cluster_installation(
        &self,
        _cluster: &Cluster,
        cluster_installation: &ClusterInstallation,
    ) -> Result<bool, ProvisionerError> {
        self.check("delete_cluster_installation", cluster_installation.id.as_str())?;
        Ok(*self.deletion_complete.lock())
    }

    async fn hibernate_cluster_installation(
        &self,
        _cluster: &Cluster,
        _installation: &Installation,
        cluster_installation: &ClusterInstallation,
    ) -> Result<(), ProvisionerError> {
        self.check("hibernate_cluster_installation", cluster_installation.id.as_str())
    }

    async fn is_resource_ready_and_stable(
        &self,
        _cluster: &Cluster,
        cluster_installation: &ClusterInstallation,
    ) -> Result<ResourceState, ProvisionerError> {
        self.check("is_resource_ready_and_stable", cluster_installation.id.as_str())?;
        Ok(*self.resource_state.lock())
    }

    async fn verify_matches_config(
        &self,
        _cluster: &Cluster,
        _installation: &Installation,
        cluster_installation: &ClusterInstallation,
    ) -> Result<bool, ProvisionerError> {
        self.check("verify_matches_config", cluster_installation.id.as_str())?;
        Ok(*self.matches_config.lock())
    }

    async fn ensure_cr_migrated(
        &self,
        _cluster: &Cluster,
        installation: &Installation,
    ) -> Result<bool, ProvisionerError> {
        self.check("ensure_cr_migrated", installation.id.as_str())?;
        Ok(true)
    }

    async fn refresh_secrets(
        &self,
        _cluster: &Cluster,
        _installation: &Installation,
        cluster_installation: &ClusterInstallation,
    ) -> Result<(), ProvisionerError> {
        self.check("refresh_secrets", cluster_installation.id.as_str())
    }

    async fn prepare_cluster_utilities(
        &self,
        cluster: &Cluster,
        _installation: &Installation,
    ) -> Result<(), ProvisionerError> {
        self.check("prepare_cluster_utilities", cluster.id.as_str())
    }

    async fn delete_old_license_secrets(
        &self,
        _cluster: &Cluster,
        _installation: &Installation,
        cluster_installation: &ClusterInstallation,
    ) -> Result<(), ProvisionerError> {
        self.check("delete_old_license_secrets", cluster_installation.id.as_str())
    }

    async fn get_cluster_resources(
        &self,
        cluster: &Cluster,
    ) -> Result<ClusterResources, ProvisionerError> {
        self.check("get_cluster_resources", cluster.id.as_str())?;
        Ok(*self.cluster_resources.lock())
    }

    async fn get_public_load_balancer_endpoint(
        &self,
        cluster: &Cluster,
    ) -> Result<String, ProvisionerError> {
        self.check("get_public_load_balancer_endpoint", cluster.id.as_str())?;
        Ok(self.lb_endpoint.lock().clone())
    }
}

fn operator_failure(failure: Failure) -> OperatorError {
    if failure.terminal {
        OperatorError::BackoffLimitReached(failure.message)
    } else {
        OperatorError::Transient(failure.message)
    }
}

/// Fake [`BackupOperator`].
pub struct FakeBackupOperator {
    log: CallLog,
    script: FailureScript,
    status: Mutex<Option<u64>>,
    residence: Mutex<DataResidence>,
}

impl FakeBackupOperator {
    pub fn new() -> Self {
        Self {
            log: CallLog::default(),
            script: FailureScript::default(),
            status: Mutex::new(None),
            residence: Mutex::new(DataResidence {
                url: "s3://backups.example.test".to_string(),
                bucket: "backups".to_string(),
                path: "test".to_string(),
            }),
        }
    }

    pub fn fail_with(&self, method: &str, terminal: bool, message: &str) {
        self.script.set(method, terminal, message);
    }

    pub fn clear_failure(&self, method: &str) {
        self.script.clear(method);
    }

    /// Script the job's completion time; `None` keeps it running.
    pub fn set_status(&self, start_at: Option<u64>) {
        *self.status.lock() = start_at;
    }

    pub fn calls(&self) -> Vec<String> {
        self.log.all()
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.log.count(method)
    }

    fn check(&self, method: &str, id: &str) -> Result<(), OperatorError> {
        self.log.record(method, id);
        match self.script.get(method) {
            Some(failure) => Err(operator_failure(failure)),
            None => Ok(()),
        }
    }
}

impl Default for FakeBackupOperator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BackupOperator for FakeBackupOperator {
    async fn trigger_backup(
        &self,
        backup: &InstallationBackup,
        _installation: &Installation,
        _cluster: &Cluster,
    ) -> Result<DataResidence, OperatorError> {
        self.check("trigger_backup", backup.id.as_str())?;
        let mut residence = self.residence.lock().clone();
        residence.path = backup.id.as_str().to_string();
        Ok(residence)
    }

    async fn check_backup_status(
        &self,
        backup: &InstallationBackup,
        _cluster: &Cluster,
    ) -> Result<Option<u64>, OperatorError> {
        self.check("check_backup_status", backup.id.as_str())?;
        Ok(*self.status.lock())
    }

    async fn cleanup_backup(
        &self,
        backup: &InstallationBackup,
        _cluster: Option<&Cluster>,
    ) -> Result<(), OperatorError> {
        self.check("cleanup_backup", backup.id.as_str())
    }
}

/// Fake [`RestoreOperator`].
pub struct FakeRestoreOperator {
    log: CallLog,
    script: FailureScript,
    status: Mutex<Option<u64>>,
}

impl FakeRestoreOperator {
    pub fn new() -> Self {
        Self {
            log: CallLog::default(),
            script: FailureScript::default(),
            status: Mutex::new(None),
        }
    }

    pub fn fail_with(&self, method: &str, terminal: bool, message: &str) {
        self.script.set(method, terminal, message);
    }

    pub fn clear_failure(&self, method: &str) {
        self.script.clear(method);
    }

    /// Script the job's completion time; `None` keeps it running.
    pub fn set_status(&self, complete_at: Option<u64>) {
        *self.status.lock() = complete_at;
    }

    pub fn calls(&self) -> Vec<String> {
        self.log.all()
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.log.count(method)
    }

    fn check(&self, method: &str, id: &str) -> Result<(), OperatorError> {
        self.log.record(method, id);
        match self.script.get(method) {
            Some(failure) => Err(operator_failure(failure)),
            None => Ok(()),
        }
    }
}

impl Default for FakeRestoreOperator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RestoreOperator for FakeRestoreOperator {
    async fn trigger_restore(
        &self,
        restoration: &InstallationDbRestorationOperation,
        _installation: &Installation,
        _backup: &InstallationBackup,
        _cluster: &Cluster,
    ) -> Result<(), OperatorError> {
        self.check("trigger_restore", restoration.id.as_str())
    }

    async fn check_restore_status(
        &self,
        restoration: &InstallationDbRestorationOperation,
        _cluster: &Cluster,
    ) -> Result<Option<u64>, OperatorError> {
        self.check("check_restore_status", restoration.id.as_str())?;
        Ok(*self.status.lock())
    }

    async fn cleanup_restore_job(
        &self,
        restoration: &InstallationDbRestorationOperation,
        _cluster: &Cluster,
    ) -> Result<(), OperatorError> {
        self.check("cleanup_restore_job", restoration.id.as_str())
    }
}

/// Fake [`DbMigrationOperator`].
#[derive(Default)]
pub struct FakeDbMigrationOperator {
    log: CallLog,
    script: FailureScript,
}

impl FakeDbMigrationOperator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_with(&self, method: &str, terminal: bool, message: &str) {
        self.script.set(method, terminal, message);
    }

    pub fn clear_failure(&self, method: &str) {
        self.script.clear(method);
    }

    pub fn calls(&self) -> Vec<String> {
        self.log.all()
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.log.count(method)
    }

    fn check(&self, method: &str, id: &str) -> Result<(), OperatorError> {
        self.log.record(method, id);
        match self.script.get(method) {
            Some(failure) => Err(operator_failure(failure)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl DbMigrationOperator for FakeDbMigrationOperator {
    async fn migrate_out(
        &self,
        installation: &Installation,
        _source: DatabaseKind,
    ) -> Result<(), OperatorError> {
        self.check("migrate_out", installation.id.as_str())
    }

    async fn migrate_to(
        &self,
        installation: &Installation,
        _destination: DatabaseKind,
    ) -> Result<(), OperatorError> {
        self.check("migrate_to", installation.id.as_str())
    }

    async fn teardown_migrated(
        &self,
        installation: &Installation,
        _source: DatabaseKind,
    ) -> Result<(), OperatorError> {
        self.check("teardown_migrated", installation.id.as_str())
    }

    async fn rollback_migration(
        &self,
        installation: &Installation,
        _migration: &InstallationDbMigrationOperation,
    ) -> Result<(), OperatorError> {
        self.check("rollback_migration", installation.id.as_str())
    }
}

/// Fake [`CloudClient`].
pub struct FakeCloudClient {
    log: CallLog,
    script: FailureScript,
    secret: Mutex<Option<String>>,
}

impl FakeCloudClient {
    pub fn new() -> Self {
        Self {
            log: CallLog::default(),
            script: FailureScript::default(),
            secret: Mutex::new(Some("fake-admin-secret".to_string())),
        }
    }

    pub fn fail_with(&self, method: &str, message: &str) {
        self.script.set(method, false, message);
    }

    pub fn clear_failure(&self, method: &str) {
        self.script.clear(method);
    }

    /// Script what `fetch_secret` returns.
    pub fn set_secret(&self, secret: Option<&str>) {
        *self.secret.lock() = secret.map(|s| s.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        self.log.all()
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.log.count(method)
    }

    fn check(&self, method: &str, id: &str) -> Result<(), CloudError> {
        self.log.record(method, id);
        match self.script.get(method) {
            Some(failure) => Err(CloudError::Provider(failure.message)),
            None => Ok(()),
        }
    }
}

impl Default for FakeCloudClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CloudClient for FakeCloudClient {
    async fn upsert_public_dns(
        &self,
        installation: &Installation,
        _endpoint: &str,
    ) -> Result<(), CloudError> {
        self.check("upsert_public_dns", installation.id.as_str())
    }

    async fn delete_public_dns(&self, installation: &Installation) -> Result<(), CloudError> {
        self.check("delete_public_dns", installation.id.as_str())
    }

    async fn delete_installation_database(
        &self,
        installation: &Installation,
    ) -> Result<(), CloudError> {
        self.check("delete_installation_database", installation.id.as_str())
    }

    async fn delete_installation_filestore(
        &self,
        installation: &Installation,
    ) -> Result<(), CloudError> {
        self.check("delete_installation_filestore", installation.id.as_str())
    }

    async fn fetch_secret(&self, name: &str) -> Result<Option<String>, CloudError> {
        self.check("fetch_secret", name)?;
        Ok(self.secret.lock().clone())
    }

    async fn release_resource_tags(&self, installation: &Installation) -> Result<(), CloudError> {
        self.check("release_resource_tags", installation.id.as_str())
    }
}

/// One notification captured by [`RecordingEventProducer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedEvent {
    pub resource_id: String,
    pub old_state: String,
    pub new_state: String,
}

/// Fake [`EventProducer`] that records every notification.
#[derive(Default)]
pub struct RecordingEventProducer {
    events: Mutex<Vec<RecordedEvent>>,
    failing: Mutex<bool>,
}

impl RecordingEventProducer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail, to prove callers swallow it.
    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock() = failing;
    }

    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events.lock().clone()
    }

    fn record(&self, resource_id: &str, old_state: &str, new_state: &str) -> Result<(), EventError> {
        if *self.failing.lock() {
            return Err(EventError::Delivery("producer offline".to_string()));
        }
        self.events.lock().push(RecordedEvent {
            resource_id: resource_id.to_string(),
            old_state: old_state.to_string(),
            new_state: new_state.to_string(),
        });
        Ok(())
    }
}

#[async_trait]
impl EventProducer for RecordingEventProducer {
    async fn installation_state_change(
        &self,
        installation: &Installation,
        old_state: InstallationState,
    ) -> Result<(), EventError> {
        self.record(installation.id.as_str(), old_state.as_str(), installation.state.as_str())
    }

    async fn cluster_installation_state_change(
        &self,
        cluster_installation: &ClusterInstallation,
        old_state: ClusterInstallationState,
    ) -> Result<(), EventError> {
        self.record(
            cluster_installation.id.as_str(),
            old_state.as_str(),
            cluster_installation.state.as_str(),
        )
    }

    async fn cluster_state_change(
        &self,
        cluster: &Cluster,
        old_state: ClusterState,
    ) -> Result<(), EventError> {
        self.record(cluster.id.as_str(), old_state.as_str(), cluster.state.as_str())
    }
}

#[cfg(test)]
#[path = "fakes_tests.rs"]
mod tests;
