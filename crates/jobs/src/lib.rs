//! Backup jobs: artifacts on disk, their stable public IDs, cross-process
//! execution coordination, and the dump process runner.

pub mod artifact;
pub mod coordinator;
pub mod registry;
pub mod runner;

pub use artifact::{
    artifact_filename, group_by_database, parse_artifact_filename, scan_artifacts, BackupArtifact,
};
pub use coordinator::{
    CoordinatorError, FileJobCoordinator, JobCoordinator, JobLease, ProcessProbe, RunningJob,
    SignalProbe, StatusRecord,
};
pub use registry::{BackupIdentityRegistry, IdentityStore, RegistryError};
pub use runner::{DumpOutcome, DumpRequest, DumpRunner, RunnerError, RunningDump};
