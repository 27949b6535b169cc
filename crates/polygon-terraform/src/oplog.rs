//! Captured Terraform output, indexed by cluster name and phase

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A step of a lifecycle operation that runs one subprocess
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    Version,
    Init,
    ImportIp,
    ImportStorage,
    DetachIp,
    DetachStorage,
    Apply,
    Destroy,
    Refresh,
    Show,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Version => "version",
            Phase::Init => "init",
            Phase::ImportIp => "import-ip",
            Phase::ImportStorage => "import-efs",
            Phase::DetachIp => "detach-ip",
            Phase::DetachStorage => "detach-efs",
            Phase::Apply => "tf-apply",
            Phase::Destroy => "tf-destroy",
            Phase::Refresh => "tf-refresh",
            Phase::Show => "tf-show",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Stdout,
    Stderr,
}

/// Lines captured for one phase, in arrival order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhaseLog {
    pub stdout: Vec<String>,
    pub stderr: Vec<String>,
}

type Entries = HashMap<String, BTreeMap<Phase, PhaseLog>>;

/// Shared log store. Clones refer to the same entries.
#[derive(Debug, Clone, Default)]
pub struct OperationLog {
    entries: Arc<Mutex<Entries>>,
}

impl OperationLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Entries> {
        // a panicking writer leaves at most a partially appended line behind
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn append(&self, cluster: &str, phase: Phase, stream: Stream, line: impl Into<String>) {
        let mut entries = self.lock();
        let log = entries
            .entry(cluster.to_string())
            .or_default()
            .entry(phase)
            .or_default();

        match stream {
            Stream::Stdout => log.stdout.push(line.into()),
            Stream::Stderr => log.stderr.push(line.into()),
        }
    }

    pub fn phase(&self, cluster: &str, phase: Phase) -> Option<PhaseLog> {
        self.lock()
            .get(cluster)
            .and_then(|phases| phases.get(&phase))
            .cloned()
    }

    /// Every phase recorded for `cluster`, in lifecycle order
    pub fn phases(&self, cluster: &str) -> Vec<(Phase, PhaseLog)> {
        self.lock()
            .get(cluster)
            .map(|phases| phases.iter().map(|(p, l)| (*p, l.clone())).collect())
            .unwrap_or_default()
    }

    pub fn clear(&self, cluster: &str) {
        self.lock().remove(cluster);
    }
}
