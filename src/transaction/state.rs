use serde::Serialize;

/// Snapshot of one connection's transaction bookkeeping.
///
/// `rollback_only` is only ever true while `nesting_level > 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TransactionState {
    pub nesting_level: usize,
    pub rollback_only: bool,
    pub auto_commit: bool,
    pub savepoints_enabled: bool,
}

impl TransactionState {
    #[must_use]
    pub fn new(auto_commit: bool) -> Self {
        Self {
            nesting_level: 0,
            rollback_only: false,
            auto_commit,
            savepoints_enabled: false,
        }
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.nesting_level > 0
    }
}

impl Default for TransactionState {
    fn default() -> Self {
        Self::new(true)
    }
}

/// Savepoints are connection-scoped, so the level alone keeps names unique.
pub(crate) fn savepoint_name(prefix: &str, level: usize) -> String {
    format!("{prefix}{level}")
}
