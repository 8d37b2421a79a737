//! # Transactional Filesystem Mutation
//!
//! Every disk mutation of a composition run goes through a [`Transaction`]:
//! a unit of work that backs up pre-existing files before touching them and
//! can restore the exact pre-transaction disk state if the run aborts.
//!
//! ## Process
//!
//! 1.  **Backup before mutate**: any operation targeting a path that
//!     already existed before this transaction copies it into the
//!     transaction's private backup directory first. First-time creations
//!     need no backup; their rollback is deletion.
//!
//! 2.  **Bookkeeping**: the transaction records created files, created
//!     directories (in creation order), and a map from each modified path
//!     to its owned backup, plus an ordered operation log.
//!
//! 3.  **Terminal states**: `Open -> Committed` via [`Transaction::cleanup`]
//!     on success, `Open -> RolledBack` via [`Transaction::rollback`] on
//!     failure. Terminal states are final; a new run requires a new
//!     transaction.
//!
//! Backups live in a `tempfile::TempDir` owned by the transaction, keyed by
//! an in-memory map rather than by timestamped sibling files, so backup
//! names cannot collide with project output.
//!
//! Rollback is best-effort: individual restore/delete failures are logged
//! via `log::warn!` and counted, never escalated - a half-rolled-back tree
//! with a warning beats an abort mid-restore.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::warn;
use serde::Serialize;
use serde_json::Value;
use tempfile::TempDir;

use crate::error::{Error, Result};
use crate::manifest::merge_manifest;

/// Lifecycle state of a [`Transaction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxState {
    Open,
    Committed,
    RolledBack,
}

impl std::fmt::Display for TxState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TxState::Open => "open",
            TxState::Committed => "committed",
            TxState::RolledBack => "rolled back",
        };
        f.write_str(name)
    }
}

/// Kind of one recorded mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    CreateFile,
    CreateDir,
    CopyFile,
    WriteStructuredFile,
    MergeManifest,
}

/// One recorded mutation in the transaction's operation log.
#[derive(Debug, Clone, Serialize)]
pub struct Operation {
    pub kind: OperationKind,
    pub path: PathBuf,
    /// Backup captured for this mutation, when the target pre-existed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup: Option<PathBuf>,
}

/// Counts describing what a transaction touched, for the run summary.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TransactionSummary {
    pub created_files: usize,
    pub created_dirs: usize,
    pub modified_files: usize,
    pub operations: usize,
}

/// The rollback-capable unit of work for one composition run.
pub struct Transaction {
    state: TxState,
    backup_dir: TempDir,
    backup_seq: u64,
    created_files: Vec<PathBuf>,
    created_dirs: Vec<PathBuf>,
    /// Modified target path -> owned backup path inside `backup_dir`.
    modified: HashMap<PathBuf, PathBuf>,
    operations: Vec<Operation>,
}

impl Transaction {
    /// Open a fresh transaction with its own private backup directory.
    pub fn new() -> Result<Self> {
        let backup_dir = TempDir::new().map_err(|e| Error::Filesystem {
            message: format!("Failed to create backup directory: {}", e),
        })?;
        Ok(Self {
            state: TxState::Open,
            backup_dir,
            backup_seq: 0,
            created_files: Vec::new(),
            created_dirs: Vec::new(),
            modified: HashMap::new(),
            operations: Vec::new(),
        })
    }

    /// Current lifecycle state.
    pub fn state(&self) -> TxState {
        self.state
    }

    /// The ordered operation log.
    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    /// Counts of everything this transaction touched.
    pub fn summary(&self) -> TransactionSummary {
        TransactionSummary {
            created_files: self.created_files.len(),
            created_dirs: self.created_dirs.len(),
            modified_files: self.modified.len(),
            operations: self.operations.len(),
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.state != TxState::Open {
            return Err(Error::TransactionClosed {
                state: self.state.to_string(),
            });
        }
        Ok(())
    }

    /// Prepare a write target: capture a backup if the path pre-existed,
    /// or record it as a creation.
    ///
    /// The first backup of a path is the pre-transaction state and is never
    /// overwritten by later mutations of the same path. Paths this
    /// transaction created need no backup; their rollback is deletion.
    fn prepare_target(&mut self, path: &Path) -> Result<Option<PathBuf>> {
        if self.created_files.iter().any(|p| p == path) {
            return Ok(None);
        }
        if let Some(backup) = self.modified.get(path) {
            return Ok(Some(backup.clone()));
        }
        if path.exists() {
            let backup = self
                .backup_dir
                .path()
                .join(format!("{:06}.bak", self.backup_seq));
            self.backup_seq += 1;
            fs::copy(path, &backup).map_err(|e| Error::Filesystem {
                message: format!("Failed to back up '{}': {}", path.display(), e),
            })?;
            self.modified.insert(path.to_path_buf(), backup.clone());
            Ok(Some(backup))
        } else {
            self.created_files.push(path.to_path_buf());
            Ok(None)
        }
    }

    /// Create a directory (and any missing ancestors), recording each
    /// directory that did not exist before.
    pub fn create_dir(&mut self, path: &Path) -> Result<()> {
        self.ensure_open()?;

        // Walk up to find the missing ancestors, then create root-first so
        // the recorded creation order is parents-before-children.
        let mut missing = Vec::new();
        let mut cursor = Some(path);
        while let Some(dir) = cursor {
            if dir.as_os_str().is_empty() || dir.exists() {
                break;
            }
            missing.push(dir.to_path_buf());
            cursor = dir.parent();
        }

        for dir in missing.into_iter().rev() {
            fs::create_dir(&dir).map_err(|e| Error::Filesystem {
                message: format!("Failed to create directory '{}': {}", dir.display(), e),
            })?;
            self.created_dirs.push(dir.clone());
            self.operations.push(Operation {
                kind: OperationKind::CreateDir,
                path: dir,
                backup: None,
            });
        }
        Ok(())
    }

    fn ensure_parent_dir(&mut self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            self.create_dir(parent)?;
        }
        Ok(())
    }

    /// Write `content` to `path`, backing up a pre-existing file first.
    pub fn create_file(&mut self, path: &Path, content: &[u8]) -> Result<()> {
        self.ensure_open()?;
        self.ensure_parent_dir(path)?;
        let backup = self.prepare_target(path)?;
        fs::write(path, content).map_err(|e| Error::Filesystem {
            message: format!("Failed to write file '{}': {}", path.display(), e),
        })?;
        self.operations.push(Operation {
            kind: OperationKind::CreateFile,
            path: path.to_path_buf(),
            backup,
        });
        Ok(())
    }

    /// Copy `src` to `dst` with the same backup discipline as
    /// [`Transaction::create_file`], applied to `dst`.
    pub fn copy_file(&mut self, src: &Path, dst: &Path) -> Result<()> {
        self.ensure_open()?;
        self.ensure_parent_dir(dst)?;
        let backup = self.prepare_target(dst)?;
        fs::copy(src, dst).map_err(|e| Error::Filesystem {
            message: format!(
                "Failed to copy '{}' to '{}': {}",
                src.display(),
                dst.display(),
                e
            ),
        })?;
        self.operations.push(Operation {
            kind: OperationKind::CopyFile,
            path: dst.to_path_buf(),
            backup,
        });
        Ok(())
    }

    /// Serialize `data` as pretty-printed JSON and write it to `path`.
    pub fn write_structured_file(&mut self, path: &Path, data: &Value) -> Result<()> {
        self.ensure_open()?;
        self.ensure_parent_dir(path)?;
        let backup = self.prepare_target(path)?;
        let mut serialized = serde_json::to_string_pretty(data)?;
        serialized.push('\n');
        fs::write(path, serialized).map_err(|e| Error::Filesystem {
            message: format!("Failed to write file '{}': {}", path.display(), e),
        })?;
        self.operations.push(Operation {
            kind: OperationKind::WriteStructuredFile,
            path: path.to_path_buf(),
            backup,
        });
        Ok(())
    }

    /// Merge `incoming` into the manifest at `path` and write the result.
    ///
    /// A missing target reads as an empty manifest; an unreadable or
    /// malformed one is fatal for the run.
    pub fn merge_manifest_file(&mut self, path: &Path, incoming: &Value) -> Result<()> {
        self.ensure_open()?;

        let existing = if path.exists() {
            let text = fs::read_to_string(path).map_err(|e| Error::ManifestParse {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
            serde_json::from_str(&text).map_err(|e| Error::ManifestParse {
                path: path.display().to_string(),
                message: e.to_string(),
            })?
        } else {
            Value::Object(serde_json::Map::new())
        };

        self.ensure_parent_dir(path)?;
        let backup = self.prepare_target(path)?;
        let merged = merge_manifest(&existing, incoming);
        let mut serialized = serde_json::to_string_pretty(&merged)?;
        serialized.push('\n');
        fs::write(path, serialized).map_err(|e| Error::Filesystem {
            message: format!("Failed to write file '{}': {}", path.display(), e),
        })?;
        self.operations.push(Operation {
            kind: OperationKind::MergeManifest,
            path: path.to_path_buf(),
            backup,
        });
        Ok(())
    }

    /// Restore the pre-transaction disk state, best-effort.
    ///
    /// Deletes created files, removes created directories children-first,
    /// and restores every modified path from its backup. Individual
    /// failures are warned about and counted, never raised; the returned
    /// count is the number of items that could not be restored.
    pub fn rollback(&mut self) -> usize {
        if self.state != TxState::Open {
            return 0;
        }
        let mut failures = 0;

        for path in &self.created_files {
            if let Err(e) = fs::remove_file(path) {
                // already absent counts as rolled back
                if path.exists() {
                    warn!("Rollback: failed to delete '{}': {}", path.display(), e);
                    failures += 1;
                }
            }
        }

        for dir in self.created_dirs.iter().rev() {
            if let Err(e) = fs::remove_dir(dir) {
                if dir.exists() {
                    warn!(
                        "Rollback: failed to remove directory '{}': {}",
                        dir.display(),
                        e
                    );
                    failures += 1;
                }
            }
        }

        for (path, backup) in &self.modified {
            if let Err(e) = fs::copy(backup, path) {
                warn!(
                    "Rollback: failed to restore '{}' from backup: {}",
                    path.display(),
                    e
                );
                failures += 1;
                continue;
            }
            if let Err(e) = fs::remove_file(backup) {
                warn!(
                    "Rollback: failed to delete backup for '{}': {}",
                    path.display(),
                    e
                );
                failures += 1;
            }
        }

        self.state = TxState::RolledBack;
        failures
    }

    /// Commit: delete the remaining backups. Success path only; never call
    /// after [`Transaction::rollback`].
    pub fn cleanup(&mut self) -> Result<()> {
        self.ensure_open()?;
        for backup in self.modified.values() {
            if backup.exists() {
                fs::remove_file(backup).map_err(|e| Error::Filesystem {
                    message: format!(
                        "Failed to delete backup '{}': {}",
                        backup.display(),
                        e
                    ),
                })?;
            }
        }
        self.state = TxState::Committed;
        Ok(())
    }
}

impl std::fmt::Debug for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("state", &self.state)
            .field("created_files", &self.created_files.len())
            .field("created_dirs", &self.created_dirs.len())
            .field("modified", &self.modified.len())
            .field("operations", &self.operations.len())
            .finish()
    }
}

/// Options for [`run_in_transaction_with`].
#[derive(Debug, Clone, Copy)]
pub struct TransactionOptions {
    /// Roll back on a body error. Disable to leave a failed run's partial
    /// output in place for inspection.
    pub rollback_on_error: bool,
}

impl Default for TransactionOptions {
    fn default() -> Self {
        Self {
            rollback_on_error: true,
        }
    }
}

/// Outcome of a transactional run: the body's result plus what the
/// transaction did. The wrapper itself never raises; callers decide how to
/// surface failure.
#[derive(Debug)]
pub struct TransactionOutcome<T> {
    pub result: Result<T>,
    pub summary: TransactionSummary,
    pub rolled_back: bool,
}

impl<T> TransactionOutcome<T> {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Run `body` inside a fresh transaction.
///
/// On success the transaction's backups are cleaned up; on error it is
/// rolled back (unless suppressed via options) and the error is returned in
/// the outcome instead of being raised.
pub fn run_in_transaction<T>(
    body: impl FnOnce(&mut Transaction) -> Result<T>,
) -> TransactionOutcome<T> {
    run_in_transaction_with(TransactionOptions::default(), body)
}

/// [`run_in_transaction`] with explicit options.
pub fn run_in_transaction_with<T>(
    options: TransactionOptions,
    body: impl FnOnce(&mut Transaction) -> Result<T>,
) -> TransactionOutcome<T> {
    let mut txn = match Transaction::new() {
        Ok(txn) => txn,
        Err(e) => {
            return TransactionOutcome {
                result: Err(e),
                summary: TransactionSummary::default(),
                rolled_back: false,
            };
        }
    };

    match body(&mut txn) {
        Ok(value) => {
            let summary = txn.summary();
            let result = txn.cleanup().map(|_| value);
            TransactionOutcome {
                result,
                summary,
                rolled_back: false,
            }
        }
        Err(error) => {
            let summary = txn.summary();
            let rolled_back = options.rollback_on_error;
            if rolled_back {
                txn.rollback();
            }
            TransactionOutcome {
                result: Err(error),
                summary,
                rolled_back,
            }
        }
    }
}
