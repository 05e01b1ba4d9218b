use crate::request::type_info;
use crate::watcher::Outstanding;
use std::process::ExitStatus;

/// The fixed progress-state set of a dump entry's status record. Other
/// actors transition entries through the full set; this manager only ever
/// writes `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationStatus {
    InProgress,
    Completed,
    Failed,
    Aborted,
}

impl OperationStatus {
    /// The wire token of this progress state.
    pub fn token(&self) -> &'static str {
        match self {
            OperationStatus::InProgress => {
                "xyz.openbmc_project.Common.Progress.OperationStatus.InProgress"
            }
            OperationStatus::Completed => {
                "xyz.openbmc_project.Common.Progress.OperationStatus.Completed"
            }
            OperationStatus::Failed => {
                "xyz.openbmc_project.Common.Progress.OperationStatus.Failed"
            }
            OperationStatus::Aborted => {
                "xyz.openbmc_project.Common.Progress.OperationStatus.Aborted"
            }
        }
    }
}

/// The outbound notify boundary: tells the type-keyed subscriber that a
/// collected dump is ready for packaging.
#[async_trait::async_trait]
pub trait DumpNotifier: Send + Sync {
    async fn notify(&self, entry_root: &str, id: u32, flags: u64) -> anyhow::Result<()>;
}

/// The outbound status-write boundary: an atomic single-field property
/// write against an entry identity. The status record is externally
/// shared; implementations must never read-modify-write it.
#[async_trait::async_trait]
pub trait StatusWriter: Send + Sync {
    async fn set_status(&self, identity: &str, status: OperationStatus) -> anyhow::Result<()>;
}

/// Reconcile one collector's outcome into the entry's externally-visible
/// state. Runs once per outstanding record, on the event loop, after the
/// originating call has long returned: failures of either sub-call are
/// logged and committed, never re-raised.
pub async fn reconcile(
    outcome: std::io::Result<ExitStatus>,
    record: &Outstanding,
    notifier: &dyn DumpNotifier,
    status_writer: &dyn StatusWriter,
) {
    tracing::info!(identity = %record.identity, "updating status of dump entry");

    let failure = match outcome {
        Ok(exit) if exit.success() => {
            tracing::info!(id = record.id, "dump collected, initiating packaging");
            if let Err(error) = notifier
                .notify(type_info(record.dump_type).entry_root, record.id, 0)
                .await
            {
                tracing::error!(
                    identity = %record.identity,
                    ?error,
                    "unable to notify dump subscriber"
                );
            }
            return;
        }
        Ok(exit) => format!("collector exited with {exit}"),
        Err(error) => format!("waiting for collector failed: {error}"),
    };

    tracing::error!(identity = %record.identity, %failure, "dump collection failed, updating status");
    if let Err(error) = status_writer
        .set_status(&record.identity, OperationStatus::Failed)
        .await
    {
        tracing::error!(
            identity = %record.identity,
            ?error,
            "unable to update the dump status"
        );
    }
}
