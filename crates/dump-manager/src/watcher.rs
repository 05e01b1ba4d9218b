use crate::child::Child;
use crate::error::{Error, Result};
use crate::reconcile::{reconcile, DumpNotifier, StatusWriter};
use crate::request::DumpType;
use anyhow::anyhow;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

/// One in-flight collection, keyed by the collector's process id.
/// Created the instant the collector is spawned; destroyed by the watcher
/// task immediately before its reconciliation runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outstanding {
    pub pid: u32,
    pub id: u32,
    pub dump_type: DumpType,
    pub identity: String,
}

/// Watcher tracks outstanding collections and drives reconciliation of
/// each exactly once. The table is touched only from event-loop tasks on
/// the current-thread runtime, so it needs no locking; registration and
/// teardown both happen strictly inside LocalSet callbacks.
#[derive(Clone)]
pub struct Watcher {
    table: Rc<RefCell<HashMap<u32, Outstanding>>>,
    notifier: Arc<dyn DumpNotifier>,
    status_writer: Arc<dyn StatusWriter>,
}

impl Watcher {
    pub fn new(notifier: Arc<dyn DumpNotifier>, status_writer: Arc<dyn StatusWriter>) -> Self {
        Self {
            table: Rc::new(RefCell::new(HashMap::new())),
            notifier,
            status_writer,
        }
    }

    /// Register interest in the child's termination. On success the call
    /// returns immediately; a spawned event-loop task awaits the exit,
    /// tears the record down, and reconciles. The process-id namespace
    /// cannot reuse the pid until the record is torn down, so at most one
    /// record per live pid exists. Registration failure is fatal to the
    /// originating call and the record is not retained.
    pub fn register(&self, child: Child, record: Outstanding) -> Result<()> {
        let pid = record.pid;
        tracing::info!(
            pid,
            id = record.id,
            dump_type = record.dump_type.slug(),
            identity = %record.identity,
            "watching collector"
        );

        {
            let mut table = self.table.borrow_mut();
            if table.contains_key(&pid) {
                return Err(Error::Internal(anyhow!(
                    "a collection is already outstanding for pid {pid}"
                )));
            }
            table.insert(pid, record);
        }

        let wait = child.wait();
        let table = Rc::clone(&self.table);
        let notifier = Arc::clone(&self.notifier);
        let status_writer = Arc::clone(&self.status_writer);

        tokio::task::spawn_local(async move {
            let outcome = wait.await;

            // Teardown precedes reconciliation: once removed, a reused
            // pid is an unrelated new record.
            let removed = table.borrow_mut().remove(&pid);
            let Some(record) = removed else {
                tracing::error!(pid, "no outstanding collection for exited pid");
                return;
            };
            reconcile(outcome, &record, &*notifier, &*status_writer).await;
        });

        Ok(())
    }

    /// Number of collections currently awaiting reconciliation.
    pub fn outstanding(&self) -> usize {
        self.table.borrow().len()
    }
}
