use crate::capture::{self, CaptureService};
use crate::collect;
use crate::error::Result;
use crate::reconcile::{DumpNotifier, StatusWriter};
use crate::request::{DumpCreateParams, DumpRequest};
use crate::watcher::{Outstanding, Watcher};
use crate::Config;
use std::sync::Arc;

/// Manager drives one dump request from parameters to a spawned,
/// watched collector. Must live on a current-thread runtime inside a
/// LocalSet; it shares the watcher's single-threaded table.
pub struct Manager {
    service: Arc<dyn CaptureService>,
    watcher: Watcher,
    config: Config,
}

impl Manager {
    pub fn new(
        service: Arc<dyn CaptureService>,
        notifier: Arc<dyn DumpNotifier>,
        status_writer: Arc<dyn StatusWriter>,
        config: Config,
    ) -> Self {
        Self {
            service,
            watcher: Watcher::new(notifier, status_writer),
            config,
        }
    }

    /// The create-dump operation: validate, trigger the capture, launch
    /// the collector, register its completion, and return the new entry's
    /// identity without waiting for collection. Any failure before the
    /// collector spawns is returned to the caller and leaves no partial
    /// state; after spawn the only caller-visible signal is the entry's
    /// status record.
    pub async fn create_dump(&self, params: DumpCreateParams) -> Result<String> {
        let request = DumpRequest::validate(params)?;
        let entry = capture::trigger(&*self.service, request.dump_type).await?;

        // The BMC's own state is captured alongside every host dump.
        tracing::info!(identity = %entry.identity, "initiating a BMC dump for host dump");
        if let Err(error) = self.service.request_bmc_dump().await {
            tracing::error!(?error, "BMC dump request failed");
        }

        let child = collect::launch(&self.config, &request, &entry)?;
        let record = Outstanding {
            pid: child.id(),
            id: entry.id,
            dump_type: request.dump_type,
            identity: entry.identity.clone(),
        };
        self.watcher.register(child, record)?;

        Ok(entry.identity)
    }

    /// Number of collections currently in flight.
    pub fn outstanding_collections(&self) -> usize {
        self.watcher.outstanding()
    }
}
