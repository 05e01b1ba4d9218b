use anyhow::Context;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;

pub mod api;
pub mod bus;
pub mod capture;
pub mod child;
pub mod collect;
pub mod error;
pub mod manager;
pub mod reconcile;
pub mod request;
pub mod watcher;

pub use error::{Error, Result};
pub use manager::Manager;

#[derive(clap::Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// Unix socket on which create-dump requests are served.
    #[clap(
        long = "socket",
        env = "DUMPD_SOCKET",
        default_value = "/run/dump-managerd.sock"
    )]
    socket: PathBuf,
    /// Collector program launched once per accepted request.
    #[clap(
        long = "collector",
        env = "DUMPD_COLLECTOR",
        default_value = "/usr/bin/dump-collect"
    )]
    collector: PathBuf,
    /// Base URL of the platform management service hosting the capture,
    /// notify, and status surfaces.
    #[clap(
        long = "service-url",
        env = "DUMPD_SERVICE_URL",
        default_value = "http://127.0.0.1:8080"
    )]
    service_url: String,
    /// Override of the per-type collection roots; artifacts are staged
    /// under `<root>/<type>/<id>/plat_dump` instead of the built-ins.
    #[clap(long = "collection-root", env = "DUMPD_COLLECTION_ROOT")]
    collection_root: Option<PathBuf>,
}

/// Runtime settings of the orchestration pipeline.
#[derive(Debug, Clone)]
pub struct Config {
    pub collector: PathBuf,
    pub collection_root: Option<PathBuf>,
}

/// Run the dump manager until signaled. Must be called from within a
/// LocalSet on a current-thread runtime: the watcher and the serve loop
/// share its single-threaded table.
pub async fn run(args: Args) -> anyhow::Result<()> {
    tracing::info!(?args, "dump-managerd started");

    // A socket left behind by an earlier run would fail the bind.
    match std::fs::remove_file(&args.socket) {
        Ok(()) => tracing::warn!(socket = %args.socket.display(), "removed stale socket"),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => (),
        Err(err) => {
            return Err(err)
                .with_context(|| format!("removing stale socket {}", args.socket.display()))
        }
    }
    let listener = tokio::net::UnixListener::bind(&args.socket)
        .with_context(|| format!("binding {}", args.socket.display()))?;

    let bus = Arc::new(bus::BusClient::new(args.service_url));
    let manager = Rc::new(Manager::new(
        bus.clone(),
        bus.clone(),
        bus,
        Config {
            collector: args.collector,
            collection_root: args.collection_root,
        },
    ));

    tracing::info!(socket = %args.socket.display(), "serving dump requests");
    tokio::select! {
        result = api::serve(listener, manager) => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("caught shutdown signal, stopping...");
            Ok(())
        }
    }
}
