use crate::capture::DumpEntry;
use crate::child::Child;
use crate::error::{Error, Result};
use crate::request::{type_info, DumpRequest, DumpType};
use crate::Config;
use anyhow::Context;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Fixed sub-directory of a dump entry's collection directory into which
/// the collector stages platform dump files.
pub const PLAT_DUMP_DIR: &str = "plat_dump";

/// Marker file recording the error log which motivated the collection.
const ELOG_ID_FILE: &str = "errorlog";

/// Destination directory for one dump entry's collected files:
/// `<collection-root(type)>/<id>/plat_dump`.
pub fn collection_path(config: &Config, dump_type: DumpType, id: u32) -> PathBuf {
    let root = match &config.collection_root {
        Some(root) => root.join(dump_type.slug()),
        None => PathBuf::from(type_info(dump_type).collection_root),
    };
    root.join(id.to_string()).join(PLAT_DUMP_DIR)
}

/// Create the collection directory and record the normalized error-log id
/// inside it. Runs in the parent, before any child exists, so the
/// destination is guaranteed present when the collector starts.
pub fn prepare_collection(path: &Path, elog_id: &str) -> Result<()> {
    let prepare = || -> anyhow::Result<()> {
        std::fs::create_dir_all(path)
            .with_context(|| format!("creating collection directory {}", path.display()))?;
        std::fs::write(path.join(ELOG_ID_FILE), elog_id)
            .with_context(|| format!("recording error log id under {}", path.display()))?;
        Ok(())
    };
    prepare().map_err(Error::Internal)
}

/// Spawn the collector process for an already-triggered dump, passing the
/// resolved descriptor fields as its argument vector. Spawn failure is an
/// internal fault and leaves no outstanding record.
pub fn launch(config: &Config, request: &DumpRequest, entry: &DumpEntry) -> Result<Child> {
    let path = collection_path(config, request.dump_type, entry.id);
    prepare_collection(&path, &request.elog_id)?;

    let mut cmd = Command::new(&config.collector);
    cmd.arg("--type")
        .arg(request.dump_type.code().to_string())
        .arg("--id")
        .arg(entry.id.to_string())
        .arg("--path")
        .arg(&path)
        .arg("--failingunit")
        .arg(request.failing_unit_arg().to_string())
        .stdin(Stdio::null());

    tracing::info!(
        program = %config.collector.display(),
        args = ?cmd.get_args().collect::<Vec<_>>(),
        "starting dump collector"
    );

    Child::spawn(&mut cmd).map_err(|err| {
        tracing::error!(?err, "failed to start collection");
        Error::Internal(anyhow::Error::new(err).context("spawning dump collector"))
    })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_collection_path_layout() {
        let config = Config {
            collector: "/usr/bin/dump-collect".into(),
            collection_root: None,
        };
        assert_eq!(
            collection_path(&config, DumpType::Hostboot, 7),
            PathBuf::from("/var/lib/openpower-dump/hostboot/7/plat_dump"),
        );

        let config = Config {
            collection_root: Some("/tmp/dumps".into()),
            ..config
        };
        assert_eq!(
            collection_path(&config, DumpType::Sbe, 12),
            PathBuf::from("/tmp/dumps/sbe/12/plat_dump"),
        );
    }

    #[test]
    fn test_prepare_collection() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("3").join(PLAT_DUMP_DIR);

        prepare_collection(&path, "00001234").unwrap();

        assert!(path.is_dir());
        assert_eq!(
            std::fs::read_to_string(path.join("errorlog")).unwrap(),
            "00001234"
        );
    }
}
