use crate::error::{Error, Result};
use crate::request::{type_info, DumpType};
use anyhow::anyhow;

/// Faults the external capture service may raise for a create call.
/// Policy rejections are modeled explicitly; anything else is a transport
/// failure which is passed through without reinterpretation.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("dump creation is disabled")]
    Disabled,
    #[error("dump quota exceeded: {0}")]
    QuotaExceeded(String),
    #[error("dump creation is not allowed: {0}")]
    NotAllowed(String),
    #[error(transparent)]
    Transport(#[from] anyhow::Error),
}

impl From<CaptureError> for Error {
    fn from(err: CaptureError) -> Self {
        match err {
            CaptureError::Disabled => Error::Disabled,
            CaptureError::QuotaExceeded(reason) => Error::QuotaExceeded { reason },
            CaptureError::NotAllowed(reason) => Error::NotAllowed { reason },
            CaptureError::Transport(err) => Error::Internal(err),
        }
    }
}

/// The outbound capture-trigger boundary: a type-keyed external manager
/// which begins emitting subsystem state and hands back the object path
/// of the new dump entry.
#[async_trait::async_trait]
pub trait CaptureService: Send + Sync {
    /// Create a dump entry under the given per-type entry root.
    async fn create_dump(&self, entry_root: &str) -> Result<String, CaptureError>;

    /// Request a companion BMC dump of the manager's own state.
    /// Best-effort; callers log and continue on failure.
    async fn request_bmc_dump(&self) -> anyhow::Result<()>;
}

/// A newly created dump entry: its opaque identity, and the numeric id
/// parsed from the identity's trailing path segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpEntry {
    pub identity: String,
    pub id: u32,
}

/// Trigger a capture for the given dump type and resolve the created
/// entry. Entry paths have the form `<entry-root>/entry/<id>`; an
/// identity without a parseable trailing id means the capture service
/// violated its contract and maps to an internal fault.
pub async fn trigger(service: &dyn CaptureService, dump_type: DumpType) -> Result<DumpEntry> {
    let entry_root = type_info(dump_type).entry_root;
    let identity = service.create_dump(entry_root).await?;
    let id = parse_entry_id(&identity)?;

    tracing::info!(%identity, id, "capture triggered for new dump entry");
    Ok(DumpEntry { identity, id })
}

fn parse_entry_id(identity: &str) -> Result<u32> {
    let Some((_, tail)) = identity.rsplit_once('/') else {
        tracing::error!(%identity, "invalid dump entry path");
        return Err(Error::Internal(anyhow!(
            "dump entry path {identity:?} has no id segment"
        )));
    };
    tail.parse().map_err(|_| {
        tracing::error!(%identity, "invalid dump entry id");
        Error::Internal(anyhow!(
            "dump entry path {identity:?} has a malformed id segment"
        ))
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::Mutex;

    // A scripted capture service which records the entry roots it's
    // asked to create under.
    struct Scripted {
        outcome: fn() -> Result<String, CaptureError>,
        roots: Mutex<Vec<String>>,
    }

    #[async_trait::async_trait]
    impl CaptureService for Scripted {
        async fn create_dump(&self, entry_root: &str) -> Result<String, CaptureError> {
            self.roots.lock().unwrap().push(entry_root.to_string());
            (self.outcome)()
        }
        async fn request_bmc_dump(&self) -> anyhow::Result<()> {
            Ok(())
        }
    }

    fn scripted(outcome: fn() -> Result<String, CaptureError>) -> Scripted {
        Scripted {
            outcome,
            roots: Mutex::new(Vec::new()),
        }
    }

    #[tokio::test]
    async fn test_trigger_resolves_entry_id() {
        let service =
            scripted(|| Ok("/xyz/openbmc_project/dump/hardware/entry/7".to_string()));
        let entry = trigger(&service, DumpType::Hardware).await.unwrap();

        assert_eq!(entry.id, 7);
        assert_eq!(entry.identity, "/xyz/openbmc_project/dump/hardware/entry/7");
        assert_eq!(
            *service.roots.lock().unwrap(),
            vec!["/xyz/openbmc_project/dump/hardware".to_string()],
        );
    }

    #[tokio::test]
    async fn test_policy_faults_translate() {
        let service = scripted(|| Err(CaptureError::Disabled));
        assert!(matches!(
            trigger(&service, DumpType::Hostboot).await.unwrap_err(),
            Error::Disabled
        ));

        let service = scripted(|| Err(CaptureError::QuotaExceeded("no space".to_string())));
        assert!(matches!(
            trigger(&service, DumpType::Hostboot).await.unwrap_err(),
            Error::QuotaExceeded { ref reason } if reason == "no space"
        ));

        let service = scripted(|| Err(CaptureError::NotAllowed("host running".to_string())));
        assert!(matches!(
            trigger(&service, DumpType::Hostboot).await.unwrap_err(),
            Error::NotAllowed { ref reason } if reason == "host running"
        ));

        let service = scripted(|| Err(CaptureError::Transport(anyhow!("bus timeout"))));
        assert!(matches!(
            trigger(&service, DumpType::Hostboot).await.unwrap_err(),
            Error::Internal(_)
        ));
    }

    #[tokio::test]
    async fn test_malformed_identity_is_internal() {
        let service = scripted(|| Ok("no-separator".to_string()));
        assert!(matches!(
            trigger(&service, DumpType::Sbe).await.unwrap_err(),
            Error::Internal(_)
        ));

        let service = scripted(|| Ok("/xyz/openbmc_project/dump/sbe/entry/seven".to_string()));
        assert!(matches!(
            trigger(&service, DumpType::Sbe).await.unwrap_err(),
            Error::Internal(_)
        ));
    }
}
