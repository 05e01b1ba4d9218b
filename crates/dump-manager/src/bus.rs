use crate::capture::{CaptureError, CaptureService};
use crate::error::{
    ERROR_DUMP_DISABLED, ERROR_DUMP_NOT_ALLOWED, ERROR_DUMP_QUOTA_EXCEEDED,
};
use crate::reconcile::{DumpNotifier, OperationStatus, StatusWriter};
use anyhow::{anyhow, Context};

/// Entry root of the BMC's own dump service, used for companion dumps.
const BMC_DUMP_ENTRY_ROOT: &str = "/xyz/openbmc_project/dump/bmc";

/// HTTP/JSON adapter implementing all three outbound boundaries against
/// the platform management service. The object registration and discovery
/// layer sits behind this base URL and is outside this crate's scope.
pub struct BusClient {
    client: reqwest::Client,
    base: String,
}

#[derive(Debug, serde::Deserialize)]
struct CreatedBody {
    path: String,
}

#[derive(Debug, serde::Deserialize)]
struct FaultBody {
    code: String,
    #[serde(default)]
    message: String,
}

impl BusClient {
    pub fn new(base: impl Into<String>) -> Self {
        let mut base = base.into();
        while base.ends_with('/') {
            base.pop();
        }
        Self {
            client: reqwest::Client::new(),
            base,
        }
    }

    fn action_url(&self, object: &str, action: &str) -> String {
        format!("{}{object}/action/{action}", self.base)
    }

    fn attr_url(&self, object: &str, attr: &str) -> String {
        format!("{}{object}/attr/{attr}", self.base)
    }
}

#[async_trait::async_trait]
impl CaptureService for BusClient {
    async fn create_dump(&self, entry_root: &str) -> Result<String, CaptureError> {
        let url = self.action_url(entry_root, "CreateDump");
        let response = self
            .client
            .post(url.as_str())
            .json(&serde_json::json!({}))
            .send()
            .await
            .map_err(|err| CaptureError::Transport(err.into()))?;

        let status = response.status();
        if status.is_success() {
            let body: CreatedBody = response
                .json()
                .await
                .map_err(|err| CaptureError::Transport(err.into()))?;
            return Ok(body.path);
        }

        // A client error with a recognized fault code is a policy
        // rejection; everything else passes through unchanged.
        if status.is_client_error() {
            if let Ok(fault) = response.json::<FaultBody>().await {
                return Err(match fault.code.as_str() {
                    ERROR_DUMP_DISABLED => CaptureError::Disabled,
                    ERROR_DUMP_QUOTA_EXCEEDED => CaptureError::QuotaExceeded(fault.message),
                    ERROR_DUMP_NOT_ALLOWED => CaptureError::NotAllowed(fault.message),
                    _ => CaptureError::Transport(anyhow!(
                        "create dump at {url} failed with {}: {}",
                        fault.code,
                        fault.message
                    )),
                });
            }
        }
        Err(CaptureError::Transport(anyhow!(
            "create dump at {url} failed with status {status}"
        )))
    }

    async fn request_bmc_dump(&self) -> anyhow::Result<()> {
        let url = self.action_url(BMC_DUMP_ENTRY_ROOT, "CreateDump");
        let response = self
            .client
            .post(url.as_str())
            .json(&serde_json::json!({}))
            .send()
            .await
            .with_context(|| format!("requesting BMC dump at {url}"))?;
        response
            .error_for_status()
            .with_context(|| format!("requesting BMC dump at {url}"))?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl DumpNotifier for BusClient {
    async fn notify(&self, entry_root: &str, id: u32, flags: u64) -> anyhow::Result<()> {
        let url = self.action_url(entry_root, "Notify");
        let response = self
            .client
            .post(url.as_str())
            .json(&serde_json::json!({ "id": id, "flags": flags }))
            .send()
            .await
            .with_context(|| format!("notifying dump subscriber at {url}"))?;
        response
            .error_for_status()
            .with_context(|| format!("notifying dump subscriber at {url}"))?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl StatusWriter for BusClient {
    async fn set_status(&self, identity: &str, status: OperationStatus) -> anyhow::Result<()> {
        let url = self.attr_url(identity, "Status");
        let response = self
            .client
            .put(url.as_str())
            .json(&serde_json::json!(status.token()))
            .send()
            .await
            .with_context(|| format!("writing dump status at {url}"))?;
        response
            .error_for_status()
            .with_context(|| format!("writing dump status at {url}"))?;
        Ok(())
    }
}
