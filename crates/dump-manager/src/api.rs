use crate::error::ERROR_INVALID_ARGUMENT;
use crate::manager::Manager;
use crate::request::DumpCreateParams;
use std::rc::Rc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};

/// One inbound create-dump request: a line of JSON carrying the untyped
/// parameter mapping.
#[derive(Debug, serde::Deserialize)]
pub struct CreateDumpRequest {
    pub parameters: DumpCreateParams,
}

#[derive(Debug, serde::Serialize)]
pub struct Response {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<FaultBody>,
}

#[derive(Debug, serde::Serialize)]
pub struct FaultBody {
    pub code: &'static str,
    pub message: String,
}

impl Response {
    fn created(path: String) -> Self {
        Self {
            path: Some(path),
            error: None,
        }
    }

    fn fault(code: &'static str, message: String) -> Self {
        Self {
            path: None,
            error: Some(FaultBody { code, message }),
        }
    }
}

/// Serve create-dump requests over the unix socket. Each accepted
/// connection is handled by its own event-loop task; requests on one
/// connection may pipeline and are answered in order.
pub async fn serve(listener: UnixListener, manager: Rc<Manager>) -> anyhow::Result<()> {
    loop {
        let (stream, _addr) = listener.accept().await?;
        let manager = Rc::clone(&manager);
        tokio::task::spawn_local(async move {
            if let Err(error) = serve_connection(stream, manager).await {
                tracing::warn!(?error, "dump request connection failed");
            }
        });
    }
}

async fn serve_connection(stream: UnixStream, manager: Rc<Manager>) -> anyhow::Result<()> {
    let (read, mut write) = stream.into_split();
    let mut lines = BufReader::new(read).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let response = match serde_json::from_str::<CreateDumpRequest>(&line) {
            Ok(request) => match manager.create_dump(request.parameters).await {
                Ok(path) => Response::created(path),
                Err(error) => Response::fault(error.code(), error.to_string()),
            },
            Err(error) => {
                Response::fault(ERROR_INVALID_ARGUMENT, format!("malformed request: {error}"))
            }
        };

        let mut body = serde_json::to_vec(&response)?;
        body.push(b'\n');
        write.write_all(&body).await?;
    }
    Ok(())
}
