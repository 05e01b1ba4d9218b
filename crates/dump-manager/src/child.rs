use shared_child::SharedChild;
use std::process::{Command, ExitStatus};
use std::sync::Arc;

/// A spawned collector process. The tokio "process" feature is avoided
/// (see the workspace Cargo.toml); instead the child is waited on from the
/// blocking pool through a SharedChild. Dropping a Child does not signal
/// it: a spawned collector always runs to completion or abnormal exit.
pub struct Child {
    inner: Arc<SharedChild>,
}

impl Child {
    pub fn spawn(cmd: &mut Command) -> std::io::Result<Self> {
        let inner = SharedChild::spawn(cmd)?;
        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    /// Operating-system process id of the child.
    pub fn id(&self) -> u32 {
        self.inner.id()
    }

    /// A future resolving with the child's exit status. The returned
    /// future is independent of this handle's lifetime.
    pub fn wait(&self) -> impl std::future::Future<Output = std::io::Result<ExitStatus>> {
        let inner = self.inner.clone();
        let handle = tokio::runtime::Handle::current().spawn_blocking(move || inner.wait());
        async move { handle.await.expect("wait does not panic") }
    }
}

#[cfg(test)]
mod test {
    use super::{Child, Command};

    #[tokio::test]
    async fn test_wait() {
        let child = Child::spawn(&mut Command::new("true")).unwrap();
        assert!(child.wait().await.unwrap().success());
        let child = Child::spawn(&mut Command::new("false")).unwrap();
        assert!(!child.wait().await.unwrap().success());
    }

    #[tokio::test]
    async fn test_wait_outlives_handle() {
        let child = Child::spawn(&mut Command::new("true")).unwrap();
        let wait = child.wait();
        std::mem::drop(child);
        assert!(wait.await.unwrap().success());
    }
}
