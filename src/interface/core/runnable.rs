use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::oneshot;

/// A background loop owned by the runtime. Firing or dropping the returned
/// sender ends it after the current iteration.
#[async_trait]
pub trait Runnable: Send + Sync + 'static {
    fn run(self: Arc<Self>) -> oneshot::Sender<()> {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        tokio::spawn(self.run_impl(shutdown_rx));
        shutdown_tx
    }

    async fn run_impl(self: Arc<Self>, shutdown_rx: oneshot::Receiver<()>);
}
