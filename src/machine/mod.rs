//! The persist machine: slice declaration, change-driven saves and
//! load-action hydration.

mod machine;
mod middleware;
mod writer;

pub use machine::PersistMachine;
pub use middleware::PersistMiddleware;

use crate::store::Subscription;
use crate::{Error, Result};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use writer::Command;

/// Running persistence for one store, returned by [`PersistMachine::run`].
#[derive(Debug)]
pub struct PersistHandle {
    subscription: Subscription,
    tx: mpsc::UnboundedSender<Command>,
    writer: JoinHandle<()>,
}

impl PersistHandle {
    fn new(
        subscription: Subscription,
        tx: mpsc::UnboundedSender<Command>,
        writer: JoinHandle<()>,
    ) -> Self {
        Self {
            subscription,
            tx,
            writer,
        }
    }

    /// Wait until every save queued so far has been attempted.
    pub async fn flush(&self) -> Result<()> {
        let (done, wait) = oneshot::channel();
        self.tx
            .send(Command::Flush(done))
            .map_err(|_| Error::WriterClosed)?;
        wait.await.map_err(|_| Error::WriterClosed)
    }

    /// Stop watching the store, finish pending saves and stop the writer.
    pub async fn shutdown(self) -> Result<()> {
        let PersistHandle {
            mut subscription,
            tx,
            writer,
        } = self;
        subscription.unsubscribe();
        drop(tx);
        writer.await.map_err(|_| Error::WriterClosed)
    }
}
