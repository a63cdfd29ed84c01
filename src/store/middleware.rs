use crate::{Action, Result};
use async_trait::async_trait;

/// An interceptor that sees every action before the reducer does.
///
/// A middleware may rewrite the action it is handed and return it to be
/// forwarded, or return an error to abort the dispatch.
///
/// Once a middleware has forwarded an action, the store reports back how the
/// dispatch ended: [`reduced`](Middleware::reduced) after the reducer ran, or
/// [`aborted`](Middleware::aborted) when a later middleware failed. Both get
/// the type of the action this middleware forwarded.
#[async_trait]
pub trait Middleware: Send + Sync {
    async fn handle(&self, action: Action) -> Result<Action>;

    /// The forwarded action reached the reducer. Runs before subscribers are
    /// notified.
    fn reduced(&self, _kind: &str) {}

    /// A later middleware failed; the reducer did not run.
    fn aborted(&self, _kind: &str) {}
}
