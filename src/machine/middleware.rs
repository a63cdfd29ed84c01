use super::machine::Inner;
use crate::path::merge_payload;
use crate::store::Middleware;
use crate::{Action, Result};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, warn};

/// Store middleware that hydrates load actions from storage.
///
/// When an action's type matches a declared slice's load action, the stored
/// value for that slice is loaded and shallow-merged under the action's own
/// payload. The slice counts as loaded, and later changes get saved, only
/// once the store reports the hydrated action as reduced.
#[derive(Clone)]
pub struct PersistMiddleware {
    inner: Arc<Inner>,
}

impl PersistMiddleware {
    pub(crate) fn new(inner: Arc<Inner>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl Middleware for PersistMiddleware {
    async fn handle(&self, mut action: Action) -> Result<Action> {
        let Some(slice) = self.inner.slice_for_action(&action.kind) else {
            return Ok(action);
        };

        let loaded = match self.inner.storage.load(&slice.key).await {
            Ok(loaded) => loaded,
            Err(e) => {
                warn!(key = %slice.key, error = %e, "failed to load persisted slice");
                return Err(e);
            }
        };
        debug!(key = %slice.key, found = loaded.is_some(), "loaded persisted slice");

        let loaded = loaded.unwrap_or_else(|| Value::Object(Map::new()));
        action.payload = merge_payload(loaded, std::mem::take(&mut action.payload));
        self.inner.begin_load(&slice.key);

        Ok(action)
    }

    fn reduced(&self, kind: &str) {
        if let Some(slice) = self.inner.slice_for_action(kind) {
            self.inner.finish_load(&slice.key);
        }
    }

    fn aborted(&self, kind: &str) {
        if let Some(slice) = self.inner.slice_for_action(kind) {
            debug!(key = %slice.key, "load dispatch aborted; slice stays unloaded");
            self.inner.cancel_load(&slice.key);
        }
    }
}

impl std::fmt::Debug for PersistMiddleware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistMiddleware").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use crate::storage::from_fns;
    use crate::{
        Action, Error, MemoryStorage, Middleware, PersistConfig, PersistMachine, SliceConfig,
        Structure,
    };
    use serde_json::{json, Value};

    fn structure() -> Structure {
        Structure::new()
            .slice("user", SliceConfig::new("@user"))
            .slice("settings", SliceConfig::new("@settings").action("HYDRATE"))
    }

    #[tokio::test]
    async fn unrelated_actions_pass_through() {
        let machine =
            PersistMachine::new(structure(), MemoryStorage::new(), PersistConfig::default())
                .unwrap();

        let action = Action::with_payload("INCREMENT", json!(1));
        let forwarded = machine.middleware().handle(action.clone()).await.unwrap();

        assert_eq!(forwarded, action);
        assert!(!machine.is_loaded("@user"));
    }

    #[tokio::test]
    async fn load_action_merges_stored_data_under_payload() {
        let storage = MemoryStorage::new();
        storage.insert("@settings", json!({ "theme": "dark", "lang": "en" }));
        let machine =
            PersistMachine::new(structure(), storage, PersistConfig::default()).unwrap();

        let middleware = machine.middleware();
        let forwarded = middleware
            .handle(Action::with_payload("HYDRATE", json!({ "lang": "fr" })))
            .await
            .unwrap();

        assert_eq!(forwarded.payload, json!({ "theme": "dark", "lang": "fr" }));
        assert!(!machine.is_loaded("@settings"));

        middleware.reduced(&forwarded.kind);
        assert!(machine.is_loaded("@settings"));
        assert!(!machine.is_loaded("@user"));
    }

    #[tokio::test]
    async fn nothing_stored_still_marks_loaded() {
        let machine =
            PersistMachine::new(structure(), MemoryStorage::new(), PersistConfig::default())
                .unwrap();

        let middleware = machine.middleware();
        let forwarded = middleware.handle(Action::new("LOAD_USER")).await.unwrap();
        middleware.reduced(&forwarded.kind);

        assert_eq!(forwarded.payload, json!({}));
        assert!(machine.is_loaded("@user"));
    }

    #[tokio::test]
    async fn aborted_load_stays_unloaded() {
        let machine =
            PersistMachine::new(structure(), MemoryStorage::new(), PersistConfig::default())
                .unwrap();

        let middleware = machine.middleware();
        let forwarded = middleware.handle(Action::new("LOAD_USER")).await.unwrap();
        middleware.aborted(&forwarded.kind);
        // Nothing left pending for a stray completion to promote.
        middleware.reduced(&forwarded.kind);

        assert!(!machine.is_loaded("@user"));
    }

    #[tokio::test]
    async fn reduced_without_load_does_not_mark_loaded() {
        let machine =
            PersistMachine::new(structure(), MemoryStorage::new(), PersistConfig::default())
                .unwrap();

        machine.middleware().reduced("LOAD_USER");

        assert!(!machine.is_loaded("@user"));
    }

    #[tokio::test]
    async fn shared_action_loads_only_first_slice() {
        let storage = MemoryStorage::new();
        storage.insert("@first", json!({ "a": 1 }));
        storage.insert("@second", json!({ "b": 2 }));
        let machine = PersistMachine::new(
            Structure::new()
                .slice("first", SliceConfig::new("@first").action("HYDRATE"))
                .slice("second", SliceConfig::new("@second").action("HYDRATE")),
            storage,
            PersistConfig::default(),
        )
        .unwrap();

        let middleware = machine.middleware();
        let forwarded = middleware.handle(Action::new("HYDRATE")).await.unwrap();
        middleware.reduced(&forwarded.kind);

        assert_eq!(forwarded.payload, json!({ "a": 1 }));
        assert!(machine.is_loaded("@first"));
        assert!(!machine.is_loaded("@second"));
    }

    #[tokio::test]
    async fn failed_load_propagates_and_stays_unloaded() {
        let storage = from_fns(
            |_key: String, _state: Value| async move { Ok::<_, Error>(()) },
            |_key: String| async move { Err::<Option<Value>, _>(Error::storage("offline")) },
        );
        let machine = PersistMachine::new(structure(), storage, PersistConfig::default()).unwrap();

        let result = machine.middleware().handle(Action::new("LOAD_USER")).await;

        assert!(matches!(result, Err(Error::Storage(_))));
        assert!(!machine.is_loaded("@user"));
    }
}
