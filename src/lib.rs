//! # persist-machine
//!
//! Store middleware that keeps chosen slices of application state durable
//! across restarts.
//!
//! ## Pieces
//!
//! - [`Store`] - Thread-safe action/reducer state container with middleware
//!   and subscriptions
//! - [`Structure`] - Which slices of state to persist, under which storage
//!   key, and which of their fields
//! - [`PersistMachine`] - Saves a slice whenever it changes, but only after
//!   that slice has been loaded
//! - [`PersistMiddleware`] - Intercepts load actions and merges stored data
//!   into their payload
//! - [`StorageBackend`] - The bridge to the storage medium: in memory, JSON
//!   files, or caller-supplied closures
//!
//! ## Flow
//!
//! 1. Dispatching `LOAD_USER` (derived from the slice name `user`) makes the
//!    middleware load `@user` from storage and merge it into the action.
//! 2. The reducer applies the hydrated payload.
//! 3. From then on, every store update that changes the `user` slice is
//!    saved back to `@user`.

pub mod action;
pub mod config;
pub mod error;
pub mod machine;
pub mod naming;
pub mod path;
pub mod storage;
pub mod store;

// Re-export main types for convenience
pub use action::Action;
pub use config::{PersistConfig, SliceConfig, Structure};
pub use error::{Error, Result};
pub use machine::{PersistHandle, PersistMachine, PersistMiddleware};
pub use naming::{build_action, persist_action, ActionStyle};
pub use storage::{FileStorage, MemoryStorage, StorageBackend};
pub use store::{Middleware, Store, Subscription};

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[tokio::test]
    async fn it_works() {
        // Basic smoke test
        let storage = MemoryStorage::new();
        storage.insert("@count", json!({ "value": 41 }));

        let machine = PersistMachine::new(
            Structure::new().slice("count", SliceConfig::new("@count")),
            storage.clone(),
            PersistConfig::default(),
        )
        .unwrap();
        let reducer = |state: &mut Value, action: &Action| match action.kind.as_str() {
            "LOAD_COUNT" => state["count"] = action.payload.clone(),
            "INCREMENT" => {
                let value = state["count"]["value"].as_i64().unwrap_or(0);
                state["count"]["value"] = json!(value + 1);
            }
            _ => {}
        };
        let store = Store::new(json!({ "count": { "value": 0 } }), reducer)
            .with_middleware(machine.middleware());
        let handle = machine.run(&store);

        store.dispatch(Action::new("LOAD_COUNT")).await.unwrap();
        store.dispatch(Action::new("INCREMENT")).await.unwrap();
        handle.flush().await.unwrap();

        assert_eq!(storage.get("@count"), Some(json!({ "value": 42 })));
    }
}
