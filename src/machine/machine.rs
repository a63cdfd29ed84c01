use super::writer::{self, Command};
use super::{PersistHandle, PersistMiddleware};
use crate::naming::build_action;
use crate::path::{pick, select};
use crate::storage::StorageBackend;
use crate::{Error, PersistConfig, Result, Store, Structure};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

/// A declared slice with its storage key and load action resolved.
#[derive(Debug, Clone)]
pub(crate) struct Slice {
    pub(crate) name: String,
    pub(crate) key: String,
    pub(crate) action: String,
    pub(crate) values: Option<Vec<String>>,
}

/// Bookkeeping for one storage key.
#[derive(Debug, Default)]
pub(crate) struct Record {
    pub(crate) is_loaded: bool,
    /// Loads forwarded by the middleware whose dispatch has not finished.
    pub(crate) pending_loads: usize,
    pub(crate) state: Option<Value>,
}

pub(crate) struct Inner {
    pub(crate) slices: Vec<Slice>,
    pub(crate) records: Mutex<HashMap<String, Record>>,
    pub(crate) storage: Arc<dyn StorageBackend>,
    pub(crate) config: PersistConfig,
}

impl Inner {
    /// First slice, in declaration order, loaded by `action`.
    pub(crate) fn slice_for_action(&self, action: &str) -> Option<&Slice> {
        self.slices.iter().find(|slice| slice.action == action)
    }

    #[cfg(test)]
    pub(crate) fn mark_loaded(&self, key: &str) {
        let mut records = self.records.lock().unwrap();
        records.entry(key.to_string()).or_default().is_loaded = true;
    }

    /// A load for `key` was merged into an action that is still in flight.
    pub(crate) fn begin_load(&self, key: &str) {
        let mut records = self.records.lock().unwrap();
        records.entry(key.to_string()).or_default().pending_loads += 1;
    }

    /// The hydrated action was reduced; the slice may be saved from now on.
    pub(crate) fn finish_load(&self, key: &str) {
        let mut records = self.records.lock().unwrap();
        let record = records.entry(key.to_string()).or_default();
        if record.pending_loads > 0 {
            record.pending_loads -= 1;
            record.is_loaded = true;
        }
    }

    /// The hydrated action never reached the reducer.
    pub(crate) fn cancel_load(&self, key: &str) {
        let mut records = self.records.lock().unwrap();
        let record = records.entry(key.to_string()).or_default();
        record.pending_loads = record.pending_loads.saturating_sub(1);
    }

    /// Diff `state` against the last seen slices and return what must be saved.
    ///
    /// Every slice's last seen value is updated even when it is not saved, so
    /// a slice changed before its load only saves again once it differs from
    /// what the load brought in.
    pub(crate) fn handle_change(&self, state: &Value) -> Vec<(String, Value)> {
        let mut records = self.records.lock().unwrap();
        let mut saves = Vec::new();

        for slice in &self.slices {
            let new_state = pick(&select(state, &slice.name), slice.values.as_deref());
            let record = records.entry(slice.key.clone()).or_default();
            let previous = record.state.replace(new_state.clone());

            if previous.as_ref() == Some(&new_state) {
                continue;
            }
            if !record.is_loaded {
                trace!(key = %slice.key, "slice changed before load; not saving");
                continue;
            }

            if self.config.debug {
                info!(key = %slice.key, state = %new_state, "SAVED");
            } else {
                debug!(key = %slice.key, "saving persisted slice");
            }
            saves.push((slice.key.clone(), new_state));
        }

        saves
    }
}

/// Persists declared slices of a [`Store`] and loads them back on demand.
///
/// Build one from a [`Structure`], install [`middleware`](Self::middleware)
/// on the store so load actions get their stored data merged in, then call
/// [`run`](Self::run) to start saving changes.
///
/// # Examples
///
/// ```
/// use persist_machine::{
///     Action, MemoryStorage, PersistConfig, PersistMachine, SliceConfig, Store, Structure,
/// };
/// use serde_json::{json, Value};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> persist_machine::Result<()> {
/// let storage = MemoryStorage::new();
/// storage.insert("@user", json!({ "name": "ada" }));
///
/// let machine = PersistMachine::new(
///     Structure::new().slice("user", SliceConfig::new("@user")),
///     storage.clone(),
///     PersistConfig::default(),
/// )?;
///
/// let store = Store::new(json!({ "user": {} }), |state: &mut Value, action: &Action| {
///     if action.is("LOAD_USER") {
///         state["user"] = action.payload.clone();
///     }
/// })
/// .with_middleware(machine.middleware());
/// let handle = machine.run(&store);
///
/// store.dispatch(Action::new("LOAD_USER")).await?;
/// assert_eq!(store.get()["user"]["name"], "ada");
///
/// handle.shutdown().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct PersistMachine {
    inner: Arc<Inner>,
}

impl PersistMachine {
    /// Declare the slices in `structure` and create a record for each key.
    ///
    /// Fails if a slice has no key or two slices share one.
    pub fn new<B>(structure: Structure, storage: B, config: PersistConfig) -> Result<Self>
    where
        B: StorageBackend + 'static,
    {
        let mut slices: Vec<Slice> = Vec::with_capacity(structure.len());
        let mut records = HashMap::new();

        for (name, slice) in structure.iter() {
            let key = slice.key.clone().ok_or_else(|| Error::MissingKey {
                name: name.to_string(),
            })?;
            if let Some(first) = slices.iter().find(|s| s.key == key) {
                return Err(Error::DuplicateKey {
                    key,
                    first: first.name.clone(),
                    second: name.to_string(),
                });
            }

            let action = slice
                .action
                .clone()
                .unwrap_or_else(|| build_action(name, config.action_style));
            if config.debug {
                info!(slice = name, key = %key, action = %action, "persist load action");
            }

            records.insert(key.clone(), Record::default());
            slices.push(Slice {
                name: name.to_string(),
                key,
                action,
                values: slice.values.clone(),
            });
        }

        debug!(slices = slices.len(), "persist machine declared");

        Ok(Self {
            inner: Arc::new(Inner {
                slices,
                records: Mutex::new(records),
                storage: Arc::new(storage),
                config,
            }),
        })
    }

    /// Middleware that loads slices when their load action is dispatched.
    pub fn middleware(&self) -> PersistMiddleware {
        PersistMiddleware::new(Arc::clone(&self.inner))
    }

    /// Start saving `store`'s declared slices whenever they change.
    ///
    /// Saves are queued from the store's subscriber and awaited one after
    /// another by a writer task.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn run<T>(&self, store: &Store<T>) -> PersistHandle
    where
        T: Clone + Serialize + Send + Sync + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let writer = tokio::spawn(writer::run(Arc::clone(&self.inner.storage), rx));

        let inner = Arc::clone(&self.inner);
        let sender = tx.clone();
        let subscription = store.subscribe(move |state: &T| {
            let state = match serde_json::to_value(state) {
                Ok(state) => state,
                Err(e) => {
                    warn!(error = %Error::Serialize(e), "skipping persist for this update");
                    return;
                }
            };
            for (key, state) in inner.handle_change(&state) {
                if sender.send(Command::Save { key, state }).is_err() {
                    warn!("persist writer stopped; dropping save");
                }
            }
        });

        PersistHandle::new(subscription, tx, writer)
    }

    /// Load action types in declaration order.
    pub fn action_types(&self) -> Vec<&str> {
        self.inner
            .slices
            .iter()
            .map(|slice| slice.action.as_str())
            .collect()
    }

    /// Whether the slice stored under `key` has been loaded.
    pub fn is_loaded(&self, key: &str) -> bool {
        let records = self.inner.records.lock().unwrap();
        records.get(key).is_some_and(|record| record.is_loaded)
    }

    /// Last value seen for the slice stored under `key`.
    pub fn last_state(&self, key: &str) -> Option<Value> {
        let records = self.inner.records.lock().unwrap();
        records.get(key).and_then(|record| record.state.clone())
    }

    pub fn config(&self) -> &PersistConfig {
        &self.inner.config
    }

    /// Run the diff step directly and return the saves it would queue.
    #[cfg(test)]
    pub(crate) fn handle_change(&self, state: &Value) -> Vec<(String, Value)> {
        self.inner.handle_change(state)
    }
}

impl std::fmt::Debug for PersistMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistMachine")
            .field("slices", &self.inner.slices)
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}
