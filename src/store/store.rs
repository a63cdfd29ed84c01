use super::Middleware;
use crate::{Action, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

type Subscriber<T> = Box<dyn Fn(&T) + Send + Sync>;
type Reducer<T> = Arc<dyn Fn(&mut T, &Action) + Send + Sync>;

struct Subscribers<T> {
    next_id: AtomicUsize,
    entries: RwLock<Vec<(usize, Subscriber<T>)>>,
}

/// A thread-safe store for managing application state.
///
/// State only changes through [`dispatch`](Store::dispatch): the action is
/// handed to each middleware in turn, then reduced, then every subscriber
/// is notified with the new state.
pub struct Store<T> {
    state: Arc<RwLock<T>>,
    reducer: Reducer<T>,
    middleware: Arc<RwLock<Vec<Arc<dyn Middleware>>>>,
    subscribers: Arc<Subscribers<T>>,
}

impl<T: Clone> Store<T> {
    /// Create a new store with the given initial state and reducer.
    pub fn new<R>(initial: T, reducer: R) -> Self
    where
        R: Fn(&mut T, &Action) + Send + Sync + 'static,
    {
        Self {
            state: Arc::new(RwLock::new(initial)),
            reducer: Arc::new(reducer),
            middleware: Arc::new(RwLock::new(Vec::new())),
            subscribers: Arc::new(Subscribers {
                next_id: AtomicUsize::new(0),
                entries: RwLock::new(Vec::new()),
            }),
        }
    }

    /// Append a middleware to the dispatch chain.
    pub fn with_middleware<M>(self, middleware: M) -> Self
    where
        M: Middleware + 'static,
    {
        self.middleware.write().unwrap().push(Arc::new(middleware));
        self
    }

    /// Get a clone of the current state.
    pub fn get(&self) -> T {
        self.state.read().unwrap().clone()
    }

    /// Read state without cloning it.
    pub fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&T) -> R,
    {
        let state = self.state.read().unwrap();
        f(&*state)
    }

    /// Subscribe to state changes.
    ///
    /// The callback will be called after every successful dispatch. Dropping
    /// the returned [`Subscription`] does not unsubscribe; call
    /// [`Subscription::unsubscribe`] for that.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        T: 'static,
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = self.subscribers.next_id.fetch_add(1, Ordering::SeqCst);
        self.subscribers
            .entries
            .write()
            .unwrap()
            .push((id, Box::new(callback)));

        let subscribers = Arc::downgrade(&self.subscribers);
        Subscription {
            remove: Some(Box::new(move || {
                if let Some(subscribers) = subscribers.upgrade() {
                    subscribers
                        .entries
                        .write()
                        .unwrap()
                        .retain(|(entry, _)| *entry != id);
                }
            })),
        }
    }

    /// Send an action through the middleware chain and into the reducer.
    ///
    /// If any middleware fails the reducer is not run, subscribers are not
    /// notified, and every middleware that already forwarded the action is
    /// told it was aborted.
    pub async fn dispatch(&self, action: Action) -> Result<()> {
        let chain: Vec<Arc<dyn Middleware>> = self.middleware.read().unwrap().clone();

        let mut action = action;
        let mut forwarded: Vec<(Arc<dyn Middleware>, String)> = Vec::with_capacity(chain.len());
        for middleware in chain {
            match middleware.handle(action).await {
                Ok(next) => {
                    forwarded.push((middleware, next.kind.clone()));
                    action = next;
                }
                Err(e) => {
                    for (middleware, kind) in forwarded.iter().rev() {
                        middleware.aborted(kind);
                    }
                    return Err(e);
                }
            }
        }

        {
            let mut state = self.state.write().unwrap();
            (self.reducer)(&mut *state, &action);
        }
        for (middleware, kind) in &forwarded {
            middleware.reduced(kind);
        }
        self.notify();
        Ok(())
    }

    /// Notify all subscribers of a state change.
    fn notify(&self) {
        let state = self.state.read().unwrap();
        let subscribers = self.subscribers.entries.read().unwrap();
        for (_, subscriber) in subscribers.iter() {
            subscriber(&*state);
        }
    }
}

impl<T> Clone for Store<T> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            reducer: Arc::clone(&self.reducer),
            middleware: Arc::clone(&self.middleware),
            subscribers: Arc::clone(&self.subscribers),
        }
    }
}

/// Handle returned by [`Store::subscribe`].
pub struct Subscription {
    remove: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    /// Stop receiving state updates. Calling this twice is a no-op.
    pub fn unsubscribe(&mut self) {
        if let Some(remove) = self.remove.take() {
            remove();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.remove.is_some())
            .finish()
    }
}
