//! A minimal action/reducer store.
//!
//! Stores hold application state, change it only through dispatched actions,
//! and let middleware intercept those actions on the way in.

mod middleware;
mod store;

pub use middleware::Middleware;
pub use store::{Store, Subscription};
