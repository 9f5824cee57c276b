//! Local entity cache for chatsync.
//!
//! - [`EntityStore`]: records keyed by [`EntityKey`](chatsync_types::EntityKey)
//!   with load status, content and the selection, plus request tickets that
//!   keep late responses from overwriting newer state
//! - [`selectors`]: pure queries over a store
//! - [`SyncCoordinator`]: runs [`EntityStorage`](chatsync_api::EntityStorage)
//!   operations and keeps the store consistent with their results
//!
//! There is no global state; every cache is constructed by its owner.

mod coordinator;
mod error;
pub mod selectors;
mod store;

pub use coordinator::SyncCoordinator;
pub use error::{StateError, StateResult};
pub use store::{entity_scope, folder_scope, EntityRecord, EntityStore, RequestTicket};
