//! # sync-client
//!
//! Client-side synchronization engine for roomsync chat rooms.
//!
//! This is the library a chat surface uses to keep one room's messages
//! current. It reconciles three sources into a single newest-first view:
//! the history snapshot, the live feed, and optimistic local sends.
//!
//! ## Features
//!
//! - **Optimistic Sends**: messages appear before the backend acknowledges them
//! - **Race-Safe Reconciliation**: a message is never shown twice, whichever
//!   of the feed and the create response arrives first
//! - **Automatic Recovery**: a lost live feed is resubscribed after a fixed delay
//! - **Backend Abstraction**: pluggable backend (any service, mock)
//! - **Pure State Machine**: uses sync-core for side-effect-free logic
//!
//! ## Example
//!
//! ```ignore
//! use roomsync_client::{MockBackend, RoomSession, SyncConfig};
//!
//! let backend = Arc::new(MockBackend::default());
//! let identity = Arc::new(SenderIdentity::new("u1").with_nickname("ada"));
//! let mut room = RoomSession::open(SyncConfig::default(), backend, identity, "general".into()).await;
//!
//! room.send("**hello** there").await?;
//! for message in room.messages().await {
//!     println!("{}: {}", message.display_name(), message.body);
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod config;
pub mod room;
pub mod send;
pub mod snapshot;
pub mod store;
pub mod subscription;

pub use backend::{
    BackendError, ChatBackend, EventStream, IdentityProvider, MockBackend, Subscription,
};
pub use config::SyncConfig;
pub use room::RoomSession;
pub use send::SendPipeline;
pub use snapshot::{SnapshotLoader, SnapshotStatus};
pub use store::SharedStore;
pub use subscription::SubscriptionManager;
