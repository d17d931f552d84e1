//! # sync-types
//!
//! Data model types for the roomsync chat synchronization engine.
//!
//! This crate provides the foundational types used across all roomsync crates:
//! - [`RoomId`], [`MessageId`], [`SenderIdentity`] - Identity types
//! - [`Message`], [`MessageState`] - The message record shown in a room
//! - [`SyncError`] - Error taxonomy reported to the presentation layer

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod ids;
mod message;

pub use error::SyncError;
pub use ids::{MessageId, RoomId, SenderIdentity, PROVISIONAL_PREFIX};
pub use message::{format_age, now_millis, Message, MessageState};
