//! Error taxonomy shared across the fleet.
//!
//! Each concern gets its own closed enum so callers match on a known set of
//! cases instead of matching on strings. Process `main`s wrap these in
//! `anyhow` the same way the rest of the fleet does.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("database error: {0}")]
    Backend(#[from] sqlx::Error),
    #[error("monitor not found")]
    NotFound,
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend error: {0}")]
    Backend(#[from] redis::RedisError),
}

#[derive(Debug, Error)]
pub enum BusError {
    #[error("bus error: {0}")]
    Backend(#[from] lapin::Error),
}

/// The closed set of chat-API failures that mean "this monitor can no longer
/// be delivered to." A concrete `ChatClient`
/// implementation is responsible for classifying its own transport errors
/// into this set; anything that doesn't match is an ordinary transient
/// error and is handled by the "Otherwise" row of the error-policy table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ChannelAccessError {
    #[error("chat not found")]
    ChatNotFound,
    #[error("bot was kicked from the channel")]
    BotKicked,
    #[error("bot lacks post rights in the channel")]
    NoPostRights,
    #[error("bot lacks photo-send rights in the channel")]
    NoPhotoRights,
}
