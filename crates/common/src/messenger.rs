//! The messenger capability the broadcast core depends on.
//!
//! The core never talks to a transport directly. It is written against this
//! trait, and every transport failure arrives pre-classified as a
//! [`MessengerError`] variant the delivery path can pattern-match on.

use std::future::Future;

use thiserror::Error;

/// Classified transport failure.
///
/// `Blocked`, `Deactivated`, and `ChatNotFound` are permanent for the
/// recipient in question; `RateLimited` is retryable after the indicated
/// wait; `Api` covers everything else, including network-level errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessengerError {
    #[error("Recipient has blocked the bot")]
    Blocked,

    #[error("Recipient account is deactivated")]
    Deactivated,

    #[error("Chat not found")]
    ChatNotFound,

    #[error("Rate limited, retry after {retry_after}s")]
    RateLimited { retry_after: u64 },

    #[error("API error: {0}")]
    Api(String),
}

/// One entry of a live group-administrator lookup.
#[derive(Debug, Clone)]
pub struct ChatAdministrator {
    pub user_id: i64,
    /// Whether this admin may delete messages in the group.
    pub can_delete_messages: bool,
    /// Whether this admin is currently a member (not left or banned).
    pub is_member: bool,
}

/// Abstract message transport.
///
/// Implemented by the Telegram client in production and by scripted fakes in
/// tests. All methods return futures that are `Send` so callers can run
/// inside spawned tasks.
pub trait Messenger: Send + Sync {
    /// Deliver a text message to a user or chat. Returns the id of the sent
    /// message.
    fn send_message(
        &self,
        chat_id: i64,
        text: &str,
    ) -> impl Future<Output = Result<i64, MessengerError>> + Send;

    /// Fetch the administrator list of a group, live.
    fn chat_administrators(
        &self,
        chat_id: i64,
    ) -> impl Future<Output = Result<Vec<ChatAdministrator>, MessengerError>> + Send;

    /// Best-effort deletion of a previously sent message.
    fn delete_message(
        &self,
        chat_id: i64,
        message_id: i64,
    ) -> impl Future<Output = Result<(), MessengerError>> + Send;
}
