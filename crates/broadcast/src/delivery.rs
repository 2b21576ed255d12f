//! Per-recipient delivery with bounded retry.
//!
//! A delivery either lands or is converted into a local decision: unsubscribe
//! (permanent failures), one backoff-and-retry (rate limit), or skip
//! (anything else). The transport outcome never propagates to the caller;
//! only a subscription-store failure does.

use std::time::Duration;

use herald_common::error::AppError;
use herald_common::messenger::{Messenger, MessengerError};

use crate::subscription::SubscriptionStore;

/// Send one message to one recipient.
///
/// Returns `Ok(true)` on delivery and `Ok(false)` on any transport failure;
/// `Err` is reserved for the store, which is fatal to the broadcast.
///
/// The rate-limit retry is a two-state loop over `waited`: the first
/// `RateLimited` sleeps the indicated wait and retries once, a second one is
/// final. Permanent failures (blocked / deactivated / chat gone) unsubscribe
/// the recipient everywhere and are never retried.
pub async fn deliver<M: Messenger>(
    messenger: &M,
    store: &SubscriptionStore,
    user_id: i64,
    text: &str,
) -> Result<bool, AppError> {
    let mut waited = false;
    loop {
        let failure = match messenger.send_message(user_id, text).await {
            Ok(_) => return Ok(true),
            Err(failure) => failure,
        };

        match failure {
            MessengerError::Blocked => {
                tracing::info!(user_id, "Recipient has blocked the bot, unsubscribing");
                store.forget(user_id).await?;
                return Ok(false);
            }
            MessengerError::Deactivated => {
                tracing::info!(user_id, "Recipient account is deactivated, unsubscribing");
                store.forget(user_id).await?;
                return Ok(false);
            }
            MessengerError::ChatNotFound => {
                tracing::info!(user_id, "Recipient chat not found, unsubscribing");
                store.forget(user_id).await?;
                return Ok(false);
            }
            MessengerError::RateLimited { retry_after } => {
                if waited {
                    tracing::info!(user_id, retry_after, "Rate limited again, giving up");
                    return Ok(false);
                }
                tracing::info!(user_id, retry_after, "Rate limited, backing off for one retry");
                tokio::time::sleep(Duration::from_secs(retry_after)).await;
                waited = true;
            }
            MessengerError::Api(reason) => {
                // Possibly transient; the recipient may still be valid, so the
                // subscription stays.
                tracing::warn!(user_id, %reason, "Delivery failed");
                return Ok(false);
            }
        }
    }
}
