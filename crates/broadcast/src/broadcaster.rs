//! Broadcast orchestration.
//!
//! Drives one fan-out end to end: resolve recipients, compose the final
//! text, deliver sequentially with pacing, and report whether at least one
//! delivery succeeded. Which specific recipients failed is not surfaced;
//! callers only need "did anything get through".

use std::time::Duration;

use herald_common::error::AppError;
use herald_common::messenger::Messenger;
use herald_common::types::TriggerMessage;

use crate::delivery::deliver;
use crate::resolver::RecipientResolver;
use crate::subscription::SubscriptionStore;

/// Fixed pause between successive delivery attempts. This sequential pacing
/// IS the outbound rate limiter; deliveries must not be parallelized while
/// it is the mechanism in place.
const DELIVERY_PACING: Duration = Duration::from_millis(50);

/// Orchestrates a single broadcast over the full recipient set.
pub struct Broadcaster {
    resolver: RecipientResolver,
}

impl Broadcaster {
    pub fn new(max_admins: usize) -> Self {
        Self {
            resolver: RecipientResolver::new(max_admins),
        }
    }

    /// Fan `base_text` out to everyone who should see it.
    ///
    /// Returns `Ok(true)` if at least one delivery succeeded. An empty
    /// recipient set short-circuits to `Ok(false)` without a single send.
    /// Runs to completion over the whole set; there is no cancellation.
    pub async fn broadcast<M: Messenger>(
        &self,
        messenger: &M,
        store: &SubscriptionStore,
        trigger: &TriggerMessage,
        base_text: &str,
    ) -> Result<bool, AppError> {
        let recipients = self
            .resolver
            .resolve(messenger, store, trigger.chat_id)
            .await?;

        if recipients.is_empty() {
            tracing::info!(chat_id = trigger.chat_id, "No recipients to notify");
            return Ok(false);
        }

        let text = compose_text(trigger, base_text);

        let mut delivered = 0u32;
        for user_id in &recipients {
            if deliver(messenger, store, *user_id, &text).await? {
                delivered += 1;
            }
            tokio::time::sleep(DELIVERY_PACING).await;
        }

        tracing::info!(
            chat_id = trigger.chat_id,
            recipients = recipients.len(),
            delivered,
            "Broadcast finished"
        );

        Ok(delivered > 0)
    }
}

/// Final notification text: the base message plus the group title and a
/// canonical link to the triggering message.
fn compose_text(trigger: &TriggerMessage, base_text: &str) -> String {
    format!(
        "{} Chat \"{}\": {}",
        base_text,
        trigger.title,
        trigger.link()
    )
}
