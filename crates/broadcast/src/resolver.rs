//! Recipient resolution — who gets a given broadcast.
//!
//! The recipient set is the union of two sources: the group's current
//! administrators (fetched live, gated by a maximum count) and the persisted
//! subscribers of the chat. The result is a set, so a subscribed admin is
//! counted once.

use std::collections::HashSet;

use herald_common::error::AppError;
use herald_common::messenger::Messenger;

use crate::subscription::SubscriptionStore;

/// Resolves the deduplicated recipient set for a chat.
pub struct RecipientResolver {
    max_admins: usize,
}

impl RecipientResolver {
    pub fn new(max_admins: usize) -> Self {
        Self { max_admins }
    }

    /// Compute the recipient set for `chat_id`.
    ///
    /// Admins qualify if they can delete messages and are current members.
    /// If more than `max_admins` qualify, none of them are included; the cap
    /// is all-or-nothing, not a truncation. If the admin lookup fails at the
    /// transport level the broadcast degrades to subscribers only. Store
    /// failures are fatal and propagate.
    pub async fn resolve<M: Messenger>(
        &self,
        messenger: &M,
        store: &SubscriptionStore,
        chat_id: i64,
    ) -> Result<HashSet<i64>, AppError> {
        let mut ids = HashSet::new();

        match messenger.chat_administrators(chat_id).await {
            Ok(admins) => {
                let qualified: Vec<i64> = admins
                    .iter()
                    .filter(|admin| admin.can_delete_messages && admin.is_member)
                    .map(|admin| admin.user_id)
                    .collect();

                if qualified.len() <= self.max_admins {
                    ids.extend(qualified);
                } else {
                    tracing::debug!(
                        chat_id,
                        admins = qualified.len(),
                        max_admins = self.max_admins,
                        "Admin list over the cap, notifying subscribers only"
                    );
                }
            }
            Err(error) => {
                tracing::warn!(
                    chat_id,
                    %error,
                    "Admin lookup failed, notifying subscribers only"
                );
            }
        }

        ids.extend(store.subscribers_of(chat_id).await?);
        Ok(ids)
    }
}
