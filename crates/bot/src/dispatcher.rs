//! Long-polling update dispatcher.
//!
//! Pulls updates off the Bot API and routes them to handlers. A handler
//! failure is logged and never kills the loop; only startup errors are
//! fatal.

use std::time::Duration;

use herald_broadcast::broadcaster::Broadcaster;
use herald_broadcast::subscription::SubscriptionStore;
use herald_common::error::AppError;
use herald_common::messenger::Messenger;
use herald_common::types::TriggerMessage;
use herald_telegram::TelegramClient;
use herald_telegram::types::Message;

use crate::cas::CasClient;
use crate::commands::Command;

const WELCOME_TEXT: &str = "This bot watches groups and supergroups for the /spam \
command and summons the people who can clean the spam up. Every new group member \
is also checked against the CAS database.\n\n\
Type /spamme in a group to subscribe to its spam reports and /spamnot to \
unsubscribe. There are no settings and no other commands.\n\n\
Powered by CAS: https://cas.chat/";

const PRIVATE_SUBSCRIBE_TEXT: &str = "Subscribing in a private chat is not yet supported.";
const PRIVATE_UNSUBSCRIBE_TEXT: &str = "Unsubscribing in a private chat is not yet supported.";
const SUMMON_TEXT: &str = "You have been summoned to delete spam:";
const NO_RECIPIENTS_TEXT: &str = "Please ask your admins to type /spamme.";

/// How long the 📨 status reply stays up before the cleanup task removes it.
const STATUS_CLEANUP_DELAY: Duration = Duration::from_secs(60);

/// Pause before re-polling after a failed getUpdates call.
const POLL_RETRY_DELAY: Duration = Duration::from_secs(3);

pub struct UpdateDispatcher {
    client: TelegramClient,
    store: SubscriptionStore,
    broadcaster: Broadcaster,
    cas: CasClient,
    poll_timeout_secs: u64,
}

impl UpdateDispatcher {
    pub fn new(
        client: TelegramClient,
        store: SubscriptionStore,
        broadcaster: Broadcaster,
        cas: CasClient,
        poll_timeout_secs: u64,
    ) -> Self {
        Self {
            client,
            store,
            broadcaster,
            cas,
            poll_timeout_secs,
        }
    }

    /// Run the polling loop indefinitely.
    pub async fn run(&self) -> anyhow::Result<()> {
        tracing::info!(poll_timeout_secs = self.poll_timeout_secs, "Dispatcher started");

        let mut offset = 0i64;
        loop {
            let updates = match self.client.get_updates(offset, self.poll_timeout_secs).await {
                Ok(updates) => updates,
                Err(error) => {
                    tracing::warn!(%error, "getUpdates failed, retrying");
                    tokio::time::sleep(POLL_RETRY_DELAY).await;
                    continue;
                }
            };

            for update in updates {
                offset = offset.max(update.update_id + 1);
                let Some(message) = update.message else {
                    continue;
                };
                if let Err(error) = self.dispatch(&message).await {
                    tracing::error!(chat_id = message.chat.id, %error, "Handler failed");
                }
            }
        }
    }

    async fn dispatch(&self, message: &Message) -> Result<(), AppError> {
        if message.chat.kind.is_group() && !message.new_chat_members.is_empty() {
            return self.handle_new_members(message).await;
        }

        let Some(text) = message.text.as_deref() else {
            return Ok(());
        };
        let Some(command) = Command::parse(text) else {
            return Ok(());
        };

        match command {
            Command::Start | Command::Help => {
                self.send_or_log(message.chat.id, WELCOME_TEXT).await;
            }
            Command::SubscribeMe => self.handle_subscribe(message).await?,
            Command::UnsubscribeMe => self.handle_unsubscribe(message).await?,
            Command::Summon => {
                if message.chat.kind.is_group() {
                    self.handle_summon(message).await?;
                }
            }
        }
        Ok(())
    }

    async fn handle_subscribe(&self, message: &Message) -> Result<(), AppError> {
        if !message.chat.kind.is_group() {
            self.send_or_log(message.chat.id, PRIVATE_SUBSCRIBE_TEXT).await;
            return Ok(());
        }
        let Some(user) = &message.from else {
            return Ok(());
        };

        self.store.subscribe(user.id, message.chat.id).await?;
        self.reply_or_log(message, "👍").await;
        Ok(())
    }

    async fn handle_unsubscribe(&self, message: &Message) -> Result<(), AppError> {
        if !message.chat.kind.is_group() {
            self.send_or_log(message.chat.id, PRIVATE_UNSUBSCRIBE_TEXT).await;
            return Ok(());
        }
        let Some(user) = &message.from else {
            return Ok(());
        };

        self.store.unsubscribe(user.id, message.chat.id).await?;
        self.reply_or_log(message, "🆗").await;
        Ok(())
    }

    async fn handle_summon(&self, message: &Message) -> Result<(), AppError> {
        let trigger = trigger_from(message);
        let delivered = self
            .broadcaster
            .broadcast(&self.client, &self.store, &trigger, SUMMON_TEXT)
            .await?;

        if delivered {
            match self.client.send_text(message.chat.id, "📨").await {
                Ok(status) => self.schedule_status_cleanup(message.chat.id, status.message_id),
                Err(error) => {
                    tracing::warn!(chat_id = message.chat.id, %error, "Failed to send status reply");
                }
            }
        } else {
            self.send_or_log(message.chat.id, NO_RECIPIENTS_TEXT).await;
        }
        Ok(())
    }

    async fn handle_new_members(&self, message: &Message) -> Result<(), AppError> {
        for user in &message.new_chat_members {
            if !self.cas.check(user.id).await {
                continue;
            }
            tracing::info!(
                user_id = user.id,
                chat_id = message.chat.id,
                "New member flagged by CAS"
            );
            let text = format!(
                "CAS lists this new member as a likely spammer: {}.",
                user.full_name()
            );
            self.broadcaster
                .broadcast(&self.client, &self.store, &trigger_from(message), &text)
                .await?;
        }
        Ok(())
    }

    /// Remove the status reply after a fixed delay. The deletion runs as its
    /// own spawned task and contains its own failures (the message may
    /// already be gone).
    fn schedule_status_cleanup(&self, chat_id: i64, message_id: i64) {
        let client = self.client.clone();
        tokio::spawn(async move {
            tokio::time::sleep(STATUS_CLEANUP_DELAY).await;
            if let Err(error) = client.delete_message(chat_id, message_id).await {
                tracing::debug!(chat_id, message_id, %error, "Status cleanup failed");
            }
        });
    }

    async fn send_or_log(&self, chat_id: i64, text: &str) {
        if let Err(error) = self.client.send_text(chat_id, text).await {
            tracing::warn!(chat_id, %error, "Failed to send reply");
        }
    }

    async fn reply_or_log(&self, message: &Message, text: &str) {
        if let Err(error) = self
            .client
            .reply(message.chat.id, message.message_id, text)
            .await
        {
            tracing::warn!(chat_id = message.chat.id, %error, "Failed to send reply");
        }
    }
}

fn trigger_from(message: &Message) -> TriggerMessage {
    TriggerMessage {
        chat_id: message.chat.id,
        message_id: message.message_id,
        title: message.chat.title.clone().unwrap_or_default(),
        username: message.chat.username.clone(),
    }
}
