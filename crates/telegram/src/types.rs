//! Bot API wire types — just the fields Herald reads.

use serde::Deserialize;

use herald_common::messenger::ChatAdministrator;

/// One long-poll update.
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub from: Option<User>,
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
    /// Set on service messages announcing users who just joined the chat.
    #[serde(default)]
    pub new_chat_members: Vec<User>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: ChatKind,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatKind {
    Private,
    Group,
    Supergroup,
    Channel,
    #[serde(other)]
    Unknown,
}

impl ChatKind {
    /// Groups and supergroups are where subscriptions and summons live.
    pub fn is_group(self) -> bool {
        matches!(self, ChatKind::Group | ChatKind::Supergroup)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    pub first_name: String,
    #[serde(default)]
    pub last_name: Option<String>,
}

impl User {
    pub fn full_name(&self) -> String {
        match &self.last_name {
            Some(last) => format!("{} {}", self.first_name, last),
            None => self.first_name.clone(),
        }
    }
}

/// One entry of a getChatAdministrators response.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatMemberInfo {
    pub user: User,
    pub status: String,
    #[serde(default)]
    pub can_delete_messages: Option<bool>,
    #[serde(default)]
    pub is_member: Option<bool>,
}

impl ChatMemberInfo {
    /// Collapse the wire representation into the capability view the
    /// resolver filters on.
    ///
    /// The API omits individual rights for the chat owner (status
    /// `creator`), who holds every right implicitly, so a missing
    /// `can_delete_messages` counts as granted for owners only. Entries in
    /// an administrator list are members unless explicitly flagged
    /// otherwise.
    pub fn into_administrator(self) -> ChatAdministrator {
        let is_owner = self.status == "creator";
        ChatAdministrator {
            user_id: self.user.id,
            can_delete_messages: self.can_delete_messages.unwrap_or(is_owner),
            is_member: self.is_member.unwrap_or(true),
        }
    }
}
