/// The group message that set off a broadcast.
///
/// Carries just enough of the originating chat to build the notification
/// text: group metadata is read live from each trigger and never persisted.
#[derive(Debug, Clone)]
pub struct TriggerMessage {
    pub chat_id: i64,
    pub message_id: i64,
    /// Group display title.
    pub title: String,
    /// Public handle of the group, if it has one.
    pub username: Option<String>,
}

impl TriggerMessage {
    /// Canonical link to the triggering message.
    ///
    /// Public groups get the `t.me/<handle>/<message-id>` form; private
    /// groups get the `t.me/c/<chat-id>/<message-id>` form, which resolves
    /// only for members with access.
    pub fn link(&self) -> String {
        match &self.username {
            Some(name) => format!("https://t.me/{}/{}", name, self.message_id),
            None => format!("https://t.me/c/{}/{}", self.chat_id, self.message_id),
        }
    }
}
