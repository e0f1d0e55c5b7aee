//! Message and identity types exchanged between the transport and the bot.

use serde::{Deserialize, Serialize};

/// A text message addressed to (or overheard by) the bot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomingMessage {
    /// Channel the message was posted in; replies go back here.
    pub channel_id: String,
    /// Author of the message.
    pub user_id: String,
    pub text: String,
    /// `Some(true)` when the transport already knows this is a direct message,
    /// `None` when the channel kind has to be looked up.
    pub is_direct: Option<bool>,
}

/// Who the bot is on the chat workspace, discovered once at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotIdentity {
    pub user_id: String,
    pub name: String,
}

impl BotIdentity {
    /// The mention token other users type to address the bot, e.g. `<@U123>`.
    pub fn mention(&self) -> String {
        format!("<@{}>", self.user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mention_token() {
        let bot = BotIdentity {
            user_id: "U0BOT".into(),
            name: "prayerbot".into(),
        };
        assert_eq!(bot.mention(), "<@U0BOT>");
    }
}
