//! Slack Web API gateway.

use async_trait::async_trait;
use prayerbot_core::config::SlackConfig;
use prayerbot_core::error::{PrayerError, Result};
use prayerbot_core::traits::MessagingGateway;
use prayerbot_core::types::BotIdentity;
use serde_json::{Value, json};

/// Talks to the Slack Web API with the bot token.
pub struct SlackGateway {
    client: reqwest::Client,
    api_base: String,
    bot_token: String,
    identity: BotIdentity,
}

impl SlackGateway {
    /// Build a gateway and discover who the bot is via `auth.test`.
    pub async fn connect(config: &SlackConfig) -> Result<Self> {
        if config.bot_token.is_empty() {
            return Err(PrayerError::Config(
                "Slack bot token missing (set slack.bot_token or SLACK_BOT_TOKEN)".into(),
            ));
        }

        let mut gateway = Self::with_identity(config, BotIdentity::default());
        let auth = gateway.call_post("auth.test", json!({})).await?;
        gateway.identity = BotIdentity {
            user_id: auth["user_id"].as_str().unwrap_or_default().to_string(),
            name: auth["user"]
                .as_str()
                .filter(|n| !n.is_empty())
                .unwrap_or(config.bot_name.as_str())
                .to_string(),
        };
        tracing::info!(
            "Slack bot: @{} ({}) on {}",
            gateway.identity.name,
            gateway.identity.user_id,
            auth["team"].as_str().unwrap_or("unknown team")
        );
        Ok(gateway)
    }

    /// Build a gateway with an already known identity. No network calls.
    pub fn with_identity(config: &SlackConfig, identity: BotIdentity) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            bot_token: config.bot_token.clone(),
            identity,
        }
    }

    pub fn identity(&self) -> &BotIdentity {
        &self.identity
    }

    fn api_url(&self, method: &str) -> String {
        format!("{}/{}", self.api_base, method)
    }

    /// Read methods take form arguments.
    async fn call_get(&self, method: &str, query: &[(&str, &str)]) -> Result<Value> {
        let response = self
            .client
            .get(self.api_url(method))
            .bearer_auth(&self.bot_token)
            .query(query)
            .send()
            .await
            .map_err(|e| PrayerError::Gateway(format!("Slack {method} failed: {e}")))?;
        parse_response(method, response).await
    }

    async fn call_post(&self, method: &str, body: Value) -> Result<Value> {
        let response = self
            .client
            .post(self.api_url(method))
            .bearer_auth(&self.bot_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| PrayerError::Gateway(format!("Slack {method} failed: {e}")))?;
        parse_response(method, response).await
    }
}

async fn parse_response(method: &str, response: reqwest::Response) -> Result<Value> {
    let body: Value = response
        .json()
        .await
        .map_err(|e| PrayerError::Gateway(format!("Invalid Slack {method} response: {e}")))?;
    check_ok(method, &body)?;
    Ok(body)
}

/// Slack reports failures in-band with `"ok": false` and an `error` code.
pub(crate) fn check_ok(method: &str, body: &Value) -> Result<()> {
    if body["ok"].as_bool() == Some(true) {
        return Ok(());
    }
    Err(PrayerError::Gateway(format!(
        "Slack {method} returned error: {}",
        body["error"].as_str().unwrap_or("unknown_error")
    )))
}

/// First name from the profile, else the real name, else the username.
pub(crate) fn display_name_from(user: &Value) -> Option<String> {
    [
        &user["profile"]["first_name"],
        &user["profile"]["real_name"],
        &user["name"],
    ]
    .into_iter()
    .filter_map(Value::as_str)
    .map(str::trim)
    .find(|name| !name.is_empty())
    .map(String::from)
}

#[async_trait]
impl MessagingGateway for SlackGateway {
    async fn resolve_display_name(&self, user_id: &str) -> String {
        match self.call_get("users.info", &[("user", user_id)]).await {
            Ok(body) => display_name_from(&body["user"]).unwrap_or_else(|| user_id.to_string()),
            Err(e) => {
                tracing::warn!("Could not look up name of {user_id}: {e}");
                user_id.to_string()
            }
        }
    }

    async fn is_direct_message_channel(&self, channel_id: &str) -> Result<bool> {
        let body = self
            .call_get("conversations.info", &[("channel", channel_id)])
            .await?;
        Ok(body["channel"]["is_im"].as_bool().unwrap_or(false))
    }

    async fn create_private_conversation(&self, user_ids: &[String]) -> Result<String> {
        // The bot joins implicitly; listing itself is rejected.
        let users: Vec<&str> = user_ids
            .iter()
            .map(String::as_str)
            .filter(|u| *u != self.identity.user_id)
            .collect();
        let body = self
            .call_post("conversations.open", json!({ "users": users.join(",") }))
            .await?;
        body["channel"]["id"]
            .as_str()
            .map(String::from)
            .ok_or_else(|| PrayerError::Gateway("Slack conversations.open returned no channel".into()))
    }

    async fn post_message(&self, conversation_id: &str, text: &str) -> Result<()> {
        self.call_post(
            "chat.postMessage",
            json!({ "channel": conversation_id, "text": text }),
        )
        .await?;
        Ok(())
    }

    async fn post_ephemeral(&self, channel_id: &str, user_id: &str, text: &str) -> Result<()> {
        self.call_post(
            "chat.postEphemeral",
            json!({ "channel": channel_id, "user": user_id, "text": text }),
        )
        .await?;
        Ok(())
    }

    async fn leave_conversation(&self, conversation_id: &str) -> Result<()> {
        self.call_post("conversations.leave", json!({ "channel": conversation_id }))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_ok() {
        assert!(check_ok("chat.postMessage", &json!({"ok": true})).is_ok());

        let err = check_ok("conversations.open", &json!({"ok": false, "error": "user_not_found"}))
            .unwrap_err();
        assert!(matches!(err, PrayerError::Gateway(_)));
        assert!(err.to_string().contains("conversations.open"));
        assert!(err.to_string().contains("user_not_found"));

        let err = check_ok("users.info", &json!({})).unwrap_err();
        assert!(err.to_string().contains("unknown_error"));
    }

    #[test]
    fn test_display_name_prefers_first_name() {
        let user = json!({
            "name": "jdoe",
            "profile": {"first_name": "Jane", "real_name": "Jane Doe"}
        });
        assert_eq!(display_name_from(&user).as_deref(), Some("Jane"));
    }

    #[test]
    fn test_display_name_fallbacks() {
        let user = json!({"name": "jdoe", "profile": {"first_name": "", "real_name": "Jane Doe"}});
        assert_eq!(display_name_from(&user).as_deref(), Some("Jane Doe"));

        let user = json!({"name": "jdoe", "profile": {}});
        assert_eq!(display_name_from(&user).as_deref(), Some("jdoe"));

        assert_eq!(display_name_from(&json!({})), None);
    }

    #[test]
    fn test_api_url_trims_trailing_slash() {
        let config = SlackConfig {
            api_base: "http://localhost:9999/api/".into(),
            ..SlackConfig::default()
        };
        let gateway = SlackGateway::with_identity(&config, BotIdentity::default());
        assert_eq!(gateway.api_url("auth.test"), "http://localhost:9999/api/auth.test");
    }

    #[tokio::test]
    async fn test_connect_requires_token() {
        let result = SlackGateway::connect(&SlackConfig::default()).await;
        assert!(matches!(result, Err(PrayerError::Config(_))));
    }

    #[tokio::test]
    async fn test_unreachable_api_falls_back_to_raw_id() {
        let config = SlackConfig {
            bot_token: "xoxb-test".into(),
            api_base: "http://127.0.0.1:9/api".into(),
            ..SlackConfig::default()
        };
        let gateway = SlackGateway::with_identity(&config, BotIdentity::default());
        assert_eq!(gateway.resolve_display_name("U123").await, "U123");
        assert!(matches!(
            gateway.post_message("C1", "hi").await,
            Err(PrayerError::Gateway(_))
        ));
    }
}
