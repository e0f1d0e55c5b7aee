//! Slack Socket Mode listener: envelopes over a WebSocket, acknowledged one by one.
//! Handles: hello, disconnect, events_api (message, app_mention).

use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use futures::stream::Stream;
use futures::{SinkExt, StreamExt};
use prayerbot_core::config::SlackConfig;
use prayerbot_core::error::{PrayerError, Result};
use prayerbot_core::types::IncomingMessage;
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as WsMessage;

use crate::slack::check_ok;

/// One decoded Socket Mode frame.
#[derive(Debug, Clone, PartialEq)]
pub enum SocketFrame {
    Hello,
    /// Slack is about to close the socket; reconnect.
    Disconnect { reason: String },
    /// Any enveloped payload. `message` is set for events the bot cares about.
    Envelope {
        envelope_id: String,
        message: Option<IncomingMessage>,
    },
    Other,
}

/// Why a single socket session ended.
enum SessionEnd {
    Reconnect,
    ReceiverDropped,
}

pub struct SocketModeListener {
    client: reqwest::Client,
    api_base: String,
    app_token: String,
    reconnect_delay: Duration,
}

impl SocketModeListener {
    pub fn new(config: &SlackConfig) -> Result<Self> {
        if config.app_token.is_empty() {
            return Err(PrayerError::Config(
                "Slack app token missing (set slack.app_token or SLACK_APP_TOKEN)".into(),
            ));
        }
        Ok(Self {
            client: reqwest::Client::new(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            app_token: config.app_token.clone(),
            reconnect_delay: Duration::from_secs(config.reconnect_delay_secs),
        })
    }

    /// Ask Slack for a fresh WebSocket URL.
    async fn open_connection_url(&self) -> Result<String> {
        let response = self
            .client
            .post(format!("{}/apps.connections.open", self.api_base))
            .bearer_auth(&self.app_token)
            .send()
            .await
            .map_err(|e| PrayerError::Gateway(format!("apps.connections.open failed: {e}")))?;
        let body: Value = response
            .json()
            .await
            .map_err(|e| PrayerError::Gateway(format!("Invalid apps.connections.open response: {e}")))?;
        check_ok("apps.connections.open", &body)?;
        body["url"]
            .as_str()
            .map(String::from)
            .ok_or_else(|| PrayerError::Gateway("apps.connections.open returned no url".into()))
    }

    /// Start the listen loop, returns a stream of incoming messages.
    /// The loop reconnects until the stream is dropped.
    pub fn start(self) -> SocketModeStream {
        let (tx, rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            tracing::info!("Slack Socket Mode loop started");
            loop {
                match self.run_session(&tx).await {
                    Ok(SessionEnd::ReceiverDropped) => {
                        tracing::info!("Slack Socket Mode stopped (receiver dropped)");
                        return;
                    }
                    Ok(SessionEnd::Reconnect) => {
                        tracing::info!("Slack Socket Mode reconnecting");
                    }
                    Err(e) => tracing::error!("Slack Socket Mode error: {e}"),
                }
                if tx.is_closed() {
                    return;
                }
                tokio::time::sleep(self.reconnect_delay).await;
            }
        });

        SocketModeStream { rx }
    }

    async fn run_session(&self, tx: &mpsc::UnboundedSender<IncomingMessage>) -> Result<SessionEnd> {
        let url = self.open_connection_url().await?;
        let (ws_stream, _response) = tokio_tungstenite::connect_async(url.as_str())
            .await
            .map_err(|e| PrayerError::Gateway(format!("WebSocket connect failed: {e}")))?;
        tracing::info!("Slack Socket Mode connected");

        let (mut write, mut read) = ws_stream.split();

        while let Some(frame) = read.next().await {
            let text = match frame {
                Ok(WsMessage::Text(text)) => text,
                Ok(WsMessage::Ping(data)) => {
                    tracing::trace!("Slack ping received ({} bytes)", data.len());
                    continue;
                }
                Ok(WsMessage::Close(frame)) => {
                    tracing::info!("Slack WebSocket closed: {:?}", frame);
                    return Ok(SessionEnd::Reconnect);
                }
                Ok(_) => continue,
                Err(e) => {
                    return Err(PrayerError::Gateway(format!("WebSocket error: {e}")));
                }
            };

            match parse_frame(&text) {
                Ok(SocketFrame::Hello) => tracing::debug!("Slack hello"),
                Ok(SocketFrame::Disconnect { reason }) => {
                    tracing::info!("Slack asked us to reconnect: {reason}");
                    return Ok(SessionEnd::Reconnect);
                }
                Ok(SocketFrame::Envelope {
                    envelope_id,
                    message,
                }) => {
                    let ack = json!({ "envelope_id": envelope_id }).to_string();
                    write
                        .send(WsMessage::Text(ack))
                        .await
                        .map_err(|e| PrayerError::Gateway(format!("Envelope ack failed: {e}")))?;

                    if let Some(message) = message
                        && tx.send(message).is_err()
                    {
                        return Ok(SessionEnd::ReceiverDropped);
                    }
                }
                Ok(SocketFrame::Other) => {}
                Err(e) => tracing::warn!("Failed to parse Slack frame: {e}"),
            }
        }

        Ok(SessionEnd::Reconnect)
    }
}

/// Decode one Socket Mode text frame.
pub fn parse_frame(text: &str) -> Result<SocketFrame> {
    let json: Value = serde_json::from_str(text)?;

    match json["type"].as_str().unwrap_or_default() {
        "hello" => return Ok(SocketFrame::Hello),
        "disconnect" => {
            return Ok(SocketFrame::Disconnect {
                reason: json["reason"].as_str().unwrap_or("unknown").to_string(),
            });
        }
        _ => {}
    }

    let Some(envelope_id) = json["envelope_id"].as_str() else {
        return Ok(SocketFrame::Other);
    };
    let message = if json["type"] == "events_api" {
        event_to_incoming(&json["payload"]["event"])
    } else {
        None
    };
    Ok(SocketFrame::Envelope {
        envelope_id: envelope_id.to_string(),
        message,
    })
}

/// Keep mentions anywhere and plain messages in DMs; drop bot posts and edits.
/// A mention in a channel also arrives as a `message` event, so only DM
/// messages are taken from that event type.
pub fn event_to_incoming(event: &Value) -> Option<IncomingMessage> {
    if event.get("bot_id").is_some() || event.get("subtype").is_some() {
        return None;
    }

    let is_direct = match event["type"].as_str()? {
        "app_mention" => None,
        "message" if event["channel_type"] == "im" => Some(true),
        _ => return None,
    };

    Some(IncomingMessage {
        channel_id: event["channel"].as_str()?.to_string(),
        user_id: event["user"].as_str()?.to_string(),
        text: event["text"].as_str()?.to_string(),
        is_direct,
    })
}

/// Stream of incoming Slack messages.
pub struct SocketModeStream {
    rx: mpsc::UnboundedReceiver<IncomingMessage>,
}

impl Stream for SocketModeStream {
    type Item = IncomingMessage;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}
