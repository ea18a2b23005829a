//! Operator alerts.
//!
//! Delivery is best effort: a failed send is logged and swallowed so it can
//! never abort the cycle that raised the alert.

use std::future::Future;

use reqwest::header::AUTHORIZATION;

use crate::config::NotifyConfig;

/// Discord rejects message bodies longer than this.
const MAX_MESSAGE_CHARS: usize = 2000;

pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str) -> impl Future<Output = ()> + Send;
}

// ---------------------------------------------------------------------------
// LogNotifier
// ---------------------------------------------------------------------------

/// Writes alerts to the log only. Used for dry runs and when no channel is
/// configured.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    async fn notify(&self, message: &str) {
        tracing::warn!(%message, "operator alert (no channel configured)");
    }
}

// ---------------------------------------------------------------------------
// DiscordNotifier
// ---------------------------------------------------------------------------

/// Posts alerts to a single Discord channel through the bot REST API.
#[derive(Clone)]
pub struct DiscordNotifier {
    client: reqwest::Client,
    api_base: String,
    channel_id: String,
    bot_token: String,
}

impl DiscordNotifier {
    pub fn new(
        client: reqwest::Client,
        api_base: impl Into<String>,
        channel_id: impl Into<String>,
        bot_token: impl Into<String>,
    ) -> Self {
        Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            channel_id: channel_id.into(),
            bot_token: bot_token.into(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/channels/{}/messages", self.api_base, self.channel_id)
    }

    async fn send(&self, message: &str) -> Result<(), reqwest::Error> {
        let content: String = message.chars().take(MAX_MESSAGE_CHARS).collect();
        self.client
            .post(self.endpoint())
            .header(AUTHORIZATION, format!("Bot {}", self.bot_token))
            .json(&serde_json::json!({ "content": content }))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

impl Notifier for DiscordNotifier {
    async fn notify(&self, message: &str) {
        match self.send(message).await {
            Ok(()) => tracing::info!(channel = %self.channel_id, "operator alert delivered"),
            Err(e) => {
                tracing::error!(channel = %self.channel_id, error = %e, "failed to deliver operator alert")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// OperatorNotifier
// ---------------------------------------------------------------------------

/// The notifier selected from configuration.
#[derive(Clone)]
pub enum OperatorNotifier {
    Discord(DiscordNotifier),
    Log(LogNotifier),
}

impl OperatorNotifier {
    /// Build from configuration, degrading to [`LogNotifier`] when the channel
    /// id or bot token is missing.
    pub fn from_config(client: reqwest::Client, config: &NotifyConfig) -> Self {
        match (non_empty(&config.channel_id), non_empty(&config.bot_token)) {
            (Some(channel), Some(token)) => {
                Self::Discord(DiscordNotifier::new(client, &config.api_base, channel, token))
            }
            (None, _) => {
                tracing::warn!("NOTIFICATION_CHANNEL_ID not set; operator alerts go to the log only");
                Self::Log(LogNotifier)
            }
            (Some(_), None) => {
                tracing::warn!("DISCORD_TOKEN not set; operator alerts go to the log only");
                Self::Log(LogNotifier)
            }
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl Notifier for OperatorNotifier {
    async fn notify(&self, message: &str) {
        match self {
            Self::Discord(n) => n.notify(message).await,
            Self::Log(n) => n.notify(message).await,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    #[tokio::test]
    async fn discord_posts_content_with_bot_auth() {
        let mut server = mockito::Server::new_async().await;
        let m = server
            .mock("POST", "/channels/12345/messages")
            .match_header("authorization", "Bot secret-token")
            .match_body(Matcher::Json(serde_json::json!({ "content": "cookie expired" })))
            .with_status(200)
            .with_body("{}")
            .expect(1)
            .create_async()
            .await;

        let notifier =
            DiscordNotifier::new(reqwest::Client::new(), server.url(), "12345", "secret-token");
        notifier.notify("cookie expired").await;
        m.assert_async().await;
    }

    #[tokio::test]
    async fn delivery_failure_is_swallowed() {
        let mut server = mockito::Server::new_async().await;
        let m = server
            .mock("POST", "/channels/1/messages")
            .with_status(500)
            .expect(1)
            .create_async()
            .await;

        let notifier = DiscordNotifier::new(reqwest::Client::new(), server.url(), "1", "t");
        // Must return normally despite the 500.
        notifier.notify("hello").await;
        m.assert_async().await;
    }

    #[tokio::test]
    async fn long_messages_are_truncated() {
        let mut server = mockito::Server::new_async().await;
        let expected = "x".repeat(MAX_MESSAGE_CHARS);
        let m = server
            .mock("POST", "/channels/1/messages")
            .match_body(Matcher::Json(serde_json::json!({ "content": expected })))
            .with_status(200)
            .create_async()
            .await;

        let notifier = DiscordNotifier::new(reqwest::Client::new(), server.url(), "1", "t");
        notifier.notify(&"x".repeat(MAX_MESSAGE_CHARS + 50)).await;
        m.assert_async().await;
    }

    #[test]
    fn missing_channel_degrades_to_log() {
        let config = NotifyConfig {
            channel_id: None,
            bot_token: Some("t".into()),
            ..NotifyConfig::default()
        };
        let n = OperatorNotifier::from_config(reqwest::Client::new(), &config);
        assert!(matches!(n, OperatorNotifier::Log(_)));
    }

    #[test]
    fn blank_token_degrades_to_log() {
        let config = NotifyConfig {
            channel_id: Some("1".into()),
            bot_token: Some("  ".into()),
            ..NotifyConfig::default()
        };
        let n = OperatorNotifier::from_config(reqwest::Client::new(), &config);
        assert!(matches!(n, OperatorNotifier::Log(_)));
    }

    #[test]
    fn full_config_selects_discord() {
        let config = NotifyConfig {
            channel_id: Some("42".into()),
            bot_token: Some("t".into()),
            ..NotifyConfig::default()
        };
        match OperatorNotifier::from_config(reqwest::Client::new(), &config) {
            OperatorNotifier::Discord(d) => {
                assert_eq!(d.endpoint(), format!("{}/channels/42/messages", config.api_base));
            }
            OperatorNotifier::Log(_) => panic!("expected discord notifier"),
        }
    }
}
