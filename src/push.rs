use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

/// Outbound push-notification boundary, injected into `AppState` rather
/// than living as a module-global client.
#[async_trait]
pub trait PushClient: Send + Sync {
    async fn send(&self, push_token: &str, title: &str, body: &str) -> anyhow::Result<()>;
}

/// Expo push tokens look like `ExponentPushToken[xxxxxxxx]`.
pub fn is_expo_push_token(token: &str) -> bool {
    (token.starts_with("ExponentPushToken[") || token.starts_with("ExpoPushToken["))
        && token.ends_with(']')
        && token.len() > "ExpoPushToken[]".len()
}

#[derive(Debug, Serialize)]
struct ExpoMessage<'a> {
    to: &'a str,
    sound: &'a str,
    title: &'a str,
    body: &'a str,
}

pub struct ExpoPushClient {
    http: reqwest::Client,
    url: String,
}

impl ExpoPushClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl PushClient for ExpoPushClient {
    async fn send(&self, push_token: &str, title: &str, body: &str) -> anyhow::Result<()> {
        anyhow::ensure!(
            is_expo_push_token(push_token),
            "push token {push_token} is not a valid Expo push token"
        );
        let message = ExpoMessage {
            to: push_token,
            sound: "default",
            title,
            body,
        };
        let response = self
            .http
            .post(&self.url)
            .json(&message)
            .send()
            .await?
            .error_for_status()?;
        debug!(status = %response.status(), "push notification dispatched");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_expo_push_tokens() {
        assert!(is_expo_push_token("ExponentPushToken[abc123]"));
        assert!(is_expo_push_token("ExpoPushToken[xyz]"));
        assert!(!is_expo_push_token("ExponentPushToken["));
        assert!(!is_expo_push_token("FcmToken[abc]"));
        assert!(!is_expo_push_token("just-a-string"));
        assert!(!is_expo_push_token(""));
    }

    #[test]
    fn message_serializes_expo_shape() {
        let msg = ExpoMessage {
            to: "ExponentPushToken[abc]",
            sound: "default",
            title: "t",
            body: "b",
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["to"], "ExponentPushToken[abc]");
        assert_eq!(json["sound"], "default");
    }
}
