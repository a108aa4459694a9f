//! Telegram gateway — long-polls the Bot API for updates.
//!
//! Carries both plain group messages and inline-keyboard presses
//! (callback queries). Controls render as an inline keyboard; action
//! acknowledgments go out as `answerCallbackQuery` toasts, distinct from
//! any rendered message.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};

use crate::channels::{
    Action, ChatId, ChatKind, Control, EventPayload, EventStream, Gateway, MessageHandle,
    UserEvent, UserRef,
};
use crate::error::ChannelError;

/// Maximum message length for Telegram's sendMessage API.
const TELEGRAM_MAX_MESSAGE_LENGTH: usize = 4096;

/// Telegram gateway — connects to the Bot API via long-polling.
pub struct TelegramGateway {
    bot_token: SecretString,
    client: reqwest::Client,
}

impl TelegramGateway {
    pub fn new(bot_token: SecretString) -> Self {
        Self {
            bot_token,
            client: reqwest::Client::new(),
        }
    }

    fn api_url(&self, method: &str) -> String {
        format!(
            "https://api.telegram.org/bot{}/{method}",
            self.bot_token.expose_secret()
        )
    }

    async fn post(&self, method: &str, body: Value) -> Result<Value, ChannelError> {
        let resp = self
            .client
            .post(self.api_url(method))
            .json(&body)
            .send()
            .await
            .map_err(|e| ChannelError::SendFailed {
                name: "telegram".into(),
                reason: e.to_string(),
            })?;

        let status = resp.status();
        let data: Value = resp.json().await.map_err(|e| ChannelError::SendFailed {
            name: "telegram".into(),
            reason: e.to_string(),
        })?;

        if !status.is_success() || data.get("ok") != Some(&Value::Bool(true)) {
            return Err(ChannelError::SendFailed {
                name: "telegram".into(),
                reason: format!("{method} returned {status}: {data}"),
            });
        }
        Ok(data)
    }

    /// Send one chunk, Markdown-first with a plain-text retry.
    async fn send_chunk(
        &self,
        chat_id: &str,
        text: &str,
        keyboard: Option<&Value>,
    ) -> Result<MessageHandle, ChannelError> {
        let mut body = json!({
            "chat_id": chat_id,
            "text": text,
            "parse_mode": "Markdown",
        });
        if let Some(kb) = keyboard {
            body["reply_markup"] = kb.clone();
        }

        match self.post("sendMessage", body).await {
            Ok(data) => Ok(message_handle(&data)),
            Err(e) => {
                tracing::warn!(error = %e, "sendMessage with Markdown failed; retrying plain");
                let mut plain = json!({
                    "chat_id": chat_id,
                    "text": text,
                });
                if let Some(kb) = keyboard {
                    plain["reply_markup"] = kb.clone();
                }
                let data = self.post("sendMessage", plain).await?;
                Ok(message_handle(&data))
            }
        }
    }
}

#[async_trait]
impl Gateway for TelegramGateway {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn start(&self) -> Result<EventStream, ChannelError> {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let client = self.client.clone();
        let url = self.api_url("getUpdates");

        tokio::spawn(async move {
            let mut offset: i64 = 0;

            tracing::info!("Telegram gateway listening for updates...");

            loop {
                let body = json!({
                    "offset": offset,
                    "timeout": 30,
                    "allowed_updates": ["message", "callback_query"],
                });

                let resp = match client.post(&url).json(&body).send().await {
                    Ok(r) => r,
                    Err(e) => {
                        tracing::warn!("Telegram poll error: {e}");
                        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                        continue;
                    }
                };

                let data: Value = match resp.json().await {
                    Ok(d) => d,
                    Err(e) => {
                        tracing::warn!("Telegram parse error: {e}");
                        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                        continue;
                    }
                };

                if let Some(results) = data.get("result").and_then(Value::as_array) {
                    for update in results {
                        if let Some(uid) = update.get("update_id").and_then(Value::as_i64) {
                            offset = uid + 1;
                        }

                        let Some(event) = parse_update(update) else {
                            continue;
                        };

                        if tx.send(event).is_err() {
                            tracing::info!("Telegram listener channel closed");
                            return;
                        }
                    }
                }
            }
        });

        let stream = futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|msg| (msg, rx))
        });

        Ok(Box::pin(stream))
    }

    async fn send(
        &self,
        chat: &ChatId,
        text: &str,
        controls: &[Control],
    ) -> Result<MessageHandle, ChannelError> {
        let keyboard = build_keyboard(controls);
        let chunks = split_message(text, TELEGRAM_MAX_MESSAGE_LENGTH);

        // The keyboard goes on the final chunk only.
        let mut handle = MessageHandle::new();
        let last = chunks.len() - 1;
        for (i, chunk) in chunks.iter().enumerate() {
            let kb = if i == last { keyboard.as_ref() } else { None };
            handle = self.send_chunk(chat, chunk, kb).await?;
        }
        Ok(handle)
    }

    async fn ack(&self, event: &UserEvent, text: &str) -> Result<(), ChannelError> {
        match &event.payload {
            EventPayload::Action { callback_id, .. } => {
                let mut body = json!({ "callback_query_id": callback_id });
                if !text.is_empty() {
                    body["text"] = Value::String(text.to_string());
                }
                self.post("answerCallbackQuery", body).await?;
                Ok(())
            }
            EventPayload::Text(_) => {
                if text.is_empty() {
                    return Ok(());
                }
                self.send_chunk(&event.chat, text, None).await?;
                Ok(())
            }
        }
    }

    async fn health_check(&self) -> Result<(), ChannelError> {
        let resp = self
            .client
            .get(self.api_url("getMe"))
            .send()
            .await
            .map_err(|e| ChannelError::StartupFailed {
                name: "telegram".into(),
                reason: e.to_string(),
            })?;

        if resp.status().is_success() {
            Ok(())
        } else {
            Err(ChannelError::StartupFailed {
                name: "telegram".into(),
                reason: format!("getMe returned {}", resp.status()),
            })
        }
    }

    async fn shutdown(&self) -> Result<(), ChannelError> {
        tracing::info!("Telegram gateway shutting down");
        Ok(())
    }
}

// ── Update parsing ──────────────────────────────────────────────────

/// Parse one getUpdates entry into a `UserEvent`. Updates the bot does
/// not care about (media, edits, unknown callback data) yield `None`.
fn parse_update(update: &Value) -> Option<UserEvent> {
    if let Some(message) = update.get("message") {
        let text = message.get("text").and_then(Value::as_str)?;
        let (chat, chat_kind) = parse_chat(message.get("chat")?)?;
        let user = parse_user(message.get("from")?)?;

        return Some(UserEvent {
            channel: "telegram".into(),
            chat,
            chat_kind,
            user,
            payload: EventPayload::Text(text.to_string()),
        });
    }

    if let Some(cq) = update.get("callback_query") {
        let callback_id = cq.get("id").and_then(Value::as_str)?.to_string();
        let action = Action::decode(cq.get("data").and_then(Value::as_str)?)?;
        let user = parse_user(cq.get("from")?)?;
        let (chat, chat_kind) = parse_chat(cq.get("message")?.get("chat")?)?;

        return Some(UserEvent {
            channel: "telegram".into(),
            chat,
            chat_kind,
            user,
            payload: EventPayload::Action {
                action,
                callback_id,
            },
        });
    }

    None
}

fn parse_chat(chat: &Value) -> Option<(ChatId, ChatKind)> {
    let id = chat.get("id").and_then(Value::as_i64)?.to_string();
    let kind = match chat.get("type").and_then(Value::as_str) {
        Some("group") | Some("supergroup") => ChatKind::Group,
        _ => ChatKind::Private,
    };
    Some((id, kind))
}

fn parse_user(from: &Value) -> Option<UserRef> {
    let id = from.get("id").and_then(Value::as_i64)?.to_string();
    let username = from.get("username").and_then(Value::as_str);
    let display_name = from
        .get("first_name")
        .and_then(Value::as_str)
        .or(username)
        .unwrap_or("someone")
        .to_string();

    let mut user = UserRef::new(id, display_name);
    if let Some(handle) = username {
        user = user.with_handle(handle);
    }
    Some(user)
}

// ── Rendering helpers ───────────────────────────────────────────────

/// Build the inline keyboard for a control set, two buttons per row.
/// No controls means no keyboard at all.
fn build_keyboard(controls: &[Control]) -> Option<Value> {
    if controls.is_empty() {
        return None;
    }
    let rows: Vec<Value> = controls
        .chunks(2)
        .map(|row| {
            Value::Array(
                row.iter()
                    .map(|c| {
                        json!({
                            "text": c.label,
                            "callback_data": c.action.encode(),
                        })
                    })
                    .collect(),
            )
        })
        .collect();
    Some(json!({ "inline_keyboard": rows }))
}

fn message_handle(data: &Value) -> MessageHandle {
    data.get("result")
        .and_then(|r| r.get("message_id"))
        .and_then(Value::as_i64)
        .map(|id| id.to_string())
        .unwrap_or_default()
}

/// Split a message into chunks that fit Telegram's character limit.
/// Tries to split on newlines, then spaces, then hard-cuts.
fn split_message(text: &str, max_len: usize) -> Vec<String> {
    if text.len() <= max_len {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut remaining = text;

    while !remaining.is_empty() {
        if remaining.len() <= max_len {
            chunks.push(remaining.to_string());
            break;
        }

        let chunk = &remaining[..max_len];
        let split_at = chunk
            .rfind('\n')
            .or_else(|| chunk.rfind(' '))
            .unwrap_or(max_len);

        // Don't split at position 0 (infinite loop guard)
        let split_at = if split_at == 0 { max_len } else { split_at };

        chunks.push(remaining[..split_at].to_string());
        remaining = remaining[split_at..].trim_start();
    }

    chunks
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::PromptKind;

    fn gateway() -> TelegramGateway {
        TelegramGateway::new(SecretString::from("123:ABC"))
    }

    #[test]
    fn telegram_gateway_name() {
        assert_eq!(gateway().name(), "telegram");
    }

    #[test]
    fn telegram_api_url() {
        assert_eq!(
            gateway().api_url("getMe"),
            "https://api.telegram.org/bot123:ABC/getMe"
        );
    }

    // ── Update parsing ──────────────────────────────────────────────

    #[test]
    fn parses_group_text_message() {
        let update = json!({
            "update_id": 10,
            "message": {
                "text": "truth or dare",
                "chat": { "id": -100123, "type": "supergroup" },
                "from": { "id": 7, "first_name": "Ali", "username": "ali_tg" },
            }
        });

        let event = parse_update(&update).unwrap();
        assert_eq!(event.chat, "-100123");
        assert_eq!(event.chat_kind, ChatKind::Group);
        assert_eq!(event.user.id, "7");
        assert_eq!(event.user.display_name, "Ali");
        assert_eq!(event.user.handle.as_deref(), Some("ali_tg"));
        assert_eq!(
            event.payload,
            EventPayload::Text("truth or dare".into())
        );
    }

    #[test]
    fn parses_callback_query() {
        let update = json!({
            "update_id": 11,
            "callback_query": {
                "id": "cb-99",
                "data": "tod:pick:dare",
                "from": { "id": 8, "first_name": "Bea" },
                "message": { "chat": { "id": -100123, "type": "group" } },
            }
        });

        let event = parse_update(&update).unwrap();
        assert_eq!(event.chat_kind, ChatKind::Group);
        assert_eq!(
            event.payload,
            EventPayload::Action {
                action: Action::Choose(PromptKind::Dare),
                callback_id: "cb-99".into(),
            }
        );
    }

    #[test]
    fn skips_non_text_messages_and_unknown_callbacks() {
        let sticker = json!({
            "update_id": 12,
            "message": {
                "sticker": {},
                "chat": { "id": 1, "type": "private" },
                "from": { "id": 2, "first_name": "Cal" },
            }
        });
        assert!(parse_update(&sticker).is_none());

        let unknown = json!({
            "update_id": 13,
            "callback_query": {
                "id": "cb-1",
                "data": "not-a-game-action",
                "from": { "id": 2, "first_name": "Cal" },
                "message": { "chat": { "id": 1, "type": "private" } },
            }
        });
        assert!(parse_update(&unknown).is_none());
    }

    #[test]
    fn private_chat_kind_and_username_fallback() {
        let update = json!({
            "update_id": 14,
            "message": {
                "text": "hi",
                "chat": { "id": 55, "type": "private" },
                "from": { "id": 9, "username": "no_first_name" },
            }
        });

        let event = parse_update(&update).unwrap();
        assert_eq!(event.chat_kind, ChatKind::Private);
        assert_eq!(event.user.display_name, "no_first_name");
    }

    // ── Keyboard building ───────────────────────────────────────────

    #[test]
    fn keyboard_rows_hold_two_buttons() {
        let controls = vec![
            Control::new("💬 Truth", Action::Choose(PromptKind::Truth)),
            Control::new("🔥 Dare", Action::Choose(PromptKind::Dare)),
            Control::new("➡️ Next", Action::Advance),
        ];
        let kb = build_keyboard(&controls).unwrap();
        let rows = kb["inline_keyboard"].as_array().unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].as_array().unwrap().len(), 2);
        assert_eq!(rows[1].as_array().unwrap().len(), 1);
        assert_eq!(rows[0][0]["callback_data"], "tod:pick:truth");
        assert_eq!(rows[1][0]["callback_data"], "tod:next");
    }

    #[test]
    fn no_controls_means_no_keyboard() {
        assert!(build_keyboard(&[]).is_none());
    }

    #[test]
    fn message_handle_comes_from_result() {
        let data = json!({ "ok": true, "result": { "message_id": 4242 } });
        assert_eq!(message_handle(&data), "4242");
    }

    // ── Message splitting ───────────────────────────────────────────

    #[test]
    fn split_message_short() {
        let chunks = split_message("Hello", 4096);
        assert_eq!(chunks, vec!["Hello"]);
    }

    #[test]
    fn split_message_exact_limit() {
        let msg = "a".repeat(4096);
        let chunks = split_message(&msg, 4096);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].len(), 4096);
    }

    #[test]
    fn split_message_over_limit_on_newline() {
        let msg = format!("{}\n{}", "a".repeat(2000), "b".repeat(3000));
        let chunks = split_message(&msg, 4096);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], "a".repeat(2000));
        assert_eq!(chunks[1], "b".repeat(3000));
    }

    #[test]
    fn split_message_no_good_split_point() {
        let msg = "a".repeat(5000);
        let chunks = split_message(&msg, 4096);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].len(), 4096);
        assert_eq!(chunks[1].len(), 904);
    }
}
