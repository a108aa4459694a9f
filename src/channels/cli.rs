//! CLI gateway — stdin/stdout REPL for local testing.
//!
//! Plain lines arrive as chat text. `/as <name>` switches the speaking
//! user, and `!` commands stand in for control presses:
//! `!join !begin !truth !dare !switch truth|dare !next`.

use async_trait::async_trait;
use futures::stream;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::channels::{
    Action, ChatId, ChatKind, Control, EventPayload, EventStream, Gateway, MessageHandle,
    UserEvent, UserRef,
};
use crate::content::PromptKind;
use crate::error::ChannelError;

const LOCAL_CHAT: &str = "local";

/// A simple CLI gateway that reads from stdin and writes to stdout.
pub struct CliGateway;

impl CliGateway {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CliGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Gateway for CliGateway {
    fn name(&self) -> &str {
        "cli"
    }

    async fn start(&self) -> Result<EventStream, ChannelError> {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();

        tokio::spawn(async move {
            let stdin = tokio::io::stdin();
            let reader = BufReader::new(stdin);
            let mut lines = reader.lines();
            let mut speaker = UserRef::new("local-user", "You");

            eprint!("> ");

            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        let line = line.trim().to_string();
                        if line.is_empty() {
                            eprint!("> ");
                            continue;
                        }

                        if let Some(name) = line.strip_prefix("/as ") {
                            let name = name.trim();
                            speaker = UserRef::new(name.to_lowercase(), name);
                            eprintln!("(speaking as {name})");
                            eprint!("> ");
                            continue;
                        }

                        let payload = match parse_bang_command(&line) {
                            Some(action) => EventPayload::Action {
                                action,
                                callback_id: String::new(),
                            },
                            None => EventPayload::Text(line),
                        };

                        let event = UserEvent {
                            channel: "cli".into(),
                            chat: LOCAL_CHAT.into(),
                            chat_kind: ChatKind::Private,
                            user: speaker.clone(),
                            payload,
                        };
                        if tx.send(event).is_err() {
                            break;
                        }
                    }
                    Ok(None) => break, // EOF
                    Err(e) => {
                        tracing::error!("Error reading stdin: {}", e);
                        break;
                    }
                }
            }
        });

        let stream = stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|msg| (msg, rx))
        });

        Ok(Box::pin(stream))
    }

    async fn send(
        &self,
        _chat: &ChatId,
        text: &str,
        controls: &[Control],
    ) -> Result<MessageHandle, ChannelError> {
        println!("\n{text}");
        for control in controls {
            println!("   [{}]", control.label);
        }
        println!();
        eprint!("> ");
        Ok(MessageHandle::new())
    }

    async fn ack(&self, event: &UserEvent, text: &str) -> Result<(), ChannelError> {
        if !text.is_empty() {
            eprintln!("· ({}) {text}", event.user.display_name);
        }
        Ok(())
    }

    async fn health_check(&self) -> Result<(), ChannelError> {
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), ChannelError> {
        Ok(())
    }
}

fn parse_bang_command(line: &str) -> Option<Action> {
    match line {
        "!join" => Some(Action::Join),
        "!begin" => Some(Action::Begin),
        "!truth" => Some(Action::Choose(PromptKind::Truth)),
        "!dare" => Some(Action::Choose(PromptKind::Dare)),
        "!switch truth" => Some(Action::Switch(PromptKind::Truth)),
        "!switch dare" => Some(Action::Switch(PromptKind::Dare)),
        "!next" => Some(Action::Advance),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bang_commands_map_to_actions() {
        assert_eq!(parse_bang_command("!join"), Some(Action::Join));
        assert_eq!(
            parse_bang_command("!switch dare"),
            Some(Action::Switch(PromptKind::Dare))
        );
        assert_eq!(parse_bang_command("!next"), Some(Action::Advance));
        assert_eq!(parse_bang_command("hello there"), None);
        assert_eq!(parse_bang_command("!switch"), None);
    }
}
