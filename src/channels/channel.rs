//! Messaging gateway abstraction — text and interactive controls out,
//! user action events back in.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use crate::content::PromptKind;
use crate::error::ChannelError;

/// Conversation identity, as reported by the platform.
pub type ChatId = String;

/// User identity, as reported by the platform.
pub type UserId = String;

/// Opaque reference to a message a gateway has rendered.
pub type MessageHandle = String;

/// Stream of inbound user events.
pub type EventStream = Pin<Box<dyn Stream<Item = UserEvent> + Send>>;

/// Whether a conversation is a group or a one-on-one chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatKind {
    Group,
    Private,
}

/// The user behind an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRef {
    pub id: UserId,
    pub display_name: String,
    /// Platform handle (e.g. Telegram @username), when the user has one.
    pub handle: Option<String>,
}

impl UserRef {
    pub fn new(id: impl Into<UserId>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            handle: None,
        }
    }

    pub fn with_handle(mut self, handle: impl Into<String>) -> Self {
        self.handle = Some(handle.into());
        self
    }
}

/// A game action a user can take by pressing an interactive control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Join,
    Begin,
    Choose(PromptKind),
    Switch(PromptKind),
    Advance,
}

impl Action {
    /// Encode for the wire (Telegram callback data).
    pub fn encode(&self) -> String {
        match self {
            Self::Join => "tod:join".into(),
            Self::Begin => "tod:begin".into(),
            Self::Choose(kind) => format!("tod:pick:{kind}"),
            Self::Switch(kind) => format!("tod:switch:{kind}"),
            Self::Advance => "tod:next".into(),
        }
    }

    /// Decode wire data back into an action. Unknown data yields `None`.
    pub fn decode(data: &str) -> Option<Self> {
        match data {
            "tod:join" => Some(Self::Join),
            "tod:begin" => Some(Self::Begin),
            "tod:next" => Some(Self::Advance),
            "tod:pick:truth" => Some(Self::Choose(PromptKind::Truth)),
            "tod:pick:dare" => Some(Self::Choose(PromptKind::Dare)),
            "tod:switch:truth" => Some(Self::Switch(PromptKind::Truth)),
            "tod:switch:dare" => Some(Self::Switch(PromptKind::Dare)),
            _ => None,
        }
    }
}

/// A labeled interactive control rendered alongside a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Control {
    pub label: String,
    pub action: Action,
}

impl Control {
    pub fn new(label: impl Into<String>, action: Action) -> Self {
        Self {
            label: label.into(),
            action,
        }
    }
}

/// What the user actually did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventPayload {
    /// Free text typed into the conversation.
    Text(String),
    /// An interactive control was pressed. `callback_id` identifies the
    /// press for the gateway's acknowledgment mechanism.
    Action { action: Action, callback_id: String },
}

/// An inbound user event, routed by conversation identity.
#[derive(Debug, Clone)]
pub struct UserEvent {
    pub channel: String,
    pub chat: ChatId,
    pub chat_kind: ChatKind,
    pub user: UserRef,
    pub payload: EventPayload,
}

/// A messaging gateway: renders text and controls into a conversation and
/// delivers user action events back.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Gateway name for logging.
    fn name(&self) -> &str;

    /// Start listening and return the inbound event stream.
    async fn start(&self) -> Result<EventStream, ChannelError>;

    /// Render a message with optional interactive controls.
    /// Returns a handle to the rendered message.
    async fn send(
        &self,
        chat: &ChatId,
        text: &str,
        controls: &[Control],
    ) -> Result<MessageHandle, ChannelError>;

    /// Acknowledge a user action with an ephemeral notice, distinct from
    /// any rendered message. An empty text clears the pending press
    /// without showing anything.
    async fn ack(&self, event: &UserEvent, text: &str) -> Result<(), ChannelError>;

    /// Verify the gateway can reach its platform.
    async fn health_check(&self) -> Result<(), ChannelError>;

    /// Graceful shutdown.
    async fn shutdown(&self) -> Result<(), ChannelError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_encoding_round_trips() {
        let actions = [
            Action::Join,
            Action::Begin,
            Action::Choose(PromptKind::Truth),
            Action::Choose(PromptKind::Dare),
            Action::Switch(PromptKind::Truth),
            Action::Switch(PromptKind::Dare),
            Action::Advance,
        ];
        for action in actions {
            assert_eq!(Action::decode(&action.encode()), Some(action));
        }
    }

    #[test]
    fn unknown_callback_data_is_rejected() {
        assert_eq!(Action::decode(""), None);
        assert_eq!(Action::decode("tod:"), None);
        assert_eq!(Action::decode("tod:pick:maybe"), None);
        assert_eq!(Action::decode("something else"), None);
    }

    #[test]
    fn user_ref_builder() {
        let user = UserRef::new("42", "Alice").with_handle("alice_tg");
        assert_eq!(user.id, "42");
        assert_eq!(user.handle.as_deref(), Some("alice_tg"));
    }
}
