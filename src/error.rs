//! Error types for partybot.

/// Top-level error type for the bot.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("Content error: {0}")]
    Content(#[from] ContentError),

    #[error("Game error: {0}")]
    Game(#[from] GameError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Channel-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Channel {name} failed to start: {reason}")]
    StartupFailed { name: String, reason: String },

    #[error("Channel {name} disconnected: {reason}")]
    Disconnected { name: String, reason: String },

    #[error("Failed to send on channel {name}: {reason}")]
    SendFailed { name: String, reason: String },

    #[error("Invalid message format: {0}")]
    InvalidMessage(String),

    #[error("Channel health check failed: {name}")]
    HealthCheckFailed { name: String },
}

/// Prompt pool errors.
#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    #[error("Pool {name} has no entries")]
    EmptyPool { name: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Game session errors.
///
/// All of these are user-facing and non-fatal: the action boundary turns
/// them into an ephemeral acknowledgment and the session keeps running.
/// The `Display` text is exactly what the player sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    #[error("No game is running here — say \"truth or dare\" to start one.")]
    NoActiveSession,

    #[error("A game is already going in this chat.")]
    SessionAlreadyActive,

    #[error("Not your turn!")]
    NotYourTurn,

    #[error("You already switched once this round.")]
    AlreadySwitched,

    #[error("Nobody has joined the game.")]
    EmptyParticipants,
}

/// Result type alias for the bot.
pub type Result<T> = std::result::Result<T, Error>;
