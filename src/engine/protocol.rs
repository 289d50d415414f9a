//! Wire-visible message definitions
//! These are the text payloads the host engine delivers to clients.

use serde::{Deserialize, Serialize};

/// Chat channel a message is rendered into client-side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatKind {
    /// General chat line
    Chat,
    /// Team chat line
    TeamChat,
}

/// A message delivered to one client (or broadcast to all).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMsg {
    /// Plain console print
    Print { text: String },

    /// Chat line with a pre-composed display name
    Chat {
        kind: ChatKind,
        /// Sending slot, if the message came from a player
        from: Option<usize>,
        /// Composed display name / prefix, with color codes
        name: String,
        /// Body color code character
        color: char,
        text: String,
        /// The recipient has the sender on their ignore list: the client
        /// keeps the line in history but suppresses the notification
        skip_notify: bool,
    },

    /// Center-of-screen announcement
    CenterPrint { text: String },

    /// A freshly issued reconnection-resume code
    PtrcIssue { code: u32 },

    /// The presented resume code was valid and carries a team to restore
    PtrcConfirm,
}

impl ServerMsg {
    /// Convenience constructor for the most common message.
    pub fn print(text: impl Into<String>) -> Self {
        Self::Print { text: text.into() }
    }
}
