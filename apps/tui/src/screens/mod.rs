//! TUI screen definitions.
//!
//! Each screen corresponds to a tab in the TUI and encapsulates its
//! own state and rendering logic.

mod chat;
mod knowledge;

use std::fmt;

pub(crate) use chat::ChatScreen;
pub(crate) use knowledge::KnowledgeScreen;

/// Screen identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ScreenId {
    Chat,
    Knowledge,
}

impl ScreenId {
    pub(crate) const ALL: [ScreenId; 2] = [ScreenId::Chat, ScreenId::Knowledge];
}

impl fmt::Display for ScreenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Chat => write!(f, "Chat"),
            Self::Knowledge => write!(f, "Knowledge"),
        }
    }
}
