//! User attribute names.

use std::fmt;
use std::str::FromStr;

use crate::error::StoreError;

/// A field of the user record, for generic get/set by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UserAttribute {
    Id,
    ChatId,
    Username,
    FirstName,
    LastName,
    LastInteraction,
    FirstSeen,
    CurrentDialogId,
    CurrentChatMode,
    CurrentModel,
    NUsedTokens,
    NGeneratedImages,
    NTranscribedSeconds,
}

impl UserAttribute {
    /// Every attribute, in column order.
    pub const ALL: [UserAttribute; 13] = [
        UserAttribute::Id,
        UserAttribute::ChatId,
        UserAttribute::Username,
        UserAttribute::FirstName,
        UserAttribute::LastName,
        UserAttribute::LastInteraction,
        UserAttribute::FirstSeen,
        UserAttribute::CurrentDialogId,
        UserAttribute::CurrentChatMode,
        UserAttribute::CurrentModel,
        UserAttribute::NUsedTokens,
        UserAttribute::NGeneratedImages,
        UserAttribute::NTranscribedSeconds,
    ];

    /// Get the column name for this attribute.
    pub fn column_name(&self) -> &'static str {
        match self {
            UserAttribute::Id => "id",
            UserAttribute::ChatId => "chat_id",
            UserAttribute::Username => "username",
            UserAttribute::FirstName => "first_name",
            UserAttribute::LastName => "last_name",
            UserAttribute::LastInteraction => "last_interaction",
            UserAttribute::FirstSeen => "first_seen",
            UserAttribute::CurrentDialogId => "current_dialog_id",
            UserAttribute::CurrentChatMode => "current_chat_mode",
            UserAttribute::CurrentModel => "current_model",
            UserAttribute::NUsedTokens => "n_used_tokens",
            UserAttribute::NGeneratedImages => "n_generated_images",
            UserAttribute::NTranscribedSeconds => "n_transcribed_seconds",
        }
    }

    /// Whether the attribute may be changed after creation.
    ///
    /// The primary key is fixed.
    pub fn is_writable(&self) -> bool {
        !matches!(self, UserAttribute::Id)
    }
}

impl FromStr for UserAttribute {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        UserAttribute::ALL
            .into_iter()
            .find(|attr| attr.column_name() == s)
            .ok_or_else(|| StoreError::UnknownAttribute(s.to_string()))
    }
}

impl fmt::Display for UserAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}
