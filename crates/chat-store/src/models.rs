//! Store models.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Chat mode assigned to new users.
pub const DEFAULT_CHAT_MODE: &str = "assistant";

/// Accumulated token counts for one model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Prompt tokens.
    pub n_input_tokens: u64,
    /// Completion tokens.
    pub n_output_tokens: u64,
}

impl TokenUsage {
    /// Add to both counters, or `None` if either would overflow.
    pub fn checked_add(self, n_input_tokens: u64, n_output_tokens: u64) -> Option<Self> {
        Some(Self {
            n_input_tokens: self.n_input_tokens.checked_add(n_input_tokens)?,
            n_output_tokens: self.n_output_tokens.checked_add(n_output_tokens)?,
        })
    }
}

/// Token usage keyed by model name.
pub type TokenUsageMap = BTreeMap<String, TokenUsage>;

/// A chat user, identified by the messenger's numeric user id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Messenger user id.
    pub id: i64,
    /// Chat to send replies to.
    pub chat_id: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub username: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub first_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub last_name: String,
    #[serde(with = "timestamp")]
    pub last_interaction: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub first_seen: DateTime<Utc>,
    /// Dialog currently being appended to, if any.
    pub current_dialog_id: Option<String>,
    pub current_chat_mode: String,
    pub current_model: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub n_used_tokens: TokenUsageMap,
    #[serde(default, deserialize_with = "null_as_default")]
    pub n_generated_images: i64,
    /// Seconds of voice audio transcribed.
    #[serde(default, deserialize_with = "null_as_default")]
    pub n_transcribed_seconds: f64,
}

/// Identity fields supplied when registering a user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewUser {
    pub id: i64,
    pub chat_id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

impl NewUser {
    /// Create with empty display names.
    pub fn new(id: i64, chat_id: i64) -> Self {
        Self {
            id,
            chat_id,
            ..Default::default()
        }
    }

    /// Set the username.
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = username.into();
        self
    }

    /// Set first and last name.
    pub fn with_name(mut self, first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        self.first_name = first_name.into();
        self.last_name = last_name.into();
        self
    }
}

/// A conversation session and its message history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dialog {
    /// UUID v4 string.
    pub id: String,
    /// Owning user.
    pub user_id: i64,
    /// Chat mode at the time the dialog started.
    pub chat_mode: String,
    /// Model at the time the dialog started.
    pub model: String,
    #[serde(with = "timestamp")]
    pub start_time: DateTime<Utc>,
    /// Messages in conversation order, stored verbatim.
    #[serde(default, deserialize_with = "null_as_default")]
    pub messages: Vec<Value>,
}

/// Deserialize a nullable column into its default value.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// ISO-8601 timestamps in UTC.
///
/// Written as RFC 3339 with a `Z` suffix. Read back from RFC 3339 with any
/// offset, or from a naive timestamp (`timestamp without time zone`
/// columns), which is taken to be UTC.
pub(crate) mod timestamp {
    use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn format(value: &DateTime<Utc>) -> String {
        value.to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    pub fn parse(s: &str) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Some(dt.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
            .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
            .ok()
            .map(|naive| naive.and_utc())
    }

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let s = String::deserialize(deserializer)?;
        parse(&s).ok_or_else(|| de::Error::custom(format!("invalid timestamp: {}", s)))
    }
}
