//! Configuration for the user store.

use std::env;

use crate::error::{Result, StoreError};
use crate::models::DEFAULT_CHAT_MODE;

/// Text models offered when `AVAILABLE_TEXT_MODELS` is not set.
pub const DEFAULT_TEXT_MODELS: [&str; 3] = ["gpt-4o-mini", "gpt-4o", "gpt-4.1"];

/// Configuration for [`UserStore`](crate::UserStore).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Text models users may pick; the first one is the default for new users.
    pub available_text_models: Vec<String>,

    /// Chat mode assigned to new users.
    pub default_chat_mode: String,

    /// Name of the users table.
    pub users_table: String,

    /// Name of the dialogues table.
    pub dialogues_table: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            available_text_models: DEFAULT_TEXT_MODELS.iter().map(|m| m.to_string()).collect(),
            default_chat_mode: DEFAULT_CHAT_MODE.to_string(),
            users_table: "users".to_string(),
            dialogues_table: "dialogues".to_string(),
        }
    }
}

impl StoreConfig {
    /// Create configuration from environment variables.
    ///
    /// Optional environment variables:
    /// - `AVAILABLE_TEXT_MODELS` - Comma-separated model names (default: gpt-4o-mini,gpt-4o,gpt-4.1)
    /// - `DEFAULT_CHAT_MODE` - Chat mode for new users (default: assistant)
    /// - `USERS_TABLE` - Users table name (default: users)
    /// - `DIALOGUES_TABLE` - Dialogues table name (default: dialogues)
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let available_text_models = env::var("AVAILABLE_TEXT_MODELS")
            .ok()
            .map(|v| parse_model_list(&v))
            .unwrap_or(defaults.available_text_models);

        let default_chat_mode =
            env::var("DEFAULT_CHAT_MODE").unwrap_or(defaults.default_chat_mode);
        let users_table = env::var("USERS_TABLE").unwrap_or(defaults.users_table);
        let dialogues_table = env::var("DIALOGUES_TABLE").unwrap_or(defaults.dialogues_table);

        let config = Self {
            available_text_models,
            default_chat_mode,
            users_table,
            dialogues_table,
        };
        config.validate()?;
        Ok(config)
    }

    /// Create a new config builder.
    pub fn builder() -> StoreConfigBuilder {
        StoreConfigBuilder::default()
    }

    /// Model assigned to new users.
    pub fn default_model(&self) -> Result<&str> {
        self.available_text_models
            .first()
            .map(String::as_str)
            .ok_or_else(|| StoreError::Config("no text models configured".to_string()))
    }

    /// Check whether a model is in the configured list.
    pub fn is_available_model(&self, model: &str) -> bool {
        self.available_text_models.iter().any(|m| m == model)
    }

    /// Check that the configuration is usable.
    pub fn validate(&self) -> Result<()> {
        self.default_model()?;
        if self.default_chat_mode.trim().is_empty() {
            return Err(StoreError::Config("default chat mode is empty".to_string()));
        }
        if self.users_table.is_empty() || self.dialogues_table.is_empty() {
            return Err(StoreError::Config("table name is empty".to_string()));
        }
        Ok(())
    }
}

fn parse_model_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
        .collect()
}

/// Builder for StoreConfig.
#[derive(Debug, Default)]
pub struct StoreConfigBuilder {
    config: StoreConfig,
}

impl StoreConfigBuilder {
    /// Set the available text models.
    pub fn available_text_models<I, S>(mut self, models: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.available_text_models = models.into_iter().map(Into::into).collect();
        self
    }

    /// Set the default chat mode.
    pub fn default_chat_mode(mut self, mode: impl Into<String>) -> Self {
        self.config.default_chat_mode = mode.into();
        self
    }

    /// Set the users table name.
    pub fn users_table(mut self, name: impl Into<String>) -> Self {
        self.config.users_table = name.into();
        self
    }

    /// Set the dialogues table name.
    pub fn dialogues_table(mut self, name: impl Into<String>) -> Self {
        self.config.dialogues_table = name.into();
        self
    }

    /// Build the configuration.
    pub fn build(self) -> StoreConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = StoreConfig::default();
        assert_eq!(config.default_model().unwrap(), "gpt-4o-mini");
        assert_eq!(config.default_chat_mode, "assistant");
        assert_eq!(config.users_table, "users");
        assert_eq!(config.dialogues_table, "dialogues");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_all_options() {
        let config = StoreConfig::builder()
            .available_text_models(["gpt-4", "gpt-3.5-turbo"])
            .default_chat_mode("code_assistant")
            .users_table("bot_users")
            .dialogues_table("bot_dialogues")
            .build();

        assert_eq!(config.default_model().unwrap(), "gpt-4");
        assert!(config.is_available_model("gpt-3.5-turbo"));
        assert!(!config.is_available_model("gpt-4o"));
        assert_eq!(config.default_chat_mode, "code_assistant");
        assert_eq!(config.users_table, "bot_users");
        assert_eq!(config.dialogues_table, "bot_dialogues");
    }

    #[test]
    fn test_empty_model_list_is_invalid() {
        let config = StoreConfig::builder()
            .available_text_models(Vec::<String>::new())
            .build();
        assert!(matches!(config.validate(), Err(StoreError::Config(_))));
    }

    #[test]
    fn test_parse_model_list() {
        assert_eq!(
            parse_model_list(" gpt-4o , ,gpt-4.1,"),
            vec!["gpt-4o".to_string(), "gpt-4.1".to_string()]
        );
    }
}
