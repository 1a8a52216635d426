//! User and dialog operations.

use std::sync::Arc;

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use table_client::{to_row, ClientConfig, RestClient, Row, Table, TableError, TableService};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::attribute::UserAttribute;
use crate::config::StoreConfig;
use crate::error::{Result, StoreError};
use crate::models::{Dialog, NewUser, TokenUsageMap, User};

/// Access to the `users` and `dialogues` tables.
///
/// Every method awaits its remote calls one after another. Nothing spans
/// calls: a sequence such as insert-dialog-then-point-user-at-it can be
/// observed half done, and read-modify-write counters lose updates when two
/// callers touch the same user at once.
#[derive(Debug, Clone)]
pub struct UserStore {
    users: Table,
    dialogues: Table,
    config: StoreConfig,
}

impl UserStore {
    /// Create a store over any table service.
    pub fn new(service: Arc<dyn TableService>, config: StoreConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            users: Table::new(service.clone(), config.users_table.clone()),
            dialogues: Table::new(service, config.dialogues_table.clone()),
            config,
        })
    }

    /// Create a store backed by a PostgREST endpoint.
    pub fn connect(client_config: ClientConfig, config: StoreConfig) -> Result<Self> {
        let client = RestClient::new(client_config)?;
        info!(
            "Using table service at {} (users: {}, dialogues: {})",
            client.config().url,
            config.users_table,
            config.dialogues_table
        );
        Self::new(Arc::new(client), config)
    }

    /// Create a store from `SUPABASE_*` and store environment variables.
    pub fn from_env() -> Result<Self> {
        Self::connect(ClientConfig::from_env()?, StoreConfig::from_env()?)
    }

    /// Get the configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    // ------------------------------------------------------------------
    // Users
    // ------------------------------------------------------------------

    /// Check whether a user row exists.
    pub async fn exists(&self, user_id: i64) -> Result<bool> {
        let rows = self.users.select("id").eq("id", user_id).execute().await?;
        Ok(!rows.is_empty())
    }

    /// Fail with [`StoreError::NotFound`] unless the user exists.
    pub async fn ensure_exists(&self, user_id: i64) -> Result<()> {
        if self.exists(user_id).await? {
            Ok(())
        } else {
            Err(StoreError::user_not_found(user_id))
        }
    }

    /// Register a user with default settings.
    ///
    /// Does nothing if the id is already known. Returns whether a row was
    /// inserted.
    pub async fn create_user(&self, new_user: &NewUser) -> Result<bool> {
        if self.exists(new_user.id).await? {
            debug!("User {} already exists, skipping create", new_user.id);
            return Ok(false);
        }

        let now = Utc::now();
        let user = User {
            id: new_user.id,
            chat_id: new_user.chat_id,
            username: new_user.username.clone(),
            first_name: new_user.first_name.clone(),
            last_name: new_user.last_name.clone(),
            last_interaction: now,
            first_seen: now,
            current_dialog_id: None,
            current_chat_mode: self.config.default_chat_mode.clone(),
            current_model: self.config.default_model()?.to_string(),
            n_used_tokens: TokenUsageMap::new(),
            n_generated_images: 0,
            n_transcribed_seconds: 0.0,
        };

        match self.users.insert(to_row(&user)?).execute().await {
            Ok(()) => {}
            // Lost a race with another create for the same id.
            Err(e) if e.is_unique_violation() => {
                debug!("User {} created concurrently, skipping create", user.id);
                return Ok(false);
            }
            Err(e) => return Err(e.into()),
        }

        info!("Created user {} (chat {})", user.id, user.chat_id);
        Ok(true)
    }

    /// Fetch the full user record.
    pub async fn get_user(&self, user_id: i64) -> Result<User> {
        self.ensure_exists(user_id).await?;
        self.users
            .select("*")
            .eq("id", user_id)
            .single()
            .execute_as::<User>()
            .await
            .map_err(|e| match e {
                TableError::SingleRow { .. } => StoreError::user_not_found(user_id),
                other => other.into(),
            })
    }

    /// Read one user field.
    ///
    /// A field that is null (or absent from the stored row) reads as
    /// [`Value::Null`].
    pub async fn get_attribute(&self, user_id: i64, attribute: UserAttribute) -> Result<Value> {
        self.ensure_exists(user_id).await?;
        let mut row = self.fetch_user_row(user_id).await?;
        Ok(row.remove(attribute.column_name()).unwrap_or(Value::Null))
    }

    /// Read one user field by column name.
    ///
    /// Fails with [`StoreError::UnknownAttribute`] for names that are not
    /// user fields.
    pub async fn get_attribute_by_name(&self, user_id: i64, key: &str) -> Result<Value> {
        let attribute = key.parse::<UserAttribute>()?;
        self.get_attribute(user_id, attribute).await
    }

    /// Overwrite one user field.
    pub async fn set_attribute<T>(&self, user_id: i64, attribute: UserAttribute, value: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        if !attribute.is_writable() {
            return Err(StoreError::ReadOnlyAttribute(attribute.column_name()));
        }
        let value = serde_json::to_value(value)?;

        self.ensure_exists(user_id).await?;
        self.update_user_column(user_id, attribute, value).await
    }

    /// Overwrite one user field by column name.
    pub async fn set_attribute_by_name(&self, user_id: i64, key: &str, value: Value) -> Result<()> {
        let attribute = key.parse::<UserAttribute>()?;
        self.set_attribute(user_id, attribute, &value).await
    }

    /// Add a completion's token counts to the user's per-model totals.
    ///
    /// Reads the whole usage map and writes it back.
    pub async fn record_token_usage(
        &self,
        user_id: i64,
        model: &str,
        n_input_tokens: u64,
        n_output_tokens: u64,
    ) -> Result<()> {
        let mut usage = self.n_used_tokens(user_id).await?;
        let entry = usage.entry(model.to_string()).or_default();
        *entry = entry
            .checked_add(n_input_tokens, n_output_tokens)
            .ok_or(StoreError::CounterOverflow {
                counter: UserAttribute::NUsedTokens.column_name(),
                user_id,
            })?;

        debug!(
            "User {} used {}+{} tokens on {}",
            user_id, n_input_tokens, n_output_tokens, model
        );
        self.set_attribute(user_id, UserAttribute::NUsedTokens, &usage)
            .await
    }

    /// Per-model token totals.
    pub async fn n_used_tokens(&self, user_id: i64) -> Result<TokenUsageMap> {
        self.typed_attribute(user_id, UserAttribute::NUsedTokens).await
    }

    /// Id of the dialog the user is currently in, if any.
    pub async fn current_dialog_id(&self, user_id: i64) -> Result<Option<String>> {
        self.typed_attribute(user_id, UserAttribute::CurrentDialogId)
            .await
    }

    /// Model the user has selected.
    pub async fn current_model(&self, user_id: i64) -> Result<String> {
        self.typed_attribute(user_id, UserAttribute::CurrentModel).await
    }

    /// Chat mode the user has selected.
    pub async fn current_chat_mode(&self, user_id: i64) -> Result<String> {
        self.typed_attribute(user_id, UserAttribute::CurrentChatMode)
            .await
    }

    /// Switch the user's model.
    ///
    /// Only models from the configured list are accepted.
    pub async fn set_current_model(&self, user_id: i64, model: &str) -> Result<()> {
        if !self.config.is_available_model(model) {
            return Err(StoreError::UnknownModel(model.to_string()));
        }
        self.set_attribute(user_id, UserAttribute::CurrentModel, model)
            .await
    }

    /// Switch the user's chat mode.
    pub async fn set_current_chat_mode(&self, user_id: i64, chat_mode: &str) -> Result<()> {
        self.set_attribute(user_id, UserAttribute::CurrentChatMode, chat_mode)
            .await
    }

    /// Set `last_interaction` to now.
    pub async fn touch_last_interaction(&self, user_id: i64) -> Result<()> {
        let now = crate::models::timestamp::format(&Utc::now());
        self.set_attribute(user_id, UserAttribute::LastInteraction, &now)
            .await
    }

    /// Increase the generated image counter.
    pub async fn add_generated_images(&self, user_id: i64, count: i64) -> Result<()> {
        let current: Option<i64> = self
            .typed_attribute(user_id, UserAttribute::NGeneratedImages)
            .await?;
        let total = current
            .unwrap_or(0)
            .checked_add(count)
            .ok_or(StoreError::CounterOverflow {
                counter: UserAttribute::NGeneratedImages.column_name(),
                user_id,
            })?;
        self.set_attribute(user_id, UserAttribute::NGeneratedImages, &total)
            .await
    }

    /// Increase the transcribed audio counter.
    pub async fn add_transcribed_seconds(&self, user_id: i64, seconds: f64) -> Result<()> {
        let current: Option<f64> = self
            .typed_attribute(user_id, UserAttribute::NTranscribedSeconds)
            .await?;
        let total = current.unwrap_or(0.0) + seconds;
        // JSON has no representation for inf or NaN.
        if !total.is_finite() {
            return Err(StoreError::CounterOverflow {
                counter: UserAttribute::NTranscribedSeconds.column_name(),
                user_id,
            });
        }
        self.set_attribute(user_id, UserAttribute::NTranscribedSeconds, &total)
            .await
    }

    // ------------------------------------------------------------------
    // Dialogs
    // ------------------------------------------------------------------

    /// Open a new dialog for the user and make it current.
    ///
    /// The dialog snapshots the user's chat mode and model. The dialog row
    /// is inserted before the user is pointed at it; if the second write
    /// fails the dialog is left in place without being current.
    pub async fn start_dialog(&self, user_id: i64) -> Result<String> {
        self.ensure_exists(user_id).await?;
        let row = self.fetch_user_row(user_id).await?;

        let dialog = Dialog {
            id: Uuid::new_v4().to_string(),
            user_id,
            chat_mode: string_field(&row, UserAttribute::CurrentChatMode)
                .unwrap_or_else(|| self.config.default_chat_mode.clone()),
            model: match string_field(&row, UserAttribute::CurrentModel) {
                Some(model) => model,
                None => self.config.default_model()?.to_string(),
            },
            start_time: Utc::now(),
            messages: Vec::new(),
        };

        self.dialogues.insert(to_row(&dialog)?).execute().await?;

        if let Err(e) = self
            .update_user_column(
                user_id,
                UserAttribute::CurrentDialogId,
                Value::String(dialog.id.clone()),
            )
            .await
        {
            warn!(
                "Dialog {} created but user {} not switched to it: {}",
                dialog.id, user_id, e
            );
            return Err(e);
        }

        info!(
            "Started dialog {} for user {} ({}, {})",
            dialog.id, user_id, dialog.chat_mode, dialog.model
        );
        Ok(dialog.id)
    }

    /// Fetch a full dialog record.
    ///
    /// With no `dialog_id`, the user's current dialog is used.
    pub async fn get_dialog(&self, user_id: i64, dialog_id: Option<&str>) -> Result<Dialog> {
        let dialog_id = self.resolve_dialog_id(user_id, dialog_id).await?;
        self.dialogues
            .select("*")
            .eq("id", dialog_id.as_str())
            .single()
            .execute_as::<Dialog>()
            .await
            .map_err(|e| match e {
                TableError::SingleRow { .. } => StoreError::dialog_not_found(dialog_id),
                other => other.into(),
            })
    }

    /// Messages of a dialog, in conversation order.
    ///
    /// With no `dialog_id`, the user's current dialog is used.
    pub async fn get_dialog_messages(
        &self,
        user_id: i64,
        dialog_id: Option<&str>,
    ) -> Result<Vec<Value>> {
        let dialog_id = self.resolve_dialog_id(user_id, dialog_id).await?;
        let mut row = self.fetch_dialog_row(&dialog_id, "messages").await?;

        match row.remove("messages") {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(messages) => Ok(serde_json::from_value(messages)?),
        }
    }

    /// Replace a dialog's messages.
    ///
    /// With no `dialog_id`, the user's current dialog is used.
    pub async fn set_dialog_messages(
        &self,
        user_id: i64,
        messages: &[Value],
        dialog_id: Option<&str>,
    ) -> Result<()> {
        let dialog_id = self.resolve_dialog_id(user_id, dialog_id).await?;

        let mut patch = Row::new();
        patch.insert("messages".to_string(), Value::Array(messages.to_vec()));

        debug!(
            "Writing {} messages to {} row {}",
            messages.len(),
            self.dialogues.name(),
            dialog_id
        );
        self.dialogues
            .update(patch)
            .eq("id", dialog_id.as_str())
            .execute()
            .await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    async fn fetch_user_row(&self, user_id: i64) -> Result<Row> {
        self.users
            .select("*")
            .eq("id", user_id)
            .single()
            .execute()
            .await
            .map_err(|e| match e {
                TableError::SingleRow { .. } => StoreError::user_not_found(user_id),
                other => other.into(),
            })
    }

    async fn fetch_dialog_row(&self, dialog_id: &str, columns: &str) -> Result<Row> {
        self.dialogues
            .select(columns)
            .eq("id", dialog_id)
            .single()
            .execute()
            .await
            .map_err(|e| match e {
                TableError::SingleRow { .. } => StoreError::dialog_not_found(dialog_id),
                other => other.into(),
            })
    }

    async fn update_user_column(
        &self,
        user_id: i64,
        attribute: UserAttribute,
        value: Value,
    ) -> Result<()> {
        let mut patch = Row::new();
        patch.insert(attribute.column_name().to_string(), value);

        self.users.update(patch).eq("id", user_id).execute().await?;
        Ok(())
    }

    async fn typed_attribute<T: DeserializeOwned>(
        &self,
        user_id: i64,
        attribute: UserAttribute,
    ) -> Result<T> {
        let value = match self.get_attribute(user_id, attribute).await? {
            // Unset JSON columns read back as their empty value.
            Value::Null if attribute == UserAttribute::NUsedTokens => Value::Object(Row::new()),
            value => value,
        };
        Ok(serde_json::from_value(value)?)
    }

    async fn resolve_dialog_id(&self, user_id: i64, dialog_id: Option<&str>) -> Result<String> {
        self.ensure_exists(user_id).await?;

        if let Some(id) = dialog_id {
            return Ok(id.to_string());
        }

        let row = self.fetch_user_row(user_id).await?;
        string_field(&row, UserAttribute::CurrentDialogId)
            .ok_or(StoreError::NoCurrentDialog { user_id })
    }
}

fn string_field(row: &Row, attribute: UserAttribute) -> Option<String> {
    row.get(attribute.column_name())
        .and_then(Value::as_str)
        .map(str::to_string)
}
