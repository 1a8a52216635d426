//! PostgREST HTTP client.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::TableError;
use crate::filter::Filter;
use crate::service::{Row, TableService};

/// Media type that asks PostgREST for a single JSON object instead of an array.
const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

/// PostgREST error code for a single-object request that matched 0 or >1 rows.
const SINGLE_ROW_CODE: &str = "PGRST116";

/// Error body returned by PostgREST.
#[derive(Debug, Default, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    details: Option<String>,
}

/// Client for a PostgREST endpoint, such as Supabase's REST API.
#[derive(Clone)]
pub struct RestClient {
    http: Client,
    config: ClientConfig,
}

impl RestClient {
    /// Create a client for the configured endpoint.
    ///
    /// No request is made; connection problems surface on the first call.
    pub fn new(config: ClientConfig) -> Result<Self, TableError> {
        if config.url.is_empty() {
            return Err(TableError::Config("url is empty".to_string()));
        }

        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(TableError::Http)?;

        Ok(Self { http, config })
    }

    /// Get the configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn request(&self, builder: RequestBuilder, filters: &[Filter]) -> RequestBuilder {
        let params: Vec<(String, String)> = filters.iter().map(Filter::to_query_pair).collect();
        builder
            .header("apikey", &self.config.api_key)
            .bearer_auth(&self.config.api_key)
            .query(&params)
    }

    /// Turn a non-success response into a [`TableError`].
    async fn check(response: Response) -> Result<Response, TableError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let body: ApiErrorBody = serde_json::from_str(&text).unwrap_or_default();
        let code = body.code.unwrap_or_default();

        if code == SINGLE_ROW_CODE {
            let rows = body
                .details
                .as_deref()
                .and_then(|d| d.split_whitespace().find_map(|w| w.parse::<usize>().ok()))
                .unwrap_or(0);
            return Err(TableError::SingleRow { rows });
        }

        Err(TableError::Api {
            status: status.as_u16(),
            code,
            message: body.message.unwrap_or(text),
        })
    }
}

#[async_trait]
impl TableService for RestClient {
    async fn select(
        &self,
        table: &str,
        columns: &str,
        filters: &[Filter],
    ) -> Result<Vec<Row>, TableError> {
        let url = self.config.rest_url(table);
        debug!("select {} from {} ({} filters)", columns, table, filters.len());

        let response = self
            .request(self.http.get(&url), filters)
            .query(&[("select", columns)])
            .send()
            .await?;

        let rows = Self::check(response).await?.json::<Vec<Row>>().await?;
        Ok(rows)
    }

    async fn select_single(
        &self,
        table: &str,
        columns: &str,
        filters: &[Filter],
    ) -> Result<Row, TableError> {
        let url = self.config.rest_url(table);
        debug!("select single {} from {}", columns, table);

        let response = self
            .request(self.http.get(&url), filters)
            .query(&[("select", columns)])
            .header("Accept", SINGLE_OBJECT)
            .send()
            .await?;

        let row = Self::check(response).await?.json::<Row>().await?;
        Ok(row)
    }

    async fn insert(&self, table: &str, record: Row) -> Result<(), TableError> {
        let url = self.config.rest_url(table);
        debug!("insert into {}", table);

        let response = self
            .request(self.http.post(&url), &[])
            .header("Prefer", "return=minimal")
            .json(&record)
            .send()
            .await?;

        Self::check(response).await?;
        Ok(())
    }

    async fn update(&self, table: &str, patch: Row, filters: &[Filter]) -> Result<(), TableError> {
        let url = self.config.rest_url(table);
        debug!(
            "update {} set {:?}",
            table,
            patch.keys().collect::<Vec<_>>()
        );

        let response = self
            .request(self.http.patch(&url), filters)
            .header("Prefer", "return=minimal")
            .json(&patch)
            .send()
            .await?;

        Self::check(response).await?;
        Ok(())
    }

    fn name(&self) -> &str {
        "postgrest"
    }
}

impl std::fmt::Debug for RestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestClient")
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_empty_url() {
        let result = RestClient::new(ClientConfig::new("", "key"));
        assert!(matches!(result, Err(TableError::Config(_))));
    }

    #[test]
    fn test_error_body_tolerates_missing_fields() {
        let body: ApiErrorBody = serde_json::from_str(r#"{"message":"boom"}"#).unwrap();
        assert!(body.code.is_none());
        assert_eq!(body.message.as_deref(), Some("boom"));
    }
}
