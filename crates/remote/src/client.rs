use std::time::Duration;

use reqwest::header::AUTHORIZATION;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::RemoteError;

/// Column filter rendered as `column=eq.value`.
pub type Filter<'a> = (&'a str, &'a str);

/// Client for the hosted table API.
pub struct RestClient {
    pub(crate) client: reqwest::Client,
    pub(crate) api_key: String,
    pub(crate) base_url: String,
}

impl std::fmt::Debug for RestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestClient")
            .field("client", &self.client)
            .field("api_key", &"***")
            .field("base_url", &self.base_url)
            .finish()
    }
}

fn eq_filters(filters: &[Filter<'_>]) -> Vec<(String, String)> {
    filters.iter().map(|(column, value)| ((*column).to_owned(), format!("eq.{value}"))).collect()
}

impl RestClient {
    /// Creates a client for the backend at `base_url`.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built (TLS backend failure).
    pub fn new(base_url: &str, api_key: String, timeout: Duration) -> Result<Self, RemoteError> {
        let base_url = base_url.trim_end_matches('/').to_owned();
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RemoteError::ClientInit(e.to_string()))?;
        Ok(Self { client, api_key, base_url })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.base_url)
    }

    fn authed(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, RemoteError> {
        let response = self.authed(request).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(RemoteError::HttpStatus { code: status.as_u16(), body })
    }

    /// Insert `row`, or merge it into the existing row matching `on_conflict`.
    ///
    /// # Errors
    /// Returns an error on transport failure or a non-success status.
    pub async fn upsert<T: Serialize + Sync>(
        &self,
        table: &str,
        on_conflict: &str,
        row: &T,
    ) -> Result<(), RemoteError> {
        let request = self
            .client
            .post(self.table_url(table))
            .query(&[("on_conflict", on_conflict)])
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(row);
        self.send(request).await?;
        tracing::debug!(table, on_conflict, "Remote upsert applied");
        Ok(())
    }

    /// Apply a partial update to every row matching `filters`.
    ///
    /// # Errors
    /// Returns an error on transport failure or a non-success status.
    pub async fn patch<T: Serialize + Sync>(
        &self,
        table: &str,
        filters: &[Filter<'_>],
        body: &T,
    ) -> Result<(), RemoteError> {
        let request = self
            .client
            .patch(self.table_url(table))
            .query(&eq_filters(filters))
            .header("Prefer", "return=minimal")
            .json(body);
        self.send(request).await?;
        Ok(())
    }

    /// Delete rows matching `filters`. A row that is already gone counts as deleted.
    ///
    /// # Errors
    /// Returns an error on transport failure or a non-success status other than 404.
    pub async fn delete(&self, table: &str, filters: &[Filter<'_>]) -> Result<(), RemoteError> {
        let request = self.client.delete(self.table_url(table)).query(&eq_filters(filters));
        match self.send(request).await {
            Ok(_) => Ok(()),
            Err(e) if e.is_not_found() => {
                tracing::debug!(table, "Remote row already deleted");
                Ok(())
            },
            Err(e) => Err(e),
        }
    }

    /// Fetch rows matching `filters`.
    ///
    /// # Errors
    /// Returns an error on transport failure, a non-success status or an
    /// undecodable body.
    pub async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        filters: &[Filter<'_>],
    ) -> Result<Vec<T>, RemoteError> {
        let mut query = eq_filters(filters);
        query.push(("select".to_owned(), "*".to_owned()));
        let request = self.client.get(self.table_url(table)).query(&query);
        let body = self.send(request).await?.text().await?;
        serde_json::from_str(&body).map_err(|source| RemoteError::JsonParse {
            context: format!("select from {table}"),
            source,
        })
    }
}
