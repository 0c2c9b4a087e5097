//! PostgREST-backed implementation of [`RowStore`].
//!
//! Conventions: tables live under `{base}/rest/v1/{table}`, single-row ops
//! filter with `?id=eq.{id}`, and mutations ask for the stored row back via
//! `Prefer: return=representation`. Every request carries the publishable
//! `apikey`; when a session is active its access token rides along as the
//! bearer so the store can scope rows to the caller.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use url::Url;

use super::{RowStore, StoreError};
use crate::config::Config;

pub struct RestStore {
    http: reqwest::Client,
    base: Url,
    key: String,
    bearer: RwLock<Option<String>>,
}

impl RestStore {
    pub fn new(base_url: &str, key: impl Into<String>) -> Result<Self, StoreError> {
        let base = Url::parse(base_url)
            .map_err(|e| StoreError::Decode(format!("invalid store URL {}: {}", base_url, e)))?;
        Ok(Self {
            http: reqwest::Client::new(),
            base,
            key: key.into(),
            bearer: RwLock::new(None),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, StoreError> {
        Self::new(&config.store_url, config.store_key.clone())
    }

    /// Set (or clear) the access token attached to subsequent requests.
    /// Called on every session change.
    pub fn set_bearer(&self, token: Option<String>) {
        *self.bearer.write() = token;
    }

    fn table_url(&self, table: &str) -> Result<Url, StoreError> {
        self.base
            .join(&format!("rest/v1/{}", table))
            .map_err(|e| StoreError::Decode(format!("invalid table name {}: {}", table, e)))
    }

    fn request(&self, method: reqwest::Method, url: Url) -> reqwest::RequestBuilder {
        let builder = self.http.request(method, url).header("apikey", &self.key);
        match self.bearer.read().as_deref() {
            Some(token) => builder.bearer_auth(token),
            None => builder.bearer_auth(&self.key),
        }
    }

    /// Map a non-2xx response body onto [`StoreError::Api`].
    async fn api_error(resp: reqwest::Response) -> StoreError {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();

        if let Ok(parsed) = serde_json::from_str::<Value>(&body) {
            if parsed.get("message").is_some() {
                return StoreError::Api {
                    code: parsed["code"].as_str().map(|s| s.to_string()),
                    message: parsed["message"].as_str().unwrap_or("unknown error").to_string(),
                    hint: parsed["hint"].as_str().map(|s| s.to_string()),
                    details: parsed["details"].as_str().map(|s| s.to_string()),
                };
            }
        }

        StoreError::Api {
            code: None,
            message: format!("HTTP {}: {}", status, body),
            hint: None,
            details: None,
        }
    }

    /// Parse a `return=representation` reply, which always arrives as an
    /// array of affected rows.
    async fn single_row(resp: reqwest::Response) -> Result<Value, StoreError> {
        let rows: Vec<Value> = resp.json().await?;
        rows.into_iter().next().ok_or(StoreError::NotFound)
    }
}

#[async_trait]
impl RowStore for RestStore {
    async fn select(&self, table: &str, order: Option<&str>) -> Result<Vec<Value>, StoreError> {
        let mut url = self.table_url(table)?;
        url.query_pairs_mut().append_pair("select", "*");
        if let Some(order) = order {
            url.query_pairs_mut().append_pair("order", order);
        }

        let resp = self.request(reqwest::Method::GET, url).send().await?;
        if !resp.status().is_success() {
            return Err(Self::api_error(resp).await);
        }
        Ok(resp.json().await?)
    }

    async fn select_by_id(&self, table: &str, id: &str) -> Result<Option<Value>, StoreError> {
        let mut url = self.table_url(table)?;
        url.query_pairs_mut()
            .append_pair("select", "*")
            .append_pair("id", &format!("eq.{}", id));

        let resp = self.request(reqwest::Method::GET, url).send().await?;
        if !resp.status().is_success() {
            return Err(Self::api_error(resp).await);
        }
        let rows: Vec<Value> = resp.json().await?;
        Ok(rows.into_iter().next())
    }

    async fn insert(&self, table: &str, row: Value) -> Result<Value, StoreError> {
        let url = self.table_url(table)?;
        let resp = self
            .request(reqwest::Method::POST, url)
            .header("Prefer", "return=representation")
            .json(&row)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(Self::api_error(resp).await);
        }
        Self::single_row(resp).await
    }

    async fn update(&self, table: &str, id: &str, patch: Value) -> Result<Value, StoreError> {
        let mut url = self.table_url(table)?;
        url.query_pairs_mut().append_pair("id", &format!("eq.{}", id));

        let resp = self
            .request(reqwest::Method::PATCH, url)
            .header("Prefer", "return=representation")
            .json(&patch)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(Self::api_error(resp).await);
        }
        Self::single_row(resp).await
    }

    async fn delete(&self, table: &str, id: &str) -> Result<(), StoreError> {
        let mut url = self.table_url(table)?;
        url.query_pairs_mut().append_pair("id", &format!("eq.{}", id));

        let resp = self.request(reqwest::Method::DELETE, url).send().await?;
        if !resp.status().is_success() {
            return Err(Self::api_error(resp).await);
        }
        Ok(())
    }
}
