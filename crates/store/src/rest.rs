//! HTTP implementation of [`RowStore`].
//!
//! `HttpRowStore` wraps a `reqwest::Client` and translates every trait
//! method into the corresponding call against a PostgREST-style row-store
//! API, with classified retry + exponential back-off on transient
//! failures (timeouts, connection errors, 5xx, 429).

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use uuid::Uuid;

use cs_domain::config::StoreConfig;
use cs_domain::error::{Error, Result};
use cs_domain::trace::TraceEvent;

use crate::provider::{Filters, Row, RowStore};
use crate::retry;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Client
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A REST client for the remote row store.
///
/// Created once and reused for the lifetime of the process; the underlying
/// `reqwest::Client` maintains a connection pool.
#[derive(Debug, Clone)]
pub struct HttpRowStore {
    http: Client,
    base_url: String,
    api_key: Option<String>,
    max_retries: u32,
    backoff_base_ms: u64,
}

impl HttpRowStore {
    /// Build a new client from the shared [`StoreConfig`].
    pub fn new(cfg: &StoreConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_millis(cfg.timeout_ms))
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;

        Ok(Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_owned(),
            api_key: cfg.api_key.clone(),
            max_retries: cfg.max_retries,
            backoff_base_ms: cfg.backoff_base_ms,
        })
    }

    // ── request helpers ──────────────────────────────────────────────

    /// Decorate a `RequestBuilder` with the standard headers.
    fn decorate(&self, rb: RequestBuilder) -> RequestBuilder {
        let trace_id = Uuid::new_v4().to_string();
        let mut rb = rb
            .header("X-Client-Type", "coresell-engine")
            .header("X-Request-ID", &trace_id);
        if let Some(ref key) = self.api_key {
            rb = rb.header("X-Api-Key", key);
        }
        rb
    }

    /// Build the full table URL with equality filters as query params.
    fn table_url(&self, table: &str, filters: &Filters) -> String {
        let mut url = format!("{}/{}", self.base_url, table);
        let mut sep = '?';
        for (column, value) in filters {
            let rendered = match value {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            url.push_str(&format!("{sep}{column}=eq.{rendered}"));
            sep = '&';
        }
        url
    }

    // ── retry engine ─────────────────────────────────────────────────

    /// Execute a request with classified retry.
    ///
    /// * Retries on 5xx, 429, timeouts and connection errors.
    /// * Never retries other 4xx, constraint violations, or permission
    ///   errors.
    /// * Emits a `TraceEvent::StoreCall` after every attempt.
    async fn execute_with_retry(
        &self,
        table: &str,
        op: &str,
        build_request: impl Fn() -> RequestBuilder,
    ) -> Result<Response> {
        let mut last_err: Option<Error> = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                tokio::time::sleep(retry::backoff_delay(self.backoff_base_ms, attempt)).await;
            }

            let start = Instant::now();
            let result = self.decorate(build_request()).send().await;
            let duration_ms = start.elapsed().as_millis() as u64;

            match result {
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    TraceEvent::StoreCall {
                        table: table.to_owned(),
                        op: op.to_owned(),
                        status,
                        duration_ms,
                        attempt,
                    }
                    .emit();

                    if resp.status().is_success() {
                        return Ok(resp);
                    }

                    let body = resp.text().await.unwrap_or_default();
                    let retriable =
                        retry::status_retriable(status) && retry::message_retriable(&body);
                    let err = Error::Store {
                        message: format!("{op} {table} returned {status}: {body}"),
                        retriable,
                    };
                    if !retriable {
                        return Err(err);
                    }
                    last_err = Some(err);
                }
                Err(e) => {
                    TraceEvent::StoreCall {
                        table: table.to_owned(),
                        op: op.to_owned(),
                        status: 0,
                        duration_ms,
                        attempt,
                    }
                    .emit();

                    // Timeouts and connection errors are transient.
                    last_err = Some(Error::Store {
                        message: format!("{op} {table}: {e}"),
                        retriable: true,
                    });
                }
            }
        }

        Err(last_err.unwrap_or_else(|| Error::Store {
            message: format!("{op} {table}: all retries exhausted"),
            retriable: true,
        }))
    }

    async fn parse_rows(resp: Response) -> Result<Vec<Row>> {
        let body = resp.text().await.map_err(|e| Error::Http(e.to_string()))?;
        if body.trim().is_empty() {
            return Ok(Vec::new());
        }
        match serde_json::from_str::<serde_json::Value>(&body) {
            Ok(serde_json::Value::Array(rows)) => Ok(rows),
            Ok(single) => Ok(vec![single]),
            Err(e) => Err(Error::Store {
                message: format!("failed to parse response: {e}: {body}"),
                retriable: false,
            }),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Trait implementation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[async_trait]
impl RowStore for HttpRowStore {
    async fn select(
        &self,
        table: &str,
        filters: &Filters,
        limit: Option<usize>,
    ) -> Result<Vec<Row>> {
        let mut url = self.table_url(table, filters);
        if let Some(n) = limit {
            url.push_str(if filters.is_empty() { "?" } else { "&" });
            url.push_str(&format!("limit={n}"));
        }
        let resp = self
            .execute_with_retry(table, "select", || self.http.get(&url))
            .await?;
        Self::parse_rows(resp).await
    }

    async fn insert(&self, table: &str, row: Row) -> Result<Row> {
        let url = self.table_url(table, &Vec::new());
        let resp = self
            .execute_with_retry(table, "insert", || {
                self.http
                    .post(&url)
                    .header("Prefer", "return=representation")
                    .json(&row)
            })
            .await?;
        let mut rows = Self::parse_rows(resp).await?;
        Ok(rows.pop().unwrap_or(row))
    }

    async fn update(&self, table: &str, row: Row, filters: &Filters) -> Result<Row> {
        let url = self.table_url(table, filters);
        let resp = self
            .execute_with_retry(table, "update", || {
                self.http
                    .patch(&url)
                    .header("Prefer", "return=representation")
                    .json(&row)
            })
            .await?;
        let mut rows = Self::parse_rows(resp).await?;
        Ok(rows.pop().unwrap_or(row))
    }

    async fn upsert(&self, table: &str, row: Row) -> Result<Row> {
        let url = self.table_url(table, &Vec::new());
        let resp = self
            .execute_with_retry(table, "upsert", || {
                self.http
                    .post(&url)
                    .header(
                        "Prefer",
                        "resolution=merge-duplicates,return=representation",
                    )
                    .json(&row)
            })
            .await?;
        let mut rows = Self::parse_rows(resp).await?;
        Ok(rows.pop().unwrap_or(row))
    }

    async fn delete(&self, table: &str, filters: &Filters) -> Result<()> {
        let url = self.table_url(table, filters);
        self.execute_with_retry(table, "delete", || self.http.delete(&url))
            .await?;
        Ok(())
    }

    async fn rpc(&self, function: &str, params: Row) -> Result<Row> {
        let url = format!("{}/rpc/{}", self.base_url, function);
        let resp = self
            .execute_with_retry(function, "rpc", || self.http.post(&url).json(&params))
            .await?;
        let body = resp.text().await.map_err(|e| Error::Http(e.to_string()))?;
        if body.trim().is_empty() {
            return Ok(serde_json::Value::Null);
        }
        serde_json::from_str(&body).map_err(|e| Error::Store {
            message: format!("failed to parse rpc response: {e}: {body}"),
            retriable: false,
        })
    }

    async fn check_connection(&self) -> bool {
        let url = format!("{}/", self.base_url);
        match self.decorate(self.http.get(&url)).send().await {
            Ok(resp) => !resp.status().is_server_error(),
            Err(_) => false,
        }
    }
}
