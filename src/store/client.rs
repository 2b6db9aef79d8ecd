//! LangSmith HTTP client.
//!
//! Experiments are LangSmith "sessions" (tracing projects). Statistics come
//! from `GET /api/v1/sessions?include_stats=true`; the raw path pages through
//! `POST /api/v1/runs/query` and `GET /api/v1/feedback`.

use super::{EvaluationStore, FeedbackRecord, RawFeedback, StoreError};
use crate::config::StoreSettings;
use crate::models::{ExperimentStats, FeedbackStats};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, warn};

/// Environment variables checked for the API key, in order.
const API_KEY_VARS: [&str; 2] = ["LANGSMITH_API_KEY", "LANGCHAIN_API_KEY"];

/// Run ids per feedback request; keeps query strings short.
const FEEDBACK_RUN_BATCH: usize = 50;

/// Session as returned by `/api/v1/sessions`.
#[derive(Debug, Deserialize)]
struct SessionResponse {
    id: String,
    #[serde(default)]
    run_count: Option<u64>,
    #[serde(default)]
    feedback_stats: Option<BTreeMap<String, FeedbackStats>>,
}

#[derive(Debug, Serialize)]
struct RunsQueryRequest<'a> {
    session: [&'a str; 1],
    is_root: bool,
    select: [&'static str; 1],
    limit: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RunsQueryResponse {
    #[serde(default)]
    runs: Vec<RunId>,
    #[serde(default)]
    cursors: Option<Cursors>,
}

#[derive(Debug, Deserialize)]
struct RunId {
    id: String,
}

#[derive(Debug, Deserialize)]
struct Cursors {
    #[serde(default)]
    next: Option<String>,
}

/// Client for the LangSmith REST API.
pub struct LangSmithClient {
    http: reqwest::Client,
    api_url: String,
    page_size: usize,
}

/// Per-request timeout; a zero setting would fail every request.
fn request_timeout(settings: &StoreSettings) -> Duration {
    Duration::from_secs(settings.timeout_seconds.max(1))
}

impl LangSmithClient {
    /// Create a client with the API key from the environment.
    pub fn from_env(settings: &StoreSettings) -> Result<Self, StoreError> {
        let api_key = API_KEY_VARS
            .iter()
            .filter_map(|var| std::env::var(var).ok())
            .map(|key| key.trim().to_string())
            .find(|key| !key.is_empty())
            .ok_or(StoreError::MissingApiKey)?;

        Self::new(settings, &api_key)
    }

    /// Create a client with an explicit API key.
    pub fn new(settings: &StoreSettings, api_key: &str) -> Result<Self, StoreError> {
        let mut headers = HeaderMap::new();
        let mut key = HeaderValue::from_str(api_key).map_err(|_| StoreError::InvalidApiKey)?;
        key.set_sensitive(true);
        headers.insert("x-api-key", key);

        let http = reqwest::Client::builder()
            .timeout(request_timeout(settings))
            .default_headers(headers)
            .build()
            .map_err(|e| StoreError::Client(e.to_string()))?;

        Ok(Self {
            http,
            api_url: settings.api_url.trim_end_matches('/').to_string(),
            page_size: settings.page_size.max(1),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.api_url, path)
    }

    /// Send a request and decode a JSON body, mapping failures to [`StoreError`].
    async fn send_json<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, StoreError> {
        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let url = response.url().to_string();
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Api { status, url, body });
        }

        let url = response.url().to_string();
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| StoreError::Decode {
            url,
            message: e.to_string(),
        })
    }

    /// Look up an experiment by name.
    async fn find_session(
        &self,
        experiment_name: &str,
        include_stats: bool,
    ) -> Result<SessionResponse, StoreError> {
        debug!(
            "Fetching session {} (include_stats={})",
            experiment_name, include_stats
        );

        let request = self.http.get(self.url("/sessions")).query(&[
            ("name", experiment_name),
            ("include_stats", if include_stats { "true" } else { "false" }),
            ("limit", "1"),
        ]);

        let sessions: Vec<SessionResponse> = self.send_json(request).await?;
        sessions
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::ExperimentNotFound(experiment_name.to_string()))
    }

    /// Page through the root run ids of a session.
    async fn list_root_run_ids(&self, session_id: &str) -> Result<Vec<String>, StoreError> {
        let mut ids = Vec::new();
        let mut cursor = None;

        loop {
            let body = RunsQueryRequest {
                session: [session_id],
                is_root: true,
                select: ["id"],
                limit: self.page_size,
                cursor: cursor.clone(),
            };

            let page: RunsQueryResponse = self
                .send_json(self.http.post(self.url("/runs/query")).json(&body))
                .await?;

            ids.extend(page.runs.into_iter().map(|r| r.id));

            match page.cursors.and_then(|c| c.next) {
                Some(next) if cursor.as_ref() != Some(&next) => cursor = Some(next),
                Some(next) => {
                    warn!("Run listing returned cursor {} twice; stopping", next);
                    break;
                }
                None => break,
            }
        }

        debug!("Session {} has {} root runs", session_id, ids.len());
        Ok(ids)
    }

    /// Page through feedback for a batch of runs.
    async fn list_feedback(&self, run_ids: &[String]) -> Result<Vec<FeedbackRecord>, StoreError> {
        let mut records = Vec::new();
        let mut offset = 0;

        loop {
            let mut query: Vec<(&str, String)> =
                run_ids.iter().map(|id| ("run", id.clone())).collect();
            query.push(("limit", self.page_size.to_string()));
            query.push(("offset", offset.to_string()));

            let page: Vec<FeedbackRecord> = self
                .send_json(self.http.get(self.url("/feedback")).query(&query))
                .await?;

            // The server may cap `limit`, so only an empty page ends the listing.
            if page.is_empty() {
                break;
            }
            offset += page.len();
            records.extend(page);
        }

        Ok(records)
    }
}

#[async_trait]
impl EvaluationStore for LangSmithClient {
    async fn experiment_stats(&self, experiment_name: &str) -> Result<ExperimentStats, StoreError> {
        let session = self.find_session(experiment_name, true).await?;

        Ok(ExperimentStats {
            run_count: session.run_count.unwrap_or(0),
            feedback: session.feedback_stats.unwrap_or_default(),
        })
    }

    async fn raw_feedback(&self, experiment_name: &str) -> Result<RawFeedback, StoreError> {
        let session = self.find_session(experiment_name, false).await?;
        let run_ids = self.list_root_run_ids(&session.id).await?;

        let mut records = Vec::new();
        for batch in run_ids.chunks(FEEDBACK_RUN_BATCH) {
            records.extend(self.list_feedback(batch).await?);
        }

        Ok(RawFeedback {
            run_count: run_ids.len() as u64,
            records,
        })
    }
}
