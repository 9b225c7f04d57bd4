//! reqwest-backed [`ReportApi`].
//!
//! Endpoint contract:
//! - `POST {base}/v1/llm/reports/{roomId}`: any 2xx acknowledges the trigger.
//! - `GET  {base}/v1/llm/reports/{roomId}`: 200 + JSON body is ready, 202 is
//!   still processing, anything else fails.

use std::time::Duration;

use reqwest::{StatusCode, Url};
use serde_json::Value;
use tracing::debug;

use crate::{ClientError, Operation, PollOutcome, ReportApi};

const REPORTS_PATH: &[&str] = &["v1", "llm", "reports"];

/// Optional transport settings.
#[derive(Debug, Clone, Default)]
pub struct HttpOptions {
    /// Sent as `Authorization: Bearer <token>`. Do not log it.
    pub bearer_token: Option<String>,
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone)]
pub struct HttpReportApi {
    http: reqwest::Client,
    base_url: Url,
    bearer_token: Option<String>,
}

impl HttpReportApi {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        Self::with_options(base_url, HttpOptions::default())
    }

    pub fn with_options(base_url: &str, options: HttpOptions) -> Result<Self, ClientError> {
        let parsed = Url::parse(base_url).map_err(|e| ClientError::InvalidBaseUrl {
            base_url: base_url.to_string(),
            reason: e.to_string(),
        })?;
        if parsed.cannot_be_a_base() {
            return Err(ClientError::InvalidBaseUrl {
                base_url: base_url.to_string(),
                reason: "url cannot carry a path".to_string(),
            });
        }

        let mut builder = reqwest::Client::builder();
        if let Some(t) = options.timeout {
            builder = builder.timeout(t);
        }
        let http = builder.build().map_err(|e| ClientError::InvalidBaseUrl {
            base_url: base_url.to_string(),
            reason: format!("http client build failed: {e}"),
        })?;

        Ok(Self {
            http,
            base_url: parsed,
            bearer_token: options.bearer_token,
        })
    }

    /// `{base}/v1/llm/reports/{room_id}` with the room id percent-encoded as a
    /// single path segment.
    pub fn report_url(&self, room_id: &str) -> Url {
        let mut url = self.base_url.clone();
        // cannot_be_a_base() was rejected in the constructor.
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty();
            segments.extend(REPORTS_PATH);
            segments.push(room_id);
        }
        url
    }

    fn request(&self, method: reqwest::Method, room_id: &str) -> reqwest::RequestBuilder {
        let req = self.http.request(method, self.report_url(room_id));
        match &self.bearer_token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }
}

#[async_trait::async_trait]
impl ReportApi for HttpReportApi {
    async fn trigger(&self, room_id: &str) -> Result<(), ClientError> {
        let resp = self
            .request(reqwest::Method::POST, room_id)
            .send()
            .await
            .map_err(|e| transport(Operation::Trigger, e))?;

        let status = resp.status();
        debug!(room_id, status = status.as_u16(), "report trigger response");
        if status.is_success() {
            return Ok(());
        }
        Err(unexpected_status(Operation::Trigger, resp).await)
    }

    async fn fetch_once(&self, room_id: &str) -> PollOutcome {
        let resp = match self.request(reqwest::Method::GET, room_id).send().await {
            Ok(r) => r,
            Err(e) => return PollOutcome::Failed(transport(Operation::Poll, e)),
        };

        let status = resp.status();
        debug!(room_id, status = status.as_u16(), "report poll response");
        match status {
            StatusCode::OK => match resp.json::<Value>().await {
                Ok(body) => PollOutcome::Ready(llmr_report::normalize(&body)),
                Err(e) => PollOutcome::Failed(ClientError::Decode {
                    message: e.to_string(),
                }),
            },
            StatusCode::ACCEPTED => PollOutcome::Pending,
            _ => PollOutcome::Failed(unexpected_status(Operation::Poll, resp).await),
        }
    }
}

fn transport(op: Operation, e: reqwest::Error) -> ClientError {
    ClientError::Transport {
        op,
        message: e.to_string(),
    }
}

/// Build an `UnexpectedStatus`, lifting a `{"detail": "..."}` body if present.
async fn unexpected_status(op: Operation, resp: reqwest::Response) -> ClientError {
    let status = resp.status().as_u16();
    let detail = resp
        .text()
        .await
        .ok()
        .and_then(|body| serde_json::from_str::<Value>(&body).ok())
        .and_then(|v| v.get("detail").and_then(Value::as_str).map(str::to_string));
    ClientError::UnexpectedStatus { op, status, detail }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_url_encodes_room_id_as_one_segment() {
        let api = HttpReportApi::new("http://localhost:8000").unwrap();
        assert_eq!(
            api.report_url("rm 1/x").as_str(),
            "http://localhost:8000/v1/llm/reports/rm%201%2Fx"
        );
    }

    #[test]
    fn report_url_keeps_base_path_prefix() {
        let api = HttpReportApi::new("https://api.example.com/backend/").unwrap();
        assert_eq!(
            api.report_url("rm_1").as_str(),
            "https://api.example.com/backend/v1/llm/reports/rm_1"
        );
    }

    #[test]
    fn rejects_unusable_base_url() {
        assert!(matches!(
            HttpReportApi::new("not a url"),
            Err(ClientError::InvalidBaseUrl { .. })
        ));
        assert!(matches!(
            HttpReportApi::new("mailto:ops@example.com"),
            Err(ClientError::InvalidBaseUrl { .. })
        ));
    }
}
