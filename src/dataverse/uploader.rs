//! Sequential record creation with a per-row outcome log.
//!
//! Every payload is posted exactly once, in order. A non-201 answer or a
//! transport failure marks that row failed and the batch moves on.

use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tokio::time::Instant;

use crate::dataverse::payload::Payload;
use crate::dataverse::transport::Transport;

/// Status the Web API returns for a created record.
pub const CREATED: u16 = 201;

/// Outcome of one create request.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadResult {
    /// Body that was sent.
    pub payload: Payload,
    pub request_uri: String,
    /// `None` when no response was received.
    pub status: Option<u16>,
    /// Decoded response body, the raw text if it was not JSON, or the
    /// transport error message.
    pub content: Value,
}

impl UploadResult {
    pub fn succeeded(&self) -> bool {
        self.status == Some(CREATED)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub elapsed: Duration,
}

impl UploadSummary {
    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }
}

/// Results in input order plus the run tally.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadReport {
    pub results: Vec<UploadResult>,
    pub summary: UploadSummary,
}

#[derive(Serialize)]
struct ReportEntry<'a> {
    #[serde(flatten)]
    payload: &'a Payload,
    #[serde(rename = "_REQUEST")]
    request: RequestRecord<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
struct RequestRecord<'a> {
    request_uri: &'a str,
    http_response: Option<u16>,
    http_content: &'a Value,
}

impl Serialize for UploadReport {
    /// Serializes as an array of sent payloads, each carrying a `_REQUEST`
    /// object with `REQUEST_URI`, `HTTP_RESPONSE` and `HTTP_CONTENT`.
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.results.iter().map(|result| ReportEntry {
            payload: &result.payload,
            request: RequestRecord {
                request_uri: &result.request_uri,
                http_response: result.status,
                http_content: &result.content,
            },
        }))
    }
}

/// Tracks the rounded completion percentage and reports when it changes.
struct Progress {
    expected: usize,
    done: usize,
    percent: u32,
}

impl Progress {
    fn new(expected: usize) -> Self {
        Self {
            expected,
            done: 0,
            percent: 0,
        }
    }

    /// Advance by one row; returns the new percentage if it changed.
    fn advance(&mut self) -> Option<u32> {
        self.done += 1;
        let percent = (self.done as f64 / self.expected as f64 * 100.0).round_ties_even() as u32;
        if percent == self.percent {
            return None;
        }
        self.percent = percent;
        Some(percent)
    }
}

/// Create one record per payload in `entity_set_name`.
pub async fn upload<T: Transport + ?Sized>(
    transport: &T,
    entity_set_name: &str,
    payloads: Vec<Payload>,
) -> UploadReport {
    let request_uri = transport.build_uri(entity_set_name, &[]);
    let expected = payloads.len();
    let started = Instant::now();

    let mut progress = Progress::new(expected);
    let mut results = Vec::with_capacity(expected);
    let mut succeeded = 0;
    let mut failed = 0;

    for payload in payloads {
        let body = Value::Object(payload.clone());
        let (status, content) = match transport.post(&request_uri, &body).await {
            Ok(response) => (Some(response.status), response.content()),
            Err(e) => {
                log::warn!("Request to {} failed: {}", request_uri, e);
                (None, Value::String(e.to_string()))
            }
        };

        let result = UploadResult {
            payload,
            request_uri: request_uri.clone(),
            status,
            content,
        };

        if result.succeeded() {
            succeeded += 1;
        } else {
            failed += 1;
        }
        results.push(result);

        if let Some(percent) = progress.advance() {
            log::info!("{}% complete", percent);
        }
    }

    let summary = UploadSummary {
        succeeded,
        failed,
        elapsed: started.elapsed(),
    };

    log::info!(
        "{} records created of {} expected, {} failures",
        summary.succeeded,
        expected,
        summary.failed
    );
    log::info!("Import took {} seconds", summary.elapsed.as_secs_f64().round());

    UploadReport { results, summary }
}
