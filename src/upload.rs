use serde::Serialize;
use std::thread;

use crate::fields::{Field, FormData};
use crate::summary::RunResult;

/// Wire shape expected by the persistence endpoint.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RunUpload {
    pub intervals: Vec<u64>,
    #[serde(rename = "totalTime")]
    pub total_time: u64,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub gender: String,
}

impl RunUpload {
    pub fn from_run(form: &FormData, result: &RunResult) -> Self {
        Self {
            intervals: result.intervals.clone(),
            total_time: result.total_time_ms,
            name: form.get(Field::Name).to_string(),
            email: form.get(Field::Email).to_string(),
            phone: form.get(Field::Phone).to_string(),
            gender: form.get(Field::Gender).to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("http transport error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("endpoint returned status {0}")]
    Status(u16),
}

/// Destination for completed-run payloads.
pub trait ResultSink: Send + Sync {
    fn submit(&self, upload: &RunUpload) -> Result<(), UploadError>;
}

/// POSTs the payload as JSON to the configured endpoint.
pub struct HttpSink {
    endpoint: String,
    client: reqwest::blocking::Client,
}

impl HttpSink {
    pub fn new(endpoint: String) -> Self {
        Self {
            endpoint,
            client: reqwest::blocking::Client::new(),
        }
    }
}

impl ResultSink for HttpSink {
    fn submit(&self, upload: &RunUpload) -> Result<(), UploadError> {
        let response = self.client.post(&self.endpoint).json(upload).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(UploadError::Status(status.as_u16()));
        }
        Ok(())
    }
}

/// Sink used when uploads are disabled or no endpoint is configured.
pub struct NullSink;

impl ResultSink for NullSink {
    fn submit(&self, _upload: &RunUpload) -> Result<(), UploadError> {
        Ok(())
    }
}

/// Fire-and-forget submit on a background thread. Failures are logged and
/// otherwise ignored: never surfaced to the participant, never retried.
pub fn submit_fire_and_forget(sink: std::sync::Arc<dyn ResultSink>, upload: RunUpload) {
    thread::spawn(move || {
        if let Err(e) = sink.submit(&upload) {
            tracing::warn!("run upload failed: {}", e);
        }
    });
}
