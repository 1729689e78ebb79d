//! Submission collaborators: where an accepted payload goes.
//!
//! Delivery is fire-and-forget. The wizard session is already discarded by the time
//! a sink sees the payload; there is no retry and no way to report back to the user.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use tracing::{error, info, instrument};

use crate::config::SubmissionConfig;
use crate::payload::SubmissionPayload;
use crate::util::trunc_for_log;

pub trait SubmissionSink: Send + Sync {
  fn deliver(&self, payload: SubmissionPayload);
}

/// Logs the payload and drops it. Used when no endpoint is configured.
pub struct LogSink;

impl SubmissionSink for LogSink {
  fn deliver(&self, payload: SubmissionPayload) {
    let body = payload.to_json().to_string();
    info!(target: "intake", entries = payload.len(), payload = %trunc_for_log(&body, 2048), "Submission payload (no endpoint configured)");
  }
}

/// POSTs the payload as JSON to an upload endpoint.
#[derive(Clone)]
pub struct HttpSink {
  pub client: reqwest::Client,
  pub endpoint: String,
}

impl HttpSink {
  pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, String> {
    let client = reqwest::Client::builder()
      .timeout(timeout)
      .build()
      .map_err(|e| e.to_string())?;
    Ok(Self { client, endpoint: endpoint.into() })
  }

  #[instrument(level = "info", skip(self, payload), fields(endpoint = %self.endpoint, entries = payload.len()))]
  pub async fn post(&self, payload: &SubmissionPayload) -> Result<(), String> {
    let res = self.client.post(&self.endpoint)
      .header(USER_AGENT, "cert-intake-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .json(payload).send().await.map_err(|e| e.to_string())?;

    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      return Err(format!("Upload HTTP {}: {}", status, trunc_for_log(&body, 512)));
    }
    Ok(())
  }
}

impl SubmissionSink for HttpSink {
  fn deliver(&self, payload: SubmissionPayload) {
    let sink = self.clone();
    tokio::spawn(async move {
      match sink.post(&payload).await {
        Ok(()) => info!(target: "intake", endpoint = %sink.endpoint, entries = payload.len(), "Submission delivered"),
        Err(e) => error!(target: "intake", endpoint = %sink.endpoint, error = %e, "Submission delivery failed"),
      }
    });
  }
}

/// Pick the sink for `cfg`: HTTP when an endpoint is set and the client builds, logging otherwise.
pub fn sink_from_config(cfg: &SubmissionConfig) -> Arc<dyn SubmissionSink> {
  if let Some(endpoint) = &cfg.endpoint {
    match HttpSink::new(endpoint.clone(), Duration::from_secs(cfg.timeout_secs)) {
      Ok(sink) => {
        info!(target: "cert_intake_backend", %endpoint, timeout_secs = cfg.timeout_secs, "Submission upload enabled.");
        return Arc::new(sink);
      }
      Err(e) => {
        error!(target: "cert_intake_backend", %endpoint, error = %e, "Failed to build upload client; logging submissions instead");
      }
    }
  } else {
    info!(target: "cert_intake_backend", "No submission endpoint configured. Payloads are logged only.");
  }
  Arc::new(LogSink)
}

#[cfg(test)]
pub(crate) mod testing {
  use std::sync::Mutex;

  use super::*;

  /// Keeps every delivered payload for inspection.
  #[derive(Default)]
  pub struct RecordingSink {
    pub delivered: Mutex<Vec<SubmissionPayload>>,
  }

  impl SubmissionSink for RecordingSink {
    fn deliver(&self, payload: SubmissionPayload) {
      if let Ok(mut d) = self.delivered.lock() {
        d.push(payload);
      }
    }
  }
}
