//! Loading intake configuration (schema revision, wizard options, session limits,
//! submission endpoint) from TOML.
//!
//! See `IntakeConfig` for the expected schema. Every section is optional.

use serde::Deserialize;
use tracing::{error, info};

use crate::schema::SchemaVersion;
use crate::wizard::WizardOptions;

#[derive(Clone, Debug, Deserialize, Default, PartialEq)]
pub struct IntakeConfig {
  #[serde(default)]
  pub schema_version: SchemaVersion,
  #[serde(default)]
  pub wizard: WizardOptions,
  #[serde(default)]
  pub sessions: SessionConfig,
  #[serde(default)]
  pub submission: SubmissionConfig,
}

/// Bounds on the in-memory store of HTTP form sessions.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
pub struct SessionConfig {
  /// A session untouched for this long is dropped.
  #[serde(default = "default_idle_secs")] pub idle_secs: u64,
  /// Opening a session beyond this many (after pruning idle ones) is refused.
  #[serde(default = "default_max_sessions")] pub max_sessions: usize,
}

fn default_idle_secs() -> u64 { 30 * 60 }
fn default_max_sessions() -> usize { 1000 }

impl Default for SessionConfig {
  fn default() -> Self {
    Self { idle_secs: default_idle_secs(), max_sessions: default_max_sessions() }
  }
}

/// Where accepted payloads go. Without an endpoint they are only logged.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct SubmissionConfig {
  #[serde(default)] pub endpoint: Option<String>,
  #[serde(default = "default_timeout_secs")] pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 { 20 }

impl Default for SubmissionConfig {
  fn default() -> Self {
    Self { endpoint: None, timeout_secs: default_timeout_secs() }
  }
}

pub fn parse_intake_config(s: &str) -> Result<IntakeConfig, toml::de::Error> {
  toml::from_str::<IntakeConfig>(s)
}

/// Load `IntakeConfig` from INTAKE_CONFIG_PATH, then apply SUBMISSION_URL on top.
/// On any IO/parsing error the defaults are used.
pub fn load_intake_config_from_env() -> IntakeConfig {
  let mut cfg = match std::env::var("INTAKE_CONFIG_PATH") {
    Ok(path) => match std::fs::read_to_string(&path) {
      Ok(s) => match parse_intake_config(&s) {
        Ok(cfg) => {
          info!(target: "cert_intake_backend", %path, "Loaded intake config (TOML)");
          cfg
        }
        Err(e) => {
          error!(target: "cert_intake_backend", %path, error = %e, "Failed to parse TOML config");
          IntakeConfig::default()
        }
      },
      Err(e) => {
        error!(target: "cert_intake_backend", %path, error = %e, "Failed to read TOML config file");
        IntakeConfig::default()
      }
    },
    Err(_) => IntakeConfig::default(),
  };

  if let Ok(url) = std::env::var("SUBMISSION_URL") {
    if !url.trim().is_empty() {
      cfg.submission.endpoint = Some(url);
    }
  }
  cfg
}
