//! Application state: the field schema, wizard options, submission sink, and the
//! in-memory store of open form sessions.
//!
//! Sessions are never persisted. One is discarded when its form is submitted
//! successfully, explicitly closed, or left idle past `SessionConfig::idle_secs`;
//! restarting the process drops them all.

use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::RwLock;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::config::{load_intake_config_from_env, SessionConfig};
use crate::logic::{submit_and_deliver, SubmitOutcome};
use crate::error::IntakeError;
use crate::protocol::{to_view, FormView};
use crate::schema::FormSchema;
use crate::submission::{sink_from_config, SubmissionSink};
use crate::wizard::{WizardController, WizardOptions};

/// One open form plus the last time a request touched it.
pub struct Session {
    pub ctrl: WizardController,
    pub touched: Instant,
}

impl Session {
    fn new(ctrl: WizardController) -> Self {
        Self { ctrl, touched: Instant::now() }
    }

    fn is_idle(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.touched) >= ttl
    }
}

#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<RwLock<HashMap<String, Session>>>,
    pub schema: Arc<FormSchema>,
    pub options: WizardOptions,
    pub limits: SessionConfig,
    pub sink: Arc<dyn SubmissionSink>,
}

impl AppState {
    /// Build state from env: load config, project the schema, pick the submission sink.
    #[instrument(level = "info", skip_all)]
    pub fn new() -> Self {
        let cfg = load_intake_config_from_env();
        let schema = FormSchema::certificate(cfg.schema_version);
        if let Err(e) = schema.check_coverage() {
            error!(target: "cert_intake_backend", error = %e, "Field schema is not partitioned cleanly");
        }
        info!(
            target: "cert_intake_backend",
            version = cfg.schema_version.as_str(),
            steps = schema.step_count(),
            fields = schema.fields().len(),
            focus_first_invalid_step = cfg.wizard.focus_first_invalid_step,
            guard_last_course = cfg.wizard.guard_last_course,
            idle_secs = cfg.sessions.idle_secs,
            max_sessions = cfg.sessions.max_sessions,
            "Intake schema ready"
        );
        let sink = sink_from_config(&cfg.submission);
        Self::with_parts(schema, cfg.wizard, sink).with_limits(cfg.sessions)
    }

    pub fn with_parts(schema: FormSchema, options: WizardOptions, sink: Arc<dyn SubmissionSink>) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            schema: Arc::new(schema),
            options,
            limits: SessionConfig::default(),
            sink,
        }
    }

    pub fn with_limits(mut self, limits: SessionConfig) -> Self {
        self.limits = limits;
        self
    }

    fn idle_ttl(&self) -> Duration {
        Duration::from_secs(self.limits.idle_secs)
    }

    /// Fresh controller over the shared schema (also used by WebSocket clients).
    pub fn new_controller(&self) -> WizardController {
        WizardController::new(self.schema.clone(), self.options)
    }

    /// Open a blank form session and return its first view. Idle sessions are pruned
    /// first; if the store is still full the request is refused.
    #[instrument(level = "info", skip(self))]
    pub async fn open_session(&self) -> Result<FormView, IntakeError> {
        let mut sessions = self.sessions.write().await;
        let pruned = prune(&mut sessions, Instant::now(), self.idle_ttl());
        if pruned > 0 {
            debug!(target: "intake", pruned, "Idle form sessions dropped");
        }
        if sessions.len() >= self.limits.max_sessions {
            warn!(target: "intake", open = sessions.len(), max = self.limits.max_sessions, "Form session refused: store full");
            return Err(IntakeError::SessionLimitReached { max: self.limits.max_sessions });
        }

        let id = Uuid::new_v4().to_string();
        let ctrl = self.new_controller();
        let view = to_view(&id, &ctrl);
        sessions.insert(id.clone(), Session::new(ctrl));
        info!(target: "intake", %id, open = sessions.len(), "Form session opened");
        Ok(view)
    }

    /// Run `f` against the session `id`, if it exists and has not gone idle.
    #[instrument(level = "debug", skip(self, f), fields(%id))]
    pub async fn with_session<R>(&self, id: &str, f: impl FnOnce(&mut WizardController) -> R) -> Option<R> {
        let mut sessions = self.sessions.write().await;
        let session = self.live_session(&mut sessions, id)?;
        Some(f(&mut session.ctrl))
    }

    /// Submit the session `id`. An accepted form is removed from the store and handed to the sink.
    #[instrument(level = "info", skip(self), fields(%id))]
    pub async fn submit_session(&self, id: &str) -> Option<Result<SubmitOutcome, IntakeError>> {
        let mut sessions = self.sessions.write().await;
        let session = self.live_session(&mut sessions, id)?;
        let outcome = submit_and_deliver(&mut session.ctrl, self.sink.as_ref());
        if matches!(outcome, Ok(SubmitOutcome::Accepted(_))) {
            sessions.remove(id);
            info!(target: "intake", %id, "Form session closed after submit");
        }
        Some(outcome)
    }

    pub async fn discard(&self, id: &str) -> bool {
        let removed = self.sessions.write().await.remove(id).is_some();
        if removed {
            info!(target: "intake", %id, "Form session discarded");
        }
        removed
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Drop every session idle past the configured TTL; returns how many went.
    pub async fn prune_idle(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        prune(&mut sessions, Instant::now(), self.idle_ttl())
    }

    /// Look up `id` and mark it touched. An expired entry is removed and reported missing.
    fn live_session<'a>(&self, sessions: &'a mut HashMap<String, Session>, id: &str) -> Option<&'a mut Session> {
        let now = Instant::now();
        if sessions.get(id)?.is_idle(now, self.idle_ttl()) {
            sessions.remove(id);
            info!(target: "intake", %id, "Form session expired");
            return None;
        }
        let session = sessions.get_mut(id)?;
        session.touched = now;
        Some(session)
    }
}

fn prune(sessions: &mut HashMap<String, Session>, now: Instant, ttl: Duration) -> usize {
    let before = sessions.len();
    sessions.retain(|_, s| !s.is_idle(now, ttl));
    before - sessions.len()
}
