//! WebSocket upgrade + message loop. Each socket owns one form session for as long as
//! it stays open. Every client message is parsed as JSON, applied to that session, and
//! answered with a single JSON message.

use std::sync::Arc;
use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use tracing::{info, error, instrument, debug};
use uuid::Uuid;

use crate::logic::{apply_action, submit_and_deliver, FormAction, SubmitOutcome};
use crate::protocol::{to_view, ClientWsMessage, ServerWsMessage};
use crate::state::AppState;
use crate::wizard::WizardController;

#[instrument(level = "info", skip(ws, state))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
  info!(target: "cert_intake_backend", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state))
}

#[instrument(level = "info", skip(socket, state))]
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
  let mut id = Uuid::new_v4().to_string();
  let mut ctrl = state.new_controller();
  info!(target: "cert_intake_backend", %id, "WebSocket connected");
  while let Some(Ok(msg)) = socket.recv().await {
    match msg {
      Message::Text(txt) => {
        // Parse, dispatch, serialize response.
        let reply_msg = match serde_json::from_str::<ClientWsMessage>(&txt) {
          Ok(incoming) => {
            debug!(target: "cert_intake_backend", %id, kind = incoming.kind(), value_len = ?incoming.value_len(), "WS received");
            handle_client_ws(incoming, &mut id, &mut ctrl, &state)
          }
          Err(e) => ServerWsMessage::Error { message: format!("Invalid JSON: {}", e) },
        };

        let out = serde_json::to_string(&reply_msg).unwrap_or_else(|e| {
          serde_json::json!({ "type": "error", "message": format!("Serialization error: {}", e) }).to_string()
        });

        if let Err(e) = socket.send(Message::Text(out)).await {
          error!(target: "cert_intake_backend", error = %e, "WS send error");
          break;
        }
      }
      Message::Ping(payload) => { let _ = socket.send(Message::Pong(payload)).await; }
      Message::Close(_) => break,
      _ => {}
    }
  }
  info!(target: "cert_intake_backend", %id, "WebSocket disconnected");
}

fn handle_client_ws(msg: ClientWsMessage, id: &mut String, ctrl: &mut WizardController, state: &AppState) -> ServerWsMessage {
  let action = match msg {
    ClientWsMessage::Ping => return ServerWsMessage::Pong,
    ClientWsMessage::View => return ServerWsMessage::Form { form: to_view(id, ctrl) },
    ClientWsMessage::Reset => {
      restart(id, ctrl, state);
      return ServerWsMessage::Form { form: to_view(id, ctrl) };
    }
    ClientWsMessage::Submit => {
      return match submit_and_deliver(ctrl, state.sink.as_ref()) {
        Ok(SubmitOutcome::Accepted(payload)) => {
          tracing::info!(target: "intake", %id, entries = payload.len(), "WS submit accepted");
          // The submitted form is done; the socket continues with a blank one.
          restart(id, ctrl, state);
          ServerWsMessage::Submitted { payload }
        }
        Ok(SubmitOutcome::Rejected { step_index, errors }) => {
          tracing::info!(target: "intake", %id, errors = errors.len(), "WS submit rejected");
          ServerWsMessage::Rejected { step_index, errors, form: to_view(id, ctrl) }
        }
        Err(e) => ServerWsMessage::Error { message: e.to_string() },
      };
    }
    ClientWsMessage::SetField { name, value } => FormAction::SetField { name, value },
    ClientWsMessage::Next => FormAction::Next,
    ClientWsMessage::Previous => FormAction::Previous,
    ClientWsMessage::AppendCourse => FormAction::AppendCourse,
    ClientWsMessage::RemoveCourse { index } => FormAction::RemoveCourse { index },
    ClientWsMessage::SetCourseField { index, field, value } => FormAction::SetCourseField { index, field, value },
  };

  match apply_action(ctrl, action) {
    Ok(()) => ServerWsMessage::Form { form: to_view(id, ctrl) },
    Err(e) => ServerWsMessage::Error { message: e.to_string() },
  }
}

fn restart(id: &mut String, ctrl: &mut WizardController, state: &AppState) {
  *id = Uuid::new_v4().to_string();
  *ctrl = state.new_controller();
}
