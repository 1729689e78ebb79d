//! Router assembly: HTTP endpoints, WebSocket upgrade, static files, CORS, and HTTP tracing.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod http;
pub mod ws;

/// Build the application router with:
/// - WebSocket at `/ws` (one form session per socket)
/// - REST-ish API under `/api/v1/...`
/// - Static SPA from `./static` with index fallback
/// - CORS (allow any origin/method/headers) – adjust for production if needed
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
    // Static files with SPA fallback
    let static_service = ServeDir::new("./static")
        .append_index_html_on_directories(true)
        .not_found_service(ServeFile::new("./static/index.html"));

    Router::new()
        // WebSocket
        .route("/ws", get(ws::ws_upgrade))
        // HTTP API
        .route("/api/v1/health", get(http::http_health))
        .route("/api/v1/schema", get(http::http_get_schema))
        .route("/api/v1/forms", post(http::http_open_form))
        .route("/api/v1/forms/:id", get(http::http_get_form).delete(http::http_discard_form))
        .route("/api/v1/forms/:id/field", post(http::http_set_field))
        .route("/api/v1/forms/:id/next", post(http::http_next))
        .route("/api/v1/forms/:id/previous", post(http::http_previous))
        .route("/api/v1/forms/:id/courses", post(http::http_append_course))
        .route(
            "/api/v1/forms/:id/courses/:index",
            post(http::http_set_course_field).delete(http::http_remove_course),
        )
        .route("/api/v1/forms/:id/submit", post(http::http_submit))
        // State + CORS + HTTP tracing
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        // Frontend fallback
        .fallback_service(static_service)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::build_router;
    use crate::config::SessionConfig;
    use crate::record::CourseField;
    use crate::schema::{FieldKind, FormSchema};
    use crate::state::AppState;
    use crate::submission::testing::RecordingSink;
    use crate::wizard::WizardOptions;

    fn app_state(sink: Arc<RecordingSink>) -> Arc<AppState> {
        Arc::new(AppState::with_parts(FormSchema::default(), WizardOptions::default(), sink))
    }

    async fn call(state: &Arc<AppState>, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let req = Request::builder().method(method).uri(uri);
        let req = match body {
            Some(b) => req
                .header("content-type", "application/json")
                .body(Body::from(b.to_string())),
            None => req.body(Body::empty()),
        }
        .expect("request");
        let res = build_router(state.clone()).oneshot(req).await.expect("response");
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.expect("body");
        let json = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).expect("json") };
        (status, json)
    }

    async fn open(state: &Arc<AppState>) -> String {
        let (status, view) = call(state, Method::POST, "/api/v1/forms", None).await;
        assert_eq!(status, StatusCode::CREATED);
        view["id"].as_str().expect("id").to_string()
    }

    #[tokio::test]
    async fn health_reports_open_sessions() {
        let state = app_state(Arc::default());
        open(&state).await;
        let (status, body) = call(&state, Method::GET, "/api/v1/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "ok": true, "sessions": 1 }));
    }

    #[tokio::test]
    async fn schema_lists_steps_and_course_fields() {
        let state = app_state(Arc::default());
        let (status, body) = call(&state, Method::GET, "/api/v1/schema", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["version"], "v3");
        assert_eq!(body["steps"].as_array().map(Vec::len), Some(8));
        assert_eq!(body["steps"][2]["repeated"]["name"], "courses");
        assert_eq!(body["steps"][2]["repeated"]["fields"].as_array().map(Vec::len), Some(8));
        assert_eq!(body["steps"][0]["fields"][0]["message"], "Full Name must be at least 2 characters.");
    }

    #[tokio::test]
    async fn first_view_shows_student_step() {
        let state = app_state(Arc::default());
        let (_, view) = call(&state, Method::POST, "/api/v1/forms", None).await;
        assert_eq!(view["stepIndex"], 0);
        assert_eq!(view["stepCount"], 8);
        assert_eq!(view["title"], "Student Information");
        assert_eq!(view["isFirstStep"], true);
        assert_eq!(view["fields"][0]["name"], "fullName");
        assert_eq!(view["fields"][0]["placeholder"], "Enter Full Name");
        assert!(view.get("courses").is_none());
    }

    #[tokio::test]
    async fn quota_none_hides_document_link() {
        let state = app_state(Arc::default());
        let id = open(&state).await;
        let uri = format!("/api/v1/forms/{id}/field");
        let (status, view) = call(&state, Method::POST, &uri, Some(json!({"name": "quota", "value": "None"}))).await;
        assert_eq!(status, StatusCode::OK);
        let names: Vec<&str> = view["fields"].as_array().expect("fields").iter().filter_map(|f| f["name"].as_str()).collect();
        assert!(names.contains(&"quota"));
        assert!(!names.contains(&"documentLink"));
    }

    #[tokio::test]
    async fn unknown_session_and_bad_input() {
        let state = app_state(Arc::default());
        let (status, _) = call(&state, Method::POST, "/api/v1/forms/nope/next", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let id = open(&state).await;
        let uri = format!("/api/v1/forms/{id}/field");
        let (status, body) = call(&state, Method::POST, &uri, Some(json!({"name": "nickname", "value": "x"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "unknown field 'nickname'");

        let (status, _) = call(&state, Method::POST, &format!("/api/v1/forms/{id}/submit"), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn course_step_lists_courses() {
        let state = app_state(Arc::default());
        let id = open(&state).await;
        call(&state, Method::POST, &format!("/api/v1/forms/{id}/next"), None).await;
        let (_, view) = call(&state, Method::POST, &format!("/api/v1/forms/{id}/next"), None).await;
        assert_eq!(view["title"], "Course Details");
        assert_eq!(view["fields"].as_array().map(Vec::len), Some(0));
        assert_eq!(view["courses"].as_array().map(Vec::len), Some(1));

        let (_, view) = call(&state, Method::POST, &format!("/api/v1/forms/{id}/courses"), None).await;
        assert_eq!(view["courses"].as_array().map(Vec::len), Some(2));

        let uri = format!("/api/v1/forms/{id}/courses/1");
        let (status, view) = call(&state, Method::POST, &uri, Some(json!({"field": "courseName", "value": "Physics"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["courses"][1]["fields"][0]["value"], "Physics");

        let (_, view) = call(&state, Method::DELETE, &format!("/api/v1/forms/{id}/courses/0"), None).await;
        assert_eq!(view["courses"].as_array().map(Vec::len), Some(1));
        assert_eq!(view["courses"][0]["fields"][0]["value"], "Physics");
    }

    #[tokio::test]
    async fn full_submission_round() {
        let sink = Arc::new(RecordingSink::default());
        let state = app_state(sink.clone());
        let id = open(&state).await;
        let field_uri = format!("/api/v1/forms/{id}/field");

        for _ in 0..7 {
            call(&state, Method::POST, &format!("/api/v1/forms/{id}/next"), None).await;
        }
        let (status, body) = call(&state, Method::POST, &format!("/api/v1/forms/{id}/submit"), None).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["stepIndex"], 7);
        assert_eq!(body["errors"]["fullName"], "Full Name must be at least 2 characters.");
        assert_eq!(body["errors"]["courses[0].courseName"], "Course Name is required.");

        let schema = FormSchema::default();
        for def in schema.fields() {
            let value = match def.kind {
                FieldKind::Courses => continue,
                FieldKind::FileReference => json!({"fileName": format!("{}.png", def.name)}),
                FieldKind::Url => json!("https://example.org/quota.pdf"),
                FieldKind::Enum => json!(def.options[1]),
                _ => json!("Filled in"),
            };
            let (status, _) = call(&state, Method::POST, &field_uri, Some(json!({"name": def.name, "value": value}))).await;
            assert_eq!(status, StatusCode::OK, "{}", def.name);
        }
        for field in CourseField::ALL {
            let uri = format!("/api/v1/forms/{id}/courses/0");
            call(&state, Method::POST, &uri, Some(json!({"field": field.name(), "value": "90"}))).await;
        }

        let (status, body) = call(&state, Method::POST, &format!("/api/v1/forms/{id}/submit"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);
        assert_eq!(body["payload"]["courses[0].obtainedMark"], "90");
        assert_eq!(body["payload"]["documentLink"], "https://example.org/quota.pdf");

        let delivered = sink.delivered.lock().map(|d| d.len()).unwrap_or(0);
        assert_eq!(delivered, 1);
        let (status, _) = call(&state, Method::GET, &format!("/api/v1/forms/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn full_store_answers_service_unavailable() {
        let state = Arc::new(
            AppState::with_parts(FormSchema::default(), WizardOptions::default(), Arc::new(RecordingSink::default()))
                .with_limits(SessionConfig { idle_secs: 3600, max_sessions: 1 }),
        );
        open(&state).await;
        let (status, body) = call(&state, Method::POST, "/api/v1/forms", None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"], "too many open form sessions (limit 1)");
    }

    #[tokio::test]
    async fn discard_closes_session() {
        let state = app_state(Arc::default());
        let id = open(&state).await;
        let (status, _) = call(&state, Method::DELETE, &format!("/api/v1/forms/{id}"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(state.session_count().await, 0);
    }
}
