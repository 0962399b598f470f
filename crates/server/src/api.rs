use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use productai_agent::AgentRuntime;
use productai_core::errors::{ApplicationError, InterfaceError};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{error, info_span, warn, Instrument};
use uuid::Uuid;

use crate::health;

#[derive(Clone)]
pub struct ApiState {
    runtime: Arc<AgentRuntime>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

pub fn app(runtime: Arc<AgentRuntime>) -> Router {
    Router::new()
        .route("/chat", post(chat))
        .route("/tools/{name}", post(call_tool))
        .merge(health::router())
        .with_state(ApiState { runtime })
}

async fn chat(State(state): State<ApiState>, body: Bytes) -> Response {
    let correlation_id = Uuid::new_v4().to_string();
    let span = info_span!("chat", correlation_id = %correlation_id);

    async move {
        let payload = match parse_object(&body) {
            Ok(payload) => payload,
            Err(error) => return error_response(error, &correlation_id),
        };
        let message = payload.get("message").and_then(Value::as_str).unwrap_or_default();

        match state.runtime.router().route(message).await {
            Ok(envelope) => (StatusCode::OK, Json(envelope)).into_response(),
            Err(error) => error_response(error.into(), &correlation_id),
        }
    }
    .instrument(span)
    .await
}

async fn call_tool(
    State(state): State<ApiState>,
    Path(name): Path<String>,
    body: Bytes,
) -> Response {
    let correlation_id = Uuid::new_v4().to_string();
    let span = info_span!("tool", correlation_id = %correlation_id, tool = %name);

    async move {
        let Some(tool) = state.runtime.tools().get(&name) else {
            warn!(event_name = "api.tool.unknown", tool = %name, "unknown tool requested");
            return (StatusCode::NOT_FOUND, Json(ErrorBody { error: format!("Unknown tool '{name}'.") }))
                .into_response();
        };

        let payload = match parse_object(&body) {
            Ok(payload) => payload,
            Err(error) => return error_response(error, &correlation_id),
        };

        match tool.execute(payload).await {
            Ok(output) => (StatusCode::OK, Json(output)).into_response(),
            Err(error) => error_response(error.into_application(tool.name()), &correlation_id),
        }
    }
    .instrument(span)
    .await
}

/// An empty body reads as `{}` so a bare POST reports the missing field.
fn parse_object(body: &Bytes) -> Result<Value, ApplicationError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Map::new()));
    }
    match serde_json::from_slice::<Value>(body) {
        Ok(value @ Value::Object(_)) => Ok(value),
        _ => Err(ApplicationError::InvalidArgument(
            "Request body must be a JSON object.".to_string(),
        )),
    }
}

fn error_response(error: ApplicationError, correlation_id: &str) -> Response {
    let detail = error.to_string();
    let interface = error.into_interface(correlation_id);
    let status = status_for(&interface);

    if status.is_server_error() {
        error!(
            event_name = "api.request.failed",
            correlation_id,
            status = status.as_u16(),
            error = %detail,
            "request failed"
        );
    } else {
        warn!(
            event_name = "api.request.rejected",
            correlation_id,
            status = status.as_u16(),
            error = %detail,
            "request rejected"
        );
    }

    (status, Json(ErrorBody { error: interface.user_message() })).into_response()
}

fn status_for(error: &InterfaceError) -> StatusCode {
    match error {
        InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
        InterfaceError::UpstreamUnavailable { .. } => StatusCode::BAD_GATEWAY,
        InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
        Router,
    };
    use productai_agent::{
        AgentRuntime, AnswerEngine, IntentClassifier, LlmError, ReviewAnalyzer, ToolError,
    };
    use productai_core::{ChatTurn, FaqAnswer, ReviewAnalysis};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::app;

    struct ScriptedClassifier {
        reply: Result<&'static str, u16>,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl IntentClassifier for ScriptedClassifier {
        async fn classify(&self, _message: &str) -> Result<String, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reply.map(str::to_string).map_err(|status| LlmError::Status {
                endpoint: "chat completions",
                status,
                body: "secret upstream detail".to_string(),
            })
        }
    }

    struct FixedAnswers;

    #[async_trait]
    impl AnswerEngine for FixedAnswers {
        async fn answer(&self, question: &str, _history: &[ChatTurn]) -> Result<FaqAnswer, ToolError> {
            Ok(FaqAnswer {
                answer: format!("Answer for: {question}"),
                sources: vec!["Refunds are issued within 5 days.".to_string()],
            })
        }
    }

    struct EchoReviews;

    #[async_trait]
    impl ReviewAnalyzer for EchoReviews {
        async fn analyze(
            &self,
            product_name: &str,
            reviews: &[String],
            limit: usize,
        ) -> Result<ReviewAnalysis, ToolError> {
            if product_name.trim().is_empty() {
                return Err(ToolError::InvalidArgument("Product name is required.".to_string()));
            }
            Ok(ReviewAnalysis {
                product: product_name.to_string(),
                analysis: format!("{} of {} reviews considered", reviews.len().min(limit), reviews.len()),
            })
        }
    }

    fn test_app(reply: Result<&'static str, u16>) -> (Router, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let runtime = AgentRuntime::with_collaborators(
            Arc::new(ScriptedClassifier { reply, calls: calls.clone() }),
            Arc::new(FixedAnswers),
            Arc::new(EchoReviews),
        );
        (app(Arc::new(runtime)), calls)
    }

    async fn post(app: Router, uri: &str, body: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .expect("request");
        let response = app.oneshot(request).await.expect("response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        (status, serde_json::from_slice(&bytes).expect("json body"))
    }

    const FAQ_DECISION: &str =
        r#"{"intent":"faq","tool_to_use":"faq","reason":"refunds","next_action":"call faq"}"#;

    #[tokio::test]
    async fn chat_returns_the_routed_envelope() {
        let (app, _) = test_app(Ok(FAQ_DECISION));

        let (status, body) = post(app, "/chat", r#"{"message":"How do refunds work?"}"#).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["source"], "faq");
        assert_eq!(body["intent"]["reason"], "refunds");
        assert_eq!(body["response"]["answer"], "Answer for: How do refunds work?");
    }

    #[tokio::test]
    async fn chat_without_message_is_a_bad_request_and_skips_the_classifier() {
        let (app, calls) = test_app(Ok(FAQ_DECISION));

        let (status, body) = post(app, "/chat", "{}").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "Missing 'message' field."}));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn chat_with_invalid_classifier_output_falls_back() {
        let (app, _) = test_app(Ok("not json"));

        let (status, body) = post(app, "/chat", r#"{"message":"hi"}"#).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["source"], "fallback");
        assert_eq!(body["intent"]["reason"], "Invalid LLM response");
    }

    #[tokio::test]
    async fn classifier_outage_is_a_bad_gateway_without_internal_detail() {
        let (app, _) = test_app(Err(503));

        let (status, body) = post(app, "/chat", r#"{"message":"Where is my order?"}"#).await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        let message = body["error"].as_str().expect("error message");
        assert!(!message.contains("secret upstream detail"));
    }

    #[tokio::test]
    async fn malformed_body_is_a_bad_request() {
        let (app, _) = test_app(Ok(FAQ_DECISION));

        let (status, body) = post(app, "/chat", "[1, 2").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "Request body must be a JSON object."}));
    }

    #[tokio::test]
    async fn faq_tool_answers_directly() {
        let (app, calls) = test_app(Ok(FAQ_DECISION));

        let (status, body) = post(app, "/tools/faq", r#"{"query":"refunds?"}"#).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["answer"], "Answer for: refunds?");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn reviews_tool_requires_product_name() {
        let (app, _) = test_app(Ok(FAQ_DECISION));

        let (status, body) = post(app, "/tools/reviews", r#"{"reviews":["great"]}"#).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "Missing 'product_name' field."}));
    }

    #[tokio::test]
    async fn reviews_tool_accepts_supplied_reviews() {
        let (app, _) = test_app(Ok(FAQ_DECISION));
        let reviews: Vec<String> = (1..=8).map(|n| format!("review {n}")).collect();
        let body = json!({"product_name": "Kettle", "reviews": reviews}).to_string();

        let (status, body) = post(app, "/tools/reviews", &body).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"product": "Kettle", "analysis": "5 of 8 reviews considered"}));
    }

    #[tokio::test]
    async fn unknown_tool_is_not_found() {
        let (app, _) = test_app(Ok(FAQ_DECISION));

        let (status, body) = post(app, "/tools/weather", "{}").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({"error": "Unknown tool 'weather'."}));
    }

    #[tokio::test]
    async fn health_is_served_by_the_same_app() {
        let (app, _) = test_app(Ok(FAQ_DECISION));
        let request = Request::builder().uri("/health").body(Body::empty()).expect("request");

        let response = app.oneshot(request).await.expect("response");
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let body: Value = serde_json::from_slice(&bytes).expect("json");

        assert_eq!(body, json!({"status": "ok", "message": "ProductAI service is running"}));
    }
}
