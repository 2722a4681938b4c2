//! Main HTTP server: shared state, router, and listener.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing::{info, instrument, warn};

use groundwater_accounts::{AccountService, PaymentVerifier, RazorpayVerifier, StubVerifier};
use groundwater_analysis::{AnalyzerSettings, SurveyAnalyzer};
use groundwater_config::GroundwaterConfig;
use groundwater_core::LlmProvider;
use groundwater_providers::OpenRouterProvider;

use crate::{access, analyze, auth, health_api};

/// Room for multipart boundaries and the text fields next to the file.
pub const MULTIPART_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Facts about this process reported by `/api/health`.
#[derive(Debug, Clone)]
pub struct ServerInfo {
    pub environment: String,
    pub model: String,
    pub api_key_configured: bool,
    pub max_upload_bytes: usize,
    pub started_at: Instant,
}

/// Application state shared across routes.
#[derive(Clone)]
pub struct GatewayState {
    pub analyzer: Arc<SurveyAnalyzer>,
    pub accounts: Arc<AccountService>,
    pub info: Arc<ServerInfo>,
}

impl GatewayState {
    pub fn new(analyzer: SurveyAnalyzer, accounts: AccountService, info: ServerInfo) -> Self {
        Self {
            analyzer: Arc::new(analyzer),
            accounts: Arc::new(accounts),
            info: Arc::new(info),
        }
    }

    /// Wire the OpenRouter provider, the analyzer, and in-memory accounts from config.
    pub fn from_config(config: &GroundwaterConfig) -> Self {
        let provider = OpenRouterProvider::new(config.provider.api_key.clone())
            .with_base_url(&config.provider.base_url)
            .with_timeout(Duration::from_secs(config.provider.timeout_secs))
            .with_app_title("Groundwater Survey Analyzer");
        let api_key_configured = provider.has_credential();
        if !api_key_configured {
            warn!("OPENROUTER_API_KEY is not set; analysis requests will fail");
        }
        let provider: Arc<dyn LlmProvider> = Arc::new(provider);

        let verifier: Arc<dyn PaymentVerifier> = match &config.payments.razorpay_key_secret {
            Some(secret) => Arc::new(RazorpayVerifier::new(secret.clone())),
            None => {
                warn!("RAZORPAY_KEY_SECRET is not set; payments are approved without verification");
                Arc::new(StubVerifier)
            }
        };

        let analyzer = SurveyAnalyzer::new(
            provider,
            AnalyzerSettings {
                model: config.provider.model.clone(),
                max_tokens: config.provider.max_tokens,
                temperature: config.provider.temperature,
            },
        );

        Self::new(
            analyzer,
            AccountService::in_memory(verifier),
            ServerInfo {
                environment: config.server.environment.clone(),
                model: config.provider.model.clone(),
                api_key_configured,
                max_upload_bytes: config.server.max_upload_bytes(),
                started_at: Instant::now(),
            },
        )
    }
}

/// Build the router. Bodies beyond the upload limit plus multipart overhead
/// are refused with 413 before any handler runs.
pub fn build_router(state: GatewayState) -> Router {
    let body_limit = state.info.max_upload_bytes.saturating_add(MULTIPART_OVERHEAD_BYTES);

    Router::new()
        .route("/api/analyze-survey", post(analyze::analyze_survey))
        .route("/api/register", post(auth::register))
        .route("/api/login", post(auth::login))
        .route("/api/check-access/:user_id", get(access::check_access))
        .route("/api/verify-payment", post(access::verify_payment))
        .route("/api/health", get(health_api::get_health))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Starts the HTTP server and serves until Ctrl-C.
#[instrument(skip(state))]
pub async fn start_server(addr: &str, state: GatewayState) -> Result<()> {
    let app = build_router(state);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Groundwater API listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode, header},
    };
    use async_trait::async_trait;
    use groundwater_core::{LlmRequest, LlmResponse, ProviderError, SubscriptionStatus};
    use groundwater_providers::MockProvider;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    const BOUNDARY: &str = "----groundwater-test-boundary";
    const UPLOAD_LIMIT: usize = 1024;

    fn state_with(provider: Arc<dyn LlmProvider>) -> GatewayState {
        GatewayState::new(
            SurveyAnalyzer::new(
                provider,
                AnalyzerSettings {
                    model: "openai/gpt-4o-mini".into(),
                    max_tokens: 256,
                    temperature: 0.2,
                },
            ),
            AccountService::default(),
            ServerInfo {
                environment: "test".into(),
                model: "openai/gpt-4o-mini".into(),
                api_key_configured: true,
                max_upload_bytes: UPLOAD_LIMIT,
                started_at: Instant::now(),
            },
        )
    }

    /// Multipart body with one file part plus optional text parts.
    fn multipart(file: Option<(&str, &str, &[u8])>, fields: &[(&str, &str)]) -> Vec<u8> {
        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        if let Some((file_name, mime, data)) = file {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"surveyFile\"; filename=\"{file_name}\"\r\nContent-Type: {mime}\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn upload_request(body: Vec<u8>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/analyze-survey")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .header(header::CONTENT_LENGTH, body.len())
            .body(Body::from(body))
            .unwrap()
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let resp = app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    async fn register(app: &Router, email: &str) -> String {
        let (status, body) = send(
            app,
            json_request("POST", "/api/register", json!({"email": email, "password": "pw", "name": "Asha"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        body["user"]["id"].as_str().unwrap().to_string()
    }

    /// Holds every completion open long enough for requests to overlap.
    struct SlowProvider {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LlmProvider for SlowProvider {
        fn name(&self) -> &str {
            "slow"
        }

        async fn complete(&self, req: &LlmRequest) -> Result<LlmResponse, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok(LlmResponse {
                content: "{\"percentageChance\": 55}".into(),
                provider: "slow".into(),
                model: req.model.clone(),
                tokens_used: 0,
                latency_ms: 200,
            })
        }
    }

    async fn analysis_count(app: &Router, user_id: &str) -> u64 {
        let req = Request::builder()
            .uri(format!("/api/check-access/{user_id}"))
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(app, req).await;
        assert_eq!(status, StatusCode::OK);
        body["access"]["analysis_count"].as_u64().unwrap()
    }

    #[tokio::test]
    async fn test_image_analysis_returns_model_json() {
        let provider = Arc::new(MockProvider::new("mock").with_response(
            "Here is the analysis:\n{\"customerName\": \"R. Kumar\", \"percentageChance\": 78}\nThanks",
        ));
        let app = build_router(state_with(provider.clone()));

        let (status, body) = send(
            &app,
            upload_request(multipart(Some(("ves.png", "image/png", &b"\x89PNG data"[..])), &[])),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["surveyAnalysis"], json!({"customerName": "R. Kumar", "percentageChance": 78}));
        assert_eq!(body["fileName"], "ves.png");
        assert_eq!(body["fileType"], "image/png");
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn test_unsupported_type_makes_no_provider_call() {
        let provider = Arc::new(MockProvider::new("mock"));
        let app = build_router(state_with(provider.clone()));

        let (status, body) = send(
            &app,
            upload_request(multipart(Some(("notes.txt", "text/plain", &b"hello"[..])), &[])),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("text/plain"));
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_file_is_bad_request() {
        let provider = Arc::new(MockProvider::new("mock"));
        let app = build_router(state_with(provider.clone()));

        let (status, body) = send(&app, upload_request(multipart(None, &[("user_id", "x")]))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No file uploaded");
    }

    #[tokio::test]
    async fn test_file_over_limit_is_rejected() {
        let provider = Arc::new(MockProvider::new("mock"));
        let app = build_router(state_with(provider.clone()));

        let data = vec![0u8; UPLOAD_LIMIT + 1];
        let (status, _) = send(
            &app,
            upload_request(multipart(Some(("big.png", "image/png", data.as_slice())), &[])),
        )
        .await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);

        let huge = vec![0u8; UPLOAD_LIMIT + MULTIPART_OVERHEAD_BYTES + 1];
        let (status, _) = send(
            &app,
            upload_request(multipart(Some(("huge.png", "image/png", huge.as_slice())), &[])),
        )
        .await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_unparsable_reply_returns_raw_text() {
        let provider = Arc::new(MockProvider::new("mock").with_response("The image is too blurry to read."));
        let app = build_router(state_with(provider));

        let (status, body) = send(
            &app,
            upload_request(multipart(Some(("a.jpg", "image/jpeg", &b"jpeg"[..])), &[])),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["rawResponse"], "The image is too blurry to read.");
    }

    #[tokio::test]
    async fn test_missing_api_key_is_server_error() {
        let provider: Arc<dyn LlmProvider> = Arc::new(OpenRouterProvider::new(None));
        let app = build_router(state_with(provider));

        let (status, body) = send(
            &app,
            upload_request(multipart(Some(("a.jpg", "image/jpeg", &b"jpeg"[..])), &[])),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "OpenRouter API key not configured");
    }

    #[tokio::test]
    async fn test_upstream_status_is_reported() {
        let provider = Arc::new(MockProvider::new("mock").with_status(429, "rate limited"));
        let app = build_router(state_with(provider));

        let (status, body) = send(
            &app,
            upload_request(multipart(Some(("a.jpg", "image/jpeg", &b"jpeg"[..])), &[])),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["status"], 429);
        assert_eq!(body["details"], "rate limited");
    }

    #[tokio::test]
    async fn test_quota_enforced_for_known_user() {
        let provider = Arc::new(MockProvider::new("mock").with_response("{}"));
        let app = build_router(state_with(provider.clone()));
        let user_id = register(&app, "farmer@example.com").await;

        let file = Some(("a.jpg", "image/jpeg", &b"jpeg"[..]));
        let (status, _) = send(&app, upload_request(multipart(file, &[("user_id", user_id.as_str())]))).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(&app, upload_request(multipart(file, &[("user_id", user_id.as_str())]))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["access"]["analysis_count"], 1);
        assert_eq!(body["access"]["has_access"], false);
        assert_eq!(provider.call_count(), 1);

        // Anonymous requests are not metered.
        let (status, _) = send(&app, upload_request(multipart(file, &[]))).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unknown_user_on_analyze_is_not_found() {
        let provider = Arc::new(MockProvider::new("mock").with_response("{}"));
        let app = build_router(state_with(provider.clone()));

        let (status, _) = send(
            &app,
            upload_request(multipart(Some(("a.jpg", "image/jpeg", &b"jpeg"[..])), &[("user_id", "ghost")])),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_registration_fails() {
        let app = build_router(state_with(Arc::new(MockProvider::new("mock"))));
        register(&app, "dup@example.com").await;

        let (status, body) = send(
            &app,
            json_request("POST", "/api/register", json!({"email": "dup@example.com", "password": "x"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "User already exists");
    }

    #[tokio::test]
    async fn test_login_round_trip() {
        let app = build_router(state_with(Arc::new(MockProvider::new("mock"))));
        let user_id = register(&app, "login@example.com").await;

        let (status, body) = send(
            &app,
            json_request("POST", "/api/login", json!({"email": "login@example.com", "password": "pw"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["id"], user_id.as_str());
        assert!(body["user"].get("password").is_none());

        let (status, _) = send(
            &app,
            json_request("POST", "/api/login", json!({"email": "login@example.com", "password": "bad"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_verify_payment_activates_on_next_check() {
        let app = build_router(state_with(Arc::new(MockProvider::new("mock"))));
        let user_id = register(&app, "payer@example.com").await;

        let (status, body) = send(
            &app,
            json_request(
                "POST",
                "/api/verify-payment",
                json!({"user_id": user_id, "payment_id": "pay_1", "order_id": "order_1", "signature": "sig"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);

        let req = Request::builder()
            .uri(format!("/api/check-access/{user_id}"))
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["access"]["subscription_status"],
            serde_json::to_value(SubscriptionStatus::Active).unwrap()
        );
    }

    #[tokio::test]
    async fn test_check_access_unknown_user() {
        let app = build_router(state_with(Arc::new(MockProvider::new("mock"))));
        let req = Request::builder()
            .uri("/api/check-access/ghost")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_concurrent_uploads_share_one_daily_slot() {
        let provider = Arc::new(SlowProvider {
            calls: AtomicUsize::new(0),
        });
        let app = build_router(state_with(provider.clone()));
        let user_id = register(&app, "busy@example.com").await;

        let mut handles = Vec::new();
        for _ in 0..5 {
            let app = app.clone();
            let body = multipart(
                Some(("a.jpg", "image/jpeg", &b"jpeg"[..])),
                &[("user_id", user_id.as_str())],
            );
            handles.push(tokio::spawn(async move { send(&app, upload_request(body)).await.0 }));
        }
        let mut statuses = Vec::new();
        for handle in handles {
            statuses.push(handle.await.unwrap());
        }

        let ok = statuses.iter().filter(|s| **s == StatusCode::OK).count();
        let forbidden = statuses.iter().filter(|s| **s == StatusCode::FORBIDDEN).count();
        assert_eq!(ok, 1);
        assert_eq!(forbidden, 4);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
        assert_eq!(analysis_count(&app, &user_id).await, 1);
    }

    #[tokio::test]
    async fn test_failed_analysis_gives_the_slot_back() {
        let provider = Arc::new(MockProvider::new("mock").with_status(502, "bad gateway"));
        let app = build_router(state_with(provider.clone()));
        let user_id = register(&app, "unlucky@example.com").await;

        let file = Some(("a.jpg", "image/jpeg", &b"jpeg"[..]));
        for _ in 0..2 {
            let (status, body) =
                send(&app, upload_request(multipart(file, &[("user_id", user_id.as_str())]))).await;
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(body["status"], 502);
        }
        assert_eq!(provider.call_count(), 2);
        assert_eq!(analysis_count(&app, &user_id).await, 0);
    }

    #[tokio::test]
    async fn test_pdf_upload_forwards_extracted_text_only() {
        let provider = Arc::new(MockProvider::new("mock").with_response("{\"rockType\": \"Granite\"}"));
        let app = build_router(state_with(provider.clone()));

        let reference = "VES-3 apparent resistivity 38 ohm-m at AB/2 = 80 m, weathered granite";
        let (status, body) = send(
            &app,
            upload_request(multipart(
                Some(("report.pdf", "application/pdf", &b"%PDF-1.7"[..])),
                &[("extractedText", reference)],
            )),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["fileType"], "application/pdf");
        assert_eq!(body["surveyAnalysis"]["rockType"], "Granite");

        let sent = provider.last_request().unwrap();
        assert!(sent.images.is_empty());
        assert!(sent.user_prompt.contains(reference));
        assert!(sent.user_prompt.contains("report.pdf"));
    }

    #[tokio::test]
    async fn test_empty_model_reply_reports_details() {
        let provider = Arc::new(MockProvider::new("mock").with_empty_reply());
        let app = build_router(state_with(provider.clone()));

        let (status, body) = send(
            &app,
            upload_request(multipart(Some(("a.png", "image/png", &b"png"[..])), &[])),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "AI provider request failed");
        assert!(body["details"].as_str().unwrap().contains("no content"));
        assert!(body.get("status").is_none());
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn test_malformed_json_uses_message_body() {
        let app = build_router(state_with(Arc::new(MockProvider::new("mock"))));

        for uri in ["/api/register", "/api/login", "/api/verify-payment"] {
            let req = Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{\"email\": "))
                .unwrap();
            let (status, body) = send(&app, req).await;
            assert!(status.is_client_error(), "{uri} answered {status}");
            assert_eq!(body["success"], false, "{uri}");
            assert!(body["message"].as_str().unwrap().starts_with("Invalid request body"));
        }

        let req = Request::builder()
            .method("POST")
            .uri("/api/register")
            .body(Body::from("email=a@b.c"))
            .unwrap();
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_health_reports_configuration() {
        let app = build_router(state_with(Arc::new(MockProvider::new("mock"))));
        let req = Request::builder().uri("/api/health").body(Body::empty()).unwrap();
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["environment"], "test");
        assert_eq!(body["apiKeyConfigured"], true);
        assert!(body["uptimeSeconds"].is_u64());
    }
}
