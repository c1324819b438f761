//! Axum HTTP server for the chat wallet API.
//!
//! Handles chat, image generation and hosting, wallet-side execution echoes,
//! session inspection and health.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path, State, rejection::JsonRejection},
    http::{HeaderValue, Method, StatusCode, header},
    routing::{get, post},
};
use base64::Engine;
use tokio::sync::{RwLock, oneshot};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::agent::{
    ChatTurnRequest, GraphDispatcher, IntentClassifier, Mode, ResponseValidator, SessionKey,
    SessionStore,
};
use crate::channels::web::types::*;
use crate::config::Config;
use crate::contract::{ContractDeployment, MINT_FUNCTION};
use crate::error::{ChannelError, ConfigError, ImageError, ValidationError};
use crate::llm::LlmProvider;
use crate::media::{ImageGenerator, ImageHost, enhance_prompt};

/// Largest accepted file for `/api/upload/image`.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Models offered to clients besides the configured default.
const BUILTIN_MODELS: &[(&str, &str)] = &[
    ("google/gemini-2.0-flash-exp:free", "Google Gemini 2.0 Flash"),
    ("x-ai/grok-4-fast:free", "xAI Grok 4 Fast"),
];

/// Shared state for all handlers.
pub struct AppState {
    pub dispatcher: GraphDispatcher,
    pub images: Arc<dyn ImageGenerator>,
    pub image_host: Arc<dyn ImageHost>,
    pub validator: ResponseValidator,
    pub models: Vec<ModelInfo>,
    pub contract_config_path: PathBuf,
    pub cors_allowed_origins: Vec<String>,
    /// Shutdown signal sender.
    pub shutdown_tx: RwLock<Option<oneshot::Sender<()>>>,
}

impl AppState {
    /// Wire the dispatcher and handlers from resolved config and the
    /// external collaborators.
    pub fn new(
        config: &Config,
        llm: Arc<dyn LlmProvider>,
        images: Arc<dyn ImageGenerator>,
        image_host: Arc<dyn ImageHost>,
    ) -> Result<Self, ConfigError> {
        let routing = &config.routing;
        let validator = ResponseValidator::new(routing.address_min_length, routing.network.clone());
        let classifier = IntentClassifier::from_config(routing)?;
        let models = model_catalogue(llm.default_model());

        let dispatcher = GraphDispatcher::new(
            llm,
            Arc::clone(&images),
            Arc::new(SessionStore::new()),
            classifier,
            validator.clone(),
        )
        .with_history_window(routing.history_window)
        .with_image_timeout(config.media.image_timeout);

        Ok(Self {
            dispatcher,
            images,
            image_host,
            validator,
            models,
            contract_config_path: config.http.contract_config_path.clone(),
            cors_allowed_origins: config.http.cors_allowed_origins.clone(),
            shutdown_tx: RwLock::new(None),
        })
    }
}

fn model_catalogue(default_model: &str) -> Vec<ModelInfo> {
    let mut models = Vec::with_capacity(BUILTIN_MODELS.len() + 1);
    if !BUILTIN_MODELS.iter().any(|(id, _)| *id == default_model) {
        models.push(ModelInfo {
            id: default_model.to_string(),
            name: default_model.to_string(),
        });
    }
    models.extend(BUILTIN_MODELS.iter().map(|(id, name)| ModelInfo {
        id: id.to_string(),
        name: name.to_string(),
    }));
    models
}

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.cors_allowed_origins);

    Router::new()
        .route("/health", get(health_handler))
        .route("/api/chat", post(chat_handler))
        .route("/api/models", get(models_handler))
        .route("/api/generate-image", post(generate_image_handler))
        .route("/api/upload-image", post(upload_image_handler))
        .route("/api/upload/image", post(upload_file_handler))
        .route("/api/transfer/execute", post(transfer_execute_handler))
        .route("/api/nft/mint", post(nft_mint_handler))
        .route(
            "/api/session/{wallet}/{mode}",
            get(session_get_handler).delete(session_delete_handler),
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        // Multipart uploads up to MAX_UPLOAD_BYTES plus form overhead.
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES + 2 * 1024 * 1024))
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("Ignoring invalid CORS origin {}: {}", origin, e);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(parsed)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}

/// Start the HTTP server.
///
/// Returns the actual bound `SocketAddr` (useful when binding to port 0).
pub async fn start_server(
    addr: SocketAddr,
    state: Arc<AppState>,
) -> Result<SocketAddr, ChannelError> {
    let listener =
        tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| ChannelError::StartupFailed {
                name: "http".to_string(),
                reason: format!("Failed to bind to {}: {}", addr, e),
            })?;
    let bound_addr = listener
        .local_addr()
        .map_err(|e| ChannelError::StartupFailed {
            name: "http".to_string(),
            reason: format!("Failed to get local addr: {}", e),
        })?;

    let app = router(Arc::clone(&state));

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    *state.shutdown_tx.write().await = Some(shutdown_tx);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                tracing::info!("HTTP server shutting down");
            })
            .await
        {
            tracing::error!("HTTP server error: {}", e);
        }
    });

    tracing::info!("HTTP server listening on {}", bound_addr);
    Ok(bound_addr)
}

// --- Health & models ---

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "suichat",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

async fn models_handler(State(state): State<Arc<AppState>>) -> Json<ModelsResponse> {
    Json(ModelsResponse {
        success: true,
        data: state.models.clone(),
    })
}

// --- Chat ---

async fn chat_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Json<ChatResponse> {
    let Json(req) = match body {
        Ok(body) => body,
        Err(rejection) => {
            return Json(ChatResponse::failed(format!(
                "Invalid request: {}",
                rejection.body_text()
            )));
        }
    };

    if req.message.trim().is_empty() {
        return Json(ChatResponse::failed("message must not be empty"));
    }

    let mode = match req.mode.as_deref().map(str::trim).filter(|m| !m.is_empty()) {
        None => None,
        Some(raw) => match Mode::parse(raw) {
            Some(mode) => Some(mode),
            None => {
                return Json(ChatResponse::failed(format!(
                    "Unsupported mode '{raw}', expected 'transfer' or 'nft'"
                )));
            }
        },
    };

    let wallet_address = req
        .wallet_address
        .as_deref()
        .map(str::trim)
        .filter(|w| !w.is_empty())
        .unwrap_or("anonymous")
        .to_string();

    let turn = ChatTurnRequest {
        message: req.message,
        model: req.model,
        wallet_address,
        current_balance: req.current_balance,
        mode,
    };

    match state.dispatcher.dispatch(turn).await {
        Ok(envelope) => Json(ChatResponse::ok(envelope)),
        Err(e) => {
            tracing::error!("Chat turn failed: {}", e);
            Json(ChatResponse::failed(e.to_string()))
        }
    }
}

// --- Images ---

async fn generate_image_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Json<ImageGenerationRequest>, JsonRejection>,
) -> Json<ImageGenerationResponse> {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    let Some(text) = req.text() else {
        return Json(ImageGenerationResponse {
            error: Some(format!("Failed to generate image: {}", ImageError::EmptyPrompt)),
            ..ImageGenerationResponse::default()
        });
    };

    let prompt = enhance_prompt(text);
    match state.images.generate(&prompt).await {
        Ok(image) => Json(ImageGenerationResponse {
            success: true,
            image_url: Some(image.data_url()),
            image_base64: Some(image.base64),
            prompt: Some(image.prompt),
            error: None,
        }),
        Err(e) => {
            tracing::warn!("Image generation failed: {}", e);
            Json(ImageGenerationResponse {
                error: Some(format!("Failed to generate image: {e}")),
                ..ImageGenerationResponse::default()
            })
        }
    }
}

async fn upload_image_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Json<UploadImageRequest>, JsonRejection>,
) -> Json<UploadImageResponse> {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    let payload = req.image_base64.unwrap_or_default();

    match state.image_host.upload(&payload).await {
        Ok(hosted) => Json(UploadImageResponse {
            success: true,
            image_url: Some(hosted.url),
            display_url: Some(hosted.display_url),
            error: None,
        }),
        Err(e) => {
            tracing::warn!("Image upload failed: {}", e);
            let error = match &e {
                ImageError::MissingCredential { key, .. } => format!("{key} not configured"),
                ImageError::EmptyPayload
                | ImageError::Rejected { .. }
                | ImageError::HttpStatus { .. } => e.to_string(),
                _ => format!("Failed to upload image: {e}"),
            };
            Json(UploadImageResponse {
                error: Some(error),
                ..UploadImageResponse::default()
            })
        }
    }
}

async fn upload_file_handler(mut multipart: Multipart) -> Json<FileUploadResponse> {
    let failed = |error: String| {
        Json(FileUploadResponse {
            error: Some(error),
            ..FileUploadResponse::default()
        })
    };

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => return failed("No file provided".to_string()),
            Err(e) => return failed(format!("Invalid upload: {e}")),
        };
        if field.name() != Some("file") {
            continue;
        }

        let content_type = field.content_type().unwrap_or_default().to_string();
        if !content_type.starts_with("image/") {
            return failed("File must be an image".to_string());
        }
        let filename = field.file_name().map(str::to_string);
        let data = match field.bytes().await {
            Ok(data) => data,
            Err(e) => return failed(format!("Invalid upload: {e}")),
        };
        if data.len() > MAX_UPLOAD_BYTES {
            return failed("File too large (max 10MB)".to_string());
        }

        let encoded = base64::engine::general_purpose::STANDARD.encode(&data);
        return Json(FileUploadResponse {
            success: true,
            image_url: Some(format!("data:{content_type};base64,{encoded}")),
            filename,
            size: Some(data.len()),
            content_type: Some(content_type),
            error: None,
        });
    }
}

// --- Wallet-side execution echoes ---

async fn transfer_execute_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Json<serde_json::Value>, JsonRejection>,
) -> Json<TransferExecuteResponse> {
    let failed = |error: String| {
        Json(TransferExecuteResponse {
            message: "Transfer validation failed".to_string(),
            error: Some(error),
            ..TransferExecuteResponse::default()
        })
    };

    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return failed(format!("Invalid request: {}", rejection.body_text())),
    };

    let from_address = body
        .get("from_address")
        .and_then(serde_json::Value::as_str)
        .map(str::trim)
        .unwrap_or_default();
    if from_address.is_empty() {
        return failed(ValidationError::MissingField("from_address").to_string());
    }

    match state.validator.extract_transfer(&body, from_address) {
        Ok(intent) => {
            let total = intent.total_amount();
            tracing::info!(
                from = %intent.from_address,
                recipients = intent.recipient_count(),
                total = %total,
                "transfer prepared for wallet signature"
            );
            Json(TransferExecuteResponse {
                success: true,
                requires_wallet_signature: true,
                message: format!(
                    "Transfer of {} {} ready. Please sign the transaction in your wallet.",
                    total.normalize(),
                    intent.token_type
                ),
                transfer_intent: Some(intent),
                total_amount: Some(total),
                error: None,
            })
        }
        Err(e) => failed(e.to_string()),
    }
}

async fn nft_mint_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Json<NftMintRequest>, JsonRejection>,
) -> Json<NftMintResponse> {
    let failed = |error: String| {
        Json(NftMintResponse {
            message: "NFT mint preparation failed".to_string(),
            error: Some(error),
            ..NftMintResponse::default()
        })
    };

    let Json(req) = match body {
        Ok(body) => body,
        Err(rejection) => return failed(format!("Invalid request: {}", rejection.body_text())),
    };
    if req.name.trim().is_empty() {
        return failed(ValidationError::MissingField("name").to_string());
    }
    if req.owner_address.trim().is_empty() {
        return failed(ValidationError::MissingField("owner_address").to_string());
    }

    let deployment = match ContractDeployment::load(&state.contract_config_path) {
        Ok(deployment) => deployment,
        Err(e) => {
            tracing::warn!("Contract config unavailable: {}", e);
            return failed(e.to_string());
        }
    };

    tracing::info!(
        owner = %req.owner_address,
        name = %req.name,
        has_image = !req.image_url.is_empty(),
        attributes = req.attributes.len(),
        package = %deployment.contract_address,
        "nft mint prepared for wallet signature"
    );

    Json(NftMintResponse {
        success: true,
        requires_wallet_signature: true,
        instructions: Some(format!(
            "Call {} with name, description and image_url, then sign the transaction in your wallet.",
            deployment.mint_target()
        )),
        package_id: Some(deployment.contract_address),
        module_name: Some(deployment.module_name),
        function_name: Some(MINT_FUNCTION.to_string()),
        nft_type: Some(deployment.nft_type),
        network: Some(deployment.network),
        message: format!("NFT '{}' ready to mint. Please sign in your wallet.", req.name.trim()),
        error: None,
    })
}

// --- Sessions ---

/// `none` addresses the wallet-only session used when a request names no mode.
fn parse_session_key(wallet: &str, mode: &str) -> Result<SessionKey, (StatusCode, String)> {
    if mode.eq_ignore_ascii_case("none") {
        return Ok(SessionKey::new(wallet, None));
    }
    Mode::parse(mode)
        .map(|m| SessionKey::new(wallet, Some(m)))
        .ok_or_else(|| {
            (
                StatusCode::BAD_REQUEST,
                format!("Unsupported mode '{mode}', expected 'transfer', 'nft' or 'none'"),
            )
        })
}

async fn session_get_handler(
    State(state): State<Arc<AppState>>,
    Path((wallet, mode)): Path<(String, String)>,
) -> Result<Json<SessionResponse>, (StatusCode, String)> {
    let key = parse_session_key(&wallet, &mode)?;
    state
        .dispatcher
        .sessions()
        .snapshot(&key)
        .await
        .map(|snapshot| Json(snapshot.into()))
        .ok_or((StatusCode::NOT_FOUND, format!("Session {key} not found")))
}

async fn session_delete_handler(
    State(state): State<Arc<AppState>>,
    Path((wallet, mode)): Path<(String, String)>,
) -> Result<Json<ActionResponse>, (StatusCode, String)> {
    let key = parse_session_key(&wallet, &mode)?;
    let removed = state.dispatcher.sessions().delete(&key).await;
    Ok(Json(ActionResponse {
        success: removed,
        message: if removed {
            format!("Session {key} deleted")
        } else {
            format!("Session {key} not found")
        },
    }))
}
