//! Single-hop graph dispatch.
//!
//! Each chat turn locks its session, optionally resets it on a topic switch,
//! classifies the message, runs exactly one handler node and records the
//! reply. No node ever hands off to another.

use std::sync::Arc;
use std::time::Duration;

use crate::agent::intent::Envelope;
use crate::agent::prompts;
use crate::agent::router::{IntentClassifier, Mode, Route};
use crate::agent::session::{Phase, Session, SessionKey, SessionStore};
use crate::agent::validator::{ResponseValidator, finalize_nft};
use crate::error::{ConfigError, Error, GatewayError, ImageError};
use crate::llm::{CompletionRequest, LlmProvider};
use crate::media::{GeneratedImage, ImageGenerator, enhance_prompt};

/// One inbound chat message.
#[derive(Debug, Clone, Default)]
pub struct ChatTurnRequest {
    pub message: String,
    pub model: Option<String>,
    pub wallet_address: String,
    pub current_balance: Option<String>,
    pub mode: Option<Mode>,
}

pub struct GraphDispatcher {
    llm: Arc<dyn LlmProvider>,
    images: Arc<dyn ImageGenerator>,
    sessions: Arc<SessionStore>,
    classifier: IntentClassifier,
    validator: ResponseValidator,
    history_window: usize,
    image_timeout: Duration,
}

impl GraphDispatcher {
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        images: Arc<dyn ImageGenerator>,
        sessions: Arc<SessionStore>,
        classifier: IntentClassifier,
        validator: ResponseValidator,
    ) -> Self {
        Self {
            llm,
            images,
            sessions,
            classifier,
            validator,
            history_window: 6,
            image_timeout: Duration::from_secs(120),
        }
    }

    pub fn with_history_window(mut self, turns: usize) -> Self {
        self.history_window = turns;
        self
    }

    pub fn with_image_timeout(mut self, timeout: Duration) -> Self {
        self.image_timeout = timeout;
        self
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    /// Mode a request is served under. Strict routing pins requests that
    /// name no mode to the default mode.
    pub fn effective_mode(&self, requested: Option<Mode>) -> Option<Mode> {
        requested.or_else(|| {
            self.classifier
                .strict_mode_routing()
                .then(|| self.classifier.default_mode())
        })
    }

    pub fn session_key(&self, wallet_address: &str, requested: Option<Mode>) -> SessionKey {
        SessionKey::new(wallet_address, self.effective_mode(requested))
    }

    pub async fn dispatch(&self, request: ChatTurnRequest) -> Result<Envelope, Error> {
        let mode = self.effective_mode(request.mode);
        let key = SessionKey::new(&request.wallet_address, mode);
        let mut session = self.sessions.lock(&key).await;

        session.wallet_address = request.wallet_address.trim().to_string();
        if let Some(balance) = request.current_balance.as_ref() {
            session.current_balance = Some(balance.clone());
        }

        if self.classifier.is_topic_switch(&request.message, session.phase) {
            tracing::info!(
                session_key = %key,
                phase = session.phase.as_str(),
                "topic switch detected, resetting session"
            );
            session.reset_conversation();
        }

        session.push_user(request.message.clone());

        let route = self
            .classifier
            .classify(&request.message, session.phase, mode);
        tracing::info!(
            session_key = %key,
            route = route.node_name(),
            phase = session.phase.as_str(),
            "dispatching chat turn"
        );

        let envelope = match route {
            Route::Transfer => self.transfer_node(&mut session, &request).await?,
            Route::Nft => self.nft_node(&mut session, &request).await?,
            Route::Generic => self.generic_node(&session, &request).await?,
        };

        session.push_assistant(envelope.transcript_text());
        tracing::info!(
            session_key = %key,
            route = route.node_name(),
            phase = session.phase.as_str(),
            envelope = envelope.kind(),
            turns = session.turns.len(),
            "chat turn complete"
        );
        Ok(envelope)
    }

    async fn transfer_node(
        &self,
        session: &mut Session,
        request: &ChatTurnRequest,
    ) -> Result<Envelope, Error> {
        session.phase = Phase::TransferHandler;
        let system = prompts::transfer_prompt(&session.wallet_address, self.validator_network());
        let raw = self.complete(system, request).await?;
        Ok(self
            .validator
            .interpret(Route::Transfer, &raw, &session.wallet_address))
    }

    async fn nft_node(
        &self,
        session: &mut Session,
        request: &ChatTurnRequest,
    ) -> Result<Envelope, Error> {
        let system = prompts::nft_prompt(session.recent_turns(self.history_window));
        let raw = self.complete(system, request).await?;

        // A finished NFT starts a fresh bag, but only once the gateway answered.
        if session.phase == Phase::NftCreationComplete {
            session.nft_info = Default::default();
        }
        session.phase = Phase::NftStart;

        match self
            .validator
            .interpret(Route::Nft, &raw, &session.wallet_address)
        {
            Envelope::NftCollectInfo { message, nft_info } => {
                session.nft_info.merge(nft_info);
                Ok(Envelope::NftCollectInfo {
                    message,
                    nft_info: session.nft_info.clone(),
                })
            }
            Envelope::NftCreationIntent {
                nft_creation_intent,
                message,
            } => {
                let mut info = session.nft_info.clone();
                info.merge(nft_creation_intent);
                let image = self.generate_image(info.image_subject()).await;
                let info = finalize_nft(info, image);
                session.nft_info = info.clone();
                session.phase = Phase::NftCreationComplete;
                Ok(Envelope::NftCreationIntent {
                    nft_creation_intent: info,
                    message,
                })
            }
            other => Ok(other),
        }
    }

    async fn generic_node(
        &self,
        session: &Session,
        request: &ChatTurnRequest,
    ) -> Result<Envelope, Error> {
        let raw = self.complete(prompts::generic_prompt(), request).await?;
        Ok(self
            .validator
            .interpret(Route::Generic, &raw, &session.wallet_address))
    }

    async fn generate_image(&self, subject: Option<&str>) -> Result<GeneratedImage, ImageError> {
        let subject = subject.ok_or(ImageError::EmptyPrompt)?;
        let prompt = enhance_prompt(subject);
        tokio::time::timeout(self.image_timeout, self.images.generate(&prompt))
            .await
            .map_err(|_| ImageError::Timeout {
                service: "image".to_string(),
                timeout: self.image_timeout,
            })?
    }

    async fn complete(&self, system: String, request: &ChatTurnRequest) -> Result<String, Error> {
        let completion = CompletionRequest::new(system, request.message.clone())
            .with_model(request.model.clone());
        self.llm.complete(completion).await.map_err(|e| match e {
            GatewayError::MissingCredential { .. } => Error::Config(ConfigError::MissingRequired {
                key: "OPEN_ROUTER_TOKEN".to_string(),
                hint: "Set it in the environment or ~/.suichat/.env.".to_string(),
            }),
            other => Error::Gateway(other),
        })
    }

    fn validator_network(&self) -> &str {
        self.validator.network()
    }
}
