//! HTTP API server for voice gate

pub mod error;
pub mod events;
pub mod gate;
pub mod health;
pub mod preferences;
pub mod utterances;
pub mod voice;

pub use error::ApiError;

use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::Result;
use crate::config::{Config, WaitConfig};
use crate::events::EventHub;
use crate::session::VoiceSession;
use crate::speech::{CommandSynthesizer, DEFAULT_RATE, SpeechSynthesizer};

/// Shared state for API handlers
pub struct ApiState {
    /// Conversation store and voice preferences, guarded together
    pub session: Mutex<VoiceSession>,
    pub hub: EventHub,
    pub speech: Arc<dyn SpeechSynthesizer>,

    /// Words per minute for assistant replies
    pub speech_rate: u32,
    pub wait: WaitConfig,
}

impl ApiState {
    /// Create state with a fresh session wired to a new hub
    #[must_use]
    pub fn new(speech: Arc<dyn SpeechSynthesizer>, speech_rate: u32, wait: WaitConfig) -> Self {
        let hub = EventHub::new();
        Self {
            session: Mutex::new(VoiceSession::new(hub.clone())),
            hub,
            speech,
            speech_rate,
            wait,
        }
    }
}

/// Build the full application router
///
/// Voice routes live under `/api`; health probes sit at the root.
pub fn router(state: Arc<ApiState>) -> Router {
    let api = Router::new()
        .merge(utterances::router(state.clone()))
        .merge(voice::router(state.clone()))
        .merge(preferences::router(state.clone()))
        .merge(gate::router(state.clone()))
        .merge(events::router(state.clone()));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .nest("/api", api)
        .merge(health::router())
        .merge(health::ready_router(state))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Configuration for building an API server
pub struct ApiServerBuilder {
    host: String,
    port: u16,
    speech: Option<Arc<dyn SpeechSynthesizer>>,
    speech_rate: u32,
    wait: WaitConfig,
}

impl ApiServerBuilder {
    /// Create a new API server builder
    #[must_use]
    pub fn new(port: u16) -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port,
            speech: None,
            speech_rate: DEFAULT_RATE,
            wait: WaitConfig::default(),
        }
    }

    /// Builder seeded from loaded configuration
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let speech = CommandSynthesizer::new(&config.speech.command, &config.speech.rate_flag)
            .with_timeout(config.speech.timeout);

        Self::new(config.server.port)
            .host(config.server.host.clone())
            .speech(Arc::new(speech))
            .speech_rate(config.speech.rate)
            .wait(config.wait)
    }

    #[must_use]
    pub fn host(mut self, host: String) -> Self {
        self.host = host;
        self
    }

    #[must_use]
    pub fn speech(mut self, speech: Arc<dyn SpeechSynthesizer>) -> Self {
        self.speech = Some(speech);
        self
    }

    #[must_use]
    pub const fn speech_rate(mut self, rate: u32) -> Self {
        self.speech_rate = rate;
        self
    }

    #[must_use]
    pub const fn wait(mut self, wait: WaitConfig) -> Self {
        self.wait = wait;
        self
    }

    /// Build the API server
    #[must_use]
    pub fn build(self) -> ApiServer {
        let speech: Arc<dyn SpeechSynthesizer> = match self.speech {
            Some(speech) => speech,
            None => Arc::new(CommandSynthesizer::new("say", "-r")),
        };

        ApiServer {
            state: Arc::new(ApiState::new(speech, self.speech_rate, self.wait)),
            host: self.host,
            port: self.port,
        }
    }
}

/// HTTP API server
pub struct ApiServer {
    state: Arc<ApiState>,
    host: String,
    port: u16,
}

impl ApiServer {
    /// Shared handler state
    #[must_use]
    pub fn state(&self) -> Arc<ApiState> {
        self.state.clone()
    }

    /// Run the API server
    ///
    /// # Errors
    ///
    /// Returns error if the server fails to bind or serve
    pub async fn run(self) -> Result<()> {
        let addr = format!("{}:{}", self.host, self.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| crate::Error::Config(format!("failed to bind API server: {e}")))?;

        tracing::info!(addr = %addr, "API server listening");

        axum::serve(listener, router(self.state))
            .await
            .map_err(|e| crate::Error::Config(format!("API server error: {e}")))?;

        Ok(())
    }

    /// Spawn the API server as a background task
    #[must_use]
    pub fn spawn(self) -> tokio::task::JoinHandle<Result<()>> {
        tokio::spawn(async move { self.run().await })
    }
}
