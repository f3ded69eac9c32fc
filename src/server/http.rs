use crate::config::Config;
use crate::events::{EventBroadcaster, ProgressEvent, SubscriptionGuard};
use crate::extract::{ExtractionRequest, ExtractionSettings, PageIndex, SessionController};
use crate::site::{BrowserLauncher, EntryStrategy};
use crate::{ExtractError, Result};
use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{
        IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
    routing::get,
};
use futures::Stream;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::future::Future;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
    launcher: Arc<dyn BrowserLauncher>,
    broadcaster: Arc<EventBroadcaster>,
    settings: ExtractionSettings,
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    keyword: Option<String>,
    strategy: Option<EntryStrategy>,
}

#[derive(Debug, Serialize)]
struct SearchResponse {
    rawdata: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pages: Option<Vec<PageIndex>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    extracted: Option<Vec<PageIndex>>,
    logs: Vec<ProgressEvent>,
}

impl SearchResponse {
    fn empty(logs: Vec<ProgressEvent>) -> Self {
        Self {
            rawdata: None,
            pages: None,
            extracted: None,
            logs,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    logs: Vec<ProgressEvent>,
}

#[derive(Debug, Serialize)]
struct KeywordResponse {
    keyword: Option<String>,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    ok: bool,
    subscribers: usize,
}

pub struct HttpServer {
    config: Arc<Config>,
    launcher: Arc<dyn BrowserLauncher>,
    broadcaster: Arc<EventBroadcaster>,
    settings: ExtractionSettings,
}

impl HttpServer {
    pub fn new(config: Arc<Config>, launcher: Arc<dyn BrowserLauncher>) -> Self {
        let settings = ExtractionSettings::from_config(&config);
        Self {
            config,
            launcher,
            broadcaster: Arc::new(EventBroadcaster::new()),
            settings,
        }
    }

    pub fn with_settings(mut self, settings: ExtractionSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn broadcaster(&self) -> Arc<EventBroadcaster> {
        self.broadcaster.clone()
    }

    pub fn router(&self) -> Router {
        let state = AppState {
            config: self.config.clone(),
            launcher: self.launcher.clone(),
            broadcaster: self.broadcaster.clone(),
            settings: self.settings.clone(),
        };

        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        Router::new()
            .route("/api/health", get(health))
            .route("/api/search", get(search))
            .route("/api/default-keyword", get(default_keyword))
            .route("/api/logs", get(logs))
            .layer(cors)
            .with_state(state)
    }

    pub async fn run(&self) -> Result<()> {
        let addr = format!("{}:{}", self.config.server.host, self.config.server.port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        tracing::info!("HTTP server listening on {}", addr);

        self.serve(listener, shutdown_signal()).await
    }

    pub async fn serve(
        &self,
        listener: tokio::net::TcpListener,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<()> {
        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await?;
        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        subscribers: state.broadcaster.subscriber_count(),
    })
}

async fn default_keyword(State(state): State<AppState>) -> Json<KeywordResponse> {
    Json(KeywordResponse {
        keyword: state.config.server.default_keyword.clone(),
    })
}

async fn search(State(state): State<AppState>, Query(query): Query<SearchQuery>) -> Response {
    let strategy = query.strategy.unwrap_or(state.config.site.entry_strategy);

    let request = match ExtractionRequest::new(query.keyword.unwrap_or_default(), strategy) {
        Ok(request) => request,
        Err(e) => {
            let event = ProgressEvent::error(e.to_string());
            state.broadcaster.emit(&event);
            return (StatusCode::OK, Json(SearchResponse::empty(vec![event]))).into_response();
        }
    };

    let controller = SessionController::new(
        state.launcher.clone(),
        state.broadcaster.clone(),
        state.settings.clone(),
    );
    let outcome = controller.run(&request).await;

    match outcome.result {
        Ok(merged) => (
            StatusCode::OK,
            Json(SearchResponse {
                rawdata: Some(merged.data),
                pages: Some(merged.pages),
                extracted: Some(merged.extracted),
                logs: outcome.events,
            }),
        )
            .into_response(),
        Err(ExtractError::NoDataExtracted { .. }) => {
            (StatusCode::OK, Json(SearchResponse::empty(outcome.events))).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, keyword = %request.keyword(), "Search failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: e.to_string(),
                    logs: outcome.events,
                }),
            )
                .into_response()
        }
    }
}

/// Streams every progress event emitted after the client connects. The
/// subscription lives inside the stream and is removed when the client goes
/// away and axum drops the body.
async fn logs(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = std::result::Result<Event, axum::Error>>> {
    let subscription = state.broadcaster.subscribe();
    let guard = SubscriptionGuard::new(state.broadcaster.clone(), subscription.id);

    let stream = futures::stream::unfold(
        (subscription.receiver, guard),
        |(mut receiver, guard)| async move {
            let event = receiver.recv().await?;
            let sse = Event::default().event("progress").json_data(&event);
            Some((sse, (receiver, guard)))
        },
    );

    Sse::new(stream).keep_alive(KeepAlive::default())
}
